use std::time::Duration;

use futures::SinkExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_stream::StreamExt;
use tokio_util::codec::Framed;

use client::client::Client;
use client::errors::ClientError;
use protocol::{IdType, Package, PackageCodec, PackageType, Stroke};

const WAIT: Duration = Duration::from_secs(5);

async fn ephemeral_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("no local addr");
    (listener, format!("{}", addr.port()))
}

// hub stand-in: accept one socket, answer the join with the given
// identity, then hand the framed socket back to the test
fn mock_handshake(
    listener: TcpListener,
    assign: IdType,
) -> JoinHandle<Framed<TcpStream, PackageCodec>> {
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept failed");
        let mut framed = Framed::new(socket, PackageCodec);

        let join = timeout(WAIT, framed.next())
            .await
            .expect("timed out waiting for join")
            .expect("stream ended")
            .expect("join decode failed");
        assert_eq!(join.package_type(), PackageType::Handshake);

        framed
            .send(Package::welcome(assign))
            .await
            .expect("welcome send failed");
        framed
    })
}

#[tokio::test]
async fn unresolvable_target_is_a_resolution_error() {
    let result = Client::connect("127.0.0.1", "not-a-port").await;
    assert!(matches!(result, Err(ClientError::Resolution(_))));
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() {
    let (listener, port) = ephemeral_listener().await;
    drop(listener); // nobody is listening there anymore

    let result = Client::connect("127.0.0.1", &port).await;
    assert!(matches!(result, Err(ClientError::Connect(_))));
}

#[tokio::test]
async fn handshake_stores_the_assigned_identity() {
    let (listener, port) = ephemeral_listener().await;
    let hub = mock_handshake(listener, 7);

    let mut client = Client::connect("127.0.0.1", &port).await.expect("connect");
    assert!(!client.is_connected());

    let id = client.handshake("anna", false).await.expect("handshake");
    assert_eq!(id, 7);
    assert_eq!(client.id(), 7);
    assert_eq!(client.username(), "anna");
    assert!(client.is_connected());

    hub.await.unwrap();
}

#[tokio::test]
async fn non_handshake_reply_fails_the_handshake() {
    let (listener, port) = ephemeral_listener().await;

    let hub = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept failed");
        let mut framed = Framed::new(socket, PackageCodec);
        timeout(WAIT, framed.next()).await.expect("join").unwrap().unwrap();
        framed.send(Package::text(0, "hi")).await.expect("send");
    });

    let mut client = Client::connect("127.0.0.1", &port).await.expect("connect");
    let result = client.handshake("anna", false).await;
    assert!(matches!(result, Err(ClientError::Handshake(_))));
    assert!(!client.is_connected());

    hub.await.unwrap();
}

#[tokio::test]
async fn undecodable_reply_fails_the_handshake() {
    let (listener, port) = ephemeral_listener().await;

    let hub = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept failed");
        socket.write_all(b"{\"noise\":1};").await.expect("write");
    });

    let mut client = Client::connect("127.0.0.1", &port).await.expect("connect");
    let result = client.handshake("anna", false).await;
    assert!(matches!(result, Err(ClientError::Handshake(_))));

    hub.await.unwrap();
}

#[tokio::test]
async fn submissions_reach_the_wire_in_fifo_order() {
    let (listener, port) = ephemeral_listener().await;
    let hub = mock_handshake(listener, 1);

    let mut client = Client::connect("127.0.0.1", &port).await.expect("connect");
    client.handshake("anna", false).await.expect("handshake");
    client.spawn_write();

    let stroke = Stroke::new(vec![[1.0, 1.0], [2.0, 2.0]], [1.0, 0.0, 0.0, 1.0], 1.5);
    client.submit(Package::text(1, "first")).expect("submit");
    client.submit(Package::board_update(1, &stroke)).expect("submit");
    client.submit(Package::text(1, "third")).expect("submit");

    let mut framed = hub.await.unwrap();

    let first = timeout(WAIT, framed.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(first.chat_text().unwrap().message, "first");

    let second = timeout(WAIT, framed.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(second.stroke().unwrap(), stroke);

    let third = timeout(WAIT, framed.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(third.chat_text().unwrap().message, "third");
}

#[tokio::test]
async fn inbound_packages_arrive_in_order_then_the_channel_closes() {
    let (listener, port) = ephemeral_listener().await;
    let hub = mock_handshake(listener, 1);

    let mut client = Client::connect("127.0.0.1", &port).await.expect("connect");
    client.handshake("anna", false).await.expect("handshake");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<Package>();
    client.spawn_read(events_tx);

    let mut framed = hub.await.unwrap();
    let stroke = Stroke::new(vec![[0.0, 0.0], [3.0, 3.0]], [0.0, 1.0, 0.0, 1.0], 4.0);
    framed.send(Package::text(0, "one")).await.expect("send");
    framed.send(Package::board_update(2, &stroke)).await.expect("send");

    let first = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
    assert_eq!(first.chat_text().unwrap().message, "one");

    let second = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
    assert_eq!(second.package_type(), PackageType::BoardUpdate);
    assert_eq!(second.stroke().unwrap(), stroke);

    // hub goes away: the events channel closes and the client notices
    drop(framed);
    let closed = timeout(WAIT, events_rx.recv()).await.unwrap();
    assert!(closed.is_none());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn stop_is_idempotent_and_ends_both_tasks() {
    let (listener, port) = ephemeral_listener().await;
    let hub = mock_handshake(listener, 1);

    let mut client = Client::connect("127.0.0.1", &port).await.expect("connect");
    client.handshake("anna", false).await.expect("handshake");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<Package>();
    let reader = client.spawn_read(events_tx);
    let writer = client.spawn_write();
    let _framed = hub.await.unwrap();

    client.stop();
    client.stop(); // second stop is a no-op

    timeout(WAIT, reader).await.expect("reader hung").unwrap();
    timeout(WAIT, writer).await.expect("writer hung").unwrap();
    assert!(!client.is_connected());

    // the events channel is gone along with the read task
    assert!(timeout(WAIT, events_rx.recv()).await.unwrap().is_none());

    // and the outbound queue rejects further submissions
    assert!(matches!(
        client.submit(Package::text(1, "late")),
        Err(ClientError::PeerClosed)
    ));
}
