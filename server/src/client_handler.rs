use std::io::{Error, ErrorKind};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures::SinkExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::Sender;
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

use protocol::{IdType, Package, PackageCodec, PackageType, ProtocolError};

use crate::connection::Connection;
use crate::server_types::{HubEvent, Registry};

// Handles hub communication from one client.
// Essentially this models a client actor on the server side.
pub struct ClientHandler {
    client_id: IdType,
    fr: Option<FramedRead<OwnedReadHalf, PackageCodec>>,
    hub_tx: Sender<HubEvent>,
    clients: Registry,
}

impl ClientHandler {
    pub fn new(tcp_read: OwnedReadHalf, hub_tx: Sender<HubEvent>, clients: Registry) -> Self {
        Self {
            client_id: 0, // assigned during register()
            fr: Some(FramedRead::new(tcp_read, PackageCodec)),
            hub_tx,
            clients,
        }
    }

    // Spawn tokio task to drive one client socket: registration first,
    // the steady read loop after
    pub fn spawn(
        mut h: ClientHandler,
        addr: SocketAddr,
        tcp_write: OwnedWriteHalf,
        counter: Arc<AtomicU32>,
    ) {
        let _ = tokio::spawn(async move {
            match h.register(addr, tcp_write, counter).await {
                Ok(()) => h.handle_read().await,
                // registration never completed, the socket just drops and
                // no leave notice is owed
                Err(e) => error!("handshake with {:?} failed: {}", addr, e),
            }
        });
    }

    // Server side of the handshake: read the join package, assign the next
    // identity, answer with the welcome frame, then publish the connection.
    // The welcome is written before the registry insert so no broadcast can
    // interleave ahead of the handshake response. A consumed identity stays
    // consumed even if registration aborts afterwards.
    async fn register(
        &mut self,
        addr: SocketAddr,
        tcp_write: OwnedWriteHalf,
        counter: Arc<AtomicU32>,
    ) -> Result<(), ProtocolError> {
        let join = match self.fr.as_mut().unwrap().next().await {
            Some(Ok(package)) if package.package_type() == PackageType::Handshake => {
                package.join_request()?
            }
            Some(Ok(package)) => {
                let what = format!("expected a handshake, got {:?}", package.package_type());
                return Err(Error::new(ErrorKind::InvalidData, what).into());
            }
            Some(Err(e)) => return Err(e),
            None => return Err(Error::from(ErrorKind::UnexpectedEof).into()),
        };

        self.client_id = counter.fetch_add(1, Ordering::Relaxed);
        info!("client_id is {}", self.client_id);

        let mut fw = FramedWrite::new(tcp_write, PackageCodec);
        fw.send(Package::welcome(self.client_id)).await?;

        let connection = Connection::spawn(
            self.client_id,
            addr,
            join.username.clone(),
            fw,
            self.hub_tx.clone(),
        );

        // Store connection into the clients registry
        {
            let mut mg = self.clients.lock().await;
            mg.insert(self.client_id, connection);
        }

        // notify the hub of the new join; if the hub is gone the server is
        // shutting down and the read loop will notice on its next send
        let joined = HubEvent::Joined(self.client_id, join.username, join.load_the_canvas);
        let _ = self.hub_tx.send(joined).await;

        Ok(())
    }

    // Loop over inbound packages until EOF or a terminal decode/io error,
    // then report the disconnect
    async fn handle_read(&mut self) {
        let mut fr = self.fr.take().unwrap();

        loop {
            match fr.next().await {
                Some(Ok(package)) => {
                    debug!(
                        "hub received {:?} package from {}",
                        package.package_type(),
                        self.client_id
                    );
                    let event = HubEvent::Package(self.client_id, package);
                    if self.hub_tx.send(event).await.is_err() {
                        break; // hub loop is gone, nothing left to serve
                    }
                }
                Some(Err(e)) => {
                    debug!("connection {} closing: {}", self.client_id, e);
                    self.process_disconnect().await;
                    break;
                }
                None => {
                    self.process_disconnect().await;
                    break;
                }
            }
        }
    }

    // The registry removal happens in the hub loop, which treats a second
    // disconnect for the same identity as a no-op
    async fn process_disconnect(&mut self) {
        info!("client {} connection has closed", self.client_id);
        let _ = self.hub_tx.send(HubEvent::Disconnected(self.client_id)).await;
    }
}
