use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::SinkExt;
use tokio::net::{lookup_host, tcp, TcpStream};
use tokio::select;
use tokio::sync::broadcast;
use tokio::sync::broadcast::Sender as BSender;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

use protocol::{IdType, Package, PackageCodec, PackageType};

use crate::errors::ClientError;

const SHUTDOWN: u8 = 1;

pub struct Client {
    id: IdType,
    username: String,
    connected: Arc<AtomicBool>,
    shutdown_tx: BSender<u8>,
    fr: Option<FramedRead<tcp::OwnedReadHalf, PackageCodec>>,
    fw: Option<FramedWrite<tcp::OwnedWriteHalf, PackageCodec>>,
    local_tx: UnboundedSender<Package>,
    local_rx: Option<UnboundedReceiver<Package>>,
}

impl Client {
    // Resolve then connect. No side effects when either step fails.
    pub async fn connect(address: &str, port: &str) -> Result<Client, ClientError> {
        let target = format!("{}:{}", address, port);

        let mut endpoints = lookup_host(target.as_str())
            .await
            .map_err(|_| ClientError::Resolution(target.clone()))?;
        let endpoint = endpoints
            .next()
            .ok_or_else(|| ClientError::Resolution(target.clone()))?;

        info!("Client connecting to hub {:?}", &endpoint);

        let socket = TcpStream::connect(endpoint).await.map_err(|e| {
            error!("Unable to connect to hub");
            ClientError::Connect(e)
        })?;

        // split tcpstream so we can hand off to r & w tasks
        let (client_read, client_write) = socket.into_split();

        let (shutdown_tx, _) = broadcast::channel(16);
        let (local_tx, local_rx) = mpsc::unbounded_channel::<Package>();

        Ok(Client {
            id: 0,
            username: String::new(),
            connected: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            fr: Some(FramedRead::new(client_read, PackageCodec)),
            fw: Some(FramedWrite::new(client_write, PackageCodec)),
            local_tx,
            local_rx: Some(local_rx),
        })
    }

    // Client side of the handshake: send the username, block for exactly
    // one framed response carrying the assigned identity.
    pub async fn handshake(
        &mut self,
        username: &str,
        load_canvas: bool,
    ) -> Result<IdType, ClientError> {
        self.fw
            .as_mut()
            .unwrap()
            .send(Package::join(username, load_canvas))
            .await
            .map_err(|e| ClientError::Handshake(format!("unable to send join: {}", e)))?;

        match self.fr.as_mut().unwrap().next().await {
            Some(Ok(reply)) if reply.package_type() == PackageType::Handshake => {
                let welcome = reply
                    .welcome_reply()
                    .map_err(|e| ClientError::Handshake(format!("bad welcome body: {}", e)))?;

                self.id = welcome.id;
                self.username = username.to_owned();
                self.connected.store(true, Ordering::Relaxed);

                info!("registered as {} with id {}", username, self.id);
                Ok(self.id)
            }
            Some(Ok(reply)) => Err(ClientError::Handshake(format!(
                "expected a handshake reply, got {:?}",
                reply.package_type()
            ))),
            Some(Err(e)) => Err(ClientError::Handshake(e.to_string())),
            None => Err(ClientError::Handshake(
                "connection closed before the welcome".to_owned(),
            )),
        }
    }

    pub fn id(&self) -> IdType {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    // Non-blocking enqueue onto the outbound fifo; the write task drains
    // it in submission order.
    pub fn submit(&self, package: Package) -> Result<(), ClientError> {
        self.local_tx.send(package).map_err(|_| ClientError::PeerClosed)
    }

    // Idempotent. Both socket tasks exit and drop their halves.
    pub fn stop(&self) {
        self.connected.store(false, Ordering::Relaxed);
        let _ = self.shutdown_tx.send(SHUTDOWN); // nobody listening is fine
    }

    // Spawn client tcp read tokio task. Every decoded package goes out on
    // the events channel; the channel closing is the disconnect signal to
    // application logic.
    pub fn spawn_read(&mut self, events: UnboundedSender<Package>) -> JoinHandle<()> {
        let mut fr = self.fr.take().unwrap();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let connected = Arc::clone(&self.connected);

        tokio::spawn(async move {
            loop {
                select! {
                    value = fr.next() => {
                        match value {
                            Some(Ok(package)) => {
                                debug!("received {:?} package", package.package_type());
                                if events.send(package).is_err() {
                                    break; // application dropped its end
                                }
                            }
                            Some(Err(e)) => {
                                debug!("Client connection closing error: {:?}", e);
                                break;
                            }
                            None => {
                                info!("Hub remote has closed");
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("read task received shutdown, returning");
                        break;
                    }
                }
            }
            connected.store(false, Ordering::Relaxed);
        })
    }

    // Spawn client tcp write tokio task, draining the local queue to the hub
    pub fn spawn_write(&mut self) -> JoinHandle<()> {
        let mut fw = self.fw.take().unwrap();
        let mut local_rx = self.local_rx.take().unwrap();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let connected = Arc::clone(&self.connected);

        tokio::spawn(async move {
            loop {
                select! {
                    value = local_rx.recv() => {
                        match value {
                            Some(package) => {
                                if let Err(e) = fw.send(package).await {
                                    error!("Unable to write to hub: {}", e);
                                    break;
                                }
                            }
                            None => break, // client handle dropped
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("write task received shutdown, returning");
                        break;
                    }
                }
            }
            connected.store(false, Ordering::Relaxed);
        })
    }
}
