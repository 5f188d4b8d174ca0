use std::net::SocketAddr;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use tokio::io;
use tokio::net::TcpListener;
use tokio::sync::mpsc::Sender;
use tracing::info;

use crate::client_handler::ClientHandler;
use crate::server_types::{HubEvent, Registry};

const COUNTER_SEED: u32 = 1; // 0 is the hub's own identity

pub struct ServerListener {
    listener: TcpListener,
}

impl ServerListener {
    // binding is separate from accepting so callers can learn an
    // ephemeral port before any client connects
    pub async fn bind(addr: &str) -> io::Result<ServerListener> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {:?}", listener.local_addr()?);
        Ok(ServerListener { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn spawn_accept(self, clients: Registry, hub_tx: Sender<HubEvent>) {
        // identity counter scoped to this listener, monotonic, never reused
        let counter = Arc::new(AtomicU32::new(COUNTER_SEED));

        let _h = tokio::spawn(async move {
            loop {
                if let Ok((tcp_socket, addr)) = self.listener.accept().await {
                    let (tcp_read, tcp_write) = tcp_socket.into_split();

                    info!("Server received new client connection {:?}", &addr);

                    let handler = ClientHandler::new(tcp_read, hub_tx.clone(), clients.clone());
                    ClientHandler::spawn(handler, addr, tcp_write, counter.clone());
                } else {
                    info!("Server abnormally exiting .. ");
                    break;
                }
            }
        });
    }
}
