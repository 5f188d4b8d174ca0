use std::net::SocketAddr;

use futures::SinkExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc::{self, Sender, UnboundedSender};
use tokio_util::codec::FramedWrite;
use tracing::debug;

use protocol::{IdType, Package, PackageCodec};

use crate::server_types::HubEvent;

// One live peer as the registry sees it. Holds the outbound fifo queue;
// a spawned writer task drains it onto the socket one package at a time,
// in submission order. Dropping the entry closes the queue, which lets
// the writer drain what is pending and release the write half.
#[derive(Debug)]
pub struct Connection {
    pub addr: SocketAddr,
    pub username: String,
    outbound: UnboundedSender<Package>,
}

impl Connection {
    pub fn spawn(
        id: IdType,
        addr: SocketAddr,
        username: String,
        mut fw: FramedWrite<OwnedWriteHalf, PackageCodec>,
        hub_tx: Sender<HubEvent>,
    ) -> Self {
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Package>();

        let _writer = tokio::spawn(async move {
            while let Some(package) = outbound_rx.recv().await {
                if let Err(e) = fw.send(package).await {
                    debug!("write to connection {} failed: {}", id, e);
                    let _ = hub_tx.send(HubEvent::Disconnected(id)).await;
                    return;
                }
            }
            debug!("writer for connection {} finished", id);
        });

        Connection {
            addr,
            username,
            outbound,
        }
    }

    // Non-blocking enqueue. False once the writer is gone, callers skip
    // such connections.
    pub fn submit(&self, package: Package) -> bool {
        self.outbound.send(package).is_ok()
    }
}
