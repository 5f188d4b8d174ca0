use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

use protocol::{IdType, Package, PackageType, HUB_ID};

use crate::delivery::Delivery;
use crate::server_types::{HubEvent, Registry};

const USER_JOINED: &str = "User {} has joined.";
const USER_LEFT: &str = "User {} has left.";

// Single consumer of everything the per-connection tasks produce.
// All fan-out decisions live here, so registry removal and the matching
// leave notice happen exactly once per connection.
pub struct Hub {
    clients: Registry,
    outgoing: Delivery,
    board_history: Vec<Package>,
}

impl Hub {
    pub fn new(clients: &Registry) -> Self {
        Hub {
            clients: Arc::clone(clients),
            outgoing: Delivery::new(clients),
            board_history: Vec::new(),
        }
    }

    pub async fn run(mut self, mut local_rx: Receiver<HubEvent>) {
        loop {
            if let Some(event) = local_rx.recv().await {
                debug!("hub event {:?}", &event);

                match event {
                    HubEvent::Joined(id, username, load_canvas) => {
                        let notice = USER_JOINED.replace("{}", &username);
                        self.outgoing.broadcast(Package::text(HUB_ID, &notice)).await;

                        if load_canvas {
                            // catch the late joiner up on the canvas so far
                            for update in &self.board_history {
                                self.outgoing.send(id, update.clone()).await;
                            }
                        }
                    }
                    HubEvent::Package(id, package) => {
                        self.dispatch(id, package).await;
                    }
                    HubEvent::Disconnected(id) => {
                        self.drop_connection(id).await;
                    }
                }
            } else {
                info!("No more hub event senders");
                break;
            }
        }
    }

    // Per-type fan-out policy for one decoded package
    async fn dispatch(&mut self, id: IdType, package: Package) {
        match package.package_type() {
            PackageType::TextMessage => {
                let text = match package.chat_text() {
                    Ok(text) => text,
                    Err(e) => return self.drop_malformed(id, e).await,
                };

                // look the sender up through the registry; a connection that
                // disappeared mid-dispatch is a no-op
                let username = {
                    let r = self.clients.lock().await;
                    r.get(&id).map(|c| c.username.clone())
                };
                let Some(username) = username else { return };

                // stamp the sender's name into the body and the sender's
                // identity into the header, the client header is not trusted
                let message = format!("{}: {}", username, text.message);
                self.outgoing.broadcast(Package::text(id, &message)).await;
            }
            PackageType::BoardUpdate => {
                if let Err(e) = package.stroke() {
                    return self.drop_malformed(id, e).await;
                }

                // the sender already rendered its own stroke locally
                self.board_history.push(package.clone());
                self.outgoing.broadcast_except(id, package).await;
            }
            PackageType::Handshake => {
                // consumed entirely during accept, never re-broadcast
                warn!("unexpected handshake package from connection {}", id);
            }
        }
    }

    // First removal wins; a second disconnect event for the same identity
    // finds no entry and broadcasts nothing.
    async fn drop_connection(&mut self, id: IdType) {
        let removed = {
            let mut mg = self.clients.lock().await;
            mg.remove(&id)
        };

        if let Some(connection) = removed {
            info!("User {} ({}) has left", &connection.username, id);
            let notice = USER_LEFT.replace("{}", &connection.username);
            self.outgoing.broadcast(Package::text(HUB_ID, &notice)).await;
        }
    }

    async fn drop_malformed(&mut self, id: IdType, e: protocol::ProtocolError) {
        // no resynchronization on a malformed body, the peer is torn down
        warn!("malformed package body from connection {}: {}", id, e);
        self.drop_connection(id).await;
    }
}
