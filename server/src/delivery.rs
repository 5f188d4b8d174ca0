use std::sync::Arc;

use tracing::debug;

use protocol::{IdType, Package, HUB_ID};

use crate::server_types::Registry;

// handles package delivery back to clients
pub struct Delivery {
    registry: Registry,
}

impl Delivery {
    pub fn new(clients: &Registry) -> Self {
        Delivery {
            registry: Arc::clone(clients),
        }
    }

    pub async fn send(&mut self, id: IdType, package: Package) {
        let r = self.registry.lock().await;

        if let Some(c) = r.get(&id) {
            if !c.submit(package) {
                debug!("connection {} no longer deliverable, skipping", id);
            }
        }
    }

    pub async fn broadcast(&mut self, package: Package) {
        // HUB_ID never keys a registry entry, so nothing is excluded
        self.broadcast_except(HUB_ID, package).await;
    }

    pub async fn broadcast_except(&mut self, except: IdType, package: Package) {
        let r = self.registry.lock().await;

        for (id, c) in r.iter() {
            if except == *id {
                continue; // skip the send to the excepted connection
            }

            if !c.submit(package.clone()) {
                debug!("connection {} no longer deliverable, skipping", id);
            }
        }
    }
}
