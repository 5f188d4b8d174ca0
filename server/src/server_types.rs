use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use protocol::{IdType, Package};

use crate::connection::Connection;

// server type definitions

// current connection registry, keyed by assigned identity
pub type Registry = Arc<Mutex<HashMap<IdType, Connection>>>;

// events flowing from the per-connection tasks into the hub loop
#[derive(Debug)]
pub enum HubEvent {
    Joined(IdType, String, bool),
    Package(IdType, Package),
    Disconnected(IdType),
}
