use std::collections::HashMap;
use std::sync::Arc;

use tokio::io;
use tokio::sync::{mpsc, Mutex};

use tracing::Level;
use tracing_subscriber::fmt;

use server::hub::Hub;
use server::server_listener::ServerListener;
use server::server_types::{HubEvent, Registry};

const SERVER: &str = "127.0.0.1:4321";
const BOUNDED_CHANNEL_SIZE: usize = 64;

#[tokio::main]
async fn main() -> io::Result<()> {
    fmt()
        .compact()
        .with_max_level(Level::INFO)
        .init();

    // optional port override, e.g. `server 4400`
    let addr = match std::env::args().nth(1) {
        Some(port) => format!("127.0.0.1:{}", port),
        None => SERVER.to_owned(),
    };

    // Setup registry map, shared between the accept path, the hub loop
    // and every per-connection writer
    let clients: Registry = Arc::new(Mutex::new(HashMap::new()));

    // Setup local msg passing channel feeding the hub loop
    let (local_tx, local_rx) = mpsc::channel::<HubEvent>(BOUNDED_CHANNEL_SIZE);

    let listener = ServerListener::bind(&addr).await?;
    listener.spawn_accept(Arc::clone(&clients), local_tx);

    // drive fan-out on the main task
    Hub::new(&clients).run(local_rx).await;

    Ok(())
}
