use std::io;

use thiserror::Error;

use protocol::ProtocolError;

/// Everything that can go wrong between a connector and the hub.
/// Resolution and connect failures surface synchronously from
/// `Client::connect` with no side effects; the rest are terminal for
/// the session.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot resolve {0}")]
    Resolution(String),

    #[error("unable to connect: {0}")]
    Connect(#[source] io::Error),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),

    #[error("connection to the hub is closed")]
    PeerClosed,
}
