use std::io;

use thiserror::Error;

/// Protocol level failures. Decode and framing errors are terminal for
/// the connection they occur on, callers decide to disconnect.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed package ({} raw bytes): {source}", .bytes.len())]
    Decode {
        /// the offending frame, delimiter stripped
        bytes: Vec<u8>,
        source: serde_json::Error,
    },

    #[error("no delimiter within {0} buffered bytes")]
    FrameTooLarge(usize),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
