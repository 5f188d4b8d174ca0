use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::ProtocolError;
use crate::package::Package;

/// Terminates every encoded package on the wire.
pub const DELIMITER: u8 = b';';

/// Ceiling on one encoded package. A stream that buffers this much
/// without a delimiter is torn down rather than resynchronized.
pub const MAX_PACKAGE_SIZE: usize = 8 * 1024;

// encode and decode of the json document wire format:
// {"header":{"bodySize":..,"type":..,"senderID":..},"body":{"data":..}};
pub struct PackageCodec;

impl Decoder for PackageCodec {
    type Item = Package;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let end = match frame_end(src) {
            Some(end) => end,
            None if src.len() > MAX_PACKAGE_SIZE => {
                return Err(ProtocolError::FrameTooLarge(src.len()))
            }
            None => return Ok(None), // no complete package buffered yet
        };

        let frame = src.split_to(end + 1);
        let document = &frame[..frame.len() - 1]; // strip the delimiter

        trace!("decoding {} byte package", document.len());

        match serde_json::from_slice::<Package>(document) {
            Ok(package) => Ok(Some(package)),
            Err(source) => Err(ProtocolError::Decode {
                bytes: document.to_vec(),
                source,
            }),
        }
    }
}

impl Encoder<Package> for PackageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Package, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let document = serde_json::to_vec(&item).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e)
        })?;

        dst.reserve(document.len() + 1);
        dst.extend_from_slice(&document);
        dst.put_u8(DELIMITER);
        Ok(())
    }
}

// Position of the delimiter closing the first buffered package.
// Delimiters inside json string literals don't count, so chat text
// containing ';' frames correctly.
fn frame_end(buf: &[u8]) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in buf.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else if b == b'"' {
            in_string = true;
        } else if b == DELIMITER {
            return Some(i);
        }
    }

    None
}
