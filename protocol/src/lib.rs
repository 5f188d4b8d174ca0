// wire format shared by the hub and its clients

pub mod codec;
pub mod error;
pub mod package;

pub use codec::{PackageCodec, DELIMITER, MAX_PACKAGE_SIZE};
pub use error::ProtocolError;
pub use package::{
    Body, ChatText, Header, IdType, Join, Package, PackageType, Stroke, StrokeOptions, Welcome,
    HUB_ID,
};
