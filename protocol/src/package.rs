use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ProtocolError;

/// Connection identity as assigned by the hub. 0 is the hub itself,
/// clients start at 1.
pub type IdType = u32;

pub const HUB_ID: IdType = 0;

// wire values for the header "type" field
const TEXT_MESSAGE: u8 = 0;
const BOARD_UPDATE: u8 = 1;
const HANDSHAKE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PackageType {
    TextMessage,
    BoardUpdate,
    Handshake,
}

impl From<PackageType> for u8 {
    fn from(t: PackageType) -> u8 {
        match t {
            PackageType::TextMessage => TEXT_MESSAGE,
            PackageType::BoardUpdate => BOARD_UPDATE,
            PackageType::Handshake => HANDSHAKE,
        }
    }
}

impl TryFrom<u8> for PackageType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            TEXT_MESSAGE => Ok(PackageType::TextMessage),
            BOARD_UPDATE => Ok(PackageType::BoardUpdate),
            HANDSHAKE => Ok(PackageType::Handshake),
            other => Err(format!("unknown package type {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "bodySize")]
    pub body_size: usize,
    #[serde(rename = "type")]
    pub package_type: PackageType,
    #[serde(rename = "senderID")]
    pub sender_id: IdType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub data: Value,
}

/// One typed, attributed message exchanged over a connection.
/// Immutable once constructed, body shape depends on the header type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    header: Header,
    body: Body,
}

impl Package {
    fn from_parts(package_type: PackageType, sender_id: IdType, data: Value) -> Self {
        Package {
            header: Header {
                // informational, framing is by delimiter
                body_size: data.to_string().len(),
                package_type,
                sender_id,
            },
            body: Body { data },
        }
    }

    pub fn text(sender_id: IdType, message: &str) -> Self {
        Self::from_parts(PackageType::TextMessage, sender_id, json!({ "message": message }))
    }

    pub fn board_update(sender_id: IdType, stroke: &Stroke) -> Self {
        Self::from_parts(
            PackageType::BoardUpdate,
            sender_id,
            json!({
                "options": {
                    "color": stroke.options.color,
                    "thickness": stroke.options.thickness,
                },
                "numberOfPoints": stroke.number_of_points,
                "points": stroke.points,
            }),
        )
    }

    // client side of the handshake
    pub fn join(username: &str, load_the_canvas: bool) -> Self {
        Self::from_parts(
            PackageType::Handshake,
            HUB_ID,
            json!({ "username": username, "loadTheCanvas": load_the_canvas }),
        )
    }

    // hub side of the handshake, echoes the assigned identity back
    pub fn welcome(id: IdType) -> Self {
        Self::from_parts(PackageType::Handshake, HUB_ID, json!({ "id": id }))
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn package_type(&self) -> PackageType {
        self.header.package_type
    }

    pub fn sender_id(&self) -> IdType {
        self.header.sender_id
    }

    pub fn chat_text(&self) -> Result<ChatText, ProtocolError> {
        self.body_view()
    }

    pub fn stroke(&self) -> Result<Stroke, ProtocolError> {
        self.body_view()
    }

    pub fn join_request(&self) -> Result<Join, ProtocolError> {
        self.body_view()
    }

    pub fn welcome_reply(&self) -> Result<Welcome, ProtocolError> {
        self.body_view()
    }

    fn body_view<T: for<'de> Deserialize<'de>>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.body.data.clone()).map_err(|source| ProtocolError::Decode {
            bytes: self.body.data.to_string().into_bytes(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatText {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeOptions {
    pub color: [f32; 4],
    pub thickness: f32,
}

/// One drawn line on the shared whiteboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub options: StrokeOptions,
    #[serde(rename = "numberOfPoints")]
    pub number_of_points: usize,
    pub points: Vec<[f32; 2]>,
}

impl Stroke {
    pub fn new(points: Vec<[f32; 2]>, color: [f32; 4], thickness: f32) -> Self {
        Stroke {
            options: StrokeOptions { color, thickness },
            number_of_points: points.len(),
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub username: String,
    #[serde(rename = "loadTheCanvas", default)]
    pub load_the_canvas: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    pub id: IdType,
}
