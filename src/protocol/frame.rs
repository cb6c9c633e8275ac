//! Frame and header structs with typed accessors.
//!
//! A frame is one complete protocol message: a header selecting how the
//! body is interpreted, and a body of purpose-specific fields.
//!
//! # Example
//!
//! ```
//! use cmdwire::protocol::{Frame, Header, MessagePurpose, ProtocolVersion};
//! use serde_json::{json, Map};
//!
//! let header = Header::new(MessagePurpose::Event, ProtocolVersion::V2)
//!     .with_extra("eventName", json!("playerJoin"));
//! let frame = Frame::new(header, Map::new());
//!
//! assert_eq!(frame.event_name(), Some("playerJoin"));
//! assert!(frame.request_id().is_nil());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::purpose::MessagePurpose;
use super::request_id::RequestId;
use super::version::ProtocolVersion;

/// Frame header.
///
/// Decoding defaults a missing `requestId` to the nil sentinel and a missing
/// `version` to V1; `messagePurpose` is required. Purpose-specific header
/// fields (e.g. `eventName` on V2 event frames) live in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Protocol version stamped by the sending side.
    #[serde(default)]
    pub version: ProtocolVersion,
    /// Correlation token; the nil sentinel when the sender supplied none.
    #[serde(rename = "requestId", default)]
    pub request_id: RequestId,
    /// Selects how the body is interpreted.
    #[serde(rename = "messagePurpose")]
    pub message_purpose: MessagePurpose,
    /// Purpose-specific extra header fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Header {
    /// Create a header with the nil request id and no extra fields.
    pub fn new(message_purpose: MessagePurpose, version: ProtocolVersion) -> Self {
        Self {
            version,
            request_id: RequestId::nil(),
            message_purpose,
            extra: Map::new(),
        }
    }

    /// Set the correlation token.
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Add a purpose-specific header field.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// `eventName` carried in the header (V2 event shape).
    pub fn event_name(&self) -> Option<&str> {
        self.extra.get("eventName").and_then(Value::as_str)
    }
}

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Purpose-specific body fields (empty map when the sender omitted it).
    #[serde(default)]
    pub body: Map<String, Value>,
}

impl Frame {
    /// Create a new frame from header and body.
    pub fn new(header: Header, body: Map<String, Value>) -> Self {
        Self { header, body }
    }

    /// Get the message purpose.
    #[inline]
    pub fn purpose(&self) -> &MessagePurpose {
        &self.header.message_purpose
    }

    /// Get the protocol version the sender stamped.
    #[inline]
    pub fn version(&self) -> ProtocolVersion {
        self.header.version
    }

    /// Get the correlation token.
    #[inline]
    pub fn request_id(&self) -> &RequestId {
        &self.header.request_id
    }

    /// Event name, wherever the sending version put it: header extra field
    /// (V2 shape) first, then body (V1 shape).
    pub fn event_name(&self) -> Option<&str> {
        self.header
            .event_name()
            .or_else(|| self.body.get("eventName").and_then(Value::as_str))
    }

    /// `body.commandLine` for command-request frames.
    pub fn command_line(&self) -> Option<&str> {
        self.body.get("commandLine").and_then(Value::as_str)
    }

    /// `body.name` for legacy-shape command-request frames.
    pub fn command_name(&self) -> Option<&str> {
        self.body.get("name").and_then(Value::as_str)
    }

    /// `body.overload` for legacy-shape command-request frames.
    pub fn command_overload(&self) -> Option<&str> {
        self.body.get("overload").and_then(Value::as_str)
    }

    /// `body.input` for legacy-shape command-request frames.
    pub fn command_input(&self) -> Option<&Map<String, Value>> {
        self.body.get("input").and_then(Value::as_object)
    }
}
