//! Message purposes.
//!
//! The `messagePurpose` header field selects how a frame's body is
//! interpreted. The vocabulary is fixed; anything else travels through as an
//! opaque custom purpose.

use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Purpose of a protocol frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessagePurpose {
    /// Remote peer wants an event pushed to it.
    Subscribe,
    /// Remote peer no longer wants an event.
    Unsubscribe,
    /// Remote peer asks this endpoint to execute a command.
    CommandRequest,
    /// Response correlated to an earlier command request.
    CommandResponse,
    /// Asynchronous event notification.
    Event,
    /// Error report.
    Error,
    /// Any purpose outside the fixed vocabulary.
    Custom(String),
}

impl MessagePurpose {
    /// The wire string for this purpose.
    pub fn as_str(&self) -> &str {
        match self {
            MessagePurpose::Subscribe => "subscribe",
            MessagePurpose::Unsubscribe => "unsubscribe",
            MessagePurpose::CommandRequest => "commandRequest",
            MessagePurpose::CommandResponse => "commandResponse",
            MessagePurpose::Event => "event",
            MessagePurpose::Error => "error",
            MessagePurpose::Custom(other) => other,
        }
    }
}

impl From<String> for MessagePurpose {
    fn from(s: String) -> Self {
        match s.as_str() {
            "subscribe" => MessagePurpose::Subscribe,
            "unsubscribe" => MessagePurpose::Unsubscribe,
            "commandRequest" => MessagePurpose::CommandRequest,
            "commandResponse" => MessagePurpose::CommandResponse,
            "event" => MessagePurpose::Event,
            "error" => MessagePurpose::Error,
            _ => MessagePurpose::Custom(s),
        }
    }
}

impl From<&str> for MessagePurpose {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl fmt::Display for MessagePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MessagePurpose {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessagePurpose {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(MessagePurpose::from)
    }
}
