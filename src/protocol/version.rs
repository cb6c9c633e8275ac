//! Protocol version negotiation.
//!
//! The version is fixed when a connection is constructed and only affects
//! the shape of outbound event frames: V2 carries `eventName` in the header,
//! V1 merges it into the body.

use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Protocol version carried in every frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// Legacy event shape: `eventName` merged into the body.
    V1,
    /// Current event shape: `eventName` carried in the header.
    V2,
}

/// Version used when the caller does not pick one.
pub const DEFAULT_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V1;

impl ProtocolVersion {
    /// Map a wire integer to a version.
    ///
    /// Peers only ever discriminate "V2 or not", so any value other than 2
    /// decodes as V1.
    pub fn from_wire(value: u32) -> Self {
        match value {
            2 => ProtocolVersion::V2,
            _ => ProtocolVersion::V1,
        }
    }

    /// The integer written on the wire.
    pub fn to_wire(self) -> u32 {
        match self {
            ProtocolVersion::V1 => 1,
            ProtocolVersion::V2 => 2,
        }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        DEFAULT_PROTOCOL_VERSION
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.to_wire())
    }
}

impl Serialize for ProtocolVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for ProtocolVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        u32::deserialize(deserializer).map(ProtocolVersion::from_wire)
    }
}
