//! Protocol module - wire data model.
//!
//! This module defines the JSON envelope of the command protocol:
//! - Frame and header structs with typed accessors
//! - The fixed message-purpose vocabulary
//! - Protocol versions and the default request-id sentinel

mod frame;
mod purpose;
mod request_id;
mod version;

pub use frame::{Frame, Header};
pub use purpose::MessagePurpose;
pub use request_id::{RequestId, NIL_REQUEST_ID};
pub use version::{ProtocolVersion, DEFAULT_PROTOCOL_VERSION};
