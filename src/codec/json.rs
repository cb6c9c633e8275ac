//! JSON frame codec.
//!
//! Serializes frames to the JSON envelope and back, applying the encryption
//! transform when a session is active. Decryption runs before parsing;
//! encryption runs after serialization.
//!
//! # Example
//!
//! ```
//! use cmdwire::codec::FrameCodec;
//! use cmdwire::protocol::{Frame, Header, MessagePurpose, ProtocolVersion};
//! use serde_json::Map;
//!
//! let frame = Frame::new(
//!     Header::new(MessagePurpose::Event, ProtocolVersion::V1),
//!     Map::new(),
//! );
//! let bytes = FrameCodec::encode(&frame, None).unwrap();
//! let decoded = FrameCodec::decode(&bytes, None).unwrap();
//! assert_eq!(decoded, frame);
//! ```

use bytes::Bytes;

use crate::encryption::EncryptionSession;
use crate::error::{CmdwireError, Result};
use crate::protocol::Frame;

/// Codec for the JSON frame envelope.
pub struct FrameCodec;

impl FrameCodec {
    /// Decode raw transport bytes into a frame.
    ///
    /// When a session is supplied the bytes are decrypted first.
    ///
    /// # Errors
    ///
    /// Returns [`CmdwireError::MalformedFrame`] when the bytes are not a
    /// JSON frame or the header lacks `messagePurpose`.
    pub fn decode(raw: &[u8], session: Option<&mut EncryptionSession>) -> Result<Frame> {
        let parsed = match session {
            Some(session) => {
                let plain = session.decrypt(raw);
                serde_json::from_slice(&plain)
            }
            None => serde_json::from_slice(raw),
        };
        parsed.map_err(|e| CmdwireError::MalformedFrame(e.to_string()))
    }

    /// Encode a frame into raw transport bytes.
    ///
    /// When a session is supplied the serialized bytes are encrypted before
    /// being returned.
    pub fn encode(frame: &Frame, session: Option<&mut EncryptionSession>) -> Result<Bytes> {
        let data = serde_json::to_vec(frame)?;
        Ok(match session {
            Some(session) => Bytes::from(session.encrypt(&data)),
            None => Bytes::from(data),
        })
    }
}
