//! Length-prefixed message layer.
//!
//! The protocol exchanges discrete messages, but the transport seam is a raw
//! byte stream, so each serialized (and possibly encrypted) frame travels as
//! a 4-byte big-endian length prefix followed by the payload:
//!
//! ```text
//! ┌──────────┬──────────────┐
//! │ Length   │ Payload      │
//! │ 4 bytes  │ Length bytes │
//! │ u32 BE   │              │
//! └──────────┴──────────────┘
//! ```
//!
//! [`MessageBuffer`] accumulates partial reads and extracts complete
//! payloads; it is a state machine over `bytes::BytesMut`:
//! - `WaitingForLength`: need at least 4 bytes
//! - `WaitingForPayload`: length parsed, need N more payload bytes

use bytes::{Bytes, BytesMut};

use crate::error::{CmdwireError, Result};

/// Length prefix size in bytes (fixed, exactly 4).
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum message size (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Prefix a payload with its big-endian length.
pub fn frame_message(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// State machine for message extraction.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete length prefix (need 4 bytes).
    WaitingForLength,
    /// Length parsed, waiting for payload bytes.
    WaitingForPayload { length: usize },
}

/// Buffer accumulating incoming bytes and extracting complete messages.
///
/// All data is stored in a single `BytesMut` buffer; extracted payloads are
/// zero-copy `Bytes` slices of it.
pub struct MessageBuffer {
    /// Accumulated bytes from transport reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed message size.
    max_message_size: u32,
}

impl MessageBuffer {
    /// Create a message buffer with the default maximum message size.
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a message buffer with a custom maximum message size.
    pub fn with_max_message_size(max_message_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForLength,
            max_message_size,
        }
    }

    /// Push data into the buffer and extract all complete messages.
    ///
    /// Returns the complete payloads in arrival order (may be empty while
    /// waiting for more data); fragments are buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`CmdwireError::Protocol`] when a length prefix exceeds the
    /// configured maximum.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();
        while let Some(message) = self.try_extract_one()? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Try to extract a single message from the buffer.
    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        match self.state {
            State::WaitingForLength => {
                if self.buffer.len() < LENGTH_PREFIX_SIZE {
                    return Ok(None);
                }

                let length = u32::from_be_bytes([
                    self.buffer[0],
                    self.buffer[1],
                    self.buffer[2],
                    self.buffer[3],
                ]);

                if length > self.max_message_size {
                    return Err(CmdwireError::Protocol(format!(
                        "message size {} exceeds maximum {}",
                        length, self.max_message_size
                    )));
                }

                let _ = self.buffer.split_to(LENGTH_PREFIX_SIZE);

                if length == 0 {
                    return Ok(Some(Bytes::new()));
                }

                self.state = State::WaitingForPayload {
                    length: length as usize,
                };
                self.try_extract_one()
            }

            State::WaitingForPayload { length } => {
                if self.buffer.len() < length {
                    return Ok(None);
                }

                let payload = self.buffer.split_to(length).freeze();
                self.state = State::WaitingForLength;
                Ok(Some(payload))
            }
        }
    }

    /// Number of buffered bytes still waiting for completion.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForLength;
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}
