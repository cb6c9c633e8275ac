//! Transport module - byte-stream plumbing.
//!
//! The protocol core is transport-agnostic: anything implementing tokio's
//! `AsyncRead + AsyncWrite` can carry a connection. This module supplies the
//! plumbing around that seam:
//! - Length-prefixed message framing over raw byte streams
//! - A TCP connect helper

mod message;
mod tcp;

pub use message::{frame_message, MessageBuffer, DEFAULT_MAX_MESSAGE_SIZE, LENGTH_PREFIX_SIZE};
pub use tcp::connect;
