//! Codec module - frame serialization.
//!
//! One codec, one envelope: frames travel as JSON documents, optionally
//! transformed by the connection's encryption session. The codec is a marker
//! struct with static methods so there is no per-frame state to thread
//! around.

mod json;

pub use json::FrameCodec;
