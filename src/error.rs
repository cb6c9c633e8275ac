//! Error types for cmdwire.

use thiserror::Error;

/// Main error type for all cmdwire operations.
#[derive(Debug, Error)]
pub enum CmdwireError {
    /// I/O error from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error on the outbound path.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Inbound bytes could not be decoded into a frame (undecodable JSON or
    /// a header missing `messagePurpose`). Indicates protocol desync.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Encryption handshake command carried missing or undecodable
    /// key-exchange arguments.
    #[error("malformed encryption handshake: {0}")]
    MalformedHandshake(String),

    /// A handshake was attempted while a session is already active.
    #[error("encryption handshake already active")]
    HandshakeAlreadyActive,

    /// A handshake was attempted but no encryption engine was configured.
    #[error("no encryption engine configured")]
    EncryptionUnavailable,

    /// The encryption engine rejected the key exchange.
    #[error("key exchange failed: {0}")]
    KeyExchange(String),

    /// Protocol violation (oversized message, invalid framing, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Connection closed while sending.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using CmdwireError.
pub type Result<T> = std::result::Result<T, CmdwireError>;
