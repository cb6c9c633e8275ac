//! Encryption engine seam and session adapter.
//!
//! The cryptographic algorithm lives behind the [`EncryptionEngine`] trait;
//! this module only knows the handshake choreography. A session is
//! established when the remote peer sends a `commandRequest` whose command
//! line starts with the `enableencryption` token followed by two
//! space-separated JSON-encoded arguments: its public key and a salt.
//!
//! Once a session is installed on a connection it is never cleared; every
//! later inbound and outbound payload passes through it.

use crate::error::{CmdwireError, Result};

/// Command token that triggers the encryption handshake.
pub const HANDSHAKE_COMMAND: &str = "enableencryption";

/// Local key-exchange parameters produced by [`EncryptionEngine::begin_key_exchange`].
#[derive(Debug, Clone)]
pub struct KeyExchangeParams {
    /// Local public key, sent back to the peer in the plaintext
    /// `commandResponse` that completes the handshake.
    pub public_key: String,
}

/// External cryptographic engine performing key exchange and symmetric
/// transformation of serialized frame bytes.
///
/// `encrypt`/`decrypt` may be stateful (stream ciphers keep a rolling IV),
/// hence `&mut self` throughout.
pub trait EncryptionEngine: Send {
    /// Generate local key-exchange parameters, including the public key.
    fn begin_key_exchange(&mut self) -> KeyExchangeParams;

    /// Derive the shared symmetric state from the peer's parameters.
    fn complete_key_exchange(&mut self, remote_public_key: &str, remote_salt: &str) -> Result<()>;

    /// Transform outbound serialized frame bytes.
    fn encrypt(&mut self, data: &[u8]) -> Vec<u8>;

    /// Transform inbound raw bytes back into serialized frame bytes.
    fn decrypt(&mut self, data: &[u8]) -> Vec<u8>;
}

/// Factory producing a fresh engine for each handshake attempt.
pub type EngineFactory = Box<dyn Fn() -> Box<dyn EncryptionEngine> + Send + Sync>;

/// Parsed `enableencryption` trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Remote public key (first argument, JSON-decoded).
    pub public_key: String,
    /// Remote salt/IV parameter (second argument, JSON-decoded).
    pub salt: String,
}

impl HandshakeRequest {
    /// Parse a command line as a handshake trigger.
    ///
    /// Returns `Ok(None)` when the line is not a handshake at all (the
    /// caller treats the command normally), `Err(MalformedHandshake)` when
    /// the token is present but the arguments are missing or undecodable.
    pub fn parse(command_line: &str) -> Result<Option<Self>> {
        let Some(rest) = command_line.strip_prefix(HANDSHAKE_COMMAND) else {
            return Ok(None);
        };
        let Some(rest) = rest.strip_prefix(' ') else {
            return Ok(None);
        };

        let mut args = rest.split(' ');
        let (Some(public_key), Some(salt)) = (args.next(), args.next()) else {
            return Err(CmdwireError::MalformedHandshake(
                "expected two key-exchange arguments".to_string(),
            ));
        };

        let public_key: String = serde_json::from_str(public_key)
            .map_err(|e| CmdwireError::MalformedHandshake(format!("public key: {e}")))?;
        let salt: String = serde_json::from_str(salt)
            .map_err(|e| CmdwireError::MalformedHandshake(format!("salt: {e}")))?;

        Ok(Some(Self { public_key, salt }))
    }
}

/// Active encryption session owned by a connection.
///
/// Thin adapter over the engine: it exists only after a completed key
/// exchange, so holding one is the proof that encryption is active.
pub struct EncryptionSession {
    engine: Box<dyn EncryptionEngine>,
}

impl EncryptionSession {
    /// Run the key exchange against a fresh engine.
    ///
    /// Returns the ready session together with the local parameters the
    /// caller must send back to the peer before installing the session.
    pub fn establish(
        mut engine: Box<dyn EncryptionEngine>,
        request: &HandshakeRequest,
    ) -> Result<(Self, KeyExchangeParams)> {
        let params = engine.begin_key_exchange();
        engine.complete_key_exchange(&request.public_key, &request.salt)?;
        Ok((Self { engine }, params))
    }

    /// Transform outbound serialized frame bytes.
    pub fn encrypt(&mut self, data: &[u8]) -> Vec<u8> {
        self.engine.encrypt(data)
    }

    /// Transform inbound raw bytes.
    pub fn decrypt(&mut self, data: &[u8]) -> Vec<u8> {
        self.engine.decrypt(data)
    }
}

impl std::fmt::Debug for EncryptionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionSession").finish_non_exhaustive()
    }
}
