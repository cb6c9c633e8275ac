//! Per-request command context.
//!
//! Command notifications carry a `CommandContext` instead of free-floating
//! callbacks: an explicit value capturing the request id and a handle to the
//! owning connection, with methods for the two things a command handler can
//! do — respond, or run the encryption handshake.

use serde_json::{Map, Value};

use crate::connection::Connection;
use crate::error::Result;
use crate::protocol::RequestId;

/// Context passed to command handlers through command notifications.
///
/// Cloneable; holding one keeps the owning connection's shared state alive.
#[derive(Clone)]
pub struct CommandContext {
    /// Correlation token of the originating request.
    request_id: RequestId,
    /// Command line, when the request carried one (the modern wire shape).
    command_line: Option<String>,
    /// Owning connection.
    connection: Connection,
}

impl CommandContext {
    pub(crate) fn new(
        request_id: RequestId,
        command_line: Option<String>,
        connection: Connection,
    ) -> Self {
        Self {
            request_id,
            command_line,
            connection,
        }
    }

    /// Correlation token of the originating request.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Send a `commandResponse` frame correlated to this request.
    pub async fn respond(&self, body: Map<String, Value>) -> Result<()> {
        self.connection
            .respond_command(self.request_id.clone(), body)
            .await
    }

    /// Run the encryption handshake if this request's command line is the
    /// handshake trigger.
    ///
    /// Returns `Ok(false)` when the command is not a handshake (including
    /// legacy requests, which have no command line); the handler should then
    /// treat the command normally.
    pub async fn handle_encryption_handshake(&self) -> Result<bool> {
        match &self.command_line {
            Some(command_line) => {
                self.connection
                    .handle_encryption_handshake(self.request_id.clone(), command_line)
                    .await
            }
            None => Ok(false),
        }
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}
