//! Notification taxonomy.
//!
//! Every inbound frame produces exactly one typed notification followed by
//! one generic [`Notification::Message`], in that order. The caller consumes
//! them from the connection's notification channel and dispatches on the
//! variant.

use serde_json::{Map, Value};

use super::context::CommandContext;
use crate::protocol::{Frame, RequestId};

/// Typed notifications emitted by a connection.
#[derive(Debug)]
pub enum Notification {
    /// Remote peer newly subscribed to an event. Emitted only on a real
    /// table transition; duplicates are absorbed.
    Subscribe {
        /// Event the peer wants pushed to it.
        event_name: String,
        /// The decoded frame.
        frame: Frame,
    },
    /// Remote peer newly unsubscribed from an event. Emitted only on a real
    /// table transition; duplicates are absorbed.
    Unsubscribe {
        /// Event the peer no longer wants.
        event_name: String,
        /// The decoded frame.
        frame: Frame,
    },
    /// Command request carrying a command line.
    Command(CommandNotification),
    /// Command request in the older, pre-command-line wire shape.
    CommandLegacy(LegacyCommandNotification),
    /// Frame with a purpose outside the routed vocabulary.
    CustomFrame {
        /// The decoded frame, unmodified.
        frame: Frame,
    },
    /// Generic notification emitted for every inbound frame, after its
    /// typed notification.
    Message {
        /// The decoded frame.
        frame: Frame,
    },
    /// Transport encryption became active. Fires exactly once per
    /// connection.
    EncryptionEnabled,
    /// The connection closed (peer close, local disconnect, or protocol
    /// desync). Terminal.
    Disconnect,
}

/// Payload of a [`Notification::Command`].
#[derive(Debug)]
pub struct CommandNotification {
    /// Correlation token of the request.
    pub request_id: RequestId,
    /// The command line to execute.
    pub command_line: String,
    /// Per-request handle for responding or running the encryption
    /// handshake.
    pub context: CommandContext,
    /// The decoded frame.
    pub frame: Frame,
}

/// Payload of a [`Notification::CommandLegacy`].
#[derive(Debug)]
pub struct LegacyCommandNotification {
    /// Correlation token of the request.
    pub request_id: RequestId,
    /// `body.name` of the legacy request.
    pub command_name: Option<String>,
    /// `body.overload` of the legacy request.
    pub overload: Option<String>,
    /// `body.input` of the legacy request.
    pub input: Option<Map<String, Value>>,
    /// Per-request handle for responding.
    pub context: CommandContext,
    /// The decoded frame.
    pub frame: Frame,
}
