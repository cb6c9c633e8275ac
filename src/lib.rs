//! # cmdwire
//!
//! Client endpoint for a bidirectional, framed, JSON-over-socket command
//! protocol: drive a remote host by issuing commands, receive command
//! responses, push subscribed events, and optionally negotiate transport
//! encryption in-band.
//!
//! ## Architecture
//!
//! - **Protocol**: JSON frame envelope (header + body) with a fixed
//!   message-purpose vocabulary
//! - **Transport**: any `AsyncRead + AsyncWrite` byte stream, carrying
//!   length-prefixed messages
//! - **Routing**: each inbound frame yields one typed [`Notification`]
//!   followed by a generic `Message` notification, consumed from a channel
//!
//! ## Example
//!
//! ```ignore
//! use cmdwire::{Connection, Notification};
//! use serde_json::{json, Map};
//!
//! #[tokio::main]
//! async fn main() -> cmdwire::Result<()> {
//!     let (connection, mut notifications) =
//!         Connection::builder().connect("127.0.0.1:19131").await?;
//!
//!     while let Some(notification) = notifications.recv().await {
//!         match notification {
//!             Notification::Command(cmd) => {
//!                 if cmd.context.handle_encryption_handshake().await? {
//!                     continue;
//!                 }
//!                 let mut body = Map::new();
//!                 body.insert("statusCode".to_string(), json!(0));
//!                 cmd.context.respond(body).await?;
//!             }
//!             Notification::Subscribe { event_name, .. } => {
//!                 println!("peer wants {event_name}");
//!             }
//!             Notification::Disconnect => break,
//!             _ => {}
//!         }
//!     }
//!     notifications.closed().await
//! }
//! ```

pub mod codec;
pub mod encryption;
pub mod error;
pub mod protocol;
pub mod router;
pub mod subscription;
pub mod transport;

mod connection;
mod writer;

pub use connection::{
    Connection, ConnectionBuilder, Notifications, DEFAULT_NOTIFICATION_CAPACITY,
};
pub use encryption::{
    EncryptionEngine, EncryptionSession, HandshakeRequest, KeyExchangeParams, HANDSHAKE_COMMAND,
};
pub use error::{CmdwireError, Result};
pub use protocol::{
    Frame, Header, MessagePurpose, ProtocolVersion, RequestId, DEFAULT_PROTOCOL_VERSION,
    NIL_REQUEST_ID,
};
pub use router::{CommandContext, CommandNotification, LegacyCommandNotification, Notification};
pub use subscription::SubscriptionTable;
