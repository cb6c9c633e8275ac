//! Router module - frame classification and notification dispatch.
//!
//! Provides:
//! - [`Notification`] - the tagged union consumed by the caller's dispatch
//!   loop
//! - [`CommandContext`] - per-request handle with bound respond/handshake
//!   methods

mod context;
mod dispatch;
mod notification;

pub use context::CommandContext;
pub use notification::{CommandNotification, LegacyCommandNotification, Notification};

pub(crate) use dispatch::Router;
