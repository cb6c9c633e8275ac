//! Purpose-based frame routing.
//!
//! Classifies each decoded frame by `messagePurpose` and emits the typed
//! notification, then the generic one, into the connection's notification
//! channel. Subscription frames consult the table first so duplicates are
//! absorbed without notifying.

use tokio::sync::mpsc;

use super::context::CommandContext;
use super::notification::{CommandNotification, LegacyCommandNotification, Notification};
use crate::connection::Connection;
use crate::protocol::{Frame, MessagePurpose};

/// Router bound to one connection's notification channel.
pub(crate) struct Router {
    connection: Connection,
    notifications: mpsc::Sender<Notification>,
}

impl Router {
    pub(crate) fn new(connection: Connection, notifications: mpsc::Sender<Notification>) -> Self {
        Self {
            connection,
            notifications,
        }
    }

    /// Route one inbound frame: typed notification first (when one applies),
    /// then the generic `Message` notification.
    pub(crate) async fn route(&self, frame: Frame) {
        if let Some(typed) = self.classify(&frame) {
            self.emit(typed).await;
        }
        self.emit(Notification::Message { frame }).await;
    }

    /// Build the typed notification for a frame, applying subscription
    /// transitions as a side effect.
    fn classify(&self, frame: &Frame) -> Option<Notification> {
        match frame.purpose() {
            MessagePurpose::Subscribe | MessagePurpose::Unsubscribe => {
                let subscribing = frame.purpose() == &MessagePurpose::Subscribe;
                let Some(event_name) = frame.body.get("eventName").and_then(|v| v.as_str()) else {
                    tracing::warn!(
                        purpose = %frame.purpose(),
                        "subscription frame without eventName"
                    );
                    return None;
                };

                let transitioned = if subscribing {
                    self.connection.apply_subscribe(event_name)
                } else {
                    self.connection.apply_unsubscribe(event_name)
                };
                if !transitioned {
                    tracing::debug!(event_name, subscribing, "duplicate subscription absorbed");
                    return None;
                }

                let event_name = event_name.to_string();
                let frame = frame.clone();
                Some(if subscribing {
                    Notification::Subscribe { event_name, frame }
                } else {
                    Notification::Unsubscribe { event_name, frame }
                })
            }

            MessagePurpose::CommandRequest => {
                let request_id = frame.request_id().clone();
                match frame.command_line().filter(|line| !line.is_empty()) {
                    Some(command_line) => {
                        let command_line = command_line.to_string();
                        let context = CommandContext::new(
                            request_id.clone(),
                            Some(command_line.clone()),
                            self.connection.clone(),
                        );
                        Some(Notification::Command(CommandNotification {
                            request_id,
                            command_line,
                            context,
                            frame: frame.clone(),
                        }))
                    }
                    None => {
                        let context =
                            CommandContext::new(request_id.clone(), None, self.connection.clone());
                        Some(Notification::CommandLegacy(LegacyCommandNotification {
                            request_id,
                            command_name: frame.command_name().map(str::to_string),
                            overload: frame.command_overload().map(str::to_string),
                            input: frame.command_input().cloned(),
                            context,
                            frame: frame.clone(),
                        }))
                    }
                }
            }

            _ => Some(Notification::CustomFrame {
                frame: frame.clone(),
            }),
        }
    }

    async fn emit(&self, notification: Notification) {
        if self.notifications.send(notification).await.is_err() {
            tracing::trace!("notification receiver dropped");
        }
    }
}
