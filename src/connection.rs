//! Connection facade and lifecycle.
//!
//! The [`ConnectionBuilder`] configures a connection; [`ConnectionBuilder::start`]
//! wires it onto any `AsyncRead + AsyncWrite` stream and spawns the two
//! per-connection tasks:
//! 1. The writer task draining outbound messages (see [`crate::writer`])
//! 2. The read loop: accumulate bytes, decode frames, route notifications
//!
//! The [`Connection`] handle is cheaply cloneable; observers hold clones to
//! respond to commands or publish events from inside the dispatch loop. The
//! [`Notifications`] stream yields routed notifications in order and
//! surfaces the read loop's terminal result through [`Notifications::closed`].
//!
//! # Example
//!
//! ```ignore
//! use cmdwire::{Connection, Notification, ProtocolVersion};
//! use serde_json::Map;
//!
//! #[tokio::main]
//! async fn main() -> cmdwire::Result<()> {
//!     let (connection, mut notifications) = Connection::builder()
//!         .version(ProtocolVersion::V2)
//!         .connect("127.0.0.1:19131")
//!         .await?;
//!
//!     while let Some(notification) = notifications.recv().await {
//!         match notification {
//!             Notification::Command(cmd) => {
//!                 cmd.context.respond(Map::new()).await?;
//!             }
//!             Notification::Disconnect => break,
//!             _ => {}
//!         }
//!     }
//!     notifications.closed().await
//! }
//! ```

use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::ToSocketAddrs;
use tokio::sync::{mpsc, oneshot};

use crate::codec::FrameCodec;
use crate::encryption::{EncryptionEngine, EncryptionSession, EngineFactory, HandshakeRequest};
use crate::error::{CmdwireError, Result};
use crate::protocol::{Frame, Header, MessagePurpose, ProtocolVersion, RequestId};
use crate::router::{Notification, Router};
use crate::subscription::SubscriptionTable;
use crate::transport::{self, MessageBuffer, DEFAULT_MAX_MESSAGE_SIZE};
use crate::writer::{spawn_writer_task, WriterHandle, DEFAULT_WRITER_CAPACITY};

/// Default capacity of the notification channel.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 64;

/// Read buffer size for the read loop.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Builder for configuring and starting a connection.
pub struct ConnectionBuilder {
    version: ProtocolVersion,
    engine_factory: Option<EngineFactory>,
    notification_capacity: usize,
    writer_capacity: usize,
    max_message_size: u32,
}

impl ConnectionBuilder {
    /// Create a builder with default configuration (V1, no encryption
    /// engine).
    pub fn new() -> Self {
        Self {
            version: ProtocolVersion::default(),
            engine_factory: None,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            writer_capacity: DEFAULT_WRITER_CAPACITY,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Set the protocol version (fixed for the connection's lifetime).
    pub fn version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    /// Supply the encryption engine factory.
    ///
    /// A fresh engine is created for each handshake attempt. Without a
    /// factory, handshake triggers fail with
    /// [`CmdwireError::EncryptionUnavailable`].
    pub fn with_encryption<F, E>(mut self, factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
        E: EncryptionEngine + 'static,
    {
        self.engine_factory = Some(Box::new(move || Box::new(factory())));
        self
    }

    /// Set the notification channel capacity. Default: 64.
    pub fn notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Set the maximum inbound message size. Default: 16 MiB.
    pub fn max_message_size(mut self, size: u32) -> Self {
        self.max_message_size = size;
        self
    }

    /// Connect over TCP and start the connection.
    pub async fn connect(self, addr: impl ToSocketAddrs) -> Result<(Connection, Notifications)> {
        let stream = transport::connect(addr).await?;
        Ok(self.start(stream))
    }

    /// Start the connection on an established byte stream.
    pub fn start<S>(self, stream: S) -> (Connection, Notifications)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, write_half) = tokio::io::split(stream);
        let (writer, _writer_task) = spawn_writer_task(write_half, self.writer_capacity);

        let (notify_tx, notify_rx) = mpsc::channel(self.notification_capacity);
        let (close_tx, close_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        let connection = Connection {
            shared: Arc::new(Shared {
                version: self.version,
                writer,
                subscriptions: Mutex::new(SubscriptionTable::new()),
                encryption: Mutex::new(None),
                engine_factory: self.engine_factory,
                notifications: notify_tx.clone(),
            }),
            close: Arc::new(Mutex::new(Some(close_tx))),
        };

        let conn = connection.clone();
        let max_message_size = self.max_message_size;
        tokio::spawn(async move {
            let result = read_loop(&conn, reader, close_rx, max_message_size).await;
            match &result {
                Ok(()) => tracing::debug!("connection closed"),
                Err(e) => tracing::error!("read loop error: {e}"),
            }
            let _ = notify_tx.send(Notification::Disconnect).await;
            let _ = done_tx.send(result);
        });

        (
            connection,
            Notifications {
                rx: notify_rx,
                done: done_rx,
            },
        )
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared per-connection state.
struct Shared {
    /// Negotiated protocol version, fixed at construction.
    version: ProtocolVersion,
    /// Handle to the writer task.
    writer: WriterHandle,
    /// Which events the peer currently wants pushed.
    subscriptions: Mutex<SubscriptionTable>,
    /// Active encryption session; never cleared once installed.
    encryption: Mutex<Option<EncryptionSession>>,
    /// Factory for handshake-time engine creation.
    engine_factory: Option<EngineFactory>,
    /// Sender side of the notification channel.
    notifications: mpsc::Sender<Notification>,
}

/// Handle to a running connection.
///
/// Cheaply cloneable; all clones drive the same transport and share the same
/// subscription and encryption state.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
    /// Signal that stops the read loop on local disconnect.
    close: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl Connection {
    /// Create a connection builder.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// The protocol version this connection stamps on outbound frames.
    pub fn version(&self) -> ProtocolVersion {
        self.shared.version
    }

    /// True once an encryption session is active.
    pub fn is_encrypted(&self) -> bool {
        self.shared
            .encryption
            .lock()
            .expect("encryption lock poisoned")
            .is_some()
    }

    /// True if the peer is currently subscribed to an event.
    pub fn is_subscribed(&self, event_name: &str) -> bool {
        self.shared
            .subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .is_subscribed(event_name)
    }

    /// Encode a frame (encrypting when active) and queue it on the writer.
    pub async fn send_message(&self, frame: &Frame) -> Result<()> {
        let data = {
            let mut encryption = self
                .shared
                .encryption
                .lock()
                .expect("encryption lock poisoned");
            FrameCodec::encode(frame, encryption.as_mut())?
        };
        self.shared.writer.send(data).await
    }

    /// Compose a header and body and send the frame.
    ///
    /// The header carries the connection's version; a missing `request_id`
    /// is filled with the nil sentinel.
    pub async fn send_frame(
        &self,
        purpose: MessagePurpose,
        body: Map<String, Value>,
        request_id: Option<RequestId>,
        extra_headers: Option<Map<String, Value>>,
    ) -> Result<()> {
        let mut header = Header::new(purpose, self.shared.version);
        if let Some(request_id) = request_id {
            header = header.with_request_id(request_id);
        }
        if let Some(extra) = extra_headers {
            header.extra.extend(extra);
        }
        self.send_message(&Frame::new(header, body)).await
    }

    /// Send an `error`-purpose frame.
    pub async fn send_error(
        &self,
        status_code: i64,
        status_message: &str,
        request_id: Option<RequestId>,
    ) -> Result<()> {
        let mut body = Map::new();
        body.insert("statusCode".to_string(), json!(status_code));
        body.insert("statusMessage".to_string(), json!(status_message));
        self.send_frame(MessagePurpose::Error, body, request_id, None)
            .await
    }

    /// Send an event frame.
    ///
    /// V2 carries `eventName` in the header and leaves the body untouched;
    /// V1 merges `eventName` into the body. This asymmetry is a
    /// protocol-version contract.
    pub async fn send_event(&self, event_name: &str, body: Map<String, Value>) -> Result<()> {
        match self.shared.version {
            ProtocolVersion::V2 => {
                let mut extra = Map::new();
                extra.insert("eventName".to_string(), json!(event_name));
                self.send_frame(MessagePurpose::Event, body, None, Some(extra))
                    .await
            }
            ProtocolVersion::V1 => {
                let mut body = body;
                body.insert("eventName".to_string(), json!(event_name));
                self.send_frame(MessagePurpose::Event, body, None, None).await
            }
        }
    }

    /// Send an event only if the peer subscribed to it; silent no-op
    /// otherwise. Never transmit events nobody asked for.
    pub async fn publish_event(&self, event_name: &str, body: Map<String, Value>) -> Result<()> {
        if !self.is_subscribed(event_name) {
            tracing::trace!(event_name, "publish skipped, no subscription");
            return Ok(());
        }
        self.send_event(event_name, body).await
    }

    /// Send a `commandResponse` frame correlated to a request.
    pub async fn respond_command(
        &self,
        request_id: RequestId,
        body: Map<String, Value>,
    ) -> Result<()> {
        self.send_frame(MessagePurpose::CommandResponse, body, Some(request_id), None)
            .await
    }

    /// Issue a `commandRequest` to the remote host.
    ///
    /// Mints a fresh request id, stamps it on the frame and returns it so
    /// the caller can correlate the eventual `commandResponse`.
    pub async fn send_command(&self, command_line: &str) -> Result<RequestId> {
        let request_id = RequestId::generate();
        let mut body = Map::new();
        body.insert("commandLine".to_string(), json!(command_line));
        self.send_frame(
            MessagePurpose::CommandRequest,
            body,
            Some(request_id.clone()),
            None,
        )
        .await?;
        Ok(request_id)
    }

    /// Run the encryption handshake for an inbound command request.
    ///
    /// Returns `Ok(false)` when the command line is not the handshake
    /// trigger. On a valid trigger: runs the key exchange against a fresh
    /// engine, sends the plaintext `commandResponse` carrying the local
    /// public key, installs the session and emits
    /// [`Notification::EncryptionEnabled`].
    ///
    /// # Errors
    ///
    /// - [`CmdwireError::HandshakeAlreadyActive`] when a session is already
    ///   installed; the established session is never replaced.
    /// - [`CmdwireError::EncryptionUnavailable`] when no engine factory was
    ///   configured.
    /// - [`CmdwireError::MalformedHandshake`] / [`CmdwireError::KeyExchange`]
    ///   on bad trigger arguments or a failed exchange.
    pub async fn handle_encryption_handshake(
        &self,
        request_id: RequestId,
        command_line: &str,
    ) -> Result<bool> {
        let Some(request) = HandshakeRequest::parse(command_line)? else {
            return Ok(false);
        };

        if self.is_encrypted() {
            return Err(CmdwireError::HandshakeAlreadyActive);
        }
        let factory = self
            .shared
            .engine_factory
            .as_ref()
            .ok_or(CmdwireError::EncryptionUnavailable)?;

        let (session, params) = EncryptionSession::establish(factory(), &request)?;

        // The response must go out before the session is installed: the peer
        // needs the local public key in plaintext to finish its own side.
        let mut body = Map::new();
        body.insert("publicKey".to_string(), json!(params.public_key));
        body.insert("statusCode".to_string(), json!(0));
        self.respond_command(request_id, body).await?;

        {
            let mut encryption = self
                .shared
                .encryption
                .lock()
                .expect("encryption lock poisoned");
            if encryption.is_some() {
                return Err(CmdwireError::HandshakeAlreadyActive);
            }
            *encryption = Some(session);
        }

        let _ = self
            .shared
            .notifications
            .send(Notification::EncryptionEnabled)
            .await;
        tracing::debug!("transport encryption enabled");
        Ok(true)
    }

    /// Close the transport.
    ///
    /// Stops the read loop (which surfaces [`Notification::Disconnect`]) and
    /// shuts down the write half after queued messages are flushed.
    pub async fn disconnect(&self) {
        if let Some(close) = self
            .close
            .lock()
            .expect("close signal lock poisoned")
            .take()
        {
            let _ = close.send(());
        }
        self.shared.writer.shutdown().await;
    }

    /// Apply an inbound subscribe transition. True when state changed.
    pub(crate) fn apply_subscribe(&self, event_name: &str) -> bool {
        self.shared
            .subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .subscribe(event_name)
    }

    /// Apply an inbound unsubscribe transition. True when state changed.
    pub(crate) fn apply_unsubscribe(&self, event_name: &str) -> bool {
        self.shared
            .subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .unsubscribe(event_name)
    }

    /// Decode one inbound message, decrypting when a session is active.
    fn decode_message(&self, raw: &[u8]) -> Result<Frame> {
        let mut encryption = self
            .shared
            .encryption
            .lock()
            .expect("encryption lock poisoned");
        FrameCodec::decode(raw, encryption.as_mut())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("version", &self.shared.version)
            .field("encrypted", &self.is_encrypted())
            .finish_non_exhaustive()
    }
}

/// Stream of notifications from a running connection.
pub struct Notifications {
    rx: mpsc::Receiver<Notification>,
    done: oneshot::Receiver<Result<()>>,
}

impl Notifications {
    /// Receive the next notification.
    ///
    /// [`Notification::Disconnect`] is the last notification a connection
    /// emits; `None` follows once every [`Connection`] handle has been
    /// dropped.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Consume the stream and return the read loop's terminal result.
    ///
    /// `Ok(())` for a peer close or local disconnect; an error when the
    /// connection died on undecodable input (protocol desync) or transport
    /// failure.
    pub async fn closed(self) -> Result<()> {
        let Notifications { rx, done } = self;
        // Unblock the read task if notifications are still queued.
        drop(rx);
        match done.await {
            Ok(result) => result,
            Err(_) => Ok(()),
        }
    }
}

/// Read loop: accumulate transport bytes, decode frames, route them.
///
/// Each inbound message is processed to completion (decode, route, notify)
/// before the next one is read.
async fn read_loop<R>(
    connection: &Connection,
    mut reader: R,
    mut close_rx: oneshot::Receiver<()>,
    max_message_size: u32,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let router = Router::new(connection.clone(), connection.shared.notifications.clone());
    let mut messages = MessageBuffer::with_max_message_size(max_message_size);
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = tokio::select! {
            _ = &mut close_rx => return Ok(()),
            read = reader.read(&mut buf) => match read {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) => return Err(CmdwireError::Io(e)),
            },
        };

        for raw in messages.push(&buf[..n])? {
            let frame = connection.decode_message(&raw)?;
            router.route(frame).await;
        }
    }
}
