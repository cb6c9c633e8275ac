//! Command host demo - respond to commands and push subscribed events.
//!
//! Dials a remote host over TCP, answers every command request with a
//! status body, and publishes a heartbeat event that only goes out while
//! the peer is subscribed to it.
//!
//! Run with:
//!
//! ```text
//! cargo run --example command_host -- 127.0.0.1:19131
//! ```

use std::time::Duration;

use cmdwire::{Connection, Notification, ProtocolVersion};
use serde_json::{json, Map};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:19131".to_string());

    let (connection, mut notifications) = Connection::builder()
        .version(ProtocolVersion::V2)
        .connect(&addr)
        .await?;
    tracing::info!(%addr, "connected");

    // Heartbeat publisher: a no-op until the peer subscribes.
    let publisher = connection.clone();
    tokio::spawn(async move {
        let mut seq = 0u64;
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            seq += 1;
            let mut body = Map::new();
            body.insert("seq".to_string(), json!(seq));
            if let Err(e) = publisher.publish_event("heartbeat", body).await {
                tracing::warn!("heartbeat publish failed: {e}");
                break;
            }
        }
    });

    while let Some(notification) = notifications.recv().await {
        match notification {
            Notification::Command(cmd) => {
                if cmd.context.handle_encryption_handshake().await? {
                    continue;
                }
                tracing::info!(command = %cmd.command_line, "command received");
                let mut body = Map::new();
                body.insert("statusCode".to_string(), json!(0));
                body.insert("statusMessage".to_string(), json!("ok"));
                cmd.context.respond(body).await?;
            }
            Notification::CommandLegacy(cmd) => {
                tracing::info!(name = ?cmd.command_name, "legacy command received");
                cmd.context.respond(Map::new()).await?;
            }
            Notification::Subscribe { event_name, .. } => {
                tracing::info!(event_name, "peer subscribed");
            }
            Notification::Unsubscribe { event_name, .. } => {
                tracing::info!(event_name, "peer unsubscribed");
            }
            Notification::EncryptionEnabled => {
                tracing::info!("encryption enabled");
            }
            Notification::Disconnect => break,
            _ => {}
        }
    }

    notifications.closed().await?;
    Ok(())
}
