//! Dedicated writer task for outbound messages.
//!
//! All send paths funnel into an mpsc channel drained by a single task that
//! owns the transport's write half. This keeps sends fire-and-forget for
//! callers (including observers responding from inside the dispatch path)
//! while preserving FIFO order on the wire.
//!
//! ```text
//! send_*() ──┐
//! respond() ─┼─► mpsc::Sender<WriterCommand> ─► Writer Task ─► transport
//! publish() ─┘
//! ```
//!
//! Ready messages are batched into single `write_vectored` calls; a partial
//! write resumes from the exact byte where the kernel stopped.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{CmdwireError, Result};
use crate::transport::LENGTH_PREFIX_SIZE;

/// Default writer channel capacity.
pub const DEFAULT_WRITER_CAPACITY: usize = 256;

/// Maximum messages to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 32;

/// A message ready to be written to the transport.
#[derive(Debug)]
pub struct OutboundMessage {
    /// Pre-encoded big-endian length prefix.
    prefix: [u8; LENGTH_PREFIX_SIZE],
    /// Serialized (and possibly encrypted) frame bytes.
    payload: Bytes,
}

impl OutboundMessage {
    /// Create an outbound message for the given payload.
    pub fn new(payload: Bytes) -> Self {
        Self {
            prefix: (payload.len() as u32).to_be_bytes(),
            payload,
        }
    }

    /// Total size on the wire (prefix + payload).
    #[inline]
    pub fn size(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.payload.len()
    }
}

/// Commands accepted by the writer task.
#[derive(Debug)]
enum WriterCommand {
    /// Write one message.
    Message(OutboundMessage),
    /// Flush pending work, shut down the write half and exit.
    Shutdown,
}

/// Handle for sending messages to the writer task.
///
/// Cheaply cloneable; every connection clone shares the same task.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<WriterCommand>,
}

impl WriterHandle {
    /// Queue a payload for writing.
    ///
    /// # Errors
    ///
    /// Returns [`CmdwireError::ConnectionClosed`] when the writer task has
    /// exited.
    pub async fn send(&self, payload: Bytes) -> Result<()> {
        self.tx
            .send(WriterCommand::Message(OutboundMessage::new(payload)))
            .await
            .map_err(|_| CmdwireError::ConnectionClosed)
    }

    /// Ask the writer task to shut down the write half and exit.
    ///
    /// Queued messages are written first. Safe to call after the task has
    /// already exited.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(WriterCommand::Shutdown).await;
    }
}

/// Spawn the writer task and return a handle for sending messages.
pub fn spawn_writer_task<W>(writer: W, capacity: usize) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Main writer loop - receives commands and writes messages to the stream.
async fn writer_loop<W>(mut rx: mpsc::Receiver<WriterCommand>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        // Wait for the next command.
        let first = match rx.recv().await {
            Some(c) => c,
            None => return Ok(()), // All handles dropped, clean shutdown.
        };

        let mut shutdown = false;
        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        match first {
            WriterCommand::Message(m) => batch.push(m),
            WriterCommand::Shutdown => shutdown = true,
        }

        // Collect additional ready commands without blocking.
        while !shutdown && batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(WriterCommand::Message(m)) => batch.push(m),
                Ok(WriterCommand::Shutdown) => shutdown = true,
                Err(_) => break,
            }
        }

        write_batch(&mut writer, &batch).await?;

        if shutdown {
            writer.shutdown().await?;
            return Ok(());
        }
    }
}

/// Write a batch of messages using scatter/gather I/O.
///
/// Each message contributes two slices (prefix, payload); a single vectored
/// write covers the whole batch in the common case, with a resume path for
/// partial writes.
async fn write_batch<W>(writer: &mut W, batch: &[OutboundMessage]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if batch.is_empty() {
        return Ok(());
    }

    let mut slices: Vec<IoSlice<'_>> = Vec::with_capacity(batch.len() * 2);
    for message in batch {
        slices.push(IoSlice::new(&message.prefix));
        if !message.payload.is_empty() {
            slices.push(IoSlice::new(&message.payload));
        }
    }

    let total_size: usize = batch.iter().map(OutboundMessage::size).sum();

    let written = writer.write_vectored(&slices).await?;
    if written == total_size {
        writer.flush().await?;
        return Ok(());
    }
    if written == 0 {
        return Err(CmdwireError::Io(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            "write_vectored returned 0",
        )));
    }

    // Partial write: continue from where the kernel stopped.
    let mut total_written = written;
    while total_written < total_size {
        let remaining = build_remaining_slices(batch, total_written);
        if remaining.is_empty() {
            break;
        }

        let written = writer.write_vectored(&remaining).await?;
        if written == 0 {
            return Err(CmdwireError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }
        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// Build the IoSlice array for the bytes remaining after a partial write.
fn build_remaining_slices(batch: &[OutboundMessage], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut skipped = 0;

    for message in batch {
        let prefix_start = skipped;
        let prefix_end = skipped + LENGTH_PREFIX_SIZE;
        if skip_bytes < prefix_end {
            let start = skip_bytes.saturating_sub(prefix_start);
            slices.push(IoSlice::new(&message.prefix[start..]));
        }
        skipped = prefix_end;

        if !message.payload.is_empty() {
            let payload_start = skipped;
            let payload_end = skipped + message.payload.len();
            if skip_bytes < payload_end {
                let start = skip_bytes.saturating_sub(payload_start);
                slices.push(IoSlice::new(&message.payload[start..]));
            }
            skipped = payload_end;
        }
    }

    slices
}
