//! TCP connect plumbing.
//!
//! The connection itself works over any `AsyncRead + AsyncWrite` stream;
//! this is the helper for the common case of dialing a remote host over TCP.

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;

/// Connect to a remote host over TCP.
///
/// Nagle's algorithm is disabled: command/response exchanges are small and
/// latency-sensitive.
pub async fn connect(addr: impl ToSocketAddrs) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}
