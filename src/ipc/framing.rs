//! Newline-delimited JSON framing shared by the server and the client.
//!
//! Every message is one JSON document followed by `\n`. Reads are capped so a
//! base64 payload that never ends cannot grow the buffer without bound.

use crate::error::{PcmforgeError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One read from the peer.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, newline included when the peer sent one.
    Line(Vec<u8>),
    /// The peer closed before sending anything.
    Closed,
    /// More than the allowed number of bytes arrived without a newline.
    Oversized,
}

/// Reads one line of at most `limit` bytes (newline excluded).
pub async fn read_frame<R>(reader: &mut R, limit: usize) -> Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(limit as u64 + 1)
        .read_until(b'\n', &mut line)
        .await
        .map_err(|e| PcmforgeError::IpcConnection {
            message: format!("Failed to read message: {}", e),
        })?;

    if read == 0 {
        return Ok(Frame::Closed);
    }
    if line.last() != Some(&b'\n') && read > limit {
        return Ok(Frame::Oversized);
    }
    Ok(Frame::Line(line))
}

/// Parses a line read by [`read_frame`].
pub fn decode_message<T: DeserializeOwned>(line: &[u8]) -> Result<T> {
    serde_json::from_slice(line).map_err(|e| PcmforgeError::IpcProtocol {
        message: format!("Malformed message: {}", e),
    })
}

/// Serializes `message`, terminates it with a newline and flushes.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut bytes = serde_json::to_vec(message).map_err(|e| PcmforgeError::IpcProtocol {
        message: format!("Failed to serialize message: {}", e),
    })?;
    bytes.push(b'\n');

    let sent = async {
        writer.write_all(&bytes).await?;
        writer.flush().await
    };
    sent.await.map_err(|e| PcmforgeError::IpcConnection {
        message: format!("Failed to write message: {}", e),
    })
}
