//! Client side of the method-call socket.

use crate::defaults::MAX_MESSAGE_BYTES;
use crate::error::{PcmforgeError, Result};
use crate::ipc::framing::{Frame, decode_message, read_frame, write_message};
use crate::ipc::protocol::{MethodCall, MethodResponse};
use std::path::Path;
use tokio::io::BufReader;
use tokio::net::UnixStream;

/// Sends one call and waits for the server's single reply line.
///
/// # Errors
/// `IpcConnection` when the socket cannot be reached or closes before a
/// reply; `IpcProtocol` when the reply is not a valid [`MethodResponse`].
/// Operation failures come back as [`MethodResponse::Error`], not as `Err`.
pub async fn send_call(socket_path: &Path, call: &MethodCall) -> Result<MethodResponse> {
    let stream =
        UnixStream::connect(socket_path)
            .await
            .map_err(|e| PcmforgeError::IpcConnection {
                message: format!("Failed to connect to server: {}", e),
            })?;

    let (reader, mut writer) = stream.into_split();
    write_message(&mut writer, call).await?;

    let mut reader = BufReader::new(reader);
    match read_frame(&mut reader, MAX_MESSAGE_BYTES).await? {
        Frame::Line(line) => decode_message(&line),
        Frame::Closed => Err(PcmforgeError::IpcConnection {
            message: "Server closed the connection without a response".to_string(),
        }),
        Frame::Oversized => Err(PcmforgeError::IpcProtocol {
            message: format!("Response exceeds {} bytes", MAX_MESSAGE_BYTES),
        }),
    }
}
