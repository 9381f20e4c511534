//! Unix socket server for pcmforge method calls.
//!
//! Each connection carries exactly one call: the client writes one JSON line,
//! the server answers with one [`MethodResponse`] line and closes. A line
//! that is not a valid call, or that outgrows the configured message size,
//! still gets an `INVALID_ARGUMENTS` reply so callers never hang on a
//! silent close.

use crate::defaults::MAX_MESSAGE_BYTES;
use crate::error::{PcmforgeError, Result};
use crate::ipc::framing::{Frame, decode_message, read_frame, write_message};
use crate::ipc::protocol::{ErrorCode, MethodCall, MethodResponse};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;

/// Turns one decoded call into its response.
#[async_trait::async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle(&self, call: MethodCall) -> MethodResponse;
}

/// Method-call server bound to a Unix socket.
pub struct IpcServer {
    socket_path: PathBuf,
    max_message_bytes: usize,
    shutdown: watch::Sender<bool>,
}

impl IpcServer {
    pub fn new(socket_path: PathBuf) -> Result<Self> {
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            socket_path,
            max_message_bytes: MAX_MESSAGE_BYTES,
            shutdown,
        })
    }

    /// Caps the request line length, base64 payloads included.
    pub fn with_max_message_bytes(mut self, max_message_bytes: usize) -> Self {
        self.max_message_bytes = max_message_bytes.max(1);
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// `$XDG_RUNTIME_DIR/pcmforge.sock`, or `/tmp/pcmforge-{uid}.sock`.
    pub fn default_socket_path() -> PathBuf {
        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR")
            && !xdg_runtime.is_empty()
        {
            PathBuf::from(xdg_runtime).join("pcmforge.sock")
        } else {
            let uid = crate::sys::current_uid();
            PathBuf::from(format!("/tmp/pcmforge-{}.sock", uid))
        }
    }

    /// Binds the socket and answers calls until [`stop`](Self::stop) is requested.
    ///
    /// A leftover socket file from an earlier run is replaced. Calls already
    /// being handled when shutdown arrives run to completion on their own tasks.
    pub async fn start<H>(&self, handler: H) -> Result<()>
    where
        H: MethodHandler + 'static,
    {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return Ok(());
        }

        let listener = self.bind()?;
        info!(
            "Serving pcmforge calls on {} (max {} bytes per call)",
            self.socket_path.display(),
            self.max_message_bytes
        );

        let handler: Arc<dyn MethodHandler> = Arc::new(handler);
        let mut connection_id: u64 = 0;

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _) = accepted.map_err(|e| PcmforgeError::IpcConnection {
                        message: format!("Failed to accept connection: {}", e),
                    })?;
                    connection_id += 1;
                    let handler = Arc::clone(&handler);
                    let limit = self.max_message_bytes;
                    tokio::spawn(async move {
                        let answered =
                            answer_call(stream, handler.as_ref(), limit, connection_id).await;
                        if let Err(e) = answered {
                            warn!("Connection #{}: {}", connection_id, e);
                        }
                    });
                }
                _ = shutdown.changed() => break,
            }
        }

        info!(
            "Stopped serving on {} after {} connections",
            self.socket_path.display(),
            connection_id
        );
        Ok(())
    }

    /// Requests shutdown and removes the socket file.
    pub async fn stop(&self) -> Result<()> {
        self.shutdown.send_replace(true);

        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PcmforgeError::IpcSocket {
                message: format!("Failed to remove socket file: {}", e),
            }),
        }
    }

    fn bind(&self) -> Result<UnixListener> {
        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => debug!("Removed stale socket {}", self.socket_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(PcmforgeError::IpcSocket {
                    message: format!("Failed to remove existing socket: {}", e),
                });
            }
        }

        UnixListener::bind(&self.socket_path).map_err(|e| PcmforgeError::IpcSocket {
            message: format!("Failed to bind to socket: {}", e),
        })
    }
}

/// Reads one call, answers it and lets the stream close.
async fn answer_call(
    stream: UnixStream,
    handler: &dyn MethodHandler,
    limit: usize,
    connection_id: u64,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let response = match read_frame(&mut reader, limit).await? {
        Frame::Closed => {
            debug!("Connection #{} closed without a call", connection_id);
            return Ok(());
        }
        Frame::Oversized => {
            warn!(
                "Connection #{} sent more than {} bytes without a newline",
                connection_id, limit
            );
            MethodResponse::error(
                ErrorCode::InvalidArguments,
                format!("Method call exceeds {} bytes", limit),
            )
        }
        Frame::Line(line) => match decode_message::<MethodCall>(&line) {
            Ok(call) => {
                let method = call.method.clone();
                let started = Instant::now();
                let response = handler.handle(call).await;
                debug!(
                    "Connection #{}: {} answered in {:?}",
                    connection_id,
                    method,
                    started.elapsed()
                );
                response
            }
            Err(e) => {
                warn!("Connection #{}: {}", connection_id, e);
                MethodResponse::error(ErrorCode::InvalidArguments, e.to_string())
            }
        },
    };

    write_message(&mut writer, &response).await
}
