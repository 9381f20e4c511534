//! Method-call transport over a Unix socket.

pub mod client;
pub mod framing;
pub mod handler;
pub mod protocol;
pub mod server;

pub use client::send_call;
pub use handler::{AudioMethodHandler, Method};
pub use protocol::{ErrorCode, MethodCall, MethodResponse};
pub use server::{IpcServer, MethodHandler};
