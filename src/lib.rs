//! pcmforge - streaming PCM conversion for WAV pipelines
//!
//! Decodes audio chunk by chunk, reshapes it (channel mixing, resampling,
//! bit depth) and writes canonical 44-byte-header WAV files, trims time
//! windows, and summarizes tracks into waveform envelopes.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod decoder;
pub mod defaults;
pub mod encoder;
pub mod error;
pub mod ipc;
pub mod pipeline;
pub mod scratch;
pub mod service;
pub mod sys;

// Core boundaries (decoder → transform → sink)
pub use decoder::{Decoder, MediaSource};
pub use encoder::{ContainerEncoder, OutputKind};
pub use pipeline::sink::PcmSink;

// Operations
pub use service::AudioService;

// Pipeline
pub use pipeline::orchestrator::{PipelineConfig, TranscodePipeline, TranscodeReport, TrimRange};

// Formats
pub use audio::{AudioInfo, AudioStreamDescriptor, BitDepth, TargetFormat};

// Error handling
pub use error::{PcmforgeError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
