//! Error types for pcmforge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PcmforgeError {
    // Caller input errors
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // Configuration errors
    #[error("Unsupported configuration: {message}")]
    UnsupportedConfiguration { message: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Decoder errors
    #[error("No audio track found in {path}")]
    NoAudioTrack { path: String },

    #[error("Decoder failed to start: {message}")]
    DecoderStart { message: String },

    #[error("Decoder failed: {message}")]
    DecoderRuntime { message: String },

    // Encoder errors
    #[error("Encoder failed: {message}")]
    Encoder { message: String },

    // Output errors
    #[error(
        "WAV output exceeds maximum size (~4 GB) after {written} bytes. Consider splitting the audio into shorter segments."
    )]
    SizeLimitExceeded { written: u64 },

    // IPC errors
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC connection error: {message}")]
    IpcConnection { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PcmforgeError {
    /// Shorthand for an [`PcmforgeError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for an [`PcmforgeError::UnsupportedConfiguration`].
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            message: message.into(),
        }
    }

    /// Shorthand for an [`PcmforgeError::DecoderRuntime`].
    pub fn decoder(message: impl Into<String>) -> Self {
        Self::DecoderRuntime {
            message: message.into(),
        }
    }

    /// True when the caller's input was rejected before any work started.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, PcmforgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_invalid_argument_display() {
        let error = PcmforgeError::invalid_argument("inputPath and outputPath are required");
        assert_eq!(
            error.to_string(),
            "Invalid argument: inputPath and outputPath are required"
        );
        assert!(error.is_invalid_argument());
    }

    #[test]
    fn test_unsupported_configuration_display() {
        let error = PcmforgeError::unsupported("bit depth 12 is not supported");
        assert_eq!(
            error.to_string(),
            "Unsupported configuration: bit depth 12 is not supported"
        );
        assert!(!error.is_invalid_argument());
    }

    #[test]
    fn test_no_audio_track_display() {
        let error = PcmforgeError::NoAudioTrack {
            path: "/music/cover.jpg".to_string(),
        };
        assert_eq!(error.to_string(), "No audio track found in /music/cover.jpg");
    }

    #[test]
    fn test_decoder_errors_display() {
        let start = PcmforgeError::DecoderStart {
            message: "codec unavailable".to_string(),
        };
        assert_eq!(start.to_string(), "Decoder failed to start: codec unavailable");

        let runtime = PcmforgeError::decoder("stream corrupted");
        assert_eq!(runtime.to_string(), "Decoder failed: stream corrupted");
    }

    #[test]
    fn test_encoder_display() {
        let error = PcmforgeError::Encoder {
            message: "muxer refused track".to_string(),
        };
        assert_eq!(error.to_string(), "Encoder failed: muxer refused track");
    }

    #[test]
    fn test_size_limit_display_mentions_splitting() {
        let error = PcmforgeError::SizeLimitExceeded { written: 42 };
        let text = error.to_string();
        assert!(text.contains("maximum size"));
        assert!(text.contains("42"));
        assert!(text.contains("splitting"));
    }

    #[test]
    fn test_ipc_errors_display() {
        let socket = PcmforgeError::IpcSocket {
            message: "address in use".to_string(),
        };
        assert_eq!(socket.to_string(), "IPC socket error: address in use");

        let protocol = PcmforgeError::IpcProtocol {
            message: "bad json".to_string(),
        };
        assert_eq!(protocol.to_string(), "IPC protocol error: bad json");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: PcmforgeError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: PcmforgeError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: PcmforgeError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<PcmforgeError>();
        assert_sync::<PcmforgeError>();
    }
}
