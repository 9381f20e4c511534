use crate::audio::bit_depth::BitDepth;
use crate::decoder::DecoderSettings;
use crate::defaults::{
    CONTAINER_BIT_RATE, DECODER_CHUNK_FRAMES, DECODER_POLL_TIMEOUT_MS, DECODER_QUEUE_DEPTH,
    DEFAULT_BIT_DEPTH, MAX_MESSAGE_BYTES,
};
use crate::error::PcmforgeError;
use crate::pipeline::PipelineConfig;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub conversion: ConversionConfig,
    pub decoder: DecoderConfig,
    pub files: FilesConfig,
    pub server: ServerConfig,
}

/// Output format defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversionConfig {
    /// Bit depth used when a conversion does not ask for one
    pub bit_depth: u32,
    /// Bit rate handed to the container encoder
    pub container_bit_rate: u32,
}

/// Decoder queue tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoderConfig {
    pub poll_timeout_ms: u64,
    pub chunk_frames: usize,
    pub queue_depth: usize,
}

/// Scratch file location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FilesConfig {
    /// Directory for byte-payload scratch files (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
}

/// Method-call server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Unix socket path (runtime dir when unset)
    pub socket_path: Option<PathBuf>,
    /// Longest request line accepted, base64 payloads included
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            bit_depth: DEFAULT_BIT_DEPTH,
            container_bit_rate: CONTAINER_BIT_RATE,
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: DECODER_POLL_TIMEOUT_MS,
            chunk_frames: DECODER_CHUNK_FRAMES,
            queue_depth: DECODER_QUEUE_DEPTH,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML or out-of-range values.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                {
                    Ok(Self::default())
                } else {
                    Err(e.context(format!("Failed to load config from {}", path.display())))
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - PCMFORGE_SCRATCH_DIR → files.scratch_dir
    /// - PCMFORGE_POLL_TIMEOUT_MS → decoder.poll_timeout_ms
    /// - PCMFORGE_BIT_DEPTH → conversion.bit_depth
    /// - PCMFORGE_SOCKET → server.socket_path
    ///
    /// Unparseable numbers are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("PCMFORGE_SCRATCH_DIR")
            && !dir.is_empty()
        {
            self.files.scratch_dir = Some(PathBuf::from(dir));
        }

        if let Ok(timeout) = std::env::var("PCMFORGE_POLL_TIMEOUT_MS")
            && !timeout.is_empty()
        {
            match timeout.parse::<u64>() {
                Ok(ms) if ms > 0 => self.decoder.poll_timeout_ms = ms,
                _ => warn!("Ignoring invalid PCMFORGE_POLL_TIMEOUT_MS={}", timeout),
            }
        }

        if let Ok(bits) = std::env::var("PCMFORGE_BIT_DEPTH")
            && !bits.is_empty()
        {
            match bits.parse::<u32>().ok().filter(|b| BitDepth::try_from(*b).is_ok()) {
                Some(bits) => self.conversion.bit_depth = bits,
                None => warn!("Ignoring invalid PCMFORGE_BIT_DEPTH={}", bits),
            }
        }

        if let Ok(socket) = std::env::var("PCMFORGE_SOCKET")
            && !socket.is_empty()
        {
            self.server.socket_path = Some(PathBuf::from(socket));
        }

        self
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        BitDepth::try_from(self.conversion.bit_depth).map_err(|e| {
            PcmforgeError::ConfigParse {
                message: format!("conversion.bit_depth: {}", e),
            }
        })?;
        let checks = [
            ("decoder.poll_timeout_ms", self.decoder.poll_timeout_ms == 0),
            ("decoder.chunk_frames", self.decoder.chunk_frames == 0),
            ("decoder.queue_depth", self.decoder.queue_depth == 0),
            ("conversion.container_bit_rate", self.conversion.container_bit_rate == 0),
            ("server.max_message_bytes", self.server.max_message_bytes == 0),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, zero)| *zero) {
            return Err(PcmforgeError::ConfigParse {
                message: format!("{} must be greater than zero", field),
            });
        }
        Ok(())
    }

    /// Bit depth for conversions without an explicit override.
    pub fn default_bit_depth(&self) -> crate::error::Result<BitDepth> {
        BitDepth::try_from(self.conversion.bit_depth)
    }

    pub fn decoder_settings(&self) -> DecoderSettings {
        DecoderSettings {
            poll_timeout: Duration::from_millis(self.decoder.poll_timeout_ms.max(1)),
            chunk_frames: self.decoder.chunk_frames.max(1),
            queue_depth: self.decoder.queue_depth.max(1),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            poll_timeout: Duration::from_millis(self.decoder.poll_timeout_ms.max(1)),
        }
    }

    /// Scratch directory, falling back to the system temp dir.
    pub fn scratch_dir(&self) -> PathBuf {
        self.files
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/pcmforge/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("pcmforge")
            .join("config.toml")
    }
}
