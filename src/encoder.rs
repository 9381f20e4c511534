//! Container encoder boundary (AAC + MPEG-4 mux or any other compressed output).

use crate::error::{PcmforgeError, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Encodes a complete 16-bit PCM stream into a container file image.
pub trait ContainerEncoder: Send + Sync {
    /// Short name of the produced container (e.g. `"m4a"`).
    fn container(&self) -> &str;

    fn encode(&self, samples: &[i16], sample_rate: u32, channels: u32, bit_rate: u32)
    -> Result<Vec<u8>>;
}

/// Output container of a trim or conversion, chosen by the caller.
#[derive(Clone)]
pub enum OutputKind {
    Wav,
    Container(Arc<dyn ContainerEncoder>),
}

impl OutputKind {
    /// Resolves a transport-level format name (`"wav"` or `"m4a"`).
    pub fn from_name(name: &str, encoder: Option<&Arc<dyn ContainerEncoder>>) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "wav" => Ok(OutputKind::Wav),
            "m4a" => encoder
                .map(|e| OutputKind::Container(Arc::clone(e)))
                .ok_or_else(|| PcmforgeError::unsupported("no m4a encoder is configured")),
            other => Err(PcmforgeError::unsupported(format!(
                "output format '{}' is not supported (expected wav or m4a)",
                other
            ))),
        }
    }

    /// File extension for scratch outputs.
    pub fn extension(&self) -> &str {
        match self {
            OutputKind::Wav => "wav",
            OutputKind::Container(encoder) => encoder.container(),
        }
    }
}

impl fmt::Debug for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Wav => write!(f, "Wav"),
            OutputKind::Container(encoder) => write!(f, "Container({})", encoder.container()),
        }
    }
}

/// Encoder double that records calls and emits a tagged byte image.
///
/// The output is `b"MOCK"` followed by rate, channels and bit rate (u32 LE)
/// and the raw PCM bytes.
#[derive(Debug, Default)]
pub struct MockContainerEncoder {
    fail: bool,
    calls: AtomicUsize,
}

impl MockContainerEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContainerEncoder for MockContainerEncoder {
    fn container(&self) -> &str {
        "m4a"
    }

    fn encode(
        &self,
        samples: &[i16],
        sample_rate: u32,
        channels: u32,
        bit_rate: u32,
    ) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PcmforgeError::Encoder {
                message: "Simulated encoder failure".to_string(),
            });
        }
        let mut out = Vec::with_capacity(16 + samples.len() * 2);
        out.extend_from_slice(b"MOCK");
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&bit_rate.to_le_bytes());
        out.extend(crate::audio::format::samples_to_le_bytes(samples));
        Ok(out)
    }
}
