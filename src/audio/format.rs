//! Stream descriptors and PCM byte helpers shared by the audio stages.

use crate::audio::bit_depth::BitDepth;
use crate::defaults::{DEFAULT_BIT_DEPTH, MAX_SAMPLE_RATE};
use crate::error::{PcmforgeError, Result};
use serde::{Deserialize, Serialize};

/// Describes one PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStreamDescriptor {
    pub sample_rate: u32,
    pub channel_count: u32,
    pub bits_per_sample: u32,
}

impl AudioStreamDescriptor {
    /// Descriptor for decoded 16-bit PCM.
    pub fn pcm16(sample_rate: u32, channel_count: u32) -> Self {
        Self {
            sample_rate,
            channel_count,
            bits_per_sample: DEFAULT_BIT_DEPTH,
        }
    }

    /// Rejects zero rates, zero channel counts and frames a WAV header cannot describe.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(PcmforgeError::unsupported("sample rate must be at least 1 Hz"));
        }
        if self.channel_count == 0 {
            return Err(PcmforgeError::unsupported(
                "channel count must be at least 1",
            ));
        }
        if self.channel_count > u16::MAX as u32 {
            return Err(PcmforgeError::unsupported(format!(
                "channel count {} exceeds maximum ({})",
                self.channel_count,
                u16::MAX
            )));
        }
        // block_align is a 16-bit field
        if self.bytes_per_frame() > u16::MAX as usize {
            return Err(PcmforgeError::unsupported(format!(
                "{} channels at {} bits need {} bytes per frame, maximum is {}",
                self.channel_count,
                self.bits_per_sample,
                self.bytes_per_frame(),
                u16::MAX
            )));
        }
        Ok(())
    }

    /// Bytes occupied by one frame (one sample per channel).
    pub fn bytes_per_frame(&self) -> usize {
        self.channel_count as usize * (self.bits_per_sample as usize / 8)
    }
}

/// Requested output format; `None` keeps the source value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetFormat {
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub bit_depth: Option<BitDepth>,
}

impl TargetFormat {
    /// Target that keeps the source format (16-bit).
    pub fn source() -> Self {
        Self::default()
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.bit_depth = Some(bit_depth);
        self
    }

    /// Checks the overrides before any decoding starts.
    pub fn validate(&self) -> Result<()> {
        if let Some(rate) = self.sample_rate {
            if rate == 0 {
                return Err(PcmforgeError::unsupported(
                    "target sample rate must be at least 1 Hz",
                ));
            }
            if rate > MAX_SAMPLE_RATE {
                return Err(PcmforgeError::unsupported(format!(
                    "target sample rate {} exceeds maximum ({})",
                    rate, MAX_SAMPLE_RATE
                )));
            }
        }
        if self.channels == Some(0) {
            return Err(PcmforgeError::unsupported(
                "target channel count must be at least 1",
            ));
        }
        Ok(())
    }

    /// Resolves the output descriptor against a decoded source stream.
    pub fn resolve(&self, source: &AudioStreamDescriptor) -> AudioStreamDescriptor {
        AudioStreamDescriptor {
            sample_rate: self.sample_rate.unwrap_or(source.sample_rate),
            channel_count: self.channels.unwrap_or(source.channel_count),
            bits_per_sample: self.bit_depth.unwrap_or_default().bits(),
        }
    }
}

/// Metadata reported for an audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u32,
    pub bit_rate: u32,
    pub format: String,
}

/// Decodes little-endian 16-bit PCM bytes; a trailing odd byte is ignored.
pub fn samples_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encodes samples as little-endian 16-bit PCM bytes.
pub fn samples_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm16_descriptor_has_sixteen_bits() {
        let desc = AudioStreamDescriptor::pcm16(44100, 2);
        assert_eq!(desc.bits_per_sample, 16);
        assert_eq!(desc.bytes_per_frame(), 4);
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn zero_channels_rejected() {
        let desc = AudioStreamDescriptor::pcm16(44100, 0);
        assert!(matches!(
            desc.validate(),
            Err(PcmforgeError::UnsupportedConfiguration { .. })
        ));
    }

    #[test]
    fn channel_count_beyond_header_field_rejected() {
        let descriptor = AudioStreamDescriptor::pcm16(8000, 65536);
        assert!(matches!(
            descriptor.validate(),
            Err(PcmforgeError::UnsupportedConfiguration { .. })
        ));
        assert!(AudioStreamDescriptor::pcm16(8000, 32767).validate().is_ok());
    }

    #[test]
    fn frame_wider_than_block_align_rejected() {
        let descriptor = AudioStreamDescriptor {
            sample_rate: 8000,
            channel_count: 16384,
            bits_per_sample: 32,
        };
        assert!(descriptor.validate().is_err());

        let fits = AudioStreamDescriptor {
            channel_count: 16383,
            ..descriptor
        };
        assert!(fits.validate().is_ok());
    }

    #[test]
    fn target_above_max_sample_rate_rejected() {
        let target = TargetFormat::source().with_sample_rate(MAX_SAMPLE_RATE + 1);
        let err = target.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));

        let at_limit = TargetFormat::source().with_sample_rate(MAX_SAMPLE_RATE);
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn target_zero_channels_rejected() {
        let target = TargetFormat::source().with_channels(0);
        assert!(target.validate().is_err());
    }

    #[test]
    fn resolve_keeps_source_values_when_not_overridden() {
        let source = AudioStreamDescriptor::pcm16(48000, 2);
        let resolved = TargetFormat::source().resolve(&source);
        assert_eq!(resolved, source);
    }

    #[test]
    fn resolve_applies_overrides() {
        let source = AudioStreamDescriptor::pcm16(48000, 2);
        let resolved = TargetFormat::source()
            .with_sample_rate(16000)
            .with_channels(1)
            .with_bit_depth(BitDepth::Eight)
            .resolve(&source);
        assert_eq!(resolved.sample_rate, 16000);
        assert_eq!(resolved.channel_count, 1);
        assert_eq!(resolved.bits_per_sample, 8);
    }

    #[test]
    fn le_bytes_helpers_agree() {
        let samples = vec![0i16, 1, -1, i16::MAX, i16::MIN];
        let bytes = samples_to_le_bytes(&samples);
        assert_eq!(bytes.len(), 10);
        assert_eq!(&bytes[2..4], &[0x01, 0x00]);
        assert_eq!(&bytes[4..6], &[0xFF, 0xFF]);
        assert_eq!(samples_from_le_bytes(&bytes), samples);
    }

    #[test]
    fn odd_trailing_byte_ignored() {
        assert_eq!(samples_from_le_bytes(&[0x10, 0x00, 0x7F]), vec![16]);
    }

    #[test]
    fn audio_info_serializes_camel_case() {
        let info = AudioInfo {
            duration_ms: 1500,
            sample_rate: 44100,
            channels: 2,
            bit_rate: 1_411_200,
            format: "pcm".to_string(),
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"durationMs\":1500"));
        assert!(json.contains("\"sampleRate\":44100"));
        assert!(json.contains("\"bitRate\":1411200"));
    }
}
