//! Rescales 16-bit samples into 8/16/24/32-bit little-endian containers.

use crate::error::PcmforgeError;

/// Output sample width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BitDepth {
    /// Unsigned 8-bit, offset by 128.
    Eight,
    #[default]
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BitDepth {
    pub fn bits(self) -> u32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
            BitDepth::TwentyFour => 24,
            BitDepth::ThirtyTwo => 32,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        self.bits() as usize / 8
    }
}

impl TryFrom<u32> for BitDepth {
    type Error = PcmforgeError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(BitDepth::Eight),
            16 => Ok(BitDepth::Sixteen),
            24 => Ok(BitDepth::TwentyFour),
            32 => Ok(BitDepth::ThirtyTwo),
            other => Err(PcmforgeError::unsupported(format!(
                "bit depth {} is not supported (expected 8, 16, 24 or 32)",
                other
            ))),
        }
    }
}

/// Converts 16-bit samples to the requested depth.
///
/// 8-bit output divides by 256 with truncation toward zero before the +128
/// offset, so `-1` maps to 128 rather than 127.
pub fn convert_bit_depth(samples: &[i16], depth: BitDepth) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * depth.bytes_per_sample());
    for &sample in samples {
        let s = sample as i32;
        match depth {
            BitDepth::Eight => out.push((s / 256 + 128).clamp(0, 255) as u8),
            BitDepth::Sixteen => out.extend_from_slice(&sample.to_le_bytes()),
            BitDepth::TwentyFour => {
                let s24 = s << 8;
                out.extend_from_slice(&s24.to_le_bytes()[..3]);
            }
            BitDepth::ThirtyTwo => out.extend_from_slice(&(s << 16).to_le_bytes()),
        }
    }
    out
}
