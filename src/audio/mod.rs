//! PCM transformation stages and the WAV container codec.
//!
//! Every stage works on interleaved 16-bit samples; only the bit-depth
//! converter and the WAV writer deal in bytes.

pub mod bit_depth;
pub mod format;
pub mod mixer;
pub mod resampler;
pub mod wav;
pub mod waveform;

pub use bit_depth::{BitDepth, convert_bit_depth};
pub use format::{AudioInfo, AudioStreamDescriptor, TargetFormat};
pub use mixer::convert_channels;
pub use resampler::{ResamplerState, resample_all, resample_chunk};
pub use wav::{StreamingWavWriter, WavHeader, build_wav_header};
pub use waveform::summarize_waveform;
