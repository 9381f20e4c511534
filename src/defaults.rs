//! Default configuration constants for pcmforge.
//!
//! Shared by the codec, the pipeline and the configuration types so the
//! limits stay consistent everywhere.

/// Size of the canonical RIFF/WAV header in bytes (no extra chunks).
pub const WAV_HEADER_SIZE: usize = 44;

/// Maximum PCM payload of a standard WAV file.
///
/// The RIFF chunk stores the file size minus 8 as a u32, so the data
/// payload can be at most 2^32 - 1 - 36 bytes (~4 GB).
pub const MAX_WAV_DATA_SIZE: u64 = u32::MAX as u64 - 36;

/// Highest target sample rate accepted for conversion (384 kHz covers DXD).
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Bit depth of decoded PCM and of WAV output when no override is given.
pub const DEFAULT_BIT_DEPTH: u32 = 16;

/// Bit rate handed to the container encoder (AAC-LC, 128 kb/s).
pub const CONTAINER_BIT_RATE: u32 = 128_000;

/// How long one decoder queue poll may block, in milliseconds.
///
/// A poll that times out is not an error; the pipeline simply polls again.
pub const DECODER_POLL_TIMEOUT_MS: u64 = 10;

/// Frames per input buffer handed to the WAV decoder.
pub const DECODER_CHUNK_FRAMES: usize = 4096;

/// Number of decoded buffers that may be in flight between the decoder's
/// input and output sides.
pub const DECODER_QUEUE_DEPTH: usize = 4;

/// Longest waveform summary a caller may request.
pub const MAX_WAVEFORM_SAMPLES: usize = 1 << 20;

/// Longest request or response line the socket transport accepts, in bytes.
///
/// Byte payloads travel base64-encoded inside the line, so this bounds the
/// audio a single call can carry to roughly three quarters of it.
pub const MAX_MESSAGE_BYTES: usize = 256 * 1024 * 1024;

/// File name prefix for scratch files created by the byte-payload operations.
pub const SCRATCH_PREFIX: &str = "pcmforge";
