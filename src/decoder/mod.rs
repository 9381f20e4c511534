//! Decoder boundary: compressed input in, interleaved 16-bit PCM chunks out.
//!
//! A [`Decoder`] is a two-sided queue. The caller feeds input buffers on one
//! side and drains decoded chunks on the other, alternating between the two
//! so at most a bounded number of buffers is in flight. Every wait is bounded
//! by a poll timeout; a poll that times out is not an error.

pub mod memory;
pub mod wav;

pub use memory::{MemoryDecoder, MemorySource};
pub use wav::{WavDecoder, WavSource};

use crate::audio::format::{AudioInfo, AudioStreamDescriptor};
use crate::defaults::{DECODER_CHUNK_FRAMES, DECODER_POLL_TIMEOUT_MS, DECODER_QUEUE_DEPTH};
use crate::error::Result;
use std::path::Path;
use std::time::Duration;

/// One decoded buffer of interleaved 16-bit frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedChunk {
    pub samples: Vec<i16>,
    /// Presentation time of the first frame, in microseconds.
    pub timestamp_us: i64,
    /// Set on the final buffer of the stream (which may be empty).
    pub end_of_stream: bool,
}

impl DecodedChunk {
    pub fn new(samples: Vec<i16>, timestamp_us: i64) -> Self {
        Self {
            samples,
            timestamp_us,
            end_of_stream: false,
        }
    }

    /// Empty buffer carrying only the end-of-stream flag.
    pub fn end_of_stream(timestamp_us: i64) -> Self {
        Self {
            samples: Vec::new(),
            timestamp_us,
            end_of_stream: true,
        }
    }
}

/// Tuning shared by every decoder a source opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderSettings {
    pub poll_timeout: Duration,
    pub chunk_frames: usize,
    pub queue_depth: usize,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(DECODER_POLL_TIMEOUT_MS),
            chunk_frames: DECODER_CHUNK_FRAMES,
            queue_depth: DECODER_QUEUE_DEPTH,
        }
    }
}

/// A started decoder for one audio track.
pub trait Decoder: Send {
    /// Format of the decoded output (always 16 bits per sample).
    fn descriptor(&self) -> AudioStreamDescriptor;

    /// Presentation time of the next input buffer, or `None` once the input
    /// is exhausted.
    fn next_input_timestamp(&self) -> Option<i64>;

    /// Feeds the next input buffer. Returns `false` when no input slot became
    /// free within `timeout`.
    fn queue_input(&mut self, timeout: Duration) -> Result<bool>;

    /// Signals end of input. Returns `false` when no input slot became free
    /// within `timeout`.
    fn queue_end_of_stream(&mut self, timeout: Duration) -> Result<bool>;

    /// Takes the next decoded chunk, or `None` when nothing was ready within
    /// `timeout`.
    fn dequeue_output(&mut self, timeout: Duration) -> Result<Option<DecodedChunk>>;

    /// Repositions the input to `position_us`, discarding queued buffers.
    fn seek(&mut self, position_us: i64) -> Result<()>;
}

/// Opens decoders and reads metadata for audio files.
pub trait MediaSource: Send + Sync {
    /// Selects the first audio track of `path` and starts a decoder for it.
    ///
    /// Fails with `NoAudioTrack` when the file has no decodable audio and
    /// with `DecoderStart` when the codec cannot be started.
    fn open(&self, path: &Path) -> Result<Box<dyn Decoder>>;

    /// Reads duration, rate, channel count, bit rate and format of `path`.
    fn probe(&self, path: &Path) -> Result<AudioInfo>;
}

/// Maps a codec MIME type to the short format name reported by `probe`.
pub fn format_from_mime(mime: &str) -> String {
    match mime {
        "audio/mpeg" => "mp3".to_string(),
        "audio/mp4a-latm" => "aac".to_string(),
        "audio/flac" => "flac".to_string(),
        "audio/vorbis" => "vorbis".to_string(),
        "audio/opus" => "opus".to_string(),
        "audio/raw" => "pcm".to_string(),
        "audio/amr-wb" | "audio/3gpp" => "amr".to_string(),
        other => other.strip_prefix("audio/").unwrap_or(other).to_string(),
    }
}

/// Converts a frame position to microseconds at `sample_rate`.
pub(crate) fn frames_to_us(frames: u64, sample_rate: u32) -> i64 {
    if sample_rate == 0 {
        return 0;
    }
    (frames as u128 * 1_000_000 / sample_rate as u128) as i64
}

/// Converts microseconds to a frame position at `sample_rate` (rounded down).
pub(crate) fn us_to_frames(position_us: i64, sample_rate: u32) -> u64 {
    (position_us.max(0) as u128 * sample_rate as u128 / 1_000_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_mime_maps_known_codecs() {
        assert_eq!(format_from_mime("audio/mpeg"), "mp3");
        assert_eq!(format_from_mime("audio/mp4a-latm"), "aac");
        assert_eq!(format_from_mime("audio/flac"), "flac");
        assert_eq!(format_from_mime("audio/vorbis"), "vorbis");
        assert_eq!(format_from_mime("audio/opus"), "opus");
        assert_eq!(format_from_mime("audio/raw"), "pcm");
        assert_eq!(format_from_mime("audio/amr-wb"), "amr");
        assert_eq!(format_from_mime("audio/3gpp"), "amr");
    }

    #[test]
    fn format_from_mime_strips_prefix_of_unknown_types() {
        assert_eq!(format_from_mime("audio/x-ms-wma"), "x-ms-wma");
        assert_eq!(format_from_mime("application/ogg"), "application/ogg");
    }

    #[test]
    fn default_settings_use_defaults() {
        let settings = DecoderSettings::default();
        assert_eq!(settings.poll_timeout, Duration::from_millis(10));
        assert_eq!(settings.chunk_frames, DECODER_CHUNK_FRAMES);
        assert_eq!(settings.queue_depth, DECODER_QUEUE_DEPTH);
    }

    #[test]
    fn frame_time_conversions() {
        assert_eq!(frames_to_us(44100, 44100), 1_000_000);
        assert_eq!(frames_to_us(1, 8000), 125);
        assert_eq!(us_to_frames(1_000_000, 22050), 22050);
        assert_eq!(us_to_frames(-5, 22050), 0);
        assert_eq!(frames_to_us(10, 0), 0);
    }

    #[test]
    fn end_of_stream_chunk_is_empty() {
        let chunk = DecodedChunk::end_of_stream(42);
        assert!(chunk.samples.is_empty());
        assert!(chunk.end_of_stream);
        assert_eq!(chunk.timestamp_us, 42);
        assert!(!DecodedChunk::new(vec![1], 0).end_of_stream);
    }
}
