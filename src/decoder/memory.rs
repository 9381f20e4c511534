//! In-memory decoder for tests and benchmarks.

use crate::audio::format::{AudioInfo, AudioStreamDescriptor};
use crate::decoder::{DecodedChunk, Decoder, MediaSource, frames_to_us, us_to_frames};
use crate::error::{PcmforgeError, Result};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted decoder over a fixed sample buffer.
///
/// # Example
/// ```
/// use pcmforge::audio::AudioStreamDescriptor;
/// use pcmforge::decoder::MemoryDecoder;
///
/// let decoder = MemoryDecoder::new(AudioStreamDescriptor::pcm16(8000, 1), vec![0; 800])
///     .with_chunk_frames(100)
///     .with_busy_polls(2);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryDecoder {
    descriptor: AudioStreamDescriptor,
    samples: Vec<i16>,
    chunk_frames: usize,
    queue_depth: usize,
    busy_polls: usize,
    sync_interval: usize,
    fail_after_chunks: Option<usize>,
    error_message: String,
    position_frames: usize,
    queued: VecDeque<DecodedChunk>,
    idle_polls_left: usize,
    chunks_emitted: usize,
    inputs_queued: Arc<AtomicUsize>,
}

impl MemoryDecoder {
    pub fn new(descriptor: AudioStreamDescriptor, samples: Vec<i16>) -> Self {
        Self {
            descriptor,
            samples,
            chunk_frames: 1024,
            queue_depth: 4,
            busy_polls: 0,
            sync_interval: 1,
            fail_after_chunks: None,
            error_message: "Simulated decoder failure".to_string(),
            position_frames: 0,
            queued: VecDeque::new(),
            idle_polls_left: 0,
            chunks_emitted: 0,
            inputs_queued: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Frames per emitted chunk.
    pub fn with_chunk_frames(mut self, frames: usize) -> Self {
        self.chunk_frames = frames.max(1);
        self
    }

    /// Buffers that may be queued before `queue_input` reports a full queue.
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    /// Number of empty polls before every decoded chunk becomes available.
    pub fn with_busy_polls(mut self, polls: usize) -> Self {
        self.busy_polls = polls;
        self.idle_polls_left = polls;
        self
    }

    /// Makes `seek` snap back to the previous multiple of `frames`, the way
    /// compressed decoders land on the preceding sync frame.
    pub fn with_sync_interval(mut self, frames: usize) -> Self {
        self.sync_interval = frames.max(1);
        self
    }

    /// Fails `dequeue_output` after `chunks` chunks have been emitted.
    pub fn with_failure_after(mut self, chunks: usize) -> Self {
        self.fail_after_chunks = Some(chunks);
        self
    }

    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Shared counter of input buffers accepted so far (clones share it).
    pub fn input_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.inputs_queued)
    }

    fn total_frames(&self) -> usize {
        self.samples.len() / self.descriptor.channel_count.max(1) as usize
    }

    fn timestamp_of(&self, frame: usize) -> i64 {
        frames_to_us(frame as u64, self.descriptor.sample_rate)
    }
}

impl Decoder for MemoryDecoder {
    fn descriptor(&self) -> AudioStreamDescriptor {
        self.descriptor
    }

    fn next_input_timestamp(&self) -> Option<i64> {
        (self.position_frames < self.total_frames()).then(|| self.timestamp_of(self.position_frames))
    }

    fn queue_input(&mut self, _timeout: Duration) -> Result<bool> {
        if self.queued.len() >= self.queue_depth || self.position_frames >= self.total_frames() {
            return Ok(false);
        }
        let channels = self.descriptor.channel_count.max(1) as usize;
        let end = (self.position_frames + self.chunk_frames).min(self.total_frames());
        let chunk = DecodedChunk::new(
            self.samples[self.position_frames * channels..end * channels].to_vec(),
            self.timestamp_of(self.position_frames),
        );
        self.position_frames = end;
        self.queued.push_back(chunk);
        self.inputs_queued.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn queue_end_of_stream(&mut self, _timeout: Duration) -> Result<bool> {
        if self.queued.len() >= self.queue_depth {
            return Ok(false);
        }
        self.queued
            .push_back(DecodedChunk::end_of_stream(self.timestamp_of(self.position_frames)));
        Ok(true)
    }

    fn dequeue_output(&mut self, _timeout: Duration) -> Result<Option<DecodedChunk>> {
        if self.queued.is_empty() {
            return Ok(None);
        }
        if self.idle_polls_left > 0 {
            self.idle_polls_left -= 1;
            return Ok(None);
        }
        if self.fail_after_chunks == Some(self.chunks_emitted) {
            return Err(PcmforgeError::decoder(self.error_message.clone()));
        }
        self.idle_polls_left = self.busy_polls;
        self.chunks_emitted += 1;
        Ok(self.queued.pop_front())
    }

    fn seek(&mut self, position_us: i64) -> Result<()> {
        self.queued.clear();
        let frame = us_to_frames(position_us, self.descriptor.sample_rate) as usize;
        let synced = frame / self.sync_interval * self.sync_interval;
        self.position_frames = synced.min(self.total_frames());
        Ok(())
    }
}

/// [`MediaSource`] that hands out fresh copies of one [`MemoryDecoder`],
/// whatever the path.
#[derive(Debug, Clone)]
pub struct MemorySource {
    decoder: MemoryDecoder,
    missing_track: bool,
}

impl MemorySource {
    pub fn new(decoder: MemoryDecoder) -> Self {
        Self {
            decoder,
            missing_track: false,
        }
    }

    /// Every open and probe fails with `NoAudioTrack`.
    pub fn with_missing_track(mut self) -> Self {
        self.missing_track = true;
        self
    }
}

impl MediaSource for MemorySource {
    fn open(&self, path: &Path) -> Result<Box<dyn Decoder>> {
        if self.missing_track {
            return Err(PcmforgeError::NoAudioTrack {
                path: path.display().to_string(),
            });
        }
        Ok(Box::new(self.decoder.clone()))
    }

    fn probe(&self, path: &Path) -> Result<AudioInfo> {
        if self.missing_track {
            return Err(PcmforgeError::NoAudioTrack {
                path: path.display().to_string(),
            });
        }
        let descriptor = self.decoder.descriptor;
        let frames = self.decoder.total_frames() as u64;
        Ok(AudioInfo {
            duration_ms: frames * 1000 / descriptor.sample_rate.max(1) as u64,
            sample_rate: descriptor.sample_rate,
            channels: descriptor.channel_count,
            bit_rate: descriptor.sample_rate * descriptor.channel_count * 16,
            format: "pcm".to_string(),
        })
    }
}
