//! RIFF/WAV decoder backed by `hound`.

use crate::audio::format::{AudioInfo, AudioStreamDescriptor};
use crate::decoder::{
    DecodedChunk, Decoder, DecoderSettings, MediaSource, format_from_mime, frames_to_us,
    us_to_frames,
};
use crate::error::{PcmforgeError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, bounded};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Opens WAV files (8/16/24/32-bit integer and 32-bit float PCM).
#[derive(Debug, Clone, Default)]
pub struct WavSource {
    settings: DecoderSettings,
}

impl WavSource {
    pub fn new(settings: DecoderSettings) -> Self {
        Self { settings }
    }
}

impl MediaSource for WavSource {
    fn open(&self, path: &Path) -> Result<Box<dyn Decoder>> {
        Ok(Box::new(WavDecoder::open(path, self.settings)?))
    }

    fn probe(&self, path: &Path) -> Result<AudioInfo> {
        let reader = hound::WavReader::open(path).map_err(|e| map_open_error(path, e))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 || spec.channels == 0 {
            return Err(no_audio_track(path));
        }
        let frames = reader.duration() as u64;
        let bit_rate =
            spec.sample_rate as u64 * spec.channels as u64 * spec.bits_per_sample as u64;

        Ok(AudioInfo {
            duration_ms: frames * 1000 / spec.sample_rate as u64,
            sample_rate: spec.sample_rate,
            channels: spec.channels as u32,
            bit_rate: bit_rate.min(u32::MAX as u64) as u32,
            format: format_from_mime("audio/raw"),
        })
    }
}

/// Decodes a WAV file into 16-bit chunks of `chunk_frames` frames.
///
/// Input blocks are read from disk on `queue_input` and travel through a
/// bounded channel to `dequeue_output`.
pub struct WavDecoder {
    reader: hound::WavReader<BufReader<File>>,
    spec: hound::WavSpec,
    settings: DecoderSettings,
    total_frames: u64,
    position_frames: u64,
    pending: Option<DecodedChunk>,
    tx: Sender<DecodedChunk>,
    rx: Receiver<DecodedChunk>,
}

impl WavDecoder {
    pub fn open(path: &Path, settings: DecoderSettings) -> Result<Self> {
        let reader = hound::WavReader::open(path).map_err(|e| map_open_error(path, e))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 || spec.channels == 0 {
            return Err(no_audio_track(path));
        }
        match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 8 | 16 | 24 | 32) | (hound::SampleFormat::Float, 32) => {}
            (format, bits) => {
                return Err(PcmforgeError::unsupported(format!(
                    "WAV sample format {:?} with {} bits is not supported",
                    format, bits
                )));
            }
        }

        let (tx, rx) = bounded(settings.queue_depth.max(1));
        let total_frames = reader.duration() as u64;
        debug!(
            "WAV decoder started for {}: {} Hz, {} ch, {} bits, {} frames",
            path.display(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            total_frames
        );

        Ok(Self {
            reader,
            spec,
            settings,
            total_frames,
            position_frames: 0,
            pending: None,
            tx,
            rx,
        })
    }

    fn read_block(&mut self) -> Result<Option<DecodedChunk>> {
        if self.position_frames >= self.total_frames {
            return Ok(None);
        }
        let channels = self.spec.channels as usize;
        let frames = (self.total_frames - self.position_frames)
            .min(self.settings.chunk_frames.max(1) as u64) as usize;
        let count = frames * channels;
        let bits = self.spec.bits_per_sample;

        let samples: std::result::Result<Vec<i16>, hound::Error> = match self.spec.sample_format {
            hound::SampleFormat::Float => self
                .reader
                .samples::<f32>()
                .take(count)
                .map(|s| s.map(float_to_i16))
                .collect(),
            hound::SampleFormat::Int => self
                .reader
                .samples::<i32>()
                .take(count)
                .map(|s| s.map(|v| int_to_i16(v, bits)))
                .collect(),
        };
        let samples = samples
            .map_err(|e| PcmforgeError::decoder(format!("Failed to read WAV samples: {}", e)))?;

        let timestamp_us = frames_to_us(self.position_frames, self.spec.sample_rate);
        if samples.len() < count {
            // Data chunk shorter than the header claims
            self.total_frames = self.position_frames + (samples.len() / channels) as u64;
        }
        self.position_frames += (samples.len() / channels) as u64;

        if samples.is_empty() {
            return Ok(None);
        }
        Ok(Some(DecodedChunk::new(samples, timestamp_us)))
    }
}

impl Decoder for WavDecoder {
    fn descriptor(&self) -> AudioStreamDescriptor {
        AudioStreamDescriptor::pcm16(self.spec.sample_rate, self.spec.channels as u32)
    }

    fn next_input_timestamp(&self) -> Option<i64> {
        match &self.pending {
            Some(chunk) => Some(chunk.timestamp_us),
            None if self.position_frames < self.total_frames => {
                Some(frames_to_us(self.position_frames, self.spec.sample_rate))
            }
            None => None,
        }
    }

    fn queue_input(&mut self, timeout: Duration) -> Result<bool> {
        if self.pending.is_none() {
            self.pending = self.read_block()?;
        }
        let Some(chunk) = self.pending.take() else {
            return Ok(false);
        };
        match self.tx.send_timeout(chunk, timeout) {
            Ok(()) => Ok(true),
            Err(SendTimeoutError::Timeout(chunk)) => {
                self.pending = Some(chunk);
                Ok(false)
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                Err(PcmforgeError::decoder("decoder output queue closed"))
            }
        }
    }

    fn queue_end_of_stream(&mut self, timeout: Duration) -> Result<bool> {
        self.pending = None;
        let eos = DecodedChunk::end_of_stream(frames_to_us(
            self.position_frames,
            self.spec.sample_rate,
        ));
        match self.tx.send_timeout(eos, timeout) {
            Ok(()) => Ok(true),
            Err(SendTimeoutError::Timeout(_)) => Ok(false),
            Err(SendTimeoutError::Disconnected(_)) => {
                Err(PcmforgeError::decoder("decoder output queue closed"))
            }
        }
    }

    fn dequeue_output(&mut self, timeout: Duration) -> Result<Option<DecodedChunk>> {
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(PcmforgeError::decoder("decoder input queue closed"))
            }
        }
    }

    fn seek(&mut self, position_us: i64) -> Result<()> {
        self.pending = None;
        while self.rx.try_recv().is_ok() {}

        let frame = us_to_frames(position_us, self.spec.sample_rate).min(self.total_frames);
        self.reader
            .seek(frame as u32)
            .map_err(|e| PcmforgeError::decoder(format!("Failed to seek WAV input: {}", e)))?;
        self.position_frames = frame;
        Ok(())
    }
}

fn int_to_i16(value: i32, bits: u16) -> i16 {
    match bits {
        8 => (value << 8) as i16,
        16 => value as i16,
        24 => (value >> 8) as i16,
        _ => (value >> 16) as i16,
    }
}

fn float_to_i16(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

fn no_audio_track(path: &Path) -> PcmforgeError {
    PcmforgeError::NoAudioTrack {
        path: path.display().to_string(),
    }
}

fn map_open_error(path: &Path, error: hound::Error) -> PcmforgeError {
    match error {
        hound::Error::IoError(e) => PcmforgeError::Io(e),
        hound::Error::FormatError(_) => no_audio_track(path),
        hound::Error::Unsupported => PcmforgeError::unsupported(format!(
            "WAV encoding of {} is not supported",
            path.display()
        )),
        other => PcmforgeError::DecoderStart {
            message: format!("{}: {}", path.display(), other),
        },
    }
}
