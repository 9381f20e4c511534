use crate::audio::bit_depth::{BitDepth, convert_bit_depth};
use crate::audio::format::AudioStreamDescriptor;
use crate::audio::wav::StreamingWavWriter;
use crate::encoder::ContainerEncoder;
use crate::error::{PcmforgeError, Result};
use log::{debug, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Pluggable PCM output for the transcode pipeline.
///
/// Samples arrive already mixed and resampled; a sink decides how to store
/// them. A sink that is aborted, or dropped before `finish`, leaves no
/// output behind.
pub trait PcmSink: Send {
    /// Called once before the first `write` with the output format.
    fn open(&mut self, descriptor: AudioStreamDescriptor) -> Result<()>;

    /// Handles one transformed chunk.
    fn write(&mut self, samples: &[i16]) -> Result<()>;

    /// Completes the output. Returns the number of bytes stored.
    fn finish(&mut self) -> Result<u64>;

    /// Discards any partial output.
    fn abort(&mut self) {}

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Streams PCM into a WAV file at the descriptor's bit depth.
pub struct WavFileSink {
    path: PathBuf,
    max_data_size: Option<u64>,
    depth: BitDepth,
    writer: Option<StreamingWavWriter>,
}

impl WavFileSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            max_data_size: None,
            depth: BitDepth::default(),
            writer: None,
        }
    }

    /// Lowers the payload ceiling (see [`StreamingWavWriter::with_max_data_size`]).
    pub fn with_max_data_size(mut self, max_data_size: u64) -> Self {
        self.max_data_size = Some(max_data_size);
        self
    }

    fn writer(&mut self) -> Result<&mut StreamingWavWriter> {
        self.writer.as_mut().ok_or_else(|| {
            PcmforgeError::Io(std::io::Error::other("WAV sink used before open"))
        })
    }
}

impl PcmSink for WavFileSink {
    fn open(&mut self, descriptor: AudioStreamDescriptor) -> Result<()> {
        self.depth = BitDepth::try_from(descriptor.bits_per_sample)?;
        let mut writer = StreamingWavWriter::create(&self.path, descriptor)?;
        if let Some(limit) = self.max_data_size {
            writer = writer.with_max_data_size(limit);
        }
        self.writer = Some(writer);
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let bytes = convert_bit_depth(samples, self.depth);
        self.writer()?.append(&bytes)
    }

    fn finish(&mut self) -> Result<u64> {
        let writer = self.writer.take().ok_or_else(|| {
            PcmforgeError::Io(std::io::Error::other("WAV sink used before open"))
        })?;
        writer.finalize()
    }

    fn abort(&mut self) {
        // Dropping an unfinished writer deletes the file
        self.writer = None;
    }

    fn name(&self) -> &'static str {
        "wav"
    }
}

/// Buffers the 16-bit stream and hands it to a [`ContainerEncoder`] on finish.
pub struct ContainerSink {
    path: PathBuf,
    encoder: Arc<dyn ContainerEncoder>,
    bit_rate: u32,
    descriptor: Option<AudioStreamDescriptor>,
    samples: Vec<i16>,
    created: bool,
}

impl ContainerSink {
    pub fn new(path: &Path, encoder: Arc<dyn ContainerEncoder>, bit_rate: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            encoder,
            bit_rate,
            descriptor: None,
            samples: Vec::new(),
            created: false,
        }
    }

    fn remove_output(&mut self) {
        if !self.created {
            return;
        }
        self.created = false;
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial container output {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove partial container output {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl PcmSink for ContainerSink {
    fn open(&mut self, descriptor: AudioStreamDescriptor) -> Result<()> {
        if descriptor.bits_per_sample != 16 {
            return Err(PcmforgeError::unsupported(format!(
                "container output takes 16-bit PCM, got {} bits",
                descriptor.bits_per_sample
            )));
        }
        self.descriptor = Some(descriptor);
        self.samples.clear();
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<()> {
        self.samples.extend_from_slice(samples);
        Ok(())
    }

    fn finish(&mut self) -> Result<u64> {
        let descriptor = self.descriptor.ok_or_else(|| {
            PcmforgeError::Io(std::io::Error::other("container sink used before open"))
        })?;
        let encoded = self.encoder.encode(
            &self.samples,
            descriptor.sample_rate,
            descriptor.channel_count,
            self.bit_rate,
        )?;

        let mut file = std::fs::File::create(&self.path)?;
        self.created = true;
        let written = file.write_all(&encoded).and_then(|()| file.flush());
        drop(file);
        if let Err(e) = written {
            self.remove_output();
            return Err(e.into());
        }

        self.created = false;
        self.samples = Vec::new();
        Ok(encoded.len() as u64)
    }

    fn abort(&mut self) {
        self.samples = Vec::new();
        self.remove_output();
    }

    fn name(&self) -> &'static str {
        "container"
    }
}

/// Keeps every sample in memory. Used for waveform summaries and tests.
#[derive(Debug, Default)]
pub struct CollectorSink {
    descriptor: Option<AudioStreamDescriptor>,
    samples: Vec<i16>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor(&self) -> Option<AudioStreamDescriptor> {
        self.descriptor
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

impl PcmSink for CollectorSink {
    fn open(&mut self, descriptor: AudioStreamDescriptor) -> Result<()> {
        self.descriptor = Some(descriptor);
        self.samples.clear();
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<()> {
        self.samples.extend_from_slice(samples);
        Ok(())
    }

    fn finish(&mut self) -> Result<u64> {
        Ok(self.samples.len() as u64 * 2)
    }

    fn abort(&mut self) {
        self.samples.clear();
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}
