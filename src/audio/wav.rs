//! Canonical 44-byte RIFF/WAV header codec and the streaming WAV writer.
//!
//! The writer puts a placeholder header at offset 0, appends PCM as it is
//! produced and patches the header once the payload size is known. A writer
//! that is dropped without a successful [`StreamingWavWriter::finalize`]
//! deletes its file, so a failed conversion never leaves a truncated WAV.

use crate::audio::format::AudioStreamDescriptor;
use crate::defaults::{MAX_WAV_DATA_SIZE, WAV_HEADER_SIZE};
use crate::error::{PcmforgeError, Result};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;

/// Builds the canonical header for a PCM payload of `pcm_data_size` bytes.
pub fn build_wav_header(
    pcm_data_size: u32,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = (sample_rate as u64 * channels as u64 * bits_per_sample as u64 / 8) as u32;
    let block_align = (channels as u32 * bits_per_sample as u32 / 8) as u16;

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&36u32.wrapping_add(pcm_data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    header[20..22].copy_from_slice(&PCM_FORMAT.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&pcm_data_size.to_le_bytes());

    header
}

/// Builds the header for `descriptor` with a payload of `pcm_data_size` bytes.
///
/// Fails when the descriptor does not fit the 16-bit fmt fields.
pub fn header_for(
    descriptor: &AudioStreamDescriptor,
    pcm_data_size: u32,
) -> Result<[u8; WAV_HEADER_SIZE]> {
    descriptor.validate()?;
    let narrow = |value: u32, field: &str| {
        u16::try_from(value).map_err(|_| {
            PcmforgeError::unsupported(format!("{} {} does not fit a WAV header", field, value))
        })
    };
    Ok(build_wav_header(
        pcm_data_size,
        descriptor.sample_rate,
        narrow(descriptor.channel_count, "channel count")?,
        narrow(descriptor.bits_per_sample, "bit depth")?,
    ))
}

/// Fields of a parsed canonical WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Parses a canonical 44-byte PCM header.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < WAV_HEADER_SIZE {
            return Err(PcmforgeError::invalid_argument(format!(
                "WAV header needs {} bytes, got {}",
                WAV_HEADER_SIZE,
                bytes.len()
            )));
        }
        let tag = |range: std::ops::Range<usize>, expected: &[u8; 4], what: &str| {
            if &bytes[range] == expected {
                Ok(())
            } else {
                Err(PcmforgeError::invalid_argument(format!(
                    "Invalid WAV: missing {} marker",
                    what
                )))
            }
        };
        tag(0..4, b"RIFF", "RIFF")?;
        tag(8..12, b"WAVE", "WAVE")?;
        tag(12..16, b"fmt ", "fmt")?;
        tag(36..40, b"data", "data")?;

        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at =
            |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        if u32_at(16) != FMT_CHUNK_SIZE {
            return Err(PcmforgeError::invalid_argument(
                "Invalid WAV: fmt chunk is not 16 bytes",
            ));
        }
        let audio_format = u16_at(20);
        if audio_format != PCM_FORMAT {
            return Err(PcmforgeError::unsupported(format!(
                "WAV audio format {} is not PCM",
                audio_format
            )));
        }

        Ok(Self {
            riff_size: u32_at(4),
            audio_format,
            channels: u16_at(22),
            sample_rate: u32_at(24),
            byte_rate: u32_at(28),
            block_align: u16_at(32),
            bits_per_sample: u16_at(34),
            data_size: u32_at(40),
        })
    }

    pub fn descriptor(&self) -> AudioStreamDescriptor {
        AudioStreamDescriptor {
            sample_rate: self.sample_rate,
            channel_count: self.channels as u32,
            bits_per_sample: self.bits_per_sample as u32,
        }
    }
}

/// Returns the PCM payload of a canonical WAV file (everything after the header).
pub fn pcm_payload(wav: &[u8]) -> &[u8] {
    if wav.len() >= WAV_HEADER_SIZE {
        &wav[WAV_HEADER_SIZE..]
    } else {
        &[]
    }
}

/// Fails with [`PcmforgeError::SizeLimitExceeded`] when `total` exceeds `limit`.
pub(crate) fn ensure_within_limit(total: u64, limit: u64) -> Result<()> {
    if total > limit {
        Err(PcmforgeError::SizeLimitExceeded { written: total })
    } else {
        Ok(())
    }
}

/// Two-pass WAV file writer with patch-or-delete cleanup.
pub struct StreamingWavWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    descriptor: AudioStreamDescriptor,
    bytes_written: u64,
    max_data_size: u64,
    finished: bool,
}

impl StreamingWavWriter {
    /// Creates (or truncates) `path` and writes the placeholder header.
    pub fn create(path: &Path, descriptor: AudioStreamDescriptor) -> Result<Self> {
        let placeholder = header_for(&descriptor, 0)?;
        let file = File::create(path)?;
        let mut writer = Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
            descriptor,
            bytes_written: 0,
            max_data_size: MAX_WAV_DATA_SIZE,
            finished: false,
        };
        writer.inner()?.write_all(&placeholder)?;
        debug!("WAV writer opened {} ({:?})", path.display(), descriptor);
        Ok(writer)
    }

    /// Lowers the payload ceiling below the WAV format maximum.
    pub fn with_max_data_size(mut self, max_data_size: u64) -> Self {
        self.max_data_size = max_data_size.min(MAX_WAV_DATA_SIZE);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// PCM bytes appended so far (header excluded).
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Appends PCM bytes.
    ///
    /// Exceeding the size ceiling deletes the file immediately and returns
    /// [`PcmforgeError::SizeLimitExceeded`].
    pub fn append(&mut self, pcm: &[u8]) -> Result<()> {
        let total = self.bytes_written + pcm.len() as u64;
        if let Err(e) = ensure_within_limit(total, self.max_data_size) {
            self.discard();
            return Err(e);
        }
        self.inner()?.write_all(pcm)?;
        self.bytes_written = total;
        Ok(())
    }

    /// Rewrites the header with the real payload size and closes the file.
    ///
    /// Returns the PCM payload size. On error the file is deleted.
    pub fn finalize(mut self) -> Result<u64> {
        let mut writer = self.writer.take().ok_or_else(|| {
            PcmforgeError::Io(std::io::Error::other("WAV writer already discarded"))
        })?;
        let header = header_for(&self.descriptor, self.bytes_written as u32)?;

        writer.flush()?;
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&header)?;
        writer.flush()?;
        drop(writer);

        self.finished = true;
        debug!(
            "WAV writer finalized {} with {} PCM bytes",
            self.path.display(),
            self.bytes_written
        );
        Ok(self.bytes_written)
    }

    fn inner(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or_else(|| {
            PcmforgeError::Io(std::io::Error::other("WAV writer already discarded"))
        })
    }

    fn discard(&mut self) {
        self.writer = None;
        if self.finished {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial WAV output {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove partial WAV output {}: {}",
                self.path.display(),
                e
            ),
        }
        self.finished = true;
    }
}

impl Drop for StreamingWavWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.discard();
        }
    }
}
