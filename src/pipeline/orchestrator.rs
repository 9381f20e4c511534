//! Drives a decoder through the transform chain into a sink.

use crate::audio::format::{AudioStreamDescriptor, TargetFormat};
use crate::decoder::Decoder;
use crate::defaults::DECODER_POLL_TIMEOUT_MS;
use crate::error::{PcmforgeError, Result};
use crate::pipeline::sink::{CollectorSink, PcmSink};
use crate::pipeline::state::PipelineState;
use crate::pipeline::transform::ChunkTransformer;
use log::{debug, info, warn};
use std::time::Duration;

/// Configuration for the transcode pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Bound on every decoder queue wait
    pub poll_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(DECODER_POLL_TIMEOUT_MS),
        }
    }
}

/// Half-open time window `[start_us, end_us)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimRange {
    pub start_us: i64,
    pub end_us: i64,
}

impl TrimRange {
    /// Builds a range from caller milliseconds; needs `0 <= start_ms < end_ms`.
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Result<Self> {
        if start_ms < 0 {
            return Err(PcmforgeError::invalid_argument(format!(
                "startMs must not be negative (got {})",
                start_ms
            )));
        }
        if end_ms <= start_ms {
            return Err(PcmforgeError::invalid_argument(format!(
                "endMs ({}) must be greater than startMs ({})",
                end_ms, start_ms
            )));
        }
        Ok(Self {
            start_us: start_ms.saturating_mul(1000),
            end_us: end_ms.saturating_mul(1000),
        })
    }

    pub fn contains(&self, timestamp_us: i64) -> bool {
        timestamp_us >= self.start_us && timestamp_us < self.end_us
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeReport {
    /// Source frames forwarded to the transform chain
    pub frames_decoded: u64,
    /// Decoded chunks forwarded (trimmed-out chunks excluded)
    pub chunks: usize,
    /// Bytes stored by the sink
    pub bytes_written: u64,
    pub output: AudioStreamDescriptor,
}

/// Sequential decode → transform → sink driver.
///
/// One pipeline serves one run at a time; it owns nothing between runs
/// except its last [`PipelineState`].
#[derive(Debug, Default)]
pub struct TranscodePipeline {
    config: PipelineConfig,
    state: PipelineState,
}

impl TranscodePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Decodes everything, transforms it to `target` and stores it in `sink`.
    pub fn run(
        &mut self,
        decoder: &mut dyn Decoder,
        target: &TargetFormat,
        sink: &mut dyn PcmSink,
    ) -> Result<TranscodeReport> {
        self.execute(decoder, target, None, sink)
    }

    /// Copies only the chunks whose timestamp falls inside `range`, untransformed.
    pub fn trim(
        &mut self,
        decoder: &mut dyn Decoder,
        range: TrimRange,
        sink: &mut dyn PcmSink,
    ) -> Result<TranscodeReport> {
        self.execute(decoder, &TargetFormat::source(), Some(range), sink)
    }

    /// Decodes the whole stream into memory as 16-bit samples.
    pub fn decode_all(
        &mut self,
        decoder: &mut dyn Decoder,
    ) -> Result<(AudioStreamDescriptor, Vec<i16>)> {
        let mut collector = CollectorSink::new();
        let report = self.run(decoder, &TargetFormat::source(), &mut collector)?;
        Ok((report.output, collector.into_samples()))
    }

    fn execute(
        &mut self,
        decoder: &mut dyn Decoder,
        target: &TargetFormat,
        range: Option<TrimRange>,
        sink: &mut dyn PcmSink,
    ) -> Result<TranscodeReport> {
        match self.stream(decoder, target, range, sink) {
            Ok(report) => {
                self.transition(PipelineState::Done);
                info!(
                    "Transcode done: {} frames in {} chunks, {} bytes to {} sink ({} Hz, {} ch, {} bits)",
                    report.frames_decoded,
                    report.chunks,
                    report.bytes_written,
                    sink.name(),
                    report.output.sample_rate,
                    report.output.channel_count,
                    report.output.bits_per_sample
                );
                Ok(report)
            }
            Err(e) => {
                sink.abort();
                self.transition(PipelineState::Failed);
                warn!("Transcode failed in {} sink: {}", sink.name(), e);
                Err(e)
            }
        }
    }

    fn stream(
        &mut self,
        decoder: &mut dyn Decoder,
        target: &TargetFormat,
        range: Option<TrimRange>,
        sink: &mut dyn PcmSink,
    ) -> Result<TranscodeReport> {
        self.transition(PipelineState::Opened);
        let source = decoder.descriptor();
        let mut transformer = ChunkTransformer::new(source, target)?;
        let output = transformer.output();
        sink.open(output)?;
        if let Some(range) = range {
            decoder.seek(range.start_us)?;
        }

        self.transition(PipelineState::Streaming);
        let timeout = self.config.poll_timeout;
        let channels = source.channel_count as usize;
        let mut input_done = false;
        let mut frames_decoded = 0u64;
        let mut chunks = 0usize;

        loop {
            if !input_done {
                let end_reached = match decoder.next_input_timestamp() {
                    None => true,
                    Some(ts) => range.is_some_and(|r| ts >= r.end_us),
                };
                if end_reached {
                    input_done = decoder.queue_end_of_stream(timeout)?;
                    if input_done {
                        debug!("Decoder input closed");
                    }
                } else {
                    decoder.queue_input(timeout)?;
                }
            }

            let Some(chunk) = decoder.dequeue_output(timeout)? else {
                continue;
            };

            if chunk.samples.len() % channels != 0 {
                return Err(PcmforgeError::decoder(format!(
                    "decoded chunk of {} samples is not aligned to {} channels",
                    chunk.samples.len(),
                    channels
                )));
            }

            let keep = !chunk.samples.is_empty()
                && range.is_none_or(|r| r.contains(chunk.timestamp_us));
            let samples: &[i16] = if keep { &chunk.samples } else { &[] };
            if keep {
                frames_decoded += (samples.len() / channels) as u64;
                chunks += 1;
            }

            let transformed = transformer.process(samples, chunk.end_of_stream);
            sink.write(&transformed)?;

            if chunk.end_of_stream {
                break;
            }
        }

        self.transition(PipelineState::Finalizing);
        let bytes_written = sink.finish()?;

        Ok(TranscodeReport {
            frames_decoded,
            chunks,
            bytes_written,
            output,
        })
    }

    fn transition(&mut self, next: PipelineState) {
        if !self.state.can_transition_to(next) {
            warn!("Unexpected pipeline transition {} -> {}", self.state, next);
        }
        debug!("Pipeline {} -> {}", self.state, next);
        self.state = next;
    }
}
