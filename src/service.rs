//! Blocking audio operations: convert, trim, probe and summarize.
//!
//! Every call is independent and owns all of its state (decoder, resampler,
//! output file), so one [`AudioService`] can be shared across threads.

use crate::audio::format::{AudioInfo, TargetFormat};
use crate::audio::wav::pcm_payload;
use crate::audio::waveform::summarize_waveform;
use crate::config::Config;
use crate::decoder::{MediaSource, WavSource};
use crate::defaults::MAX_WAVEFORM_SAMPLES;
use crate::encoder::{ContainerEncoder, OutputKind};
use crate::error::{PcmforgeError, Result};
use crate::pipeline::{
    ContainerSink, PcmSink, TranscodePipeline, TranscodeReport, TrimRange, WavFileSink,
};
use crate::scratch::{ScratchFile, ScratchRole};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Entry point for every audio operation.
#[derive(Clone)]
pub struct AudioService {
    config: Config,
    source: Arc<dyn MediaSource>,
    encoder: Option<Arc<dyn ContainerEncoder>>,
}

impl AudioService {
    /// Service decoding WAV inputs, without a container encoder.
    pub fn new(config: Config) -> Self {
        let source = Arc::new(WavSource::new(config.decoder_settings()));
        Self {
            config,
            source,
            encoder: None,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn MediaSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ContainerEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves a transport format name (`"wav"`, `"m4a"`) against the configured encoder.
    pub fn output_kind(&self, name: &str) -> Result<OutputKind> {
        OutputKind::from_name(name, self.encoder.as_ref())
    }

    /// Decodes `input` and writes it as WAV, applying `target`.
    ///
    /// A target without a bit depth uses `conversion.bit_depth` from the config.
    pub fn convert_to_wav(
        &self,
        input: &Path,
        output: &Path,
        target: TargetFormat,
    ) -> Result<PathBuf> {
        require_paths(&[input, output], "inputPath and outputPath are required")?;
        let target = self.with_default_depth(target)?;
        target.validate()?;

        let mut sink = WavFileSink::new(output);
        let report = self.transcode(input, &target, None, &mut sink)?;
        info!(
            "Converted {} -> {} ({} Hz, {} ch, {} bits, {} bytes)",
            input.display(),
            output.display(),
            report.output.sample_rate,
            report.output.channel_count,
            report.output.bits_per_sample,
            report.bytes_written
        );
        Ok(output.to_path_buf())
    }

    /// Decodes `input` and re-encodes it through the container encoder at the
    /// source rate and channel count.
    pub fn convert_to_container(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        require_paths(&[input, output], "inputPath and outputPath are required")?;
        let encoder = self.require_encoder()?;

        let mut sink =
            ContainerSink::new(output, encoder, self.config.conversion.container_bit_rate);
        self.transcode(input, &TargetFormat::source(), None, &mut sink)?;
        info!("Encoded {} -> {}", input.display(), output.display());
        Ok(output.to_path_buf())
    }

    pub fn get_audio_info(&self, path: &Path) -> Result<AudioInfo> {
        require_paths(&[path], "path is required")?;
        self.source.probe(path)
    }

    /// Copies the decoded chunks whose timestamps fall in `[start_ms, end_ms)`.
    pub fn trim_audio(
        &self,
        input: &Path,
        output: &Path,
        start_ms: i64,
        end_ms: i64,
        kind: &OutputKind,
    ) -> Result<PathBuf> {
        require_paths(
            &[input, output],
            "inputPath, outputPath, startMs and endMs are required",
        )?;
        let range = TrimRange::from_millis(start_ms, end_ms)?;

        let mut sink = self.sink_for(kind, output);
        let report = self.transcode(input, &TargetFormat::source(), Some(range), sink.as_mut())?;
        info!(
            "Trimmed {} [{} ms, {} ms) -> {} ({} chunks)",
            input.display(),
            start_ms,
            end_ms,
            output.display(),
            report.chunks
        );
        Ok(output.to_path_buf())
    }

    /// Summarizes `path` into `number_of_samples` normalized RMS values.
    pub fn get_waveform(&self, path: &Path, number_of_samples: usize) -> Result<Vec<f64>> {
        require_paths(&[path], "path and numberOfSamples are required")?;
        require_waveform_length(number_of_samples)?;
        let mut decoder = self.source.open(path)?;
        let mut pipeline = TranscodePipeline::new(self.config.pipeline_config());
        let (_, samples) = pipeline.decode_all(decoder.as_mut())?;
        Ok(summarize_waveform(&samples, number_of_samples))
    }

    /// [`convert_to_wav`](Self::convert_to_wav) over an in-memory payload.
    ///
    /// With `include_header = false` the 44-byte header is stripped and raw
    /// PCM is returned.
    pub fn convert_to_wav_bytes(
        &self,
        data: &[u8],
        format_hint: &str,
        target: TargetFormat,
        include_header: bool,
    ) -> Result<Vec<u8>> {
        require_payload(data, format_hint, "inputData and formatHint are required")?;
        let input = self.scratch_input(data, format_hint)?;
        let output = self.scratch_output("wav")?;

        self.convert_to_wav(input.path(), output.path(), target)?;
        let bytes = output.read()?;
        if include_header {
            Ok(bytes)
        } else {
            Ok(pcm_payload(&bytes).to_vec())
        }
    }

    pub fn convert_to_container_bytes(&self, data: &[u8], format_hint: &str) -> Result<Vec<u8>> {
        require_payload(data, format_hint, "inputData and formatHint are required")?;
        let encoder = self.require_encoder()?;
        let input = self.scratch_input(data, format_hint)?;
        let output = self.scratch_output(encoder.container())?;

        self.convert_to_container(input.path(), output.path())?;
        output.read()
    }

    pub fn get_audio_info_bytes(&self, data: &[u8], format_hint: &str) -> Result<AudioInfo> {
        require_payload(data, format_hint, "inputData and formatHint are required")?;
        let input = self.scratch_input(data, format_hint)?;
        self.get_audio_info(input.path())
    }

    pub fn trim_audio_bytes(
        &self,
        data: &[u8],
        format_hint: &str,
        start_ms: i64,
        end_ms: i64,
        kind: &OutputKind,
    ) -> Result<Vec<u8>> {
        require_payload(
            data,
            format_hint,
            "inputData, formatHint, startMs and endMs are required",
        )?;
        TrimRange::from_millis(start_ms, end_ms)?;
        let input = self.scratch_input(data, format_hint)?;
        let output = self.scratch_output(kind.extension())?;

        self.trim_audio(input.path(), output.path(), start_ms, end_ms, kind)?;
        output.read()
    }

    pub fn get_waveform_bytes(
        &self,
        data: &[u8],
        format_hint: &str,
        number_of_samples: usize,
    ) -> Result<Vec<f64>> {
        require_payload(
            data,
            format_hint,
            "inputData, formatHint and numberOfSamples are required",
        )?;
        require_waveform_length(number_of_samples)?;
        let input = self.scratch_input(data, format_hint)?;
        self.get_waveform(input.path(), number_of_samples)
    }

    fn transcode(
        &self,
        input: &Path,
        target: &TargetFormat,
        range: Option<TrimRange>,
        sink: &mut dyn PcmSink,
    ) -> Result<TranscodeReport> {
        let mut decoder = self.source.open(input)?;
        let mut pipeline = TranscodePipeline::new(self.config.pipeline_config());
        match range {
            Some(range) => pipeline.trim(decoder.as_mut(), range, sink),
            None => pipeline.run(decoder.as_mut(), target, sink),
        }
    }

    fn sink_for(&self, kind: &OutputKind, output: &Path) -> Box<dyn PcmSink> {
        match kind {
            OutputKind::Wav => Box::new(WavFileSink::new(output)),
            OutputKind::Container(encoder) => Box::new(ContainerSink::new(
                output,
                Arc::clone(encoder),
                self.config.conversion.container_bit_rate,
            )),
        }
    }

    fn with_default_depth(&self, mut target: TargetFormat) -> Result<TargetFormat> {
        if target.bit_depth.is_none() {
            target.bit_depth = Some(self.config.default_bit_depth()?);
        }
        Ok(target)
    }

    fn require_encoder(&self) -> Result<Arc<dyn ContainerEncoder>> {
        self.encoder
            .clone()
            .ok_or_else(|| PcmforgeError::unsupported("no m4a encoder is configured"))
    }

    fn scratch_input(&self, data: &[u8], format_hint: &str) -> Result<ScratchFile> {
        ScratchFile::with_contents(
            &self.config.scratch_dir(),
            ScratchRole::Input,
            format_hint,
            data,
        )
    }

    fn scratch_output(&self, extension: &str) -> Result<ScratchFile> {
        let (scratch, file) =
            ScratchFile::create(&self.config.scratch_dir(), ScratchRole::Output, extension)?;
        drop(file);
        Ok(scratch)
    }
}

fn require_paths(paths: &[&Path], message: &str) -> Result<()> {
    if paths.iter().any(|p| p.as_os_str().is_empty()) {
        return Err(PcmforgeError::invalid_argument(message));
    }
    Ok(())
}

fn require_waveform_length(number_of_samples: usize) -> Result<()> {
    if number_of_samples > MAX_WAVEFORM_SAMPLES {
        return Err(PcmforgeError::invalid_argument(format!(
            "numberOfSamples must be at most {} (got {})",
            MAX_WAVEFORM_SAMPLES, number_of_samples
        )));
    }
    Ok(())
}

fn require_payload(data: &[u8], format_hint: &str, message: &str) -> Result<()> {
    if data.is_empty() || format_hint.trim().is_empty() {
        return Err(PcmforgeError::invalid_argument(message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::bit_depth::BitDepth;
    use crate::audio::format::{AudioStreamDescriptor, samples_from_le_bytes};
    use crate::audio::wav::WavHeader;
    use crate::decoder::{MemoryDecoder, MemorySource};
    use crate::encoder::MockContainerEncoder;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.files.scratch_dir = Some(dir.path().to_path_buf());
        config.decoder.poll_timeout_ms = 1;
        config
    }

    fn write_fixture(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn tone(frames: usize, channels: usize) -> Vec<i16> {
        (0..frames * channels)
            .map(|i| ((i as f64 * 0.05).sin() * 8000.0) as i16)
            .collect()
    }

    fn scratch_entries(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .map(|e| e.file_name().to_string_lossy().starts_with("pcmforge_"))
                    .unwrap_or(false)
            })
            .count()
    }

    #[test]
    fn convert_to_wav_applies_target_format() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_fixture(&input, 44100, 2, &tone(4410, 2));

        let service = AudioService::new(config_in(&dir));
        let target = TargetFormat::source()
            .with_sample_rate(22050)
            .with_channels(1)
            .with_bit_depth(BitDepth::Sixteen);
        let path = service.convert_to_wav(&input, &output, target).unwrap();
        assert_eq!(path, output);

        let reader = hound::WavReader::open(&output).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.spec().channels, 1);
        let frames = reader.duration();
        assert!((2204..=2206).contains(&frames), "frames = {}", frames);
    }

    #[test]
    fn convert_to_wav_uses_configured_default_depth() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_fixture(&input, 8000, 1, &tone(100, 1));

        let mut config = config_in(&dir);
        config.conversion.bit_depth = 8;
        AudioService::new(config)
            .convert_to_wav(&input, &output, TargetFormat::source())
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(WavHeader::parse(&bytes).unwrap().bits_per_sample, 8);
        assert_eq!(bytes.len(), 44 + 100);
    }

    #[test]
    fn empty_paths_are_invalid_arguments() {
        let dir = TempDir::new().unwrap();
        let service = AudioService::new(config_in(&dir));

        let err = service
            .convert_to_wav(Path::new(""), Path::new("out.wav"), TargetFormat::source())
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("inputPath and outputPath are required"));

        assert!(service.get_audio_info(Path::new("")).unwrap_err().is_invalid_argument());
        assert!(service.get_waveform(Path::new(""), 10).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn unsupported_target_rate_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_fixture(&input, 8000, 1, &tone(100, 1));

        let err = AudioService::new(config_in(&dir))
            .convert_to_wav(&input, &output, TargetFormat::source().with_sample_rate(400_000))
            .unwrap_err();
        assert!(matches!(err, PcmforgeError::UnsupportedConfiguration { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn decoder_failure_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.wav");
        let decoder = MemoryDecoder::new(AudioStreamDescriptor::pcm16(8000, 1), tone(1000, 1))
            .with_chunk_frames(100)
            .with_failure_after(2);
        let service =
            AudioService::new(config_in(&dir)).with_source(Arc::new(MemorySource::new(decoder)));

        let err = service
            .convert_to_wav(Path::new("in.mp3"), &output, TargetFormat::source())
            .unwrap_err();
        assert!(matches!(err, PcmforgeError::DecoderRuntime { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn missing_track_is_reported() {
        let dir = TempDir::new().unwrap();
        let decoder = MemoryDecoder::new(AudioStreamDescriptor::pcm16(8000, 1), vec![]);
        let service = AudioService::new(config_in(&dir))
            .with_source(Arc::new(MemorySource::new(decoder).with_missing_track()));

        let err = service
            .convert_to_wav(
                Path::new("cover.jpg"),
                &dir.path().join("out.wav"),
                TargetFormat::source(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "No audio track found in cover.jpg");
    }

    #[test]
    fn container_conversion_requires_encoder() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        write_fixture(&input, 8000, 1, &tone(10, 1));

        let err = AudioService::new(config_in(&dir))
            .convert_to_container(&input, &dir.path().join("out.m4a"))
            .unwrap_err();
        assert!(matches!(err, PcmforgeError::UnsupportedConfiguration { .. }));
    }

    #[test]
    fn container_conversion_passes_source_format_to_encoder() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.m4a");
        write_fixture(&input, 48000, 2, &tone(480, 2));

        let encoder = Arc::new(MockContainerEncoder::new());
        AudioService::new(config_in(&dir))
            .with_encoder(encoder.clone())
            .convert_to_container(&input, &output)
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[..4], b"MOCK");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 48000);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 128_000);
        assert_eq!(bytes.len(), 16 + 480 * 2 * 2);
        assert_eq!(encoder.call_count(), 1);
    }

    #[test]
    fn trim_validates_range() {
        let dir = TempDir::new().unwrap();
        let service = AudioService::new(config_in(&dir));
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");

        for (start, end) in [(-1, 100), (100, 100), (200, 100)] {
            let err = service
                .trim_audio(&input, &output, start, end, &OutputKind::Wav)
                .unwrap_err();
            assert!(err.is_invalid_argument(), "start={} end={}", start, end);
        }
    }

    #[test]
    fn trim_writes_only_window_chunks() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        let samples: Vec<i16> = (0..1000).map(|i| i as i16).collect();
        write_fixture(&input, 1000, 1, &samples);

        let mut config = config_in(&dir);
        config.decoder.chunk_frames = 100;
        AudioService::new(config)
            .trim_audio(&input, &output, 200, 500, &OutputKind::Wav)
            .unwrap();

        let reader = hound::WavReader::open(&output).unwrap();
        let trimmed: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(trimmed.len(), 300);
        assert_eq!(trimmed[0], 200);
        assert_eq!(trimmed[299], 499);
    }

    #[test]
    fn audio_info_reads_wav_metadata() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        write_fixture(&input, 16000, 1, &tone(8000, 1));

        let info = AudioService::new(config_in(&dir))
            .get_audio_info(&input)
            .unwrap();
        assert_eq!(info.duration_ms, 500);
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.bit_rate, 256_000);
        assert_eq!(info.format, "pcm");
    }

    #[test]
    fn waveform_has_requested_length_and_unit_peak() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        write_fixture(&input, 8000, 2, &tone(4000, 2));

        let waveform = AudioService::new(config_in(&dir))
            .get_waveform(&input, 50)
            .unwrap();
        assert_eq!(waveform.len(), 50);
        let peak = waveform.iter().cloned().fold(0.0f64, f64::max);
        assert_eq!(peak, 1.0);
    }

    #[test]
    fn oversized_waveform_request_rejected_before_decoding() {
        let dir = TempDir::new().unwrap();
        let service = AudioService::new(config_in(&dir));

        // The file does not exist, so only the length check can produce this error
        let err = service
            .get_waveform(&dir.path().join("missing.wav"), 1_000_000_000_000)
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("numberOfSamples must be at most"));

        let err = service
            .get_waveform_bytes(b"RIFF", "wav", MAX_WAVEFORM_SAMPLES + 1)
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(scratch_entries(&dir), 0);
    }

    #[test]
    fn bytes_conversion_strips_header_on_request() {
        let dir = TempDir::new().unwrap();
        let fixture = dir.path().join("fixture.wav");
        let samples = tone(200, 1);
        write_fixture(&fixture, 8000, 1, &samples);
        let data = std::fs::read(&fixture).unwrap();
        std::fs::remove_file(&fixture).unwrap();

        let service = AudioService::new(config_in(&dir));
        let with_header = service
            .convert_to_wav_bytes(&data, "wav", TargetFormat::source(), true)
            .unwrap();
        let raw = service
            .convert_to_wav_bytes(&data, "wav", TargetFormat::source(), false)
            .unwrap();

        assert_eq!(with_header.len(), raw.len() + 44);
        assert_eq!(&with_header[..4], b"RIFF");
        assert_eq!(samples_from_le_bytes(&raw), samples);
        assert_eq!(scratch_entries(&dir), 0, "scratch files must be removed");
    }

    #[test]
    fn bytes_operations_clean_up_after_failure() {
        let dir = TempDir::new().unwrap();
        let service = AudioService::new(config_in(&dir));

        let err = service
            .convert_to_wav_bytes(b"not audio at all", "mp3", TargetFormat::source(), true)
            .unwrap_err();
        assert!(matches!(err, PcmforgeError::NoAudioTrack { .. }));
        assert!(service.get_waveform_bytes(b"junk", "ogg", 10).is_err());
        assert_eq!(scratch_entries(&dir), 0);
    }

    #[test]
    fn bytes_operations_validate_payload() {
        let dir = TempDir::new().unwrap();
        let service = AudioService::new(config_in(&dir));

        let err = service.get_audio_info_bytes(&[], "wav").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument: inputData and formatHint are required"
        );
        let err = service.get_waveform_bytes(b"x", " ", 5).unwrap_err();
        assert!(err.to_string().contains("numberOfSamples"));
        let err = service
            .trim_audio_bytes(b"x", "wav", 10, 5, &OutputKind::Wav)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn bytes_trim_and_info_round_through_scratch_files() {
        let dir = TempDir::new().unwrap();
        let fixture = dir.path().join("fixture.wav");
        let samples: Vec<i16> = (0..2000).map(|i| i as i16).collect();
        write_fixture(&fixture, 1000, 1, &samples);
        let data = std::fs::read(&fixture).unwrap();
        std::fs::remove_file(&fixture).unwrap();

        let mut config = config_in(&dir);
        config.decoder.chunk_frames = 250;
        let service = AudioService::new(config);

        let info = service.get_audio_info_bytes(&data, "wav").unwrap();
        assert_eq!(info.duration_ms, 2000);

        let trimmed = service
            .trim_audio_bytes(&data, "wav", 500, 1000, &OutputKind::Wav)
            .unwrap();
        let header = WavHeader::parse(&trimmed).unwrap();
        assert_eq!(header.data_size, 500 * 2);
        assert_eq!(samples_from_le_bytes(pcm_payload(&trimmed))[0], 500);
        assert_eq!(scratch_entries(&dir), 0);
    }

    #[test]
    fn bytes_container_conversion_uses_encoder() {
        let dir = TempDir::new().unwrap();
        let fixture = dir.path().join("fixture.wav");
        write_fixture(&fixture, 8000, 1, &tone(80, 1));
        let data = std::fs::read(&fixture).unwrap();
        std::fs::remove_file(&fixture).unwrap();

        let service = AudioService::new(config_in(&dir))
            .with_encoder(Arc::new(MockContainerEncoder::new()));
        let encoded = service.convert_to_container_bytes(&data, "wav").unwrap();
        assert_eq!(&encoded[..4], b"MOCK");
        assert_eq!(scratch_entries(&dir), 0);

        let kind = service.output_kind("m4a").unwrap();
        let trimmed = service.trim_audio_bytes(&data, "wav", 0, 5, &kind).unwrap();
        assert_eq!(&trimmed[..4], b"MOCK");
    }
}
