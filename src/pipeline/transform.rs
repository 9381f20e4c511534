//! Per-chunk PCM transformation: channel mix, then resample.
//!
//! Output stays 16-bit; each sink encodes the resolved bit depth itself so
//! container and in-memory sinks can keep the samples as they are.

use crate::audio::bit_depth::BitDepth;
use crate::audio::format::{AudioStreamDescriptor, TargetFormat};
use crate::audio::mixer::convert_channels;
use crate::audio::resampler::{ResamplerState, resample_chunk};
use crate::error::Result;

/// Applies the fixed mixer → resampler chain to a chunk stream.
#[derive(Debug, Clone)]
pub struct ChunkTransformer {
    source: AudioStreamDescriptor,
    output: AudioStreamDescriptor,
    resampler: Option<ResamplerState>,
}

impl ChunkTransformer {
    /// Validates `target` against `source` and prepares the stage state.
    pub fn new(source: AudioStreamDescriptor, target: &TargetFormat) -> Result<Self> {
        source.validate()?;
        target.validate()?;
        let output = target.resolve(&source);
        output.validate()?;
        BitDepth::try_from(output.bits_per_sample)?;
        let resampler = (output.sample_rate != source.sample_rate).then(|| {
            ResamplerState::new(
                source.sample_rate,
                output.sample_rate,
                output.channel_count as usize,
            )
        });

        Ok(Self {
            source,
            output,
            resampler,
        })
    }

    pub fn output(&self) -> AudioStreamDescriptor {
        self.output
    }

    /// Mixes and resamples one decoded chunk, still as 16-bit samples.
    ///
    /// `is_last` flushes the resampler's carried fraction; an empty final
    /// chunk is enough.
    pub fn process(&mut self, samples: &[i16], is_last: bool) -> Vec<i16> {
        let mixed = convert_channels(
            samples,
            self.source.channel_count as usize,
            self.output.channel_count as usize,
        );
        match self.resampler.as_mut() {
            Some(state) => resample_chunk(state, &mixed, is_last),
            None => mixed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PcmforgeError;

    #[test]
    fn source_target_is_identity() {
        let source = AudioStreamDescriptor::pcm16(44100, 2);
        let mut transformer = ChunkTransformer::new(source, &TargetFormat::source()).unwrap();
        assert_eq!(transformer.output(), source);
        assert_eq!(transformer.process(&[1, 2, 3, 4], false), vec![1, 2, 3, 4]);
        assert_eq!(transformer.process(&[], true), Vec::<i16>::new());
    }

    #[test]
    fn mixes_before_resampling() {
        let source = AudioStreamDescriptor::pcm16(2, 2);
        let target = TargetFormat::source().with_channels(1).with_sample_rate(1);
        let mut transformer = ChunkTransformer::new(source, &target).unwrap();
        assert_eq!(transformer.output().channel_count, 1);

        // Frames (10, 30) and (50, 70) mix to 20 and 60; 2 -> 1 Hz keeps the first
        let out = transformer.process(&[10, 30, 50, 70], true);
        assert_eq!(out, vec![20]);
    }

    #[test]
    fn final_empty_chunk_flushes_resampler() {
        let source = AudioStreamDescriptor::pcm16(8000, 1);
        let target = TargetFormat::source().with_sample_rate(16000);
        let mut transformer = ChunkTransformer::new(source, &target).unwrap();

        let mut out = transformer.process(&[0, 1000], false);
        out.extend(transformer.process(&[], true));
        assert_eq!(out, vec![0, 500, 1000, 1000]);
    }

    #[test]
    fn output_reports_target_depth() {
        let source = AudioStreamDescriptor::pcm16(8000, 1);
        let target = TargetFormat::source().with_bit_depth(BitDepth::TwentyFour);
        let mut transformer = ChunkTransformer::new(source, &target).unwrap();
        assert_eq!(transformer.output().bits_per_sample, 24);
        assert_eq!(transformer.process(&[1, 2], true), vec![1, 2]);
    }

    #[test]
    fn upmix_beyond_wav_channel_field_rejected() {
        let source = AudioStreamDescriptor::pcm16(8000, 1);
        let wide = TargetFormat::source().with_channels(65536);
        assert!(matches!(
            ChunkTransformer::new(source, &wide),
            Err(PcmforgeError::UnsupportedConfiguration { .. })
        ));

        let wide_frames = TargetFormat::source()
            .with_channels(16384)
            .with_bit_depth(BitDepth::ThirtyTwo);
        assert!(ChunkTransformer::new(source, &wide_frames).is_err());
    }

    #[test]
    fn invalid_target_rejected_before_processing() {
        let source = AudioStreamDescriptor::pcm16(8000, 1);
        let target = TargetFormat::source().with_sample_rate(1_000_000);
        assert!(matches!(
            ChunkTransformer::new(source, &target),
            Err(PcmforgeError::UnsupportedConfiguration { .. })
        ));
    }

    #[test]
    fn invalid_source_rejected() {
        let source = AudioStreamDescriptor::pcm16(0, 1);
        assert!(ChunkTransformer::new(source, &TargetFormat::source()).is_err());
    }
}
