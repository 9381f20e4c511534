//! Streaming linear-interpolation sample-rate conversion.
//!
//! The resampler state is an explicit value owned by one conversion and
//! passed into every call, so a stream can be fed in chunks of any size and
//! still produce the same output as a single-chunk call.
//!
//! `src_pos` is a fractional frame index into the current chunk. A negative
//! value means the next output frame lies between the previous chunk's final
//! frame (`last_frame`) and the first frame of the current chunk.

/// Per-conversion resampler state.
#[derive(Debug, Clone)]
pub struct ResamplerState {
    step: f64,
    channels: usize,
    src_pos: f64,
    last_frame: Option<Vec<i16>>,
}

impl ResamplerState {
    /// Creates state for converting `src_rate` to `dst_rate` with interleaved
    /// frames of `channels` samples.
    pub fn new(src_rate: u32, dst_rate: u32, channels: usize) -> Self {
        Self {
            step: src_rate as f64 / dst_rate as f64,
            channels: channels.max(1),
            src_pos: 0.0,
            last_frame: None,
        }
    }

    /// Source frames consumed per output frame.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Current fractional read position relative to the next chunk.
    pub fn position(&self) -> f64 {
        self.src_pos
    }

    /// Final frame of the previously processed chunk, if any.
    pub fn last_frame(&self) -> Option<&[i16]> {
        self.last_frame.as_deref()
    }
}

/// Resamples one chunk of interleaved frames.
///
/// With `is_last = false` emission stops as soon as the next output frame
/// would need a frame beyond this chunk; the carry is picked up on the next
/// call. With `is_last = true` the final frame is held (`s1 = s0`) so the
/// stream tail is emitted. Passing an empty final chunk flushes whatever
/// fraction the previous chunk left behind.
pub fn resample_chunk(state: &mut ResamplerState, chunk: &[i16], is_last: bool) -> Vec<i16> {
    let channels = state.channels;
    let chunk_frames = chunk.len() / channels;
    if chunk_frames == 0 && state.last_frame.is_none() {
        return Vec::new();
    }

    let estimated_frames = ((chunk_frames + 1) as f64 / state.step) as usize + 2;
    let mut output = Vec::with_capacity(estimated_frames * channels);

    loop {
        let idx0 = state.src_pos.floor() as i64;
        let idx1 = idx0 + 1;

        if idx0 >= chunk_frames as i64 {
            break;
        }
        if idx1 >= chunk_frames as i64 && !is_last {
            break;
        }

        let frac = state.src_pos - idx0 as f64;
        for ch in 0..channels {
            let s0 = if idx0 < 0 {
                state
                    .last_frame
                    .as_ref()
                    .map(|frame| frame[ch] as f64)
                    .unwrap_or(0.0)
            } else {
                chunk[idx0 as usize * channels + ch] as f64
            };
            let s1 = if idx1 >= chunk_frames as i64 {
                s0
            } else {
                chunk[idx1 as usize * channels + ch] as f64
            };
            let interpolated = (s0 + (s1 - s0) * frac).round();
            output.push(interpolated.clamp(i16::MIN as f64, i16::MAX as f64) as i16);
        }

        state.src_pos += state.step;
    }

    if chunk_frames > 0 {
        let start = (chunk_frames - 1) * channels;
        state.last_frame = Some(chunk[start..start + channels].to_vec());
        state.src_pos -= chunk_frames as f64;
    }

    output
}

/// Stateless convenience for a complete in-memory stream.
pub fn resample_all(samples: &[i16], src_rate: u32, dst_rate: u32, channels: usize) -> Vec<i16> {
    if src_rate == dst_rate {
        return samples.to_vec();
    }
    let mut state = ResamplerState::new(src_rate, dst_rate, channels);
    resample_chunk(&mut state, samples, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize, channels: usize) -> Vec<i16> {
        (0..frames * channels)
            .map(|i| (((i * 37) % 2000) as i16) - 1000)
            .collect()
    }

    fn resample_in_chunks(
        samples: &[i16],
        src: u32,
        dst: u32,
        channels: usize,
        chunk_frames: &[usize],
    ) -> Vec<i16> {
        let mut state = ResamplerState::new(src, dst, channels);
        let mut out = Vec::new();
        let mut offset = 0;
        let mut sizes = chunk_frames.iter().cycle();
        while offset < samples.len() {
            let frames = *sizes.next().unwrap();
            let end = (offset + frames * channels).min(samples.len());
            out.extend(resample_chunk(&mut state, &samples[offset..end], false));
            offset = end;
        }
        out.extend(resample_chunk(&mut state, &[], true));
        out
    }

    #[test]
    fn upsample_doubles_frame_count_and_interpolates() {
        let out = resample_all(&[0, 1000, 2000], 8000, 16000, 1);
        assert_eq!(out, vec![0, 500, 1000, 1500, 2000, 2000]);
    }

    #[test]
    fn downsample_halves_frame_count() {
        let out = resample_all(&[0, 10, 20, 30, 40, 50], 16000, 8000, 1);
        assert_eq!(out, vec![0, 20, 40]);
    }

    #[test]
    fn interpolation_rounds_to_nearest() {
        // 2 -> 3: positions 0, 2/3, 4/3 ...
        let out = resample_all(&[0, 1, 2], 2, 3, 1);
        // 0, 0.667 -> 1, 1.333 -> 1, 2.0 -> 2, 2.667 (held) -> 2
        assert_eq!(out, vec![0, 1, 1, 2, 2]);
    }

    #[test]
    fn stereo_channels_are_interpolated_independently() {
        let out = resample_all(&[0, 100, 10, 200], 1, 2, 2);
        assert_eq!(out, vec![0, 100, 5, 150, 10, 200, 10, 200]);
    }

    #[test]
    fn identity_rate_bypasses_resampler() {
        let samples = ramp(100, 2);
        assert_eq!(resample_all(&samples, 44100, 44100, 2), samples);
    }

    #[test]
    fn first_chunk_boundary_uses_zero_before_stream_start() {
        let mut state = ResamplerState::new(1, 1, 1);
        state.src_pos = -0.5;
        let out = resample_chunk(&mut state, &[100, 100], true);
        assert_eq!(out[0], 50);
    }

    #[test]
    fn non_final_chunk_carries_trailing_fraction() {
        let mut state = ResamplerState::new(8000, 16000, 1);
        let out = resample_chunk(&mut state, &[0, 1000], false);
        // Positions 0.0 and 0.5 need frame 1, which exists; 1.0 needs frame 2.
        assert_eq!(out, vec![0, 500]);
        assert_eq!(state.last_frame(), Some(&[1000i16][..]));
        assert!((state.position() - -1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_final_chunk_flushes_carry_from_last_frame() {
        let mut state = ResamplerState::new(8000, 16000, 1);
        let mut out = resample_chunk(&mut state, &[0, 1000], false);
        out.extend(resample_chunk(&mut state, &[], true));
        assert_eq!(out, resample_all(&[0, 1000], 8000, 16000, 1));
    }

    #[test]
    fn empty_chunk_without_history_produces_nothing() {
        let mut state = ResamplerState::new(44100, 22050, 2);
        assert!(resample_chunk(&mut state, &[], true).is_empty());
    }

    #[test]
    fn chunked_output_matches_single_chunk_within_one_lsb() {
        let cases: &[(u32, u32, usize)] = &[
            (44100, 22050, 2),
            (48000, 44100, 1),
            (22050, 48000, 2),
            (8000, 11025, 3),
            (96000, 16000, 1),
        ];
        let splits: &[&[usize]] = &[&[1], &[3, 7], &[64], &[5, 1, 129], &[1000]];

        for &(src, dst, channels) in cases {
            let samples = ramp(997, channels);
            let whole = resample_all(&samples, src, dst, channels);
            for split in splits {
                let chunked = resample_in_chunks(&samples, src, dst, channels, split);
                assert_eq!(
                    chunked.len(),
                    whole.len(),
                    "length mismatch for {}->{} split {:?}",
                    src,
                    dst,
                    split
                );
                for (i, (a, b)) in chunked.iter().zip(&whole).enumerate() {
                    assert!(
                        (*a as i32 - *b as i32).abs() <= 1,
                        "{}->{} split {:?}: sample {} differs ({} vs {})",
                        src,
                        dst,
                        split,
                        i,
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn one_second_stereo_44100_to_22050_yields_half_the_frames() {
        let samples = ramp(44100, 2);
        let out = resample_in_chunks(&samples, 44100, 22050, 2, &[1024]);
        let frames = out.len() / 2;
        assert!(
            (22049..=22051).contains(&frames),
            "expected ~22050 frames, got {}",
            frames
        );
    }

    #[test]
    fn output_never_exceeds_i16_range() {
        let samples = vec![i16::MAX, i16::MIN, i16::MAX, i16::MIN];
        let out = resample_all(&samples, 3, 7, 1);
        assert!(out.iter().all(|&s| (i16::MIN..=i16::MAX).contains(&s)));
    }
}
