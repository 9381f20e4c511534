//! Channel count conversion for interleaved 16-bit frames.

/// Converts interleaved frames from `src_channels` to `dst_channels`.
///
/// Down-mixing writes the truncated mean of all source channels to every
/// output channel. Up-mixing copies channel `c` when it exists in the
/// source and broadcasts source channel 0 to the extra channels.
/// A trailing partial frame is dropped.
pub fn convert_channels(samples: &[i16], src_channels: usize, dst_channels: usize) -> Vec<i16> {
    if src_channels == dst_channels || src_channels == 0 || dst_channels == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / src_channels;
    let mut out = Vec::with_capacity(frames * dst_channels);

    for frame in samples.chunks_exact(src_channels) {
        if dst_channels < src_channels {
            let sum: i64 = frame.iter().map(|&s| s as i64).sum();
            let mixed = (sum / src_channels as i64).clamp(i16::MIN as i64, i16::MAX as i64) as i16;
            out.extend(std::iter::repeat_n(mixed, dst_channels));
        } else {
            for ch in 0..dst_channels {
                out.push(frame[if ch < src_channels { ch } else { 0 }]);
            }
        }
    }

    out
}
