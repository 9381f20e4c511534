//! Fixed-length RMS waveform summaries.

/// Reduces `samples` to exactly `number_of_samples` peak-normalized RMS values.
///
/// Samples are windowed as they come, interleaved channels included. Windows
/// start at `i * total / n` and span `max(1, total / n)` samples; with fewer
/// samples than windows, neighbouring windows share samples.
pub fn summarize_waveform(samples: &[i16], number_of_samples: usize) -> Vec<f64> {
    if samples.is_empty() || number_of_samples == 0 {
        return vec![0.0; number_of_samples];
    }

    let total = samples.len();
    let span = (total / number_of_samples).max(1);
    let mut waveform = Vec::with_capacity(number_of_samples);
    let mut max_rms = 0.0f64;

    for i in 0..number_of_samples {
        let start = ((i as u128 * total as u128) / number_of_samples as u128) as usize;
        if start >= total {
            break;
        }
        let end = (start + span).min(total);

        let sum_squares: f64 = samples[start..end]
            .iter()
            .map(|&s| {
                let v = s as f64;
                v * v
            })
            .sum();
        let rms = (sum_squares / (end - start) as f64).sqrt();
        max_rms = max_rms.max(rms);
        waveform.push(rms);
    }

    if max_rms > 0.0 {
        for value in &mut waveform {
            *value /= max_rms;
        }
    }

    waveform.resize(number_of_samples, 0.0);
    waveform
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_requested_zeros() {
        assert_eq!(summarize_waveform(&[], 5), vec![0.0; 5]);
    }

    #[test]
    fn zero_requested_samples_yields_empty() {
        assert!(summarize_waveform(&[1, 2, 3], 0).is_empty());
    }

    #[test]
    fn silence_yields_all_zeros() {
        let out = summarize_waveform(&vec![0i16; 1000], 10);
        assert_eq!(out, vec![0.0; 10]);
    }

    #[test]
    fn length_always_matches_request() {
        for total in [1usize, 2, 7, 100, 1001] {
            for n in [1usize, 3, 10, 100, 2000] {
                let samples: Vec<i16> = (0..total).map(|i| (i % 300) as i16).collect();
                assert_eq!(summarize_waveform(&samples, n).len(), n, "total={} n={}", total, n);
            }
        }
    }

    #[test]
    fn loudest_window_normalizes_to_one() {
        let mut samples = vec![100i16; 300];
        samples[200..300].fill(400);
        let out = summarize_waveform(&samples, 3);
        assert_eq!(out.len(), 3);
        assert!((out[0] - 0.25).abs() < 1e-12);
        assert!((out[1] - 0.25).abs() < 1e-12);
        assert!((out[2] - 1.0).abs() < 1e-12);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn rms_uses_window_mean_of_squares() {
        // Window [3, 4] -> sqrt((9 + 16) / 2); window [0, 0] -> 0
        let out = summarize_waveform(&[3, 4, 0, 0], 2);
        assert!((out[0] - 1.0).abs() < 1e-12);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn short_input_repeats_samples_across_windows() {
        // 3 samples, 5 windows: starts 0,0,1,1,2
        let out = summarize_waveform(&[10, 10, 10], 5);
        assert_eq!(out, vec![1.0; 5]);

        // Negative samples contribute by magnitude
        let out = summarize_waveform(&[-10, 5], 4);
        assert_eq!(out.len(), 4);
        assert!((out[0] - 1.0).abs() < 1e-12);
        assert!((out[3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn peak_is_exactly_one_for_non_silent_input() {
        let samples: Vec<i16> = (0..5000).map(|i| ((i * 31) % 600) as i16 - 300).collect();
        let out = summarize_waveform(&samples, 64);
        let max = out.iter().cloned().fold(0.0f64, f64::max);
        assert_eq!(max, 1.0);
    }
}
