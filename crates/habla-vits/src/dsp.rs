//! Small sample-domain helpers used by the synthesizer.

/// Linear-interpolation resampling.
///
/// Used for the pitch parameter as a playback-rate shift: rendering at
/// `rate / pitch` and playing back at `rate` raises the pitch by `pitch`
/// (and shortens the audio by the same factor).
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round().max(1.0) as usize;

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos.floor() as usize;
        let frac = (pos - idx as f64) as f32;

        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_rates_match() {
        let samples = vec![0.0, 0.5, -0.5];
        assert_eq!(resample_linear(&samples, 22050, 22050), samples);
    }

    #[test]
    fn test_downsample_halves_length() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin()).collect();
        let out = resample_linear(&samples, 22050, 11025);
        assert!((out.len() as i64 - 500).abs() <= 1);
    }

    #[test]
    fn test_upsample_interpolates() {
        let samples = vec![0.0, 1.0];
        let out = resample_linear(&samples, 1, 2);
        assert_eq!(out.len(), 4);
        // Intermediate values stay within the input range.
        assert!(out.iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_empty_input() {
        assert!(resample_linear(&[], 22050, 44100).is_empty());
    }
}
