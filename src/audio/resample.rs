//! Channel downmix and sample-rate conversion.
//!
//! The transcription endpoint expects **mono** audio at a fixed rate (16 kHz
//! by default), while capture devices deliver whatever the hardware prefers.
//! Two conversion steps bridge the gap:
//!
//! 1. [`downmix_to_mono`] — average interleaved channels into one.
//! 2. [`resample`] — linear-interpolation rate conversion.
//!
//! Linear interpolation is sufficient for speech sent to an ASR model; a
//! windowed-sinc resampler would only matter for music-grade output.

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging each frame.
///
/// The output length is `samples.len() / channels`.
///
/// * `channels == 1` returns the input as an owned `Vec` unchanged.
/// * `channels == 0` returns an empty vector.
///
/// # Example
///
/// ```rust
/// use voice_assistant::audio::downmix_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = downmix_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!(mono[0].abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample mono `samples` from `from_hz` to `to_hz` using linear
/// interpolation.
///
/// * When `from_hz == to_hz` the input is cloned and returned unchanged.
/// * Empty input yields empty output.
///
/// The output length is approximately `samples.len() * to_hz / from_hz`.
pub fn resample(samples: &[f32], from_hz: u32, to_hz: u32) -> Vec<f32> {
    if from_hz == to_hz {
        return samples.to_vec();
    }

    if samples.is_empty() || from_hz == 0 || to_hz == 0 {
        return Vec::new();
    }

    let ratio = to_hz as f64 / from_hz as f64;
    let out_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src = i as f64 / ratio;
        let idx = src as usize;
        let frac = (src - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        out.push(sample);
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
