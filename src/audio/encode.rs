//! WAV container encoding for captured audio.
//!
//! The transcription endpoint accepts raw request bodies in a standard
//! PCM-in-container format; this module wraps mono `f32` samples into a
//! 16-bit PCM WAV byte buffer via `hound`.

use std::io::Cursor;

/// Encode mono `f32` samples in `[-1.0, 1.0]` as a 16-bit PCM WAV file.
///
/// Samples outside the nominal range are clamped before conversion.
///
/// # Errors
///
/// Returns a [`hound::Error`] if the writer rejects the stream; with an
/// in-memory cursor this only happens on header arithmetic overflow
/// (pathologically long input).
pub fn encode_wav_mono(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * f32::from(i16::MAX)) as i16)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
