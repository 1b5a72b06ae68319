//! # habla-audio
//!
//! Audio container encoding: converts decoded sample buffers into
//! transportable byte formats with correct header metadata.
//!
//! Encoding is pure and stateless; identical input always produces identical
//! bytes. Any failure here is a programming error (mismatched metadata), not
//! a transient fault, so nothing in this crate retries.

use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use hound::{SampleFormat, WavSpec, WavWriter};

use habla_core::{AudioBuffer, TtsError, TtsResult};

/// Supported delivery formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    /// RIFF/WAVE container, 16-bit PCM.
    #[default]
    Wav,
    /// Raw signed 16-bit little-endian PCM, no container.
    Pcm,
}

impl AudioFormat {
    /// MIME type for HTTP responses.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Pcm => "application/octet-stream",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Ok(Self::Wav),
            "pcm" | "pcm_s16le" => Ok(Self::Pcm),
            other => Err(TtsError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Encode an audio buffer into the requested format.
pub fn encode(buffer: &AudioBuffer, format: AudioFormat) -> TtsResult<Vec<u8>> {
    match format {
        AudioFormat::Wav => encode_wav(buffer),
        AudioFormat::Pcm => Ok(encode_pcm_s16le(&buffer.pcm)),
    }
}

/// Encode an audio buffer as an in-memory WAV file.
pub fn encode_wav(buffer: &AudioBuffer) -> TtsResult<Vec<u8>> {
    let spec = WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)
        .map_err(|e| TtsError::internal(format!("wav writer: {e}")))?;

    for &sample in buffer.pcm.iter() {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| TtsError::internal(format!("wav write: {e}")))?;
    }

    writer
        .finalize()
        .map_err(|e| TtsError::internal(format!("wav finalize: {e}")))?;

    Ok(cursor.into_inner())
}

/// Encode samples as raw signed 16-bit little-endian PCM.
pub fn encode_pcm_s16le(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&sample_i16.to_le_bytes());
    }
    bytes
}

/// Write an audio buffer to a WAV file on disk.
pub fn write_wav(path: impl AsRef<Path>, buffer: &AudioBuffer) -> TtsResult<()> {
    let bytes = encode_wav(buffer)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_buffer() -> AudioBuffer {
        let pcm: Vec<f32> = (0..2205)
            .map(|i| (i as f32 * 0.01).sin() * 0.5)
            .collect();
        AudioBuffer::mono(pcm, 22050)
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("wav".parse::<AudioFormat>().unwrap(), AudioFormat::Wav);
        assert_eq!("WAV".parse::<AudioFormat>().unwrap(), AudioFormat::Wav);
        assert_eq!("pcm".parse::<AudioFormat>().unwrap(), AudioFormat::Pcm);

        let err = "mp3".parse::<AudioFormat>().unwrap_err();
        assert!(matches!(err, TtsError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_wav_header_fields() {
        let buffer = test_buffer();
        let bytes = encode_wav(&buffer).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        // fmt chunk: channels at offset 22, sample rate at offset 24
        let channels = u16::from_le_bytes([bytes[22], bytes[23]]);
        let sample_rate = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
        let bits = u16::from_le_bytes([bytes[34], bytes[35]]);
        assert_eq!(channels, 1);
        assert_eq!(sample_rate, 22050);
        assert_eq!(bits, 16);
    }

    #[test]
    fn test_wav_payload_size() {
        let buffer = test_buffer();
        let bytes = encode_wav(&buffer).unwrap();
        // 44-byte canonical header + 2 bytes per sample
        assert_eq!(bytes.len(), 44 + buffer.pcm.len() * 2);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let buffer = test_buffer();
        let a = encode(&buffer, AudioFormat::Wav).unwrap();
        let b = encode(&buffer, AudioFormat::Wav).unwrap();
        assert_eq!(a, b);

        let a = encode(&buffer, AudioFormat::Pcm).unwrap();
        let b = encode(&buffer, AudioFormat::Pcm).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pcm_clamping() {
        let bytes = encode_pcm_s16le(&[2.0, -2.0]);
        assert_eq!(bytes.len(), 4);

        let first = i16::from_le_bytes([bytes[0], bytes[1]]);
        assert_eq!(first, i16::MAX);

        let second = i16::from_le_bytes([bytes[2], bytes[3]]);
        assert!(second < -30_000);
    }

    #[test]
    fn test_write_wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let buffer = test_buffer();

        write_wav(&path, &buffer).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.channels, 1);
        assert_eq!(reader.len() as usize, buffer.pcm.len());
    }
}
