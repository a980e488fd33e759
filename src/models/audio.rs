// Data models for speech input and transcription

use serde::{Deserialize, Serialize};
use std::io::Cursor;

// ==============================================================================
// Audio Clip
// ==============================================================================

/// Audio captured from the microphone, samples interleaved per channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub samples: Vec<f32>, // [-1.0, 1.0]
    pub channels: u16,     // 1 = mono, 2 = stereo
    pub sample_rate: u32,  // Hz (e.g., 16000)
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, 1, sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }

    /// Downmix to one channel by averaging each interleaved frame.
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }

    /// Encode as a mono 16-bit PCM WAV file.
    pub fn to_wav_bytes(&self) -> AudioResult<Vec<u8>> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidFormat("sample rate is zero".to_string()));
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for sample in self.to_mono() {
                let pcm = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer.write_sample(pcm)?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }
}

// ==============================================================================
// Transcriber Configuration
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriberBackend {
    Mock,        // Fixed text, no network
    HuggingFace, // Hosted Whisper inference API
}

impl TranscriberBackend {
    pub fn to_string(&self) -> &'static str {
        match self {
            TranscriberBackend::Mock => "mock",
            TranscriberBackend::HuggingFace => "hugging_face",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mock" => Some(TranscriberBackend::Mock),
            "hugging_face" | "huggingface" => Some(TranscriberBackend::HuggingFace),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriberConfig {
    pub backend: TranscriberBackend,
    pub api_url: String,
    pub mock_text: String,
    pub request_timeout_secs: u64,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            backend: TranscriberBackend::Mock,
            api_url: "https://api-inference.huggingface.co/models/openai/whisper-small"
                .to_string(),
            mock_text: "Hello from the other side.".to_string(),
            request_timeout_secs: 30,
        }
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("API request failed: {status} - {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Missing API token: set {0}")]
    MissingToken(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_downmix_averages_channels() {
        let clip = AudioClip::new(vec![0.2, 0.4, -1.0, 1.0, 0.5, 0.5], 2, 16000);
        let mono = clip.to_mono();
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert_eq!(mono[1], 0.0);
        assert_eq!(mono[2], 0.5);
    }

    #[test]
    fn test_wav_bytes_are_mono_pcm16() {
        let clip = AudioClip::new(vec![0.0, 0.0, 1.0, 1.0, -1.0, -1.0], 2, 16000);
        let bytes = clip.to_wav_bytes().unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_rate, 16000);

        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, i16::MAX, -i16::MAX]);
    }

    #[test]
    fn test_zero_sample_rate_is_rejected() {
        let clip = AudioClip::mono(vec![0.1], 0);
        assert!(matches!(clip.to_wav_bytes(), Err(AudioError::InvalidFormat(_))));
    }

    #[test]
    fn test_duration() {
        let clip = AudioClip::new(vec![0.0; 32000], 2, 16000);
        assert_eq!(clip.duration_ms(), 1000);
    }

    #[test]
    fn test_transcriber_backend_from_string() {
        assert_eq!(
            TranscriberBackend::from_string("HuggingFace"),
            Some(TranscriberBackend::HuggingFace)
        );
        assert_eq!(TranscriberBackend::from_string("mock"), Some(TranscriberBackend::Mock));
        assert_eq!(TranscriberBackend::from_string("whisper-local"), None);
    }
}
