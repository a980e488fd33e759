use crate::models::audio::{
    AudioClip, AudioError, AudioResult, TranscriberBackend, TranscriberConfig,
};
use async_trait::async_trait;
use std::time::Duration;

/// Environment variable holding the inference API token
pub const HUGGINGFACE_TOKEN_VAR: &str = "HUGGINGFACE_TOKEN";

// ==============================================================================
// Transcriber Capability
// ==============================================================================

#[async_trait]
pub trait AudioTranscriber: Send + Sync {
    /// Transcribe a clip to text
    async fn transcribe(&self, clip: &AudioClip) -> AudioResult<String>;

    fn backend(&self) -> TranscriberBackend;
}

// ==============================================================================
// Hosted Whisper (Hugging Face Inference API)
// ==============================================================================

pub struct HuggingFaceTranscriber {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
}

impl HuggingFaceTranscriber {
    pub fn new(api_url: String, api_token: String, timeout: Duration) -> AudioResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url,
            api_token,
        })
    }

    /// Build from configuration, reading the token from the environment.
    pub fn from_config(config: &TranscriberConfig) -> AudioResult<Self> {
        let api_token = std::env::var(HUGGINGFACE_TOKEN_VAR)
            .map_err(|_| AudioError::MissingToken(HUGGINGFACE_TOKEN_VAR))?;
        Self::new(
            config.api_url.clone(),
            api_token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl AudioTranscriber for HuggingFaceTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> AudioResult<String> {
        let wav = clip.to_wav_bytes()?;
        log::debug!(
            "Uploading {} ms of audio ({} bytes) to {}",
            clip.duration_ms(),
            wav.len(),
            self.api_url
        );

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();

        if status == reqwest::StatusCode::OK {
            body.get("text")
                .and_then(|t| t.as_str())
                .map(|t| t.to_string())
                .ok_or_else(|| {
                    AudioError::TranscriptionFailed("No transcription text in response".to_string())
                })
        } else {
            let message = body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("Unknown error")
                .to_string();
            Err(AudioError::RequestFailed {
                status: status.as_u16(),
                message,
            })
        }
    }

    fn backend(&self) -> TranscriberBackend {
        TranscriberBackend::HuggingFace
    }
}

// ==============================================================================
// Mock Transcriber
// ==============================================================================

pub struct MockTranscriber {
    text: String,
}

impl MockTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl AudioTranscriber for MockTranscriber {
    async fn transcribe(&self, _clip: &AudioClip) -> AudioResult<String> {
        Ok(self.text.clone())
    }

    fn backend(&self) -> TranscriberBackend {
        TranscriberBackend::Mock
    }
}

// ==============================================================================
// Loading and Session Helpers
// ==============================================================================

pub fn load_transcriber(config: &TranscriberConfig) -> AudioResult<Box<dyn AudioTranscriber>> {
    log::info!("Loading {} transcriber", config.backend.to_string());
    match config.backend {
        TranscriberBackend::Mock => Ok(Box::new(MockTranscriber::new(config.mock_text.clone()))),
        TranscriberBackend::HuggingFace => {
            Ok(Box::new(HuggingFaceTranscriber::from_config(config)?))
        }
    }
}

/// Transcribe for display in the chat.
///
/// No clip or an empty clip gives an empty string; a failure gives a visible
/// placeholder instead of an error.
pub async fn transcribe_or_placeholder(
    transcriber: &dyn AudioTranscriber,
    clip: Option<&AudioClip>,
) -> String {
    let clip = match clip {
        Some(clip) if !clip.is_empty() => clip,
        _ => return String::new(),
    };

    match transcriber.transcribe(clip).await {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Transcription error: {}", e);
            format!("Transcription failed: {}", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenTranscriber;

    #[async_trait]
    impl AudioTranscriber for BrokenTranscriber {
        async fn transcribe(&self, _clip: &AudioClip) -> AudioResult<String> {
            Err(AudioError::RequestFailed {
                status: 503,
                message: "Model is loading".to_string(),
            })
        }

        fn backend(&self) -> TranscriberBackend {
            TranscriberBackend::HuggingFace
        }
    }

    #[tokio::test]
    async fn test_mock_transcriber_returns_fixed_text() {
        let transcriber = MockTranscriber::new("Guten Tag");
        let clip = AudioClip::mono(vec![0.1; 160], 16000);
        assert_eq!(transcriber.transcribe(&clip).await.unwrap(), "Guten Tag");
    }

    #[tokio::test]
    async fn test_empty_or_missing_clip_gives_empty_text() {
        let transcriber = MockTranscriber::new("unused");
        assert_eq!(transcribe_or_placeholder(&transcriber, None).await, "");

        let empty = AudioClip::mono(vec![], 16000);
        assert_eq!(transcribe_or_placeholder(&transcriber, Some(&empty)).await, "");
    }

    #[tokio::test]
    async fn test_failure_yields_placeholder() {
        let clip = AudioClip::mono(vec![0.1; 160], 16000);
        let text = transcribe_or_placeholder(&BrokenTranscriber, Some(&clip)).await;
        assert_eq!(
            text,
            "Transcription failed: API request failed: 503 - Model is loading"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_placeholder() {
        let transcriber = HuggingFaceTranscriber::new(
            "http://127.0.0.1:1/asr".to_string(),
            "token".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();
        let clip = AudioClip::mono(vec![0.1; 160], 16000);

        let text = transcribe_or_placeholder(&transcriber, Some(&clip)).await;
        assert!(text.starts_with("Transcription failed: HTTP error"));
    }

    #[test]
    fn test_load_mock_transcriber() {
        let transcriber = load_transcriber(&TranscriberConfig::default()).unwrap();
        assert_eq!(transcriber.backend(), TranscriberBackend::Mock);
    }
}
