// Data models for the sign translation model

use crate::models::landmarks::LandmarkError;
use serde::{Deserialize, Serialize};

/// Phrases the mock model and default decoder know
pub const COMMON_SIGNS: [&str; 5] = [
    "Hello! Nice to meet you.",
    "Thank you very much!",
    "Goodbye, see you later!",
    "How are you?",
    "My name is John.",
];

pub fn default_vocabulary() -> Vec<String> {
    COMMON_SIGNS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelBackend {
    Mock,
    Hosted,
}

impl ModelBackend {
    pub fn to_string(&self) -> &'static str {
        match self {
            ModelBackend::Mock => "mock",
            ModelBackend::Hosted => "hosted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    /// Prediction endpoint of the hosted model
    pub endpoint_url: Option<String>,
    /// Token id to label table used by the decoder
    pub vocabulary: Vec<String>,
    pub mock_latency_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Mock,
            endpoint_url: None,
            vocabulary: default_vocabulary(),
            mock_latency_ms: 500,
            request_timeout_secs: 30,
        }
    }
}

/// Decoded model output for one landmark sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub text: String,
    pub frames_processed: usize,
    pub backend: ModelBackend,
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model returned no tokens")]
    EmptyOutput,

    #[error("Vocabulary is empty")]
    EmptyVocabulary,

    #[error("Unknown token id: {0}")]
    UnknownToken(u32),

    #[error("Hosted model requires an endpoint URL")]
    MissingEndpoint,

    #[error("Model request failed: {status} - {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Landmark(#[from] LandmarkError),
}

pub type ModelResult<T> = Result<T, ModelError>;
