use crate::core::features::{assemble, FeatureSequence};
use crate::core::speech_transcriber::HUGGINGFACE_TOKEN_VAR;
use crate::models::inference::{
    ModelBackend, ModelConfig, ModelError, ModelResult, Translation,
};
use crate::models::landmarks::FrameLandmarks;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==============================================================================
// Model Capabilities
// ==============================================================================

/// Sequence model turning a feature tensor into token ids
#[async_trait]
pub trait SignModel: Send + Sync {
    async fn generate(&self, features: &FeatureSequence) -> ModelResult<Vec<u32>>;

    fn backend(&self) -> ModelBackend;
}

/// Maps generated token ids to display text
pub trait TokenDecoder: Send + Sync {
    fn decode(&self, tokens: &[u32]) -> ModelResult<String>;
}

// ==============================================================================
// Mock Model
// ==============================================================================

/// Stand-in model: waits, then picks `sequence_length % vocabulary_len`.
pub struct MockSignModel {
    vocabulary_len: usize,
    latency: Duration,
}

impl MockSignModel {
    pub fn new(vocabulary_len: usize, latency: Duration) -> Self {
        Self {
            vocabulary_len,
            latency,
        }
    }
}

#[async_trait]
impl SignModel for MockSignModel {
    async fn generate(&self, features: &FeatureSequence) -> ModelResult<Vec<u32>> {
        if self.vocabulary_len == 0 {
            return Err(ModelError::EmptyVocabulary);
        }
        tokio::time::sleep(self.latency).await;

        let token = features.sequence_length() % self.vocabulary_len;
        Ok(vec![token as u32])
    }

    fn backend(&self) -> ModelBackend {
        ModelBackend::Mock
    }
}

// ==============================================================================
// Hosted Model
// ==============================================================================

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<Vec<Vec<f32>>>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<u32>>,
}

/// Model served behind an HTTP prediction endpoint
pub struct HostedSignModel {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HostedSignModel {
    pub fn new(endpoint: String, api_token: Option<String>, timeout: Duration) -> ModelResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_token,
        })
    }
}

#[async_trait]
impl SignModel for HostedSignModel {
    async fn generate(&self, features: &FeatureSequence) -> ModelResult<Vec<u32>> {
        let request = PredictRequest {
            instances: features.to_nested(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        body.predictions
            .into_iter()
            .next()
            .filter(|tokens| !tokens.is_empty())
            .ok_or(ModelError::EmptyOutput)
    }

    fn backend(&self) -> ModelBackend {
        ModelBackend::Hosted
    }
}

// ==============================================================================
// Decoder
// ==============================================================================

/// Decodes the first token id through a label table
pub struct VocabularyDecoder {
    vocabulary: Vec<String>,
}

impl VocabularyDecoder {
    pub fn new(vocabulary: Vec<String>) -> Self {
        Self { vocabulary }
    }
}

impl TokenDecoder for VocabularyDecoder {
    fn decode(&self, tokens: &[u32]) -> ModelResult<String> {
        let token = *tokens.first().ok_or(ModelError::EmptyOutput)?;
        self.vocabulary
            .get(token as usize)
            .cloned()
            .ok_or(ModelError::UnknownToken(token))
    }
}

// ==============================================================================
// Loading
// ==============================================================================

/// Construct the model backend named by the configuration.
pub fn load_model(config: &ModelConfig) -> ModelResult<Box<dyn SignModel>> {
    log::info!("Loading {} sign model", config.backend.to_string());
    match config.backend {
        ModelBackend::Mock => Ok(Box::new(MockSignModel::new(
            config.vocabulary.len(),
            Duration::from_millis(config.mock_latency_ms),
        ))),
        ModelBackend::Hosted => {
            let endpoint = config
                .endpoint_url
                .clone()
                .filter(|url| !url.is_empty())
                .ok_or(ModelError::MissingEndpoint)?;
            let api_token = std::env::var(HUGGINGFACE_TOKEN_VAR).ok();
            Ok(Box::new(HostedSignModel::new(
                endpoint,
                api_token,
                Duration::from_secs(config.request_timeout_secs),
            )?))
        }
    }
}

// ==============================================================================
// Translator
// ==============================================================================

/// Landmark sequence to text: assemble, generate, decode.
pub struct SignTranslator {
    model: Box<dyn SignModel>,
    decoder: Box<dyn TokenDecoder>,
}

impl SignTranslator {
    pub fn new(model: Box<dyn SignModel>, decoder: Box<dyn TokenDecoder>) -> Self {
        Self { model, decoder }
    }

    pub fn from_config(config: &ModelConfig) -> ModelResult<Self> {
        let model = load_model(config)?;
        let decoder = Box::new(VocabularyDecoder::new(config.vocabulary.clone()));
        Ok(Self::new(model, decoder))
    }

    pub fn backend(&self) -> ModelBackend {
        self.model.backend()
    }

    pub async fn translate(&self, frames: &[FrameLandmarks]) -> ModelResult<Translation> {
        let features = assemble(frames)?;
        let tokens = self.model.generate(&features).await?;
        let text = self.decoder.decode(&tokens)?;

        log::debug!("Translated {} frames to {:?}", frames.len(), text);
        Ok(Translation {
            text,
            frames_processed: frames.len(),
            backend: self.model.backend(),
        })
    }
}
