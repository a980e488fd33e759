pub mod core;
pub mod models;
pub mod platform;

pub use crate::core::column_filter::{filter_columns, filter_landmark_file};
pub use crate::core::config::Config;
pub use crate::core::features::{
    assemble, get_feature_dimension, FeatureSequence, FEATURE_DIMENSION,
};
pub use crate::core::normalizer::normalize;
pub use crate::core::session::{DetectionSession, LiveFrameOutput};
pub use crate::core::translator::SignTranslator;

use crate::core::recording::TrackedLandmarks;
use crate::core::session::extract_tracked;
use crate::core::speech_transcriber::{
    load_transcriber, transcribe_or_placeholder, AudioTranscriber,
};
use crate::models::audio::AudioClip;
use crate::models::chat::ChatHistory;
use crate::models::inference::Translation;
use crate::models::landmarks::{DetailLevel, FrameLandmarks, TrackingConfig};
use crate::platform::detector::LandmarkDetector;
use image::RgbImage;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Application state for one chat between a signer and a hearing participant
pub struct AppState<D: LandmarkDetector> {
    pub config: RwLock<Config>,
    pub session: DetectionSession<D>,
    translator: SignTranslator,
    transcriber: Box<dyn AudioTranscriber>,
    chat: RwLock<ChatHistory>,
}

impl<D: LandmarkDetector> AppState<D> {
    pub fn new(config: Config) -> Result<Self, String> {
        config
            .validate()
            .map_err(|e| format!("Invalid configuration: {}", e))?;

        let translator = SignTranslator::from_config(&config.model)
            .map_err(|e| format!("Failed to load sign model: {}", e))?;
        let transcriber = load_transcriber(&config.transcriber)
            .map_err(|e| format!("Failed to load transcriber: {}", e))?;

        Ok(Self {
            session: DetectionSession::from_config(&config),
            config: RwLock::new(config),
            translator,
            transcriber,
            chat: RwLock::new(ChatHistory::new()),
        })
    }

    /// Push a webcam frame through the live session
    pub async fn process_frame(&self, frame: Option<&RgbImage>) -> LiveFrameOutput {
        self.session.process_live_frame(frame).await
    }

    /// Change detail levels from their names ("none", "minimal", "basic", "full")
    pub async fn set_tracking(&self, face: &str, hands: &str, pose: &str) -> Result<(), String> {
        let parse = |name: &str| {
            DetailLevel::from_string(name).ok_or_else(|| format!("Invalid detail level: {}", name))
        };
        let tracking = TrackingConfig {
            face_detail: parse(face)?,
            hand_detail: parse(hands)?,
            pose_detail: parse(pose)?,
        };

        self.session
            .configure(tracking)
            .await
            .map_err(|e| format!("Failed to configure detector: {}", e))?;
        self.config.write().await.tracking = tracking;
        Ok(())
    }

    /// Translate a landmark sequence and post the result as the signer
    pub async fn translate_signs(&self, frames: &[FrameLandmarks]) -> Result<Translation, String> {
        let translation = self
            .translator
            .translate(frames)
            .await
            .map_err(|e| format!("Failed to translate signs: {}", e))?;

        self.chat.write().await.push_from_signer(&translation.text);
        Ok(translation)
    }

    /// Transcribe speech and post it as the other participant
    pub async fn transcribe_speech(&self, clip: Option<&AudioClip>) -> String {
        let text = transcribe_or_placeholder(self.transcriber.as_ref(), clip).await;
        self.chat.write().await.push_from_other(&text);
        text
    }

    pub async fn send_from_signer(&self, text: &str) -> bool {
        self.chat.write().await.push_from_signer(text)
    }

    pub async fn send_from_other(&self, text: &str) -> bool {
        self.chat.write().await.push_from_other(text)
    }

    pub async fn chat_history(&self) -> ChatHistory {
        self.chat.read().await.clone()
    }

    /// Tracked subset of an already detected frame under the current detail levels
    pub async fn tracked_landmarks(&self, frame: &FrameLandmarks) -> TrackedLandmarks {
        extract_tracked(frame, &self.session.tracking().await)
    }

    pub async fn clear_recording(&self) {
        self.session.recording().clear();
    }

    /// Save the session recording under the storage data directory
    pub async fn export_recording(&self) -> Result<PathBuf, String> {
        let recording = self.session.recording();
        if recording.is_empty() {
            return Err("No recorded frames to export".to_string());
        }

        let path = self
            .config
            .read()
            .await
            .storage
            .recording_path(chrono::Utc::now());
        recording
            .export_parquet(&path)
            .map_err(|e| format!("Failed to export recording: {}", e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::ChatRole;
    use crate::platform::detector::DummyDetector;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.model.mock_latency_ms = 0;
        config.transcriber.mock_text = "Nice to meet you too.".to_string();
        config
    }

    #[tokio::test]
    async fn test_signer_and_speaker_share_chat() {
        let app = AppState::<DummyDetector>::new(test_config()).unwrap();

        let frames: Vec<FrameLandmarks> = (0..4).map(FrameLandmarks::new).collect();
        let translation = app.translate_signs(&frames).await.unwrap();
        assert_eq!(translation.text, "My name is John.");

        let clip = AudioClip::mono(vec![0.1; 1600], 16000);
        assert_eq!(app.transcribe_speech(Some(&clip)).await, "Nice to meet you too.");

        let history = app.chat_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0].role, ChatRole::User);
        assert_eq!(history.messages()[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_silent_clip_adds_no_message() {
        let app = AppState::<DummyDetector>::new(test_config()).unwrap();
        assert_eq!(app.transcribe_speech(None).await, "");
        assert!(app.chat_history().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_tracking_by_name() {
        let app = AppState::<DummyDetector>::new(test_config()).unwrap();

        app.set_tracking("full", "minimal", "basic").await.unwrap();
        let tracking = app.config.read().await.tracking;
        assert_eq!(tracking.face_detail, DetailLevel::Full);
        assert_eq!(app.session.tracking().await, tracking);

        assert!(app.set_tracking("dense", "none", "none").await.is_err());
    }

    #[tokio::test]
    async fn test_dummy_detector_records_nothing() {
        let app = AppState::<DummyDetector>::new(test_config()).unwrap();
        let output = app.process_frame(Some(&RgbImage::new(8, 8))).await;
        assert_eq!(output.recorded_frames, 0);
        assert!(app.session.recording().is_empty());
    }

    #[tokio::test]
    async fn test_export_recording_to_data_dir() {
        let data_dir = std::env::temp_dir().join(format!("signchat_app_{}", uuid::Uuid::new_v4()));
        let mut config = test_config();
        config.storage.data_dir = data_dir.clone();
        let app = AppState::<DummyDetector>::new(config).unwrap();

        assert!(app.export_recording().await.is_err());

        let mut landmarks = TrackedLandmarks::new();
        landmarks.insert("pose_11".to_string(), [0.4, 0.5, -0.1]);
        app.session.recording().record(landmarks);

        let path = app.export_recording().await.unwrap();
        assert!(path.starts_with(&data_dir));
        let frames = crate::core::recording::read_recording(&path).unwrap();
        let _ = std::fs::remove_dir_all(&data_dir);

        assert_eq!(frames, app.session.recording().snapshot());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = test_config();
        config.model.vocabulary.clear();
        assert!(AppState::<DummyDetector>::new(config).is_err());
    }
}
