// Landmark detector bridge
// Abstraction over the external face/hand/pose model used by the live session

use crate::models::landmarks::{FrameLandmarks, LandmarkResult, TrackingConfig};
use image::RgbImage;

/// Detector output for one frame
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub landmarks: FrameLandmarks,
    /// Frame with landmarks drawn on it, when the backend renders one
    pub annotated: Option<RgbImage>,
}

/// Detector bridge trait
/// Implement this for each inference backend
pub trait LandmarkDetector: Send + Sync {
    /// Initialize the detector for a tracking configuration
    fn new(config: &TrackingConfig) -> LandmarkResult<Self>
    where
        Self: Sized;

    /// Run detection on a frame
    fn detect(&self, frame: &RgbImage) -> LandmarkResult<Detection>;

    /// Check if models are loaded
    fn is_initialized(&self) -> bool;

    /// Get model info
    fn model_info(&self) -> String;
}

// ==============================================================================
// Dummy Implementation (no inference backend linked)
// ==============================================================================

pub struct DummyDetector {
    config: TrackingConfig,
}

impl LandmarkDetector for DummyDetector {
    fn new(config: &TrackingConfig) -> LandmarkResult<Self> {
        log::info!("Using dummy landmark detector (no inference)");
        Ok(Self { config: *config })
    }

    fn detect(&self, _frame: &RgbImage) -> LandmarkResult<Detection> {
        Ok(Detection::default())
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn model_info(&self) -> String {
        format!(
            "Dummy detector (no inference) - Face: {}, Hands: {}, Pose: {}",
            self.config.face_detail.to_string(),
            self.config.hand_detail.to_string(),
            self.config.pose_detail.to_string()
        )
    }
}

pub type DefaultDetector = DummyDetector;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_detector_detects_nothing() {
        let detector = DummyDetector::new(&TrackingConfig::default()).unwrap();
        let detection = detector.detect(&RgbImage::new(4, 4)).unwrap();
        assert!(detection.landmarks.is_empty());
        assert!(detection.annotated.is_none());
        assert!(!detector.is_initialized());
        assert!(detector.model_info().contains("Face: minimal"));
    }
}
