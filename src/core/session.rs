use crate::core::config::Config;
use crate::core::recording::{RecordedFrame, RecordingBuffer, RecordingStatus, TrackedLandmarks};
use crate::models::landmarks::{
    FrameLandmarks, Handedness, Keypoint3D, LandmarkError, LandmarkResult, TrackingConfig,
};
use crate::platform::detector::{Detection, LandmarkDetector};
use image::RgbImage;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Placeholder frame size when the camera delivers nothing
pub const PLACEHOLDER_WIDTH: u32 = 640;
pub const PLACEHOLDER_HEIGHT: u32 = 480;

/// Default rows of recent recording shown in the preview text
pub const PREVIEW_ROWS: usize = 5;

// ==============================================================================
// Tracked Subset Extraction
// ==============================================================================

/// Pick the landmarks selected by the tracking detail levels.
///
/// Hands without handedness are assigned by slot: first left, second right.
/// Indices the detector did not deliver are skipped.
pub fn extract_tracked(frame: &FrameLandmarks, tracking: &TrackingConfig) -> TrackedLandmarks {
    let mut tracked = TrackedLandmarks::new();

    if let Some(face) = frame.faces.first() {
        insert_points(&mut tracked, "face", face, &tracking.face_detail.face_indices());
    }

    let hand_indices = tracking.hand_detail.hand_indices();
    for (slot, hand) in frame.hands.iter().take(2).enumerate() {
        let side = hand.handedness.unwrap_or(if slot == 0 {
            Handedness::Left
        } else {
            Handedness::Right
        });
        let prefix = match side {
            Handedness::Left => "left_hand",
            Handedness::Right => "right_hand",
        };
        insert_points(&mut tracked, prefix, &hand.points, &hand_indices);
    }

    if let Some(pose) = &frame.pose {
        insert_points(
            &mut tracked,
            "pose",
            &pose.keypoints,
            &tracking.pose_detail.pose_indices(),
        );
    }

    tracked
}

fn insert_points(
    tracked: &mut TrackedLandmarks,
    prefix: &str,
    points: &[Keypoint3D],
    indices: &[usize],
) {
    for &idx in indices {
        if let Some(point) = points.get(idx) {
            tracked.insert(format!("{}_{}", prefix, idx), point.coords());
        }
    }
}

// ==============================================================================
// Live Detection Session
// ==============================================================================

/// Result of pushing one camera frame through the session
#[derive(Debug, Clone)]
pub struct LiveFrameOutput {
    pub frame: RgbImage,
    pub preview: String,
    pub status: RecordingStatus,
    pub recorded_frames: usize,
}

struct ActiveDetector<D> {
    config: TrackingConfig,
    detector: D,
}

/// Owns the detector, its tracking configuration and the recording buffer
/// for one live camera session.
pub struct DetectionSession<D: LandmarkDetector> {
    tracking: Arc<RwLock<TrackingConfig>>,
    detector: Arc<RwLock<Option<ActiveDetector<D>>>>,
    recording: Arc<RecordingBuffer>,
    is_recording: Arc<RwLock<bool>>,
    preview_rows: usize,
}

impl<D: LandmarkDetector> DetectionSession<D> {
    pub fn new(tracking: TrackingConfig) -> Self {
        Self {
            tracking: Arc::new(RwLock::new(tracking)),
            detector: Arc::new(RwLock::new(None)),
            recording: Arc::new(RecordingBuffer::new()),
            is_recording: Arc::new(RwLock::new(true)),
            preview_rows: PREVIEW_ROWS,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            is_recording: Arc::new(RwLock::new(config.recording.auto_start)),
            preview_rows: config.recording.preview_rows,
            ..Self::new(config.tracking)
        }
    }

    pub async fn tracking(&self) -> TrackingConfig {
        *self.tracking.read().await
    }

    /// Set the tracking configuration. Returns true if the detector was
    /// rebuilt, which only happens when the configuration differs from the
    /// one the current detector was built with.
    pub async fn configure(&self, tracking: TrackingConfig) -> LandmarkResult<bool> {
        *self.tracking.write().await = tracking;
        self.ensure_detector(tracking).await
    }

    /// Drop the detector; the next frame rebuilds it.
    pub async fn reset(&self) {
        *self.detector.write().await = None;
    }

    pub async fn set_recording(&self, enabled: bool) {
        *self.is_recording.write().await = enabled;
    }

    pub async fn is_recording(&self) -> bool {
        *self.is_recording.read().await
    }

    pub fn recording(&self) -> Arc<RecordingBuffer> {
        self.recording.clone()
    }

    pub async fn model_info(&self) -> Option<String> {
        self.detector
            .read()
            .await
            .as_ref()
            .map(|active| active.detector.model_info())
    }

    async fn ensure_detector(&self, tracking: TrackingConfig) -> LandmarkResult<bool> {
        let mut slot = self.detector.write().await;
        Self::rebuild_if_changed(&mut slot, tracking)
    }

    fn rebuild_if_changed(
        slot: &mut Option<ActiveDetector<D>>,
        tracking: TrackingConfig,
    ) -> LandmarkResult<bool> {
        if matches!(slot.as_ref(), Some(active) if active.config == tracking) {
            return Ok(false);
        }

        log::info!(
            "Initializing detector with config: face={}, hands={}, pose={}",
            tracking.face_detail.to_string(),
            tracking.hand_detail.to_string(),
            tracking.pose_detail.to_string()
        );
        let detector = D::new(&tracking)?;
        *slot = Some(ActiveDetector {
            config: tracking,
            detector,
        });
        Ok(true)
    }

    /// Process one camera frame: detect, record the tracked subset and build
    /// the preview.
    pub async fn process_live_frame(&self, frame: Option<&RgbImage>) -> LiveFrameOutput {
        let frame = match frame {
            Some(frame) => frame,
            None => {
                self.reset().await;
                return LiveFrameOutput {
                    frame: RgbImage::new(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT),
                    preview: "No input frame detected".to_string(),
                    status: self.recording.status(),
                    recorded_frames: self.recording.len(),
                };
            }
        };

        let tracking = *self.tracking.read().await;
        let detection = match self.detect(frame, tracking).await {
            Ok(detection) => detection,
            Err(e) => {
                log::error!("Error during frame processing: {}", e);
                return LiveFrameOutput {
                    frame: frame.clone(),
                    preview: "Error during processing".to_string(),
                    status: RecordingStatus::Error,
                    recorded_frames: self.recording.len(),
                };
            }
        };

        let tracked = extract_tracked(&detection.landmarks, &tracking);
        if *self.is_recording.read().await && !tracked.is_empty() {
            self.recording.record(tracked);
        }

        let recorded_frames = self.recording.len();
        let preview = format!(
            "Active Recognition: Face: {} | Hands: {} | Pose: {}\n\n\
             Recorded Frames: {}\n\n\
             Last Data Points:\n{}",
            tracking.face_detail.to_string(),
            tracking.hand_detail.to_string(),
            tracking.pose_detail.to_string(),
            recorded_frames,
            format_recent(&self.recording.recent(self.preview_rows)),
        );

        LiveFrameOutput {
            frame: detection.annotated.unwrap_or_else(|| frame.clone()),
            preview,
            status: self.recording.status(),
            recorded_frames,
        }
    }

    /// Detect with a detector built for `tracking`, the same snapshot the
    /// caller extracts and previews with. The slot stays locked until the
    /// detection is done.
    async fn detect(&self, frame: &RgbImage, tracking: TrackingConfig) -> LandmarkResult<Detection> {
        let mut slot = self.detector.write().await;
        Self::rebuild_if_changed(&mut slot, tracking)?;
        match slot.as_ref() {
            Some(active) => active.detector.detect(frame),
            None => Err(LandmarkError::NotInitialized),
        }
    }
}

fn format_recent(frames: &[RecordedFrame]) -> String {
    if frames.is_empty() {
        return "(none)".to_string();
    }

    frames
        .iter()
        .map(|f| {
            let points: Vec<String> = f
                .landmarks
                .iter()
                .map(|(key, [x, y, z])| format!("{}=({:.3}, {:.3}, {:.3})", key, x, y, z))
                .collect();
            format!("{:>5} {:>14} {}", f.frame, f.timestamp, points.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
