// Data models for face, hand and body landmarks produced by the detector

use serde::{Deserialize, Serialize};

// ==============================================================================
// Landmark Counts
// ==============================================================================

/// Points per detected hand (MediaPipe Hands)
pub const HAND_LANDMARKS: usize = 21;

/// Points per detected face (MediaPipe Face Mesh, unrefined)
pub const FACE_LANDMARKS: usize = 468;

/// Face Mesh with `refine_landmarks` adds 10 iris points
pub const FACE_LANDMARKS_REFINED: usize = 478;

/// Points in a MediaPipe Pose result
pub const POSE_LANDMARKS: usize = 33;

/// Coordinates per point (x, y, z)
pub const COORDINATES: usize = 3;

// ==============================================================================
// Shared: 3D Keypoint
// ==============================================================================

/// A detected 3D landmark position.
///
/// Serialized as a plain `[x, y, z]` array, which is what the detector emits.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "[f32; 3]")]
pub struct Keypoint3D {
    pub x: f32, // Normalized [0, 1] for image coordinates
    pub y: f32, // Normalized [0, 1] for image coordinates
    pub z: f32, // Relative depth
}

impl Keypoint3D {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn coords(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl TryFrom<Vec<f32>> for Keypoint3D {
    type Error = LandmarkError;

    fn try_from(raw: Vec<f32>) -> Result<Self, Self::Error> {
        match raw.as_slice() {
            [x, y, z] => Ok(Self::new(*x, *y, *z)),
            _ => Err(LandmarkError::CoordinateCount {
                expected: COORDINATES,
                actual: raw.len(),
            }),
        }
    }
}

impl From<Keypoint3D> for [f32; 3] {
    fn from(point: Keypoint3D) -> Self {
        point.coords()
    }
}

// ==============================================================================
// Hands (21 keypoints per hand)
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn to_string(&self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }
}

/// One detected hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandLandmarks {
    #[serde(default)]
    pub handedness: Option<Handedness>,
    pub points: Vec<Keypoint3D>, // 21 hand landmarks
}

impl HandLandmarks {
    pub fn new(points: Vec<Keypoint3D>) -> Self {
        Self {
            handedness: None,
            points,
        }
    }

    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = Some(handedness);
        self
    }
}

// ==============================================================================
// Body Pose (33 keypoints + visibility)
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPose {
    pub keypoints: Vec<Keypoint3D>,  // 33 body landmarks
    pub visibility_scores: Vec<f32>, // Visibility confidence per keypoint, [0, 1]
}

impl BodyPose {
    /// Visibility of a keypoint, or 0 when the detector did not report one.
    pub fn visibility(&self, index: usize) -> f32 {
        self.visibility_scores.get(index).copied().unwrap_or(0.0)
    }
}

// ==============================================================================
// Frame Landmark Record
// ==============================================================================

/// Landmarks detected in a single frame.
///
/// Undetected landmark types are absent here; zero padding only happens in
/// the feature pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameLandmarks {
    pub frame_index: u64,
    #[serde(default)]
    pub hands: Vec<HandLandmarks>,
    #[serde(default)]
    pub faces: Vec<Vec<Keypoint3D>>,
    #[serde(default)]
    pub pose: Option<BodyPose>,
}

impl FrameLandmarks {
    pub fn new(frame_index: u64) -> Self {
        Self {
            frame_index,
            ..Default::default()
        }
    }

    /// Build a record from raw coordinate lists, rejecting points that do
    /// not carry exactly three coordinates.
    pub fn from_raw(
        frame_index: u64,
        hands: Vec<Vec<Vec<f32>>>,
        faces: Vec<Vec<Vec<f32>>>,
    ) -> LandmarkResult<Self> {
        let hands = hands
            .into_iter()
            .map(|hand| points_from_raw(hand).map(HandLandmarks::new))
            .collect::<LandmarkResult<Vec<_>>>()?;
        let faces = faces
            .into_iter()
            .map(points_from_raw)
            .collect::<LandmarkResult<Vec<_>>>()?;

        Ok(Self {
            frame_index,
            hands,
            faces,
            pose: None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty() && self.faces.is_empty() && self.pose.is_none()
    }
}

fn points_from_raw(raw: Vec<Vec<f32>>) -> LandmarkResult<Vec<Keypoint3D>> {
    raw.into_iter().map(Keypoint3D::try_from).collect()
}

/// Holistic detector output for one frame of an archival video (batch path)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HolisticFrame {
    pub frame_index: u64,
    pub pose: Option<BodyPose>,
    pub face: Option<Vec<Keypoint3D>>,
    pub left_hand: Option<Vec<Keypoint3D>>,
    pub right_hand: Option<Vec<Keypoint3D>>,
}

// ==============================================================================
// Columnar Naming
// ==============================================================================

/// Landmark families stored in the columnar landmark table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkType {
    Pose,
    Face,
    LeftHand,
    RightHand,
}

impl LandmarkType {
    pub const ALL: [LandmarkType; 4] = [
        LandmarkType::Pose,
        LandmarkType::Face,
        LandmarkType::LeftHand,
        LandmarkType::RightHand,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            LandmarkType::Pose => "pose",
            LandmarkType::Face => "face",
            LandmarkType::LeftHand => "left_hand",
            LandmarkType::RightHand => "right_hand",
        }
    }

    /// Number of indices per type in the full table schema
    pub fn table_width(&self) -> usize {
        match self {
            LandmarkType::Pose => POSE_LANDMARKS,
            LandmarkType::Face => FACE_LANDMARKS_REFINED,
            LandmarkType::LeftHand | LandmarkType::RightHand => HAND_LANDMARKS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    Visibility,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::Visibility];

    pub fn name(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::Visibility => "visibility",
        }
    }
}

/// Column name in the `"{type}-{index}-{axis}"` convention
pub fn column_name(landmark_type: LandmarkType, index: usize, axis: Axis) -> String {
    format!("{}-{}-{}", landmark_type.prefix(), index, axis.name())
}

// ==============================================================================
// Tracking Configuration
// ==============================================================================

/// How many landmarks of a family are kept in the live recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    None,
    Minimal,
    Basic,
    Full,
}

impl DetailLevel {
    pub fn to_string(&self) -> &'static str {
        match self {
            DetailLevel::None => "none",
            DetailLevel::Minimal => "minimal",
            DetailLevel::Basic => "basic",
            DetailLevel::Full => "full",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(DetailLevel::None),
            "minimal" => Some(DetailLevel::Minimal),
            "basic" => Some(DetailLevel::Basic),
            "full" => Some(DetailLevel::Full),
            _ => None,
        }
    }

    pub fn face_indices(&self) -> Vec<usize> {
        match self {
            DetailLevel::None => vec![],
            DetailLevel::Minimal => vec![10, 152, 234, 454],
            DetailLevel::Basic => (0..FACE_LANDMARKS).step_by(10).collect(),
            DetailLevel::Full => (0..FACE_LANDMARKS).collect(),
        }
    }

    pub fn hand_indices(&self) -> Vec<usize> {
        match self {
            DetailLevel::None => vec![],
            DetailLevel::Minimal => vec![0, 4, 8, 12, 16, 20],
            DetailLevel::Basic => vec![0, 2, 4, 5, 8, 9, 12, 13, 16, 17, 20],
            DetailLevel::Full => (0..HAND_LANDMARKS).collect(),
        }
    }

    // Only the 25 upper-body points are recorded live.
    pub fn pose_indices(&self) -> Vec<usize> {
        match self {
            DetailLevel::None => vec![],
            DetailLevel::Minimal => vec![0, 11, 12, 13, 14, 15, 16],
            DetailLevel::Basic => (0..25).step_by(2).collect(),
            DetailLevel::Full => (0..25).collect(),
        }
    }
}

/// Detail levels for the live detection session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub face_detail: DetailLevel,
    pub hand_detail: DetailLevel,
    pub pose_detail: DetailLevel,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            face_detail: DetailLevel::Minimal,
            hand_detail: DetailLevel::Basic,
            pose_detail: DetailLevel::None,
        }
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LandmarkError {
    #[error("Expected {expected} coordinates per point, got {actual}")]
    CoordinateCount { expected: usize, actual: usize },

    #[error("Frame {frame_index}: {kind} has {actual} points, expected {expected}")]
    PointCount {
        frame_index: u64,
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Landmark sequence is empty")]
    EmptySequence,

    #[error("Invalid feature shape: {0}")]
    InvalidShape(String),

    #[error("Detector not initialized")]
    NotInitialized,

    #[error("Detection failed: {0}")]
    DetectionFailed(String),
}

pub type LandmarkResult<T> = Result<T, LandmarkError>;
