//! Landmark-to-feature assembly.
//!
//! Every frame becomes a fixed-width vector laid out as
//! `[hand0 (21×3), hand1 (21×3), face (468×3)]`, points in landmark-index
//! order and `x, y, z` per point. This layout is the input contract of any
//! model trained on the pipeline and must not change.
//!
//! Missing hand slots and a missing face are zero-filled. A detection that
//! lands exactly on zero is indistinguishable from padding afterwards; this
//! is a known, accepted loss.

use crate::core::normalizer::normalize;
use crate::models::landmarks::{
    FrameLandmarks, Keypoint3D, LandmarkError, LandmarkResult, COORDINATES, FACE_LANDMARKS,
    HAND_LANDMARKS,
};
use ndarray::{Array2, Array3, Axis};

/// Hand slots per frame
pub const HAND_SLOTS: usize = 2;

/// Width of one hand block (21 × 3)
pub const HAND_FEATURES: usize = HAND_LANDMARKS * COORDINATES;

/// Width of the face block (468 × 3)
pub const FACE_FEATURES: usize = FACE_LANDMARKS * COORDINATES;

/// Width of a feature vector
pub const FEATURE_DIMENSION: usize = (HAND_LANDMARKS * HAND_SLOTS + FACE_LANDMARKS) * COORDINATES;

/// Feature width per frame, for callers validating tensor shapes.
pub fn get_feature_dimension() -> usize {
    FEATURE_DIMENSION
}

/// Normalized model input of shape `(1, sequence_length, FEATURE_DIMENSION)`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSequence {
    tensor: Array3<f32>,
}

impl FeatureSequence {
    pub fn sequence_length(&self) -> usize {
        self.tensor.shape()[1]
    }

    pub fn tensor(&self) -> &Array3<f32> {
        &self.tensor
    }

    pub fn into_tensor(self) -> Array3<f32> {
        self.tensor
    }

    /// Feature vector of one frame
    pub fn frame(&self, index: usize) -> Option<Vec<f32>> {
        if index >= self.sequence_length() {
            return None;
        }
        Some(self.tensor.index_axis(Axis(0), 0).row(index).to_vec())
    }

    /// Nested `[batch][frame][feature]` representation for JSON payloads
    pub fn to_nested(&self) -> Vec<Vec<Vec<f32>>> {
        self.tensor
            .outer_iter()
            .map(|batch| batch.outer_iter().map(|row| row.to_vec()).collect())
            .collect()
    }
}

/// Build the normalized, batched feature tensor for a landmark sequence.
pub fn assemble(frames: &[FrameLandmarks]) -> LandmarkResult<FeatureSequence> {
    let stacked = stack_frames(frames)?;
    let normalized = normalize(&stacked);

    Ok(FeatureSequence {
        tensor: normalized.insert_axis(Axis(0)),
    })
}

/// Stack the raw (un-normalized) feature vectors of every frame.
pub fn stack_frames(frames: &[FrameLandmarks]) -> LandmarkResult<Array2<f32>> {
    if frames.is_empty() {
        return Err(LandmarkError::EmptySequence);
    }

    let mut data = Vec::with_capacity(frames.len() * FEATURE_DIMENSION);
    for frame in frames {
        data.extend(frame_features(frame)?);
    }

    Array2::from_shape_vec((frames.len(), FEATURE_DIMENSION), data)
        .map_err(|e| LandmarkError::InvalidShape(e.to_string()))
}

/// Flatten one frame into its feature vector.
pub fn frame_features(frame: &FrameLandmarks) -> LandmarkResult<Vec<f32>> {
    let mut features = Vec::with_capacity(FEATURE_DIMENSION);

    for slot in 0..HAND_SLOTS {
        match frame.hands.get(slot) {
            Some(hand) => {
                check_point_count(frame.frame_index, "hand", HAND_LANDMARKS, &hand.points)?;
                flatten_into(&mut features, &hand.points);
            }
            None => features.extend(std::iter::repeat(0.0).take(HAND_FEATURES)),
        }
    }

    // Additional faces are dropped; only the first one is encoded.
    match frame.faces.first() {
        Some(face) => {
            check_point_count(frame.frame_index, "face", FACE_LANDMARKS, face)?;
            flatten_into(&mut features, face);
        }
        None => features.extend(std::iter::repeat(0.0).take(FACE_FEATURES)),
    }

    Ok(features)
}

fn check_point_count(
    frame_index: u64,
    kind: &'static str,
    expected: usize,
    points: &[Keypoint3D],
) -> LandmarkResult<()> {
    if points.len() != expected {
        return Err(LandmarkError::PointCount {
            frame_index,
            kind,
            expected,
            actual: points.len(),
        });
    }
    Ok(())
}

fn flatten_into(features: &mut Vec<f32>, points: &[Keypoint3D]) {
    features.extend(points.iter().flat_map(|p| p.coords()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::landmarks::HandLandmarks;

    fn hand(seed: f32) -> HandLandmarks {
        HandLandmarks::new(
            (0..HAND_LANDMARKS)
                .map(|i| Keypoint3D::new(seed + i as f32, seed + i as f32 + 0.1, seed + i as f32 + 0.2))
                .collect(),
        )
    }

    fn face(seed: f32) -> Vec<Keypoint3D> {
        (0..FACE_LANDMARKS)
            .map(|i| Keypoint3D::new(seed + i as f32, seed - i as f32, seed * 2.0 + i as f32))
            .collect()
    }

    fn flatten(points: &[Keypoint3D]) -> Vec<f32> {
        points.iter().flat_map(|p| p.coords()).collect()
    }

    #[test]
    fn test_feature_dimension() {
        assert_eq!(get_feature_dimension(), 1467);
        assert_eq!(HAND_FEATURES * HAND_SLOTS + FACE_FEATURES, FEATURE_DIMENSION);
    }

    #[test]
    fn test_fixed_width_regardless_of_detections() {
        let mut frames = vec![FrameLandmarks::new(0)];

        let mut one_hand = FrameLandmarks::new(1);
        one_hand.hands.push(hand(1.0));
        frames.push(one_hand);

        let mut everything = FrameLandmarks::new(2);
        everything.hands.push(hand(1.0));
        everything.hands.push(hand(2.0));
        everything.faces.push(face(3.0));
        frames.push(everything);

        for frame in &frames {
            assert_eq!(frame_features(frame).unwrap().len(), FEATURE_DIMENSION);
        }
    }

    #[test]
    fn test_empty_frame_is_all_zero() {
        let features = frame_features(&FrameLandmarks::new(0)).unwrap();
        assert!(features.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_layout_is_hand0_hand1_face() {
        let h0 = hand(1.0);
        let h1 = hand(100.0);
        let f = face(7.0);

        let mut frame = FrameLandmarks::new(0);
        frame.hands = vec![h0.clone(), h1.clone()];
        frame.faces = vec![f.clone()];

        let mut expected = flatten(&h0.points);
        expected.extend(flatten(&h1.points));
        expected.extend(flatten(&f));

        assert_eq!(frame_features(&frame).unwrap(), expected);
    }

    #[test]
    fn test_only_first_face_is_used() {
        let mut frame = FrameLandmarks::new(0);
        frame.faces = vec![face(1.0), face(50.0)];

        let features = frame_features(&frame).unwrap();
        assert_eq!(&features[HAND_FEATURES * HAND_SLOTS..], flatten(&face(1.0)).as_slice());
    }

    #[test]
    fn test_missing_second_hand_is_padded() {
        let mut frame = FrameLandmarks::new(0);
        frame.hands.push(hand(1.0));

        let features = frame_features(&frame).unwrap();
        assert!(features[HAND_FEATURES..HAND_FEATURES * 2].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_wrong_point_count_is_fatal() {
        let mut frame = FrameLandmarks::new(3);
        frame.hands.push(HandLandmarks::new(vec![Keypoint3D::new(0.1, 0.1, 0.1); 20]));

        let err = frame_features(&frame).unwrap_err();
        assert!(matches!(
            err,
            LandmarkError::PointCount { frame_index: 3, kind: "hand", expected: 21, actual: 20 }
        ));

        let mut frame = FrameLandmarks::new(4);
        frame.faces.push(vec![Keypoint3D::new(0.1, 0.1, 0.1); 478]);
        assert!(matches!(
            frame_features(&frame),
            Err(LandmarkError::PointCount { kind: "face", .. })
        ));
    }

    #[test]
    fn test_empty_sequence_is_an_error() {
        assert!(matches!(assemble(&[]), Err(LandmarkError::EmptySequence)));
    }

    #[test]
    fn test_assemble_shape() {
        let frames: Vec<_> = (0..5).map(FrameLandmarks::new).collect();
        let sequence = assemble(&frames).unwrap();
        assert_eq!(sequence.tensor().shape(), &[1, 5, FEATURE_DIMENSION]);
        assert_eq!(sequence.sequence_length(), 5);
        assert_eq!(sequence.to_nested()[0].len(), 5);
    }

    #[test]
    fn test_single_hand_end_to_end() {
        let mut frame = FrameLandmarks::new(0);
        frame
            .hands
            .push(HandLandmarks::new(vec![Keypoint3D::new(0.5, 0.5, 0.0); HAND_LANDMARKS]));

        let raw = frame_features(&frame).unwrap();
        for point in raw[..HAND_FEATURES].chunks(3) {
            assert_eq!(point, &[0.5, 0.5, 0.0]);
        }
        assert!(raw[HAND_FEATURES..].iter().all(|&v| v == 0.0));

        let sequence = assemble(&[frame]).unwrap();
        let normalized = sequence.frame(0).unwrap();
        for point in normalized[..HAND_FEATURES].chunks(3) {
            assert_eq!(point, &[-1.0, -1.0, 0.0]);
        }
        assert!(normalized[HAND_FEATURES..].iter().all(|&v| v == 0.0));
        assert!(sequence.frame(1).is_none());
    }
}
