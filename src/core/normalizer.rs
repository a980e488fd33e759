//! Whole-sequence coordinate normalization.
//!
//! Values are mapped into `[-1, 1]` per coordinate axis (x, y, z taken from
//! the feature column index modulo 3), with min and max computed jointly over
//! every frame of the sequence. Exact zeros are treated as padding: they are
//! excluded from the range and stay zero in the output.

use crate::models::landmarks::COORDINATES;
use ndarray::Array2;

/// Per-axis value range over the non-zero entries of a sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f32,
    pub max: f32,
}

impl AxisRange {
    /// Span used as divisor; a degenerate axis divides by 1.
    pub fn span(&self) -> f32 {
        let span = self.max - self.min;
        if span == 0.0 {
            1.0
        } else {
            span
        }
    }

    pub fn scale(&self, value: f32) -> f32 {
        2.0 * (value - self.min) / self.span() - 1.0
    }
}

/// Min/max per axis over non-zero entries. `None` for an axis with no
/// non-zero entry at all.
pub fn axis_ranges(features: &Array2<f32>) -> [Option<AxisRange>; COORDINATES] {
    let mut ranges: [Option<AxisRange>; COORDINATES] = [None; COORDINATES];

    for row in features.rows() {
        for (column, &value) in row.iter().enumerate() {
            if value == 0.0 {
                continue;
            }
            let slot = &mut ranges[column % COORDINATES];
            *slot = Some(match *slot {
                Some(range) => AxisRange {
                    min: range.min.min(value),
                    max: range.max.max(value),
                },
                None => AxisRange { min: value, max: value },
            });
        }
    }

    ranges
}

/// Normalize a `(sequence_length, D)` feature matrix into `[-1, 1]`.
///
/// An all-zero matrix is returned unchanged.
pub fn normalize(features: &Array2<f32>) -> Array2<f32> {
    let ranges = axis_ranges(features);
    if ranges.iter().all(Option::is_none) {
        return features.clone();
    }

    let mut normalized = features.clone();
    for mut row in normalized.rows_mut() {
        for (column, value) in row.iter_mut().enumerate() {
            if *value == 0.0 {
                continue;
            }
            if let Some(range) = ranges[column % COORDINATES] {
                *value = range.scale(*value);
            }
        }
    }

    normalized
}
