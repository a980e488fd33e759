// Reduction of full landmark tables to the curated anatomical column set
// Output column order is part of the filtered file format

use crate::core::landmark_table::{LandmarkTable, TableError, TableResult};
use crate::models::landmarks::{column_name, Axis, LandmarkType};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Suffix appended to the source file stem for filtered output
pub const DEFAULT_FILTERED_SUFFIX: &str = "_filtered";

// ==============================================================================
// Curated Landmark Column Set
// ==============================================================================

const SILHOUETTE: &[u32] = &[
    10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377, 152,
    148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109,
];

const LIPS_UPPER_OUTER: &[u32] = &[61, 185, 40, 39, 37, 0, 267, 269, 270, 409, 291];
const LIPS_LOWER_OUTER: &[u32] = &[146, 91, 181, 84, 17, 314, 405, 321, 375, 291];
const LIPS_UPPER_INNER: &[u32] = &[78, 191, 80, 81, 82, 13, 312, 311, 310, 415, 308];
const LIPS_LOWER_INNER: &[u32] = &[78, 95, 88, 178, 87, 14, 317, 402, 318, 324, 308];

const RIGHT_EYE_UPPER_0: &[u32] = &[246, 161, 160, 159, 158, 157, 173];
const RIGHT_EYE_LOWER_0: &[u32] = &[33, 7, 163, 144, 145, 153, 154, 155, 133];
const RIGHT_EYE_UPPER_1: &[u32] = &[247, 30, 29, 27, 28, 56, 190];
const RIGHT_EYE_LOWER_1: &[u32] = &[130, 25, 110, 24, 23, 22, 26, 112, 243];
const RIGHT_EYE_UPPER_2: &[u32] = &[113, 225, 224, 223, 222, 221, 189];
const RIGHT_EYE_LOWER_2: &[u32] = &[226, 31, 228, 229, 230, 231, 232, 233, 244];
const RIGHT_EYE_LOWER_3: &[u32] = &[143, 111, 117, 118, 119, 120, 121, 128, 245];
const RIGHT_EYEBROW_UPPER: &[u32] = &[156, 70, 63, 105, 66, 107, 55, 193];
const RIGHT_EYEBROW_LOWER: &[u32] = &[35, 124, 46, 53, 52, 65];
const RIGHT_EYE_IRIS: &[u32] = &[473, 474, 475, 476, 477];

const LEFT_EYE_UPPER_0: &[u32] = &[466, 388, 387, 386, 385, 384, 398];
const LEFT_EYE_LOWER_0: &[u32] = &[263, 249, 390, 373, 374, 380, 381, 382, 362];
const LEFT_EYE_UPPER_1: &[u32] = &[467, 260, 259, 257, 258, 286, 414];
const LEFT_EYE_LOWER_1: &[u32] = &[359, 255, 339, 254, 253, 252, 256, 341, 463];
const LEFT_EYE_UPPER_2: &[u32] = &[342, 445, 444, 443, 442, 441, 413];
const LEFT_EYE_LOWER_2: &[u32] = &[446, 261, 448, 449, 450, 451, 452, 453, 464];
const LEFT_EYE_LOWER_3: &[u32] = &[372, 340, 346, 347, 348, 349, 350, 357, 465];
const LEFT_EYEBROW_UPPER: &[u32] = &[383, 300, 293, 334, 296, 336, 285, 417];
const LEFT_EYEBROW_LOWER: &[u32] = &[265, 353, 276, 283, 282, 295];
const LEFT_EYE_IRIS: &[u32] = &[468, 469, 470, 471, 472];

const NOSE_TIP: &[u32] = &[1];
const NOSE_BOTTOM: &[u32] = &[2];
const RIGHT_CHEEK: &[u32] = &[205];
const LEFT_CHEEK: &[u32] = &[425];

/// Upper-body pose joints: shoulders, elbows, wrists, hips
pub const CURATED_POSE_LANDMARKS: &[u32] = &[11, 12, 13, 14, 15, 16, 23, 24];

/// Curated face indices in region order, duplicates removed first-seen-wins.
pub fn curated_face_landmarks() -> Vec<u32> {
    let regions: [&[u32]; 29] = [
        SILHOUETTE,
        LIPS_UPPER_OUTER,
        LIPS_LOWER_OUTER,
        LIPS_UPPER_INNER,
        LIPS_LOWER_INNER,
        RIGHT_EYE_UPPER_0,
        RIGHT_EYE_LOWER_0,
        RIGHT_EYE_UPPER_1,
        RIGHT_EYE_LOWER_1,
        RIGHT_EYE_UPPER_2,
        RIGHT_EYE_LOWER_2,
        RIGHT_EYE_LOWER_3,
        RIGHT_EYE_IRIS,
        LEFT_EYE_UPPER_0,
        LEFT_EYE_LOWER_0,
        LEFT_EYE_UPPER_1,
        LEFT_EYE_LOWER_1,
        LEFT_EYE_UPPER_2,
        LEFT_EYE_LOWER_2,
        LEFT_EYE_LOWER_3,
        LEFT_EYE_IRIS,
        RIGHT_EYEBROW_UPPER,
        RIGHT_EYEBROW_LOWER,
        LEFT_EYEBROW_UPPER,
        LEFT_EYEBROW_LOWER,
        NOSE_TIP,
        NOSE_BOTTOM,
        RIGHT_CHEEK,
        LEFT_CHEEK,
    ];

    let mut seen = HashSet::new();
    regions
        .iter()
        .flat_map(|region| region.iter().copied())
        .filter(|idx| seen.insert(*idx))
        .collect()
}

/// Column names selected for the given indices: `visibility, x, y, z` per
/// index, face indices first, then pose.
pub fn curated_columns(face: &[u32], pose: &[u32]) -> Vec<String> {
    let axes = [Axis::Visibility, Axis::X, Axis::Y, Axis::Z];
    let mut columns = Vec::with_capacity((face.len() + pose.len()) * axes.len());

    for (landmark_type, indices) in [(LandmarkType::Face, face), (LandmarkType::Pose, pose)] {
        for &idx in indices {
            for axis in axes {
                columns.push(column_name(landmark_type, idx as usize, axis));
            }
        }
    }

    columns
}

/// Sort column names with numeric-aware ordering (`face-2-x` before `face-10-x`).
pub fn natural_sort(names: &mut [String]) {
    names.sort_by(|a, b| natord::compare(a, b));
}

// ==============================================================================
// Filtering
// ==============================================================================

/// Reduce a full landmark table to the curated face and pose columns.
pub fn filter_columns(table: &LandmarkTable) -> TableResult<LandmarkTable> {
    filter_columns_with(table, &curated_face_landmarks(), CURATED_POSE_LANDMARKS)
}

/// Reduce a table to the columns for explicit face and pose index sets.
///
/// Hand columns are never selected. A selected column missing from the
/// input is fatal: skipping it would shift every later column.
pub fn filter_columns_with(
    table: &LandmarkTable,
    face: &[u32],
    pose: &[u32],
) -> TableResult<LandmarkTable> {
    let mut selected = curated_columns(face, pose);
    natural_sort(&mut selected);
    selected.dedup();

    let mut filtered = LandmarkTable::new(table.frames().to_vec());
    for name in selected {
        let column = table
            .column(&name)
            .ok_or_else(|| TableError::MissingColumn(name.clone()))?;
        filtered.push_column(name, column.values.clone())?;
    }

    Ok(filtered)
}

/// `<output_dir>/<input stem><suffix>.parquet`
pub fn filtered_output_path(input: &Path, output_dir: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{}{}.parquet", stem, suffix))
}

/// Read a full landmark file, filter it and write the filtered file.
pub fn filter_landmark_file(input: &Path, output_dir: &Path, suffix: &str) -> TableResult<PathBuf> {
    let table = LandmarkTable::read_parquet(input)?;
    let filtered = filter_columns(&table)?;

    let output = filtered_output_path(input, output_dir, suffix);
    filtered.write_parquet(&output)?;

    log::info!(
        "Filtered {} -> {} ({} of {} columns kept)",
        input.display(),
        output.display(),
        filtered.num_columns(),
        table.num_columns()
    );
    Ok(output)
}
