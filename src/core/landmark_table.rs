// Columnar landmark table, persisted as Parquet
// One row per frame: a `frame` column plus `"{type}-{index}-{axis}"` columns

use crate::models::landmarks::{
    column_name, Axis, HolisticFrame, Keypoint3D, LandmarkError, LandmarkType,
    FACE_LANDMARKS, FACE_LANDMARKS_REFINED, HAND_LANDMARKS, POSE_LANDMARKS,
};
use arrow::array::{Array, ArrayRef, Float32Array, Int64Array};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Name of the row key column
pub const FRAME_COLUMN: &str = "frame";

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column {name} has {actual} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Column {name} is not numeric ({data_type})")]
    NonNumericColumn { name: String, data_type: String },

    #[error("Column {name} has {count} null values")]
    NullValues { name: String, count: usize },

    #[error(transparent)]
    Landmark(#[from] LandmarkError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

pub type TableResult<T> = Result<T, TableError>;

// ==============================================================================
// Landmark Table
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkColumn {
    pub name: String,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkTable {
    frames: Vec<i64>,
    columns: Vec<LandmarkColumn>,
    index: HashMap<String, usize>,
}

impl LandmarkTable {
    pub fn new(frames: Vec<i64>) -> Self {
        Self {
            frames,
            columns: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append a column; it must have one value per frame.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f32>) -> TableResult<()> {
        let name = name.into();
        if values.len() != self.frames.len() {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.frames.len(),
                actual: values.len(),
            });
        }
        if self.index.contains_key(&name) {
            return Err(TableError::DuplicateColumn(name));
        }

        self.index.insert(name.clone(), self.columns.len());
        self.columns.push(LandmarkColumn { name, values });
        Ok(())
    }

    pub fn frames(&self) -> &[i64] {
        &self.frames
    }

    pub fn num_rows(&self) -> usize {
        self.frames.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&LandmarkColumn> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Landmark column names in stored order (the `frame` key excluded)
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Full-schema table for a processed video.
    ///
    /// Every landmark type gets four columns per index; undetected families
    /// are stored as zeros. Face and hand visibility is 1 when detected, pose
    /// visibility is the detector's score. Columns follow `frame` in plain
    /// lexicographic order.
    ///
    /// The face block is always the refined mesh width of 478 indices
    /// (468 mesh points plus 10 iris points), so files carry `face-468-*`
    /// through `face-477-*` even when the detector ran without refinement.
    /// An unrefined 468-point face leaves those columns at zero.
    ///
    /// A detected family with the wrong number of points is an error.
    pub fn from_holistic_frames(frames: &[HolisticFrame]) -> TableResult<Self> {
        let mut values: HashMap<String, Vec<f32>> = HashMap::new();
        for landmark_type in LandmarkType::ALL {
            for idx in 0..landmark_type.table_width() {
                for axis in Axis::ALL {
                    values.insert(
                        column_name(landmark_type, idx, axis),
                        Vec::with_capacity(frames.len()),
                    );
                }
            }
        }

        for frame in frames {
            check_point_counts(frame)?;

            let pose = frame.pose.as_ref();
            append_family(
                &mut values,
                LandmarkType::Pose,
                pose.map(|p| p.keypoints.as_slice()),
                |idx| pose.map(|p| p.visibility(idx)).unwrap_or(0.0),
            );
            append_family(&mut values, LandmarkType::Face, frame.face.as_deref(), |_| 1.0);
            append_family(
                &mut values,
                LandmarkType::LeftHand,
                frame.left_hand.as_deref(),
                |_| 1.0,
            );
            append_family(
                &mut values,
                LandmarkType::RightHand,
                frame.right_hand.as_deref(),
                |_| 1.0,
            );
        }

        let mut names: Vec<String> = values.keys().cloned().collect();
        names.sort();

        let mut table = Self::new(frames.iter().map(|f| f.frame_index as i64).collect());
        for name in names {
            if let Some(column) = values.remove(&name) {
                table.push_column(name, column)?;
            }
        }

        log::debug!(
            "Built landmark table with {} rows and {} columns",
            table.num_rows(),
            table.num_columns()
        );
        Ok(table)
    }

    /// Write as a single Parquet row group
    pub fn write_parquet(&self, path: &Path) -> TableResult<()> {
        let mut fields = vec![Field::new(FRAME_COLUMN, DataType::Int64, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(Int64Array::from(self.frames.clone()))];

        for column in &self.columns {
            fields.push(Field::new(column.name.as_str(), DataType::Float32, false));
            arrays.push(Arc::new(Float32Array::from(column.values.clone())));
        }

        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), arrays)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, schema, None)?;
        writer.write(&batch)?;
        writer.close()?;

        log::info!(
            "Wrote {} rows x {} landmark columns to {}",
            self.num_rows(),
            self.num_columns(),
            path.display()
        );
        Ok(())
    }

    /// Read a table written by any Parquet producer.
    ///
    /// Numeric columns are cast to f32; the `frame` column is required.
    pub fn read_parquet(path: &Path) -> TableResult<Self> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut frames: Vec<i64> = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut values: HashMap<String, Vec<f32>> = HashMap::new();

        for batch in reader {
            let batch = batch?;
            let schema = batch.schema();

            let frame_idx = schema
                .index_of(FRAME_COLUMN)
                .map_err(|_| TableError::MissingColumn(FRAME_COLUMN.to_string()))?;
            let frame_array = numeric_column(&batch, frame_idx, &DataType::Int64)?;
            let frame_array = frame_array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| non_numeric(schema.field(frame_idx)))?;
            frames.extend(frame_array.values().iter().copied());

            for (i, field) in schema.fields().iter().enumerate() {
                if i == frame_idx {
                    continue;
                }
                let array = numeric_column(&batch, i, &DataType::Float32)?;
                let array = array
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .ok_or_else(|| non_numeric(field))?;
                let entry = values.entry(field.name().clone()).or_insert_with(|| {
                    names.push(field.name().clone());
                    Vec::new()
                });
                entry.extend(array.values().iter().copied());
            }
        }

        let mut table = Self::new(frames);
        for name in names {
            if let Some(column) = values.remove(&name) {
                table.push_column(name, column)?;
            }
        }
        Ok(table)
    }
}

/// Cast one column of a batch, rejecting text columns, unparseable values
/// and nulls instead of reading them as zero padding.
pub(crate) fn numeric_column(
    batch: &RecordBatch,
    index: usize,
    to: &DataType,
) -> TableResult<ArrayRef> {
    let array = cast_numeric(batch, index, to)?;
    if array.null_count() > 0 {
        return Err(TableError::NullValues {
            name: batch.schema().field(index).name().clone(),
            count: array.null_count(),
        });
    }
    Ok(array)
}

/// Like `numeric_column`, but nulls are kept.
pub(crate) fn cast_numeric(
    batch: &RecordBatch,
    index: usize,
    to: &DataType,
) -> TableResult<ArrayRef> {
    let schema = batch.schema();
    let field = schema.field(index);
    if !field.data_type().is_numeric() {
        return Err(non_numeric(field));
    }

    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    Ok(cast_with_options(batch.column(index), to, &options)?)
}

pub(crate) fn non_numeric(field: &Field) -> TableError {
    TableError::NonNumericColumn {
        name: field.name().clone(),
        data_type: field.data_type().to_string(),
    }
}

fn check_point_counts(frame: &HolisticFrame) -> TableResult<()> {
    let check = |kind: &'static str, actual: usize, accepted: &[usize]| {
        if accepted.contains(&actual) {
            Ok(())
        } else {
            Err(LandmarkError::PointCount {
                frame_index: frame.frame_index,
                kind,
                expected: accepted[0],
                actual,
            })
        }
    };

    if let Some(pose) = &frame.pose {
        check("pose", pose.keypoints.len(), &[POSE_LANDMARKS])?;
    }
    if let Some(face) = &frame.face {
        check("face", face.len(), &[FACE_LANDMARKS, FACE_LANDMARKS_REFINED])?;
    }
    if let Some(hand) = &frame.left_hand {
        check("left hand", hand.len(), &[HAND_LANDMARKS])?;
    }
    if let Some(hand) = &frame.right_hand {
        check("right hand", hand.len(), &[HAND_LANDMARKS])?;
    }
    Ok(())
}

fn append_family(
    values: &mut HashMap<String, Vec<f32>>,
    landmark_type: LandmarkType,
    points: Option<&[Keypoint3D]>,
    visibility: impl Fn(usize) -> f32,
) {
    for idx in 0..landmark_type.table_width() {
        // Iris indices of an unrefined face stay zero.
        let (coords, vis) = match points.and_then(|p| p.get(idx)) {
            Some(point) => (point.coords(), visibility(idx)),
            None => ([0.0; 3], 0.0),
        };

        for (axis, value) in [
            (Axis::X, coords[0]),
            (Axis::Y, coords[1]),
            (Axis::Z, coords[2]),
            (Axis::Visibility, vis),
        ] {
            if let Some(column) = values.get_mut(&column_name(landmark_type, idx, axis)) {
                column.push(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::landmarks::BodyPose;
    use arrow::array::StringArray;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("signchat_table_{}_{}", uuid::Uuid::new_v4(), name));
        path
    }

    fn sample_frames() -> Vec<HolisticFrame> {
        vec![
            HolisticFrame {
                frame_index: 0,
                pose: Some(BodyPose {
                    keypoints: vec![Keypoint3D::new(0.4, 0.5, -0.2); POSE_LANDMARKS],
                    visibility_scores: vec![0.9; POSE_LANDMARKS],
                }),
                face: Some(vec![Keypoint3D::new(0.3, 0.3, 0.01); FACE_LANDMARKS]),
                left_hand: None,
                right_hand: Some(vec![Keypoint3D::new(0.7, 0.6, 0.0); HAND_LANDMARKS]),
            },
            HolisticFrame {
                frame_index: 1,
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_full_schema_width() {
        let table = LandmarkTable::from_holistic_frames(&sample_frames()).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_columns(), (33 + 478 + 21 + 21) * 4);
        assert_eq!(table.frames(), &[0, 1]);
    }

    #[test]
    fn test_columns_sorted_lexicographically() {
        let table = LandmarkTable::from_holistic_frames(&sample_frames()).unwrap();
        let names = table.column_names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "face-0-visibility");
    }

    #[test]
    fn test_detected_and_missing_values() {
        let table = LandmarkTable::from_holistic_frames(&sample_frames()).unwrap();

        assert_eq!(table.column("pose-3-visibility").unwrap().values, vec![0.9, 0.0]);
        assert_eq!(table.column("face-12-x").unwrap().values, vec![0.3, 0.0]);
        assert_eq!(table.column("face-12-visibility").unwrap().values, vec![1.0, 0.0]);
        // Unrefined face mesh leaves the iris columns at zero.
        assert_eq!(table.column("face-470-visibility").unwrap().values, vec![0.0, 0.0]);
        assert_eq!(table.column("left_hand-0-visibility").unwrap().values, vec![0.0, 0.0]);
        assert_eq!(table.column("right_hand-20-y").unwrap().values, vec![0.6, 0.0]);
    }

    #[test]
    fn test_push_column_validates_length() {
        let mut table = LandmarkTable::new(vec![0, 1, 2]);
        assert!(table.push_column("face-1-x", vec![0.1, 0.2, 0.3]).is_ok());
        assert!(matches!(
            table.push_column("face-2-x", vec![0.1]),
            Err(TableError::LengthMismatch { expected: 3, actual: 1, .. })
        ));
        assert!(matches!(
            table.push_column("face-1-x", vec![0.1, 0.2, 0.3]),
            Err(TableError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_parquet_preserves_column_order() {
        let mut table = LandmarkTable::new(vec![5, 6]);
        table.push_column("face-10-x", vec![0.1, 0.2]).unwrap();
        table.push_column("face-2-x", vec![0.3, 0.4]).unwrap();

        let path = temp_path("order.parquet");
        table.write_parquet(&path).unwrap();
        let read = LandmarkTable::read_parquet(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(read.column_names(), vec!["face-10-x", "face-2-x"]);
        assert_eq!(read.frames(), &[5, 6]);
        assert_eq!(read.column("face-2-x").unwrap().values, vec![0.3, 0.4]);
    }

    #[test]
    fn test_wrong_point_count_is_rejected() {
        let mut frames = sample_frames();
        frames[1].left_hand = Some(vec![Keypoint3D::new(0.5, 0.5, 0.0); HAND_LANDMARKS - 1]);
        assert!(matches!(
            LandmarkTable::from_holistic_frames(&frames),
            Err(TableError::Landmark(LandmarkError::PointCount {
                frame_index: 1,
                expected: 21,
                actual: 20,
                ..
            }))
        ));

        let mut frames = sample_frames();
        frames[0].right_hand = Some(vec![Keypoint3D::new(0.5, 0.5, 0.0); 30]);
        assert!(LandmarkTable::from_holistic_frames(&frames).is_err());

        let mut frames = sample_frames();
        frames[0].face = Some(vec![Keypoint3D::new(0.3, 0.3, 0.0); 470]);
        assert!(LandmarkTable::from_holistic_frames(&frames).is_err());
    }

    #[test]
    fn test_refined_face_fills_iris_columns() {
        let mut frames = sample_frames();
        frames[0].face = Some(vec![Keypoint3D::new(0.3, 0.3, 0.01); FACE_LANDMARKS_REFINED]);

        let table = LandmarkTable::from_holistic_frames(&frames).unwrap();
        assert_eq!(table.column("face-477-x").unwrap().values, vec![0.3, 0.0]);
        assert_eq!(table.column("face-470-visibility").unwrap().values, vec![1.0, 0.0]);
    }

    fn write_raw(path: &Path, columns: Vec<(&str, ArrayRef)>) {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect();
        let schema = Arc::new(Schema::new(fields));
        let batch =
            RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, a)| a).collect())
                .unwrap();

        let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_null_values_are_rejected() {
        let path = temp_path("null_frame.parquet");
        write_raw(
            &path,
            vec![
                ("frame", Arc::new(Int64Array::from(vec![Some(7), None])) as ArrayRef),
                ("face-1-x", Arc::new(Float32Array::from(vec![0.4, 0.5])) as ArrayRef),
            ],
        );
        let result = LandmarkTable::read_parquet(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            result,
            Err(TableError::NullValues { ref name, count: 1 }) if name == "frame"
        ));

        let path = temp_path("null_value.parquet");
        write_raw(
            &path,
            vec![
                ("frame", Arc::new(Int64Array::from(vec![7, 8])) as ArrayRef),
                ("face-1-x", Arc::new(Float32Array::from(vec![Some(0.4), None])) as ArrayRef),
            ],
        );
        let result = LandmarkTable::read_parquet(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            result,
            Err(TableError::NullValues { ref name, .. }) if name == "face-1-x"
        ));
    }

    #[test]
    fn test_text_column_is_rejected() {
        let path = temp_path("text.parquet");
        write_raw(
            &path,
            vec![
                ("frame", Arc::new(Int64Array::from(vec![7, 8])) as ArrayRef),
                ("face-1-x", Arc::new(Float32Array::from(vec![0.4, 0.5])) as ArrayRef),
                ("face-1-y", Arc::new(StringArray::from(vec!["abc", "0.3"])) as ArrayRef),
            ],
        );
        let result = LandmarkTable::read_parquet(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            result,
            Err(TableError::NonNumericColumn { ref name, .. }) if name == "face-1-y"
        ));
    }

    #[test]
    fn test_wider_numeric_types_are_read() {
        let path = temp_path("wide.parquet");
        write_raw(
            &path,
            vec![
                ("frame", Arc::new(arrow::array::Int32Array::from(vec![3, 4])) as ArrayRef),
                ("face-1-x", Arc::new(arrow::array::Float64Array::from(vec![0.25, 0.5])) as ArrayRef),
            ],
        );
        let table = LandmarkTable::read_parquet(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(table.frames(), &[3, 4]);
        assert_eq!(table.column("face-1-x").unwrap().values, vec![0.25, 0.5]);
    }
}
