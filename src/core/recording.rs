use crate::core::column_filter::natural_sort;
use crate::core::landmark_table::{
    cast_numeric, non_numeric, numeric_column, TableError, TableResult, FRAME_COLUMN,
};
use arrow::array::{Array, ArrayRef, Float32Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Capture time column of an exported recording (Unix millis)
pub const TIMESTAMP_COLUMN: &str = "timestamp";

const AXIS_SUFFIXES: [&str; 3] = ["_x", "_y", "_z"];

/// Tracked landmark subset of one frame, keyed `face_10`, `left_hand_4`, ...
pub type TrackedLandmarks = BTreeMap<String, [f32; 3]>;

/// One recorded frame of the live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub frame: u64,
    pub timestamp: i64, // Unix millis
    pub landmarks: TrackedLandmarks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    Waiting,
    Recording,
    Error,
}

impl RecordingStatus {
    pub fn to_string(&self) -> &'static str {
        match self {
            RecordingStatus::Waiting => "Waiting for recording...",
            RecordingStatus::Recording => "Recording in progress",
            RecordingStatus::Error => "Error",
        }
    }
}

/// Append-only buffer of recorded frames.
///
/// Appends and snapshots go through the same lock, so readers always see a
/// consistent prefix of the recording.
#[derive(Debug, Default)]
pub struct RecordingBuffer {
    frames: Mutex<Vec<RecordedFrame>>,
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedFrame>> {
        // A panicked writer leaves at worst a fully pushed frame behind.
        self.frames.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a frame; its number is the buffer length before the append.
    pub fn record(&self, landmarks: TrackedLandmarks) -> u64 {
        let mut frames = self.lock();
        let frame = frames.len() as u64;
        frames.push(RecordedFrame {
            frame,
            timestamp: chrono::Utc::now().timestamp_millis(),
            landmarks,
        });
        frame
    }

    /// Snapshot of the last `n` frames, oldest first
    pub fn recent(&self, n: usize) -> Vec<RecordedFrame> {
        let frames = self.lock();
        let start = frames.len().saturating_sub(n);
        frames[start..].to_vec()
    }

    pub fn snapshot(&self) -> Vec<RecordedFrame> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn status(&self) -> RecordingStatus {
        if self.is_empty() {
            RecordingStatus::Waiting
        } else {
            RecordingStatus::Recording
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Write every recorded frame to a Parquet file; returns the frame count.
    pub fn export_parquet(&self, path: &Path) -> TableResult<usize> {
        let frames = self.snapshot();
        write_recording(&frames, path)?;
        Ok(frames.len())
    }
}

// ==============================================================================
// Recording Export
// ==============================================================================

/// Write recorded frames as one row each: `frame`, `timestamp`, then
/// `{key}_x`, `{key}_y`, `{key}_z` per tracked landmark in natural key order.
/// A landmark missing from a frame is stored as null in that row.
pub fn write_recording(frames: &[RecordedFrame], path: &Path) -> TableResult<()> {
    let mut keys: Vec<String> = frames
        .iter()
        .flat_map(|f| f.landmarks.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    natural_sort(&mut keys);

    let mut fields = vec![
        Field::new(FRAME_COLUMN, DataType::Int64, false),
        Field::new(TIMESTAMP_COLUMN, DataType::Int64, false),
    ];
    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(frames.iter().map(|f| f.frame as i64))),
        Arc::new(Int64Array::from_iter_values(frames.iter().map(|f| f.timestamp))),
    ];

    for key in &keys {
        for (axis, suffix) in AXIS_SUFFIXES.iter().enumerate() {
            let values: Float32Array = frames
                .iter()
                .map(|f| f.landmarks.get(key).map(|coords| coords[axis]))
                .collect();
            fields.push(Field::new(format!("{}{}", key, suffix), DataType::Float32, true));
            arrays.push(Arc::new(values));
        }
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
        "Exported {} recorded frames with {} landmarks to {}",
        frames.len(),
        keys.len(),
        path.display()
    );
    Ok(())
}

/// Read a recording written by `write_recording`.
pub fn read_recording(path: &Path) -> TableResult<Vec<RecordedFrame>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut frames = Vec::new();
    for batch in reader {
        let batch = batch?;
        let schema = batch.schema();
        let index_of = |name: &str| {
            schema
                .index_of(name)
                .map_err(|_| TableError::MissingColumn(name.to_string()))
        };

        let frame_numbers = int64_column(&batch, index_of(FRAME_COLUMN)?)?;
        let timestamps = int64_column(&batch, index_of(TIMESTAMP_COLUMN)?)?;

        let mut landmark_columns: Vec<(String, [Float32Array; 3])> = Vec::new();
        for field in schema.fields() {
            let Some(key) = field.name().strip_suffix(AXIS_SUFFIXES[0]) else {
                continue;
            };
            let x = float32_column(&batch, index_of(format!("{}_x", key).as_str())?)?;
            let y = float32_column(&batch, index_of(format!("{}_y", key).as_str())?)?;
            let z = float32_column(&batch, index_of(format!("{}_z", key).as_str())?)?;
            landmark_columns.push((key.to_string(), [x, y, z]));
        }

        for row in 0..batch.num_rows() {
            let mut landmarks = TrackedLandmarks::new();
            for (key, [x, y, z]) in &landmark_columns {
                if x.is_valid(row) && y.is_valid(row) && z.is_valid(row) {
                    landmarks.insert(key.clone(), [x.value(row), y.value(row), z.value(row)]);
                }
            }
            frames.push(RecordedFrame {
                frame: frame_numbers.value(row) as u64,
                timestamp: timestamps.value(row),
                landmarks,
            });
        }
    }

    Ok(frames)
}

fn int64_column(batch: &RecordBatch, index: usize) -> TableResult<Int64Array> {
    let array = numeric_column(batch, index, &DataType::Int64)?;
    array
        .as_any()
        .downcast_ref::<Int64Array>()
        .cloned()
        .ok_or_else(|| non_numeric(batch.schema().field(index)))
}

fn float32_column(batch: &RecordBatch, index: usize) -> TableResult<Float32Array> {
    let array = cast_numeric(batch, index, &DataType::Float32)?;
    array
        .as_any()
        .downcast_ref::<Float32Array>()
        .cloned()
        .ok_or_else(|| non_numeric(batch.schema().field(index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn landmarks(value: f32) -> TrackedLandmarks {
        let mut map = TrackedLandmarks::new();
        map.insert("face_10".to_string(), [value, value, 0.0]);
        map
    }

    #[test]
    fn test_frame_numbers_follow_length() {
        let buffer = RecordingBuffer::new();
        assert_eq!(buffer.status(), RecordingStatus::Waiting);

        assert_eq!(buffer.record(landmarks(0.1)), 0);
        assert_eq!(buffer.record(landmarks(0.2)), 1);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.status(), RecordingStatus::Recording);
    }

    #[test]
    fn test_recent_returns_last_n_in_order() {
        let buffer = RecordingBuffer::new();
        for i in 0..15 {
            buffer.record(landmarks(i as f32));
        }

        let recent = buffer.recent(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().unwrap().frame, 5);
        assert_eq!(recent.last().unwrap().frame, 14);

        assert_eq!(buffer.recent(100).len(), 15);
    }

    #[test]
    fn test_concurrent_appends_keep_every_frame() {
        let buffer = Arc::new(RecordingBuffer::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        buffer.record(landmarks(0.5));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let frames = buffer.snapshot();
        assert_eq!(frames.len(), 100);
        assert!(frames.iter().enumerate().all(|(i, f)| f.frame == i as u64));
    }

    #[test]
    fn test_clear() {
        let buffer = RecordingBuffer::new();
        buffer.record(landmarks(0.3));
        buffer.clear();
        assert!(buffer.is_empty());
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("signchat_recording_{}_{}", uuid::Uuid::new_v4(), name))
    }

    #[test]
    fn test_export_round_trip() {
        let buffer = RecordingBuffer::new();
        buffer.record(landmarks(0.1));

        let mut second = landmarks(0.2);
        second.insert("left_hand_4".to_string(), [0.6, 0.7, -0.1]);
        second.insert("face_2".to_string(), [0.3, 0.4, 0.05]);
        buffer.record(second);

        let path = temp_path("export.parquet");
        assert_eq!(buffer.export_parquet(&path).unwrap(), 2);
        let read = read_recording(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(read.unwrap(), buffer.snapshot());
    }

    #[test]
    fn test_export_columns_follow_natural_key_order() {
        let buffer = RecordingBuffer::new();
        let mut frame = landmarks(0.5);
        frame.insert("face_2".to_string(), [0.1, 0.1, 0.1]);
        buffer.record(frame);

        let path = temp_path("columns.parquet");
        buffer.export_parquet(&path).unwrap();
        let file = File::open(&path).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let names: Vec<String> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let _ = std::fs::remove_file(&path);

        assert_eq!(
            names,
            vec![
                "frame", "timestamp", "face_2_x", "face_2_y", "face_2_z", "face_10_x",
                "face_10_y", "face_10_z",
            ]
        );
    }

    #[test]
    fn test_export_empty_recording() {
        let path = temp_path("empty.parquet");
        assert_eq!(RecordingBuffer::new().export_parquet(&path).unwrap(), 0);
        let read = read_recording(&path);
        let _ = std::fs::remove_file(&path);
        assert!(read.unwrap().is_empty());
    }
}
