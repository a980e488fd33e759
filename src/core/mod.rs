pub mod config;

// Feature pipeline
pub mod features;
pub mod normalizer;

// Landmark tables and column curation
pub mod landmark_table;
pub mod column_filter;

// Live detection and recording
pub mod recording;
pub mod session;

// Model and speech capabilities
pub mod translator;
pub mod speech_transcriber;
