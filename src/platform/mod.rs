// Bridges to external inference backends

pub mod detector;
