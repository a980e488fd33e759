// Data models for landmarks, model inference, speech and chat

pub mod landmarks;
pub mod inference;
pub mod audio;
pub mod chat;
