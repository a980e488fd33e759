// Chat transcript shown between the signer and the hearing participant

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,      // Signer, via translation
    Assistant, // Other participant, via speech or text
}

impl ChatRole {
    pub fn to_string(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_from_signer(&mut self, text: &str) -> bool {
        self.push(ChatRole::User, text)
    }

    pub fn push_from_other(&mut self, text: &str) -> bool {
        self.push(ChatRole::Assistant, text)
    }

    /// Blank messages are dropped; returns whether the message was added.
    fn push(&mut self, role: ChatRole, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        self.messages.push(ChatMessage {
            role,
            content: text.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        });
        true
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
