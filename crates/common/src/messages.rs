use faststr::FastStr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    Assistant,
    User,
}

impl MessageRole {
    pub fn is_system(&self) -> bool {
        matches!(self, MessageRole::System)
    }

    pub fn is_user(&self) -> bool {
        matches!(self, MessageRole::User)
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, MessageRole::Assistant)
    }
}

/// One turn of the conversation as it travels between client, relay and
/// upstream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role:    MessageRole,
    pub content: FastStr,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<FastStr>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<FastStr>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<FastStr>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<FastStr>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}
