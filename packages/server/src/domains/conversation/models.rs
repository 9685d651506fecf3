use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domains::audit::AuditRecord;
use crate::domains::workflow::ClassificationLabel;
use crate::kernel::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// History as it was persisted by older clients: one flat string with
/// `User: ` / `AI: ` prefixed lines. Continuation lines belong to the
/// previous message.
pub fn history_from_legacy(text: &str) -> Vec<ChatMessage> {
    let mut history: Vec<ChatMessage> = Vec::new();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("User: ") {
            history.push(ChatMessage::user(rest));
        } else if let Some(rest) = line.strip_prefix("AI: ") {
            history.push(ChatMessage::assistant(rest));
        } else if let Some(last) = history.last_mut() {
            last.content.push('\n');
            last.content.push_str(line);
        }
    }

    for message in &mut history {
        let trimmed = message.content.trim_end().len();
        message.content.truncate(trimmed);
    }
    history
}

impl From<&ChatMessage> for Message {
    fn from(message: &ChatMessage) -> Self {
        match message.role {
            Role::User => Message::user(message.content.clone()),
            Role::Assistant => Message::assistant(message.content.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredConversation {
    pub history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-turn working state. Created for a request and dropped after it; only
/// `chat_history` outlives the turn.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub user_question: String,
    /// Extracted text only. Cleared before anything is persisted.
    pub attached_document: Option<String>,
    pub chat_history: Vec<ChatMessage>,
    pub classification_label: Option<ClassificationLabel>,
    pub draft_response: Option<String>,
    pub audit_record: Option<AuditRecord>,
    pub revision_count: u32,
    /// Correction note from the last failed audit, fed to the next draft.
    pub revision_feedback: Option<String>,
}

impl ConversationState {
    pub fn new(
        user_question: impl Into<String>,
        chat_history: Vec<ChatMessage>,
        attached_document: Option<String>,
    ) -> Self {
        Self {
            user_question: user_question.into(),
            attached_document,
            chat_history,
            ..Self::default()
        }
    }

    /// Append the finished turn. History only ever grows.
    pub fn record_turn(&mut self, answer: &str) {
        self.chat_history.push(ChatMessage::user(self.user_question.clone()));
        self.chat_history.push(ChatMessage::assistant(answer));
    }
}
