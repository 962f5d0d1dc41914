//! Core types and structures for offchat
//!
//! This crate provides the foundational types used across all offchat crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Number of user/assistant exchanges kept in a history buffer by default
pub const DEFAULT_HISTORY_MAX_TURNS: usize = 6;

/// Exchanges kept when the exchange loop trims a full history
pub const TRIM_KEEP_TURNS: usize = 3;

/// Prompt tag opening a user line
pub const HUMAN_TAG: &str = "### Human:";

/// Prompt tag opening an assistant line
pub const ASSISTANT_TAG: &str = "### Assistant:";

/// Stop sequences that end generation at the next turn boundary
pub const STOP_SEQUENCES: [&str; 4] = ["### Human:", "\n### Human:", "Human:", "\nHuman:"];

/// Characters of the first user message used as a conversation title
pub const CONVERSATION_TITLE_CHARS: usize = 40;

// ============================================================================
// Turn Types
// ============================================================================

/// Speaker of a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Tag written in front of this role's lines in a prompt
    pub fn prompt_tag(&self) -> &'static str {
        match self {
            Role::User => HUMAN_TAG,
            Role::Assistant => ASSISTANT_TAG,
        }
    }
}

/// One chat message held in a history buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Render as a single prompt line, e.g. `### Human: hello`
    pub fn render(&self) -> String {
        format!("{} {}", self.role.prompt_tag(), self.content)
    }
}

// ============================================================================
// Persistence Types
// ============================================================================

/// Conversation identifier
pub type ConversationId = String;

/// Generate a fresh conversation identifier
pub fn new_conversation_id() -> ConversationId {
    Uuid::new_v4().to_string()
}

/// One stored exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub assistant_response: String,
    pub conversation_id: ConversationId,
    pub owner: String,
}

/// Entry of a user's conversation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub last_activity: DateTime<Utc>,
}

/// Message shape returned to the web page when a stored chat is reopened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub role: String,
    pub content: String,
}

impl DisplayMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: "bot".to_string(),
            content: content.into(),
        }
    }
}
