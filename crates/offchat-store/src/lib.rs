//! Persistence for the offchat web variant
//!
//! Accounts and stored exchanges live behind the [`ChatStore`] trait.
//! [`JsonFileStore`] keeps them as plain JSON documents in a data directory.

use async_trait::async_trait;

use offchat_types::{ChatRecord, ConversationSummary};

mod error;
mod json_file;
mod password;
pub mod validation;

pub use error::StoreError;
pub use json_file::JsonFileStore;
pub use validation::{validate_registration, ValidationError};

/// Account and chat-record storage
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create an account. Fails with [`StoreError::UserExists`] if the name is taken.
    async fn register_user(&self, username: &str, password: &str) -> Result<(), StoreError>;

    /// True only if the account exists and the password matches.
    async fn login_user(&self, username: &str, password: &str) -> Result<bool, StoreError>;

    async fn save_message(&self, record: ChatRecord) -> Result<(), StoreError>;

    /// Conversations owned by `owner`, most recently active first.
    async fn conversation_list(&self, owner: &str) -> Result<Vec<ConversationSummary>, StoreError>;

    /// Records of one conversation, oldest first. Other owners' records are never returned.
    async fn messages(&self, conversation_id: &str, owner: &str) -> Result<Vec<ChatRecord>, StoreError>;

    async fn delete_all_conversations(&self, owner: &str) -> Result<(), StoreError>;
}
