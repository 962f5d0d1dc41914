use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use offchat_chat::ConversationManager;
use offchat_types::{new_conversation_id, ChatRecord, ConversationId};

/// Value of the session cookie
pub type SessionToken = Uuid;

/// Per-user chat state: the open conversation and its history buffer
pub struct UserSession {
    pub conversation_id: ConversationId,
    pub history: ConversationManager,
}

impl UserSession {
    fn new(max_turns: usize) -> Self {
        Self {
            conversation_id: new_conversation_id(),
            history: ConversationManager::new(max_turns),
        }
    }

    /// Switch to a fresh conversation with an empty buffer
    pub fn start_new_conversation(&mut self) {
        self.conversation_id = new_conversation_id();
        self.history.clear_history();
    }

    /// Make `conversation_id` current and rebuild the buffer from its stored records
    pub fn resume(&mut self, conversation_id: &str, records: &[ChatRecord]) {
        self.conversation_id = conversation_id.to_string();
        self.history.clear_history();
        for record in records {
            self.history.add_user_message(&record.user_message);
            self.history.add_assistant_message(&record.assistant_response);
        }
    }
}

/// Logged-in users and their chat state.
///
/// Several tokens (browsers) may belong to one user; they share the
/// user's session, which is created at login and disposed when the
/// user's last token logs out.
pub struct SessionRegistry {
    tokens: RwLock<HashMap<SessionToken, String>>,
    users: RwLock<HashMap<String, Arc<Mutex<UserSession>>>>,
    max_turns: usize,
}

impl SessionRegistry {
    pub fn new(max_turns: usize) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            max_turns,
        }
    }

    /// Issue a token for `username`, creating the user's session if absent
    pub async fn login(&self, username: &str) -> SessionToken {
        let token = Uuid::new_v4();
        self.tokens.write().await.insert(token, username.to_string());

        let max_turns = self.max_turns;
        self.users
            .write()
            .await
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UserSession::new(max_turns))));

        token
    }

    /// Username behind `token`, if logged in
    pub async fn resolve(&self, token: &SessionToken) -> Option<String> {
        self.tokens.read().await.get(token).cloned()
    }

    pub async fn session(&self, username: &str) -> Option<Arc<Mutex<UserSession>>> {
        self.users.read().await.get(username).cloned()
    }

    /// Invalidate `token`; returns the username it belonged to
    pub async fn logout(&self, token: &SessionToken) -> Option<String> {
        let mut tokens = self.tokens.write().await;
        let username = tokens.remove(token)?;

        if !tokens.values().any(|u| u == &username) {
            self.users.write().await.remove(&username);
        }
        Some(username)
    }

    pub async fn active_users(&self) -> usize {
        self.users.read().await.len()
    }
}
