use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use offchat_types::{ChatRecord, ConversationSummary, CONVERSATION_TITLE_CHARS};

use crate::error::StoreError;
use crate::password::{hash_password, verify_password};
use crate::ChatStore;

const USERS_FILE: &str = "users.json";
const HISTORY_FILE: &str = "chat_history.jsonl";

/// Stored account
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// Document store on disk.
///
/// * `<data_dir>/users.json` - array of accounts
/// * `<data_dir>/chat_history.jsonl` - one [`ChatRecord`] per line
pub struct JsonFileStore {
    data_dir: PathBuf,
    // Serializes every read-modify-write of the two files
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `data_dir`
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).await?;
        Ok(Self {
            data_dir,
            lock: Mutex::new(()),
        })
    }

    fn users_path(&self) -> PathBuf {
        self.data_dir.join(USERS_FILE)
    }

    fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    async fn read_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let path = self.users_path();
        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&json).map_err(|source| StoreError::Corrupt {
            path: path.display().to_string(),
            source,
        })
    }

    async fn write_users(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(users)?;
        write_atomic(&self.users_path(), json.as_bytes()).await
    }

    async fn read_records(&self) -> Result<Vec<ChatRecord>, StoreError> {
        let path = self.history_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ChatRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => eprintln!(
                    "[Store warning] skipping unreadable line {} in {}: {}",
                    n + 1,
                    path.display(),
                    e
                ),
            }
        }
        Ok(records)
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.read_users().await?;
        Ok(users.into_iter().find(|u| u.username == username))
    }
}

/// Replace `path` by writing a sibling temp file and renaming it over
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Group `owner`'s records into conversation summaries, newest activity first
fn summarize(mut records: Vec<ChatRecord>) -> Vec<ConversationSummary> {
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut by_id: HashMap<String, ConversationSummary> = HashMap::new();
    for record in records {
        by_id
            .entry(record.conversation_id.clone())
            .and_modify(|summary| {
                if record.timestamp > summary.last_activity {
                    summary.last_activity = record.timestamp;
                }
            })
            .or_insert_with(|| ConversationSummary {
                id: record.conversation_id.clone(),
                title: record.user_message.chars().take(CONVERSATION_TITLE_CHARS).collect(),
                last_activity: record.timestamp,
            });
    }

    let mut summaries: Vec<ConversationSummary> = by_id.into_values().collect();
    summaries.sort_by(|a, b| {
        b.last_activity
            .cmp(&a.last_activity)
            .then_with(|| a.id.cmp(&b.id))
    });
    summaries
}

#[async_trait]
impl ChatStore for JsonFileStore {
    async fn register_user(&self, username: &str, password: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        let mut users = self.read_users().await?;
        if users.iter().any(|u| u.username == username) {
            return Err(StoreError::UserExists(username.to_string()));
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

        users.push(UserRecord {
            username: username.to_string(),
            password_hash,
            created_at: Utc::now(),
        });
        self.write_users(&users).await
    }

    async fn login_user(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let user = {
            let _guard = self.lock.lock().await;
            self.find_user(username).await?
        };
        let Some(user) = user else {
            return Ok(false);
        };

        let password = password.to_string();
        let ok = tokio::task::spawn_blocking(move || verify_password(&password, &user.password_hash)).await?;
        Ok(ok)
    }

    async fn save_message(&self, record: ChatRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.history_path())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn conversation_list(&self, owner: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let records = {
            let _guard = self.lock.lock().await;
            self.read_records().await?
        };
        let owned = records.into_iter().filter(|r| r.owner == owner).collect();
        Ok(summarize(owned))
    }

    async fn messages(&self, conversation_id: &str, owner: &str) -> Result<Vec<ChatRecord>, StoreError> {
        let records = {
            let _guard = self.lock.lock().await;
            self.read_records().await?
        };
        let mut matching: Vec<ChatRecord> = records
            .into_iter()
            .filter(|r| r.conversation_id == conversation_id && r.owner == owner)
            .collect();
        matching.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(matching)
    }

    async fn delete_all_conversations(&self, owner: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        let records = self.read_records().await?;
        let mut kept = String::new();
        for record in records.iter().filter(|r| r.owner != owner) {
            kept.push_str(&serde_json::to_string(record)?);
            kept.push('\n');
        }
        write_atomic(&self.history_path(), kept.as_bytes()).await
    }
}
