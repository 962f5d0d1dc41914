use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// One line of the daily chat log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatLogEntry {
    pub timestamp: String, // ISO‑8601 Local time
    pub user: String,
    pub assistant: String,
}

/// Appends user/assistant exchanges to `chat_YYYY-MM-DD.jsonl` files.
///
/// The file is chosen per entry, so a session running past midnight
/// continues in the next day's file.
pub struct ConversationLogger {
    log_dir: PathBuf,
}

impl ConversationLogger {
    /// Create a new logger writing under `log_dir`, creating the directory if needed.
    pub async fn new(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir).await?;
        Ok(Self {
            log_dir: log_dir.to_path_buf(),
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the log file for a given day
    pub fn file_for(&self, day: NaiveDate) -> PathBuf {
        self.log_dir
            .join(format!("chat_{}.jsonl", day.format("%Y-%m-%d")))
    }

    /// Append a single exchange. Failures are reported on stderr and swallowed.
    pub async fn log_exchange(&self, user_message: &str, assistant_message: &str) {
        self.log_exchange_at(Local::now(), user_message, assistant_message)
            .await;
    }

    async fn log_exchange_at(
        &self,
        now: DateTime<Local>,
        user_message: &str,
        assistant_message: &str,
    ) {
        let entry = ChatLogEntry {
            timestamp: now.to_rfc3339(),
            user: user_message.to_string(),
            assistant: assistant_message.to_string(),
        };
        let file_path = self.file_for(now.date_naive());

        if let Err(e) = Self::append_line(&file_path, &entry).await {
            eprintln!("[Logging error] {}", e);
        }
    }

    async fn append_line(file_path: &Path, entry: &ChatLogEntry) -> Result<()> {
        let json = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        // Flush to ensure it's written
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_log_exchange_appends_json_lines() {
        let temp = TempDir::new().unwrap();
        let logger = ConversationLogger::new(temp.path()).await.unwrap();

        logger.log_exchange("hello", "hi there").await;
        logger.log_exchange("xin chào", "chào bạn").await;

        let path = logger.file_for(Local::now().date_naive());
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let entries: Vec<ChatLogEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user, "hello");
        assert_eq!(entries[0].assistant, "hi there");
        // Non-ASCII text is stored as-is, not escaped
        assert!(content.contains("xin chào"));
    }

    #[tokio::test]
    async fn test_entries_go_to_file_of_their_day() {
        let temp = TempDir::new().unwrap();
        let logger = ConversationLogger::new(temp.path()).await.unwrap();
        let day = Local.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();

        logger.log_exchange_at(day, "late", "night").await;

        let expected = temp.path().join("chat_2024-03-09.jsonl");
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn test_new_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested/logs");
        let logger = ConversationLogger::new(&dir).await.unwrap();
        assert_eq!(logger.log_dir(), dir.as_path());
        assert!(dir.is_dir());
    }
}
