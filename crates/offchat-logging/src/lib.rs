// Logging module - conversation and request logging
pub mod conversation_logger;
pub mod request_logger;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub use conversation_logger::{ChatLogEntry, ConversationLogger};

pub use request_logger::{log_request, log_request_to_file, log_response, log_stream_chunk};

/// Safely truncate a string to a maximum number of characters
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        // Reserve space for "..." suffix
        let trunc_chars = max_chars.saturating_sub(3);
        format!("{}...", s.chars().take(trunc_chars).collect::<String>())
    }
}

/// Get or create the logs directory
pub fn ensure_logs_dir(log_dir: &Path) -> Result<PathBuf> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create logs directory: {}", log_dir.display()))?;
    }
    Ok(log_dir.to_path_buf())
}
