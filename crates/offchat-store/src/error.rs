use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Account already exists: {0}")]
    UserExists(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Corrupt store file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
