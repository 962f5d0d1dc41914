//! Model weight file inspection.

use std::fs;
use std::path::{Path, PathBuf};

/// Basic facts about a model weight file on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub path: PathBuf,
    pub exists: bool,
    /// Size in megabytes, rounded to two decimals.
    pub size_mb: Option<f64>,
}

impl ModelInfo {
    /// Stat the file at `path`. A missing file is reported, not an error.
    pub fn inspect(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                let size_mb = meta.len() as f64 / (1024.0 * 1024.0);
                Self {
                    path: path.to_path_buf(),
                    exists: true,
                    size_mb: Some((size_mb * 100.0).round() / 100.0),
                }
            }
            _ => Self {
                path: path.to_path_buf(),
                exists: false,
                size_mb: None,
            },
        }
    }

    /// Whether the file carries the GGUF extension llama.cpp expects.
    pub fn is_gguf(&self) -> bool {
        self.path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gguf"))
            .unwrap_or(false)
    }
}
