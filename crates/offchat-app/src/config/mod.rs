//! Application configuration: defaults, TOML file and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use offchat_llm_api::{GenerationParams, ServerOptions, DEFAULT_PORT, DEFAULT_SERVER_BINARY};
use offchat_types::DEFAULT_HISTORY_MAX_TURNS;

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "offchat.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("n_ctx should be between 256-8192 (got {0})")]
    ContextSize(u32),

    #[error("temperature should be between 0-2 (got {0})")]
    Temperature(f32),

    #[error("top_p should be in (0, 1] (got {0})")]
    TopP(f32),

    #[error("history_max_turns must be at least 1")]
    HistoryTurns,
}

/// Every tunable of the assistant. Missing TOML keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OffchatConfig {
    pub model_path: PathBuf,
    /// Context window size
    pub n_ctx: u32,
    pub n_threads: u32,
    pub n_batch: u32,

    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,

    /// Exchanges kept in a history buffer
    pub history_max_turns: usize,
    pub log_dir: PathBuf,
    pub stream: bool,

    pub server_binary: PathBuf,
    pub server_port: u16,
    /// Use an already running llama.cpp server instead of spawning one
    pub llama_cpp_url: Option<String>,

    /// Where the web variant keeps accounts and chat records
    pub data_dir: PathBuf,
}

impl Default for OffchatConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/python.gguf"),
            n_ctx: 2048,
            n_threads: 4,
            n_batch: 16,
            temperature: 0.8,
            top_p: 0.95,
            max_tokens: 512,
            history_max_turns: DEFAULT_HISTORY_MAX_TURNS,
            log_dir: PathBuf::from("logs"),
            stream: false,
            server_binary: PathBuf::from(DEFAULT_SERVER_BINARY),
            server_port: DEFAULT_PORT,
            llama_cpp_url: None,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl OffchatConfig {
    /// Load from `path`, or from `offchat.toml` if it exists, else defaults.
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Check value ranges, and that the model exists when a local server is spawned
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llama_cpp_url.is_none() && !self.model_path.exists() {
            return Err(ConfigError::ModelNotFound(self.model_path.clone()));
        }

        if !(256..=8192).contains(&self.n_ctx) {
            return Err(ConfigError::ContextSize(self.n_ctx));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Temperature(self.temperature));
        }

        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ConfigError::TopP(self.top_p));
        }

        if self.history_max_turns == 0 {
            return Err(ConfigError::HistoryTurns);
        }

        Ok(())
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            binary: self.server_binary.clone(),
            model_path: self.model_path.clone(),
            port: self.server_port,
            n_ctx: self.n_ctx,
            n_threads: self.n_threads,
            n_batch: self.n_batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn with_model() -> (tempfile::TempDir, OffchatConfig) {
        let temp = tempfile::TempDir::new().unwrap();
        let model = temp.path().join("model.gguf");
        std::fs::File::create(&model).unwrap();
        let config = OffchatConfig {
            model_path: model,
            ..OffchatConfig::default()
        };
        (temp, config)
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = OffchatConfig::from_toml("temperature = 0.3\nhistory_max_turns = 2\n").unwrap();
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.history_max_turns, 2);
        assert_eq!(config.n_ctx, 2048);
        assert_eq!(config.model_path, PathBuf::from("models/python.gguf"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(OffchatConfig::from_toml("tempurature = 0.3").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "llama_cpp_url = \"http://127.0.0.1:8080\"").unwrap();

        let config = OffchatConfig::load(Some(&path)).unwrap();
        assert_eq!(config.llama_cpp_url.as_deref(), Some("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = OffchatConfig::load(Some(Path::new("/no/such/offchat.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_validate_accepts_defaults_with_model() {
        let (_temp, config) = with_model();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_model() {
        let config = OffchatConfig {
            model_path: PathBuf::from("/no/such/model.gguf"),
            ..OffchatConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ModelNotFound(_))));
    }

    #[test]
    fn test_external_server_skips_model_check() {
        let config = OffchatConfig {
            model_path: PathBuf::from("/no/such/model.gguf"),
            llama_cpp_url: Some("http://127.0.0.1:8080".to_string()),
            ..OffchatConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        let (_temp, config) = with_model();

        let bad_ctx = OffchatConfig { n_ctx: 128, ..config.clone() };
        assert!(matches!(bad_ctx.validate(), Err(ConfigError::ContextSize(128))));

        let bad_temp = OffchatConfig { temperature: 2.5, ..config.clone() };
        assert!(matches!(bad_temp.validate(), Err(ConfigError::Temperature(_))));

        let bad_top_p = OffchatConfig { top_p: 0.0, ..config.clone() };
        assert!(matches!(bad_top_p.validate(), Err(ConfigError::TopP(_))));

        let bad_turns = OffchatConfig { history_max_turns: 0, ..config };
        assert!(matches!(bad_turns.validate(), Err(ConfigError::HistoryTurns)));
    }

    #[test]
    fn test_server_options_follow_config() {
        let config = OffchatConfig {
            n_ctx: 4096,
            server_port: 9000,
            ..OffchatConfig::default()
        };
        let options = config.server_options();
        assert_eq!(options.n_ctx, 4096);
        assert_eq!(options.port, 9000);
        assert_eq!(options.n_batch, 16);
    }
}
