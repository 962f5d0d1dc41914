use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// CLI arguments for offchat
#[derive(Parser, Debug)]
#[command(name = "offchat")]
#[command(about = "Offline chat assistant backed by a local llama.cpp model")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a TOML config file (default: offchat.toml if present)
    #[arg(long, global = true, value_name = "PATH", env = "OFFCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// GGUF model served by the local llama-server
    #[arg(long, global = true, value_name = "PATH", env = "OFFCHAT_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Use an already running llama.cpp server (e.g., http://localhost:8080)
    /// instead of spawning one
    #[arg(long, global = true, value_name = "URL", env = "OFFCHAT_LLAMA_CPP_URL")]
    pub llama_cpp_url: Option<String>,

    /// Enable streaming mode - show AI responses as they're generated
    #[arg(long, global = true)]
    pub stream: bool,

    /// Enable verbose debug output (shows completion requests and responses)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Exchanges kept in the conversation history
    #[arg(long, global = true, value_name = "N", env = "OFFCHAT_MAX_TURNS")]
    pub max_turns: Option<usize>,

    /// Directory for chat logs
    #[arg(long, global = true, value_name = "DIR", env = "OFFCHAT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Generate shell completions
    #[arg(long, value_enum)]
    pub generate: Option<Shell>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Interactive chat in the terminal (default)
    Chat,

    /// Serve the browser chat with accounts and saved conversations
    Web {
        /// Web server bind address
        #[arg(long, default_value = "127.0.0.1", env = "OFFCHAT_WEB_BIND")]
        bind: String,

        /// Web server port
        #[arg(long, default_value = "5000", env = "OFFCHAT_WEB_PORT")]
        port: u16,

        /// Directory holding accounts and chat records
        #[arg(long, value_name = "DIR", env = "OFFCHAT_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Serve files from this directory under /static
        #[arg(long, value_name = "DIR")]
        static_dir: Option<PathBuf>,
    },

    /// Check config, model file, CPU and llama-server availability
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_chat() {
        let cli = Cli::try_parse_from(["offchat", "--stream"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.stream);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["offchat", "web", "--port", "8080", "--max-turns", "3"]).unwrap();
        assert_eq!(cli.max_turns, Some(3));
        match cli.command {
            Some(Commands::Web { port, ref bind, .. }) => {
                assert_eq!(port, 8080);
                assert_eq!(bind, "127.0.0.1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
