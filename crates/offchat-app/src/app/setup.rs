use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

use offchat_llm_api::{InferenceClient, LlamaCppClient, LlamaCppServer, ModelInfo};

use crate::cli::{Cli, Commands};
use crate::config::OffchatConfig;

/// How long a freshly spawned llama-server may take to load the model
const SERVER_READY_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the effective configuration.
///
/// Precedence: CLI flags (and their OFFCHAT_* env fallbacks) > config file > defaults
pub fn setup_from_cli(cli: &Cli) -> Result<OffchatConfig> {
    let config = OffchatConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    Ok(apply_cli_overrides(config, cli))
}

fn apply_cli_overrides(mut config: OffchatConfig, cli: &Cli) -> OffchatConfig {
    if let Some(path) = &cli.model_path {
        config.model_path = path.clone();
    }
    if let Some(url) = &cli.llama_cpp_url {
        config.llama_cpp_url = Some(url.clone());
    }
    if let Some(turns) = cli.max_turns {
        config.history_max_turns = turns;
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    if cli.stream {
        config.stream = true;
    }
    if let Some(Commands::Web { data_dir: Some(dir), .. }) = &cli.command {
        config.data_dir = dir.clone();
    }
    config
}

/// Print the model file size, as shown at startup
pub fn print_model_info(config: &OffchatConfig) {
    if config.llama_cpp_url.is_some() {
        return;
    }
    let info = ModelInfo::inspect(&config.model_path);
    if let Some(size_mb) = info.size_mb {
        println!("{}", format!("Model: {} ({} MB)", info.path.display(), size_mb).green());
    }
}

/// The inference service the chat talks to, plus the server process if we own it
pub struct InferenceBackend {
    client: Arc<dyn InferenceClient>,
    server: Option<LlamaCppServer>,
}

impl InferenceBackend {
    /// Connect to `llama_cpp_url`, or spawn llama-server for the configured model
    pub async fn start(config: &OffchatConfig, verbose: bool) -> Result<Self> {
        let log_dir = Some(config.log_dir.clone());

        if let Some(url) = &config.llama_cpp_url {
            let client = LlamaCppClient::new(url.clone()).with_request_logging(verbose, log_dir);
            if let Err(e) = client.check_health().await {
                eprintln!("{} llama.cpp server at {} is not healthy yet: {}", "⚠️".yellow(), url, e);
            }
            return Ok(Self {
                client: Arc::new(client),
                server: None,
            });
        }

        let mut server = LlamaCppServer::new(config.server_options());
        println!(
            "{}",
            format!("Starting llama-server on port {}...", server.port()).bright_black()
        );
        server.start().context("Failed to start llama-server")?;
        server
            .wait_ready(SERVER_READY_TIMEOUT)
            .await
            .context("llama-server did not become ready")?;

        let client = server.client().with_request_logging(verbose, log_dir);
        Ok(Self {
            client: Arc::new(client),
            server: Some(server),
        })
    }

    pub fn client(&self) -> Arc<dyn InferenceClient> {
        Arc::clone(&self.client)
    }

    /// Stop the spawned server, if any
    pub async fn shutdown(mut self) {
        if let Some(mut server) = self.server.take() {
            if let Err(e) = server.stop().await {
                eprintln!("{} Failed to stop llama-server: {}", "⚠️".yellow(), e);
            }
        }
    }
}
