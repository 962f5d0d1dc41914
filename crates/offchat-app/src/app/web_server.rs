use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;

use offchat_chat::ChatExchange;

use crate::app::setup::{print_model_info, InferenceBackend};
use crate::config::OffchatConfig;
use crate::web::{WebServer, WebServerConfig};

/// Resolve `--bind` (an IP literal or a host name such as `localhost`) with `port`
async fn resolve_bind_addr(bind: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((bind, port))
        .await
        .with_context(|| format!("Invalid bind address: {}", bind))?
        .next()
        .with_context(|| format!("Bind address {} did not resolve", bind))
}

/// Run the browser chat until the server stops
pub async fn run_web_server(
    config: OffchatConfig,
    verbose: bool,
    bind: &str,
    port: u16,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    if let Err(e) = config.validate() {
        eprintln!("{} {}", "Config error:".red().bold(), e);
        return Err(e).context("Invalid configuration");
    }

    let bind_addr = resolve_bind_addr(bind, port).await?;

    print_model_info(&config);
    let backend = InferenceBackend::start(&config, verbose).await?;
    let exchange = ChatExchange::new(backend.client(), config.generation_params());

    let server = WebServer::new(
        WebServerConfig {
            bind_addr,
            data_dir: config.data_dir.clone(),
            history_max_turns: config.history_max_turns,
            static_dir,
            verbose,
        },
        exchange,
    );

    let result = server.start().await;
    backend.shutdown().await;
    result
}
