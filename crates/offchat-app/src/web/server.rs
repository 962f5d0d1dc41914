use anyhow::{Context, Result};
use axum::Router;
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

use offchat_chat::ChatExchange;
use offchat_store::{ChatStore, JsonFileStore};

use crate::web::{routes, session_manager::SessionRegistry};

/// Web server configuration
pub struct WebServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub history_max_turns: usize,
    pub static_dir: Option<PathBuf>,
    pub verbose: bool,
}

/// Web server instance
pub struct WebServer {
    config: WebServerConfig,
    exchange: ChatExchange,
    sessions: Arc<SessionRegistry>,
}

impl WebServer {
    /// Create a new web server
    pub fn new(config: WebServerConfig, exchange: ChatExchange) -> Self {
        let sessions = Arc::new(SessionRegistry::new(config.history_max_turns));
        Self {
            config,
            exchange,
            sessions,
        }
    }

    /// Open the data directory. The server still runs without it; account
    /// routes then answer with a database error.
    async fn open_store(&self) -> Option<Arc<dyn ChatStore>> {
        match JsonFileStore::open(&self.config.data_dir).await {
            Ok(store) => {
                println!(
                    "{}",
                    format!("✅ Data store ready: {}", self.config.data_dir.display()).green()
                );
                Some(Arc::new(store))
            }
            Err(e) => {
                eprintln!(
                    "{} Data store unavailable at {}: {}",
                    "⚠️".yellow(),
                    self.config.data_dir.display(),
                    e
                );
                None
            }
        }
    }

    /// Build the router for this server
    pub async fn router(&self) -> Router {
        let store = self.open_store().await;
        let state = routes::AppState::new(
            self.sessions.clone(),
            self.exchange.clone(),
            store,
            self.config.verbose,
        );

        let mut app = routes::create_router(state);

        // Serve static files if static_dir is provided
        if let Some(static_dir) = &self.config.static_dir {
            if static_dir.exists() {
                println!("Serving static files from: {}", static_dir.display());
                app = app.nest_service("/static", ServeDir::new(static_dir));
            }
        }

        app
    }

    /// Start the web server
    pub async fn start(self) -> Result<()> {
        let app = self.router().await;

        println!("🌐 Web server starting on http://{}", self.config.bind_addr);
        println!("   Login page: http://{}/login", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.bind_addr))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

/// Resolves on Ctrl-C so the caller can stop llama-server afterwards
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => println!("\n{}", "Shutting down web server...".yellow()),
        // No signal handler: run until killed
        Err(_) => std::future::pending::<()>().await,
    }
}
