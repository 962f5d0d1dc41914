//! Process manager for llama-server.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::client::llama_cpp::LlamaCppClient;
use crate::client::InferenceClient;
use crate::error::InferenceError;
use crate::{DEFAULT_PORT, DEFAULT_SERVER_BINARY};

/// How long llama-server gets to exit after SIGTERM before it is killed
const STOP_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Launch settings for a llama-server process.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Executable name (resolved through PATH) or path.
    pub binary: PathBuf,
    pub model_path: PathBuf,
    pub port: u16,
    /// Context window size.
    pub n_ctx: u32,
    pub n_threads: u32,
    pub n_batch: u32,
}

impl ServerOptions {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_SERVER_BINARY),
            model_path: model_path.into(),
            port: DEFAULT_PORT,
            n_ctx: 2048,
            n_threads: 4,
            n_batch: 16,
        }
    }

    /// Command-line arguments passed to llama-server.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--model".to_string(),
            self.model_path.display().to_string(),
            "--host".to_string(),
            "127.0.0.1".to_string(),
            "--port".to_string(),
            self.port.to_string(),
            "--ctx-size".to_string(),
            self.n_ctx.to_string(),
            "--threads".to_string(),
            self.n_threads.to_string(),
            "--batch-size".to_string(),
            self.n_batch.to_string(),
        ]
    }
}

/// Manager for the llama-server process.
pub struct LlamaCppServer {
    options: ServerOptions,
    process: Option<Child>,
}

/// A bare name like `llama-server` is looked up in PATH at spawn time.
fn is_explicit_path(binary: &Path) -> bool {
    binary.components().count() > 1 || binary.is_absolute()
}

impl LlamaCppServer {
    pub fn new(options: ServerOptions) -> Self {
        Self {
            options,
            process: None,
        }
    }

    /// Get the port this server is configured to use.
    pub fn port(&self) -> u16 {
        self.options.port
    }

    /// Check if the server binary exists. Bare names are assumed to be in PATH.
    pub fn binary_exists(&self) -> bool {
        !is_explicit_path(&self.options.binary) || self.options.binary.exists()
    }

    /// Start the llama-server process.
    pub fn start(&mut self) -> Result<(), InferenceError> {
        // Check prerequisites
        if !self.binary_exists() {
            return Err(InferenceError::ServerBinaryNotFound(
                self.options.binary.display().to_string(),
            ));
        }

        if !self.options.model_path.is_file() {
            return Err(InferenceError::ModelNotFound(
                self.options.model_path.display().to_string(),
            ));
        }

        let child = Command::new(&self.options.binary)
            .args(self.options.args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| InferenceError::ServerStartFailed(e.to_string()))?;

        self.process = Some(child);
        Ok(())
    }

    /// Wait for the server to answer `/health`.
    pub async fn wait_ready(&mut self, timeout: Duration) -> Result<(), InferenceError> {
        let client = self.client();
        let start = Instant::now();
        let check_interval = Duration::from_millis(500);

        while start.elapsed() < timeout {
            if client.check_health().await.is_ok() {
                return Ok(());
            }
            if !self.is_running() {
                return Err(InferenceError::ServerStartFailed(
                    "llama-server exited during startup".to_string(),
                ));
            }
            sleep(check_interval).await;
        }

        Err(InferenceError::ServerStartTimeout)
    }

    /// Stop the server process, gracefully if it exits within the grace period.
    pub async fn stop(&mut self) -> Result<(), InferenceError> {
        if let Some(mut child) = self.process.take() {
            // Try graceful shutdown first
            #[cfg(unix)]
            {
                // SAFETY: kill(2) on a pid we spawned and still own.
                unsafe {
                    libc::kill(child.id() as i32, libc::SIGTERM);
                }
                let start = Instant::now();
                while start.elapsed() < STOP_GRACE_PERIOD {
                    if let Ok(Some(_)) = child.try_wait() {
                        return Ok(());
                    }
                    sleep(Duration::from_millis(50)).await;
                }
            }

            force_kill(&mut child);
        }
        Ok(())
    }

    /// Check if the server process is running.
    pub fn is_running(&mut self) -> bool {
        if let Some(ref mut child) = self.process {
            match child.try_wait() {
                Ok(Some(_)) => {
                    // Process has exited
                    self.process = None;
                    false
                }
                Ok(None) => true,
                Err(_) => false,
            }
        } else {
            false
        }
    }

    /// Get a client connected to this server.
    pub fn client(&self) -> LlamaCppClient {
        LlamaCppClient::with_port(self.options.port)
    }
}

fn force_kill(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(_)) => {}
        Ok(None) | Err(_) => {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for LlamaCppServer {
    fn drop(&mut self) {
        if let Some(mut child) = self.process.take() {
            force_kill(&mut child);
        }
    }
}
