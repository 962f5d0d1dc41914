//! # offchat-llm-api
//!
//! Access to a local llama.cpp inference server:
//! - `InferenceClient`: the prompt-in, text-out interface the chat layer talks to
//! - `LlamaCppClient`: HTTP client for llama-server's native `/completion` endpoint
//! - `LlamaCppServer`: launches and supervises a `llama-server` process for a GGUF model
//!
//! ## Example
//!
//! ```rust,no_run
//! use offchat_llm_api::{GenerationParams, InferenceClient, LlamaCppClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = LlamaCppClient::new("http://127.0.0.1:11435");
//!     let text = client
//!         .generate("### Human: Hello!\n### Assistant:", &GenerationParams::default())
//!         .await?;
//!     println!("{}", text);
//!     Ok(())
//! }
//! ```

pub mod client;
mod error;
pub mod model;
pub mod server;

pub use client::{llama_cpp::LlamaCppClient, GenerationParams, InferenceClient, TextStream};
pub use error::InferenceError;
pub use model::ModelInfo;
pub use server::{LlamaCppServer, ServerOptions};

/// Default port for the local llama-server instance.
pub const DEFAULT_PORT: u16 = 11435;

/// Default llama-server executable, resolved through PATH.
pub const DEFAULT_SERVER_BINARY: &str = "llama-server";
