//! offchat application library
//!
//! Terminal chat, browser chat and the system check, wired on top of the
//! history, inference and store crates.

pub mod app;
pub mod cli;
pub mod config;
pub mod web;

pub use cli::{Cli, Commands};
pub use config::{ConfigError, OffchatConfig};
