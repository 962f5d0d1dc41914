//! Conversation management for offchat
//!
//! This crate provides the bounded chat history, prompt rendering,
//! and the exchange step that ties history to the inference service.

pub mod exchange;
pub mod history;

// Re-export commonly used types
pub use exchange::ChatExchange;
pub use history::ConversationManager;
