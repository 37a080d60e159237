//! Core traits and types for the café agent
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation turns and stage/type enums
//! - LLM message and tool-calling types
//! - Error types

pub mod conversation;
pub mod error;
pub mod llm_types;

pub use conversation::{
    last_bot_message, CustomerType, IntentStage, Turn, TurnOutcome, TurnRole,
};
pub use error::{Error, Result};
pub use llm_types::{Message, Role, ToolCall, ToolDefinition};
