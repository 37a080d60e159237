//! Café-supplier conversational agents
//!
//! The outbound agent qualifies leads through a multi-stage dialogue: it
//! detects customer type and flow state with pluggable LLM classifiers,
//! extracts and validates qualification fields, answers knowledge questions
//! with an escalating redirect strategy, and hands qualified leads back to
//! the caller. The inbound agent handles support conversations for signed-in
//! customers.
//!
//! State is owned: each turn receives the serialized conversation state,
//! mutates one deserialized value, and writes it back for the caller to
//! persist. No classifier failure ever fails a turn; only final response
//! generation may propagate an error.

pub mod bot;
pub mod composer;
pub mod detection;
pub mod extraction;
pub mod flow;
pub mod inbound;
pub mod prompts;
pub mod questions;
pub mod rag_support;
pub mod response;
pub mod state;
pub mod validation;

pub use bot::OutboundBot;
pub use inbound::InboundBot;
pub use state::ConversationState;

use thiserror::Error;

/// Agent errors surfaced to the caller
///
/// Classifier and extraction failures are absorbed with conservative
/// defaults; these variants cover the cases that genuinely cannot proceed.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Response generation failed: {0}")]
    ResponseGeneration(String),

    #[error("State error: {0}")]
    State(String),
}

impl From<cafe_agent_core::Error> for AgentError {
    fn from(err: cafe_agent_core::Error) -> Self {
        match err {
            cafe_agent_core::Error::State(msg) => AgentError::State(msg),
            other => AgentError::ResponseGeneration(other.to_string()),
        }
    }
}
