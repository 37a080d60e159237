//! Inbound customer-support agent
//!
//! Support conversations for signed-in café partners: issue capture, ticket
//! confirmation, and RAG-grounded answers with the customer's profile on
//! hand.

pub mod bot;
pub mod state;

pub use bot::{InboundBot, UserProfile};
pub use state::{InboundState, IssueCategory};
