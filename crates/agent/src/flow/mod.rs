//! Conversation flow: the contact sub-flow, the per-step controller, the
//! extraction pipeline, and the qualification rules

pub mod contact;
pub mod controller;
pub mod pipeline;
pub mod qualify;

pub use contact::ContactFlow;
pub use controller::FlowController;
pub use pipeline::ExtractionPipeline;
pub use qualify::{QualificationOutcome, QualifiedLead, Qualifier};
