//! LLM classifiers behind pluggable ports
//!
//! Each detector is a trait with one classify method, so the flow controller
//! can be unit-tested against deterministic stubs instead of a live model.

pub mod flow_detector;
pub mod question;
pub mod type_detector;

pub use flow_detector::LlmFlowDetector;
pub use question::{LlmQuestionIntent, QuestionIntent, QuestionRules};
pub use type_detector::LlmTypeDetector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cafe_agent_core::{CustomerType, Turn};

use crate::state::FieldId;

/// Classifier confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

/// Contact info opportunistically mentioned during type detection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Customer-type detection result
#[derive(Debug, Clone, Default)]
pub struct TypeDetection {
    /// Detected type; `None` means unclear
    pub customer_type: Option<CustomerType>,
    pub confidence: Confidence,
    pub reasoning: String,
    /// User wants to place an order / request samples
    pub wants_to_place_order: bool,
    /// User wants to speak with a real person
    pub wants_to_talk_to_person: bool,
    pub contact_info: ContactInfo,
}

/// Customer-type classification port
#[async_trait]
pub trait TypeClassifier: Send + Sync {
    /// Classify the customer type; `None` when the classifier itself failed
    async fn classify(&self, message: &str, history: &[Turn]) -> Option<TypeDetection>;
}

/// User's flow state during qualification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Cooperating, providing information normally
    #[default]
    Continuing,
    /// Wants to stop the qualification entirely
    WantsToExit,
    /// Refusing to provide phone/email specifically
    RefusesContactInfo,
    /// Asking a question instead of answering
    AskingQuestion,
}

/// Flow-state detection result
#[derive(Debug, Clone, Default)]
pub struct FlowDetection {
    pub state: FlowState,
    pub reasoning: String,
}

impl FlowDetection {
    /// Conservative default when detection fails
    pub fn continuing(reasoning: impl Into<String>) -> Self {
        Self {
            state: FlowState::Continuing,
            reasoning: reasoning.into(),
        }
    }
}

/// Flow-state classification port
///
/// Conditioned on what the bot just asked so "no" disambiguates between
/// declining contact info and a valid negative answer.
#[async_trait]
pub trait FlowClassifier: Send + Sync {
    async fn classify(
        &self,
        message: &str,
        history: &[Turn],
        current_field: Option<FieldId>,
    ) -> FlowDetection;
}
