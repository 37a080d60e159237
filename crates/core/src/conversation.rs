//! Conversation types: turns, customer types, and intent stages

use serde::{Deserialize, Serialize};

/// Who spoke in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Customer message
    User,
    /// Agent reply
    Bot,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Bot => "bot",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create a bot turn
    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Bot, content)
    }

    /// Get word count
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Most recent bot turn in the history, if any
pub fn last_bot_message(history: &[Turn]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|t| t.role == TurnRole::Bot)
        .map(|t| t.content.as_str())
}

/// Customer type detected during the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    /// Planning to open a new café
    NewCafe,
    /// Already owns/operates one or more cafés
    ExistingCafe,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::NewCafe => "new_cafe",
            CustomerType::ExistingCafe => "existing_cafe",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new_cafe" => Some(CustomerType::NewCafe),
            "existing_cafe" => Some(CustomerType::ExistingCafe),
            _ => None,
        }
    }
}

impl std::fmt::Display for CustomerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lead-qualification stage
///
/// Mostly-forward progression; `InterestDetected` -> `IntentConfirmed` is the
/// only upgrade path and no stage regresses automatically except an explicit
/// reset to exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentStage {
    /// Asking questions, no commitment yet
    #[default]
    Exploring,
    /// Interest shown but not committed (medium-confidence detection)
    InterestDetected,
    /// Clear intent detected, qualification can begin
    IntentConfirmed,
    /// Actively collecting qualification fields
    Qualifying,
    /// All required info collected
    Qualified,
}

impl IntentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStage::Exploring => "exploring",
            IntentStage::InterestDetected => "interest_detected",
            IntentStage::IntentConfirmed => "intent_confirmed",
            IntentStage::Qualifying => "qualifying",
            IntentStage::Qualified => "qualified",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "exploring" => Some(IntentStage::Exploring),
            "interest_detected" => Some(IntentStage::InterestDetected),
            "intent_confirmed" => Some(IntentStage::IntentConfirmed),
            "qualifying" => Some(IntentStage::Qualifying),
            "qualified" => Some(IntentStage::Qualified),
            _ => None,
        }
    }

    /// Whether field collection is allowed in this stage
    pub fn can_start_qualification(&self) -> bool {
        matches!(self, IntentStage::IntentConfirmed | IntentStage::Qualifying)
    }
}

impl std::fmt::Display for IntentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of processing one user message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Outward-facing reply text
    pub response: String,
    /// Whether the conversation should end after this turn
    pub should_end: bool,
}

impl TurnOutcome {
    /// Reply and keep the conversation open
    pub fn reply(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            should_end: false,
        }
    }

    /// Reply and close the conversation
    pub fn end(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            should_end: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_progression() {
        assert!(!IntentStage::Exploring.can_start_qualification());
        assert!(!IntentStage::InterestDetected.can_start_qualification());
        assert!(IntentStage::IntentConfirmed.can_start_qualification());
        assert!(IntentStage::Qualifying.can_start_qualification());
        assert!(!IntentStage::Qualified.can_start_qualification());
    }

    #[test]
    fn test_stage_round_trip() {
        for stage in [
            IntentStage::Exploring,
            IntentStage::InterestDetected,
            IntentStage::IntentConfirmed,
            IntentStage::Qualifying,
            IntentStage::Qualified,
        ] {
            assert_eq!(IntentStage::from_str(stage.as_str()), Some(stage));
        }
        assert_eq!(IntentStage::from_str("unknown"), None);
    }

    #[test]
    fn test_last_bot_message() {
        let history = vec![
            Turn::user("hi"),
            Turn::bot("Hello! How can I help?"),
            Turn::user("tell me about your blends"),
        ];
        assert_eq!(last_bot_message(&history), Some("Hello! How can I help?"));
        assert_eq!(last_bot_message(&[]), None);
    }

    #[test]
    fn test_turn_outcome() {
        let open = TurnOutcome::reply("hi");
        assert!(!open.should_end);
        let closed = TurnOutcome::end("bye");
        assert!(closed.should_end);
    }
}
