//! Conversation state for the support agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cafe_agent_core::{Error, Result};

/// Support-issue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Equipment,
    Order,
    Billing,
    Quality,
    Delivery,
    Training,
    Machine,
    Milk,
    Menu,
    General,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Equipment => "equipment",
            IssueCategory::Order => "order",
            IssueCategory::Billing => "billing",
            IssueCategory::Quality => "quality",
            IssueCategory::Delivery => "delivery",
            IssueCategory::Training => "training",
            IssueCategory::Machine => "machine",
            IssueCategory::Milk => "milk",
            IssueCategory::Menu => "menu",
            IssueCategory::General => "general",
        }
    }
}

fn default_created_at() -> DateTime<Utc> {
    Utc::now()
}

/// Structured conversation state for the inbound (support) agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundState {
    // Issue tracking
    pub issue_summary: Option<String>,
    pub issue_details: Option<String>,
    pub issue_category: Option<IssueCategory>,

    // Ticket management
    pub create_ticket: bool,
    pub ticket_confirmation_pending: bool,
    pub ticket_declined: bool,
    pub ticket_mentioned: bool,
    pub conversation_closed: bool,

    // Conversation flow
    pub questions_asked: u32,

    #[serde(default = "default_created_at")]
    pub created_at: DateTime<Utc>,
}

impl Default for InboundState {
    fn default() -> Self {
        Self {
            issue_summary: None,
            issue_details: None,
            issue_category: None,
            create_ticket: false,
            ticket_confirmation_pending: false,
            ticket_declined: false,
            ticket_mentioned: false,
            conversation_closed: false,
            questions_asked: 0,
            created_at: Utc::now(),
        }
    }
}

impl InboundState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(data: &serde_json::Value) -> Result<Self> {
        if data.is_null() {
            return Ok(Self::new());
        }
        serde_json::from_value(data.clone())
            .map_err(|e| Error::State(format!("Malformed support state: {}", e)))
    }

    pub fn write_to(&self, data: &mut serde_json::Value) -> Result<()> {
        let ours = serde_json::to_value(self)
            .map_err(|e| Error::State(format!("Failed to serialize state: {}", e)))?;
        if !data.is_object() {
            *data = serde_json::Value::Object(serde_json::Map::new());
        }
        if let (Some(map), serde_json::Value::Object(ours)) = (data.as_object_mut(), ours) {
            for (k, v) in ours {
                map.insert(k, v);
            }
        }
        Ok(())
    }

    /// Record or append an issue; repeated issues accumulate into one ticket
    pub fn set_issue(&mut self, summary: &str, details: &str) {
        match (&mut self.issue_summary, &mut self.issue_details) {
            (Some(existing_summary), Some(existing_details)) => {
                *existing_summary = format!("{}; {}", existing_summary, summary);
                *existing_details =
                    format!("{}\n\nAdditional issue: {}", existing_details, details);
            },
            _ => {
                self.issue_summary = Some(summary.to_string());
                self.issue_details = Some(details.to_string());
            },
        }
    }

    pub fn mark_ticket_pending(&mut self) {
        self.ticket_confirmation_pending = true;
    }

    pub fn confirm_ticket(&mut self) {
        self.create_ticket = true;
        self.ticket_confirmation_pending = false;
        self.ticket_declined = false;
    }

    pub fn decline_ticket(&mut self) {
        self.create_ticket = false;
        self.ticket_confirmation_pending = false;
        self.ticket_declined = true;
    }
}
