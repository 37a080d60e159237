//! Inbound bot orchestrator

use std::sync::Arc;

use serde::Deserialize;

use cafe_agent_config::constants::{llm, rag};
use cafe_agent_core::{Message, ToolDefinition, Turn, TurnOutcome, TurnRole};
use cafe_agent_llm::{GenerateRequest, LlmBackend, ToolBuilder};
use cafe_agent_rag::Retriever;

use crate::prompts;
use crate::AgentError;

use super::state::{InboundState, IssueCategory};

const GOODBYE_PHRASES: &[&str] = &[
    "bye",
    "goodbye",
    "see you",
    "talk later",
    "that's all",
    "that's it",
    "nothing else",
    "all set",
    "we're good",
    "i'm good",
    "thanks bye",
    "thank you bye",
];

const ENDING_PHRASES: &[&str] = &[
    "thanks",
    "thank you",
    "perfect",
    "great",
    "awesome",
    "sounds good",
    "got it",
    "ok thanks",
    "okay thanks",
];

/// Signed-in customer profile, supplied by the caller's auth layer
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub name: Option<String>,
    pub email: Option<String>,
}

fn issue_tool() -> ToolDefinition {
    ToolBuilder::new(
        "report_support_issue",
        "Capture a support issue the customer is describing. Only call this when the \
         message actually reports a problem, not for general questions.",
    )
    .param(
        "is_issue",
        "boolean",
        "True when the customer is reporting a problem needing follow-up",
        true,
    )
    .param("summary", "string", "Brief summary of the issue", false)
    .param(
        "details",
        "string",
        "Detailed description including symptoms and impact",
        false,
    )
    .param(
        "category",
        "string",
        "Issue category; 'machine' covers pressure/temperature/steam-wand faults, \
         'order' covers purchasing and stock-outs, 'quality' covers taste problems",
        false,
    )
    .string_enum(
        "category",
        &[
            "equipment", "order", "billing", "quality", "delivery", "training", "machine",
            "milk", "menu", "general",
        ],
    )
    .build()
}

#[derive(Debug, Deserialize)]
struct IssueArgs {
    is_issue: bool,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    category: Option<IssueCategory>,
}

/// Main orchestrator for the inbound (customer-support) agent
pub struct InboundBot {
    backend: Arc<dyn LlmBackend>,
    retriever: Arc<Retriever>,
    issue_tool: ToolDefinition,
}

impl InboundBot {
    pub fn new(backend: Arc<dyn LlmBackend>, retriever: Arc<Retriever>) -> Self {
        Self {
            backend,
            retriever,
            issue_tool: issue_tool(),
        }
    }

    /// Process one support message
    pub async fn process_message(
        &self,
        user_message: &str,
        history: &[Turn],
        user: &UserProfile,
        conversation_data: &mut serde_json::Value,
    ) -> Result<TurnOutcome, AgentError> {
        let mut state = InboundState::from_value(conversation_data)?;
        let result = self.run_turn(user_message, history, user, &mut state).await;
        state.write_to(conversation_data)?;
        result
    }

    async fn run_turn(
        &self,
        user_message: &str,
        history: &[Turn],
        user: &UserProfile,
        state: &mut InboundState,
    ) -> Result<TurnOutcome, AgentError> {
        let lower = user_message.trim().to_lowercase();
        let word_count = lower.split_whitespace().count();

        if GOODBYE_PHRASES.iter().any(|p| lower.contains(p)) {
            state.conversation_closed = true;
            let farewell = if lower.contains("thank") {
                "You're very welcome! Have a great day, and reach out anytime."
            } else {
                "Thanks for chatting with us! Have a great day."
            };
            return Ok(TurnOutcome::end(farewell));
        }

        // Short acknowledgment after we've already helped: close gracefully
        if word_count <= 3
            && (state.ticket_mentioned || state.create_ticket)
            && ENDING_PHRASES.iter().any(|p| lower.contains(p))
        {
            state.conversation_closed = true;
            return Ok(TurnOutcome::end("You're welcome! Have a great day!"));
        }

        // Direct questions about the signed-in profile
        if lower.contains("my name") && lower.contains("what") {
            let reply = match user.name.as_deref() {
                Some(name) => format!("You're signed in as {}.", name),
                None => "I don't see a name on your account, sorry!".to_string(),
            };
            return Ok(TurnOutcome::reply(reply));
        }

        if state.ticket_confirmation_pending {
            if let Some(outcome) = self.handle_ticket_confirmation(&lower, state) {
                return Ok(outcome);
            }
        }

        if let Some(outcome) = self.capture_issue(user_message, history, state).await {
            return Ok(outcome);
        }

        self.answer_question(user_message, history, user, state).await
    }

    fn handle_ticket_confirmation(
        &self,
        lower: &str,
        state: &mut InboundState,
    ) -> Option<TurnOutcome> {
        let confirms = ["yes", "yeah", "yep", "please", "sure", "ok", "okay", "create"]
            .iter()
            .any(|w| lower.contains(w));
        let declines = ["no", "nope", "nah", "don't", "not now"]
            .iter()
            .any(|w| lower.contains(w));

        if declines {
            state.decline_ticket();
            return Some(TurnOutcome::reply(
                "No problem, I won't raise a ticket. Is there anything else I can help with?",
            ));
        }
        if confirms {
            state.confirm_ticket();
            state.ticket_mentioned = true;
            let summary = state.issue_summary.clone().unwrap_or_default();
            tracing::info!(%summary, "Support ticket confirmed");
            return Some(TurnOutcome::reply(format!(
                "Done! I've raised a ticket for: {}. Our team will follow up with you \
                 shortly. Anything else I can help with?",
                summary
            )));
        }
        None
    }

    async fn capture_issue(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut InboundState,
    ) -> Option<TurnOutcome> {
        let mut context = String::new();
        for turn in history.iter().rev().take(2).rev() {
            let speaker = match turn.role {
                TurnRole::User => "Customer",
                TurnRole::Bot => "Support",
            };
            context.push_str(&format!("{}: {}\n", speaker, turn.content));
        }

        let prompt = format!(
            "Decide whether this customer message reports a support issue.\n\n\
             Recent conversation:\n{context}\n\
             Customer message: \"{user_message}\"\n\n\
             General questions ('what blends do you have', 'how does delivery work') are \
             NOT issues. Problems with orders, deliveries, billing, machines, milk, or \
             coffee quality ARE issues.",
        );

        let request = GenerateRequest::from_prompt(prompt)
            .with_forced_tool(self.issue_tool.clone())
            .with_temperature(0.0)
            .with_max_tokens(llm::EXTRACTION_MAX_TOKENS);

        let outcome = match self.backend.generate(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Issue extraction failed");
                return None;
            },
        };
        let args: IssueArgs = outcome
            .tool_call("report_support_issue")?
            .parse_arguments()
            .ok()?;

        if !args.is_issue {
            return None;
        }

        let summary = args.summary.unwrap_or_else(|| user_message.to_string());
        let details = args.details.unwrap_or_else(|| user_message.to_string());
        state.set_issue(&summary, &details);
        if let Some(category) = args.category {
            state.issue_category = Some(category);
        }
        tracing::info!(%summary, category = ?state.issue_category, "Support issue captured");

        if state.create_ticket {
            // Ticket already open; the new issue was appended to it
            return Some(TurnOutcome::reply(
                "Thanks, I've added that to your open ticket so the team sees both \
                 issues together. Anything else?",
            ));
        }

        state.mark_ticket_pending();
        Some(TurnOutcome::reply(format!(
            "I'm sorry you're dealing with that. I can raise a ticket for our team to \
             look into \"{}\"—want me to do that?",
            summary
        )))
    }

    async fn answer_question(
        &self,
        user_message: &str,
        history: &[Turn],
        user: &UserProfile,
        state: &mut InboundState,
    ) -> Result<TurnOutcome, AgentError> {
        state.questions_asked += 1;

        let rag_context = match self.retriever.retrieve(user_message, rag::DEFAULT_TOP_K) {
            Ok(hits) if !hits.is_empty() => self.retriever.format_context(&hits),
            _ => "No specific information found in the knowledge base.".to_string(),
        };

        let mut profile = String::new();
        if let Some(name) = user.name.as_deref() {
            profile.push_str(&format!("Customer name: {}\n", name));
        }
        if let Some(email) = user.email.as_deref() {
            profile.push_str(&format!("Customer email: {}\n", email));
        }

        let context_message = format!(
            "{profile}\nKnowledge base context:\n{rag_context}\n\nCustomer: {user_message}",
        );

        let mut messages: Vec<Message> = history
            .iter()
            .rev()
            .take(6)
            .rev()
            .map(|turn| match turn.role {
                TurnRole::User => Message::user(turn.content.clone()),
                TurnRole::Bot => Message::assistant(turn.content.clone()),
            })
            .collect();
        messages.push(Message::user(context_message));

        let request = GenerateRequest::new(messages)
            .with_system(prompts::SUPPORT_INSTRUCTION)
            .with_max_tokens(llm::RESPONSE_MAX_TOKENS);

        let outcome = self
            .backend
            .generate(request)
            .await
            .map_err(|e| AgentError::ResponseGeneration(e.to_string()))?;

        Ok(TurnOutcome::reply(outcome.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cafe_agent_llm::{LlmError, LlmOutcome};
    use cafe_agent_rag::{build_snapshot, Document, HashEmbedder, RetrieverConfig};

    struct ScriptedBackend {
        issue: Option<serde_json::Value>,
        reply: String,
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(&self, request: GenerateRequest) -> Result<LlmOutcome, LlmError> {
            if request.forced_tool.as_deref() == Some("report_support_issue") {
                let arguments = self
                    .issue
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({"is_issue": false}));
                return Ok(LlmOutcome {
                    text: String::new(),
                    tool_calls: vec![cafe_agent_core::ToolCall {
                        id: "call_1".to_string(),
                        name: "report_support_issue".to_string(),
                        arguments,
                    }],
                });
            }
            Ok(LlmOutcome {
                text: self.reply.clone(),
                tool_calls: vec![],
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn retriever() -> Arc<Retriever> {
        let embedder = Arc::new(HashEmbedder::default());
        let docs = vec![Document::new("1", "Deliveries go out every Tuesday and Friday")];
        let index = build_snapshot(docs, embedder.as_ref())
            .unwrap()
            .into_index()
            .unwrap();
        Arc::new(Retriever::new(index, embedder, RetrieverConfig::default()))
    }

    fn bot(issue: Option<serde_json::Value>, reply: &str) -> InboundBot {
        InboundBot::new(
            Arc::new(ScriptedBackend {
                issue,
                reply: reply.to_string(),
            }),
            retriever(),
        )
    }

    #[tokio::test]
    async fn test_goodbye_closes_conversation() {
        let bot = bot(None, "hi");
        let mut data = serde_json::Value::Null;
        let outcome = bot
            .process_message("thanks, bye!", &[], &UserProfile::default(), &mut data)
            .await
            .unwrap();
        assert!(outcome.should_end);
        assert_eq!(data["conversation_closed"], true);
    }

    #[tokio::test]
    async fn test_issue_offers_ticket_then_confirms() {
        let bot = bot(
            Some(serde_json::json!({
                "is_issue": true,
                "summary": "grinder jamming",
                "details": "the grinder jams every morning",
                "category": "equipment"
            })),
            "answer",
        );
        let user = UserProfile {
            name: Some("Ana".to_string()),
            email: Some("ana@cafe.com".to_string()),
        };

        let mut data = serde_json::Value::Null;
        let outcome = bot
            .process_message("our grinder keeps jamming", &[], &user, &mut data)
            .await
            .unwrap();
        assert!(outcome.response.contains("grinder jamming"));
        assert_eq!(data["ticket_confirmation_pending"], true);

        let outcome = bot
            .process_message("yes please", &[], &user, &mut data)
            .await
            .unwrap();
        assert!(outcome.response.contains("raised a ticket"));
        assert_eq!(data["create_ticket"], true);
    }

    #[tokio::test]
    async fn test_question_answered_from_knowledge() {
        let bot = bot(None, "Deliveries go out every Tuesday and Friday.");
        let mut data = serde_json::Value::Null;
        let outcome = bot
            .process_message(
                "when do deliveries go out?",
                &[],
                &UserProfile::default(),
                &mut data,
            )
            .await
            .unwrap();
        assert!(outcome.response.contains("Tuesday"));
        assert_eq!(data["questions_asked"], 1);
    }

    #[tokio::test]
    async fn test_profile_name_question() {
        let bot = bot(None, "x");
        let user = UserProfile {
            name: Some("Ana".to_string()),
            email: None,
        };
        let mut data = serde_json::Value::Null;
        let outcome = bot
            .process_message("what's my name?", &[], &user, &mut data)
            .await
            .unwrap();
        assert!(outcome.response.contains("Ana"));
    }
}
