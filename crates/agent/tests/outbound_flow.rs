//! End-to-end outbound conversation tests
//!
//! Drives `process_message` against deterministic keyword stubs standing in
//! for the LLM classifier/extractor ports, so the flow control logic is
//! exercised without a live model.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cafe_agent_agent::detection::{
    Confidence, FlowClassifier, FlowDetection, FlowState, TypeClassifier, TypeDetection,
};
use cafe_agent_agent::extraction::{ExtractionOutcome, FieldExtractor};
use cafe_agent_agent::state::FieldId;
use cafe_agent_agent::OutboundBot;
use cafe_agent_config::Settings;
use cafe_agent_core::{CustomerType, Turn};
use cafe_agent_llm::{GenerateRequest, LlmBackend, LlmError, LlmOutcome};
use cafe_agent_rag::{build_snapshot, Document, HashEmbedder, Retriever, RetrieverConfig};

/// Canned responder that records every request it sees
struct RecordingBackend {
    requests: Mutex<Vec<GenerateRequest>>,
}

impl RecordingBackend {
    fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|r| r.messages.last().map(|m| m.content.clone()))
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmBackend for RecordingBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<LlmOutcome, LlmError> {
        self.requests.lock().unwrap().push(request);
        Ok(LlmOutcome {
            text: "Sounds great! Tell me more about your plans.".to_string(),
            tool_calls: vec![],
        })
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

/// Keyword stand-in for the customer-type classifier
struct KeywordTypeClassifier;

#[async_trait]
impl TypeClassifier for KeywordTypeClassifier {
    async fn classify(&self, message: &str, _history: &[Turn]) -> Option<TypeDetection> {
        let lower = message.to_lowercase();
        if lower.contains("open a café") || lower.contains("open a cafe") {
            return Some(TypeDetection {
                customer_type: Some(CustomerType::NewCafe),
                confidence: Confidence::High,
                reasoning: "explicit opening intent".to_string(),
                ..Default::default()
            });
        }
        if lower.contains("own a café") || lower.contains("my café") {
            return Some(TypeDetection {
                customer_type: Some(CustomerType::ExistingCafe),
                confidence: Confidence::High,
                reasoning: "ownership stated".to_string(),
                ..Default::default()
            });
        }
        if lower.contains("thinking of opening") {
            return Some(TypeDetection {
                customer_type: Some(CustomerType::NewCafe),
                confidence: Confidence::Medium,
                reasoning: "implied interest".to_string(),
                ..Default::default()
            });
        }
        Some(TypeDetection::default())
    }
}

/// Keyword stand-in for the flow-state classifier
struct KeywordFlowClassifier;

#[async_trait]
impl FlowClassifier for KeywordFlowClassifier {
    async fn classify(
        &self,
        message: &str,
        _history: &[Turn],
        _current_field: Option<FieldId>,
    ) -> FlowDetection {
        let lower = message.to_lowercase();
        if lower.contains("don't want to give") || lower.contains("not comfortable sharing") {
            return FlowDetection {
                state: FlowState::RefusesContactInfo,
                reasoning: "declined contact info".to_string(),
            };
        }
        if lower.contains("stop") || lower.contains("not interested") {
            return FlowDetection {
                state: FlowState::WantsToExit,
                reasoning: "wants out".to_string(),
            };
        }
        if lower.starts_with("what") || lower.starts_with("do you") {
            return FlowDetection {
                state: FlowState::AskingQuestion,
                reasoning: "asked a question".to_string(),
            };
        }
        FlowDetection::continuing("cooperating")
    }
}

/// Keyword stand-in for the field extractor
struct KeywordExtractor;

#[async_trait]
impl FieldExtractor for KeywordExtractor {
    async fn extract(
        &self,
        message: &str,
        customer_type: Option<CustomerType>,
        _history: &[Turn],
        _current_coffee_style_known: bool,
    ) -> ExtractionOutcome {
        let lower = message.to_lowercase();
        let mut fields = Vec::new();

        if lower.contains("i'm sam") || lower.trim() == "sam" {
            fields.push((FieldId::Name, "Sam".to_string()));
        }
        if let Some(email) = message.split_whitespace().find(|w| w.contains('@')) {
            fields.push((FieldId::Email, email.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '@' && c != '.').to_string()));
        }
        let digit_count = message.chars().filter(|c| c.is_ascii_digit()).count();
        if digit_count >= 10 && !message.contains('@') {
            fields.push((FieldId::Phone, message.trim().to_string()));
        }

        if lower.contains("3 months") {
            fields.push((FieldId::Timeline, "in_3_months".to_string()));
        }
        if lower.contains("bold") {
            fields.push((FieldId::CoffeeStyle, "bold_coffee".to_string()));
        }
        if lower.contains("no equipment") {
            fields.push((FieldId::Equipment, "starting_from_scratch".to_string()));
        }
        if lower.contains("200 cups") {
            fields.push((FieldId::Volume, "200_cups_daily".to_string()));
        }

        if customer_type.is_none() {
            fields.retain(|(f, _)| f.is_contact());
        }

        ExtractionOutcome {
            fields,
            ..Default::default()
        }
    }
}

fn test_retriever() -> Arc<Retriever> {
    let embedder = Arc::new(HashEmbedder::default());
    let docs = vec![
        Document::new("1", "We offer seven signature blends from bold to balanced")
            .with_source("blends.md"),
        Document::new("2", "Commercial espresso machines, grinders, and setup help")
            .with_source("equipment.md"),
    ];
    let index = build_snapshot(docs, embedder.as_ref())
        .unwrap()
        .into_index()
        .unwrap();
    Arc::new(Retriever::new(index, embedder, RetrieverConfig::default()))
}

fn test_bot() -> (OutboundBot, Arc<RecordingBackend>) {
    let backend = Arc::new(RecordingBackend::new());
    let mut settings = Settings::new();
    settings.agent.detection_stagger_ms = 1;

    let bot = OutboundBot::with_components(
        backend.clone(),
        test_retriever(),
        &settings,
        Arc::new(KeywordTypeClassifier),
        Arc::new(KeywordFlowClassifier),
        Arc::new(KeywordExtractor),
    );
    (bot, backend)
}

#[tokio::test]
async fn test_full_qualification_journey() {
    let (bot, _backend) = test_bot();
    let mut data = serde_json::json!({});
    let mut history: Vec<Turn> = Vec::new();

    // Turn 1: explicit intent with several fields in one message
    let message = "I want to open a café in 3 months, bold coffee, no equipment, 200 cups a day";
    let outcome = bot.process_message(message, &history, &mut data, "US").await.unwrap();
    assert!(!outcome.should_end);
    assert_eq!(data["customer_type"], "new_cafe");
    assert_eq!(data["intent_stage"], "qualifying");
    assert_eq!(data["timeline"], "in_3_months");
    assert_eq!(data["coffee_style"], "bold_coffee");
    assert_eq!(data["equipment"], "starting_from_scratch");
    assert_eq!(data["volume"], "200_cups_daily");
    history.push(Turn::user(message));
    history.push(Turn::bot(&outcome.response));

    // Turn 2: name
    let outcome = bot.process_message("I'm Sam", &history, &mut data, "US").await.unwrap();
    assert_eq!(data["name"], "Sam");
    history.push(Turn::user("I'm Sam"));
    history.push(Turn::bot(&outcome.response));

    // Turn 3: bare 10-digit phone gets a confirmation prompt, not storage
    let outcome = bot
        .process_message("555-123-4567", &history, &mut data, "US")
        .await
        .unwrap();
    assert!(outcome.response.contains("+1 555 123 4567"));
    assert!(data["phone"].is_null());
    history.push(Turn::user("555-123-4567"));
    history.push(Turn::bot(&outcome.response));

    // Turn 4: confirming stores the phone and asks for an email backup
    let outcome = bot.process_message("yes", &history, &mut data, "US").await.unwrap();
    assert_eq!(data["phone"], "+15551234567");
    assert!(outcome.response.to_lowercase().contains("email"));
    history.push(Turn::user("yes"));
    history.push(Turn::bot(&outcome.response));

    // Turn 5: email completes the qualification
    let outcome = bot
        .process_message("sam@gmail.com", &history, &mut data, "US")
        .await
        .unwrap();
    assert_eq!(data["email"], "sam@gmail.com");
    assert_eq!(data["is_qualified"], true);
    assert_eq!(data["intent_stage"], "qualified");
    assert!(outcome.response.contains("Sam"));
    history.push(Turn::user("sam@gmail.com"));
    history.push(Turn::bot(&outcome.response));

    // Turn 6: acknowledgment after qualification closes the conversation
    let outcome = bot.process_message("ok thanks", &history, &mut data, "US").await.unwrap();
    assert!(outcome.should_end);
}

#[tokio::test]
async fn test_phone_refusal_offers_email() {
    let (bot, _backend) = test_bot();
    let mut data = serde_json::json!({
        "customer_type": "new_cafe",
        "intent_stage": "qualifying",
        "name": "Sam",
        "timeline": "in_3_months",
        "coffee_style": "bold_coffee",
        "equipment": "starting_from_scratch",
        "volume": "200_cups_daily"
    });
    let history = vec![Turn::bot("What's the best number to reach you?")];

    let outcome = bot
        .process_message("I don't want to give my number", &history, &mut data, "US")
        .await
        .unwrap();

    assert_eq!(data["phone"], "user_declined");
    assert_eq!(data["contact_refusal_count"], 1);
    assert!(outcome.response.to_lowercase().contains("email"));
    assert!(!outcome.should_end);
}

#[tokio::test]
async fn test_rag_question_during_qualification_redirects() {
    let (bot, backend) = test_bot();
    let mut data = serde_json::json!({
        "customer_type": "new_cafe",
        "intent_stage": "qualifying",
        "name": "Sam"
    });
    let history = vec![Turn::bot("When are you thinking of opening your café?")];

    let outcome = bot
        .process_message("What blends do you offer?", &history, &mut data, "US")
        .await
        .unwrap();

    assert_eq!(data["rag_questions_count"], 1);
    assert!(!outcome.response.is_empty());
    // The generation prompt carried both the knowledge context and a redirect
    let prompt = backend.last_prompt();
    assert!(prompt.contains("Knowledge base context"));
    assert!(prompt.contains("redirect"));
}

#[tokio::test]
async fn test_goodbye_ends_immediately() {
    let (bot, _backend) = test_bot();
    let mut data = serde_json::json!({});

    let outcome = bot.process_message("bye!", &[], &mut data, "US").await.unwrap();
    assert!(outcome.should_end);
    assert_eq!(outcome.response, "Goodbye! Have a nice day!");
}

#[tokio::test]
async fn test_human_connection_request_enters_contact_flow() {
    let (bot, _backend) = test_bot();
    let mut data = serde_json::json!({});

    let outcome = bot
        .process_message("Can I talk to a real person?", &[], &mut data, "US")
        .await
        .unwrap();

    assert_eq!(data["human_connection_flow_stage"], "awaiting_method");
    assert!(outcome.response.to_lowercase().contains("phone or email"));
}

#[tokio::test]
async fn test_wants_to_exit_resets_to_exploration() {
    let (bot, _backend) = test_bot();
    let mut data = serde_json::json!({
        "customer_type": "new_cafe",
        "intent_stage": "qualifying",
        "name": "Sam",
        "timeline": "in_3_months"
    });

    let outcome = bot
        .process_message("stop, not interested anymore", &[], &mut data, "US")
        .await
        .unwrap();

    assert_eq!(data["intent_stage"], "exploring");
    // No data is lost on the rewind
    assert_eq!(data["name"], "Sam");
    assert_eq!(data["timeline"], "in_3_months");
    assert!(!outcome.should_end);
}

#[tokio::test]
async fn test_medium_confidence_waits_for_commitment_signal() {
    let (bot, _backend) = test_bot();
    let mut data = serde_json::json!({});
    let mut history: Vec<Turn> = Vec::new();

    // Medium confidence parks the user in interest_detected
    let message = "I'm thinking of opening a coffee place someday";
    let outcome = bot.process_message(message, &history, &mut data, "US").await.unwrap();
    assert_eq!(data["intent_stage"], "interest_detected");
    history.push(Turn::user(message));
    history.push(Turn::bot(&outcome.response));

    // A commitment signal (timeline) upgrades the stage
    bot.process_message(
        "probably in 3 months actually",
        &history,
        &mut data,
        "US",
    )
    .await
    .unwrap();
    assert_eq!(data["intent_stage"], "intent_confirmed");
    assert_eq!(data["timeline"], "in_3_months");
}
