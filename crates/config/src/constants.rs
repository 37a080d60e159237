//! Centralized tuning constants

/// Conversation flow constants
pub mod flow {
    /// Asks of the same skippable field before it is auto-skipped
    pub const MAX_FIELD_ASKS: u32 = 2;

    /// Preferred-field skips before the rest are bulk-skipped
    pub const MAX_PREFERRED_SKIPS: u32 = 2;

    /// Contact refusals before the agent stops asking for contact info
    pub const MAX_CONTACT_REFUSALS: u32 = 2;

    /// History turns included in the completion prompt
    pub const HISTORY_TURNS: usize = 6;

    /// Stagger between parallel detection dispatches (upstream API pacing)
    pub const DETECTION_STAGGER_MS: u64 = 100;

    /// Window in which a refusal of the same field counts as recent
    pub const REFUSAL_RECENCY_SECS: i64 = 60;

    /// Recently-used phrases kept for repetition checks
    pub const RECENT_PHRASES_KEPT: usize = 10;
}

/// Retrieval constants
pub mod rag {
    /// Default top-k for knowledge lookups
    pub const DEFAULT_TOP_K: usize = 3;

    /// Top-k used for redirect answers during qualification
    pub const QUALIFYING_TOP_K: usize = 2;

    /// Minimum similarity score for a chunk to be used
    pub const MIN_SCORE: f32 = 0.1;

    /// Embedding dimension of the offline-built index
    pub const EMBEDDING_DIM: usize = 384;

    /// Prefix prepended to queries before embedding
    pub const QUERY_PREFIX: &str = "query: ";

    /// Prefix prepended to passages before embedding
    pub const PASSAGE_PREFIX: &str = "passage: ";
}

/// LLM call constants
pub mod llm {
    /// Default endpoint for an OpenAI-compatible API
    pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

    /// Max tokens for classification calls
    pub const DETECTION_MAX_TOKENS: usize = 200;

    /// Max tokens for extraction calls
    pub const EXTRACTION_MAX_TOKENS: usize = 300;

    /// Max tokens for final response generation
    pub const RESPONSE_MAX_TOKENS: usize = 300;
}
