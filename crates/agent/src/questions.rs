//! Question generation for field collection
//!
//! Several phrasings per field so repeated asks don't sound scripted, plus
//! clarification prompts that quote the user's own words back.

use rand::seq::SliceRandom;

use crate::state::FieldId;

fn variations(field: FieldId) -> &'static [&'static str] {
    match field {
        FieldId::Timeline => &[
            "When are you thinking of opening your café?",
            "When are you planning to open?",
            "Do you have an opening date in mind?",
            "How soon are you planning to launch?",
        ],
        FieldId::CoffeeStyle => &[
            "What flavor profile are you looking for—bold and strong, or something lighter?",
            "Are you thinking bold and punchy, or more smooth and balanced?",
            "Do you prefer a bold roast or something lighter?",
        ],
        FieldId::Equipment => &[
            "Do you have any café equipment already, or are you starting completely from scratch?",
            "What's your equipment situation—do you have some gear, or need everything?",
            "Do you have machines and equipment sorted, or are you building from zero?",
        ],
        FieldId::Volume => &[
            "How many cups are you planning to sell daily—around 50, 100, 200, or more?",
            "What's your target daily volume? Thinking 50 cups, 100, 200+?",
            "How many cups per day are you aiming for—50, 100, 200, or higher?",
        ],
        FieldId::Name => &[
            "May I ask your name?",
            "Who am I speaking with?",
            "What should I call you?",
            "Excellent! Who am I chatting with?",
        ],
        FieldId::Phone => &[
            "What's the best number to reach you?",
            "What's a good phone number for you?",
            "How can we reach you by phone?",
        ],
        FieldId::Email => &[
            "What's your email?",
            "What's your email address?",
            "Where should we send you info?",
        ],
        FieldId::CurrentPainPoints => &[
            "Is your current supplier working well for you, or are you facing any issues?",
            "Are you happy with your current coffee supplier, or having some problems?",
            "How's your current supplier—all good, or are there issues you're dealing with?",
        ],
        FieldId::CafeCount => &[
            "How many locations are you running?",
            "How many cafés do you have?",
            "Are you running one spot or multiple locations?",
        ],
        FieldId::SupportNeeds => &[
            "Do you need any other services—training, equipment help, or consulting?",
            "Interested in additional services—staff training, machine service, marketing?",
            "Looking for extra support—barista training, technical help, business guidance?",
        ],
        FieldId::CurrentCoffeeStyle => &[
            "What coffee style do you currently serve—bold, classic, or specialty?",
            "What's your current coffee offering—dark roast, medium, or specialty blends?",
            "What kind of coffee do you offer right now—bold, classic blends, or specialty?",
        ],
        FieldId::CoffeePreference => &[
            "Interested in exploring other coffee styles, or happy with what you have?",
            "Want to try different coffee styles, or stick with your current approach?",
            "Looking to try other styles, or keeping what you serve now?",
        ],
    }
}

/// Words that signal the user genuinely has no idea yet
const UNCERTAIN_MARKERS: &[&str] =
    &["no idea", "don't know", "not sure", "haven't thought", "figuring out"];

/// Generates natural questions for collecting customer information
#[derive(Debug, Clone, Default)]
pub struct QuestionGenerator;

impl QuestionGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Natural question for a field, varied across asks
    pub fn field_question(&self, field: FieldId) -> String {
        let options = variations(field);
        options
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Can you tell me more about your café?")
            .to_string()
    }

    /// Clarification question for an unclear/vague field response
    pub fn clarification(&self, field: FieldId, user_message: &str) -> String {
        let lower = user_message.to_lowercase();
        let snippet: String = if user_message.chars().count() > 30 {
            format!("{}...", user_message.chars().take(30).collect::<String>())
        } else {
            user_message.to_string()
        };
        let use_contextual = user_message.len() <= 50
            && !["not sure", "don't know", "unclear", "maybe"]
                .iter()
                .any(|g| lower.contains(g));

        match field {
            FieldId::Timeline => {
                if use_contextual {
                    format!(
                        "When you say '{}', thinking next few months, this year, or further out?",
                        snippet
                    )
                } else {
                    "Roughly when are you planning to open—next few months, this year, or later?"
                        .to_string()
                }
            },
            FieldId::Volume => {
                if UNCERTAIN_MARKERS.iter().any(|m| lower.contains(m)) {
                    "Thinking small neighborhood café (50-100), busy office spot (200-300), \
                     or high-traffic location (400+)?"
                        .to_string()
                } else if use_contextual {
                    format!(
                        "When you say '{}', are we talking 50 cups daily, 100-200, or higher volume?",
                        snippet
                    )
                } else {
                    "Roughly how many cups of coffee daily—50, 100, 200, or more?".to_string()
                }
            },
            FieldId::CafeCount => {
                if use_contextual {
                    format!(
                        "When you say '{}', is it one location, a few spots, or multiple?",
                        snippet
                    )
                } else {
                    "How many locations—one café, a few, or multiple spots?".to_string()
                }
            },
            FieldId::CurrentPainPoints => {
                if use_contextual {
                    format!(
                        "When you say '{}', what specifically is the issue—delivery, quality, \
                         service, or pricing?",
                        snippet
                    )
                } else {
                    "What specifically is frustrating you—late deliveries, quality issues, \
                     poor service, or something else?"
                        .to_string()
                }
            },
            FieldId::SupportNeeds => {
                if use_contextual {
                    format!(
                        "When you say '{}', are you thinking training, equipment help, or \
                         business support?",
                        snippet
                    )
                } else {
                    "What kind of additional support—staff training, equipment service, or \
                     business guidance?"
                        .to_string()
                }
            },
            FieldId::Equipment => {
                "Do you have any café equipment already, or starting from scratch?".to_string()
            },
            FieldId::CoffeeStyle => {
                "What kind of vibe are you going for—bold and strong, or something lighter?"
                    .to_string()
            },
            FieldId::Name => "What's your name?".to_string(),
            FieldId::Phone => "What's the best number to reach you?".to_string(),
            FieldId::Email => "What's your email?".to_string(),
            FieldId::CoffeePreference | FieldId::CurrentCoffeeStyle => {
                "Could you tell me a bit more about that?".to_string()
            },
        }
    }
}
