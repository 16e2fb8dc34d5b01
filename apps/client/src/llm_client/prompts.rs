// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it;
// this file holds the cross-cutting fragments.

/// System prompt fragment for single-word answers to vision questions.
pub const ONE_WORD_SYSTEM: &str = "You are a precise visual assistant. \
    Answer with a single word and nothing else. \
    Do NOT include punctuation, explanations, or apologies.";
