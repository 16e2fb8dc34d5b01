//! Emotion scoring — six-category sentiment over diary text.
//!
//! The scorer asks the LLM for a JSON score object, then validates, clamps,
//! and rescales the six values to a 100-point distribution. Every failure
//! mode (network, non-2xx, unparseable reply, zero-sum scores) lands on the
//! same fixed fallback distribution: the service never fails its caller,
//! it only tags the report with where the numbers came from.

pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::llm_client::{strip_json_fences, LlmClient};

/// The six categories, in tie-break order: the first listed category wins a
/// tied argmax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionCategory {
    Joy,
    Happiness,
    Surprise,
    Sadness,
    Anger,
    Fear,
}

impl EmotionCategory {
    pub const ALL: [EmotionCategory; 6] = [
        EmotionCategory::Joy,
        EmotionCategory::Happiness,
        EmotionCategory::Surprise,
        EmotionCategory::Sadness,
        EmotionCategory::Anger,
        EmotionCategory::Fear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionCategory::Joy => "joy",
            EmotionCategory::Happiness => "happiness",
            EmotionCategory::Surprise => "surprise",
            EmotionCategory::Sadness => "sadness",
            EmotionCategory::Anger => "anger",
            EmotionCategory::Fear => "fear",
        }
    }
}

/// A score vector over the six categories. Values are integers in [0,100]
/// conceptually summing to 100 (rounding may leave the total slightly off).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionScores {
    pub joy: u32,
    pub happiness: u32,
    pub surprise: u32,
    pub sadness: u32,
    pub anger: u32,
    pub fear: u32,
}

impl EmotionScores {
    pub fn get(&self, category: EmotionCategory) -> u32 {
        match category {
            EmotionCategory::Joy => self.joy,
            EmotionCategory::Happiness => self.happiness,
            EmotionCategory::Surprise => self.surprise,
            EmotionCategory::Sadness => self.sadness,
            EmotionCategory::Anger => self.anger,
            EmotionCategory::Fear => self.fear,
        }
    }

    fn set(&mut self, category: EmotionCategory, value: u32) {
        match category {
            EmotionCategory::Joy => self.joy = value,
            EmotionCategory::Happiness => self.happiness = value,
            EmotionCategory::Surprise => self.surprise = value,
            EmotionCategory::Sadness => self.sadness = value,
            EmotionCategory::Anger => self.anger = value,
            EmotionCategory::Fear => self.fear = value,
        }
    }

    pub fn sum(&self) -> u32 {
        EmotionCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// Argmax over the vector; a tie goes to the first category in
    /// enumeration order.
    pub fn dominant(&self) -> EmotionCategory {
        let mut best = EmotionCategory::Joy;
        let mut best_value = self.get(best);
        for category in EmotionCategory::ALL.iter().skip(1) {
            let value = self.get(*category);
            if value > best_value {
                best = *category;
                best_value = value;
            }
        }
        best
    }

    /// The fixed distribution used whenever no usable scores exist.
    pub fn fallback() -> Self {
        Self {
            joy: 50,
            happiness: 30,
            surprise: 10,
            sadness: 5,
            anger: 3,
            fear: 2,
        }
    }
}

/// Where a report's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    /// Parsed and normalized from a model reply.
    Model,
    /// The fixed fallback distribution; the model reply was missing or
    /// unusable.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmotionReport {
    pub scores: EmotionScores,
    pub dominant: EmotionCategory,
    pub source: ScoreSource,
}

impl EmotionReport {
    fn fallback() -> Self {
        let scores = EmotionScores::fallback();
        Self {
            dominant: scores.dominant(),
            scores,
            source: ScoreSource::Fallback,
        }
    }
}

/// The scorer seam. Carried in `AppState` as `Arc<dyn EmotionScorer>` so the
/// diary flow is testable without a live endpoint.
#[async_trait]
pub trait EmotionScorer: Send + Sync {
    /// Scores free text. Never fails; degraded inputs produce the fallback
    /// report.
    async fn score(&self, text: &str) -> EmotionReport;
}

/// Production scorer backed by the LLM client.
pub struct LlmEmotionScorer {
    llm: LlmClient,
}

impl LlmEmotionScorer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl EmotionScorer for LlmEmotionScorer {
    async fn score(&self, text: &str) -> EmotionReport {
        let prompt = prompts::EMOTION_SCORE_PROMPT_TEMPLATE.replace("{diary_text}", text);
        match self.llm.call(&prompt, prompts::EMOTION_SCORE_SYSTEM).await {
            Ok(response) => {
                let reply = response.text();
                if reply.trim().is_empty() {
                    warn!("Emotion scoring reply had no text content; using fallback");
                    EmotionReport::fallback()
                } else {
                    report_from_reply(&reply)
                }
            }
            Err(e) => {
                warn!("Emotion scoring call failed: {e}; using fallback");
                EmotionReport::fallback()
            }
        }
    }
}

/// Fixed-answer scorer for tests and offline operation.
pub struct FixedEmotionScorer(pub EmotionReport);

#[async_trait]
impl EmotionScorer for FixedEmotionScorer {
    async fn score(&self, _text: &str) -> EmotionReport {
        self.0.clone()
    }
}

/// Turns a raw model reply into a report: extract the JSON block, validate
/// per category, rescale to 100. Unusable replies yield the fallback.
pub(crate) fn report_from_reply(reply: &str) -> EmotionReport {
    let Some(block) = extract_json_block(strip_json_fences(reply)) else {
        warn!("Emotion scoring reply contained no JSON object; using fallback");
        return EmotionReport::fallback();
    };
    let value: serde_json::Value = match serde_json::from_str(block) {
        Ok(value) => value,
        Err(e) => {
            warn!("Emotion scoring reply was not valid JSON: {e}; using fallback");
            return EmotionReport::fallback();
        }
    };

    let raw = validated_scores(&value);
    let scores = normalize(raw);
    let source = if raw.sum() == 0 {
        ScoreSource::Fallback
    } else {
        ScoreSource::Model
    };
    EmotionReport {
        dominant: scores.dominant(),
        scores,
        source,
    }
}

/// Extracts the first top-level `{...}` block, defending against the model
/// wrapping JSON in prose. Braces inside strings are not tracked; the prompt
/// requests bare integer fields so none occur in practice.
pub(crate) fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Per-category validation: a value is accepted only if it is a number in
/// [0,100]; anything else (missing, negative, oversized, non-numeric) counts
/// as 0.
fn validated_scores(value: &serde_json::Value) -> EmotionScores {
    let mut scores = EmotionScores::default();
    for category in EmotionCategory::ALL {
        let accepted = value
            .get(category.as_str())
            .and_then(|v| v.as_f64())
            .filter(|n| (0.0..=100.0).contains(n))
            .map(|n| n.round() as u32)
            .unwrap_or(0);
        scores.set(category, accepted);
    }
    scores
}

/// Rescales a validated vector so it approximates a 100-point distribution.
/// A zero sum yields the fixed fallback instead of dividing by zero; rounding
/// drift away from exactly 100 is accepted.
pub(crate) fn normalize(scores: EmotionScores) -> EmotionScores {
    let sum = scores.sum();
    if sum == 0 {
        return EmotionScores::fallback();
    }
    if sum == 100 {
        return scores;
    }
    let mut rescaled = EmotionScores::default();
    for category in EmotionCategory::ALL {
        let value = scores.get(category);
        let adjusted = (f64::from(value) * 100.0 / f64::from(sum)).round() as u32;
        rescaled.set(category, adjusted);
    }
    rescaled
}
