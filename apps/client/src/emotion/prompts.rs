pub const EMOTION_SCORE_SYSTEM: &str = "You are an emotion analyst for an \
    elder-care diary. You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

pub const EMOTION_SCORE_PROMPT_TEMPLATE: &str = r#"Read the diary entry below and rate how strongly it expresses each of these six emotions.

Diary entry:
---
{diary_text}
---

Respond with exactly this JSON shape, using integers from 0 to 100 that together sum to 100:
{"joy": 0, "happiness": 0, "surprise": 0, "sadness": 0, "anger": 0, "fear": 0}"#;
