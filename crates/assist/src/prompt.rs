//! Prompts sent to the model and lenient parsing of what comes back.

use items::Category;
use serde_json::{Map, Value};

use crate::{AssistError, ClaimAssessment, ItemAnalysis};

pub const IMAGE_ANALYSIS_PROMPT: &str = r#"Analyze this image of a lost/found item.
Return a PURE JSON object (no markdown) with these keys:
{
  "title": "Short title (Max 5 words)",
  "category": "One of [Electronics, Books, ID-Cards, Clothing, Others]",
  "color": "Dominant color",
  "brand": "Brand name if visible, else null",
  "tags": ["tag1", "tag2", "tag3"],
  "description": "A concise visual description."
}"#;

/// Both texts are embedded as JSON string literals so quotes or newlines in
/// user input cannot break out of their slot in the prompt.
pub fn claim_comparison_prompt(hidden_details: &str, proof: &str) -> String {
    let truth = Value::String(hidden_details.to_string()).to_string();
    let claim = Value::String(proof.to_string()).to_string();
    format!(
        "Compare these two descriptions of an item to verify ownership.\n\
         1. REAL Hidden Details (Truth): {truth}\n\
         2. Claimant's Description: {claim}\n\n\
         Score the match from 0 to 100 based on unique identifying features \
         (scratches, stickers, specific content).\n\
         Ignore generic matches like \"It is black\".\n\n\
         Return JSON: {{ \"score\": number, \"reason\": \"string\" }}"
    )
}

/// Remove markdown code fences the model sometimes wraps JSON in.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_object(text: &str) -> Result<Map<String, Value>, AssistError> {
    let cleaned = strip_code_fences(text);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AssistError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
        Err(err) => Err(AssistError::MalformedResponse(err.to_string())),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

pub fn parse_item_analysis(text: &str) -> Result<ItemAnalysis, AssistError> {
    let map = parse_object(text)?;

    let brand = match map.get("brand") {
        Some(Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty() && !s.eq_ignore_ascii_case("null") && !s.eq_ignore_ascii_case("none"))
                .then(|| s.to_string())
        }
        _ => None,
    };

    let tags = match map.get("tags") {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    Ok(ItemAnalysis {
        title: text_field(&map, "title"),
        category: Category::parse_lenient(&text_field(&map, "category")),
        color: text_field(&map, "color"),
        brand,
        tags: items::normalize_tags(tags),
        description: text_field(&map, "description"),
    })
}

pub fn parse_claim_assessment(text: &str) -> Result<ClaimAssessment, AssistError> {
    let map = parse_object(text)?;
    let raw = match map.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|score| score.is_finite())
    .ok_or_else(|| AssistError::MalformedResponse("missing numeric score".into()))?;

    let reason = match map.get("reason") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    };

    // Floored so a fractional score never crosses the verification threshold.
    Ok(ClaimAssessment {
        score: raw.floor().clamp(0.0, 100.0) as u8,
        reason,
    })
}
