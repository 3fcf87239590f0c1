//! Decoding of the scoring model's free-text response

use crate::model::DependencyScores;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Outcome of decoding a model response
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreParse {
    /// The response was a JSON object; holds every candidate with usable values
    Parsed(HashMap<String, DependencyScores>),
    /// The response was not a JSON object at all
    Failed,
}

fn json_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?i)```json([\s\S]*?)```").expect("static regex"))
}

/// Pick the JSON text out of a response.
///
/// Prefers a fenced block tagged `json`, then the span from the first `{`
/// to the last `}`, then the raw text.
pub fn extract_json_text(text: &str) -> &str {
    if let Some(inner) = json_fence().captures(text).and_then(|c| c.get(1)) {
        return inner.as_str().trim();
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return &text[start..=end];
        }
    }

    text
}

/// Finite numbers and numeric strings are accepted; anything else is unusable
fn as_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Decode model output into scores for the given candidates.
///
/// A candidate missing from a decoded object, or whose values are not
/// numbers, is left out of the map and so stays unscored.
pub fn parse_scores(text: &str, candidates: &[String]) -> ScoreParse {
    let object = match serde_json::from_str::<Value>(extract_json_text(text)) {
        Ok(Value::Object(object)) => object,
        Ok(_) | Err(_) => return ScoreParse::Failed,
    };

    let scores = candidates
        .iter()
        .filter_map(|name| {
            let entry = object.get(name)?;
            let relevance = as_number(entry.get("relevance"))?;
            let niche = as_number(entry.get("niche"))?;
            Some((name.clone(), DependencyScores::new(relevance, niche)))
        })
        .collect();

    ScoreParse::Parsed(scores)
}
