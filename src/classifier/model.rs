use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::ClassifierError;
use crate::constants::UNKNOWN_LABEL;

/// Label and confidence produced by the remote model.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Fields of one prediction object. Every field is optional on the wire.
type Prediction = Map<String, Value>;

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    #[serde(default)]
    result: Option<Value>,
}

fn into_classification(prediction: &Prediction) -> Classification {
    let label = ["name", "label"]
        .iter()
        .find_map(|key| prediction.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_LABEL)
        .to_string();

    let confidence = prediction.get("confidence").map_or(0.0, parse_confidence);

    Classification { label, confidence }
}

/// Numbers and numeric strings are accepted; anything else reads as `0.0`.
/// The result is clamped into `[0, 1]`.
fn parse_confidence(value: &Value) -> f32 {
    let raw = match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    };

    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn malformed(reason: impl Into<String>) -> ClassifierError {
    ClassifierError::MalformedResponse {
        reason: reason.into(),
    }
}

/// Decodes a classifier response body into a [`Classification`].
///
/// `result` must be a prediction object or a non-empty list of them; the first
/// entry of a list wins.
pub fn parse_classifier_response(body: &[u8]) -> Result<Classification, ClassifierError> {
    let response: ClassifierResponse =
        serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;

    let prediction = match response.result {
        Some(Value::Object(prediction)) => prediction,
        Some(Value::Array(entries)) => {
            if entries.iter().any(|entry| !entry.is_object()) {
                return Err(malformed("result list entries must be objects"));
            }
            match entries.into_iter().next() {
                Some(Value::Object(prediction)) => prediction,
                _ => return Err(malformed("empty result list")),
            }
        }
        None | Some(Value::Null) => return Err(malformed("missing result")),
        Some(other) => return Err(malformed(format!("result is not an object: {other}"))),
    };

    Ok(into_classification(&prediction))
}
