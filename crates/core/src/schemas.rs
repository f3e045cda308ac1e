//! Raw records requested from the Generation Port. They mirror what the
//! model is asked to emit and are validated into domain types elsewhere.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ports::StructuredShape;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailRecord {
    #[serde(default)]
    pub is_safe: Option<bool>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl StructuredShape for GuardrailRecord {
    const NAME: &'static str = "safety_verdict";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "is_safe": { "type": ["boolean", "null"] },
                "reason": { "type": ["string", "null"] },
                "category": { "type": ["string", "null"] }
            },
            "required": ["is_safe", "reason", "category"],
            "additionalProperties": false
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub classification: String,
    #[serde(default)]
    pub reasoning: String,
}

impl StructuredShape for ClassificationRecord {
    const NAME: &'static str = "intent_classification";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "classification": {
                    "type": "string",
                    "enum": [
                        "government_scheme_support",
                        "mental_wellness_support",
                        "ayush_support",
                        "symptom_checker",
                        "facility_locator_support"
                    ]
                },
                "reasoning": { "type": "string" }
            },
            "required": ["classification", "reasoning"],
            "additionalProperties": false
        })
    }
}

/// Severity is kept signed so out-of-range values survive decoding and can
/// be clamped with a warning instead of failing the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomRecord {
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub severity: i64,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    pub is_emergency: bool,
}

impl StructuredShape for SymptomRecord {
    const NAME: &'static str = "symptom_assessment";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "symptoms": { "type": "array", "items": { "type": "string" } },
                "severity": { "type": "integer" },
                "duration": { "type": ["string", "null"] },
                "age": { "type": ["string", "null"] },
                "is_emergency": { "type": "boolean" }
            },
            "required": ["symptoms", "severity", "duration", "age", "is_emergency"],
            "additionalProperties": false
        })
    }
}
