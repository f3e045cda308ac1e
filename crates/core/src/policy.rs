use crate::models::SafetyVerdict;
use crate::schemas::GuardrailRecord;

/// Content categories the guardrail is asked to block.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    blocked_categories: Vec<String>,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            blocked_categories: vec![
                "self_harm_instructions".to_string(),
                "harm_to_others".to_string(),
                "illegal_drug_sourcing".to_string(),
                "prescription_abuse".to_string(),
                "explicit_content".to_string(),
                "non_health_abuse".to_string(),
            ],
        }
    }
}

impl SafetyPolicy {
    pub fn new(blocked_categories: Vec<String>) -> Self {
        Self { blocked_categories }
    }

    pub fn blocked_categories(&self) -> &[String] {
        &self.blocked_categories
    }

    pub fn guardrail_prompt(&self) -> String {
        format!(
            "You are a safety reviewer for a public health assistant in India.\n\
             Decide whether the user message is safe to answer.\n\
             Mark it unsafe only when it clearly asks for one of these categories: {}.\n\
             Questions about symptoms, distress, schemes, traditional medicine or hospitals are safe, \
             including messages that describe feeling low; those are routed to support, not blocked.\n\
             Return is_safe, a short reason, and the matching category (null when safe).",
            self.blocked_categories.join(", ")
        )
    }

    /// Missing or ambiguous verdicts resolve to safe to avoid over-blocking.
    pub fn interpret(&self, record: GuardrailRecord) -> SafetyVerdict {
        let is_safe = record.is_safe.unwrap_or(true);
        if is_safe {
            return SafetyVerdict::safe();
        }

        SafetyVerdict {
            is_safe,
            reason: record
                .reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty())
                .or_else(|| Some("Request falls outside what this assistant can help with.".to_string())),
            category: record
                .category
                .map(|category| category.trim().to_lowercase())
                .filter(|category| !category.is_empty()),
        }
    }
}
