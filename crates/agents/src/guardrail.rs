use std::sync::Arc;

use arogya_core::{
    generate_record, GenerationFailure, GenerationPort, GenerationRequest, GuardrailRecord,
    SafetyPolicy, SafetyVerdict,
};
use tracing::debug;

/// Safety gate in front of every query.
#[derive(Clone)]
pub struct GuardrailGate {
    generation: Arc<dyn GenerationPort>,
    policy: SafetyPolicy,
}

impl GuardrailGate {
    pub fn new(generation: Arc<dyn GenerationPort>, policy: SafetyPolicy) -> Self {
        Self { generation, policy }
    }

    pub fn with_policy(mut self, policy: SafetyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// A port failure is returned as-is; there is no safe default for
    /// "is this dangerous".
    pub async fn check(&self, text: &str) -> Result<SafetyVerdict, GenerationFailure> {
        let prompt = GenerationRequest::new(self.policy.guardrail_prompt(), text);
        let record = generate_record::<GuardrailRecord>(self.generation.as_ref(), prompt).await?;
        debug!(is_safe = ?record.is_safe, category = ?record.category, "guardrail verdict");
        Ok(self.policy.interpret(record))
    }
}
