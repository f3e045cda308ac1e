#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use arogya_agents::{HealthWorkflow, WorkflowConfig};
use arogya_core::{
    GenerationFailure, GenerationPort, GenerationRequest, SearchFailure, SearchHit, SearchPort,
    StructuredRequest,
};
use arogya_observability::AppMetrics;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Result shape name for structured calls, advisor name otherwise.
    pub name: String,
    pub user_content: String,
    pub system_prompt: String,
}

#[derive(Default)]
struct Script {
    verdict: Option<Value>,
    label: String,
    guardrail_failure: Option<GenerationFailure>,
    classifier_failure: Option<GenerationFailure>,
    classifier_delay: Option<Duration>,
    symptoms: VecDeque<Result<Value, GenerationFailure>>,
    advisor_failures: HashMap<String, GenerationFailure>,
    advisor_delays: HashMap<String, Duration>,
}

/// Generation Port that answers from a script and records every call.
pub struct ScriptedGenerator {
    script: Mutex<Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    pub fn routing(label: &str) -> Self {
        Self {
            script: Mutex::new(Script {
                label: label.to_string(),
                ..Script::default()
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unsafe_verdict(mut self, reason: &str, category: &str) -> Self {
        self.script.get_mut().verdict = Some(json!({
            "is_safe": false,
            "reason": reason,
            "category": category
        }));
        self
    }

    pub fn verdict(mut self, verdict: Value) -> Self {
        self.script.get_mut().verdict = Some(verdict);
        self
    }

    pub fn fail_guardrail(mut self, failure: GenerationFailure) -> Self {
        self.script.get_mut().guardrail_failure = Some(failure);
        self
    }

    pub fn fail_classifier(mut self, failure: GenerationFailure) -> Self {
        self.script.get_mut().classifier_failure = Some(failure);
        self
    }

    pub fn delay_classifier(mut self, delay: Duration) -> Self {
        self.script.get_mut().classifier_delay = Some(delay);
        self
    }

    /// Queues one extractor answer; later extractions take the next one.
    pub fn symptoms(mut self, record: Value) -> Self {
        self.script.get_mut().symptoms.push_back(Ok(record));
        self
    }

    pub fn fail_symptoms(mut self, failure: GenerationFailure) -> Self {
        self.script.get_mut().symptoms.push_back(Err(failure));
        self
    }

    pub fn fail_advisor(mut self, advisor: &str, failure: GenerationFailure) -> Self {
        self.script
            .get_mut()
            .advisor_failures
            .insert(advisor.to_string(), failure);
        self
    }

    pub fn delay_advisor(mut self, advisor: &str, delay: Duration) -> Self {
        self.script
            .get_mut()
            .advisor_delays
            .insert(advisor.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls.lock().iter().map(|call| call.name.clone()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|call| call.name == name).count()
    }

    pub fn advisor_calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| !STRUCTURED_SHAPES.contains(&call.name.as_str()))
            .cloned()
            .collect()
    }

    fn record(&self, name: &str, request: &GenerationRequest) {
        self.calls.lock().push(RecordedCall {
            name: name.to_string(),
            user_content: request.user_content.clone(),
            system_prompt: request.rendered_system_prompt(),
        });
    }
}

const STRUCTURED_SHAPES: [&str; 3] = ["safety_verdict", "intent_classification", "symptom_assessment"];

#[async_trait]
impl GenerationPort for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
        let advisor = request
            .context
            .get("advisor")
            .cloned()
            .unwrap_or_else(|| "unnamed".to_string());
        self.record(&advisor, request);

        let (failure, delay) = {
            let script = self.script.lock();
            (
                script.advisor_failures.get(&advisor).cloned(),
                script.advisor_delays.get(&advisor).copied(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(failure) => Err(failure),
            None => Ok(format!("{advisor} advice for: {}", request.user_content)),
        }
    }

    async fn generate_structured(
        &self,
        request: &StructuredRequest,
    ) -> Result<Value, GenerationFailure> {
        self.record(request.shape.name, &request.prompt);

        match request.shape.name {
            "safety_verdict" => {
                let script = self.script.lock();
                if let Some(failure) = script.guardrail_failure.clone() {
                    return Err(failure);
                }
                Ok(script.verdict.clone().unwrap_or_else(|| {
                    json!({ "is_safe": true, "reason": null, "category": null })
                }))
            }
            "intent_classification" => {
                let (failure, delay, label) = {
                    let script = self.script.lock();
                    (
                        script.classifier_failure.clone(),
                        script.classifier_delay,
                        script.label.clone(),
                    )
                };
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if let Some(failure) = failure {
                    return Err(failure);
                }
                Ok(json!({ "classification": label, "reasoning": format!("scripted {label}") }))
            }
            "symptom_assessment" => {
                let mut script = self.script.lock();
                match script.symptoms.len() {
                    0 => Err(GenerationFailure::Rejected("no symptom script".to_string())),
                    1 => script.symptoms[0].clone(),
                    _ => script
                        .symptoms
                        .pop_front()
                        .unwrap_or_else(|| Err(GenerationFailure::Timeout)),
                }
            }
            other => Err(GenerationFailure::invalid_output(other, "unexpected shape")),
        }
    }
}

/// Search Port with fixed results that records every query.
pub struct ScriptedSearch {
    outcome: Result<Vec<SearchHit>, SearchFailure>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            outcome: Ok(hits),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn one_hit() -> Self {
        Self::with_hits(vec![SearchHit {
            title: "National Health Authority".to_string(),
            snippet: "Ayushman Bharat PM-JAY provides cover of Rs 5 lakh per family.".to_string(),
            url: "https://pmjay.gov.in".to_string(),
        }])
    }

    pub fn failing() -> Self {
        Self {
            outcome: Err(SearchFailure::Upstream {
                status: 503,
                body: "unavailable".to_string(),
            }),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchPort for ScriptedSearch {
    async fn search(
        &self,
        query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchFailure> {
        self.queries.lock().push(query.to_string());
        self.outcome.clone()
    }
}

pub struct Harness {
    pub generation: Arc<ScriptedGenerator>,
    pub search: Arc<ScriptedSearch>,
    pub metrics: Arc<AppMetrics>,
    pub workflow: HealthWorkflow,
}

pub fn harness(generation: ScriptedGenerator) -> Harness {
    harness_with(generation, ScriptedSearch::one_hit(), Duration::from_secs(5))
}

pub fn harness_with(
    generation: ScriptedGenerator,
    search: ScriptedSearch,
    call_timeout: Duration,
) -> Harness {
    let generation = Arc::new(generation);
    let search = Arc::new(search);
    let metrics = AppMetrics::shared();
    let workflow = HealthWorkflow::new(
        generation.clone(),
        search.clone(),
        WorkflowConfig {
            search_max_results: 3,
            call_timeout,
        },
        metrics.clone(),
    );

    Harness {
        generation,
        search,
        metrics,
        workflow,
    }
}

pub fn emergency_record() -> Value {
    json!({
        "symptoms": ["chest pain", "shortness of breath"],
        "severity": 9,
        "duration": null,
        "age": null,
        "is_emergency": true
    })
}

pub fn routine_record() -> Value {
    json!({
        "symptoms": ["headache", "mild fever"],
        "severity": 4,
        "duration": "2 days",
        "age": "34",
        "is_emergency": false
    })
}
