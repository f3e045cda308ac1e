use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arogya_core::triage::{
    emergency_search_query, guidance_request, remedies_request, symptom_summary, yoga_request,
    ASSESSMENT_UNAVAILABLE, EMERGENCY_MESSAGE, EMERGENCY_NUMBER, FALLBACK_REPLY,
    RECOMMENDATION_INTRO,
};
use arogya_core::{
    normalize_text, GenerationFailure, GenerationPort, Intent, Query, SafetyPolicy, SearchPort, Slot,
    SymptomOutcome, Warning, WarningKind, WorkflowError, WorkflowOutput, WorkflowResult,
};
use arogya_observability::AppMetrics;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::advisory::{AdvisoryBoard, AdvisoryGenerator};
use crate::classifier::IntentClassifier;
use crate::extractor::SymptomExtractor;
use crate::guardrail::GuardrailGate;

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub search_max_results: usize,
    /// Upper bound for every port-backed step of a run.
    pub call_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            search_max_results: 5,
            call_timeout: Duration::from_secs(90),
        }
    }
}

/// Gate, classify, dispatch. Holds nothing between runs except its wiring.
#[derive(Clone)]
pub struct HealthWorkflow {
    guardrail: GuardrailGate,
    classifier: IntentClassifier,
    extractor: SymptomExtractor,
    advisors: AdvisoryBoard,
    config: WorkflowConfig,
    metrics: Arc<AppMetrics>,
}

impl HealthWorkflow {
    pub fn new(
        generation: Arc<dyn GenerationPort>,
        search: Arc<dyn SearchPort>,
        config: WorkflowConfig,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            guardrail: GuardrailGate::new(generation.clone(), SafetyPolicy::default()),
            classifier: IntentClassifier::new(generation.clone()),
            extractor: SymptomExtractor::new(generation.clone()),
            advisors: AdvisoryBoard::new(
                generation,
                search,
                config.search_max_results,
                metrics.clone(),
            ),
            config,
            metrics,
        }
    }

    pub fn with_policy(mut self, policy: SafetyPolicy) -> Self {
        self.guardrail = self.guardrail.with_policy(policy);
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<AppMetrics> {
        self.metrics.clone()
    }

    pub fn advisors(&self) -> &AdvisoryBoard {
        &self.advisors
    }

    /// Runs one query to completion. `context` is an already formatted
    /// prior-turn string; it only reaches the classifier.
    #[instrument(name = "workflow.run", skip_all, fields(run_id = %Uuid::new_v4(), chars = text.chars().count()))]
    pub async fn run(
        &self,
        text: &str,
        context: Option<String>,
    ) -> Result<WorkflowResult, WorkflowError> {
        let started = Instant::now();
        self.metrics.inc_run();

        let query = Query::new(normalize_text(text), context);
        let outcome = self.execute(&query).await;

        self.metrics.observe_latency(started.elapsed());
        match &outcome {
            Ok(result) => {
                if result.is_degraded() {
                    self.metrics.inc_degraded();
                }
                info!(
                    status = ?result.status,
                    intent = ?result.intent,
                    fields = ?result.branch_fields(),
                    warnings = result.warnings.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "workflow done"
                );
            }
            Err(failure) => {
                self.metrics.inc_fatal();
                error!(stage = failure.stage(), error = %failure.failure(), "workflow aborted");
            }
        }
        outcome
    }

    async fn execute(&self, query: &Query) -> Result<WorkflowResult, WorkflowError> {
        let verdict = self
            .bounded(self.guardrail.check(&query.text))
            .await
            .map_err(WorkflowError::SafetyCheckUnavailable)?;
        if !verdict.is_safe {
            self.metrics.inc_blocked();
            info!(category = ?verdict.category, "query blocked by guardrail");
            return Ok(WorkflowResult::blocked(verdict));
        }
        info!("query gated");

        let classification = self
            .bounded(self.classifier.run(&query.with_context()))
            .await
            .map_err(WorkflowError::ClassificationUnavailable)?;
        info!(intent = %classification.intent, "query classified");

        let intent = classification.intent;
        let mut result = WorkflowResult::routed(classification);
        let text = query.text.as_str();

        match intent {
            Intent::GovernmentSchemeSupport => {
                self.single(&self.advisors.government_scheme, text, &mut result)
                    .await
            }
            Intent::MentalWellnessSupport => self.mental_wellness(text, &mut result).await,
            Intent::AyushSupport => self.single(&self.advisors.ayush, text, &mut result).await,
            Intent::FacilityLocatorSupport => {
                self.single(&self.advisors.facility_locator, text, &mut result)
                    .await
            }
            Intent::SymptomChecker => self.symptom_checker(text, &mut result).await,
            Intent::Unknown => {
                self.metrics.inc_unknown_intent();
                result.output = Slot::Filled(WorkflowOutput::Text(FALLBACK_REPLY.to_string()));
            }
        }

        Ok(result)
    }

    async fn single(&self, advisor: &AdvisoryGenerator, text: &str, result: &mut WorkflowResult) {
        let outcome = self.guarded("output", advisor.run(text)).await;
        result.output = settle(outcome.map(WorkflowOutput::Text), &mut result.warnings);
    }

    /// Primary counselling text and yoga suggestions are independent; a yoga
    /// failure never touches `output`.
    async fn mental_wellness(&self, text: &str, result: &mut WorkflowResult) {
        let (primary, yoga) = tokio::join!(
            self.guarded("output", self.advisors.mental_wellness.run(text)),
            self.guarded("yoga_recommendations", self.advisors.yoga.run(text)),
        );

        result.output = settle(primary.map(WorkflowOutput::Text), &mut result.warnings);
        result.yoga_recommendations = settle(yoga, &mut result.warnings);
    }

    async fn symptom_checker(&self, text: &str, result: &mut WorkflowResult) {
        let extraction = match self.guarded("symptom_assessment", self.extractor.run(text)).await {
            Ok(extraction) => extraction,
            Err(warning) => {
                result.warnings.push(warning);
                result.symptom_assessment = Slot::Degraded;
                result.output = Slot::Filled(WorkflowOutput::Text(ASSESSMENT_UNAVAILABLE.to_string()));
                return;
            }
        };

        let assessment = extraction.assessment;
        result.warnings.extend(extraction.warnings);
        info!(
            severity = assessment.severity,
            symptoms = assessment.symptoms.len(),
            emergency = assessment.is_emergency,
            "symptoms assessed"
        );

        if assessment.is_emergency {
            self.metrics.inc_emergency();
            let search_text = emergency_search_query(&assessment, text);
            let hospitals = self
                .guarded("hospital_locator", self.advisors.facility_locator.run(&search_text))
                .await;

            result.hospital_locator = settle(hospitals, &mut result.warnings);
            result.emergency_number = Slot::Filled(EMERGENCY_NUMBER.to_string());
            result.output = Slot::Filled(WorkflowOutput::Symptom(SymptomOutcome {
                emergency: true,
                message: EMERGENCY_MESSAGE.to_string(),
                symptoms: Some(assessment.symptoms.clone()),
                severity: Some(assessment.severity),
            }));
        } else {
            let summary = symptom_summary(&assessment);
            let remedies_req = remedies_request(&summary);
            let yoga_req = yoga_request(&summary);
            let guidance_req = guidance_request(&summary);
            let (remedies, yoga, guidance) = tokio::join!(
                self.guarded(
                    "ayurveda_recommendations",
                    self.advisors.ayush.run(&remedies_req),
                ),
                self.guarded(
                    "yoga_recommendations",
                    self.advisors.yoga.run(&yoga_req),
                ),
                self.guarded(
                    "general_guidance",
                    self.advisors.mental_wellness.run(&guidance_req),
                ),
            );

            result.ayurveda_recommendations = settle(remedies, &mut result.warnings);
            result.yoga_recommendations = settle(yoga, &mut result.warnings);
            result.general_guidance = settle(guidance, &mut result.warnings);
            result.output = Slot::Filled(WorkflowOutput::Symptom(SymptomOutcome {
                emergency: false,
                message: RECOMMENDATION_INTRO.to_string(),
                symptoms: None,
                severity: None,
            }));
        }

        result.symptom_assessment = Slot::Filled(assessment);
    }

    /// Gate and classifier calls: a timeout is just another terminal failure.
    async fn bounded<T, F>(&self, call: F) -> Result<T, GenerationFailure>
    where
        F: Future<Output = Result<T, GenerationFailure>>,
    {
        match timeout(self.config.call_timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GenerationFailure::Timeout),
        }
    }

    /// Field-level calls: any failure degrades `field` and becomes a warning.
    async fn guarded<T, F>(&self, field: &'static str, call: F) -> Result<T, Warning>
    where
        F: Future<Output = Result<T, GenerationFailure>>,
    {
        match timeout(self.config.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(failure)) => {
                warn!(field, error = %failure, "call failed, field degraded");
                Err(Warning::new(
                    field,
                    WarningKind::GenerationFailure,
                    failure.to_string(),
                ))
            }
            Err(_) => {
                warn!(
                    field,
                    timeout_ms = self.config.call_timeout.as_millis() as u64,
                    "call timed out, field degraded"
                );
                Err(Warning::new(
                    field,
                    WarningKind::Timeout,
                    format!(
                        "no response within {} ms",
                        self.config.call_timeout.as_millis()
                    ),
                ))
            }
        }
    }
}

fn settle<T>(outcome: Result<T, Warning>, warnings: &mut Vec<Warning>) -> Slot<T> {
    match outcome {
        Ok(value) => Slot::Filled(value),
        Err(warning) => {
            warnings.push(warning);
            Slot::Degraded
        }
    }
}
