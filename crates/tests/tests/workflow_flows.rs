mod common;

use std::time::{Duration, Instant};

use arogya_agents::NO_SEARCH_RESULTS;
use arogya_core::triage::{
    ASSESSMENT_UNAVAILABLE, EMERGENCY_MESSAGE, EMERGENCY_NUMBER, FALLBACK_REPLY,
    RECOMMENDATION_INTRO, UNSPECIFIED_SYMPTOMS,
};
use arogya_core::{
    GenerationFailure, Intent, Slot, WarningKind, WorkflowError, WorkflowOutput, WorkflowStatus,
};
use common::{
    emergency_record, harness, harness_with, routine_record, ScriptedGenerator, ScriptedSearch,
};
use serde_json::json;

#[tokio::test]
async fn unsafe_queries_are_blocked_before_classification() {
    let h = harness(
        ScriptedGenerator::routing("symptom_checker")
            .unsafe_verdict("asks for overdose amounts", "self_harm_instructions"),
    );

    let result = h.workflow.run("how many pills to overdose", None).await.unwrap();

    assert_eq!(result.status, WorkflowStatus::Blocked);
    assert_eq!(h.generation.call_names(), vec!["safety_verdict"]);
    assert!(h.search.queries().is_empty());
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "status": "blocked",
            "reason": "asks for overdose amounts",
            "category": "self_harm_instructions"
        })
    );
    assert_eq!(h.metrics.snapshot().blocked_total, 1);
}

#[tokio::test]
async fn ambiguous_verdicts_pass_the_gate() {
    let h = harness(
        ScriptedGenerator::routing("ayush_support")
            .verdict(json!({ "is_safe": null, "reason": null, "category": null })),
    );

    let result = h.workflow.run("ashwagandha for sleep?", None).await.unwrap();
    assert_eq!(result.status, WorkflowStatus::Ok);
    assert_eq!(result.intent, Some(Intent::AyushSupport));
}

#[tokio::test]
async fn single_advisor_intents_fill_only_output() {
    let cases = [
        ("government_scheme_support", "government_scheme", "India government health schemes"),
        ("ayush_support", "ayush", "AYUSH ministry India schemes"),
        ("facility_locator_support", "facility_locator", "hospitals healthcare facilities near"),
    ];

    for (label, advisor, search_prefix) in cases {
        let h = harness(ScriptedGenerator::routing(label));
        let text = "what can I get in Pune";
        let result = h.workflow.run(text, None).await.unwrap();

        assert_eq!(result.intent.map(|intent| intent.as_label()), Some(label));
        assert!(result.branch_fields().is_empty(), "{label}");
        assert_eq!(
            result.output.as_filled().and_then(WorkflowOutput::as_text),
            Some(format!("{advisor} advice for: {text}").as_str())
        );

        let advisors = h.generation.advisor_calls();
        assert_eq!(advisors.len(), 1);
        assert_eq!(advisors[0].name, advisor);
        assert_eq!(h.search.queries(), vec![format!("{search_prefix} {text}")]);
        assert!(advisors[0].system_prompt.contains("Ayushman Bharat PM-JAY"));
    }
}

#[tokio::test]
async fn mental_wellness_adds_yoga_recommendations() {
    let h = harness(ScriptedGenerator::routing("mental_wellness_support"));
    let result = h
        .workflow
        .run("I feel anxious before exams", None)
        .await
        .unwrap();

    assert_eq!(result.branch_fields(), vec!["yoga_recommendations"]);
    assert!(result
        .output
        .as_filled()
        .and_then(WorkflowOutput::as_text)
        .unwrap()
        .starts_with("mental_wellness advice"));
    assert!(result
        .yoga_recommendations
        .as_filled()
        .unwrap()
        .starts_with("yoga advice"));
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn yoga_failure_keeps_the_primary_answer() {
    let h = harness(
        ScriptedGenerator::routing("mental_wellness_support")
            .fail_advisor("yoga", GenerationFailure::Upstream { status: 500, body: "boom".to_string() }),
    );

    let result = h.workflow.run("I can't sleep from stress", None).await.unwrap();

    assert!(result.output.is_filled());
    assert_eq!(result.yoga_recommendations, Slot::Degraded);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].field, "yoga_recommendations");
    assert_eq!(result.warnings[0].kind, WarningKind::GenerationFailure);

    let encoded = serde_json::to_value(&result).unwrap();
    assert!(encoded["yoga_recommendations"].is_null());
    assert_eq!(h.metrics.snapshot().degraded_total, 1);
}

#[tokio::test]
async fn chest_pain_takes_the_emergency_path() {
    let h = harness(ScriptedGenerator::routing("symptom_checker").symptoms(emergency_record()));

    let result = h
        .workflow
        .run("I have chest pain and shortness of breath", None)
        .await
        .unwrap();

    assert_eq!(result.status, WorkflowStatus::Ok);
    assert_eq!(result.intent, Some(Intent::SymptomChecker));
    assert_eq!(
        result.branch_fields(),
        vec!["symptom_assessment", "hospital_locator", "emergency_number"]
    );

    let encoded = serde_json::to_value(&result).unwrap();
    assert_eq!(encoded["output"]["emergency"], json!(true));
    assert_eq!(encoded["output"]["message"], json!(EMERGENCY_MESSAGE));
    assert_eq!(encoded["output"]["severity"], json!(9));
    assert_eq!(encoded["emergency_number"], json!("112 (India Emergency Services)"));
    assert!(encoded["hospital_locator"].is_string());
    assert!(encoded.get("ayurveda_recommendations").is_none());
    assert!(encoded.get("yoga_recommendations").is_none());
    assert!(encoded.get("general_guidance").is_none());

    let advisors = h.generation.advisor_calls();
    assert_eq!(advisors.len(), 1);
    assert_eq!(advisors[0].name, "facility_locator");
    assert_eq!(
        advisors[0].user_content,
        "Find nearest emergency hospitals for: chest pain, shortness of breath. \
         User location not specified - provide general emergency guidance."
    );
    assert_eq!(h.metrics.snapshot().emergency_total, 1);
}

#[tokio::test]
async fn emergency_search_stays_local_when_a_location_is_given() {
    let h = harness(ScriptedGenerator::routing("symptom_checker").symptoms(emergency_record()));

    h.workflow
        .run("severe chest pain, hospitals NEAR Koramangala please", None)
        .await
        .unwrap();

    let advisors = h.generation.advisor_calls();
    assert_eq!(
        advisors[0].user_content,
        "Find nearest emergency hospitals for: chest pain, shortness of breath"
    );
}

#[tokio::test]
async fn emergency_locator_failure_still_returns_the_number() {
    let h = harness(
        ScriptedGenerator::routing("symptom_checker")
            .symptoms(emergency_record())
            .fail_advisor("facility_locator", GenerationFailure::Transport("reset".to_string())),
    );

    let result = h.workflow.run("crushing chest pain", None).await.unwrap();

    assert!(result.output.as_filled().unwrap().is_emergency());
    assert_eq!(result.hospital_locator, Slot::Degraded);
    assert_eq!(result.emergency_number, Slot::Filled(EMERGENCY_NUMBER.to_string()));
    assert_eq!(result.warnings[0].field, "hospital_locator");
}

#[tokio::test]
async fn routine_symptoms_fan_out_with_a_shared_summary() {
    let h = harness(ScriptedGenerator::routing("symptom_checker").symptoms(routine_record()));

    let result = h
        .workflow
        .run("headache and a mild fever since two days", None)
        .await
        .unwrap();

    assert_eq!(
        result.branch_fields(),
        vec![
            "symptom_assessment",
            "ayurveda_recommendations",
            "yoga_recommendations",
            "general_guidance"
        ]
    );
    assert_eq!(
        result.output,
        Slot::Filled(WorkflowOutput::Symptom(arogya_core::SymptomOutcome {
            emergency: false,
            message: RECOMMENDATION_INTRO.to_string(),
            symptoms: None,
            severity: None,
        }))
    );

    let summary = "Patient has headache, mild fever with severity 4/10 for 2 days";
    let mut advisors = h
        .generation
        .advisor_calls()
        .into_iter()
        .map(|call| (call.name, call.user_content))
        .collect::<Vec<_>>();
    advisors.sort();
    assert_eq!(
        advisors,
        vec![
            ("ayush".to_string(), format!("Provide ayurvedic remedies for: {summary}")),
            (
                "mental_wellness".to_string(),
                format!("Provide wellness advice and when to see a doctor for: {summary}")
            ),
            (
                "yoga".to_string(),
                format!("Suggest yoga poses and breathing exercises for: {summary}")
            ),
        ]
    );

    let assessment = result.symptom_assessment.as_filled().unwrap();
    assert_eq!(assessment.severity, 4);
    assert_eq!(assessment.age.as_deref(), Some("34"));
    assert!(result.hospital_locator.is_absent());
}

#[tokio::test]
async fn results_bind_to_named_slots_whatever_finishes_first() {
    let h = harness(
        ScriptedGenerator::routing("symptom_checker")
            .symptoms(routine_record())
            .delay_advisor("ayush", Duration::from_millis(150))
            .delay_advisor("mental_wellness", Duration::from_millis(75)),
    );

    let result = h.workflow.run("headache", None).await.unwrap();

    assert!(result.ayurveda_recommendations.as_filled().unwrap().starts_with("ayush advice"));
    assert!(result.yoga_recommendations.as_filled().unwrap().starts_with("yoga advice"));
    assert!(result
        .general_guidance
        .as_filled()
        .unwrap()
        .starts_with("mental_wellness advice"));
}

#[tokio::test]
async fn fan_out_calls_run_concurrently() {
    let h = harness(
        ScriptedGenerator::routing("symptom_checker")
            .symptoms(routine_record())
            .delay_advisor("ayush", Duration::from_millis(300))
            .delay_advisor("yoga", Duration::from_millis(300))
            .delay_advisor("mental_wellness", Duration::from_millis(300)),
    );

    let started = Instant::now();
    let result = h.workflow.run("headache", None).await.unwrap();

    assert!(result.warnings.is_empty());
    assert!(started.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn one_failed_advisor_degrades_only_its_field() {
    let h = harness(
        ScriptedGenerator::routing("symptom_checker")
            .symptoms(routine_record())
            .fail_advisor("mental_wellness", GenerationFailure::Rejected("policy".to_string())),
    );

    let result = h.workflow.run("headache", None).await.unwrap();

    assert_eq!(result.status, WorkflowStatus::Ok);
    assert!(result.ayurveda_recommendations.is_filled());
    assert!(result.yoga_recommendations.is_filled());
    assert_eq!(result.general_guidance, Slot::Degraded);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].field, "general_guidance");

    let encoded = serde_json::to_value(&result).unwrap();
    assert!(encoded["general_guidance"].is_null());
    assert_eq!(encoded["warnings"][0]["kind"], json!("generation_failure"));
}

#[tokio::test]
async fn slow_advisors_time_out_into_warnings() {
    let h = harness_with(
        ScriptedGenerator::routing("symptom_checker")
            .symptoms(routine_record())
            .delay_advisor("yoga", Duration::from_secs(5)),
        ScriptedSearch::one_hit(),
        Duration::from_millis(200),
    );

    let started = Instant::now();
    let result = h.workflow.run("headache", None).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(result.yoga_recommendations, Slot::Degraded);
    assert!(result.ayurveda_recommendations.is_filled());
    assert!(result.general_guidance.is_filled());
    assert_eq!(result.warnings[0].kind, WarningKind::Timeout);
}

#[tokio::test]
async fn out_of_range_severity_is_clamped_with_a_warning() {
    for (raw, stored) in [(15, 10u8), (-3, 1u8)] {
        let mut record = routine_record();
        record["severity"] = json!(raw);
        let h = harness(ScriptedGenerator::routing("symptom_checker").symptoms(record));

        let result = h.workflow.run("headache", None).await.unwrap();

        assert_eq!(result.symptom_assessment.as_filled().unwrap().severity, stored);
        assert!(result
            .warnings
            .iter()
            .any(|warning| warning.kind == WarningKind::ValidationDefect));
    }
}

#[tokio::test]
async fn empty_symptoms_are_retried_once_then_replaced() {
    let mut empty = emergency_record();
    empty["symptoms"] = json!([]);
    let h = harness(ScriptedGenerator::routing("symptom_checker").symptoms(empty));

    let result = h.workflow.run("something is very wrong", None).await.unwrap();

    assert_eq!(h.generation.count("symptom_assessment"), 2);
    let assessment = result.symptom_assessment.as_filled().unwrap();
    assert_eq!(assessment.symptoms, vec![UNSPECIFIED_SYMPTOMS.to_string()]);
    assert!(assessment.is_emergency);
    assert!(result.hospital_locator.is_filled());
    assert!(result
        .warnings
        .iter()
        .all(|warning| warning.field == "symptom_assessment"));
}

#[tokio::test]
async fn retry_uses_the_second_extraction_when_it_finds_symptoms() {
    let mut empty = routine_record();
    empty["symptoms"] = json!([" "]);
    let h = harness(
        ScriptedGenerator::routing("symptom_checker")
            .symptoms(empty)
            .symptoms(routine_record()),
    );

    let result = h.workflow.run("not feeling well", None).await.unwrap();

    assert_eq!(
        result.symptom_assessment.as_filled().unwrap().symptoms,
        vec!["headache".to_string(), "mild fever".to_string()]
    );
    assert_eq!(result.warnings.len(), 1);
}

#[tokio::test]
async fn extractor_failure_degrades_the_assessment() {
    let h = harness(
        ScriptedGenerator::routing("symptom_checker")
            .fail_symptoms(GenerationFailure::invalid_output("symptom_assessment", "eof")),
    );

    let result = h.workflow.run("my knee hurts", None).await.unwrap();

    assert_eq!(result.symptom_assessment, Slot::Degraded);
    assert_eq!(
        result.output.as_filled().and_then(WorkflowOutput::as_text),
        Some(ASSESSMENT_UNAVAILABLE)
    );
    assert!(h.generation.advisor_calls().is_empty());
    assert_eq!(result.warnings[0].field, "symptom_assessment");
}

#[tokio::test]
async fn out_of_set_labels_route_to_the_fallback() {
    let h = harness(ScriptedGenerator::routing("weather_forecast"));

    let result = h.workflow.run("will it rain tomorrow", None).await.unwrap();

    assert_eq!(result.intent, Some(Intent::Unknown));
    assert_eq!(
        result.output.as_filled().and_then(WorkflowOutput::as_text),
        Some(FALLBACK_REPLY)
    );
    assert!(h.generation.advisor_calls().is_empty());
    assert!(h.search.queries().is_empty());
    assert_eq!(
        serde_json::to_value(&result).unwrap()["intent"],
        json!("unknown")
    );
    assert_eq!(h.metrics.snapshot().unknown_intent_total, 1);
}

#[tokio::test]
async fn guardrail_failure_is_fatal_not_blocked() {
    let h = harness(
        ScriptedGenerator::routing("ayush_support").fail_guardrail(GenerationFailure::Timeout),
    );

    let error = h.workflow.run("tulsi for cough", None).await.unwrap_err();

    assert!(matches!(error, WorkflowError::SafetyCheckUnavailable(GenerationFailure::Timeout)));
    assert_eq!(h.generation.call_names(), vec!["safety_verdict"]);
    assert_eq!(h.metrics.snapshot().fatal_total, 1);
}

#[tokio::test]
async fn classifier_failure_is_fatal() {
    let h = harness(
        ScriptedGenerator::routing("ayush_support")
            .fail_classifier(GenerationFailure::invalid_output("intent_classification", "eof")),
    );

    let error = h.workflow.run("tulsi for cough", None).await.unwrap_err();

    assert_eq!(error.stage(), "classifier");
    assert!(h.generation.advisor_calls().is_empty());
}

#[tokio::test]
async fn classifier_timeout_is_fatal() {
    let h = harness_with(
        ScriptedGenerator::routing("ayush_support").delay_classifier(Duration::from_secs(5)),
        ScriptedSearch::one_hit(),
        Duration::from_millis(100),
    );

    let error = h.workflow.run("tulsi for cough", None).await.unwrap_err();
    assert!(matches!(
        error,
        WorkflowError::ClassificationUnavailable(GenerationFailure::Timeout)
    ));
}

#[tokio::test]
async fn prior_context_reaches_only_the_classifier() {
    let h = harness(ScriptedGenerator::routing("government_scheme_support"));
    let context = "\n\nPrevious conversation:\n1. User: am I covered by PM-JAY\n   Intent: government_scheme_support\n";

    h.workflow
        .run("what about my parents?", Some(context.to_string()))
        .await
        .unwrap();

    let calls = h.generation.calls();
    let by_name = |name: &str| {
        calls
            .iter()
            .find(|call| call.name == name)
            .map(|call| call.user_content.clone())
            .unwrap()
    };
    assert_eq!(by_name("safety_verdict"), "what about my parents?");
    assert_eq!(by_name("intent_classification"), format!("what about my parents?{context}"));
    assert_eq!(by_name("government_scheme"), "what about my parents?");
}

#[tokio::test]
async fn search_failure_is_not_a_warning() {
    let h = harness_with(
        ScriptedGenerator::routing("government_scheme_support"),
        ScriptedSearch::failing(),
        Duration::from_secs(5),
    );

    let result = h.workflow.run("state schemes in Kerala", None).await.unwrap();

    assert!(result.output.is_filled());
    assert!(result.warnings.is_empty());
    assert!(h.generation.advisor_calls()[0]
        .system_prompt
        .contains(NO_SEARCH_RESULTS));
    assert_eq!(h.metrics.snapshot().search_fallback_total, 1);
}

#[tokio::test]
async fn repeated_runs_keep_the_same_shape() {
    let h = harness(ScriptedGenerator::routing("symptom_checker").symptoms(routine_record()));

    let runs = futures::future::join_all(
        (0..4).map(|_| h.workflow.run("headache and fever", None)),
    )
    .await;

    let shapes = runs
        .into_iter()
        .map(|run| {
            let result = run.unwrap();
            (result.intent, result.branch_fields())
        })
        .collect::<Vec<_>>();
    assert!(shapes.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(h.metrics.snapshot().runs_total, 4);
}
