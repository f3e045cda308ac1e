use crate::intent::mentions_location;
use crate::models::{SymptomAssessment, Warning, WarningKind};
use crate::schemas::SymptomRecord;

pub const EMERGENCY_NUMBER: &str = "112 (India Emergency Services)";
pub const EMERGENCY_MESSAGE: &str = "URGENT: Seek immediate medical attention. \
     Call emergency services (112 in India) or go to the nearest hospital.";
pub const RECOMMENDATION_INTRO: &str = "Based on your symptoms, here are some recommendations:";
pub const FALLBACK_REPLY: &str = "I couldn't understand your request. Please try rephrasing.";
pub const ASSESSMENT_UNAVAILABLE: &str = "I couldn't assess your symptoms right now. \
     If they are severe or getting worse, call 112 or visit the nearest hospital.";
pub const UNSPECIFIED_SYMPTOMS: &str = "unspecified symptoms";

pub const MIN_SEVERITY: i64 = 1;
pub const MAX_SEVERITY: i64 = 10;

/// Hospital search for the emergency path. Without a location hint in the
/// user's own words the request asks for general guidance instead.
pub fn emergency_search_query(assessment: &SymptomAssessment, user_text: &str) -> String {
    let mut query = format!(
        "Find nearest emergency hospitals for: {}",
        assessment.symptoms.join(", ")
    );
    if !mentions_location(user_text) {
        query.push_str(". User location not specified - provide general emergency guidance.");
    }
    query
}

/// One sentence shared by every advisor in the non-emergency fan-out.
pub fn symptom_summary(assessment: &SymptomAssessment) -> String {
    let mut summary = format!(
        "Patient has {} with severity {}/10",
        assessment.symptoms.join(", "),
        assessment.severity
    );
    if let Some(duration) = assessment.duration.as_deref() {
        summary.push_str(" for ");
        summary.push_str(duration);
    }
    summary
}

pub fn remedies_request(summary: &str) -> String {
    format!("Provide ayurvedic remedies for: {summary}")
}

pub fn yoga_request(summary: &str) -> String {
    format!("Suggest yoga poses and breathing exercises for: {summary}")
}

pub fn guidance_request(summary: &str) -> String {
    format!("Provide wellness advice and when to see a doctor for: {summary}")
}

/// Symptom names with blanks dropped, in the order the model gave them.
pub fn clean_symptoms(symptoms: &[String]) -> Vec<String> {
    symptoms
        .iter()
        .map(|symptom| symptom.trim())
        .filter(|symptom| !symptom.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Turns a raw extraction record into an assessment that satisfies the
/// severity and non-empty symptom invariants, reporting every repair.
pub fn validate_assessment(record: SymptomRecord) -> (SymptomAssessment, Vec<Warning>) {
    let mut warnings = Vec::new();

    let severity = record.severity.clamp(MIN_SEVERITY, MAX_SEVERITY);
    if severity != record.severity {
        warnings.push(Warning::new(
            "symptom_assessment",
            WarningKind::ValidationDefect,
            format!(
                "severity {} outside {MIN_SEVERITY}..={MAX_SEVERITY}, clamped to {severity}",
                record.severity
            ),
        ));
    }

    let mut symptoms = clean_symptoms(&record.symptoms);
    if symptoms.is_empty() {
        symptoms.push(UNSPECIFIED_SYMPTOMS.to_string());
        warnings.push(Warning::new(
            "symptom_assessment",
            WarningKind::ValidationDefect,
            "no symptoms could be extracted, using a placeholder",
        ));
    }

    let assessment = SymptomAssessment {
        symptoms,
        severity: severity as u8,
        duration: non_blank(record.duration),
        age: non_blank(record.age),
        is_emergency: record.is_emergency,
    };

    (assessment, warnings)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
