use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single user turn. `context` is an opaque, caller-formatted string of
/// prior turns; the workflow never stores or edits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>, context: Option<String>) -> Self {
        Self {
            text: text.into(),
            context: context.filter(|value| !value.trim().is_empty()),
        }
    }

    /// Query text with the prior-turn context appended, used where intent
    /// needs disambiguation.
    pub fn with_context(&self) -> String {
        match &self.context {
            Some(context) => format!("{}{}", self.text, context),
            None => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    pub reason: Option<String>,
    pub category: Option<String>,
}

impl SafetyVerdict {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            reason: None,
            category: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    GovernmentSchemeSupport,
    MentalWellnessSupport,
    AyushSupport,
    SymptomChecker,
    FacilityLocatorSupport,
    Unknown,
}

impl Intent {
    /// Labels the classifier is allowed to produce.
    pub const ROUTABLE: [Intent; 5] = [
        Intent::GovernmentSchemeSupport,
        Intent::MentalWellnessSupport,
        Intent::AyushSupport,
        Intent::SymptomChecker,
        Intent::FacilityLocatorSupport,
    ];

    pub fn as_label(self) -> &'static str {
        match self {
            Self::GovernmentSchemeSupport => "government_scheme_support",
            Self::MentalWellnessSupport => "mental_wellness_support",
            Self::AyushSupport => "ayush_support",
            Self::SymptomChecker => "symptom_checker",
            Self::FacilityLocatorSupport => "facility_locator_support",
            Self::Unknown => "unknown",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::GovernmentSchemeSupport => "Government Scheme Support",
            Self::MentalWellnessSupport => "Mental Wellness Support",
            Self::AyushSupport => "AYUSH Support",
            Self::SymptomChecker => "Symptom Checker",
            Self::FacilityLocatorSupport => "Facility Locator Support",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomAssessment {
    pub symptoms: Vec<String>,
    pub severity: u8,
    pub duration: Option<String>,
    pub age: Option<String>,
    pub is_emergency: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Ok,
    Blocked,
}

/// A response field that is either not part of this run's branch, part of it
/// but degraded (serialised as an explicit `null`), or filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Absent,
    Degraded,
    Filled(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Slot<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled(_))
    }

    pub fn as_filled(&self) -> Option<&T> {
        match self {
            Self::Filled(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Filled(value),
            None => Self::Degraded,
        }
    }
}

impl<T: Serialize> Serialize for Slot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Filled(value) => value.serialize(serializer),
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Slot<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomOutcome {
    pub emergency: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowOutput {
    Text(String),
    Symptom(SymptomOutcome),
}

impl WorkflowOutput {
    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::Symptom(outcome) if outcome.emergency)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Symptom(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    GenerationFailure,
    Timeout,
    ValidationDefect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub field: String,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(field: &str, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind,
            message: message.into(),
        }
    }
}

/// Response envelope returned by one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub output: Slot<WorkflowOutput>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub symptom_assessment: Slot<SymptomAssessment>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub ayurveda_recommendations: Slot<String>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub yoga_recommendations: Slot<String>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub general_guidance: Slot<String>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub hospital_locator: Slot<String>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub emergency_number: Slot<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl WorkflowResult {
    pub fn blocked(verdict: SafetyVerdict) -> Self {
        Self {
            status: WorkflowStatus::Blocked,
            intent: None,
            reasoning: None,
            reason: verdict.reason,
            category: verdict.category,
            output: Slot::Absent,
            symptom_assessment: Slot::Absent,
            ayurveda_recommendations: Slot::Absent,
            yoga_recommendations: Slot::Absent,
            general_guidance: Slot::Absent,
            hospital_locator: Slot::Absent,
            emergency_number: Slot::Absent,
            warnings: Vec::new(),
        }
    }

    pub fn routed(classification: Classification) -> Self {
        Self {
            status: WorkflowStatus::Ok,
            intent: Some(classification.intent),
            reasoning: Some(classification.reasoning),
            ..Self::blocked(SafetyVerdict::safe())
        }
    }

    /// Names of the branch-specific fields that belong to this run, degraded
    /// ones included.
    pub fn branch_fields(&self) -> Vec<&'static str> {
        let slots = [
            ("symptom_assessment", self.symptom_assessment.is_absent()),
            ("ayurveda_recommendations", self.ayurveda_recommendations.is_absent()),
            ("yoga_recommendations", self.yoga_recommendations.is_absent()),
            ("general_guidance", self.general_guidance.is_absent()),
            ("hospital_locator", self.hospital_locator.is_absent()),
            ("emergency_number", self.emergency_number.is_absent()),
        ];

        slots
            .into_iter()
            .filter(|(_, absent)| !absent)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}
