use std::sync::Arc;

use arogya_core::triage::{clean_symptoms, validate_assessment};
use arogya_core::{
    generate_record, GenerationFailure, GenerationPort, GenerationRequest, SymptomAssessment,
    SymptomRecord, Warning, WarningKind,
};
use tracing::warn;

const EXTRACTOR_PROMPT: &str = "You are a clinical triage assistant.\n\
Extract from the user's message:\n\
- symptoms: every distinct symptom mentioned, as short phrases, in the order given\n\
- severity: an integer from 1 (trivial) to 10 (life-threatening)\n\
- duration: how long the symptoms have lasted, or null\n\
- age: the patient's age if stated, or null\n\
- is_emergency: true for red flags such as chest pain, difficulty breathing, stroke signs, \
heavy bleeding, loss of consciousness, severe allergic reaction or suicidal intent";

const RETRY_HINT: &str = "\n\nThe previous attempt returned no symptoms. \
List at least one symptom phrase taken from the message.";

/// Validated assessment plus any repairs made on the way.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub assessment: SymptomAssessment,
    pub warnings: Vec<Warning>,
}

#[derive(Clone)]
pub struct SymptomExtractor {
    generation: Arc<dyn GenerationPort>,
}

impl SymptomExtractor {
    pub fn new(generation: Arc<dyn GenerationPort>) -> Self {
        Self { generation }
    }

    /// Extracts once and, if no symptoms came back, once more with a hint.
    /// A second empty (or failed) attempt falls back to the first record and
    /// its placeholder symptom.
    pub async fn run(&self, text: &str) -> Result<Extraction, GenerationFailure> {
        let first = self.extract(text, EXTRACTOR_PROMPT.to_string()).await?;
        if !clean_symptoms(&first.symptoms).is_empty() {
            return Ok(finish(first, Vec::new()));
        }

        warn!("symptom extraction returned no symptoms, retrying once");
        let mut warnings = vec![Warning::new(
            "symptom_assessment",
            WarningKind::ValidationDefect,
            "first extraction returned no symptoms, retried",
        )];

        match self.extract(text, format!("{EXTRACTOR_PROMPT}{RETRY_HINT}")).await {
            Ok(second) if !clean_symptoms(&second.symptoms).is_empty() => {
                Ok(finish(second, warnings))
            }
            Ok(_) => Ok(finish(first, warnings)),
            Err(failure) => {
                warnings.push(Warning::new(
                    "symptom_assessment",
                    WarningKind::GenerationFailure,
                    format!("extraction retry failed: {failure}"),
                ));
                Ok(finish(first, warnings))
            }
        }
    }

    async fn extract(
        &self,
        text: &str,
        system_prompt: String,
    ) -> Result<SymptomRecord, GenerationFailure> {
        let prompt = GenerationRequest::new(system_prompt, text);
        generate_record::<SymptomRecord>(self.generation.as_ref(), prompt).await
    }
}

fn finish(record: SymptomRecord, mut warnings: Vec<Warning>) -> Extraction {
    let (assessment, repairs) = validate_assessment(record);
    warnings.extend(repairs);
    Extraction {
        assessment,
        warnings,
    }
}
