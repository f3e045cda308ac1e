use std::sync::Arc;

use arogya_core::{
    generate_record, parse_intent_label, Classification, ClassificationRecord, GenerationFailure,
    GenerationPort, GenerationRequest, Intent,
};
use tracing::warn;

const CLASSIFIER_PROMPT: &str = "You route messages for an Indian public health assistant.\n\
Classify the user's latest message into exactly one label:\n\
- government_scheme_support: government health schemes, insurance, eligibility, PM-JAY, state schemes\n\
- mental_wellness_support: stress, anxiety, low mood, sleep, emotional wellbeing\n\
- ayush_support: Ayurveda, Yoga, Unani, Siddha, Homeopathy remedies or the AYUSH ministry\n\
- symptom_checker: the user describes physical symptoms or asks what their symptoms mean\n\
- facility_locator_support: finding hospitals, clinics, pharmacies or doctors nearby\n\
The message may be followed by a 'Previous conversation' section. Use it only to resolve \
what a short follow-up refers to; it never adds new labels.\n\
Return the label as `classification` and one sentence of `reasoning`.";

#[derive(Clone)]
pub struct IntentClassifier {
    generation: Arc<dyn GenerationPort>,
}

impl IntentClassifier {
    pub fn new(generation: Arc<dyn GenerationPort>) -> Self {
        Self { generation }
    }

    /// `text` may already carry caller-supplied prior-turn context.
    pub async fn run(&self, text: &str) -> Result<Classification, GenerationFailure> {
        let prompt = GenerationRequest::new(CLASSIFIER_PROMPT, text);
        let record =
            generate_record::<ClassificationRecord>(self.generation.as_ref(), prompt).await?;

        let intent = parse_intent_label(&record.classification);
        if intent == Intent::Unknown {
            warn!(label = %record.classification, "classifier label outside the closed set");
        }

        Ok(Classification {
            intent,
            reasoning: record.reasoning.trim().to_string(),
        })
    }
}
