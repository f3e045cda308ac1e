pub mod error;
pub mod intent;
pub mod models;
pub mod policy;
pub mod ports;
pub mod schemas;
pub mod triage;

pub use error::{GenerationFailure, SearchFailure, WorkflowError};
pub use intent::{mentions_location, normalize_text, parse_intent_label};
pub use models::*;
pub use policy::SafetyPolicy;
pub use ports::{
    generate_record, render_template, GenerationPort, GenerationRequest, ResultShape, SearchPort,
    StructuredRequest, StructuredShape,
};
pub use schemas::{ClassificationRecord, GuardrailRecord, SymptomRecord};
