pub mod advisory;
pub mod classifier;
pub mod extractor;
pub mod guardrail;
pub mod workflow;

pub use advisory::{AdvisoryBoard, AdvisoryGenerator, AdvisoryKind, NO_SEARCH_RESULTS};
pub use classifier::IntentClassifier;
pub use extractor::{Extraction, SymptomExtractor};
pub use guardrail::GuardrailGate;
pub use workflow::{HealthWorkflow, WorkflowConfig};
