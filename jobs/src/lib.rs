pub mod orchestrator;

pub use orchestrator::{merge_by_name, DatasetExtractionOrchestrator, JobError};
