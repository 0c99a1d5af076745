pub mod client;
pub mod extractor;
mod prompt;

pub use client::{LlmError, OpenAiClient, StructuredLlm};
pub use extractor::LlmDatasetExtractor;
