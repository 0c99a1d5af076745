pub mod report;
pub mod risk;
pub mod service;

pub use report::ProvenanceReport;
pub use risk::{GlobalCounts, ModelRisk, RiskContext, RiskEngine, ScoredDataset};
pub use service::{ProvenanceService, QueryError};
