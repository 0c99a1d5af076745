use async_trait::async_trait;
use lineage_core::error::{ErrorCode, LineageError};
use lineage_core::model::{EntityKind, RawRecord};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("graph store unreachable: {0}")]
    Connection(String),
    #[error("graph store timed out: {0}")]
    Timeout(String),
    #[error("graph query failed ({code}): {message}")]
    Query { code: String, message: String },
    #[error("invalid graph store response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else if err.is_decode() {
            StoreError::InvalidResponse(err.to_string())
        } else {
            StoreError::Connection(err.to_string())
        }
    }
}

impl LineageError for StoreError {
    fn error_code(&self) -> ErrorCode {
        match self {
            StoreError::Connection(_) => ErrorCode::Unavailable,
            StoreError::Timeout(_) => ErrorCode::DeadlineExceeded,
            StoreError::Query { .. } | StoreError::InvalidResponse(_) => ErrorCode::Internal,
        }
    }
}

/// A neighbor record together with the label of the edge that reached it.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedRecord {
    pub record: RawRecord,
    pub relationship_type: String,
}

impl RelatedRecord {
    pub fn new(record: RawRecord, relationship_type: impl Into<String>) -> Self {
        Self {
            record,
            relationship_type: relationship_type.into(),
        }
    }
}

/// Read side of the lineage graph.
///
/// Edges are stored derivative -> origin. `find_upstream` follows outgoing
/// edges (what `id` was derived from), `find_downstream` follows incoming
/// edges (what was derived from `id`).
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn find_root(&self, id: &str, kind: EntityKind) -> Result<Option<RawRecord>, StoreError>;

    async fn find_upstream(&self, id: &str, limit: usize)
        -> Result<Vec<RelatedRecord>, StoreError>;

    async fn find_downstream(
        &self,
        id: &str,
        limit: usize,
    ) -> Result<Vec<RelatedRecord>, StoreError>;
}
