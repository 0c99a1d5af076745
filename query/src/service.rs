use crate::report::ProvenanceReport;
use crate::risk::{RiskContext, RiskEngine};
use graph::{Neo4jHttpStore, NeighborhoodResolver, StoreError};
use hub::{DatasetUrlResolver, HfHubClient, HubError};
use jobs::{DatasetExtractionOrchestrator, JobError};
use lineage_core::config::AppConfig;
use lineage_core::error::{ErrorCode, LineageError};
use lineage_core::model::{GraphNeighborhood, ModelPaperInfo};
use lineage_core::tool_state::{self, ProgressCallback, RequestContext};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SEARCH_TOOL: &str = "search_neo4j";
pub const EXTRACT_TOOL: &str = "extract_training_datasets";
pub const RISK_TOOL: &str = "dataset_risk";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("graph error: {0}")]
    Graph(#[from] StoreError),
    #[error("hub setup failed: {0}")]
    Hub(#[from] HubError),
    #[error("extraction setup failed: {0}")]
    Jobs(#[from] JobError),
}

impl LineageError for QueryError {
    fn error_code(&self) -> ErrorCode {
        match self {
            QueryError::InvalidQuery(_) => ErrorCode::InvalidArgument,
            QueryError::Graph(err) => err.error_code(),
            QueryError::Hub(err) => err.error_code(),
            QueryError::Jobs(err) => err.error_code(),
        }
    }
}

/// Neighborhood, paper-derived training datasets and their risk, for one id.
pub struct ProvenanceService {
    resolver: NeighborhoodResolver,
    orchestrator: Arc<DatasetExtractionOrchestrator>,
    url_resolver: Option<Arc<DatasetUrlResolver>>,
    risk: RiskEngine,
    max_concurrent: usize,
}

impl ProvenanceService {
    pub fn new(
        resolver: NeighborhoodResolver,
        orchestrator: Arc<DatasetExtractionOrchestrator>,
        risk: RiskEngine,
    ) -> Self {
        Self {
            resolver,
            orchestrator,
            url_resolver: None,
            risk,
            max_concurrent: 4,
        }
    }

    /// Extracted datasets the hub confirms get their canonical URL before scoring.
    pub fn with_url_resolver(mut self, url_resolver: Arc<DatasetUrlResolver>) -> Self {
        self.url_resolver = Some(url_resolver);
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, QueryError> {
        let store = Neo4jHttpStore::new(&config.graph)?;
        let orchestrator = DatasetExtractionOrchestrator::from_config(config)?;
        info!(layers = ?orchestrator.layer_names(), "dataset extraction layers");
        let hub = HfHubClient::new(&config.hub)?;

        Ok(Self::new(
            NeighborhoodResolver::new(Arc::new(store)),
            Arc::new(orchestrator),
            RiskEngine::new(config.risk),
        )
        .with_url_resolver(Arc::new(DatasetUrlResolver::new(Arc::new(hub))))
        .with_max_concurrent(config.extraction.max_concurrent))
    }

    pub async fn query(&self, entity_id: &str) -> Result<ProvenanceReport, QueryError> {
        self.query_with_progress(entity_id, None).await
    }

    /// Runs the whole pipeline inside a fresh tool-state scope.
    pub async fn query_with_progress(
        &self,
        entity_id: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<ProvenanceReport, QueryError> {
        let entity_id = entity_id.trim();
        if entity_id.is_empty() {
            return Err(QueryError::InvalidQuery("entity id must not be empty".to_string()));
        }

        let context = RequestContext::new(entity_id);
        tool_state::scoped(Some(context), async {
            tool_state::set_progress_callback(progress);
            let started = Instant::now();

            let neighborhood = self.search_neo4j(entity_id).await?;
            let training_datasets = self.extract_training_datasets(None).await;
            let dataset_risk = self.dataset_risk(&training_datasets);

            info!(
                id = entity_id,
                nodes = neighborhood.nodes.len(),
                models = training_datasets.len(),
                high = dataset_risk.global_counts.high,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "provenance query finished"
            );
            Ok(ProvenanceReport {
                neighborhood,
                training_datasets,
                dataset_risk,
            })
        })
        .await
    }

    pub async fn search_neo4j(&self, entity_id: &str) -> Result<GraphNeighborhood, QueryError> {
        let neighborhood = self.resolver.resolve(entity_id).await?;
        publish(SEARCH_TOOL, &neighborhood);
        Ok(neighborhood)
    }

    /// Without explicit ids, falls back to the model nodes of the neighborhood
    /// published earlier in this query.
    pub async fn extract_training_datasets(
        &self,
        model_ids: Option<Vec<String>>,
    ) -> BTreeMap<String, ModelPaperInfo> {
        let model_ids = model_ids.unwrap_or_else(published_model_ids);
        if model_ids.is_empty() {
            debug!("no models to extract training datasets for");
        }

        let mut papers: BTreeMap<String, ModelPaperInfo> = self
            .orchestrator
            .extract_for_models(&model_ids, self.max_concurrent)
            .await
            .into_iter()
            .collect();
        if let Some(url_resolver) = &self.url_resolver {
            verify_urls(url_resolver, &mut papers).await;
        }

        publish(EXTRACT_TOOL, &papers);
        papers
    }

    pub fn dataset_risk(&self, papers: &BTreeMap<String, ModelPaperInfo>) -> RiskContext {
        let context = self.risk.build_from_papers(papers);
        publish(RISK_TOOL, &context);
        context
    }
}

/// Fills in `hf_url` for extracted datasets the hub confirms.
async fn verify_urls(
    url_resolver: &DatasetUrlResolver,
    papers: &mut BTreeMap<String, ModelPaperInfo>,
) {
    for info in papers.values_mut() {
        for dataset in info.datasets.iter_mut() {
            if dataset.hf_url.is_some() {
                continue;
            }
            if let Some(url) = url_resolver.verified_url(&dataset.name).await {
                dataset.hf_url = Some(url);
            }
        }
    }
}

fn published_model_ids() -> Vec<String> {
    let Some(value) = tool_state::get_result(SEARCH_TOOL, None) else {
        return Vec::new();
    };
    match serde_json::from_value::<GraphNeighborhood>(value) {
        Ok(neighborhood) => neighborhood.model_ids(),
        Err(err) => {
            warn!(error = %err, "published neighborhood is unreadable");
            Vec::new()
        }
    }
}

fn publish(tool_name: &str, value: &impl Serialize) {
    match serde_json::to_value(value) {
        Ok(value) => tool_state::set_result(tool_name, value),
        Err(err) => warn!(tool = tool_name, error = %err, "failed to serialize tool result"),
    }
}
