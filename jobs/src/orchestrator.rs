use futures::stream::{self, StreamExt};
use futures::FutureExt;
use hub::{HfHubClient, HubError, ModelCardSource};
use lineage_core::config::AppConfig;
use lineage_core::error::{ErrorCode, LineageError};
use lineage_core::extract::{DatasetExtractor, PaperText};
use lineage_core::model::{DatasetInfo, ModelPaperInfo};
use lineage_core::tool_state;
use llm::LlmDatasetExtractor;
use papers::{ArxivHttpSource, ArxivLinkExtractor, ArxivPaperParser, PaperError, PaperSource};
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::{Builder, Handle};
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum JobError {
    #[error("model card lookup failed: {0}")]
    Hub(#[from] HubError),
    #[error("paper download failed: {0}")]
    Paper(#[from] PaperError),
    #[error("failed to start extraction runtime: {0}")]
    Runtime(String),
    #[error("extraction worker thread panicked")]
    WorkerPanicked,
}

impl LineageError for JobError {
    fn error_code(&self) -> ErrorCode {
        match self {
            JobError::Hub(err) => err.error_code(),
            JobError::Paper(err) => err.error_code(),
            JobError::Runtime(_) | JobError::WorkerPanicked => ErrorCode::Internal,
        }
    }
}

/// Mines training datasets from the papers linked in model cards.
pub struct DatasetExtractionOrchestrator {
    cards: Arc<dyn ModelCardSource>,
    papers: Arc<dyn PaperSource>,
    parser: ArxivPaperParser,
    links: ArxivLinkExtractor,
    layers: Vec<Arc<dyn DatasetExtractor>>,
}

impl DatasetExtractionOrchestrator {
    /// Starts with the heuristic parser as the only extraction layer.
    pub fn new(
        cards: Arc<dyn ModelCardSource>,
        papers: Arc<dyn PaperSource>,
        parser: ArxivPaperParser,
    ) -> Self {
        let heuristic: Arc<dyn DatasetExtractor> = Arc::new(parser.clone());
        Self {
            cards,
            papers,
            parser,
            links: ArxivLinkExtractor::new(),
            layers: vec![heuristic],
        }
    }

    /// Appends a layer; on a name collision its datasets replace earlier ones.
    pub fn with_layer(mut self, layer: Arc<dyn DatasetExtractor>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, JobError> {
        let hub = HfHubClient::new(&config.hub)?;
        let papers = ArxivHttpSource::new(&config.arxiv)?;
        let mut orchestrator = Self::new(
            Arc::new(hub),
            Arc::new(papers),
            ArxivPaperParser::from_config(&config.arxiv),
        );

        if config.extraction.use_llm {
            let llm = LlmDatasetExtractor::from_config(&config.llm);
            if llm.is_available() {
                orchestrator = orchestrator.with_layer(Arc::new(llm));
            }
        }
        Ok(orchestrator)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Card, arXiv link, paper text, then every layer in order.
    pub async fn extract_for_model(&self, model_id: &str) -> Result<ModelPaperInfo, JobError> {
        let Some(card) = self.cards.model_card(model_id).await? else {
            debug!(model_id, "model has no card");
            return Ok(ModelPaperInfo::empty(model_id));
        };
        let Some(arxiv_url) = self.links.extract(&card) else {
            debug!(model_id, "model card links no arXiv paper");
            return Ok(ModelPaperInfo::empty(model_id));
        };

        let bytes = self.papers.fetch_bytes(&arxiv_url).await?;
        let text = self.parser.read_text(bytes).await;
        let mut info = ModelPaperInfo {
            model_id: model_id.to_string(),
            arxiv_url: Some(arxiv_url.clone()),
            datasets: Vec::new(),
        };
        if text.trim().is_empty() {
            warn!(model_id, arxiv_url = %arxiv_url, "no text extracted from paper");
            return Ok(info);
        }

        let paper = PaperText {
            model_id: model_id.to_string(),
            arxiv_url,
            text,
        };
        info.datasets = self.extract_from_paper(&paper).await;
        Ok(info)
    }

    /// Runs every layer over `paper`. A failing layer is logged and skipped.
    pub async fn extract_from_paper(&self, paper: &PaperText) -> Vec<DatasetInfo> {
        let mut batches = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            match layer.extract(paper).await {
                Ok(found) => batches.push(found),
                Err(err) => warn!(
                    model_id = %paper.model_id,
                    layer = layer.name(),
                    error = %err,
                    "extraction layer failed"
                ),
            }
        }
        merge_by_name(batches)
    }

    /// One entry per distinct id. A model whose chain fails or panics gets
    /// `ModelPaperInfo::empty`; the others are unaffected.
    pub async fn extract_for_models(
        &self,
        model_ids: &[String],
        max_concurrent: usize,
    ) -> HashMap<String, ModelPaperInfo> {
        let unique: Vec<String> = {
            let mut seen = HashSet::new();
            model_ids
                .iter()
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .collect()
        };
        let total = unique.len();
        let limit = max_concurrent.max(1);
        info!(models = total, max_concurrent = limit, "extracting training datasets");

        // Runs on the caller's task so tool-state task-locals stay visible.
        // Ids are moved into each future; borrowed ids make it non-`Send`.
        let mut pending = stream::iter(unique)
            .map(|model_id| self.isolated(model_id))
            .buffer_unordered(limit);

        let mut results = HashMap::with_capacity(total);
        while let Some((model_id, info)) = pending.next().await {
            tool_state::report_progress(&format!(
                "extracted datasets for {model_id} ({}/{total})",
                results.len() + 1
            ));
            results.insert(model_id, info);
        }
        results
    }

    async fn isolated(&self, model_id: String) -> (String, ModelPaperInfo) {
        let info = match AssertUnwindSafe(self.extract_for_model(&model_id))
            .catch_unwind()
            .await
        {
            Ok(Ok(info)) => info,
            Ok(Err(err)) => {
                warn!(model_id = %model_id, error = %err, "dataset extraction failed");
                ModelPaperInfo::empty(&model_id)
            }
            Err(_) => {
                error!(model_id = %model_id, "dataset extraction panicked");
                ModelPaperInfo::empty(&model_id)
            }
        };
        (model_id, info)
    }

    /// Blocking entry point. Inside a tokio runtime the work moves to a
    /// dedicated thread with its own runtime; the caller's request context and
    /// progress callback are carried over.
    pub fn extract_sync(
        &self,
        model_ids: &[String],
        max_concurrent: usize,
    ) -> Result<HashMap<String, ModelPaperInfo>, JobError> {
        let context = tool_state::get_context();
        let progress = tool_state::get_progress_callback();
        let run = || -> Result<HashMap<String, ModelPaperInfo>, JobError> {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|err| JobError::Runtime(err.to_string()))?;
            Ok(runtime.block_on(tool_state::scoped(context, async {
                tool_state::set_progress_callback(progress);
                self.extract_for_models(model_ids, max_concurrent).await
            })))
        };

        if Handle::try_current().is_ok() {
            debug!("extract_sync called inside a runtime; using a worker thread");
            std::thread::scope(|scope| {
                scope
                    .spawn(run)
                    .join()
                    .map_err(|_| JobError::WorkerPanicked)?
            })
        } else {
            run()
        }
    }
}

/// Concatenates layer outputs keyed by normalized name. Later entries replace
/// earlier ones in place, so first-seen order is kept.
pub fn merge_by_name(batches: impl IntoIterator<Item = Vec<DatasetInfo>>) -> Vec<DatasetInfo> {
    let mut order = Vec::new();
    let mut by_name: HashMap<String, DatasetInfo> = HashMap::new();
    for info in batches.into_iter().flatten() {
        let key = info.normalized_name();
        if by_name.insert(key.clone(), info).is_none() {
            order.push(key);
        }
    }
    order
        .into_iter()
        .filter_map(|key| by_name.remove(&key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::model::DatasetType;

    #[test]
    fn test_merge_prefers_later_layers() {
        let heuristic = vec![
            DatasetInfo::public("ImageNet").with_context("heuristic"),
            DatasetInfo::public("COCO"),
        ];
        let llm = vec![
            DatasetInfo::synthetic("imagenet", Some("GPT-4".to_string())),
            DatasetInfo::public("Alpaca"),
        ];

        let merged = merge_by_name(vec![heuristic, llm]);
        let names: Vec<&str> = merged.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["imagenet", "COCO", "Alpaca"]);
        assert_eq!(merged[0].dataset_type, DatasetType::Synthetic);
    }

    #[test]
    fn test_merge_dedupes_within_a_layer() {
        let merged = merge_by_name(vec![vec![
            DatasetInfo::public("The  Pile"),
            DatasetInfo::public("the pile"),
        ]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "the pile");
    }
}
