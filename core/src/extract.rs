use crate::model::DatasetInfo;
use async_trait::async_trait;

/// Text of one model's paper, as handed to each extraction layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperText {
    pub model_id: String,
    pub arxiv_url: String,
    pub text: String,
}

/// One layer of training-dataset extraction. Layers share the output schema,
/// so they can be stacked in any order and merged by dataset name.
#[async_trait]
pub trait DatasetExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, paper: &PaperText) -> anyhow::Result<Vec<DatasetInfo>>;
}
