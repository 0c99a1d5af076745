use crate::client::{LlmError, OpenAiClient, StructuredLlm};
use crate::prompt::{user_prompt, SYSTEM_PROMPT};
use async_trait::async_trait;
use lineage_core::config::LlmConfig;
use lineage_core::extract::{DatasetExtractor, PaperText};
use lineage_core::model::DatasetInfo;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Asks a language model which datasets a paper trained on.
pub struct LlmDatasetExtractor {
    client: Option<Arc<dyn StructuredLlm>>,
    max_chars: usize,
}

impl LlmDatasetExtractor {
    pub fn new(client: Arc<dyn StructuredLlm>, max_chars: usize) -> Self {
        Self {
            client: Some(client),
            max_chars,
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: None,
            max_chars: LlmConfig::default().max_chars,
        }
    }

    /// Disabled when no API key is configured.
    pub fn from_config(config: &LlmConfig) -> Self {
        match OpenAiClient::new(config) {
            Ok(client) => Self::new(Arc::new(client), config.max_chars),
            Err(LlmError::MissingApiKey) => {
                info!("no LLM API key configured; LLM dataset extraction disabled");
                Self::disabled()
            }
            Err(err) => {
                warn!(error = %err, "failed to build LLM client; LLM dataset extraction disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    /// Never fails: provider or format problems are logged and yield no datasets.
    pub async fn extract_datasets(
        &self,
        paper_text: &str,
        model_id: &str,
        arxiv_url: &str,
    ) -> Vec<DatasetInfo> {
        let Some(client) = &self.client else {
            return Vec::new();
        };

        let text = truncate_chars(paper_text, self.max_chars);
        let reply = match client
            .complete(SYSTEM_PROMPT, &user_prompt(model_id, arxiv_url, text))
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                error!(model_id, error = %err, "LLM dataset extraction failed");
                return Vec::new();
            }
        };

        match parse_reply(&reply) {
            Ok(datasets) => {
                debug!(model_id, datasets = datasets.len(), "LLM dataset extraction finished");
                datasets
            }
            Err(reason) => {
                error!(model_id, reason = %reason, "unusable LLM reply");
                Vec::new()
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn parse_reply(reply: &str) -> Result<Vec<DatasetInfo>, String> {
    if reply.trim().is_empty() {
        return Err("empty content".to_string());
    }
    let value: Value = serde_json::from_str(reply).map_err(|err| format!("invalid JSON: {err}"))?;
    let entries = value
        .get("datasets")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing datasets array".to_string())?;

    Ok(entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<DatasetInfo>(entry.clone()) {
            Ok(info) if !info.name.trim().is_empty() => Some(info),
            Ok(_) => {
                warn!("skipping LLM dataset entry without a name");
                None
            }
            Err(err) => {
                warn!(error = %err, "skipping invalid LLM dataset entry");
                None
            }
        })
        .collect())
}

#[async_trait]
impl DatasetExtractor for LlmDatasetExtractor {
    fn name(&self) -> &str {
        "llm"
    }

    async fn extract(&self, paper: &PaperText) -> anyhow::Result<Vec<DatasetInfo>> {
        Ok(self
            .extract_datasets(&paper.text, &paper.model_id, &paper.arxiv_url)
            .await)
    }
}
