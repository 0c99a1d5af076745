use async_trait::async_trait;
use lineage_core::extract::{DatasetExtractor, PaperText};
use lineage_core::model::DatasetType;
use llm::{LlmDatasetExtractor, LlmError, StructuredLlm};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Replays a canned reply and records the user prompt it was sent.
struct ScriptedLlm {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn replying(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl StructuredLlm for ScriptedLlm {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(user.to_string());
        self.reply.clone().map_err(LlmError::Network)
    }
}

const URL: &str = "https://arxiv.org/abs/1234.5678";

#[tokio::test]
async fn test_extract_datasets_success() {
    let reply = json!({
        "datasets": [
            {
                "name": "BookCorpus",
                "type": "public_dataset",
                "source": null,
                "context": "Used for pretraining",
                "hf_url": "https://huggingface.co/datasets/bookcorpus"
            },
            {
                "name": "Synthetic data from GPT-4",
                "type": "synthetic",
                "source": "GPT-4",
                "context": "Generated for training",
                "hf_url": null
            }
        ]
    });
    let extractor = LlmDatasetExtractor::new(ScriptedLlm::replying(reply.to_string()), 10_000);
    let result = extractor
        .extract_datasets("Paper text about training", "model/test", URL)
        .await;

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].name, "BookCorpus");
    assert_eq!(result[0].dataset_type, DatasetType::PublicDataset);
    assert_eq!(
        result[0].hf_url.as_deref(),
        Some("https://huggingface.co/datasets/bookcorpus")
    );
    assert_eq!(result[1].dataset_type, DatasetType::Synthetic);
    assert_eq!(result[1].source.as_deref(), Some("GPT-4"));
}

#[tokio::test]
async fn test_disabled_extractor_returns_nothing() {
    let extractor = LlmDatasetExtractor::disabled();
    assert!(!extractor.is_available());
    assert!(extractor.extract_datasets("Paper text", "model/test", URL).await.is_empty());
}

#[tokio::test]
async fn test_bad_replies_yield_empty_results() {
    for reply in ["", "Invalid JSON", r#"{"result": []}"#, r#"{"datasets": "none"}"#] {
        let extractor = LlmDatasetExtractor::new(ScriptedLlm::replying(reply), 10_000);
        assert!(
            extractor.extract_datasets("Paper text", "model/test", URL).await.is_empty(),
            "reply {reply:?} should produce no datasets"
        );
    }
}

#[tokio::test]
async fn test_provider_error_yields_empty_result() {
    let extractor = LlmDatasetExtractor::new(ScriptedLlm::failing("API error"), 10_000);
    assert!(extractor.extract_datasets("Paper text", "model/test", URL).await.is_empty());
}

#[tokio::test]
async fn test_paper_text_is_limited() {
    let llm = ScriptedLlm::replying(r#"{"datasets": []}"#);
    let extractor = LlmDatasetExtractor::new(llm.clone(), 10_000);

    let long_text = "A".repeat(20_000);
    extractor.extract_datasets(&long_text, "model/test", URL).await;

    let prompt = llm.last_prompt();
    assert!(prompt.len() < long_text.len());
    assert_eq!(prompt.matches('A').count(), 10_000);
    assert!(prompt.contains("model/test"));
}

#[tokio::test]
async fn test_invalid_entries_are_skipped() {
    let reply = json!({
        "datasets": [
            {"name": "Valid Dataset", "type": "public_dataset", "context": "Used for training"},
            {"invalid": "entry"},
            {"name": "", "type": "public_dataset"},
            {"name": "Odd", "type": "scraped"}
        ]
    });
    let extractor = LlmDatasetExtractor::new(ScriptedLlm::replying(reply.to_string()), 10_000);
    let result = extractor.extract_datasets("Paper text", "model/test", URL).await;

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].name, "Valid Dataset");
}

#[tokio::test]
async fn test_extractor_as_layer() {
    let reply = json!({"datasets": [{"name": "C4", "type": "public_dataset"}]});
    let extractor = LlmDatasetExtractor::new(ScriptedLlm::replying(reply.to_string()), 100);
    let paper = PaperText {
        model_id: "org/t5".to_string(),
        arxiv_url: URL.to_string(),
        text: "text".to_string(),
    };

    assert_eq!(extractor.name(), "llm");
    let found = extractor.extract(&paper).await.unwrap();
    assert_eq!(found[0].name, "C4");
    assert!(found[0].context.is_empty());
}
