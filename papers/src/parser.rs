use crate::catalog::known_datasets;
use crate::extract::extract_pdf_text;
use async_trait::async_trait;
use lineage_core::config::ArxivConfig;
use lineage_core::extract::{DatasetExtractor, PaperText};
use lineage_core::model::DatasetInfo;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

static HUB_DATASET_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://huggingface\.co/datasets/[\w.\-]+(?:/[\w.\-]+)?").expect("hub url regex")
});

// "trained on the Foo Bar dataset"; the name itself must be capitalized.
static TRAINED_ON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?i:trained|fine-tuned|finetuned|pre-trained|pretrained)\s+on\s+(?:(?i:the)\s+)?([A-Z][\w\-]*(?:\s[A-Z][\w\-]*){0,3})\s+(?i:dataset|corpus)\b",
    )
    .expect("trained-on regex")
});

static SYNTHETIC_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:synthetic)[^.]{0,80}?(?i:generated|created|produced|synthesized)\s+(?i:by|with|using|from)\s+(?:(?i:the)\s+)?([A-Za-z][\w.\-/]*[\w])",
    )
    .expect("synthetic source regex")
});

/// Heuristic dataset mining over paper text.
#[derive(Debug, Clone)]
pub struct ArxivPaperParser {
    max_pages: usize,
    context_window: usize,
}

impl Default for ArxivPaperParser {
    fn default() -> Self {
        Self::from_config(&ArxivConfig::default())
    }
}

impl ArxivPaperParser {
    pub fn new(max_pages: usize, context_window: usize) -> Self {
        Self {
            max_pages,
            context_window,
        }
    }

    pub fn from_config(config: &ArxivConfig) -> Self {
        Self::new(config.max_pages, config.context_window)
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn extract_text(&self, pdf_bytes: &[u8]) -> String {
        extract_pdf_text(pdf_bytes, self.max_pages)
    }

    /// Like [`Self::extract_text`], off the async worker threads.
    pub async fn read_text(&self, pdf_bytes: Vec<u8>) -> String {
        let max_pages = self.max_pages;
        match tokio::task::spawn_blocking(move || extract_pdf_text(&pdf_bytes, max_pages)).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "pdf extraction task failed");
                String::new()
            }
        }
    }

    pub async fn parse_paper(&self, pdf_bytes: Vec<u8>) -> Vec<DatasetInfo> {
        let text = self.read_text(pdf_bytes).await;
        self.extract_datasets_from_text(&text)
    }

    pub fn parse_paper_sync(&self, pdf_bytes: &[u8]) -> Vec<DatasetInfo> {
        self.extract_datasets_from_text(&self.extract_text(pdf_bytes))
    }

    /// Catalog hits first, then "trained on X dataset" phrases, then synthetic
    /// data attributed to a generator. Unique by normalized name.
    pub fn extract_datasets_from_text(&self, text: &str) -> Vec<DatasetInfo> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        if text.trim().is_empty() {
            return found;
        }

        let mut catalog_spans = Vec::new();
        for entry in known_datasets() {
            if let Some((start, end)) = entry.find(text) {
                let info = self.describe(entry.name, text, start, end);
                push_unique(&mut found, &mut seen, info);
            }
            catalog_spans.extend(entry.find_all(text));
        }

        // A phrase naming a catalog dataset keeps the catalog name.
        for caps in TRAINED_ON.captures_iter(text) {
            let (Some(phrase), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let overlaps_catalog = catalog_spans
                .iter()
                .any(|&(start, end)| start < phrase.end() && phrase.start() < end);
            if overlaps_catalog {
                continue;
            }
            let info = self.describe(name.as_str(), text, name.start(), name.end());
            push_unique(&mut found, &mut seen, info);
        }

        for caps in SYNTHETIC_SOURCE.captures_iter(text) {
            let (Some(whole), Some(source)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let context = self.context_around(text, whole.start(), whole.end());
            let info = DatasetInfo::synthetic(
                format!("Synthetic data from {}", source.as_str()),
                Some(source.as_str().to_string()),
            )
            .with_hf_url(self.extract_url_from_context(&context))
            .with_context(context);
            push_unique(&mut found, &mut seen, info);
        }

        debug!(datasets = found.len(), "heuristic dataset extraction finished");
        found
    }

    fn describe(&self, name: &str, text: &str, start: usize, end: usize) -> DatasetInfo {
        let context = self.context_around(text, start, end);
        let hf_url = self.extract_url_from_context(&context);
        let info = match SYNTHETIC_SOURCE.captures(&context).and_then(|caps| caps.get(1)) {
            Some(source) => DatasetInfo::synthetic(name, Some(source.as_str().to_string())),
            None => DatasetInfo::public(name),
        };
        info.with_hf_url(hf_url).with_context(context)
    }

    /// Up to `context_window` characters either side of the first
    /// case-insensitive occurrence of `mention`.
    pub fn extract_context(&self, text: &str, mention: &str) -> String {
        let found = Regex::new(&format!("(?i){}", regex::escape(mention)))
            .ok()
            .and_then(|pattern| pattern.find(text));
        match found {
            Some(m) => self.context_around(text, m.start(), m.end()),
            None => String::new(),
        }
    }

    fn context_around(&self, text: &str, start: usize, end: usize) -> String {
        let begin = text[..start]
            .char_indices()
            .rev()
            .take(self.context_window)
            .last()
            .map_or(start, |(i, _)| i);
        let finish = text[end..]
            .char_indices()
            .nth(self.context_window)
            .map_or(text.len(), |(i, _)| end + i);
        text[begin..finish].trim().to_string()
    }

    pub fn extract_url_from_context(&self, context: &str) -> Option<String> {
        HUB_DATASET_URL
            .find(context)
            .map(|m| m.as_str().to_string())
    }

    /// Every hub dataset URL in `text`, in order, without repeats.
    pub fn extract_dataset_urls(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        HUB_DATASET_URL
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

fn push_unique(found: &mut Vec<DatasetInfo>, seen: &mut HashSet<String>, info: DatasetInfo) {
    if seen.insert(info.normalized_name()) {
        found.push(info);
    }
}

#[async_trait]
impl DatasetExtractor for ArxivPaperParser {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn extract(&self, paper: &PaperText) -> anyhow::Result<Vec<DatasetInfo>> {
        Ok(self.extract_datasets_from_text(&paper.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_context_is_bounded() {
        let parser = ArxivPaperParser::default();
        let text = "This is a long text. We used ImageNet dataset. More text here.";
        let context = parser.extract_context(text, "ImageNet");

        assert!(context.contains("ImageNet"));
        assert!(context.chars().count() <= 50 + "ImageNet".len() + 50);
    }

    #[test]
    fn test_extract_context_is_char_boundary_safe() {
        let parser = ArxivPaperParser::new(8, 3);
        let text = "日本語のコーパス ImageNet データセット";
        assert_eq!(parser.extract_context(text, "imagenet"), "パス ImageNet デー");
        assert_eq!(parser.extract_context(text, "missing"), "");
    }

    #[test]
    fn test_extract_url_from_context() {
        let parser = ArxivPaperParser::default();
        let url = parser
            .extract_url_from_context("Check https://huggingface.co/datasets/squad for details")
            .unwrap();
        assert_eq!(url, "https://huggingface.co/datasets/squad");
        assert_eq!(parser.extract_url_from_context("no links"), None);
    }
}
