use regex::Regex;
use std::sync::LazyLock;

pub const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";
pub const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";

static ARXIV_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)arxiv\.org/(?:abs|pdf)/(\d{4}\.\d{4,5})(?:v\d+)?(?:\.pdf)?")
        .expect("arxiv link regex")
});

static ARXIV_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\barxiv:\s?(\d{4}\.\d{4,5})(?:v\d+)?").expect("arxiv citation regex")
});

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}\.\d{4,5})(?:v\d+)?$").expect("arxiv id regex"));

/// Finds the arXiv paper a model card points to.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArxivLinkExtractor;

impl ArxivLinkExtractor {
    pub fn new() -> Self {
        Self
    }

    /// First arXiv id in `text`, version suffix dropped. Links win over
    /// `arXiv:` citations.
    pub fn extract_arxiv_id(&self, text: &str) -> Option<String> {
        ARXIV_LINK
            .captures(text)
            .or_else(|| ARXIV_CITATION.captures(text))
            .map(|caps| caps[1].to_string())
    }

    /// Canonical abstract URL for the first arXiv reference in a model card.
    pub fn extract(&self, card_text: &str) -> Option<String> {
        self.extract_arxiv_id(card_text).map(|id| abs_url(&id))
    }

    /// Accepts a URL, a citation or a bare id.
    pub fn normalize(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        BARE_ID
            .captures(reference)
            .map(|caps| caps[1].to_string())
            .or_else(|| self.extract_arxiv_id(reference))
    }
}

pub fn abs_url(id: &str) -> String {
    format!("{ARXIV_ABS_URL}/{id}")
}

pub fn pdf_url(id: &str) -> String {
    format!("{ARXIV_PDF_URL}/{id}")
}
