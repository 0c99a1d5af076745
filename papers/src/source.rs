use crate::arxiv::{pdf_url, ArxivLinkExtractor};
use async_trait::async_trait;
use lineage_core::config::ArxivConfig;
use lineage_core::error::{ErrorCode, LineageError};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PaperError {
    #[error("not an arXiv reference: {0}")]
    InvalidReference(String),
    #[error("arXiv returned HTTP {0}")]
    Status(u16),
    #[error("paper download failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for PaperError {
    fn from(err: reqwest::Error) -> Self {
        PaperError::Transport(err.to_string())
    }
}

impl LineageError for PaperError {
    fn error_code(&self) -> ErrorCode {
        match self {
            PaperError::InvalidReference(_) => ErrorCode::InvalidArgument,
            PaperError::Status(404) => ErrorCode::NotFound,
            PaperError::Status(_) | PaperError::Transport(_) => ErrorCode::Unavailable,
        }
    }
}

/// Raw PDF bytes for an arXiv URL or id.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn fetch_bytes(&self, arxiv_url_or_id: &str) -> Result<Vec<u8>, PaperError>;
}

pub struct ArxivHttpSource {
    client: reqwest::Client,
    base_url: String,
    links: ArxivLinkExtractor,
}

impl ArxivHttpSource {
    pub fn new(config: &ArxivConfig) -> Result<Self, PaperError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            links: ArxivLinkExtractor::new(),
        })
    }

    pub fn pdf_location(&self, arxiv_url_or_id: &str) -> Result<String, PaperError> {
        let id = self
            .links
            .normalize(arxiv_url_or_id)
            .ok_or_else(|| PaperError::InvalidReference(arxiv_url_or_id.to_string()))?;
        if self.base_url == "https://arxiv.org" {
            Ok(pdf_url(&id))
        } else {
            Ok(format!("{}/pdf/{}", self.base_url, id))
        }
    }
}

#[async_trait]
impl PaperSource for ArxivHttpSource {
    async fn fetch_bytes(&self, arxiv_url_or_id: &str) -> Result<Vec<u8>, PaperError> {
        let url = self.pdf_location(arxiv_url_or_id)?;
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PaperError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        info!(url = %url, bytes = bytes.len(), "downloaded paper");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_location() {
        let source = ArxivHttpSource::new(&ArxivConfig::default()).unwrap();
        assert_eq!(
            source.pdf_location("https://arxiv.org/abs/2307.09288v2").unwrap(),
            "https://arxiv.org/pdf/2307.09288"
        );

        let mirror = ArxivHttpSource::new(&ArxivConfig {
            base_url: "http://mirror.local/".to_string(),
            ..ArxivConfig::default()
        })
        .unwrap();
        assert_eq!(
            mirror.pdf_location("2307.09288").unwrap(),
            "http://mirror.local/pdf/2307.09288"
        );
        assert!(matches!(
            mirror.pdf_location("model card without paper"),
            Err(PaperError::InvalidReference(_))
        ));
    }
}
