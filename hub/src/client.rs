use async_trait::async_trait;
use lineage_core::config::HubConfig;
use lineage_core::error::{ErrorCode, LineageError};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("not found on the hub")]
    NotFound,
    #[error("hub returned HTTP {0}")]
    Status(u16),
    #[error("hub request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for HubError {
    fn from(err: reqwest::Error) -> Self {
        HubError::Transport(err.to_string())
    }
}

impl LineageError for HubError {
    fn error_code(&self) -> ErrorCode {
        match self {
            HubError::NotFound => ErrorCode::NotFound,
            HubError::Status(_) | HubError::Transport(_) => ErrorCode::Unavailable,
        }
    }
}

/// Dataset existence on the hub. `Err(HubError::NotFound)` means the dataset
/// does not exist; every other error means the answer is unknown.
#[async_trait]
pub trait HubLookup: Send + Sync {
    async fn dataset_exists(&self, name: &str) -> Result<(), HubError>;
}

/// Model card (README) text for a model id; `Ok(None)` when it has no card.
#[async_trait]
pub trait ModelCardSource: Send + Sync {
    async fn model_card(&self, model_id: &str) -> Result<Option<String>, HubError>;
}

pub struct HfHubClient {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HfHubClient {
    pub fn new(config: &HubConfig) -> Result<Self, HubError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, HubError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(HubError::NotFound),
            status => Err(HubError::Status(status.as_u16())),
        }
    }

    fn dataset_info_url(&self, name: &str) -> String {
        format!("{}/api/datasets/{}", self.endpoint, name)
    }

    fn model_card_url(&self, model_id: &str) -> String {
        format!("{}/{}/raw/main/README.md", self.endpoint, model_id)
    }
}

#[async_trait]
impl HubLookup for HfHubClient {
    async fn dataset_exists(&self, name: &str) -> Result<(), HubError> {
        debug!(dataset = name, "checking dataset on the hub");
        self.get(&self.dataset_info_url(name)).await.map(|_| ())
    }
}

#[async_trait]
impl ModelCardSource for HfHubClient {
    async fn model_card(&self, model_id: &str) -> Result<Option<String>, HubError> {
        match self.get(&self.model_card_url(model_id)).await {
            Ok(response) => Ok(Some(response.text().await?)),
            Err(HubError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
