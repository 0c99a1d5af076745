use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// Base URL of the Neo4j HTTP endpoint.
    pub uri: String,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: None,
            database: "neo4j".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://huggingface.co".to_string(),
            token: None,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ArxivConfig {
    pub base_url: String,
    pub max_pages: usize,
    /// Characters kept on each side of a dataset mention.
    pub context_window: usize,
    pub timeout_secs: u64,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: "https://arxiv.org".to_string(),
            max_pages: 8,
            context_window: 50,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Without a key the LLM extraction layer is disabled.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_chars: usize,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_chars: 10_000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    pub max_concurrent: usize,
    pub use_llm: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            use_llm: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RiskWeights {
    pub synthetic_source: u32,
    pub english_centric: u32,
    pub known_large_crawl: u32,
    pub no_verified_source: u32,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            synthetic_source: 1,
            english_centric: 1,
            known_large_crawl: 1,
            no_verified_source: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RiskConfig {
    /// Scores at or above this are `high`; any other flagged score is `medium`.
    pub high_threshold: u32,
    pub weights: RiskWeights,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_threshold: 2,
            weights: RiskWeights::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub graph: GraphConfig,
    pub hub: HubConfig,
    pub arxiv: ArxivConfig,
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub risk: RiskConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Layers `<dir>/default`, `<dir>/<RUN_MODE>` and `LINEAGE__SECTION__KEY` env vars.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::from(dir.join("default")).required(false))
            .add_source(File::from(dir.join(&run_mode)).required(false))
            .add_source(Environment::with_prefix("LINEAGE").separator("__"));

        builder.build()?.try_deserialize()
    }
}
