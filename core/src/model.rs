use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;

/// Raw property map as returned by a graph store.
pub type RawRecord = Value;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntityError {
    #[error("record is not an object")]
    NotAnObject,
    #[error("record has neither a model_id nor a dataset_id (keys: {0:?})")]
    UnrecognizedShape(Vec<String>),
    #[error("invalid {kind} record: {reason}")]
    Invalid { kind: EntityKind, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Model,
    Dataset,
}

impl EntityKind {
    /// Node label used by the graph store.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Model => "Model",
            EntityKind::Dataset => "Dataset",
        }
    }

    pub fn id_field(&self) -> &'static str {
        match self {
            EntityKind::Model => "model_id",
            EntityKind::Dataset => "dataset_id",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Model => write!(f, "model"),
            EntityKind::Dataset => write!(f, "dataset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub model_id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pipeline_tag: Option<String>,
    #[serde(default)]
    pub library_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Model {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            author: None,
            downloads: None,
            likes: None,
            tags: Vec::new(),
            pipeline_tag: None,
            library_name: None,
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub dataset_id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Dataset {
    pub fn new(dataset_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            author: None,
            downloads: None,
            likes: None,
            tags: Vec::new(),
            url: None,
        }
    }
}

/// A node of the lineage graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum Entity {
    Model(Model),
    Dataset(Dataset),
}

impl Entity {
    /// Decodes a raw store record: a non-empty `model_id` makes a model, a
    /// non-empty `dataset_id` makes a dataset. Anything else is rejected.
    pub fn from_record(record: &RawRecord) -> Result<Self, EntityError> {
        let object = record.as_object().ok_or(EntityError::NotAnObject)?;

        if has_string_id(object, EntityKind::Model.id_field()) {
            return decode(record, EntityKind::Model).map(Entity::Model);
        }
        if has_string_id(object, EntityKind::Dataset.id_field()) {
            return decode(record, EntityKind::Dataset).map(Entity::Dataset);
        }

        Err(EntityError::UnrecognizedShape(object.keys().cloned().collect()))
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Model(m) => &m.model_id,
            Entity::Dataset(d) => &d.dataset_id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Model(_) => EntityKind::Model,
            Entity::Dataset(_) => EntityKind::Dataset,
        }
    }
}

fn has_string_id(object: &Map<String, Value>, field: &str) -> bool {
    object
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|id| !id.trim().is_empty())
}

fn decode<T: serde::de::DeserializeOwned>(
    record: &RawRecord,
    kind: EntityKind,
) -> Result<T, EntityError> {
    serde_json::from_value(record.clone()).map_err(|err| EntityError::Invalid {
        kind,
        reason: err.to_string(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Provenance edge. `source` is always the derivative and `target` the origin,
/// so every edge reads "source <relationship_type> target".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub relationship_type: String,
}

impl Relationship {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship_type: relationship_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GraphNeighborhood {
    pub nodes: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub queried_id: Option<String>,
}

impl GraphNeighborhood {
    pub fn empty(queried_id: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            relationships: Vec::new(),
            queried_id: Some(queried_id.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&Entity> {
        self.nodes.first()
    }

    /// Model node ids in node order (root first).
    pub fn model_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|node| node.kind() == EntityKind::Model)
            .map(|node| node.id().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatasetType {
    #[default]
    PublicDataset,
    Synthetic,
}

/// A training dataset mentioned in a paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub dataset_type: DatasetType,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: String,
    #[serde(default)]
    pub hf_url: Option<String>,
}

impl DatasetInfo {
    pub fn public(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dataset_type: DatasetType::PublicDataset,
            source: None,
            context: String::new(),
            hf_url: None,
        }
    }

    pub fn synthetic(name: impl Into<String>, source: Option<String>) -> Self {
        Self {
            dataset_type: DatasetType::Synthetic,
            source,
            ..Self::public(name)
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_hf_url(mut self, url: Option<String>) -> Self {
        self.hf_url = url;
        self
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Trimmed, lowercased, whitespace-collapsed form used to dedupe dataset names.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Paper-derived provenance of one model. No arXiv link means no datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPaperInfo {
    pub model_id: String,
    pub arxiv_url: Option<String>,
    #[serde(default)]
    pub datasets: Vec<DatasetInfo>,
}

impl ModelPaperInfo {
    pub fn empty(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            arxiv_url: None,
            datasets: Vec::new(),
        }
    }
}

/// Loosely-shaped dataset record (`name`, `description`, `url`, anything else kept).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatasetRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            url: None,
            extra: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }
}

impl From<&DatasetInfo> for DatasetRecord {
    fn from(info: &DatasetInfo) -> Self {
        let mut record = DatasetRecord::new(info.name.clone()).with_url(info.hf_url.clone());
        // The paper excerpt is kept but not scored.
        record.description = match (info.dataset_type, &info.source) {
            (DatasetType::Synthetic, Some(source)) => Some(format!("synthetic data from {source}")),
            (DatasetType::Synthetic, None) => Some("synthetic data".to_string()),
            (DatasetType::PublicDataset, _) => None,
        };
        if !info.context.is_empty() {
            record
                .extra
                .insert("context".to_string(), Value::String(info.context.clone()));
        }
        record
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskIndicator {
    SyntheticSource,
    EnglishCentric,
    KnownLargeCrawl,
    NoVerifiedSource,
    NoSpecificFlags,
}

impl RiskIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskIndicator::SyntheticSource => "synthetic_source",
            RiskIndicator::EnglishCentric => "english_centric",
            RiskIndicator::KnownLargeCrawl => "known_large_crawl",
            RiskIndicator::NoVerifiedSource => "no_verified_source",
            RiskIndicator::NoSpecificFlags => "no_specific_flags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub indicators: BTreeSet<RiskIndicator>,
    pub url_present: bool,
}
