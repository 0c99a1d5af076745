use crate::client::{HubError, HubLookup};
use dashmap::DashMap;
use lineage_core::model::DatasetRecord;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

pub const HUB_DATASETS_URL: &str = "https://huggingface.co/datasets";

static DATASET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+(/[\w.-]+)?$").expect("dataset id regex"));

/// `name` or `author/name`, made of word characters, dots and dashes.
pub fn looks_like_dataset_id(name: &str) -> bool {
    DATASET_ID.is_match(name)
}

/// Attaches hub URLs to dataset records, memoizing existence lookups.
pub struct DatasetUrlResolver {
    lookup: Arc<dyn HubLookup>,
    cache: DashMap<String, bool>,
}

impl DatasetUrlResolver {
    pub fn new(lookup: Arc<dyn HubLookup>) -> Self {
        Self {
            lookup,
            cache: DashMap::new(),
        }
    }

    /// Whether the hub knows `name`. Malformed names are never looked up and
    /// each distinct name is looked up at most once per resolver.
    pub async fn check_exists(&self, name: &str) -> bool {
        if !looks_like_dataset_id(name) {
            return false;
        }
        if let Some(known) = self.cache.get(name) {
            return *known;
        }

        let exists = match self.lookup.dataset_exists(name).await {
            Ok(()) => true,
            Err(HubError::NotFound) => false,
            Err(err) => {
                warn!(dataset = name, error = %err, "dataset lookup failed");
                false
            }
        };
        debug!(dataset = name, exists, "dataset existence resolved");
        self.cache.insert(name.to_string(), exists);
        exists
    }

    /// Canonical dataset page when the hub confirms `name` exists.
    pub async fn verified_url(&self, name: &str) -> Option<String> {
        if self.check_exists(name).await {
            Some(format!("{HUB_DATASETS_URL}/{name}"))
        } else {
            None
        }
    }

    /// An existing URL is kept verbatim; otherwise a hub search URL for the name.
    pub fn resolve_url(&self, name: &str, existing: Option<&str>) -> String {
        match existing {
            Some(url) if !url.trim().is_empty() => url.to_string(),
            _ => search_url(name),
        }
    }

    pub fn enrich(&self, records: Vec<DatasetRecord>) -> Vec<DatasetRecord> {
        records
            .into_iter()
            .map(|mut record| {
                record.url = Some(self.resolve_url(&record.name, record.url.as_deref()));
                record
            })
            .collect()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

fn search_url(name: &str) -> String {
    let query = name.trim().to_lowercase();
    match reqwest::Url::parse_with_params(HUB_DATASETS_URL, &[("search", query.as_str())]) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{HUB_DATASETS_URL}?search={query}"),
    }
}
