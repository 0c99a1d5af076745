pub mod client;
pub mod resolver;

pub use client::{HfHubClient, HubError, HubLookup, ModelCardSource};
pub use resolver::{looks_like_dataset_id, DatasetUrlResolver, HUB_DATASETS_URL};
