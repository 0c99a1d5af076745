use crate::risk::RiskContext;
use lineage_core::model::{GraphNeighborhood, ModelPaperInfo};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything one provenance query produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvenanceReport {
    pub neighborhood: GraphNeighborhood,
    pub training_datasets: BTreeMap<String, ModelPaperInfo>,
    pub dataset_risk: RiskContext,
}

impl ProvenanceReport {
    pub fn is_empty(&self) -> bool {
        self.neighborhood.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
