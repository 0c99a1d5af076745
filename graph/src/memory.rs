use crate::store::{GraphStore, RelatedRecord, StoreError};
use async_trait::async_trait;
use lineage_core::model::{Entity, EntityKind, RawRecord};
use std::collections::HashMap;

/// Edge representation: (other_id, relation)
pub type EdgeData = (String, String);

/// Adjacency-list lineage graph held in memory.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    nodes: HashMap<String, (EntityKind, RawRecord)>,
    // derivative -> origins
    outgoing: HashMap<String, Vec<EdgeData>>,
    // origin -> derivatives
    incoming: HashMap<String, Vec<EdgeData>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_entity(&mut self, entity: &Entity) {
        let record = match entity {
            Entity::Model(model) => serde_json::to_value(model),
            Entity::Dataset(dataset) => serde_json::to_value(dataset),
        };
        if let Ok(record) = record {
            self.nodes
                .insert(entity.id().to_string(), (entity.kind(), record));
        }
    }

    /// Records that `derivative` was produced from `origin`.
    pub fn add_edge(&mut self, derivative: &str, origin: &str, relation: impl Into<String>) {
        let relation = relation.into();
        self.outgoing
            .entry(derivative.to_string())
            .or_default()
            .push((origin.to_string(), relation.clone()));
        self.incoming
            .entry(origin.to_string())
            .or_default()
            .push((derivative.to_string(), relation));
    }

    fn related(
        &self,
        adjacency: &HashMap<String, Vec<EdgeData>>,
        id: &str,
        limit: usize,
    ) -> Vec<RelatedRecord> {
        adjacency
            .get(id)
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|(other, relation)| {
                        self.nodes
                            .get(other)
                            .map(|(_, record)| RelatedRecord::new(record.clone(), relation.clone()))
                    })
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn find_root(&self, id: &str, kind: EntityKind) -> Result<Option<RawRecord>, StoreError> {
        Ok(self
            .nodes
            .get(id)
            .filter(|(node_kind, _)| *node_kind == kind)
            .map(|(_, record)| record.clone()))
    }

    async fn find_upstream(
        &self,
        id: &str,
        limit: usize,
    ) -> Result<Vec<RelatedRecord>, StoreError> {
        Ok(self.related(&self.outgoing, id, limit))
    }

    async fn find_downstream(
        &self,
        id: &str,
        limit: usize,
    ) -> Result<Vec<RelatedRecord>, StoreError> {
        Ok(self.related(&self.incoming, id, limit))
    }
}
