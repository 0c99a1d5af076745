use crate::store::{GraphStore, RelatedRecord, StoreError};
use lineage_core::model::{Entity, EntityKind, GraphNeighborhood, RawRecord, Relationship};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Neighbors fetched per direction.
pub const MAX_RELATED: usize = 10;

/// Resolves the one-hop provenance neighborhood of a model or dataset.
pub struct NeighborhoodResolver {
    store: Arc<dyn GraphStore>,
    max_related: usize,
}

impl NeighborhoodResolver {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            max_related: MAX_RELATED,
        }
    }

    /// Lowers the per-direction cap. Values above [`MAX_RELATED`] are clamped.
    pub fn with_max_related(mut self, max_related: usize) -> Self {
        self.max_related = max_related.min(MAX_RELATED);
        self
    }

    /// Root first, then upstream and downstream neighbors, unique by id.
    /// An unknown id yields an empty neighborhood, a store failure an error.
    pub async fn resolve(&self, entity_id: &str) -> Result<GraphNeighborhood, StoreError> {
        let started = Instant::now();

        let Some(root) = self.find_root(entity_id).await? else {
            info!(id = entity_id, "entity not found in lineage graph");
            return Ok(GraphNeighborhood::empty(entity_id));
        };
        let root_id = root.id().to_string();
        let limit = self.max_related;

        let (upstream, downstream) = tokio::try_join!(
            self.store.find_upstream(&root_id, limit),
            self.store.find_downstream(&root_id, limit),
        )?;

        let mut neighborhood = GraphNeighborhood::empty(entity_id);
        let mut seen_nodes = HashSet::new();
        let mut seen_edges = HashSet::new();
        seen_nodes.insert(root_id.clone());
        neighborhood.nodes.push(root);

        for related in upstream.into_iter().take(limit) {
            if let Some(node) = parse_related(&related) {
                let edge = Relationship::new(&root_id, node.id(), &related.relationship_type);
                push_unique(&mut neighborhood, &mut seen_nodes, &mut seen_edges, node, edge);
            }
        }
        for related in downstream.into_iter().take(limit) {
            if let Some(node) = parse_related(&related) {
                let edge = Relationship::new(node.id(), &root_id, &related.relationship_type);
                push_unique(&mut neighborhood, &mut seen_nodes, &mut seen_edges, node, edge);
            }
        }

        info!(
            id = entity_id,
            nodes = neighborhood.nodes.len(),
            relationships = neighborhood.relationships.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "resolved lineage neighborhood"
        );
        Ok(neighborhood)
    }

    async fn find_root(&self, entity_id: &str) -> Result<Option<Entity>, StoreError> {
        for kind in [EntityKind::Model, EntityKind::Dataset] {
            let record = self.store.find_root(entity_id, kind).await?;
            if let Some(entity) = record.as_ref().and_then(parse_record) {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }
}

fn parse_record(record: &RawRecord) -> Option<Entity> {
    match Entity::from_record(record) {
        Ok(entity) => Some(entity),
        Err(err) => {
            warn!(error = %err, "dropping malformed graph record");
            None
        }
    }
}

fn parse_related(related: &RelatedRecord) -> Option<Entity> {
    parse_record(&related.record)
}

fn push_unique(
    neighborhood: &mut GraphNeighborhood,
    seen_nodes: &mut HashSet<String>,
    seen_edges: &mut HashSet<(String, String, String)>,
    node: Entity,
    edge: Relationship,
) {
    let key = (
        edge.source.clone(),
        edge.target.clone(),
        edge.relationship_type.clone(),
    );
    if seen_edges.insert(key) {
        neighborhood.relationships.push(edge);
    }
    if seen_nodes.insert(node.id().to_string()) {
        neighborhood.nodes.push(node);
    }
}
