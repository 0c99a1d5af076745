use crate::store::{GraphStore, RelatedRecord, StoreError};
use async_trait::async_trait;
use lineage_core::config::GraphConfig;
use lineage_core::model::{EntityKind, RawRecord};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const UPSTREAM_QUERY: &str = "MATCH (root)-[r]->(upstream) \
     WHERE root.model_id = $id OR root.dataset_id = $id \
     RETURN upstream, type(r) AS rel_type LIMIT $limit";

const DOWNSTREAM_QUERY: &str = "MATCH (downstream)-[r]->(root) \
     WHERE root.model_id = $id OR root.dataset_id = $id \
     RETURN downstream, type(r) AS rel_type LIMIT $limit";

#[derive(Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Serialize)]
struct TxRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// Graph store backed by the Neo4j transactional HTTP endpoint.
pub struct Neo4jHttpStore {
    client: reqwest::Client,
    commit_url: String,
    user: String,
    password: Option<String>,
}

impl Neo4jHttpStore {
    pub fn new(config: &GraphConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            commit_url: format!(
                "{}/db/{}/tx/commit",
                config.uri.trim_end_matches('/'),
                config.database
            ),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    async fn run(&self, statement: &str, parameters: Value) -> Result<Vec<Vec<Value>>, StoreError> {
        let started = Instant::now();
        let body = TxRequest {
            statements: vec![Statement {
                statement,
                parameters,
            }],
        };

        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.user, self.password.as_deref())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Connection(format!(
                "neo4j returned HTTP {status}"
            )));
        }

        let payload: TxResponse = response.json().await?;
        if let Some(err) = payload.errors.into_iter().next() {
            return Err(StoreError::Query {
                code: err.code,
                message: err.message,
            });
        }

        let rows: Vec<Vec<Value>> = payload
            .results
            .into_iter()
            .flat_map(|result| result.data.into_iter().map(|row| row.row))
            .collect();

        info!(
            records = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "graph query finished"
        );
        Ok(rows)
    }

    async fn related(
        &self,
        statement: &str,
        id: &str,
        limit: usize,
    ) -> Result<Vec<RelatedRecord>, StoreError> {
        let rows = self
            .run(statement, json!({ "id": id, "limit": limit }))
            .await?;

        rows.into_iter()
            .map(|row| {
                let mut cells = row.into_iter();
                let record = cells.next().ok_or_else(|| {
                    StoreError::InvalidResponse("row without a node column".to_string())
                })?;
                let relationship_type = cells
                    .next()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .ok_or_else(|| {
                        StoreError::InvalidResponse("row without a rel_type column".to_string())
                    })?;
                Ok(RelatedRecord::new(record, relationship_type))
            })
            .collect()
    }
}

fn root_query(kind: EntityKind) -> String {
    format!(
        "MATCH (root:{} {{{}: $id}}) RETURN root LIMIT 1",
        kind.label(),
        kind.id_field()
    )
}

#[async_trait]
impl GraphStore for Neo4jHttpStore {
    async fn find_root(&self, id: &str, kind: EntityKind) -> Result<Option<RawRecord>, StoreError> {
        debug!(id, %kind, "looking up root node");
        let rows = self.run(&root_query(kind), json!({ "id": id })).await?;
        Ok(rows.into_iter().next().and_then(|row| row.into_iter().next()))
    }

    async fn find_upstream(
        &self,
        id: &str,
        limit: usize,
    ) -> Result<Vec<RelatedRecord>, StoreError> {
        self.related(UPSTREAM_QUERY, id, limit).await
    }

    async fn find_downstream(
        &self,
        id: &str,
        limit: usize,
    ) -> Result<Vec<RelatedRecord>, StoreError> {
        self.related(DOWNSTREAM_QUERY, id, limit).await
    }
}
