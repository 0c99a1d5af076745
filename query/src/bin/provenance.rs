use anyhow::Context;
use lineage_core::config::AppConfig;
use lineage_core::tool_state::ProgressCallback;
use query::ProvenanceService;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lineage_core::init_tracing();

    let entity_id = std::env::args()
        .nth(1)
        .context("usage: provenance <model-or-dataset-id>")?;
    let config = AppConfig::load().context("failed to load configuration")?;
    let service = ProvenanceService::from_config(&config)?;

    let progress: ProgressCallback = Arc::new(|message: &str| info!("{message}"));
    let report = service
        .query_with_progress(&entity_id, Some(progress))
        .await?;
    if report.is_empty() {
        info!(id = %entity_id, "no lineage found");
    }

    println!("{}", report.to_json()?);
    Ok(())
}
