use async_trait::async_trait;
use graph::{GraphStore, MemoryGraphStore, NeighborhoodResolver, RelatedRecord, StoreError};
use hub::{DatasetUrlResolver, HubError, HubLookup, ModelCardSource};
use jobs::DatasetExtractionOrchestrator;
use lineage_core::error::{ErrorCode, LineageError};
use lineage_core::model::{Dataset, Entity, EntityKind, GraphNeighborhood, Model, RawRecord};
use lineage_core::tool_state::{self, ProgressCallback, RequestContext};
use papers::{ArxivPaperParser, PaperError, PaperSource};
use query::{ProvenanceService, QueryError, RiskEngine};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const CARD: &str = "# Base model\nPaper: https://arxiv.org/abs/2001.00001";

struct Cards(HashMap<&'static str, &'static str>);

#[async_trait]
impl ModelCardSource for Cards {
    async fn model_card(&self, model_id: &str) -> Result<Option<String>, HubError> {
        Ok(self.0.get(model_id).map(|card| card.to_string()))
    }
}

/// Serves bytes no PDF reader accepts; counts downloads.
struct JunkPapers {
    fetched: AtomicUsize,
}

#[async_trait]
impl PaperSource for JunkPapers {
    async fn fetch_bytes(&self, _arxiv_url_or_id: &str) -> Result<Vec<u8>, PaperError> {
        self.fetched.fetch_add(1, Ordering::SeqCst);
        Ok(b"%PDF-garbage".to_vec())
    }
}

struct NoDatasets {
    calls: AtomicUsize,
}

#[async_trait]
impl HubLookup for NoDatasets {
    async fn dataset_exists(&self, _name: &str) -> Result<(), HubError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HubError::NotFound)
    }
}

struct UnreachableStore;

#[async_trait]
impl GraphStore for UnreachableStore {
    async fn find_root(&self, _id: &str, _kind: EntityKind) -> Result<Option<RawRecord>, StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn find_upstream(&self, _id: &str, _limit: usize) -> Result<Vec<RelatedRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn find_downstream(&self, _id: &str, _limit: usize) -> Result<Vec<RelatedRecord>, StoreError> {
        Ok(Vec::new())
    }
}

fn lineage_store() -> MemoryGraphStore {
    let mut store = MemoryGraphStore::new();
    store.insert_entity(&Entity::Model(Model::new("org/base")));
    store.insert_entity(&Entity::Model(Model::new("org/chat")));
    store.insert_entity(&Entity::Model(Model::new("someone/quantized")));
    store.insert_entity(&Entity::Dataset(Dataset::new("the_pile")));

    store.add_edge("org/chat", "org/base", "FINE_TUNED");
    store.add_edge("org/base", "the_pile", "TRAINED_ON");
    store.add_edge("someone/quantized", "org/chat", "QUANTIZED");
    store
}

struct Fixture {
    service: ProvenanceService,
    papers: Arc<JunkPapers>,
}

fn fixture(store: Arc<dyn GraphStore>) -> Fixture {
    let papers = Arc::new(JunkPapers {
        fetched: AtomicUsize::new(0),
    });
    let cards = Arc::new(Cards(HashMap::from([("org/base", CARD)])));
    let orchestrator =
        DatasetExtractionOrchestrator::new(cards, papers.clone(), ArxivPaperParser::default());
    let hub = Arc::new(NoDatasets {
        calls: AtomicUsize::new(0),
    });

    let service = ProvenanceService::new(
        NeighborhoodResolver::new(store),
        Arc::new(orchestrator),
        RiskEngine::default(),
    )
    .with_url_resolver(Arc::new(DatasetUrlResolver::new(hub)))
    .with_max_concurrent(2);
    Fixture { service, papers }
}

fn assert_send<T: Send>(_: T) {}

#[test]
fn test_query_futures_can_move_across_threads() {
    let Fixture { service, .. } = fixture(Arc::new(lineage_store()));
    assert_send(service.query("org/base"));
    assert_send(service.query_with_progress("org/base", None));
    assert_send(service.extract_training_datasets(None));
}

#[tokio::test]
async fn test_query_reports_neighborhood_papers_and_risk() {
    let Fixture { service, papers } = fixture(Arc::new(lineage_store()));
    let report = service.query("org/chat").await.unwrap();

    assert_eq!(report.neighborhood.root().unwrap().id(), "org/chat");
    assert_eq!(report.neighborhood.nodes.len(), 3);

    let ids: Vec<&str> = report.training_datasets.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["org/base", "org/chat", "someone/quantized"]);
    assert_eq!(
        report.training_datasets["org/base"].arxiv_url.as_deref(),
        Some("https://arxiv.org/abs/2001.00001")
    );
    assert!(report.training_datasets["org/chat"].arxiv_url.is_none());
    assert_eq!(papers.fetched.load(Ordering::SeqCst), 1);

    assert_eq!(report.dataset_risk.models.len(), 3);
    assert_eq!(report.dataset_risk.global_counts.unknown_models, 3);
    assert_eq!(report.dataset_risk.global_counts.high, 0);
}

#[tokio::test]
async fn test_unknown_id_yields_empty_report() {
    let Fixture { service, papers } = fixture(Arc::new(lineage_store()));
    let report = service.query("nobody/nothing").await.unwrap();

    assert!(report.is_empty());
    assert!(report.training_datasets.is_empty());
    assert!(report.dataset_risk.models.is_empty());
    assert_eq!(papers.fetched.load(Ordering::SeqCst), 0);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["neighborhood"]["queried_id"], "nobody/nothing");
    assert_eq!(json["dataset_risk"]["global_counts"]["unknown_models"], 0);
}

#[tokio::test]
async fn test_stages_publish_results_to_the_request_context() {
    let Fixture { service, .. } = fixture(Arc::new(lineage_store()));
    let context = RequestContext::new("org/base");

    tool_state::scoped(Some(context.clone()), async {
        service.search_neo4j("org/base").await.unwrap();
        let papers = service.extract_training_datasets(None).await;
        service.dataset_risk(&papers);
    })
    .await;

    assert_eq!(
        context.tool_names(),
        vec!["dataset_risk", "extract_training_datasets", "search_neo4j"]
    );
    let neighborhood: GraphNeighborhood =
        serde_json::from_value(context.get("search_neo4j").unwrap()).unwrap();
    assert_eq!(neighborhood.model_ids(), vec!["org/base", "org/chat"]);

    let extracted = context.get("extract_training_datasets").unwrap();
    assert!(extracted["org/base"]["datasets"].as_array().unwrap().is_empty());
    assert_eq!(
        context.get("dataset_risk").unwrap()["global_counts"]["unknown_models"],
        2
    );
}

#[tokio::test]
async fn test_explicit_model_ids_skip_the_published_neighborhood() {
    let Fixture { service, papers } = fixture(Arc::new(lineage_store()));
    let papers_found = tool_state::scoped(Some(RequestContext::new("q")), async {
        service
            .extract_training_datasets(Some(vec!["org/base".to_string()]))
            .await
    })
    .await;

    assert_eq!(papers_found.len(), 1);
    assert_eq!(papers.fetched.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_progress_callback_sees_each_model() {
    let Fixture { service, .. } = fixture(Arc::new(lineage_store()));
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let progress: ProgressCallback = Arc::new(move |msg: &str| {
        sink.lock().unwrap().push(msg.to_string());
    });

    service
        .query_with_progress("org/chat", Some(progress))
        .await
        .unwrap();
    assert_eq!(messages.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_store_failure_fails_the_query() {
    let Fixture { service, .. } = fixture(Arc::new(UnreachableStore));
    let err = service.query("org/base").await.unwrap_err();

    assert!(matches!(err, QueryError::Graph(StoreError::Connection(_))));
    assert_eq!(err.error_code(), ErrorCode::Unavailable);
}

#[tokio::test]
async fn test_blank_id_is_rejected() {
    let Fixture { service, .. } = fixture(Arc::new(lineage_store()));
    let err = service.query("   ").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_queries_keep_separate_results() {
    let service = Arc::new(fixture(Arc::new(lineage_store())).service);
    let first = RequestContext::new("the_pile");
    let second = RequestContext::new("someone/quantized");

    let run = |context: RequestContext| {
        let service = service.clone();
        tokio::spawn(async move {
            let report = service.query(context.id()).await.unwrap();
            let scoped = tool_state::scoped(Some(context.clone()), async {
                service.search_neo4j(context.id()).await.unwrap();
                service.extract_training_datasets(None).await
            })
            .await;
            assert_eq!(report.training_datasets, scoped);
            scoped
        })
    };
    let (a, b) = tokio::join!(run(first.clone()), run(second.clone()));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.keys().collect::<Vec<_>>(), vec!["org/base"]);
    assert_eq!(
        b.keys().collect::<Vec<_>>(),
        vec!["org/chat", "someone/quantized"]
    );
    for (context, expected) in [(&first, "the_pile"), (&second, "someone/quantized")] {
        let published = context.get("search_neo4j").unwrap();
        assert_eq!(published["queried_id"], expected);
    }
}
