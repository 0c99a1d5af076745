use async_trait::async_trait;
use hub::{DatasetUrlResolver, HubError, HubLookup};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers from a fixed table and counts lookups.
struct CountingLookup {
    answers: HashMap<&'static str, Result<(), HubError>>,
    calls: AtomicUsize,
}

impl CountingLookup {
    fn new(answers: Vec<(&'static str, Result<(), HubError>)>) -> Arc<Self> {
        Arc::new(Self {
            answers: answers.into_iter().collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HubLookup for CountingLookup {
    async fn dataset_exists(&self, name: &str) -> Result<(), HubError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .get(name)
            .cloned()
            .unwrap_or(Err(HubError::NotFound))
    }
}

#[tokio::test]
async fn test_existence_is_looked_up_once_per_name() {
    let lookup = CountingLookup::new(vec![("squad", Ok(()))]);
    let resolver = DatasetUrlResolver::new(lookup.clone());

    assert!(resolver.check_exists("squad").await);
    assert!(resolver.check_exists("squad").await);
    assert!(!resolver.check_exists("missing/dataset").await);
    assert!(!resolver.check_exists("missing/dataset").await);

    assert_eq!(lookup.calls(), 2);
    assert_eq!(resolver.cached_entries(), 2);
}

#[tokio::test]
async fn test_lookup_failures_are_false_and_cached() {
    let lookup = CountingLookup::new(vec![
        ("flaky/server", Err(HubError::Status(500))),
        ("flaky/network", Err(HubError::Transport("reset".to_string()))),
    ]);
    let resolver = DatasetUrlResolver::new(lookup.clone());

    assert!(!resolver.check_exists("flaky/server").await);
    assert!(!resolver.check_exists("flaky/network").await);
    assert!(!resolver.check_exists("flaky/server").await);
    assert_eq!(lookup.calls(), 2);
}

#[tokio::test]
async fn test_malformed_names_are_never_looked_up() {
    let lookup = CountingLookup::new(Vec::new());
    let resolver = DatasetUrlResolver::new(lookup.clone());

    assert!(!resolver.check_exists("Common Crawl").await);
    assert!(!resolver.check_exists("a/b/c").await);
    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn test_verified_url_only_for_existing_datasets() {
    let lookup = CountingLookup::new(vec![("allenai/c4", Ok(()))]);
    let resolver = DatasetUrlResolver::new(lookup);

    assert_eq!(
        resolver.verified_url("allenai/c4").await.as_deref(),
        Some("https://huggingface.co/datasets/allenai/c4")
    );
    assert_eq!(resolver.verified_url("nope").await, None);
}

#[tokio::test]
async fn test_warm_cache_serves_concurrent_checks() {
    let lookup = CountingLookup::new(vec![("squad", Ok(()))]);
    let resolver = Arc::new(DatasetUrlResolver::new(lookup.clone()));

    let first = resolver.check_exists("squad").await;
    let (a, b) = tokio::join!(resolver.check_exists("squad"), resolver.check_exists("squad"));
    assert!(first && a && b);
    assert_eq!(lookup.calls(), 1);
}

/// Yields mid-lookup so concurrent misses overlap.
struct YieldingLookup {
    calls: AtomicUsize,
}

#[async_trait]
impl HubLookup for YieldingLookup {
    async fn dataset_exists(&self, _name: &str) -> Result<(), HubError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_concurrent_misses_agree_and_leave_one_entry() {
    let lookup = Arc::new(YieldingLookup {
        calls: AtomicUsize::new(0),
    });
    let resolver = DatasetUrlResolver::new(lookup.clone());

    let (a, b) = tokio::join!(resolver.check_exists("squad"), resolver.check_exists("squad"));
    assert!(a && b);
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    assert_eq!(resolver.cached_entries(), 1);

    assert!(resolver.check_exists("squad").await);
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
}
