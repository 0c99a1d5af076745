//! Per-query sharing of intermediate tool results.
//!
//! Every query runs inside [`scoped`], which installs task-local slots for the
//! request context and the progress callback. Stages invoked anywhere in that
//! task publish and read results through the free functions below; queries
//! running concurrently each see only their own slots. The two slots are
//! independent: replacing or clearing one leaves the other untouched.
//!
//! Work handed to `tokio::spawn` does not inherit the slots; fan-out inside a
//! query stays on the query's task (see the extraction orchestrator).

use dashmap::DashMap;
use serde_json::Value;
use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

tokio::task_local! {
    static REQUEST_CONTEXT: RefCell<Option<RequestContext>>;
    static PROGRESS_CALLBACK: RefCell<Option<ProgressCallback>>;
}

pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Result store for one query. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: String,
    results: Arc<DashMap<String, Value>>,
}

impl RequestContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            results: Arc::new(DashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn insert(&self, tool_name: &str, value: Value) {
        self.results.insert(tool_name.to_string(), value);
    }

    pub fn get(&self, tool_name: &str) -> Option<Value> {
        self.results.get(tool_name).map(|entry| entry.value().clone())
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.results.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// Runs `future` with fresh tool-state slots, seeded with `context`.
pub async fn scoped<F: Future>(context: Option<RequestContext>, future: F) -> F::Output {
    REQUEST_CONTEXT
        .scope(
            RefCell::new(context),
            PROGRESS_CALLBACK.scope(RefCell::new(None), future),
        )
        .await
}

pub fn set_context(context: Option<RequestContext>) {
    if REQUEST_CONTEXT
        .try_with(|slot| *slot.borrow_mut() = context)
        .is_err()
    {
        warn!("set_context called outside a tool-state scope; ignored");
    }
}

pub fn get_context() -> Option<RequestContext> {
    REQUEST_CONTEXT
        .try_with(|slot| slot.borrow().clone())
        .ok()
        .flatten()
}

pub fn set_result(tool_name: &str, value: Value) {
    match get_context() {
        Some(context) => context.insert(tool_name, value),
        None => warn!(
            tool = tool_name,
            "no request context available; tool result not stored"
        ),
    }
}

/// Reads a tool result from `context`, or from the current scope when `None`.
pub fn get_result(tool_name: &str, context: Option<&RequestContext>) -> Option<Value> {
    match context {
        Some(context) => context.get(tool_name),
        None => get_context().and_then(|context| context.get(tool_name)),
    }
}

pub fn set_progress_callback(callback: Option<ProgressCallback>) {
    if PROGRESS_CALLBACK
        .try_with(|slot| *slot.borrow_mut() = callback)
        .is_err()
    {
        warn!("set_progress_callback called outside a tool-state scope; ignored");
    }
}

pub fn get_progress_callback() -> Option<ProgressCallback> {
    PROGRESS_CALLBACK
        .try_with(|slot| slot.borrow().clone())
        .ok()
        .flatten()
}

/// Sends `message` to the current progress callback, if one is installed.
pub fn report_progress(message: &str) {
    if let Some(callback) = get_progress_callback() {
        callback(message);
    }
}
