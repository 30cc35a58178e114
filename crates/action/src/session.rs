//! Per-call state shared by an action and everything it spawns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::cache::{CacheConfig, ResultCache};
use crate::error::SessionError;
use crate::tasks::TaskQueue;

type ValueMap = Arc<RwLock<IndexMap<String, Value>>>;

struct Shared {
    tasks: TaskQueue,
    cache: ResultCache,
    finalized: AtomicBool,
}

/// Session state for one top-level call.
///
/// The task queue and result cache are shared by every session derived
/// through [`clone_scoped`](Self::clone_scoped); autofill values and scratch
/// data are copied so a nested action cannot leak them back to its caller.
/// Plain `clone` shares everything.
///
/// Queued action tasks hold their own session, so the queue keeps the shared
/// state alive until [`finalize`](Self::finalize) empties it.
#[derive(Clone)]
pub struct Session {
    autofill: ValueMap,
    scratch: ValueMap,
    shared: Arc<Shared>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache_config(CacheConfig::default())
    }

    #[must_use]
    pub fn with_cache_config(config: CacheConfig) -> Self {
        Self {
            autofill: ValueMap::default(),
            scratch: ValueMap::default(),
            shared: Arc::new(Shared {
                tasks: TaskQueue::new(),
                cache: ResultCache::new(config),
                finalized: AtomicBool::new(false),
            }),
        }
    }

    /// Value published under an autofill key.
    pub fn autofill(&self, key: &str) -> Option<Value> {
        self.autofill.read().get(key).cloned()
    }

    pub fn set_autofill(&self, key: impl Into<String>, value: Value) {
        self.autofill.write().insert(key.into(), value);
    }

    pub fn autofill_values(&self) -> IndexMap<String, Value> {
        self.autofill.read().clone()
    }

    /// Free-form per-call data.
    pub fn scratch(&self, key: &str) -> Option<Value> {
        self.scratch.read().get(key).cloned()
    }

    pub fn set_scratch(&self, key: impl Into<String>, value: Value) {
        self.scratch.write().insert(key.into(), value);
    }

    pub fn remove_scratch(&self, key: &str) -> Option<Value> {
        self.scratch.write().shift_remove(key)
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.shared.tasks
    }

    pub fn cache(&self) -> &ResultCache {
        &self.shared.cache
    }

    /// Session for a nested call: copies autofill and scratch data, shares
    /// the task queue and the result cache.
    #[must_use]
    pub fn clone_scoped(&self) -> Self {
        Self {
            autofill: Arc::new(RwLock::new(self.autofill.read().clone())),
            scratch: Arc::new(RwLock::new(self.scratch.read().clone())),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Whether `other` shares this session's queue and cache.
    pub fn shares_state_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn is_finalized(&self) -> bool {
        self.shared.finalized.load(Ordering::Acquire)
    }

    /// Run the wrap-up tasks once, then drop queued entries and cached
    /// results.
    ///
    /// Only the first call does anything; later calls, from this session or
    /// any session sharing its state, return
    /// [`SessionError::AlreadyFinalized`].
    pub async fn finalize(&self) -> Result<(), SessionError> {
        if self.shared.finalized.swap(true, Ordering::AcqRel) {
            return Err(SessionError::AlreadyFinalized);
        }

        let tasks = self.shared.tasks.len();
        tracing::debug!(tasks, "finalizing session");

        let result = self.shared.tasks.run().await;
        self.shared.tasks.clear();
        self.shared.cache.clear();

        if let Err(err) = &result {
            tracing::warn!(failed = err.failures().len(), "session wrap-up tasks failed");
        }
        result.map_err(SessionError::from)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("autofill", &self.autofill.read().len())
            .field("scratch", &self.scratch.read().len())
            .field("tasks", &self.shared.tasks)
            .field("cache", &self.shared.cache)
            .field("finalized", &self.is_finalized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn scoped_clone_copies_maps_and_shares_state() {
        let session = Session::new();
        session.set_autofill("user", json!("ada"));
        session.set_scratch("trace", json!(1));

        let nested = session.clone_scoped();
        assert!(nested.shares_state_with(&session));
        assert_eq!(nested.autofill("user"), Some(json!("ada")));

        nested.set_autofill("user", json!("grace"));
        nested.set_scratch("trace", json!(2));
        assert_eq!(session.autofill("user"), Some(json!("ada")));
        assert_eq!(session.scratch("trace"), Some(json!(1)));

        nested.cache().insert("sig", json!(true));
        assert_eq!(session.cache().get("sig"), Some(json!(true)));
    }

    #[test]
    fn plain_clone_shares_maps() {
        let session = Session::new();
        let alias = session.clone();
        alias.set_scratch("k", json!("v"));
        assert_eq!(session.remove_scratch("k"), Some(json!("v")));
        assert_eq!(alias.scratch("k"), None);
    }

    #[tokio::test]
    async fn finalize_runs_once_and_flushes() {
        let session = Session::new();
        session.cache().insert("sig", json!(1));
        session
            .tasks()
            .add_deferred(|| async { Ok::<_, ActionError>(Value::Null) }, 0);

        session.finalize().await.unwrap();
        assert!(session.is_finalized());
        assert!(session.tasks().is_empty());
        assert!(session.cache().is_empty());

        let nested = session.clone_scoped();
        assert_eq!(
            nested.finalize().await,
            Err(SessionError::AlreadyFinalized)
        );
    }

    #[tokio::test]
    async fn finalize_reports_task_failures() {
        let session = Session::new();
        session.tasks().add_deferred(
            || async { Err::<Value, _>(ActionError::execution("cleanup failed")) },
            0,
        );

        let err = session.finalize().await.unwrap_err();
        assert_eq!(err.code(), "SESSION_TASKS_FAILED");
        assert!(err.to_string().contains("cleanup failed"));
        assert!(session.tasks().is_empty());
    }
}
