//! Debounced autosave.
//!
//! Each key (a journal entry, say) gets at most one pending timer. Scheduling
//! again before the timer fires replaces both the timer and the value, so a
//! burst of edits turns into a single save of the last value.

use logfolio_common::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Save indicator shown next to an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Saved,
    Saving,
    Unsaved,
}

type SaveFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type SaveSink<K, V> = Arc<dyn Fn(K, V) -> SaveFuture + Send + Sync>;

struct Pending<V> {
    value: V,
    /// Identifies the timer that owns this value
    generation: u64,
    timer: JoinHandle<()>,
}

struct Inner<K, V> {
    debounce: Duration,
    sink: SaveSink<K, V>,
    generations: AtomicU64,
    pending: Mutex<HashMap<K, Pending<V>>>,
    status: Mutex<HashMap<K, watch::Sender<SaveStatus>>>,
}

/// Per-key cancellable save timers in front of a persistence sink.
pub struct AutosaveCoordinator<K, V = String> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for AutosaveCoordinator<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> AutosaveCoordinator<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Send + 'static,
{
    /// Create a coordinator that calls `save` after `debounce` of quiet.
    pub fn new<F, Fut>(debounce: Duration, save: F) -> Self
    where
        F: Fn(K, V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let sink: SaveSink<K, V> =
            Arc::new(move |key: K, value: V| Box::pin(save(key, value)) as SaveFuture);
        Self {
            inner: Arc::new(Inner {
                debounce,
                sink,
                generations: AtomicU64::new(0),
                pending: Mutex::new(HashMap::new()),
                status: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    /// Record a new value for `key` and restart its quiet period.
    pub async fn schedule(&self, key: K, value: V) {
        let inner = Arc::clone(&self.inner);
        let timer_key = key.clone();
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
        let mut pending = self.inner.pending.lock().await;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            inner.fire(&timer_key, generation).await;
        });

        // Status changes that depend on the pending map happen under its lock.
        self.inner.set_status(&key, SaveStatus::Unsaved).await;
        let entry = Pending {
            value,
            generation,
            timer,
        };
        if let Some(previous) = pending.insert(key, entry) {
            previous.timer.abort();
        }
    }

    /// Save `key` now if it has a pending value.
    pub async fn flush(&self, key: &K) {
        let taken = {
            let mut pending = self.inner.pending.lock().await;
            let taken = pending.remove(key);
            if taken.is_some() {
                self.inner.set_status(key, SaveStatus::Saving).await;
            }
            taken
        };
        if let Some(Pending { value, timer, .. }) = taken {
            timer.abort();
            self.inner.save(key, value).await;
        }
    }

    /// Save every pending value now.
    pub async fn flush_all(&self) {
        let drained: Vec<(K, Pending<V>)> = {
            let mut pending = self.inner.pending.lock().await;
            let drained: Vec<_> = pending.drain().collect();
            for (key, _) in &drained {
                self.inner.set_status(key, SaveStatus::Saving).await;
            }
            drained
        };
        for (key, Pending { value, timer, .. }) in drained {
            timer.abort();
            self.inner.save(&key, value).await;
        }
    }

    /// Cancel every pending timer without saving.
    pub async fn shutdown(&self) {
        let mut pending = self.inner.pending.lock().await;
        let cancelled = pending.len();
        for (_, entry) in pending.drain() {
            entry.timer.abort();
        }
        debug!(cancelled, "Autosave shut down");
    }

    /// Current indicator for `key`; `Saved` when nothing was ever scheduled.
    pub async fn status(&self, key: &K) -> SaveStatus {
        self.inner
            .status
            .lock()
            .await
            .get(key)
            .map(|tx| *tx.borrow())
            .unwrap_or_default()
    }

    /// Watch the indicator for `key`.
    pub async fn subscribe(&self, key: &K) -> watch::Receiver<SaveStatus> {
        let mut status = self.inner.status.lock().await;
        status
            .entry(key.clone())
            .or_insert_with(|| watch::channel(SaveStatus::Saved).0)
            .subscribe()
    }

    /// Number of keys waiting on a timer.
    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }
}

impl<K, V> Inner<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Send + 'static,
{
    async fn fire(&self, key: &K, generation: u64) {
        // Taking the entry out first means a concurrent schedule() starts a
        // fresh timer instead of aborting this save mid-flight. A timer that
        // woke just as it was replaced finds a newer generation and leaves it.
        let taken = {
            let mut pending = self.pending.lock().await;
            let current = pending.get(key).map(|entry| entry.generation) == Some(generation);
            if !current {
                return;
            }
            self.set_status(key, SaveStatus::Saving).await;
            pending.remove(key)
        };
        if let Some(Pending { value, .. }) = taken {
            self.save(key, value).await;
        }
    }

    /// Run the sink for a value already taken out of `pending`. The caller
    /// has set the indicator to `Saving`.
    async fn save(&self, key: &K, value: V) {
        match (self.sink)(key.clone(), value).await {
            Ok(()) => {
                // A newer edit arrived while saving; it stays unsaved.
                let pending = self.pending.lock().await;
                if !pending.contains_key(key) {
                    self.set_status(key, SaveStatus::Saved).await;
                }
                drop(pending);
                debug!(?key, "Autosaved");
            }
            Err(e) => {
                self.set_status(key, SaveStatus::Unsaved).await;
                error!(?key, error = %e, "Autosave failed");
            }
        }
    }

    async fn set_status(&self, key: &K, next: SaveStatus) {
        let mut status = self.status.lock().await;
        status
            .entry(key.clone())
            .or_insert_with(|| watch::channel(SaveStatus::Saved).0)
            .send_replace(next);
    }
}
