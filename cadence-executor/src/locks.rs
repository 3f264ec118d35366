//! Per-resource advisory locks held for the duration of a phase.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock table keyed by resource tag.
///
/// Locks are created lazily and always acquired in sorted tag order, so two
/// phases needing overlapping tags cannot deadlock.
#[derive(Debug, Default)]
pub struct ResourceLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Holds every lock of one phase until dropped.
#[derive(Debug)]
pub struct ResourceGuard {
    tags: Vec<String>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl ResourceGuard {
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire all `tags`, waiting for holders of any of them.
    pub async fn acquire(&self, tags: &BTreeSet<String>) -> ResourceGuard {
        let locks: Vec<Arc<Mutex<()>>> = {
            let mut table = self.table.lock().await;
            tags.iter()
                .map(|tag| Arc::clone(table.entry(tag.clone()).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(locks.len());
        for lock in locks {
            guards.push(lock.lock_owned().await);
        }

        ResourceGuard {
            tags: tags.iter().cloned().collect(),
            _guards: guards,
        }
    }

    /// Whether `tag` is currently held by someone.
    pub async fn is_held(&self, tag: &str) -> bool {
        let table = self.table.lock().await;
        table.get(tag).is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Number of tags seen so far.
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
