//! Process-wide lookup and creation of executor pools by name.
//!
//! The registry is an explicit value with a defined construction point, not
//! an ambient global. Handles are cheap clones sharing the same map, so every
//! lookup for a name observes the same pool instance and the same ticket
//! accounting.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::pool::ExecutorPool;

/// Name → pool mapping with get-or-create semantics.
///
/// First registration wins: a later `get_or_create` for an existing name
/// returns the stored pool and ignores a differing capacity. Creation for a
/// previously-unseen name is serialized under the write lock, so exactly one
/// pool instance is ever stored per name.
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: Arc<RwLock<HashMap<String, Arc<ExecutorPool>>>>,
}

impl PoolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pool registered under `name`, creating it with
    /// `max_concurrent` tickets and a fresh closed circuit if absent.
    pub async fn get_or_create(&self, name: &str, max_concurrent: u32) -> Arc<ExecutorPool> {
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(name) {
                return pool.clone();
            }
        }

        // Racing creators for the same name serialize here; entry() keeps
        // whichever writer arrives first.
        let mut pools = self.pools.write().await;
        pools
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(pool = %name, max_concurrent, "registering executor pool");
                Arc::new(ExecutorPool::new(name, max_concurrent))
            })
            .clone()
    }

    /// Look up a pool without creating it.
    pub async fn get(&self, name: &str) -> Option<Arc<ExecutorPool>> {
        self.pools.read().await.get(name).cloned()
    }

    /// Number of registered pools.
    pub async fn len(&self) -> usize {
        self.pools.read().await.len()
    }

    /// Whether no pools are registered.
    pub async fn is_empty(&self) -> bool {
        self.pools.read().await.is_empty()
    }

    /// Clear all registered pools.
    ///
    /// Commands still holding an `Arc` to a removed pool keep using it; the
    /// registry simply stops handing it out. Intended for test and process
    /// isolation.
    pub async fn reset(&self) {
        let mut pools = self.pools.write().await;
        debug!(count = pools.len(), "resetting pool registry");
        pools.clear();
    }
}
