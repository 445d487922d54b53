use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use crate::analysis::analyzer::Analyzer;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::TenantKey;
use crate::shard::actor::{self, ShardContext};
use crate::shard::handle::{Reply, ShardHandle, ShardMessage};
use crate::storage::store::SnapshotStore;

/// How often a request follows a retiring shard to its successor.
const MAX_ROUTE_ATTEMPTS: usize = 3;

/// Maps tenant keys to their live shard.
///
/// At most one non-retired shard exists per tenant at any time; routing is
/// race-free because activation happens under the registry lock. The lock is
/// never held across an await.
pub struct ShardRouter {
    context: ShardContext,
    shards: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    handles: HashMap<TenantKey, ShardHandle>,
    next_generation: u64,
}

impl ShardRouter {
    pub fn new(config: Arc<Config>, store: Arc<dyn SnapshotStore>, analyzer: Arc<Analyzer>) -> Self {
        ShardRouter {
            context: ShardContext { config, store, analyzer, shutting_down: Arc::new(AtomicBool::new(false)) },
            shards: Mutex::new(Registry::default()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.context.store
    }

    /// Handle of the tenant's live shard, activating a new generation if needed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn route(&self, tenant: &TenantKey) -> ShardHandle {
        let mut registry = self.shards.lock();

        let predecessor = match registry.handles.get(tenant) {
            Some(handle) if !handle.is_retired() => return handle.clone(),
            Some(handle) if !handle.is_finished() => Some(handle.clone()),
            _ => None,
        };

        registry.next_generation += 1;
        let generation = registry.next_generation;
        let handle = actor::spawn(tenant.clone(), generation, self.context.clone(), predecessor);
        registry.handles.insert(tenant.clone(), handle.clone());

        debug!(target: "shardtext::router", tenant = %tenant, generation, "Shard activation started");
        handle
    }

    /// Deliver a request to the tenant's shard, following it across retirement.
    pub(crate) async fn dispatch<T, F>(&self, tenant: &TenantKey, mut build: F) -> Result<T>
    where
        F: FnMut(Reply<T>) -> ShardMessage,
    {
        for attempt in 1..=MAX_ROUTE_ATTEMPTS {
            let handle = self.route(tenant);
            if let Some(result) = handle.call(&mut build).await {
                return result;
            }
            debug!(
                target: "shardtext::router",
                tenant = %tenant,
                generation = handle.generation(),
                attempt,
                "Shard retired while routing, retrying"
            );
        }

        Err(Error::unavailable(format!(
            "no shard of {} accepted the request after {} attempts",
            tenant, MAX_ROUTE_ATTEMPTS
        )))
    }

    /// Tenants with a shard that is still admitting messages.
    pub fn active_tenants(&self) -> Vec<TenantKey> {
        let mut registry = self.shards.lock();
        registry.handles.retain(|_, handle| !(handle.is_retired() && handle.is_finished()));

        let mut tenants: Vec<TenantKey> = registry
            .handles
            .values()
            .filter(|handle| !handle.is_retired())
            .map(|handle| handle.tenant().clone())
            .collect();
        tenants.sort();
        tenants
    }

    /// Deactivate the tenant's shard now: flush, drain and stop.
    ///
    /// A tenant without a live shard is a no-op. When the shard's state
    /// cannot be saved the deactivation is called off: the shard stays
    /// active with its changes and the `Persistence` error is returned.
    pub async fn deactivate(&self, tenant: &TenantKey) -> Result<()> {
        let Some(handle) = self.shards.lock().handles.get(tenant).cloned() else {
            return Ok(());
        };

        // `None`: already retiring on its own
        let result = handle
            .call(|reply| ShardMessage::Deactivate { reply })
            .await
            .unwrap_or(Ok(()));
        if result.is_err() && !handle.is_retired() {
            return result;
        }
        handle.wait_finished().await;
        self.forget(&handle);
        result
    }

    /// Deactivate every shard, waiting for their final flushes.
    pub async fn shutdown(&self) -> Result<()> {
        self.context.shutting_down.store(true, Ordering::SeqCst);
        let handles: Vec<ShardHandle> = self.shards.lock().handles.drain().map(|(_, h)| h).collect();

        let mut tasks = JoinSet::new();
        for handle in handles {
            tasks.spawn(async move {
                let result = Self::retire(&handle).await;
                (handle.tenant().clone(), result)
            });
        }

        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((tenant, Err(e))) => {
                    warn!(target: "shardtext::router", tenant = %tenant, error = %e, "Shard failed to flush on shutdown");
                    failed.push(tenant.to_string());
                }
                Err(e) => failed.push(format!("<task: {}>", e)),
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            failed.sort();
            Err(Error::persistence(format!("unsaved shards at shutdown: {}", failed.join(", "))))
        }
    }

    async fn retire(handle: &ShardHandle) -> Result<()> {
        let result = handle
            .call(|reply| ShardMessage::Shutdown { reply })
            .await
            .unwrap_or(Ok(()));   // Already retiring on its own
        handle.wait_finished().await;
        result
    }

    fn forget(&self, handle: &ShardHandle) {
        let mut registry = self.shards.lock();
        if registry
            .handles
            .get(handle.tenant())
            .is_some_and(|current| current.generation() == handle.generation())
        {
            registry.handles.remove(handle.tenant());
        }
    }
}
