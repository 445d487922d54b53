use std::sync::Arc;
use tracing::info;
use crate::analysis::analyzer::Analyzer;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::stats::ShardStats;
use crate::core::types::{DocId, IndexCommand, TenantKey};
use crate::query::context::SearchContext;
use crate::shard::handle::ShardMessage;
use crate::shard::router::ShardRouter;
use crate::storage::layout::StorageLayout;
use crate::storage::snapshot::CompressionType;
use crate::storage::store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
use crate::writer::batch::{BatchOutcome, CommandBatch};

/// Multi-tenant full-text indexer.
///
/// Every tenant key owns an independent index, served by a shard that is
/// activated on first use and deactivated after `idle_timeout_secs` of silence.
/// Requests for one tenant execute in arrival order; different tenants run
/// concurrently.
pub struct TextIndexer {
    config: Arc<Config>,
    router: ShardRouter,
}

impl TextIndexer {
    /// Open an indexer persisting snapshots under `config.storage_path`.
    ///
    /// Fails if another indexer holds the same directory.
    pub fn open(config: Config) -> Result<Self> {
        let layout = StorageLayout::new(config.storage_path.clone())?;
        let compression = if config.compress_snapshots {
            CompressionType::Lz4
        } else {
            CompressionType::None
        };
        let store = FileSnapshotStore::open(layout, compression)?;

        info!(
            target: "shardtext::indexer",
            path = %config.storage_path.display(),
            compression = ?compression,
            "Indexer opened"
        );
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Indexer over a custom snapshot store.
    pub fn with_store(config: Config, store: Arc<dyn SnapshotStore>) -> Self {
        let analyzer = Arc::new(Analyzer::standard(config.max_token_length));
        let config = Arc::new(config);
        TextIndexer {
            router: ShardRouter::new(config.clone(), store, analyzer),
            config,
        }
    }

    /// Indexer whose snapshots live only as long as the process.
    pub fn in_memory(config: Config) -> Self {
        Self::with_store(config, Arc::new(MemorySnapshotStore::new()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    /// Apply `commands` as one batch.
    pub async fn index(&self, tenant: &TenantKey, commands: Vec<IndexCommand>) -> Result<BatchOutcome> {
        self.index_batch(tenant, CommandBatch::new(commands)?).await
    }

    /// Apply a prepared batch. Redelivering a batch with the same id is a no-op.
    pub async fn index_batch(&self, tenant: &TenantKey, batch: CommandBatch) -> Result<BatchOutcome> {
        if !tenant.is_valid() {
            return Err(Error::validation(format!("invalid tenant key {:?}", tenant.as_str())));
        }
        self.router
            .dispatch(tenant, |reply| ShardMessage::Index { batch: batch.clone(), reply })
            .await
    }

    /// Ids of the documents matching every term of `query` within `context`, best first.
    pub async fn search(&self, tenant: &TenantKey, query: &str, context: SearchContext) -> Result<Vec<DocId>> {
        if !tenant.is_valid() {
            return Err(Error::query(format!("invalid tenant key {:?}", tenant.as_str())));
        }
        // Reject malformed requests without waking the shard
        context.validate()?;

        self.router
            .dispatch(tenant, |reply| ShardMessage::Search {
                query: query.to_string(),
                context: context.clone(),
                reply,
            })
            .await
    }

    /// Save the tenant's snapshot now if it has unsaved changes.
    pub async fn flush(&self, tenant: &TenantKey) -> Result<()> {
        self.router.dispatch(tenant, |reply| ShardMessage::Flush { reply }).await
    }

    /// Remove every document of the tenant.
    pub async fn clear(&self, tenant: &TenantKey) -> Result<()> {
        self.router.dispatch(tenant, |reply| ShardMessage::Clear { reply }).await
    }

    pub async fn stats(&self, tenant: &TenantKey) -> Result<ShardStats> {
        self.router.dispatch(tenant, |reply| ShardMessage::Stats { reply }).await
    }

    /// Deactivate the tenant's shard immediately, flushing it first.
    ///
    /// If the flush fails the shard stays active and the error is returned.
    pub async fn deactivate(&self, tenant: &TenantKey) -> Result<()> {
        self.router.deactivate(tenant).await
    }

    pub fn active_tenants(&self) -> Vec<TenantKey> {
        self.router.active_tenants()
    }

    /// Flush and stop every shard.
    pub async fn shutdown(&self) -> Result<()> {
        let result = self.router.shutdown().await;
        info!(target: "shardtext::indexer", ok = result.is_ok(), "Indexer shut down");
        result
    }
}
