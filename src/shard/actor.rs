use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant as StdInstant;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use crate::analysis::analyzer::Analyzer;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::{HealthStatus, ShardStats};
use crate::core::types::TenantKey;
use crate::index::inverted::InvertedIndex;
use crate::search::executor::QueryEngine;
use crate::shard::handle::{Reply, ShardHandle, ShardMessage};
use crate::storage::store::SnapshotStore;
use crate::writer::applier::CommandApplier;

/// Durability bookkeeping of a shard.
#[derive(Debug, Default)]
struct PersistenceState {
    last_saved_at: Option<DateTime<Utc>>,
    consecutive_failures: u32,
    last_error: Option<String>,
    next_attempt: Option<Instant>,    // Periodic flushes wait for this after a failure
}

impl PersistenceState {
    fn record_success(&mut self) {
        self.last_saved_at = Some(Utc::now());
        self.consecutive_failures = 0;
        self.last_error = None;
        self.next_attempt = None;
    }

    fn record_failure(&mut self, error: &Error, config: &Config) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error.to_string());
        self.next_attempt = Some(Instant::now() + config.save_backoff(self.consecutive_failures));
    }

    fn save_due(&self) -> bool {
        self.next_attempt.is_none_or(|at| Instant::now() >= at)
    }
}

/// Stop request taken from the inbox.
enum Stop {
    /// Called off, with the shard kept active, if its state cannot be saved.
    Deactivate(Reply<()>),
    /// Exits even with unsaved changes once the retry budget is spent.
    Shutdown(Reply<()>),
}

/// Dependencies shared by every shard of a router.
#[derive(Clone)]
pub(crate) struct ShardContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn SnapshotStore>,
    pub analyzer: Arc<Analyzer>,
    pub shutting_down: Arc<AtomicBool>,    // Set once the router shuts down
}

/// Owner of one tenant's index.
///
/// Runs as a single task; every message is executed to completion before the
/// next one is taken from the inbox, so the index needs no locking.
pub(crate) struct ShardActor {
    tenant: TenantKey,
    generation: u64,
    config: Arc<Config>,
    store: Arc<dyn SnapshotStore>,
    shutting_down: Arc<AtomicBool>,
    applier: CommandApplier,
    engine: QueryEngine,
    index: InvertedIndex,
    persistence: PersistenceState,

    activated_at: DateTime<Utc>,
    restored: bool,
    load_warning: Option<String>,
    batches_applied: u64,
    searches_executed: u64,
    searches_cancelled: u64,
}

/// Start a shard task for `tenant`.
///
/// Activation waits for `predecessor` (the previous generation of the same
/// tenant) to finish, so the snapshot it loads includes the predecessor's
/// final flush. Messages sent meanwhile queue in the new inbox.
pub(crate) fn spawn(
    tenant: TenantKey,
    generation: u64,
    context: ShardContext,
    predecessor: Option<ShardHandle>,
) -> ShardHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (finished_tx, finished_rx) = watch::channel(false);
    let key = tenant.clone();

    tokio::spawn(async move {
        if let Some(previous) = predecessor {
            previous.wait_finished().await;
        }

        match ShardActor::activate(key.clone(), generation, context).await {
            Ok(actor) => actor.run(rx).await,
            Err(e) => reject_all(&key, generation, rx, e).await,
        }

        finished_tx.send_replace(true);
    });

    ShardHandle {
        tenant,
        generation,
        tx,
        finished: finished_rx,
    }
}

/// Fail everything queued for a shard that could not be activated.
async fn reject_all(
    tenant: &TenantKey,
    generation: u64,
    mut rx: mpsc::UnboundedReceiver<ShardMessage>,
    error: Error,
) {
    error!(target: "shardtext::shard", tenant = %tenant, generation, error = %error, "Shard activation failed");
    rx.close();
    while let Some(message) = rx.recv().await {
        message.reject(error.clone());
    }
}

impl ShardActor {
    async fn activate(tenant: TenantKey, generation: u64, context: ShardContext) -> Result<Self> {
        let started = StdInstant::now();
        let ShardContext { config, store, analyzer, shutting_down } = context;
        let history = config.applied_batch_history;

        let load_store = store.clone();
        let load_key = tenant.clone();
        let loaded = tokio::task::spawn_blocking(move || load_store.load(&load_key))
            .await
            .unwrap_or_else(|e| Err(Error::new(ErrorKind::Internal, format!("snapshot load task failed: {}", e))));

        let restored = loaded.and_then(|snapshot| match snapshot {
            Some(snapshot) if snapshot.tenant != tenant => Err(Error::persistence(format!(
                "snapshot belongs to tenant {}",
                snapshot.tenant
            ))),
            Some(snapshot) => InvertedIndex::from_snapshot(snapshot, history).map(Some),
            None => Ok(None),
        });

        let (index, restored, load_warning) = match restored {
            Ok(Some(index)) => (index, true, None),
            Ok(None) => (InvertedIndex::new(history), false, None),
            Err(e) if matches!(e.kind, ErrorKind::Persistence | ErrorKind::Parse | ErrorKind::InvalidState) => {
                warn!(
                    target: "shardtext::shard",
                    tenant = %tenant,
                    error = %e,
                    "Snapshot unreadable, starting with an empty index"
                );
                (InvertedIndex::new(history), false, Some(e.context))
            }
            Err(e) => {
                return Err(Error::unavailable(format!(
                    "cannot load snapshot of {} from {} store: {}",
                    tenant,
                    store.name(),
                    e
                )));
            }
        };

        info!(
            target: "shardtext::shard",
            tenant = %tenant,
            generation,
            documents = index.document_count(),
            restored,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Shard activated"
        );

        Ok(ShardActor {
            applier: CommandApplier::new(analyzer.clone(), config.parallel_analysis_threshold),
            engine: QueryEngine::new(analyzer, config.max_page_size),
            tenant,
            generation,
            config,
            store,
            shutting_down,
            index,
            persistence: PersistenceState::default(),
            activated_at: Utc::now(),
            restored,
            load_warning,
            batches_applied: 0,
            searches_executed: 0,
            searches_cancelled: 0,
        })
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ShardMessage>) {
        let idle_timeout = self.config.idle_timeout();
        let flush_interval = self.config.flush_interval();

        let mut flush_tick = time::interval_at(Instant::now() + flush_interval, flush_interval);
        flush_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let idle = time::sleep(idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => {
                        match self.handle(message).await {
                            Some(Stop::Deactivate(reply)) => match self.flush_with_retry().await {
                                Ok(()) => {
                                    self.retire(&mut rx, vec![reply], false).await;
                                    return;
                                }
                                Err(e) => {
                                    warn!(
                                        target: "shardtext::shard",
                                        tenant = %self.tenant,
                                        error = %e,
                                        "Deactivation called off, changes are not durable yet"
                                    );
                                    let _ = reply.send(Err(e));
                                }
                            },
                            Some(Stop::Shutdown(reply)) => {
                                self.retire(&mut rx, vec![reply], true).await;
                                return;
                            }
                            None => {}
                        }
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                    }
                    None => {
                        // Every handle is gone; nobody can reach this shard again
                        self.retire(&mut rx, Vec::new(), true).await;
                        return;
                    }
                },
                _ = flush_tick.tick() => {
                    if self.index.is_dirty() && self.persistence.save_due() {
                        let _ = self.save().await;
                    }
                }
                _ = &mut idle => {
                    // Stay active if the state cannot be made durable yet
                    if !self.index.is_dirty() || self.save().await.is_ok() {
                        debug!(target: "shardtext::shard", tenant = %self.tenant, "Shard idle, deactivating");
                        self.retire(&mut rx, Vec::new(), false).await;
                        return;
                    }
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                }
            }
        }
    }

    /// Execute one message. Returns the stop request it carried, if any.
    async fn handle(&mut self, message: ShardMessage) -> Option<Stop> {
        match message {
            ShardMessage::Index { batch, reply } => {
                let outcome = self.applier.apply(&mut self.index, &batch);
                if !outcome.duplicate {
                    self.batches_applied += 1;
                }
                let _ = reply.send(Ok(outcome));
            }
            ShardMessage::Search { query, context, reply } => {
                if reply.is_closed() {
                    self.searches_cancelled += 1;
                    debug!(target: "shardtext::shard", tenant = %self.tenant, "Search cancelled before execution");
                    return None;
                }
                let result = self.engine.search(&self.index, &query, &context);
                self.searches_executed += 1;
                let _ = reply.send(result);
            }
            ShardMessage::Flush { reply } => {
                let _ = reply.send(self.save().await);
            }
            ShardMessage::Clear { reply } => {
                let removed = self.index.document_count();
                self.index.clear();
                info!(target: "shardtext::shard", tenant = %self.tenant, removed, "Shard cleared");
                let _ = reply.send(Ok(()));
            }
            ShardMessage::Stats { reply } => {
                let _ = reply.send(Ok(self.stats()));
            }
            ShardMessage::Deactivate { reply } => return Some(Stop::Deactivate(reply)),
            ShardMessage::Shutdown { reply } => return Some(Stop::Shutdown(reply)),
        }
        None
    }

    /// Stop admitting messages, run what was already admitted, then flush.
    ///
    /// Unless `give_up` is set (shutdown), the task does not exit before the
    /// final flush succeeds: a successor waits for it, so unsaved changes
    /// are never dropped.
    async fn retire(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<ShardMessage>,
        mut waiters: Vec<Reply<()>>,
        mut give_up: bool,
    ) {
        rx.close();
        while let Some(message) = rx.recv().await {
            match self.handle(message).await {
                Some(Stop::Deactivate(reply)) => waiters.push(reply),
                Some(Stop::Shutdown(reply)) => {
                    give_up = true;
                    waiters.push(reply);
                }
                None => {}
            }
        }

        let result = loop {
            match self.flush_with_retry().await {
                Ok(()) => break Ok(()),
                Err(e) if give_up || self.shutting_down.load(Ordering::SeqCst) => break Err(e),
                Err(e) => {
                    error!(
                        target: "shardtext::shard",
                        tenant = %self.tenant,
                        generation = self.generation,
                        error = %e,
                        "Retiring shard cannot save its changes, retrying"
                    );
                    time::sleep(self.config.save_backoff(self.persistence.consecutive_failures)).await;
                }
            }
        };

        match &result {
            Ok(()) => info!(
                target: "shardtext::shard",
                tenant = %self.tenant,
                generation = self.generation,
                documents = self.index.document_count(),
                "Shard deactivated"
            ),
            Err(e) => error!(
                target: "shardtext::shard",
                tenant = %self.tenant,
                generation = self.generation,
                error = %e,
                "Shard shut down with unsaved changes"
            ),
        }

        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }

    async fn flush_with_retry(&mut self) -> Result<()> {
        let max_attempts = self.config.save_retry_max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.save().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(_) => {
                    time::sleep(self.config.save_backoff(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One save attempt; a no-op for a clean index.
    async fn save(&mut self) -> Result<()> {
        if !self.index.is_dirty() {
            return Ok(());
        }

        let started = StdInstant::now();
        let snapshot = self.index.to_snapshot(&self.tenant);
        let documents = snapshot.document_count();
        let store = self.store.clone();
        let tenant = self.tenant.clone();
        let result = tokio::task::spawn_blocking(move || store.save(&tenant, &snapshot))
            .await
            .unwrap_or_else(|e| Err(Error::new(ErrorKind::Internal, format!("snapshot save task failed: {}", e))));

        match result {
            Ok(()) => {
                self.index.mark_clean();
                self.persistence.record_success();
                debug!(
                    target: "shardtext::shard",
                    tenant = %self.tenant,
                    documents,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Snapshot saved"
                );
                Ok(())
            }
            Err(e) => {
                self.persistence.record_failure(&e, &self.config);
                warn!(
                    target: "shardtext::shard",
                    tenant = %self.tenant,
                    failures = self.persistence.consecutive_failures,
                    error = %e,
                    "Snapshot save failed, serving from memory"
                );
                Err(Error::persistence(format!("saving snapshot of {} failed: {}", self.tenant, e)))
            }
        }
    }

    fn stats(&self) -> ShardStats {
        ShardStats {
            tenant: self.tenant.clone(),
            generation: self.generation,
            activated_at: self.activated_at,
            restored_from_snapshot: self.restored,
            document_count: self.index.document_count(),
            term_count: self.index.term_count(),
            batches_applied: self.batches_applied,
            searches_executed: self.searches_executed,
            searches_cancelled: self.searches_cancelled,
            dirty: self.index.is_dirty(),
            last_saved_at: self.persistence.last_saved_at,
            consecutive_save_failures: self.persistence.consecutive_failures,
            last_save_error: self.persistence.last_error.clone(),
            load_warning: self.load_warning.clone(),
            health: HealthStatus::assess(
                self.persistence.consecutive_failures,
                self.config.save_retry_max_attempts,
                self.load_warning.as_deref(),
            ),
        }
    }
}
