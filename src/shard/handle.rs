use tokio::sync::{mpsc, oneshot, watch};
use crate::core::error::{Error, Result};
use crate::core::stats::ShardStats;
use crate::core::types::{DocId, TenantKey};
use crate::query::context::SearchContext;
use crate::writer::batch::{BatchOutcome, CommandBatch};

pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

/// Messages accepted by a shard, executed one at a time in arrival order.
pub(crate) enum ShardMessage {
    Index { batch: CommandBatch, reply: Reply<BatchOutcome> },
    Search { query: String, context: SearchContext, reply: Reply<Vec<DocId>> },
    Flush { reply: Reply<()> },
    Clear { reply: Reply<()> },
    Stats { reply: Reply<ShardStats> },
    Deactivate { reply: Reply<()> },
    Shutdown { reply: Reply<()> },
}

impl ShardMessage {
    /// Answer the message with `error` without executing it.
    pub(crate) fn reject(self, error: Error) {
        match self {
            ShardMessage::Index { reply, .. } => { let _ = reply.send(Err(error)); }
            ShardMessage::Search { reply, .. } => { let _ = reply.send(Err(error)); }
            ShardMessage::Flush { reply }
            | ShardMessage::Clear { reply }
            | ShardMessage::Deactivate { reply }
            | ShardMessage::Shutdown { reply } => { let _ = reply.send(Err(error)); }
            ShardMessage::Stats { reply } => { let _ = reply.send(Err(error)); }
        }
    }
}

/// Address of one shard generation.
///
/// Cloning is cheap; all clones feed the same inbox. Once the shard starts
/// deactivating its inbox closes and sends through any clone fail, which
/// callers observe as `None` from [`ShardHandle::call`].
#[derive(Clone)]
pub struct ShardHandle {
    pub(crate) tenant: TenantKey,
    pub(crate) generation: u64,
    pub(crate) tx: mpsc::UnboundedSender<ShardMessage>,
    pub(crate) finished: watch::Receiver<bool>,
}

impl ShardHandle {
    pub fn tenant(&self) -> &TenantKey {
        &self.tenant
    }

    /// Increases every time the tenant is activated again.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the shard stopped admitting messages.
    pub fn is_retired(&self) -> bool {
        self.tx.is_closed()
    }

    /// True once the shard task has exited, after its final flush.
    pub fn is_finished(&self) -> bool {
        *self.finished.borrow()
    }

    /// Resolves when the shard task has exited.
    pub async fn wait_finished(&self) {
        let mut finished = self.finished.clone();
        // A dropped sender means the task is gone as well
        let _ = finished.wait_for(|done| *done).await;
    }

    /// Submit a batch to this generation only.
    pub async fn index(&self, batch: CommandBatch) -> Result<BatchOutcome> {
        self.call(|reply| ShardMessage::Index { batch, reply })
            .await
            .unwrap_or_else(|| Err(self.retired_error()))
    }

    pub async fn search(&self, query: &str, context: SearchContext) -> Result<Vec<DocId>> {
        let query = query.to_string();
        self.call(|reply| ShardMessage::Search { query, context, reply })
            .await
            .unwrap_or_else(|| Err(self.retired_error()))
    }

    pub async fn stats(&self) -> Result<ShardStats> {
        self.call(|reply| ShardMessage::Stats { reply })
            .await
            .unwrap_or_else(|| Err(self.retired_error()))
    }

    /// Send one request and wait for its reply.
    ///
    /// `None` means the inbox was already closed and the message was never
    /// admitted, so it is safe to resend it to a successor generation.
    pub(crate) async fn call<T>(&self, build: impl FnOnce(Reply<T>) -> ShardMessage) -> Option<Result<T>> {
        let (reply, response) = oneshot::channel();
        if self.tx.send(build(reply)).is_err() {
            return None;
        }

        match response.await {
            Ok(result) => Some(result),
            Err(_) => Some(Err(Error::unavailable(format!(
                "shard {} (generation {}) stopped before replying",
                self.tenant, self.generation
            )))),
        }
    }

    fn retired_error(&self) -> Error {
        Error::unavailable(format!(
            "shard {} (generation {}) is retired",
            self.tenant, self.generation
        ))
    }
}

impl std::fmt::Debug for ShardHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardHandle")
            .field("tenant", &self.tenant)
            .field("generation", &self.generation)
            .field("retired", &self.is_retired())
            .finish()
    }
}
