pub mod core;
pub mod storage;
pub mod analysis;
pub mod index;
pub mod search;
pub mod query;
pub mod writer;
pub mod parallel;
pub mod shard;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::indexer::TextIndexer;
pub use crate::core::stats::{HealthStatus, ShardStats};
pub use crate::core::types::{
    DocId, DocumentMetadata, FieldValue, IndexCommand, Language, SchemaId, Status, TenantKey,
};
pub use crate::query::context::SearchContext;
pub use crate::writer::batch::{BatchOutcome, CommandBatch, CommandOutcome, CommandStatus};

/*
┌──────────────────────────────────────────────────────────────────────────────────┐
│                          SHARDTEXT STRUCT ARCHITECTURE                            │
└──────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── FACADE ──────────────────────────────────────────┐
│  struct TextIndexer                                                               │
│  • config: Arc<Config>                                                            │
│  • router: ShardRouter ── index / search / flush / clear / stats / deactivate     │
└──────────────────────────────────────┬───────────────────────────────────────────┘
                                       │ dispatch(tenant, message)
┌──────────────────────────────── SHARDS ──────────────────────────────────────────┐
│  struct ShardRouter                       struct ShardHandle (per generation)     │
│  • shards: Mutex<Registry>  ──────────▶   • tx: UnboundedSender<ShardMessage>     │
│    HashMap<TenantKey, ShardHandle>        • finished: watch::Receiver<bool>       │
│    next_generation: u64                                                           │
│                                                 │ one task per tenant             │
│                                                 ▼                                 │
│  struct ShardActor                                                                │
│  • index: InvertedIndex        • applier: CommandApplier   • engine: QueryEngine  │
│  • persistence: PersistenceState (failures, backoff, last save)                   │
│  • select! { inbox, flush interval, idle timer }                                  │
└──────────────────────────────────────┬───────────────────────────────────────────┘
                                       │
┌──────────────── INDEX ───────────────┼─────────────── STORAGE ───────────────────┐
│  struct InvertedIndex                │  trait SnapshotStore                        │
│  • postings: HashMap<Term,           │  • FileSnapshotStore (atomic rename, flock) │
│              PostingList>            │  • MemorySnapshotStore                      │
│  • documents: HashMap<DocId,         │  struct IndexSnapshot                       │
│              DocumentEntry>          │  • STXS header | crc32 | bincode (+lz4)     │
│  • applied_batches: LruCache<Uuid>   │                                             │
│  • dirty: bool                       │                                             │
└──────────────────────────────────────┴─────────────────────────────────────────────┘

┌─────────────────────────────── ANALYSIS ─────────────────────────────────────────┐
│  Analyzer: StandardTokenizer ─▶ LowercaseFilter ─▶ AsciiFoldingFilter ─▶ Length  │
│  Used both when indexing fields (CommandApplier, rayon for large batches) and    │
│  when parsing queries (QueryParser), so both sides agree on terms.               │
└──────────────────────────────────────────────────────────────────────────────────┘
*/
