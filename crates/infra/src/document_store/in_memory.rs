use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tokio::sync::mpsc;
use tracing::debug;

use stockledger_core::DocumentId;
use stockledger_events::{Feed, InMemoryFeed, Subscription};

use super::r#trait::{
    Collection, Document, DocumentStore, FieldValue, Query, Snapshot, StoreError, Write, WriteBatch,
    WriteFields,
};

#[derive(Debug, Default)]
struct State {
    collections: HashMap<Collection, BTreeMap<DocumentId, Document>>,
    last_time: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing store clock (microsecond resolution).
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let next = match self.last_time {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_time = Some(next);
        next
    }
}

#[derive(Debug)]
struct Inner {
    state: RwLock<State>,
    changes: InMemoryFeed<Collection>,
    online: AtomicBool,
}

impl Inner {
    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("store is offline".to_string()))
        }
    }

    fn snapshot(&self, collection: Collection, query: &Query) -> Result<Snapshot, StoreError> {
        self.ensure_online()?;
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let documents = match state.collections.get(&collection) {
            Some(docs) => query.apply(docs.values()),
            None => Vec::new(),
        };

        Ok(Snapshot {
            collection,
            documents,
            read_time: state.last_time.unwrap_or_else(Utc::now),
        })
    }
}

/// In-memory document store.
///
/// Intended for tests and embedding. Cloning shares the same data.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                changes: InMemoryFeed::new(),
                online: AtomicBool::new(true),
            }),
        }
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the connection to the store.
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
    }

    /// Number of live subscriptions that have not been released.
    pub fn listener_count(&self) -> usize {
        self.inner.changes.subscriber_count()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: Collection) -> usize {
        self.inner
            .state
            .read()
            .map(|s| s.collections.get(&collection).map(|c| c.len()).unwrap_or(0))
            .unwrap_or(0)
    }
}

fn resolve_fields(
    target: &mut JsonMap<String, JsonValue>,
    fields: WriteFields,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    for (name, value) in fields {
        let resolved = match value {
            FieldValue::Set(v) => v,
            FieldValue::ServerTimestamp => JsonValue::String(crate::codec::format_timestamp(now)),
            FieldValue::Increment(delta) => {
                let current = match target.get(&name) {
                    None | Some(JsonValue::Null) => 0,
                    Some(v) => v.as_i64().ok_or_else(|| {
                        StoreError::InvalidWrite(format!("cannot increment non-integer field '{name}'"))
                    })?,
                };
                let next = current.checked_add(delta).ok_or_else(|| {
                    StoreError::InvalidWrite(format!("increment overflows field '{name}'"))
                })?;
                JsonValue::from(next)
            }
        };
        target.insert(name, resolved);
    }
    Ok(())
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>, StoreError> {
        self.inner.ensure_online()?;
        if batch.is_empty() {
            return Ok(vec![]);
        }

        let mut touched: Vec<Collection> = Vec::new();
        let committed = {
            let mut state = self
                .inner
                .state
                .write()
                .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
            let now = state.next_timestamp();

            // Stage every write against a private copy; nothing is visible
            // until the whole batch validated.
            let mut staged: Vec<(Collection, Document)> = Vec::new();
            for write in batch.into_writes() {
                match write {
                    Write::Create { collection, fields } => {
                        let mut doc = Document {
                            id: DocumentId::new(),
                            version: 1,
                            create_time: now,
                            update_time: now,
                            fields: JsonMap::new(),
                        };
                        resolve_fields(&mut doc.fields, fields, now)?;
                        staged.push((collection, doc));
                    }
                    Write::Update {
                        collection,
                        id,
                        fields,
                        expected_version,
                    } => {
                        let current = staged
                            .iter()
                            .rev()
                            .find(|(c, d)| *c == collection && d.id == id)
                            .map(|(_, d)| d.clone())
                            .or_else(|| state.collections.get(&collection).and_then(|c| c.get(&id)).cloned())
                            .ok_or(StoreError::NotFound { collection, id })?;

                        if !expected_version.matches(current.version) {
                            return Err(StoreError::PreconditionFailed {
                                id,
                                expected: expected_version,
                                actual: current.version,
                            });
                        }

                        let mut doc = current;
                        resolve_fields(&mut doc.fields, fields, now)?;
                        doc.version += 1;
                        doc.update_time = now;
                        staged.push((collection, doc));
                    }
                }
            }

            let mut committed = Vec::with_capacity(staged.len());
            for (collection, doc) in staged {
                state
                    .collections
                    .entry(collection)
                    .or_default()
                    .insert(doc.id, doc.clone());
                if !touched.contains(&collection) {
                    touched.push(collection);
                }
                committed.push(doc);
            }
            committed
        };

        for collection in touched {
            match self.inner.changes.publish(collection) {
                Ok(listeners) => debug!(%collection, listeners, "published change"),
                Err(err) => debug!(%collection, error = ?err, "change publication failed"),
            }
        }

        Ok(committed)
    }

    async fn get(&self, collection: Collection, id: DocumentId) -> Result<Option<Document>, StoreError> {
        self.inner.ensure_online()?;
        let state = self
            .inner
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(state.collections.get(&collection).and_then(|c| c.get(&id)).cloned())
    }

    async fn query(&self, collection: Collection, query: &Query) -> Result<Snapshot, StoreError> {
        self.inner.snapshot(collection, query)
    }

    /// The first item is the snapshot at call time. Must be called from
    /// within a tokio runtime.
    fn subscribe(&self, collection: Collection, query: Query) -> Subscription<Result<Snapshot, StoreError>> {
        // Register for change notices, then take the initial snapshot here so
        // it reflects the store as of this call. A commit racing the read is
        // still picked up by the listener.
        let mut changes = self.inner.changes.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(self.inner.snapshot(collection, &query));

        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            while let Some(changed) = changes.recv().await {
                if changed != collection {
                    continue;
                }
                if tx.send(inner.snapshot(collection, &query)).is_err() {
                    break;
                }
            }
        });

        Subscription::with_task(rx, task.abort_handle())
    }
}
