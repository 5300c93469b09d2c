use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};
use thiserror::Error;

use stockledger_core::{DocumentId, ExpectedVersion};
use stockledger_events::Subscription;

/// Collections the ledger reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Products,
    StockIncreases,
    StockDecreases,
    Category,
    Languages,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Products => "Products",
            Collection::StockIncreases => "StockIncreases",
            Collection::StockDecreases => "StockDecreases",
            Collection::Category => "Category",
            Collection::Languages => "Languages",
        }
    }
}

impl core::fmt::Display for Collection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A value to write into a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Store the value as-is.
    Set(JsonValue),
    /// Resolved to the store's clock when the write commits.
    ServerTimestamp,
    /// Atomic integer delta applied to the committed value (missing counts as 0).
    Increment(i64),
}

impl FieldValue {
    pub fn set(value: impl Into<JsonValue>) -> Self {
        FieldValue::Set(value.into())
    }
}

/// Field writes of a single create/update.
pub type WriteFields = BTreeMap<String, FieldValue>;

/// A stored document.
///
/// `version` starts at 1 on creation and is bumped by every committed update.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub version: u64,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub fields: JsonMap<String, JsonValue>,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Field predicate. Numbers compare numerically, strings lexicographically.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: JsonValue,
}

impl Filter {
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.field(&self.field) else {
            return false;
        };
        let ord = compare_json(actual, &self.value);
        match self.op {
            FilterOp::Eq => ord == Some(Ordering::Equal) || *actual == self.value,
            FilterOp::Lt => ord == Some(Ordering::Less),
            FilterOp::Lte => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Gt => ord == Some(Ordering::Greater),
            FilterOp::Gte => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Query over a single collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    /// Every document in the collection, in id order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<JsonValue>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate the query against a set of documents.
    ///
    /// Filters first, then a stable sort on the order-by field (documents
    /// missing the field sort first), then the limit.
    pub fn apply<'a>(&self, docs: impl IntoIterator<Item = &'a Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs
            .into_iter()
            .filter(|d| self.filters.iter().all(|f| f.matches(d)))
            .cloned()
            .collect();

        if let Some(order) = &self.order_by {
            matched.sort_by(|a, b| {
                let ord = match (a.field(&order.field), b.field(&order.field)) {
                    (Some(x), Some(y)) => compare_json(x, y).unwrap_or(Ordering::Equal),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match order.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

fn compare_json(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        (JsonValue::Null, JsonValue::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Result of a one-shot query or a subscription push.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: Collection,
    pub documents: Vec<Document>,
    pub read_time: DateTime<Utc>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Create {
        collection: Collection,
        fields: WriteFields,
    },
    Update {
        collection: Collection,
        id: DocumentId,
        fields: WriteFields,
        expected_version: ExpectedVersion,
    },
}

/// Writes committed atomically: either every write lands or none does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(mut self, collection: Collection, fields: WriteFields) -> Self {
        self.writes.push(Write::Create { collection, fields });
        self
    }

    pub fn update(
        mut self,
        collection: Collection,
        id: DocumentId,
        fields: WriteFields,
        expected_version: ExpectedVersion,
    ) -> Self {
        self.writes.push(Write::Update {
            collection,
            id,
            fields,
            expected_version,
        });
        self
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Document store operation error.
///
/// These are store/transport failures, as opposed to domain errors
/// (validation, invariants).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("document {id} not found in {collection}")]
    NotFound { collection: Collection, id: DocumentId },

    #[error("precondition failed on {id}: expected {expected:?}, found version {actual}")]
    PreconditionFailed {
        id: DocumentId,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("invalid write: {0}")]
    InvalidWrite(String),

    #[error("failed to decode document: {0}")]
    Decode(String),
}

/// Remote document database boundary.
///
/// ## Semantics
///
/// - `commit` is atomic across every write in the batch; update
///   preconditions are checked against the committed version before anything
///   is written
/// - `FieldValue::ServerTimestamp` resolves to the store clock at commit
/// - `subscribe` pushes a snapshot immediately and again after every commit
///   that touches the collection; dropping the returned subscription releases
///   the listener
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Commit a batch of writes atomically. Returns the resulting documents
    /// in batch order.
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: Collection, id: DocumentId) -> Result<Option<Document>, StoreError>;

    async fn query(&self, collection: Collection, query: &Query) -> Result<Snapshot, StoreError>;

    /// Live query. The first item reflects the store when `subscribe` is
    /// called; later items follow each commit to `collection`.
    ///
    /// Must be called from within a tokio runtime.
    fn subscribe(&self, collection: Collection, query: Query) -> Subscription<Result<Snapshot, StoreError>>;

    async fn create(&self, collection: Collection, fields: WriteFields) -> Result<Document, StoreError> {
        let mut docs = self.commit(WriteBatch::new().create(collection, fields)).await?;
        docs.pop()
            .ok_or_else(|| StoreError::InvalidWrite("create produced no document".to_string()))
    }

    async fn update(
        &self,
        collection: Collection,
        id: DocumentId,
        fields: WriteFields,
        expected_version: ExpectedVersion,
    ) -> Result<Document, StoreError> {
        let mut docs = self
            .commit(WriteBatch::new().update(collection, id, fields, expected_version))
            .await?;
        docs.pop()
            .ok_or_else(|| StoreError::InvalidWrite("update produced no document".to_string()))
    }
}

#[async_trait::async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>, StoreError> {
        (**self).commit(batch).await
    }

    async fn get(&self, collection: Collection, id: DocumentId) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn query(&self, collection: Collection, query: &Query) -> Result<Snapshot, StoreError> {
        (**self).query(collection, query).await
    }

    fn subscribe(&self, collection: Collection, query: Query) -> Subscription<Result<Snapshot, StoreError>> {
        (**self).subscribe(collection, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: JsonValue) -> Document {
        let now = Utc::now();
        Document {
            id: DocumentId::new(),
            version: 1,
            create_time: now,
            update_time: now,
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn query_filters_orders_and_limits() {
        let docs = vec![
            doc(json!({"n": 3, "k": "a"})),
            doc(json!({"n": 1, "k": "a"})),
            doc(json!({"n": 2, "k": "b"})),
            doc(json!({"n": 5, "k": "a"})),
        ];

        let out = Query::all()
            .filter("k", FilterOp::Eq, "a")
            .order_by("n", SortDirection::Desc)
            .limit(2)
            .apply(&docs);

        let ns: Vec<_> = out.iter().map(|d| d.fields["n"].clone()).collect();
        assert_eq!(ns, vec![json!(5), json!(3)]);
    }

    #[test]
    fn range_filters_compare_numbers() {
        let docs = vec![doc(json!({"n": 0})), doc(json!({"n": 4})), doc(json!({"n": 10}))];
        let low = Query::all()
            .filter("n", FilterOp::Gt, 0)
            .filter("n", FilterOp::Lt, 10)
            .apply(&docs);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].fields["n"], json!(4));
    }

    #[test]
    fn missing_fields_never_match_filters() {
        let docs = vec![doc(json!({"other": 1}))];
        assert!(Query::all().filter("n", FilterOp::Gte, 0).apply(&docs).is_empty());
    }
}
