//! The document store contract.

use std::cmp::Ordering;
use std::future::Future;

use serde_json::{Map, Value};

/// A schemaless stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Error from a store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored document does not have the expected shape
    #[error("corrupt document {collection}/{key}: {message}")]
    Corrupt {
        collection: String,
        key: String,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Sort direction for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// A single query predicate on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    /// Field value is less than or equal to the given value
    Le(String, Value),
}

impl Filter {
    /// Whether a document satisfies this predicate.
    ///
    /// A missing field never matches.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(field, value) => doc.get(field) == Some(value),
            Filter::Le(field, value) => doc
                .get(field)
                .and_then(|v| compare_values(v, value))
                .is_some_and(|o| o != Ordering::Greater),
        }
    }
}

/// Filters, ordering and limit for [`DocumentStore::query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Order)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    pub fn le(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Le(field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, order: Order) -> Self {
        self.order_by = Some((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply this query to a set of documents.
    ///
    /// Documents missing the ordering field sort last in either direction.
    pub fn apply(&self, docs: impl IntoIterator<Item = (String, Document)>) -> Vec<(String, Document)> {
        let mut hits: Vec<_> = docs
            .into_iter()
            .filter(|(_, doc)| self.filters.iter().all(|f| f.matches(doc)))
            .collect();

        if let Some((field, order)) = &self.order_by {
            hits.sort_by(|(_, a), (_, b)| match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) => {
                    let o = compare_values(x, y).unwrap_or(Ordering::Equal);
                    match order {
                        Order::Ascending => o,
                        Order::Descending => o.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        }

        if let Some(limit) = self.limit {
            hits.truncate(limit);
        }
        hits
    }
}

/// Compare two JSON scalars of the same kind.
///
/// Timestamps are stored as ISO-8601 strings, so string order is
/// chronological order.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Key-value document access.
///
/// `merge_array_field` is the only operation used on data shared between
/// sessions, and must be a set union that is safe under concurrent
/// callers: two merges into the same field both land regardless of
/// interleaving.
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by key.
    fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Store a new document under a generated key and return the key.
    fn create(
        &self,
        collection: &str,
        data: Document,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Create or replace a document.
    fn set(
        &self,
        collection: &str,
        key: &str,
        data: Document,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite the given top-level fields of an existing document.
    ///
    /// Returns `false` if the document does not exist.
    fn update(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Add `values` to the array stored in `field`, skipping any already
    /// present. Creates the document or field if missing.
    fn merge_array_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        values: Vec<Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Documents matching a query, with their keys.
    fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<(String, Document)>, StoreError>> + Send;
}
