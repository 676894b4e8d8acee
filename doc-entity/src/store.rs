//! The store client contract.
//!
//! Everything below the facade talks to the document store through
//! [`StoreClient`]: a point lookup, a paged query dispatch, and one atomic
//! batch commit of mutations. Backends implement this trait; the crate
//! ships [`MemoryStore`](crate::MemoryStore) as its first-class in-process
//! backend, and all translation logic stays backend-agnostic.

use std::future::Future;

use crate::entity::{Entity, Value};
use crate::error::Error;
use crate::key::Key;

/// Pseudo-property addressing the record key in a native filter.
pub const KEY_PROPERTY: &str = "__key__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Right-hand side of a native filter: a field value or a whole key.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOperand {
    Value(Value),
    Key(Key),
}

impl From<Value> for FilterOperand {
    fn from(value: Value) -> Self {
        FilterOperand::Value(value)
    }
}

impl From<Key> for FilterOperand {
    fn from(key: Key) -> Self {
        FilterOperand::Key(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub property: String,
    pub op: Operator,
    pub operand: FilterOperand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyOrder {
    pub property: String,
    pub direction: Direction,
}

/// The store's native query representation.
///
/// Built by chaining; consumed by [`StoreClient::run_query`]. Filters and
/// orders apply in insertion order and are never reordered here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeQuery {
    pub kind: String,
    pub projection: Vec<String>,
    pub filters: Vec<PropertyFilter>,
    pub orders: Vec<PropertyOrder>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub keys_only: bool,
}

impl NativeQuery {
    pub fn new() -> Self {
        NativeQuery::default()
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn projection(mut self, columns: Vec<String>) -> Self {
        self.projection = columns;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    pub fn filter(
        mut self,
        property: impl Into<String>,
        op: Operator,
        operand: impl Into<FilterOperand>,
    ) -> Self {
        self.filters.push(PropertyFilter {
            property: property.into(),
            op,
            operand: operand.into(),
        });
        self
    }

    pub fn order(mut self, property: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(PropertyOrder {
            property: property.into(),
            direction,
        });
        self
    }
}

/// Opaque continuation token for paged query transport. Backend-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(pub u64);

/// One page of raw query results.
///
/// `cursor` is present while more pages remain; feeding it back into
/// [`StoreClient::run_query`] fetches the next page.
#[derive(Debug, Clone)]
pub struct QueryPage {
    pub entities: Vec<Entity>,
    pub cursor: Option<Cursor>,
}

/// A tagged primitive operation over one record, as submitted to commit.
#[derive(Debug, Clone)]
pub enum Mutation {
    Insert(Entity),
    Update(Entity),
    Upsert(Entity),
    Delete(Key),
}

impl Mutation {
    pub fn key(&self) -> &Key {
        match self {
            Mutation::Insert(entity) | Mutation::Update(entity) | Mutation::Upsert(entity) => {
                entity.key()
            }
            Mutation::Delete(key) => key,
        }
    }
}

/// Per-mutation commit outcome, index-aligned with the submitted batch.
///
/// `key` carries the allocated key when the corresponding mutation targeted
/// an incomplete key, and is absent otherwise.
#[derive(Debug, Clone)]
pub struct MutationResult {
    pub key: Option<Key>,
}

#[derive(Debug, Clone)]
pub struct CommitResponse {
    pub mutation_results: Vec<MutationResult>,
}

/// The narrow primitive API exposed by the document store.
///
/// Implementations own transport, timeouts, and retry policy; none of that
/// lives in this crate. Commit is all-or-nothing at the store boundary.
pub trait StoreClient: Clone + Send + Sync + 'static {
    /// Single-key point read. Absent records are `None`, not an error.
    fn lookup(&self, key: &Key) -> impl Future<Output = Result<Option<Entity>, Error>> + Send;

    /// Runs a native query, returning one transport page per call.
    fn run_query(
        &self,
        query: &NativeQuery,
        cursor: Option<Cursor>,
    ) -> impl Future<Output = Result<QueryPage, Error>> + Send;

    /// Applies a mutation batch atomically.
    fn commit(
        &self,
        mutations: Vec<Mutation>,
    ) -> impl Future<Output = Result<CommitResponse, Error>> + Send;

    /// Deletes a key batch in one atomic request, acknowledging the number
    /// of keys submitted. Deleting an absent key is a no-op.
    fn delete_batch(&self, keys: Vec<Key>) -> impl Future<Output = Result<usize, Error>> + Send {
        async move {
            if keys.is_empty() {
                return Ok(0);
            }
            let count = keys.len();
            self.commit(keys.into_iter().map(Mutation::Delete).collect()).await?;
            Ok(count)
        }
    }
}
