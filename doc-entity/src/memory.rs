//! In-memory implementation of [`StoreClient`].
//!
//! `MemoryStore` is a first-class backend for tests, demos, and ephemeral
//! sessions. It applies commit batches all-or-nothing under one lock,
//! allocates numeric identifiers for incomplete insert keys, and serves
//! query results in transport pages, with the same observable contract a
//! remote backend would have. Operation counters expose how many round
//! trips a caller actually issued.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::entity::{Entity, Fields, Value};
use crate::error::Error;
use crate::key::{Key, KeyId};
use crate::store::{
    CommitResponse, Cursor, Direction, FilterOperand, KEY_PROPERTY, Mutation, MutationResult,
    NativeQuery, Operator, PropertyFilter, QueryPage, StoreClient,
};

const PAGE_SIZE: usize = 128;

/// Round-trip counts per primitive operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    pub lookups: usize,
    pub queries: usize,
    pub commits: usize,
}

#[derive(Default)]
struct Inner {
    entities: BTreeMap<Key, Fields>,
    next_id: i64,
    counts: OpCounts,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn op_counts(&self) -> OpCounts {
        self.inner.lock().unwrap().counts
    }
}

impl StoreClient for MemoryStore {
    async fn lookup(&self, key: &Key) -> Result<Option<Entity>, Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.counts.lookups += 1;
        Ok(inner
            .entities
            .get(key)
            .map(|fields| Entity::new(key.clone(), fields.clone())))
    }

    async fn run_query(
        &self,
        query: &NativeQuery,
        cursor: Option<Cursor>,
    ) -> Result<QueryPage, Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.counts.queries += 1;

        let matched = evaluate(&inner.entities, query);
        let start = cursor.map(|c| c.0 as usize).unwrap_or(0).min(matched.len());
        let end = (start + PAGE_SIZE).min(matched.len());
        let cursor = (end < matched.len()).then(|| Cursor(end as u64));

        Ok(QueryPage {
            entities: matched[start..end].to_vec(),
            cursor,
        })
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> Result<CommitResponse, Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.counts.commits += 1;

        // Stage against a copy so a rejected batch leaves nothing applied.
        let mut staged = inner.entities.clone();
        let mut next_id = inner.next_id;
        let mut mutation_results = Vec::with_capacity(mutations.len());

        for mutation in mutations {
            match mutation {
                Mutation::Insert(entity) => {
                    let (mut key, fields) = entity.into_parts();
                    let allocated = key.is_incomplete();
                    if allocated {
                        next_id += 1;
                        key.bind_identifier(KeyId::Id(next_id))?;
                    }
                    if staged.contains_key(&key) {
                        return Err(Error::Conflict(format!("insert over existing key {key}")));
                    }
                    staged.insert(key.clone(), fields);
                    mutation_results.push(MutationResult {
                        key: allocated.then_some(key),
                    });
                }
                Mutation::Update(entity) => {
                    let (key, fields) = entity.into_parts();
                    if key.is_incomplete() {
                        return Err(Error::InvalidArgument(
                            "update requires a complete key".to_string(),
                        ));
                    }
                    if !staged.contains_key(&key) {
                        return Err(Error::Conflict(format!("update of missing key {key}")));
                    }
                    staged.insert(key, fields);
                    mutation_results.push(MutationResult { key: None });
                }
                Mutation::Upsert(entity) => {
                    let (key, fields) = entity.into_parts();
                    if key.is_incomplete() {
                        return Err(Error::InvalidArgument(
                            "upsert requires a complete key".to_string(),
                        ));
                    }
                    staged.insert(key, fields);
                    mutation_results.push(MutationResult { key: None });
                }
                Mutation::Delete(key) => {
                    staged.remove(&key);
                    mutation_results.push(MutationResult { key: None });
                }
            }
        }

        inner.entities = staged;
        inner.next_id = next_id;
        Ok(CommitResponse { mutation_results })
    }
}

fn evaluate(entities: &BTreeMap<Key, Fields>, query: &NativeQuery) -> Vec<Entity> {
    let mut rows: Vec<Entity> = entities
        .iter()
        .filter(|(key, _)| key.kind() == query.kind)
        .map(|(key, fields)| Entity::new(key.clone(), fields.clone()))
        .filter(|entity| query.filters.iter().all(|filter| filter_matches(entity, filter)))
        .collect();

    if !query.orders.is_empty() {
        rows.sort_by(|a, b| compare_rows(a, b, query));
    }

    let offset = query.offset.unwrap_or(0) as usize;
    let mut rows: Vec<Entity> = rows.into_iter().skip(offset).collect();
    if let Some(limit) = query.limit {
        rows.truncate(limit as usize);
    }

    rows.into_iter().map(|entity| project(entity, query)).collect()
}

fn project(entity: Entity, query: &NativeQuery) -> Entity {
    if query.keys_only {
        let (key, _) = entity.into_parts();
        Entity::new(key, Fields::new())
    } else if !query.projection.is_empty() {
        entity.only(&query.projection)
    } else {
        entity
    }
}

fn filter_matches(entity: &Entity, filter: &PropertyFilter) -> bool {
    match &filter.operand {
        FilterOperand::Key(key) => {
            filter.property == KEY_PROPERTY && op_holds(entity.key().cmp(key), filter.op)
        }
        FilterOperand::Value(expected) => {
            let Some(actual) = entity.get(&filter.property) else {
                return false;
            };
            match filter.op {
                Operator::Eq => actual == expected,
                Operator::Ne => actual != expected,
                // Range comparisons only hold between values of one type.
                _ => {
                    value_rank(actual) == value_rank(expected)
                        && op_holds(value_cmp(actual, expected), filter.op)
                }
            }
        }
    }
}

fn op_holds(ordering: Ordering, op: Operator) -> bool {
    match op {
        Operator::Eq => ordering.is_eq(),
        Operator::Ne => !ordering.is_eq(),
        Operator::Lt => ordering.is_lt(),
        Operator::Le => ordering.is_le(),
        Operator::Gt => ordering.is_gt(),
        Operator::Ge => ordering.is_ge(),
    }
}

fn compare_rows(a: &Entity, b: &Entity, query: &NativeQuery) -> Ordering {
    for order in &query.orders {
        let left = a.get(&order.property).unwrap_or(&Value::Null);
        let right = b.get(&order.property).unwrap_or(&Value::Null);
        let mut ordering = value_cmp(left, right);
        if order.direction == Direction::Descending {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.key().cmp(b.key())
}

fn value_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over field values: by type rank, then within the type.
fn value_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().unwrap_or(0.0).total_cmp(&y.as_f64().unwrap_or(0.0))
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => value_rank(a).cmp(&value_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::entity::fields;

    use super::*;

    #[tokio::test]
    async fn insert_allocates_sequential_ids_for_incomplete_keys() {
        let store = MemoryStore::new();
        let response = store
            .commit(vec![
                Mutation::Insert(Entity::new(Key::new("Task"), Fields::new())),
                Mutation::Insert(Entity::new(Key::new("Task"), Fields::new())),
            ])
            .await
            .unwrap();

        let ids: Vec<&Key> = response
            .mutation_results
            .iter()
            .map(|result| result.key.as_ref().unwrap())
            .collect();
        assert_eq!(ids[0].identifier(), Some(&KeyId::Id(1)));
        assert_eq!(ids[1].identifier(), Some(&KeyId::Id(2)));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn a_rejected_batch_applies_nothing() {
        let store = MemoryStore::new();
        let key = Key::new("Task").with_id(1);
        store
            .commit(vec![Mutation::Insert(Entity::new(key.clone(), Fields::new()))])
            .await
            .unwrap();

        let err = store
            .commit(vec![
                Mutation::Insert(Entity::new(Key::new("Task").with_id(2), Fields::new())),
                Mutation::Insert(Entity::new(key, Fields::new())),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn native_upsert_rejects_incomplete_keys() {
        let store = MemoryStore::new();
        let err = store
            .commit(vec![Mutation::Upsert(Entity::new(Key::new("Task"), Fields::new()))])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn update_of_a_missing_key_is_a_conflict() {
        let store = MemoryStore::new();
        let err = store
            .commit(vec![Mutation::Update(Entity::new(
                Key::new("Task").with_id(9),
                Fields::new(),
            ))])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn queries_page_through_large_result_sets() {
        let store = MemoryStore::new();
        let batch: Vec<Mutation> = (0..300)
            .map(|i| {
                Mutation::Insert(Entity::new(
                    Key::new("Row").with_id(i + 1),
                    fields([("n", json!(i))]),
                ))
            })
            .collect();
        store.commit(batch).await.unwrap();

        let query = NativeQuery::new().kind("Row");
        let first = store.run_query(&query, None).await.unwrap();
        assert_eq!(first.entities.len(), PAGE_SIZE);
        let second = store.run_query(&query, first.cursor).await.unwrap();
        assert_eq!(second.entities.len(), PAGE_SIZE);
        let third = store.run_query(&query, second.cursor).await.unwrap();
        assert_eq!(third.entities.len(), 300 - 2 * PAGE_SIZE);
        assert!(third.cursor.is_none());
    }

    #[tokio::test]
    async fn range_filters_only_match_within_one_value_type() {
        let store = MemoryStore::new();
        store
            .commit(vec![
                Mutation::Insert(Entity::new(
                    Key::new("Row").with_id(1),
                    fields([("v", json!(10))]),
                )),
                Mutation::Insert(Entity::new(
                    Key::new("Row").with_id(2),
                    fields([("v", json!("10"))]),
                )),
            ])
            .await
            .unwrap();

        let query = NativeQuery::new().kind("Row").filter("v", Operator::Ge, json!(5));
        let page = store.run_query(&query, None).await.unwrap();
        assert_eq!(page.entities.len(), 1);
        assert_eq!(page.entities[0].get("v"), Some(&json!(10)));
    }
}
