use futures::TryStreamExt;

use crate::db::Connection;
use crate::entity::{Entity, Fields, Value};
use crate::error::Error;
use crate::key::{Key, KeyId};
use crate::query::{self, EntityStream, OrderClause, QueryDescription, WhereClause};
use crate::results;
use crate::store::{Direction, Operator, StoreClient};

/// The delete argument, normalized once at the boundary.
///
/// `Matching` deletes everything the current query matches, resolved
/// through a keys-only query first. Scalar identifiers resolve against the
/// builder's current kind; keys pass straight through.
#[derive(Debug, Clone)]
pub enum DeleteTarget {
    Matching,
    Key(Key),
    Keys(Vec<Key>),
    Id(KeyId),
    Ids(Vec<KeyId>),
}

impl From<Key> for DeleteTarget {
    fn from(key: Key) -> Self {
        DeleteTarget::Key(key)
    }
}

impl From<Vec<Key>> for DeleteTarget {
    fn from(keys: Vec<Key>) -> Self {
        DeleteTarget::Keys(keys)
    }
}

impl From<KeyId> for DeleteTarget {
    fn from(id: KeyId) -> Self {
        DeleteTarget::Id(id)
    }
}

impl From<i64> for DeleteTarget {
    fn from(id: i64) -> Self {
        DeleteTarget::Id(KeyId::Id(id))
    }
}

impl From<&str> for DeleteTarget {
    fn from(name: &str) -> Self {
        DeleteTarget::Id(KeyId::from(name))
    }
}

impl From<Vec<KeyId>> for DeleteTarget {
    fn from(ids: Vec<KeyId>) -> Self {
        DeleteTarget::Ids(ids)
    }
}

impl From<Vec<i64>> for DeleteTarget {
    fn from(ids: Vec<i64>) -> Self {
        DeleteTarget::Ids(ids.into_iter().map(KeyId::Id).collect())
    }
}

/// The CRUD facade: accumulated query state plus the verb entry points.
///
/// Builders chain by value and are consumed by the verb that dispatches
/// them; running the same query again means building it again.
#[derive(Clone)]
pub struct QueryBuilder<C: StoreClient> {
    conn: Connection<C>,
    from: Option<String>,
    columns: Vec<String>,
    wheres: Vec<WhereClause>,
    orders: Vec<OrderClause>,
    offset: Option<u64>,
    limit: Option<u64>,
    keys_only: bool,
}

impl<C: StoreClient> QueryBuilder<C> {
    pub(crate) fn new(conn: Connection<C>, from: Option<String>) -> Self {
        QueryBuilder {
            conn,
            from,
            columns: Vec::new(),
            wheres: Vec::new(),
            orders: Vec::new(),
            offset: None,
            limit: None,
            keys_only: false,
        }
    }

    pub fn from(mut self, kind: impl Into<String>) -> Self {
        self.from = Some(kind.into());
        self
    }

    pub fn select<S, I>(mut self, columns: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Adds a single-field comparison predicate.
    pub fn filter(mut self, column: impl Into<String>, operator: Operator, value: Value) -> Self {
        self.wheres.push(WhereClause::Basic {
            column: column.into(),
            operator,
            value,
        });
        self
    }

    /// Adds a key-equality predicate. Also makes the key discoverable as
    /// an upsert or update target when no explicit key is passed.
    pub fn filter_key(mut self, key: Key) -> Self {
        self.wheres.push(WhereClause::KeyEq { key });
        self
    }

    pub fn filter_in(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.wheres.push(WhereClause::In {
            column: column.into(),
            values,
        });
        self
    }

    pub fn filter_null(mut self, column: impl Into<String>) -> Self {
        self.wheres.push(WhereClause::Null {
            column: column.into(),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(OrderClause {
            column: column.into(),
            direction,
        });
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

    /// The currently configured kind, if any.
    pub fn current_kind(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// The accumulated filter predicates, in insertion order.
    pub fn wheres(&self) -> &[WhereClause] {
        &self.wheres
    }

    /// The accumulated orderings, in insertion order.
    pub fn orders(&self) -> &[OrderClause] {
        &self.orders
    }

    /// Point read by identifier against the current kind.
    pub async fn find(
        self,
        id: impl Into<KeyId>,
        columns: &[&str],
    ) -> Result<Option<Entity>, Error> {
        let kind = self.require_kind("find")?;
        let key = Key::new(kind).with_identifier(id.into());
        self.lookup(&key, columns).await
    }

    /// Point read by key. Not-found is `None`, never an error.
    pub async fn lookup(self, key: &Key, columns: &[&str]) -> Result<Option<Entity>, Error> {
        let columns: Vec<String> = columns
            .iter()
            .filter(|column| **column != "*")
            .map(|column| column.to_string())
            .collect();
        let raw = self.conn.client().lookup(key).await?;
        Ok(results::normalize_single(raw, &columns))
    }

    /// Compiles the accumulated state and collects every matching record.
    pub async fn get(self) -> Result<Vec<Entity>, Error> {
        self.stream()?.try_collect().await
    }

    /// Compiles the accumulated state into a lazy result stream.
    pub fn stream(self) -> Result<EntityStream, Error> {
        let description = self.description()?;
        let columns = description.columns.clone();
        let native = query::compile(&description);
        let raw = query::run(self.conn.client(), native);
        Ok(results::restrict_stream(raw, columns))
    }

    /// Runs the query in keys-only mode and projects out the key values.
    pub async fn get_keys(mut self) -> Result<Vec<Key>, Error> {
        self.keys_only = true;
        self.columns.clear();
        let entities = self.get().await?;
        Ok(entities.into_iter().map(|entity| entity.into_parts().0).collect())
    }

    /// Inserts one record. An `id` field selects an explicit identifier
    /// (string name or numeric id) and is removed from the stored fields;
    /// without one the store allocates an identifier at commit.
    pub async fn insert(self, values: Fields) -> Result<Key, Error> {
        let kind = self.require_kind("insert")?;
        let mut values = values;
        let key = match values.remove("id") {
            Some(Value::String(name)) => Key::new(kind).with_name(name),
            Some(Value::Number(id)) => match id.as_i64() {
                Some(id) => Key::new(kind).with_id(id),
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "id value {id} is not an integer"
                    )));
                }
            },
            Some(other) => {
                return Err(Error::InvalidArgument(format!(
                    "unsupported id value: {other}"
                )));
            }
            None => Key::new(kind),
        };
        self.conn.insert(Entity::new(key, values)).await
    }

    /// Inserts one record and returns the store-allocated numeric id.
    /// Explicit identity and allocation are mutually exclusive here.
    pub async fn insert_get_id(self, values: Fields) -> Result<i64, Error> {
        let kind = self.require_kind("insert")?;
        if values.contains_key("id") {
            return Err(Error::InvalidArgument(
                "insert_get_id called with an explicit id".to_string(),
            ));
        }
        let key = self.conn.insert(Entity::new(Key::new(kind), values)).await?;
        match key.identifier() {
            Some(KeyId::Id(id)) => Ok(*id),
            _ => Err(Error::Store("allocated identifier is not numeric".to_string())),
        }
    }

    /// Replaces the record at the target key with the given values.
    pub async fn update(self, values: Fields, key: Option<Key>) -> Result<Key, Error> {
        self.require_kind("update")?;
        let key = self.target_key(key, "update")?;
        let mut values = values;
        values.remove("id");
        self.conn.update(Entity::new(key, values)).await
    }

    /// Creates or replaces the record at the target key. When the key is
    /// complete the existing record is fetched first and the incoming
    /// values are merged over it field by field; an incomplete key starts
    /// from an empty record and gets an allocated identifier.
    pub async fn upsert(self, values: Fields, key: Option<Key>) -> Result<Key, Error> {
        self.require_kind("upsert")?;
        let key = self.target_key(key, "upsert")?;
        let mut values = values;
        values.remove("id");

        let existing = if key.is_incomplete() {
            None
        } else {
            self.conn.lookup(&key).await?
        };
        let mut entity = existing.unwrap_or_else(|| Entity::new(key.clone(), Fields::new()));
        entity.apply_values(values);
        self.conn.upsert(entity).await
    }

    /// Resolves the target into keys once, then deletes them in one atomic
    /// batch. Returns an acknowledgment sized by the submitted batch.
    pub async fn delete(self, target: impl Into<DeleteTarget>) -> Result<usize, Error> {
        let conn = self.conn.clone();
        let keys = match target.into() {
            DeleteTarget::Matching => self.get_keys().await?,
            DeleteTarget::Key(key) => vec![key],
            DeleteTarget::Keys(keys) => keys,
            DeleteTarget::Id(id) => {
                let kind = self.require_kind("delete")?;
                vec![Key::new(kind).with_identifier(id)]
            }
            DeleteTarget::Ids(ids) => {
                let kind = self.require_kind("delete")?;
                ids.into_iter()
                    .map(|id| Key::new(kind.clone()).with_identifier(id))
                    .collect()
            }
        };
        if keys.is_empty() {
            return Ok(0);
        }
        conn.delete_batch(keys).await
    }

    fn description(&self) -> Result<QueryDescription, Error> {
        Ok(QueryDescription {
            kind: self.require_kind("query")?,
            columns: query::normalize_projection(&self.columns),
            wheres: self.wheres.clone(),
            orders: self.orders.clone(),
            offset: self.offset,
            limit: self.limit,
            keys_only: self.keys_only,
        })
    }

    fn require_kind(&self, operation: &'static str) -> Result<String, Error> {
        self.from.clone().ok_or(Error::MissingKind(operation))
    }

    /// The explicit key wins; otherwise the first key-equality predicate
    /// accumulated on the builder is taken as the target. The predicate
    /// scan exists for callers that phrase the target as a filter and is
    /// kept only for compatibility.
    fn target_key(&self, explicit: Option<Key>, operation: &'static str) -> Result<Key, Error> {
        if let Some(key) = explicit {
            return Ok(key);
        }
        for clause in &self.wheres {
            if let WhereClause::KeyEq { key } = clause {
                return Ok(key.clone());
            }
        }
        Err(Error::InvalidArgument(format!("no target key for {operation}")))
    }
}
