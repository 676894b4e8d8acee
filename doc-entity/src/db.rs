use crate::builder::QueryBuilder;
use crate::commit;
use crate::entity::Entity;
use crate::error::Error;
use crate::key::Key;
use crate::mutation::Verb;
use crate::store::StoreClient;

/// The connection handle: owns the store client and carries the
/// client-level write verbs. Cheap to clone.
#[derive(Clone)]
pub struct Connection<C: StoreClient> {
    client: C,
}

impl<C: StoreClient> Connection<C> {
    pub fn new(client: C) -> Self {
        Connection { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Starts a builder targeting the given kind.
    pub fn kind(&self, name: impl Into<String>) -> QueryBuilder<C> {
        QueryBuilder::new(self.clone(), Some(name.into()))
    }

    /// Starts a builder with no kind configured. Write verbs on it fail
    /// with a configuration error until a kind is set.
    pub fn builder(&self) -> QueryBuilder<C> {
        QueryBuilder::new(self.clone(), None)
    }

    /// Single-key point read. Absent records are `None`.
    pub async fn lookup(&self, key: &Key) -> Result<Option<Entity>, Error> {
        self.client.lookup(key).await
    }

    pub async fn insert(&self, entity: Entity) -> Result<Key, Error> {
        single(self.insert_many(vec![entity]).await?)
    }

    /// Inserts a record batch in one atomic commit. Incomplete keys come
    /// back with their allocated identifiers, in input order.
    pub async fn insert_many(&self, entities: Vec<Entity>) -> Result<Vec<Key>, Error> {
        commit::commit_batch(&self.client, entities, Verb::Insert).await
    }

    pub async fn update(&self, entity: Entity) -> Result<Key, Error> {
        single(self.update_many(vec![entity]).await?)
    }

    /// Replaces whole records. There is no partial-field patch; callers
    /// supply the complete desired state of every record.
    pub async fn update_many(&self, entities: Vec<Entity>) -> Result<Vec<Key>, Error> {
        commit::commit_batch(&self.client, entities, Verb::Update).await
    }

    pub async fn upsert(&self, entity: Entity) -> Result<Key, Error> {
        single(self.upsert_many(vec![entity]).await?)
    }

    /// Creates or replaces a record batch in one atomic commit. Records
    /// with incomplete keys go through insert so the store allocates their
    /// identifiers.
    pub async fn upsert_many(&self, entities: Vec<Entity>) -> Result<Vec<Key>, Error> {
        commit::commit_batch(&self.client, entities, Verb::Upsert).await
    }

    /// Deletes a key batch in one atomic request.
    pub async fn delete_batch(&self, keys: Vec<Key>) -> Result<usize, Error> {
        self.client.delete_batch(keys).await
    }
}

fn single(keys: Vec<Key>) -> Result<Key, Error> {
    keys.into_iter()
        .next()
        .ok_or_else(|| Error::Store("commit returned an empty result".to_string()))
}
