//! ORM-style CRUD verbs over a schemaless, key-value document store.
//!
//! The store itself only exposes three primitives: lookup by key, run a
//! native query, and commit one atomic mutation batch. This crate is the
//! translation layer in between: it compiles builder-style query
//! descriptions into the native query object, compiles write verbs into
//! primitive mutations based on key completeness, reconciles
//! server-allocated identifiers back into caller-visible keys, and
//! normalizes results into records that keep their key reachable.
//!
//! Backends plug in through the [`StoreClient`] trait; [`MemoryStore`] is
//! the bundled in-process backend.

mod builder;
mod commit;
mod db;
mod entity;
mod error;
mod key;
mod memory;
mod mutation;
mod query;
mod results;
mod store;

pub use builder::{DeleteTarget, QueryBuilder};
pub use commit::commit_batch;
pub use db::Connection;
pub use entity::{Entity, Fields, Value, fields};
pub use error::Error;
pub use key::{Key, KeyId, PathElement};
pub use memory::{MemoryStore, OpCounts};
pub use mutation::{Verb, compile as compile_mutations};
pub use query::{EntityStream, OrderClause, QueryDescription, WhereClause, compile as compile_query, run as run_query};
pub use results::normalize_single;
pub use store::{
    CommitResponse, Cursor, Direction, FilterOperand, KEY_PROPERTY, Mutation, MutationResult,
    NativeQuery, Operator, PropertyFilter, PropertyOrder, QueryPage, StoreClient,
};
