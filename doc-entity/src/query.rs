use std::pin::Pin;

use async_stream::try_stream;
use futures::Stream;
use log::debug;

use crate::entity::{Entity, Value};
use crate::error::Error;
use crate::key::Key;
use crate::store::{Cursor, Direction, KEY_PROPERTY, NativeQuery, Operator, StoreClient};

/// A generic query description, accumulated by the builder facade.
#[derive(Debug, Clone, Default)]
pub struct QueryDescription {
    pub kind: String,
    pub columns: Vec<String>,
    pub wheres: Vec<WhereClause>,
    pub orders: Vec<OrderClause>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub keys_only: bool,
}

/// One accumulated filter predicate.
///
/// Only single-field comparisons (`Basic`) and key equality (`KeyEq`) have
/// a native counterpart. The remaining shapes are accepted by the builder
/// but skipped at compile time, matching the store adapter's historical
/// behavior for unsupported filter kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    Basic {
        column: String,
        operator: Operator,
        value: Value,
    },
    KeyEq {
        key: Key,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
    Null {
        column: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    pub column: String,
    pub direction: Direction,
}

/// Drops the `*` wildcard from a projection list.
///
/// An empty result means "return full entities", never "zero fields".
pub(crate) fn normalize_projection(columns: &[String]) -> Vec<String> {
    columns.iter().filter(|column| column.as_str() != "*").cloned().collect()
}

/// Translates a query description into the store's native query.
///
/// Filters and orders carry over in input order, untranslated. Offset and
/// limit pass through verbatim; the store enforces its own bounds.
pub fn compile(description: &QueryDescription) -> NativeQuery {
    let mut query = NativeQuery::new()
        .kind(description.kind.clone())
        .projection(normalize_projection(&description.columns));

    if description.keys_only {
        query = query.keys_only();
    }
    if let Some(offset) = description.offset {
        query = query.offset(offset);
    }
    if let Some(limit) = description.limit {
        query = query.limit(limit);
    }

    for clause in &description.wheres {
        match clause {
            WhereClause::Basic {
                column,
                operator,
                value,
            } => {
                query = query.filter(column.clone(), *operator, value.clone());
            }
            WhereClause::KeyEq { key } => {
                query = query.filter(KEY_PROPERTY, Operator::Eq, key.clone());
            }
            other => {
                debug!("skipping filter shape with no native counterpart: {other:?}");
            }
        }
    }

    for order in &description.orders {
        query = query.order(order.column.clone(), order.direction);
    }

    query
}

/// A lazy, finite sequence of raw query results.
///
/// Consuming it may issue further transport round trips; it is not
/// restartable. Re-running a query means recompiling and redispatching.
pub type EntityStream = Pin<Box<dyn Stream<Item = Result<Entity, Error>> + Send>>;

/// Dispatches a compiled query and streams its results, pulling one
/// transport page at a time.
pub fn run<C: StoreClient>(client: &C, query: NativeQuery) -> EntityStream {
    let client = client.clone();
    Box::pin(try_stream! {
        let mut cursor: Option<Cursor> = None;
        loop {
            let page = client.run_query(&query, cursor.take()).await?;
            for entity in page.entities {
                yield entity;
            }
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
    })
}
