use futures::TryStreamExt;

use crate::entity::Entity;
use crate::error::Error;
use crate::query::EntityStream;

/// Maps a raw lookup result into the caller-facing record shape.
///
/// Absent is `None`, never an error. A non-empty column list restricts the
/// record after hydration; the key stays reachable through the record.
pub fn normalize_single(raw: Option<Entity>, columns: &[String]) -> Option<Entity> {
    raw.map(|entity| restrict(entity, columns))
}

/// Applies the caller's column restriction to one hydrated record.
///
/// This is a convenience restriction on top of whatever projection the
/// store already performed, not a push-down.
pub(crate) fn restrict(entity: Entity, columns: &[String]) -> Entity {
    if columns.is_empty() {
        entity
    } else {
        entity.only(columns)
    }
}

/// Normalizes every record in a raw result stream, lazily.
pub(crate) fn restrict_stream(stream: EntityStream, columns: Vec<String>) -> EntityStream {
    if columns.is_empty() {
        stream
    } else {
        Box::pin(stream.map_ok(move |entity| entity.only(&columns)))
    }
}
