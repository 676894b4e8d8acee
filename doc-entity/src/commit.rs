use log::debug;

use crate::entity::Entity;
use crate::error::Error;
use crate::key::Key;
use crate::mutation::{self, Verb};
use crate::store::StoreClient;

/// Submits a record batch as one atomic commit and reconciles allocated
/// identifiers back onto the keys.
///
/// Returns exactly one key per input record, in input order; callers
/// correlate results to records positionally. Keys that were complete at
/// submission come back unchanged. A store-reported conflict propagates
/// as-is, with no retry and no partial result.
pub async fn commit_batch<C: StoreClient>(
    client: &C,
    entities: Vec<Entity>,
    verb: Verb,
) -> Result<Vec<Key>, Error> {
    let mut keys: Vec<Key> = entities.iter().map(|entity| entity.key().clone()).collect();
    let pending: Vec<usize> = keys
        .iter()
        .enumerate()
        .filter(|(_, key)| key.is_incomplete())
        .map(|(index, _)| index)
        .collect();

    let mutations = mutation::compile(entities, verb);
    debug!(
        "committing {} mutations, {} awaiting allocation",
        mutations.len(),
        pending.len()
    );
    let response = client.commit(mutations).await?;

    for index in pending {
        let allocated = response
            .mutation_results
            .get(index)
            .and_then(|result| result.key.as_ref())
            .ok_or_else(|| {
                Error::Store(format!("commit result missing allocated key at index {index}"))
            })?;
        let id = allocated.identifier().cloned().ok_or_else(|| {
            Error::Store(format!("allocated key at index {index} is incomplete"))
        })?;
        keys[index].bind_identifier(id)?;
    }

    Ok(keys)
}
