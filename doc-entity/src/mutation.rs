use crate::entity::Entity;
use crate::store::Mutation;

/// The caller-facing write verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Insert,
    Update,
    Upsert,
}

/// Compiles a record batch into primitive mutations. Pure, no store calls.
///
/// Insert and update map through unconditionally; the store itself signals
/// conflicts at commit time, and updates replace the whole record. Upsert
/// splits on key state: an incomplete key must go through insert, because
/// the native upsert primitive does not allocate identifiers.
pub fn compile(entities: Vec<Entity>, verb: Verb) -> Vec<Mutation> {
    entities
        .into_iter()
        .map(|entity| match verb {
            Verb::Insert => Mutation::Insert(entity),
            Verb::Update => Mutation::Update(entity),
            Verb::Upsert => {
                if entity.key().is_incomplete() {
                    Mutation::Insert(entity)
                } else {
                    Mutation::Upsert(entity)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::entity::Fields;
    use crate::key::Key;

    use super::*;

    fn record(key: Key) -> Entity {
        Entity::new(key, Fields::new())
    }

    #[test]
    fn insert_maps_every_record_to_insert() {
        let batch = vec![record(Key::new("Task")), record(Key::new("Task").with_id(1))];
        let mutations = compile(batch, Verb::Insert);
        assert!(mutations.iter().all(|m| matches!(m, Mutation::Insert(_))));
    }

    #[test]
    fn update_maps_every_record_to_update() {
        let batch = vec![record(Key::new("Task").with_id(1)), record(Key::new("Task"))];
        let mutations = compile(batch, Verb::Update);
        assert!(mutations.iter().all(|m| matches!(m, Mutation::Update(_))));
    }

    #[test]
    fn upsert_splits_on_key_state_preserving_order() {
        let batch = vec![
            record(Key::new("Task")),
            record(Key::new("Task").with_id(1)),
            record(Key::new("Task")),
        ];
        let mutations = compile(batch, Verb::Upsert);
        assert!(matches!(mutations[0], Mutation::Insert(_)));
        assert!(matches!(mutations[1], Mutation::Upsert(_)));
        assert!(matches!(mutations[2], Mutation::Insert(_)));
    }
}
