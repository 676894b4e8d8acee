use doc_entity::{
    Connection, DeleteTarget, Entity, Error, Key, KeyId, MemoryStore, Verb, commit_batch, fields,
};
use serde_json::json;

fn connect() -> (Connection<MemoryStore>, MemoryStore) {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = MemoryStore::new();
    (Connection::new(store.clone()), store)
}

#[tokio::test]
async fn insert_allocates_and_returns_a_complete_key() {
    let (db, _) = connect();

    let key = db
        .kind("Person")
        .insert(fields([("name", json!("Bob"))]))
        .await
        .unwrap();

    assert!(!key.is_incomplete());
    let record = db.lookup(&key).await.unwrap().unwrap();
    assert_eq!(record.get("name"), Some(&json!("Bob")));
}

#[tokio::test]
async fn insert_honors_an_explicit_id_field() {
    let (db, _) = connect();

    let named = db
        .kind("Person")
        .insert(fields([("id", json!("bob")), ("name", json!("Bob"))]))
        .await
        .unwrap();
    assert_eq!(named, Key::new("Person").with_name("bob"));

    let numbered = db
        .kind("Person")
        .insert(fields([("id", json!(77)), ("name", json!("Ann"))]))
        .await
        .unwrap();
    assert_eq!(numbered, Key::new("Person").with_id(77));

    // The id field selects the key and is not stored as data.
    let record = db.lookup(&named).await.unwrap().unwrap();
    assert_eq!(record.get("id"), None);
}

#[tokio::test]
async fn insert_get_id_returns_the_allocated_identifier() {
    let (db, _) = connect();

    let id = db
        .kind("Person")
        .insert_get_id(fields([("name", json!("Bob"))]))
        .await
        .unwrap();
    assert!(db.lookup(&Key::new("Person").with_id(id)).await.unwrap().is_some());
}

#[tokio::test]
async fn insert_get_id_rejects_an_explicit_identifier() {
    let (db, store) = connect();

    let err = db
        .kind("Person")
        .insert_get_id(fields([("id", json!(5)), ("name", json!("Bob"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(store.op_counts().commits, 0);
}

#[tokio::test]
async fn writes_without_a_kind_fail_before_any_store_call() {
    let (db, store) = connect();

    let err = db
        .builder()
        .insert(fields([("name", json!("Bob"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingKind("insert")));

    let counts = store.op_counts();
    assert_eq!(counts.commits, 0);
    assert_eq!(counts.lookups, 0);
    assert_eq!(counts.queries, 0);
}

#[tokio::test]
async fn batch_commit_preserves_input_order_across_allocation() {
    let (db, _) = connect();

    let batch = vec![
        Entity::new(Key::new("Person"), fields([("n", json!(0))])),
        Entity::new(Key::new("Person").with_id(100), fields([("n", json!(1))])),
        Entity::new(Key::new("Person"), fields([("n", json!(2))])),
    ];
    let keys = db.upsert_many(batch).await.unwrap();

    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|key| !key.is_incomplete()));
    // The complete key passes through unchanged at its index.
    assert_eq!(keys[1], Key::new("Person").with_id(100));
    // Allocated identifiers land on the records that lacked one.
    assert_eq!(keys[0].identifier(), Some(&KeyId::Id(1)));
    assert_eq!(keys[2].identifier(), Some(&KeyId::Id(2)));

    for (index, key) in keys.iter().enumerate() {
        let record = db.lookup(key).await.unwrap().unwrap();
        assert_eq!(record.get("n"), Some(&json!(index)));
    }
}

#[tokio::test]
async fn commit_batch_returns_one_key_per_record() {
    let (db, _) = connect();

    let batch: Vec<Entity> = (0..5)
        .map(|i| Entity::new(Key::new("Person"), fields([("n", json!(i))])))
        .collect();
    let keys = commit_batch(db.client(), batch, Verb::Insert).await.unwrap();

    assert_eq!(keys.len(), 5);
    let ids: Vec<_> = keys.iter().map(|key| key.identifier().cloned()).collect();
    assert_eq!(
        ids,
        (1..=5).map(|id| Some(KeyId::Id(id))).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn upsert_with_a_complete_key_is_idempotent() {
    let (db, store) = connect();

    let key = Key::new("Person").with_name("bob");
    let values = fields([("name", json!("Bob")), ("age", json!(30))]);

    let first = db
        .kind("Person")
        .upsert(values.clone(), Some(key.clone()))
        .await
        .unwrap();
    let after_first = db.lookup(&key).await.unwrap().unwrap();

    let second = db.kind("Person").upsert(values, Some(key.clone())).await.unwrap();
    let after_second = db.lookup(&key).await.unwrap().unwrap();

    assert_eq!(first, key);
    assert_eq!(second, key);
    assert_eq!(after_first, after_second);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn upsert_merges_values_over_the_existing_record() {
    let (db, _) = connect();

    let key = db
        .kind("Person")
        .insert(fields([("name", json!("Bob")), ("age", json!(30))]))
        .await
        .unwrap();

    db.kind("Person")
        .upsert(fields([("age", json!(31))]), Some(key.clone()))
        .await
        .unwrap();

    let record = db.lookup(&key).await.unwrap().unwrap();
    assert_eq!(record.get("name"), Some(&json!("Bob")));
    assert_eq!(record.get("age"), Some(&json!(31)));
}

#[tokio::test]
async fn upsert_discovers_the_target_among_key_predicates() {
    let (db, _) = connect();

    let key = Key::new("Person").with_name("bob");
    db.kind("Person")
        .filter_key(key.clone())
        .upsert(fields([("name", json!("Bob"))]), None)
        .await
        .unwrap();

    assert!(db.lookup(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn upsert_without_a_resolvable_key_is_an_invalid_argument() {
    let (db, _) = connect();

    let err = db
        .kind("Person")
        .upsert(fields([("name", json!("Bob"))]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn update_replaces_the_whole_record() {
    let (db, _) = connect();

    let key = db
        .kind("Person")
        .insert(fields([("name", json!("Bob")), ("age", json!(30))]))
        .await
        .unwrap();

    db.kind("Person")
        .update(fields([("name", json!("Bobby"))]), Some(key.clone()))
        .await
        .unwrap();

    let record = db.lookup(&key).await.unwrap().unwrap();
    assert_eq!(record.get("name"), Some(&json!("Bobby")));
    assert_eq!(record.get("age"), None);
}

#[tokio::test]
async fn inserting_over_an_existing_key_is_a_conflict() {
    let (db, store) = connect();

    db.kind("Person")
        .insert(fields([("id", json!("bob")), ("v", json!(1))]))
        .await
        .unwrap();

    let err = db
        .kind("Person")
        .insert(fields([("id", json!("bob")), ("v", json!(2))]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // The store still holds the first write.
    let record = db
        .lookup(&Key::new("Person").with_name("bob"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.get("v"), Some(&json!(1)));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn lookup_of_a_never_inserted_key_is_none() {
    let (db, _) = connect();

    let missing = db
        .kind("Person")
        .find(999i64, &[])
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn delete_matching_removes_every_matched_record() {
    let (db, store) = connect();

    let batch: Vec<Entity> = (0..4)
        .map(|i| Entity::new(Key::new("Person"), fields([("n", json!(i))])))
        .collect();
    db.insert_many(batch).await.unwrap();
    db.kind("Other")
        .insert(fields([("n", json!(0))]))
        .await
        .unwrap();

    let removed = db.kind("Person").delete(DeleteTarget::Matching).await.unwrap();

    assert_eq!(removed, 4);
    assert_eq!(store.len(), 1);
    assert!(db.kind("Person").get().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_resolves_scalar_ids_against_the_current_kind() {
    let (db, _) = connect();

    for id in 1..=3i64 {
        db.kind("Person")
            .insert(fields([("id", json!(id))]))
            .await
            .unwrap();
    }

    let removed = db.kind("Person").delete(vec![1i64, 3]).await.unwrap();
    assert_eq!(removed, 2);

    let remaining = db.kind("Person").get_keys().await.unwrap();
    assert_eq!(remaining, vec![Key::new("Person").with_id(2)]);
}

#[tokio::test]
async fn delete_by_key_needs_no_kind() {
    let (db, _) = connect();

    let key = db
        .kind("Person")
        .insert(fields([("name", json!("Bob"))]))
        .await
        .unwrap();

    let removed = db.builder().delete(key.clone()).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(db.lookup(&key).await.unwrap(), None);
}

#[tokio::test]
async fn delete_by_scalar_id_without_a_kind_is_a_configuration_error() {
    let (db, store) = connect();

    let err = db.builder().delete(1i64).await.unwrap_err();
    assert!(matches!(err, Error::MissingKind("delete")));
    assert_eq!(store.op_counts().commits, 0);
}

#[tokio::test]
async fn deleting_an_absent_key_is_a_no_op() {
    let (db, _) = connect();

    let removed = db
        .builder()
        .delete(Key::new("Person").with_id(404))
        .await
        .unwrap();
    assert_eq!(removed, 1);
}
