use doc_entity::{Connection, DeleteTarget, Direction, MemoryStore, Operator, fields};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), doc_entity::Error> {
    env_logger::init();

    let db = Connection::new(MemoryStore::new());

    let alice = db
        .kind("User")
        .insert(fields([
            ("name", json!("Alice")),
            ("age", json!(25)),
            ("email", json!("alice@example.com")),
        ]))
        .await?;
    println!("inserted {alice}");

    let bob_id = db
        .kind("User")
        .insert_get_id(fields([("name", json!("Bob")), ("age", json!(31))]))
        .await?;
    println!("allocated id {bob_id} for Bob");

    let adults = db
        .kind("User")
        .filter("age", Operator::Ge, json!(18))
        .order_by("age", Direction::Descending)
        .get()
        .await?;
    for user in &adults {
        println!("{} -> {:?}", user.key(), user.fields());
    }

    db.kind("User")
        .upsert(fields([("age", json!(26))]), Some(alice.clone()))
        .await?;
    println!("alice is now {:?}", db.lookup(&alice).await?.unwrap().get("age"));

    let removed = db.kind("User").delete(DeleteTarget::Matching).await?;
    println!("removed {removed} users");

    Ok(())
}
