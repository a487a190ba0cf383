use docshelf::storage::memory::MemoryEngine;
use docshelf::{Config, ConnectionManager, DocshelfError};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), DocshelfError> {
    env_logger::init();

    let mut config = Config::new("mem://demo");
    config.schemas.insert(
        "users".to_string(),
        serde_json::from_value(json!({
            "properties": {
                "name": { "type": "string" },
                "email": { "type": "string", "index": { "unique": true } },
                "role": { "type": "string", "enum": ["admin", "member"] }
            },
            "required": ["name", "email"]
        }))?,
    );

    let manager = ConnectionManager::new(Arc::new(MemoryEngine));
    manager.init(config)?;
    let db = manager.get().await?;
    log::info!("database ready: {db:?}");
    let users = db.collection("users")?;

    // Create
    let alice = users
        .save(
            json!({ "name": "Alice", "email": "alice@example.com", "role": "admin" }),
            false,
        )
        .await?;
    let id = alice["_id"].as_str().unwrap_or_default().to_string();
    println!("saved: {alice}");

    // Validation failure comes back as a structured 400
    let invalid = users.save(json!({ "name": "Bob" }), false).await;
    if let Err(err) = invalid {
        println!(
            "rejected: {}",
            serde_json::to_string_pretty(&err.to_body()).unwrap_or_default()
        );
    }

    // Patch
    let patched = users
        .patch(json!({ "_id": id, "role": "member" }), false)
        .await?;
    println!("patched: {patched}");

    // Soft delete and recover
    users.delete(&id).await?;
    println!(
        "after delete, visible: {}",
        users.find(None, None, None, false).await?.len()
    );
    users.recover(&id).await?;
    println!(
        "after recover, visible: {}",
        users.find(None, None, None, false).await?.len()
    );

    Ok(())
}
