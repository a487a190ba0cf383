//! In-memory storage engine: the reference backend used by the test
//! suite and the demo. Supports equality filters on (possibly dotted)
//! field paths, insertion-order iteration with skip/limit, set-merge
//! updates and an idempotent-by-path index registry. Not a durable store.

use super::{
    FindOptions, StorageCollection, StorageConnection, StorageEngine, UpdateOptions,
    UpdateOutcome,
};
use crate::connection::ConnectionOptions;
use crate::error::{DocshelfError, Result};
use crate::schema::IndexOptions;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
pub struct MemoryEngine;

#[async_trait]
impl StorageEngine for MemoryEngine {
    async fn connect(
        &self,
        _url: &str,
        _options: &ConnectionOptions,
    ) -> Result<Arc<dyn StorageConnection>> {
        Ok(Arc::new(MemoryConnection::default()))
    }
}

#[derive(Default)]
pub struct MemoryConnection {
    collections: Mutex<BTreeMap<String, Arc<MemoryCollection>>>,
}

impl StorageConnection for MemoryConnection {
    fn collection(&self, name: &str) -> Arc<dyn StorageCollection> {
        let mut collections = lock(&self.collections);
        collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::default()))
            .clone()
    }
}

#[derive(Default)]
pub struct MemoryCollection {
    documents: Mutex<Vec<Value>>,
    indexes: Mutex<BTreeMap<String, IndexOptions>>,
}

#[async_trait]
impl StorageCollection for MemoryCollection {
    async fn find(&self, filter: &Value, options: FindOptions) -> Result<Vec<Value>> {
        let documents = lock(&self.documents);
        let matching = documents
            .iter()
            .filter(|doc| matches(filter, doc))
            .skip(options.skip as usize);
        let page: Vec<Value> = if options.limit == 0 {
            matching.cloned().collect()
        } else {
            matching.take(options.limit as usize).cloned().collect()
        };
        Ok(page)
    }

    async fn update_one(
        &self,
        filter: &Value,
        update: &Value,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome> {
        let mut documents = lock(&self.documents);

        if let Some(doc) = documents.iter_mut().find(|doc| matches(filter, doc)) {
            let before = doc.clone();
            apply_set(doc, update);
            return Ok(UpdateOutcome {
                matched: 1,
                modified: u64::from(*doc != before),
                upserted: 0,
            });
        }

        if options.upsert {
            // An upsert whose update carries an `_id` already present in
            // the collection is a no-op, not a duplicate insert. This is
            // what makes a guarded save against a soft-deleted record
            // surface as "matched nothing, upserted nothing".
            if let Some(id) = update.get("_id") {
                let id_taken = documents
                    .iter()
                    .any(|doc| doc.get("_id") == Some(id));
                if id_taken {
                    return Ok(UpdateOutcome::default());
                }
            }
            documents.push(update.clone());
            return Ok(UpdateOutcome {
                matched: 0,
                modified: 0,
                upserted: 1,
            });
        }

        Ok(UpdateOutcome::default())
    }

    async fn find_one(&self, filter: &Value) -> Result<Option<Value>> {
        let documents = lock(&self.documents);
        Ok(documents.iter().find(|doc| matches(filter, doc)).cloned())
    }

    async fn create_index(&self, path: &str, options: &IndexOptions) -> Result<()> {
        let mut indexes = lock(&self.indexes);
        if let Some(existing) = indexes.get(path) {
            if existing != options {
                return Err(DocshelfError::Engine(
                    format!("index on '{path}' already exists with different options").into(),
                ));
            }
            return Ok(());
        }
        indexes.insert(path.to_string(), options.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Equality match: every filter field must equal the document's value at
/// that (possibly dotted) path. Missing paths resolve to null.
fn matches(filter: &Value, document: &Value) -> bool {
    let Some(fields) = filter.as_object() else {
        return true;
    };
    fields.iter().all(|(path, expected)| {
        lookup(document, path).unwrap_or(&Value::Null) == expected
    })
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn apply_set(document: &mut Value, update: &Value) {
    let (Some(target), Some(fields)) = (document.as_object_mut(), update.as_object()) else {
        return;
    };
    for (key, value) in fields {
        target.insert(key.clone(), value.clone());
    }
}
