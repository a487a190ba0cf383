use crate::document::{new_id, timestamp_millis};
use crate::error::{DocshelfError, Result};
use crate::storage::{FindOptions, StorageCollection, UpdateOptions};
use crate::validation::ValidationEngine;
use serde_json::{json, Value};
use std::sync::Arc;

/// The operation surface for one registered record type: validated
/// save/patch, paginated find and the soft-delete pair delete/recover.
///
/// Stateless beyond its three bindings (schema name, validator, storage
/// collection); cheap to clone. Handles are built by the connection
/// manager, one per registered schema.
#[derive(Clone)]
pub struct Collection {
    name: Arc<str>,
    validator: Arc<dyn ValidationEngine>,
    storage: Arc<dyn StorageCollection>,
}

impl Collection {
    pub fn new(
        name: impl Into<Arc<str>>,
        validator: Arc<dyn ValidationEngine>,
        storage: Arc<dyn StorageCollection>,
    ) -> Self {
        Collection {
            name: name.into(),
            validator,
            storage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Escape hatch: the raw storage collection behind this handle.
    /// Writes through it bypass validation and soft-delete bookkeeping.
    pub fn storage(&self) -> &Arc<dyn StorageCollection> {
        &self.storage
    }

    /// Save a full document. Without an `_id` this is a create: an id is
    /// generated and `_created`/`_updated`/`_isDeleted`/`_deleted` are
    /// stamped. With an `_id` it is a full replace and `_updated` is
    /// stamped. The stamped document is validated before anything is
    /// written; the write is an upsert keyed by `_id`, constrained to
    /// non-deleted records unless `allow_update_to_deleted` is set.
    pub async fn save(&self, mut document: Value, allow_update_to_deleted: bool) -> Result<Value> {
        let id = {
            let object = document.as_object_mut().ok_or_else(|| {
                DocshelfError::BadRequest("document must be a JSON object".into())
            })?;

            // Only a missing, null or empty id means "create". A present
            // id of the wrong type takes the update path so validation
            // can report it, rather than silently minting a fresh one.
            let is_new = match object.get("_id") {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if is_new {
                object.insert("_id".into(), json!(new_id()));
                object.insert("_created".into(), json!(timestamp_millis()));
                object.insert("_updated".into(), Value::Null);
                object.insert("_isDeleted".into(), json!(false));
                object.insert("_deleted".into(), Value::Null);
            } else {
                object.insert("_updated".into(), json!(timestamp_millis()));
            }
            object["_id"].clone()
        };

        self.check(&document, "Request body is invalid")?;

        let filter = self.guarded_filter(id, allow_update_to_deleted);
        let outcome = self
            .storage
            .update_one(&filter, &document, UpdateOptions { upsert: true })
            .await?;

        if outcome.upserted > 0 || outcome.matched > 0 {
            Ok(document)
        } else {
            Err(self.not_found())
        }
    }

    /// Fetch one page of documents matching `filter` (all documents when
    /// `None`). `page` defaults to 0 and `page_size` to 10 (a zero page
    /// size also falls back to 10). Soft-deleted documents are excluded
    /// unless `include_deleted` is set; the exclusion overrides any
    /// caller-supplied `_isDeleted` filter field. No explicit sort is
    /// imposed - the page comes back in the store's default order.
    pub async fn find(
        &self,
        page: Option<u64>,
        page_size: Option<u64>,
        filter: Option<Value>,
        include_deleted: bool,
    ) -> Result<Vec<Value>> {
        let limit = match page_size {
            Some(size) if size > 0 => size,
            _ => 10,
        };
        let skip = page.unwrap_or(0).saturating_mul(limit);

        let mut filter = match filter {
            Some(value @ Value::Object(_)) => value,
            _ => json!({}),
        };
        if !include_deleted {
            if let Some(fields) = filter.as_object_mut() {
                fields.insert("_isDeleted".into(), json!(false));
            }
        }

        self.storage.find(&filter, FindOptions { limit, skip }).await
    }

    /// Apply a partial update: load the existing document, shallow-merge
    /// the patch fields over it (top-level keys overwrite, nested objects
    /// are replaced wholesale, not deep-merged), validate the merged
    /// result, stamp `_updated` and write it back. The patch must carry
    /// the target `_id`.
    pub async fn patch(&self, patch: Value, allow_update_to_deleted: bool) -> Result<Value> {
        let fields = patch.as_object().ok_or_else(|| {
            DocshelfError::BadRequest("patch must be a JSON object".into())
        })?;
        let id = match fields.get("_id") {
            Some(Value::String(s)) if !s.is_empty() => json!(s),
            _ => {
                return Err(DocshelfError::BadRequest(
                    "_id required: you must include an _id field with your patch".into(),
                ))
            }
        };

        let filter = self.guarded_filter(id, allow_update_to_deleted);
        let mut merged = self
            .storage
            .find_one(&filter)
            .await?
            .ok_or_else(|| self.not_found())?;

        if let Some(target) = merged.as_object_mut() {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }

        self.check(&merged, "Result of patch is invalid")?;

        if let Some(target) = merged.as_object_mut() {
            target.insert("_updated".into(), json!(timestamp_millis()));
        }

        let outcome = self
            .storage
            .update_one(&filter, &merged, UpdateOptions::default())
            .await?;

        if outcome.matched > 0 {
            Ok(merged)
        } else {
            Err(self.not_found())
        }
    }

    /// Soft-delete: flag the document deleted and stamp `_deleted`.
    /// Works regardless of the document's current deletion state.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.toggle_deleted(id, true).await
    }

    /// Undo a soft-delete: clear the flag and the `_deleted` stamp.
    pub async fn recover(&self, id: &str) -> Result<()> {
        self.toggle_deleted(id, false).await
    }

    async fn toggle_deleted(&self, id: &str, deleted: bool) -> Result<()> {
        if id.is_empty() {
            return Err(DocshelfError::BadRequest(format!(
                "_id required: you must supply an _id to {}",
                if deleted { "delete" } else { "recover" }
            )));
        }

        let stamp = if deleted {
            json!(timestamp_millis())
        } else {
            Value::Null
        };
        let update = json!({ "_isDeleted": deleted, "_deleted": stamp });

        let outcome = self
            .storage
            .update_one(&json!({ "_id": id }), &update, UpdateOptions::default())
            .await?;

        if outcome.matched > 0 {
            Ok(())
        } else {
            Err(self.not_found())
        }
    }

    fn check(&self, document: &Value, message: &str) -> Result<()> {
        let verdict = self.validator.validate(document, &self.name);
        if verdict.valid {
            Ok(())
        } else {
            Err(DocshelfError::Validation {
                message: message.into(),
                violations: verdict.violations,
            })
        }
    }

    fn guarded_filter(&self, id: Value, allow_update_to_deleted: bool) -> Value {
        let mut filter = json!({ "_id": id });
        if !allow_update_to_deleted {
            if let Some(fields) = filter.as_object_mut() {
                fields.insert("_isDeleted".into(), json!(false));
            }
        }
        filter
    }

    fn not_found(&self) -> DocshelfError {
        DocshelfError::NotFound(self.name.to_string())
    }
}
