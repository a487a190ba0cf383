use crate::error::Result;
use crate::schema::{IndexOptions, PropertySpec, RecordSchema};
use crate::storage::StorageCollection;

/// One secondary index derived from the schema tree: the dotted path from
/// the document root to the annotated property, plus its pass-through
/// options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDeclaration {
    pub path: String,
    pub options: IndexOptions,
}

/// Walk a compiled schema's property tree and collect one declaration per
/// node annotated with `index` options.
///
/// Recursion rules:
/// - arrays recurse into their element spec without extending the path
///   (multikey convention: element values index under the array field's
///   own path; `index` on the array node itself is ignored);
/// - a node with `index` options emits one declaration and stops;
/// - objects recurse into each child, extending the path with `.child`.
pub fn derive_indexes(schema: &RecordSchema) -> Vec<IndexDeclaration> {
    let mut declarations = Vec::new();
    for (name, spec) in &schema.properties {
        walk(spec, name.clone(), &mut declarations);
    }
    declarations
}

fn walk(spec: &PropertySpec, path: String, out: &mut Vec<IndexDeclaration>) {
    if let Some(items) = &spec.items {
        walk(items, path, out);
        return;
    }
    if let Some(options) = &spec.index {
        out.push(IndexDeclaration {
            path,
            options: options.clone(),
        });
        return;
    }
    if let Some(children) = &spec.properties {
        for (name, child) in children {
            walk(child, format!("{path}.{name}"), out);
        }
    }
}

/// Apply every derived index to the underlying collection. Safe to run
/// against an already-indexed collection: idempotency is the storage
/// engine's create-index contract.
pub async fn ensure_indexes(
    collection: &dyn StorageCollection,
    schema: &RecordSchema,
) -> Result<()> {
    for declaration in derive_indexes(schema) {
        log::debug!("creating index on {}.{}", schema.id, declaration.path);
        collection
            .create_index(&declaration.path, &declaration.options)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{compile_schema, RawSchema};
    use crate::storage::memory::MemoryCollection;
    use pretty_assertions::assert_eq;

    fn schema(json: serde_json::Value) -> RecordSchema {
        let raw: RawSchema = serde_json::from_value(json).unwrap();
        compile_schema("test", &raw)
    }

    #[test]
    fn test_flat_indexed_property() {
        let schema = schema(serde_json::json!({
            "properties": {
                "email": { "type": "string", "index": { "unique": true } },
                "name": { "type": "string" }
            }
        }));

        let declarations = derive_indexes(&schema);
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].path, "email");
        assert!(declarations[0].options.unique);
    }

    #[test]
    fn test_three_levels_deep_yields_one_dotted_path() {
        let schema = schema(serde_json::json!({
            "properties": {
                "profile": {
                    "type": "object",
                    "properties": {
                        "contact": {
                            "type": "object",
                            "properties": {
                                "email": { "type": "string", "index": {} }
                            }
                        }
                    }
                }
            }
        }));

        let declarations = derive_indexes(&schema);
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].path, "profile.contact.email");
    }

    #[test]
    fn test_indexed_object_node_stops_recursion() {
        let schema = schema(serde_json::json!({
            "properties": {
                "address": {
                    "type": "object",
                    "index": { "sparse": true },
                    "properties": {
                        "city": { "type": "string", "index": {} }
                    }
                }
            }
        }));

        let declarations = derive_indexes(&schema);
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].path, "address");
        assert!(declarations[0].options.sparse);
    }

    #[test]
    fn test_array_elements_index_under_array_path() {
        let schema = schema(serde_json::json!({
            "properties": {
                "tags": {
                    "type": "array",
                    "index": { "unique": true },
                    "items": { "type": "string", "index": {} }
                }
            }
        }));

        // The array node's own options are ignored; the element's apply.
        let declarations = derive_indexes(&schema);
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].path, "tags");
        assert!(!declarations[0].options.unique);
    }

    #[test]
    fn test_unannotated_schema_yields_nothing() {
        let schema = schema(serde_json::json!({
            "properties": { "name": { "type": "string" } }
        }));
        assert!(derive_indexes(&schema).is_empty());
    }

    #[tokio::test]
    async fn test_ensure_indexes_is_idempotent() {
        let schema = schema(serde_json::json!({
            "properties": {
                "email": { "type": "string", "index": { "unique": true } }
            }
        }));
        let collection = MemoryCollection::default();

        ensure_indexes(&collection, &schema).await.unwrap();
        ensure_indexes(&collection, &schema).await.unwrap();
    }
}
