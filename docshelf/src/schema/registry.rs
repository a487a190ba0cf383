use super::compiler::compile_schema;
use super::types::{RawSchema, RecordSchema};
use crate::error::{DocshelfError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Load raw schema definitions from a directory: every non-directory
/// `*.json` entry becomes one definition, named by its file stem.
///
/// This is a convenience for hosts that keep schemas on disk; the
/// registry itself works from the in-memory map.
pub fn load_schema_dir(dir: &Path) -> Result<BTreeMap<String, RawSchema>> {
    let mut schemas = BTreeMap::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let name = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        let content = std::fs::read_to_string(&path)?;
        let raw: RawSchema = serde_json::from_str(&content)?;
        schemas.insert(name, raw);
    }

    Ok(schemas)
}

/// Resolve and compile every configured schema: definitions loaded from
/// `schema_dir` (when given) plus the explicit map, explicit entries
/// winning on a name clash. Zero resolved schemas is a configuration
/// error - the layer is useless without any record types.
pub fn resolve_schemas(
    schema_dir: Option<&Path>,
    explicit: &BTreeMap<String, RawSchema>,
) -> Result<BTreeMap<String, RecordSchema>> {
    let mut raw = match schema_dir {
        Some(dir) => load_schema_dir(dir)?,
        None => BTreeMap::new(),
    };
    for (name, schema) in explicit {
        raw.insert(name.clone(), schema.clone());
    }

    if raw.is_empty() {
        return Err(DocshelfError::Configuration(
            "no schemas configured: provide a schema directory or an explicit schema map".into(),
        ));
    }

    let mut compiled = BTreeMap::new();
    for (name, schema) in &raw {
        log::debug!("compiling schema '{name}'");
        compiled.insert(name.clone(), compile_schema(name, schema));
    }
    Ok(compiled)
}
