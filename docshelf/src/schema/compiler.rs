use super::types::{PropertySpec, RawSchema, RecordSchema, ValueType};
use std::collections::BTreeMap;

/// The five bookkeeping properties injected into every compiled schema.
pub const BOOKKEEPING_FIELDS: [&str; 5] =
    ["_id", "_created", "_updated", "_deleted", "_isDeleted"];

/// Compile a raw `{properties, required}` definition into a canonical
/// record schema. Pure and infallible: malformed definitions surface as
/// validation failures later, not here.
///
/// Caller-declared properties overlay the bookkeeping ones on a name
/// conflict (declaring a property named `_id` etc. is a caller error).
/// Bookkeeping fields are never forced into `required`.
pub fn compile_schema(name: &str, raw: &RawSchema) -> RecordSchema {
    let mut properties: BTreeMap<String, PropertySpec> = BTreeMap::new();
    properties.insert("_id".into(), PropertySpec::scalar(ValueType::String));
    properties.insert("_created".into(), PropertySpec::scalar(ValueType::Number));
    properties.insert("_updated".into(), PropertySpec::scalar(ValueType::Number));
    properties.insert("_deleted".into(), PropertySpec::scalar(ValueType::Number));
    properties.insert("_isDeleted".into(), PropertySpec::scalar(ValueType::Boolean));

    for (key, spec) in &raw.properties {
        properties.insert(key.clone(), spec.clone());
    }

    RecordSchema {
        id: name.to_string(),
        value_type: ValueType::Object,
        properties,
        required: raw.required.clone(),
    }
}
