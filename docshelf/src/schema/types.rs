use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Caller-declared definition of one record type, before compilation.
/// Mirrors the `{properties, required}` shape of a JSON-Schema object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySpec>,
    #[serde(default)]
    pub required: Vec<String>,
}

/// One node in a schema's property tree.
///
/// `properties` is populated for object nodes, `items` for array nodes.
/// A node carrying `index` options becomes a secondary-index declaration
/// when the tree is walked (see the `index` module).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySpec {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertySpec>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySpec>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexOptions>,
}

impl PropertySpec {
    /// A bare node of the given type, no children and no index options.
    pub fn scalar(value_type: ValueType) -> Self {
        PropertySpec {
            value_type,
            properties: None,
            required: Vec::new(),
            items: None,
            enum_values: None,
            index: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

/// Options passed through verbatim to the storage engine's index creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOptions {
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sparse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_after_secs: Option<u64>,
}

/// A compiled record schema: `$id` bound to the schema name, bookkeeping
/// properties injected. Built once at registration time, immutable after.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSchema {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub properties: BTreeMap<String, PropertySpec>,
    pub required: Vec<String>,
}
