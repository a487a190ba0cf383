use crate::error::Violation;
use crate::schema::{PropertySpec, RecordSchema, ValueType};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Pass/fail verdict for one document against one registered schema.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl Verdict {
    pub fn ok() -> Self {
        Verdict {
            valid: true,
            violations: Vec::new(),
        }
    }

    pub fn fail(violations: Vec<Violation>) -> Self {
        Verdict {
            valid: false,
            violations,
        }
    }

    fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Verdict::ok()
        } else {
            Verdict::fail(violations)
        }
    }
}

/// The validation collaborator: schemas are registered once at connect
/// time, then consulted synchronously on every save/patch.
pub trait ValidationEngine: Send + Sync {
    fn add_schema(&self, name: &str, schema: RecordSchema);
    fn validate(&self, document: &Value, schema_name: &str) -> Verdict;
}

/// Built-in validator covering the subset of JSON Schema the property
/// model expresses: type checks, required fields, enums, nested object
/// properties and array items. Properties not declared in the schema are
/// rejected.
#[derive(Default)]
pub struct SchemaValidator {
    schemas: RwLock<BTreeMap<String, RecordSchema>>,
}

impl ValidationEngine for SchemaValidator {
    fn add_schema(&self, name: &str, schema: RecordSchema) {
        let mut schemas = self.schemas.write().unwrap_or_else(|e| e.into_inner());
        schemas.insert(name.to_string(), schema);
    }

    fn validate(&self, document: &Value, schema_name: &str) -> Verdict {
        let schemas = self.schemas.read().unwrap_or_else(|e| e.into_inner());
        let schema = match schemas.get(schema_name) {
            Some(schema) => schema,
            None => {
                return Verdict::fail(vec![Violation::message(format!(
                    "unknown schema '{schema_name}'"
                ))])
            }
        };

        let object = match document.as_object() {
            Some(object) => object,
            None => {
                return Verdict::fail(vec![Violation::message(
                    "document must be a JSON object",
                )])
            }
        };

        let mut violations = Vec::new();

        for field in &schema.required {
            if object.get(field).map_or(true, Value::is_null) {
                violations.push(Violation::at(
                    field.clone(),
                    format!("Required field '{field}' is missing"),
                ));
            }
        }

        for (name, value) in object {
            match schema.properties.get(name) {
                Some(spec) => {
                    if !value.is_null() {
                        check_value(spec, value, name, &mut violations);
                    }
                }
                None => violations.push(Violation::at(
                    name.clone(),
                    format!("Unknown property '{name}'"),
                )),
            }
        }

        Verdict::from_violations(violations)
    }
}

fn check_value(spec: &PropertySpec, value: &Value, path: &str, out: &mut Vec<Violation>) {
    match spec.value_type {
        ValueType::String => {
            if !value.is_string() {
                out.push(type_violation(path, "string", value));
                return;
            }
        }
        ValueType::Number => {
            if !value.is_number() {
                out.push(type_violation(path, "number", value));
                return;
            }
        }
        ValueType::Integer => {
            if !value.is_i64() && !value.is_u64() {
                out.push(type_violation(path, "integer", value));
                return;
            }
        }
        ValueType::Boolean => {
            if !value.is_boolean() {
                out.push(type_violation(path, "boolean", value));
                return;
            }
        }
        ValueType::Object => {
            let object = match value.as_object() {
                Some(object) => object,
                None => {
                    out.push(type_violation(path, "object", value));
                    return;
                }
            };

            for field in &spec.required {
                if object.get(field).map_or(true, Value::is_null) {
                    out.push(Violation::at(
                        format!("{path}.{field}"),
                        format!("Required field '{path}.{field}' is missing"),
                    ));
                }
            }

            if let Some(children) = &spec.properties {
                for (name, child_value) in object {
                    match children.get(name) {
                        Some(child) => {
                            if !child_value.is_null() {
                                check_value(
                                    child,
                                    child_value,
                                    &format!("{path}.{name}"),
                                    out,
                                );
                            }
                        }
                        None => out.push(Violation::at(
                            format!("{path}.{name}"),
                            format!("Unknown property '{path}.{name}'"),
                        )),
                    }
                }
            }
        }
        ValueType::Array => {
            let elements = match value.as_array() {
                Some(elements) => elements,
                None => {
                    out.push(type_violation(path, "array", value));
                    return;
                }
            };
            if let Some(items) = &spec.items {
                for (i, element) in elements.iter().enumerate() {
                    check_value(items, element, &format!("{path}[{i}]"), out);
                }
            }
        }
    }

    if let Some(allowed) = &spec.enum_values {
        if !allowed.contains(value) {
            out.push(Violation::at(
                path.to_string(),
                format!("Value {value} is not one of the allowed values"),
            ));
        }
    }
}

fn type_violation(path: &str, expected: &str, value: &Value) -> Violation {
    Violation::at(
        path.to_string(),
        format!("expected {expected}, got {}", type_name(value)),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
