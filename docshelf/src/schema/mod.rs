mod compiler;
mod registry;
mod types;

pub use compiler::{compile_schema, BOOKKEEPING_FIELDS};
pub use registry::{load_schema_dir, resolve_schemas};
pub use types::{IndexOptions, PropertySpec, RawSchema, RecordSchema, ValueType};
