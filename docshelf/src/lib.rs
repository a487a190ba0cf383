pub mod collection;
pub mod connection;
pub mod document;
pub mod error;
pub mod index;
pub mod schema;
pub mod storage;
pub mod validation;

pub use collection::Collection;
pub use connection::{Config, ConnectionManager, ConnectionOptions, Database, RetryPolicy};
pub use document::new_id;
pub use error::{DocshelfError, Result, Violation};
pub use schema::{RawSchema, RecordSchema};
