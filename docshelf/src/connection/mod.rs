use crate::collection::Collection;
use crate::error::{DocshelfError, Result};
use crate::index;
use crate::schema::{self, RawSchema};
use crate::storage::StorageEngine;
use crate::validation::{SchemaValidator, ValidationEngine};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Reconnect behavior delegated to the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    #[default]
    Unlimited,
    Limited(u32),
    Never,
}

/// Connection options merged over these defaults at `init` time and
/// passed through to the storage engine. The layer imposes no timeouts
/// of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub database: Option<String>,
    pub pool_size: u32,
    pub connect_timeout: Duration,
    pub socket_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        ConnectionOptions {
            database: None,
            pool_size: 20,
            connect_timeout: Duration::from_millis(10_000),
            socket_timeout: Duration::from_millis(3_000),
            retry: RetryPolicy::Unlimited,
        }
    }
}

/// Connection configuration: where to connect, and which record types to
/// register. Schemas come from the explicit map, a schema directory, or
/// both (explicit entries win on a name clash).
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub schema_dir: Option<PathBuf>,
    pub schemas: BTreeMap<String, RawSchema>,
    pub connection: ConnectionOptions,
}

impl Config {
    pub fn new(url: impl Into<String>) -> Self {
        Config {
            url: url.into(),
            schema_dir: None,
            schemas: BTreeMap::new(),
            connection: ConnectionOptions::default(),
        }
    }
}

/// The map of collection handles produced by a successful connect, one
/// per registered schema. Cheap to clone; handles share the underlying
/// connection.
#[derive(Clone)]
pub struct Database {
    collections: Arc<BTreeMap<String, Collection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("collections", &self.collections.keys())
            .finish_non_exhaustive()
    }
}

impl Database {
    pub fn collection(&self, name: &str) -> Result<&Collection> {
        self.collections.get(name).ok_or_else(|| {
            DocshelfError::Configuration(format!("collection '{name}' is not registered"))
        })
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

/// Owns the storage connection and the collection-handle map.
///
/// `init` records configuration without connecting; the first `get`
/// performs the one-time connect (resolve schemas, register them with
/// the validation engine, derive and create indexes, build handles) and
/// caches the result. Concurrent first-time callers share a single
/// in-flight connect future; a failed connect leaves the cache empty so
/// a later `get` can retry.
pub struct ConnectionManager {
    engine: Arc<dyn StorageEngine>,
    validator: Arc<dyn ValidationEngine>,
    config: OnceLock<Config>,
    database: OnceCell<Database>,
}

impl ConnectionManager {
    /// Manager backed by the built-in schema validator.
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self::with_validator(engine, Arc::new(SchemaValidator::default()))
    }

    pub fn with_validator(
        engine: Arc<dyn StorageEngine>,
        validator: Arc<dyn ValidationEngine>,
    ) -> Self {
        ConnectionManager {
            engine,
            validator,
            config: OnceLock::new(),
            database: OnceCell::new(),
        }
    }

    /// Record the connection configuration. Does not connect. Calling
    /// `init` twice is a configuration error.
    pub fn init(&self, config: Config) -> Result<()> {
        self.config
            .set(config)
            .map_err(|_| DocshelfError::Configuration("connection already initialized".into()))
    }

    /// The collection-handle map, connecting on first use.
    pub async fn get(&self) -> Result<Database> {
        let config = self.config.get().ok_or_else(|| {
            DocshelfError::Configuration("init must be called before get".into())
        })?;

        let database = self
            .database
            .get_or_try_init(|| self.connect(config))
            .await?;
        Ok(database.clone())
    }

    async fn connect(&self, config: &Config) -> Result<Database> {
        let schemas =
            schema::resolve_schemas(config.schema_dir.as_deref(), &config.schemas)?;

        let connection = self.engine.connect(&config.url, &config.connection).await?;

        let mut collections = BTreeMap::new();
        for (name, record_schema) in schemas {
            self.validator.add_schema(&name, record_schema.clone());
            let storage = connection.collection(&name);
            index::ensure_indexes(storage.as_ref(), &record_schema).await?;
            collections.insert(
                name.clone(),
                Collection::new(name, self.validator.clone(), storage),
            );
        }

        log::info!("connected: {} collection(s) ready", collections.len());
        Ok(Database {
            collections: Arc::new(collections),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::{MemoryConnection, MemoryEngine};
    use crate::storage::StorageConnection;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn user_schemas() -> BTreeMap<String, RawSchema> {
        let mut schemas = BTreeMap::new();
        schemas.insert(
            "users".to_string(),
            serde_json::from_value(json!({
                "properties": {
                    "name": { "type": "string" },
                    "email": { "type": "string", "index": { "unique": true } }
                },
                "required": ["name"]
            }))
            .unwrap(),
        );
        schemas
    }

    fn manager() -> ConnectionManager {
        ConnectionManager::new(Arc::new(MemoryEngine))
    }

    #[tokio::test]
    async fn test_get_before_init_fails() {
        let manager = manager();
        let err = manager.get().await.unwrap_err();
        assert!(matches!(err, DocshelfError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let manager = manager();
        let mut config = Config::new("mem://test");
        config.schemas = user_schemas();
        manager.init(config.clone()).unwrap();
        assert!(manager.init(config).is_err());
    }

    #[tokio::test]
    async fn test_no_schemas_fails_at_connect() {
        let manager = manager();
        manager.init(Config::new("mem://test")).unwrap();
        let err = manager.get().await.unwrap_err();
        assert!(matches!(err, DocshelfError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_end_to_end_through_manager() {
        let manager = manager();
        let mut config = Config::new("mem://test");
        config.schemas = user_schemas();
        manager.init(config).unwrap();

        let db = manager.get().await.unwrap();
        assert_eq!(db.collection_names().collect::<Vec<_>>(), vec!["users"]);

        let users = db.collection("users").unwrap();
        let saved = users
            .save(json!({ "name": "Alice", "email": "a@t.co" }), false)
            .await
            .unwrap();
        assert!(saved["_id"].is_string());

        let found = users.find(None, None, None, false).await.unwrap();
        assert_eq!(found.len(), 1);

        assert!(db.collection("unknown").is_err());
    }

    #[tokio::test]
    async fn test_database_debug_names_collections() {
        let manager = manager();
        let mut config = Config::new("mem://test");
        config.schemas = user_schemas();
        manager.init(config).unwrap();

        let db = manager.get().await.unwrap();
        let rendered = format!("{db:?}");
        assert!(rendered.contains("Database"));
        assert!(rendered.contains("users"));
    }

    #[tokio::test]
    async fn test_repeated_get_returns_same_handles() {
        let manager = manager();
        let mut config = Config::new("mem://test");
        config.schemas = user_schemas();
        manager.init(config).unwrap();

        let first = manager.get().await.unwrap();
        let second = manager.get().await.unwrap();
        assert!(Arc::ptr_eq(&first.collections, &second.collections));
    }

    struct CountingEngine {
        connects: AtomicU32,
    }

    #[async_trait]
    impl StorageEngine for CountingEngine {
        async fn connect(
            &self,
            _url: &str,
            _options: &ConnectionOptions,
        ) -> Result<Arc<dyn StorageConnection>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(Arc::new(MemoryConnection::default()))
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_gets_connect_once() {
        let engine = Arc::new(CountingEngine {
            connects: AtomicU32::new(0),
        });
        let manager = ConnectionManager::new(engine.clone());
        let mut config = Config::new("mem://test");
        config.schemas = user_schemas();
        manager.init(config).unwrap();

        let (a, b, c) = tokio::join!(manager.get(), manager.get(), manager.get());
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(engine.connects.load(Ordering::SeqCst), 1);
    }

    struct FlakyEngine {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl StorageEngine for FlakyEngine {
        async fn connect(
            &self,
            _url: &str,
            _options: &ConnectionOptions,
        ) -> Result<Arc<dyn StorageConnection>> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DocshelfError::Engine("connection refused".into()));
            }
            Ok(Arc::new(MemoryConnection::default()))
        }
    }

    #[tokio::test]
    async fn test_failed_connect_can_be_retried() {
        let manager = ConnectionManager::new(Arc::new(FlakyEngine {
            attempts: AtomicU32::new(0),
        }));
        let mut config = Config::new("mem://test");
        config.schemas = user_schemas();
        manager.init(config).unwrap();

        assert!(manager.get().await.is_err());
        assert!(manager.get().await.is_ok());
    }

    #[test]
    fn test_default_connection_options() {
        let options = ConnectionOptions::default();
        assert_eq!(options.pool_size, 20);
        assert_eq!(options.connect_timeout, Duration::from_millis(10_000));
        assert_eq!(options.socket_timeout, Duration::from_millis(3_000));
        assert_eq!(options.retry, RetryPolicy::Unlimited);
    }
}
