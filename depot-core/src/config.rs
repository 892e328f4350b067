use crate::{Error, Result};
use std::env;

/// Knobs of a [`PersistenceContext`](crate::PersistenceContext).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepotConfig {
    /// Connection identity handed to the connection provider.
    pub ident: String,
    /// Largest collection accepted by an `IN (...)` condition.
    pub max_in_values: usize,
    /// Retry once operations that failed with a transient error.
    pub retry_transient: bool,
    pub use_cache: bool,
    /// Drop columns found on disk but no longer declared by the entity.
    pub drop_undeclared_columns: bool,
    pub schema_version_table: String,
    pub migration_history_table: String,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            ident: "depot".into(),
            max_in_values: 32767,
            retry_transient: true,
            use_cache: true,
            drop_undeclared_columns: true,
            schema_version_table: "DepotSchemaVersion".into(),
            migration_history_table: "DepotMigrationHistory".into(),
        }
    }
}

impl DepotConfig {
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            ..Default::default()
        }
    }

    pub fn with_max_in_values(mut self, max_in_values: usize) -> Self {
        self.max_in_values = max_in_values;
        self
    }

    pub fn with_retry_transient(mut self, retry_transient: bool) -> Self {
        self.retry_transient = retry_transient;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_drop_undeclared_columns(mut self, drop: bool) -> Self {
        self.drop_undeclared_columns = drop;
        self
    }

    pub fn with_schema_version_table(mut self, table: impl Into<String>) -> Self {
        self.schema_version_table = table.into();
        self
    }

    pub fn with_migration_history_table(mut self, table: impl Into<String>) -> Self {
        self.migration_history_table = table.into();
        self
    }

    /// Defaults overridden by the `DEPOT_*` environment variables that are set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(v) = env::var("DEPOT_IDENT") {
            config.ident = v;
        }
        if let Some(v) = parse_var::<usize>("DEPOT_MAX_IN_VALUES")? {
            config.max_in_values = v;
        }
        if let Some(v) = parse_var::<bool>("DEPOT_RETRY_TRANSIENT")? {
            config.retry_transient = v;
        }
        if let Some(v) = parse_var::<bool>("DEPOT_USE_CACHE")? {
            config.use_cache = v;
        }
        if let Some(v) = parse_var::<bool>("DEPOT_DROP_UNDECLARED_COLUMNS")? {
            config.drop_undeclared_columns = v;
        }
        if let Ok(v) = env::var("DEPOT_SCHEMA_VERSION_TABLE") {
            config.schema_version_table = v;
        }
        if let Ok(v) = env::var("DEPOT_MIGRATION_HISTORY_TABLE") {
            config.migration_history_table = v;
        }
        Ok(config)
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::new(e).context(format!("Invalid value `{}` for {}", v, name))),
        Err(..) => Ok(None),
    }
}
