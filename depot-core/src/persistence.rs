use crate::{
    CacheAdapter, CacheKey, CacheListener, CachedValue, ConnectionProvider,
    DataMigration, DepotCache, DepotConfig, DepotError, DepotModifier, DepotQuery, Driver,
    EntityDef, Error, Executor, InMemoryCacheAdapter, Marshaller, Result, RowsAffected,
    SchemaMigration,
    error::configuration_error,
    marshaller::TableResolution,
    migration::{LedgerAction, LedgerModifier},
};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::OnceCell;

type MarshallerCell = Arc<OnceCell<Arc<Marshaller>>>;

/// Entry point of every database operation.
///
/// Owns the connection provider, the cache and the resolved entities. Each
/// query or modifier runs on its own connection: entities resolve first,
/// the cache is consulted or invalidated, the operation runs (retried once on
/// a transient failure) and the cache is updated with the outcome.
pub struct PersistenceContext<P: ConnectionProvider> {
    provider: P,
    config: DepotConfig,
    cache: DepotCache,
    marshallers: Mutex<HashMap<&'static str, MarshallerCell>>,
    migrations: Mutex<HashMap<&'static str, Vec<SchemaMigration>>>,
}

impl<P: ConnectionProvider> PersistenceContext<P> {
    /// A context caching in process memory when `config.use_cache` is set.
    pub fn new(provider: P, config: DepotConfig) -> Self {
        let adapter: Option<Arc<dyn CacheAdapter>> = if config.use_cache {
            Some(Arc::new(InMemoryCacheAdapter::new()))
        } else {
            None
        };
        Self::with_cache_adapter(provider, config, adapter)
    }

    /// A context caching through `adapter`, `None` disables caching.
    pub fn with_cache_adapter(
        provider: P,
        config: DepotConfig,
        adapter: Option<Arc<dyn CacheAdapter>>,
    ) -> Self {
        Self {
            provider,
            config,
            cache: DepotCache::new(adapter),
            marshallers: Default::default(),
            migrations: Default::default(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &DepotConfig {
        &self.config
    }

    pub fn cache(&self) -> &DepotCache {
        &self.cache
    }

    /// Register a schema migration, it must happen before the entity is
    /// first used.
    pub fn register_migration(
        &self,
        entity: &'static EntityDef,
        migration: SchemaMigration,
    ) -> Result<()> {
        migration.validate(entity)?;
        if self
            .marshallers
            .lock()
            .get(entity.name)
            .is_some_and(|c| c.initialized())
        {
            return Err(configuration_error(format!(
                "Migrations must be registered before {} is resolved",
                entity.name
            )));
        }
        self.migrations
            .lock()
            .entry(entity.name)
            .or_default()
            .push(migration);
        Ok(())
    }

    /// The marshaller of `entity`, resolving its table on first use.
    ///
    /// Concurrent callers share a single resolution, a failed one is
    /// attempted again by the next caller.
    pub async fn marshaller(&self, entity: &'static EntityDef) -> Result<Arc<Marshaller>> {
        let cell = self
            .marshallers
            .lock()
            .entry(entity.name)
            .or_default()
            .clone();
        cell.get_or_try_init(|| async {
            let migrations = self
                .migrations
                .lock()
                .get(entity.name)
                .cloned()
                .unwrap_or_default();
            let mut resolution = TableResolution::new(entity, migrations);
            self.run_modifier(&mut resolution).await?;
            Ok::<_, Error>(Arc::new(resolution.into_marshaller()))
        })
        .await
        .cloned()
    }

    async fn resolve_entities(&self, entities: Vec<&'static EntityDef>) -> Result<()> {
        for entity in entities {
            if let Some(shadow) = entity.computed.and_then(|c| c.shadow_of) {
                self.marshaller(shadow).await?;
            }
            self.marshaller(entity).await?;
        }
        Ok(())
    }

    /// Run a query, serving it from the cache when possible.
    pub async fn invoke_query<Q: DepotQuery>(&self, query: &Q) -> Result<Q::Output> {
        self.resolve_entities(query.entities()).await?;
        let key = if self.cache.is_enabled() {
            query.cache_key()
        } else {
            None
        };
        if let Some(key) = &key
            && let Some(hit) = self.cache.lookup(key)
            && let Some(result) = query.transform_cache_hit(&hit)
        {
            return Ok(result);
        }
        let result = self.run_query(query).await?;
        query.update_cache(&self.cache, &result);
        Ok(result)
    }

    /// Run a modifier, invalidating what it makes stale before and caching
    /// what it wrote after.
    pub async fn invoke_modifier<M: DepotModifier>(&self, modifier: &mut M) -> Result<RowsAffected> {
        self.resolve_entities(modifier.entities()).await?;
        self.run_modifier(modifier).await
    }

    async fn run_query<Q: DepotQuery>(&self, query: &Q) -> Result<Q::Output> {
        let ident = self.config.ident.as_str();
        let read_only = query.is_read_only();
        let mut retry = self.config.retry_transient;
        loop {
            let mut connection = self.provider.get_connection(ident, read_only).await?;
            match query.invoke(&mut connection, &self.config).await {
                Ok(result) => {
                    self.provider
                        .release_connection(ident, read_only, connection);
                    return Ok(result);
                }
                Err(e) => {
                    let transient = connection.driver().is_transient(&e);
                    self.provider
                        .connection_failed(ident, read_only, connection, &e);
                    if transient && retry && DepotError::of(&e).is_none() {
                        log::info!(
                            "Transient failure executing {}, retrying: {:#}",
                            query.description(),
                            e
                        );
                        retry = false;
                        continue;
                    }
                    return Err(operation_failure(
                        e,
                        false,
                        DepotError::QueryFailure(query.description()),
                    ));
                }
            }
        }
    }

    async fn run_modifier<M: DepotModifier>(&self, modifier: &mut M) -> Result<RowsAffected> {
        if let Some(invalidator) = modifier.cache_invalidator() {
            invalidator.invalidate(&self.cache);
        }
        let ident = self.config.ident.as_str();
        let mut retry = self.config.retry_transient;
        let result = loop {
            let mut connection = self.provider.get_connection(ident, false).await?;
            match modifier.invoke(&mut connection, &self.config).await {
                Ok(result) => {
                    self.provider.release_connection(ident, false, connection);
                    break result;
                }
                Err(e) => {
                    let driver = connection.driver();
                    let duplicate = driver.is_duplicate_row(&e);
                    let transient = driver.is_transient(&e);
                    self.provider.connection_failed(ident, false, connection, &e);
                    if transient && retry && DepotError::of(&e).is_none() {
                        log::info!(
                            "Transient failure executing {}, retrying: {:#}",
                            modifier.description(),
                            e
                        );
                        retry = false;
                        continue;
                    }
                    return Err(operation_failure(
                        e,
                        duplicate,
                        DepotError::ModifierFailure(modifier.description()),
                    ));
                }
            }
        };
        if result.rows_affected > 0 {
            modifier.update_cache(&self.cache);
        }
        Ok(result)
    }

    /// Run a data migration unless the ledger says it already ran.
    ///
    /// Returns whether the migration ran. A failed migration releases its
    /// claim so a later attempt runs it again.
    pub async fn run_migration<D: DataMigration>(&self, migration: &D) -> Result<bool> {
        let ident = migration.ident();
        let claim = self
            .run_modifier(&mut LedgerModifier {
                action: LedgerAction::Claim(ident),
            })
            .await;
        match claim {
            Err(e) if DepotError::is_duplicate_key(&e) => {
                log::info!("Data migration {} already applied", ident);
                return Ok(false);
            }
            Err(e) => return Err(e),
            Ok(..) => {}
        }
        log::info!("Running data migration {}", ident);
        if let Err(e) = migration.invoke(self).await {
            let e = e.context(format!("Data migration {} failed", ident));
            log::error!("{:#}", e);
            let release = self
                .run_modifier(&mut LedgerModifier {
                    action: LedgerAction::Release(ident),
                })
                .await;
            if let Err(release) = release {
                log::error!("Could not release data migration {}: {:#}", ident, release);
            }
            return Err(e);
        }
        self.run_modifier(&mut LedgerModifier {
            action: LedgerAction::Complete(ident),
        })
        .await?;
        log::info!("Data migration {} completed", ident);
        Ok(true)
    }

    /// Register a listener told about the entries leaving `cache_id`.
    pub fn add_cache_listener(&self, cache_id: impl Into<String>, listener: impl CacheListener + 'static) {
        self.cache.add_listener(cache_id, Arc::new(listener));
    }

    pub fn cache_lookup(&self, key: &CacheKey) -> Option<CachedValue> {
        self.cache.lookup(key)
    }

    pub fn cache_store(&self, key: CacheKey, value: CachedValue) {
        self.cache.store(key, value);
    }

    pub fn cache_invalidate(&self, key: &CacheKey) {
        self.cache.invalidate(key);
    }

    /// Evict the entries of `cache_id` matching `filter`.
    pub fn cache_traverse(&self, cache_id: &str, filter: impl Fn(&CacheKey, &CachedValue) -> bool) {
        self.cache.evict_matching(cache_id, filter);
    }
}

/// Classify the failure of an operation.
///
/// Errors already carrying a [`DepotError`] pass through, unique constraint
/// violations become [`DepotError::DuplicateKey`] and anything else is
/// wrapped in `failure`.
fn operation_failure(error: Error, duplicate: bool, failure: DepotError) -> Error {
    if DepotError::of(&error).is_some() {
        return error;
    }
    if duplicate {
        let message = error.to_string();
        let message = message.lines().next().unwrap_or_default().to_owned();
        let error = error.context(DepotError::DuplicateKey(message));
        log::debug!("{:#}", error);
        return error;
    }
    let error = error.context(failure);
    log::error!("{:#}", error);
    error
}
