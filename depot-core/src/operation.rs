use crate::{
    CacheInvalidator, CacheKey, CachedValue, Connection, DepotCache, DepotConfig, DepotTypes, Driver,
    Entity, EntityDef, Executor, InsertClause, Key, KeyGenerator, Query, Result, RowLabeled,
    RowsAffected, SelectClause, SqlWriter, Statement, UpdateClause, Value, WhereClause, bind,
    stream::TryStreamExt, truncate_long,
};
use std::{future::Future, marker::PhantomData};

/// A read only operation.
///
/// The persistence context consults the cache with [`DepotQuery::cache_key`]
/// before invoking it, and hands it the fresh result afterwards.
pub trait DepotQuery: Send + Sync {
    type Output: Send;

    /// Entities whose tables must be resolved before invoking.
    fn entities(&self) -> Vec<&'static EntityDef> {
        Vec::new()
    }

    fn cache_key(&self) -> Option<CacheKey> {
        None
    }

    /// Turn a cache hit into a result, `None` rejects the hit.
    fn transform_cache_hit(&self, _hit: &CachedValue) -> Option<Self::Output> {
        None
    }

    /// Whether a replica connection can serve it.
    fn is_read_only(&self) -> bool {
        true
    }

    fn invoke<C: Connection>(
        &self,
        connection: &mut C,
        config: &DepotConfig,
    ) -> impl Future<Output = Result<Self::Output>> + Send;

    fn update_cache(&self, _cache: &DepotCache, _result: &Self::Output) {}

    fn description(&self) -> String {
        std::any::type_name::<Self>().to_owned()
    }
}

/// A modifying operation.
///
/// Its invalidator runs before the statement, its cache update after a
/// statement that touched at least one row.
pub trait DepotModifier: Send + Sync {
    fn entities(&self) -> Vec<&'static EntityDef> {
        Vec::new()
    }

    fn cache_invalidator(&self) -> Option<&dyn CacheInvalidator> {
        None
    }

    fn invoke<C: Connection>(
        &mut self,
        connection: &mut C,
        config: &DepotConfig,
    ) -> impl Future<Output = Result<RowsAffected>> + Send;

    fn update_cache(&self, _cache: &DepotCache) {}

    fn description(&self) -> String {
        std::any::type_name::<Self>().to_owned()
    }
}

/// Render `statement`, prepare it and bind its values.
pub async fn prepare_statement<C: Executor>(
    connection: &mut C,
    statement: &Statement,
    config: &DepotConfig,
) -> Result<Query<C::Driver>> {
    let types = DepotTypes::new(statement, config.max_in_values);
    let mut sql = String::with_capacity(128);
    let placeholders = connection
        .driver()
        .sql_writer()
        .write_statement(&types, &mut sql, statement)?;
    let values = bind::collect_bindings(&types, statement, placeholders)?;
    log::debug!("{}", truncate_long(&sql));
    prepare_with(connection, sql, values).await
}

/// Prepare `sql` when it has parameters, keep it raw otherwise.
pub async fn prepare_with<C: Executor>(
    connection: &mut C,
    sql: String,
    values: Vec<Value>,
) -> Result<Query<C::Driver>> {
    if values.is_empty() {
        return Ok(Query::Raw(sql));
    }
    let mut query = connection.prepare(sql).await?;
    bind::bind_values(&mut query, values)?;
    Ok(query)
}

pub async fn fetch_statement<C: Executor>(
    connection: &mut C,
    statement: &Statement,
    config: &DepotConfig,
) -> Result<Vec<RowLabeled>> {
    let query = prepare_statement(connection, statement, config).await?;
    connection.fetch(query).try_collect().await
}

pub async fn execute_statement<C: Executor>(
    connection: &mut C,
    statement: &Statement,
    config: &DepotConfig,
) -> Result<RowsAffected> {
    let query = prepare_statement(connection, statement, config).await?;
    connection.execute(query).await
}

/// Run literal SQL, like DDL.
pub async fn execute_sql<C: Executor>(connection: &mut C, sql: String) -> Result<RowsAffected> {
    log::debug!("{}", truncate_long(&sql));
    connection.execute(Query::Raw(sql)).await
}

/// Loads at most one record, cached by key when the select is a plain key
/// lookup.
pub struct FindOneQuery<E: Entity> {
    select: SelectClause,
    cache_key: Option<CacheKey>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> FindOneQuery<E> {
    pub fn new(select: SelectClause) -> Self {
        let cache_key = match &select.where_clause {
            Some(WhereClause::Key(key))
                if key.entity() == select.entity
                    && select.joins.is_empty()
                    && select.definitions.is_empty()
                    && select.from_override.is_none()
                    && !select.for_update =>
            {
                Some(key.cache_key())
            }
            _ => None,
        };
        Self {
            select,
            cache_key,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> DepotQuery for FindOneQuery<E> {
    type Output = Option<E>;

    fn entities(&self) -> Vec<&'static EntityDef> {
        let mut result = Vec::new();
        self.select.collect_entities(&mut result);
        result
    }

    fn cache_key(&self) -> Option<CacheKey> {
        self.cache_key.clone()
    }

    fn is_read_only(&self) -> bool {
        !self.select.for_update
    }

    fn transform_cache_hit(&self, hit: &CachedValue) -> Option<Self::Output> {
        match hit {
            CachedValue::Null => Some(None),
            CachedValue::Value(..) => hit.downcast_ref::<E>().cloned().map(Some),
        }
    }

    async fn invoke<C: Connection>(
        &self,
        connection: &mut C,
        config: &DepotConfig,
    ) -> Result<Self::Output> {
        let statement = Statement::Select(self.select.clone());
        let mut rows = fetch_statement(connection, &statement, config).await?;
        if rows.len() > 1 {
            log::warn!(
                "Query on {} expected one row, got {}",
                self.select.entity.name,
                rows.len()
            );
        }
        if rows.is_empty() {
            return Ok(None);
        }
        E::from_row(rows.swap_remove(0)).map(Some)
    }

    fn update_cache(&self, cache: &DepotCache, result: &Self::Output) {
        if let Some(key) = &self.cache_key {
            cache.store(key.clone(), CachedValue::from_option(result.clone()));
        }
    }

    fn description(&self) -> String {
        format!("FindOne {}", self.select.entity.name)
    }
}

pub struct FindAllQuery<E: Entity> {
    select: SelectClause,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> FindAllQuery<E> {
    pub fn new(select: SelectClause) -> Self {
        Self {
            select,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> DepotQuery for FindAllQuery<E> {
    type Output = Vec<E>;

    fn entities(&self) -> Vec<&'static EntityDef> {
        let mut result = Vec::new();
        self.select.collect_entities(&mut result);
        result
    }

    fn is_read_only(&self) -> bool {
        !self.select.for_update
    }

    async fn invoke<C: Connection>(
        &self,
        connection: &mut C,
        config: &DepotConfig,
    ) -> Result<Self::Output> {
        let statement = Statement::Select(self.select.clone());
        fetch_statement(connection, &statement, config)
            .await?
            .into_iter()
            .map(E::from_row)
            .collect()
    }

    fn description(&self) -> String {
        format!("FindAll {}", self.select.entity.name)
    }
}

/// Runs an update or delete statement.
///
/// `invalidator` evicts the rows it may touch, `cache_entry` is stored after
/// it changed at least one row.
pub struct StatementModifier {
    statement: Statement,
    invalidator: Option<Box<dyn CacheInvalidator>>,
    cache_entry: Option<(CacheKey, CachedValue)>,
}

impl StatementModifier {
    pub fn new(statement: impl Into<Statement>) -> Self {
        Self {
            statement: statement.into(),
            invalidator: None,
            cache_entry: None,
        }
    }

    pub fn with_invalidator(mut self, invalidator: impl CacheInvalidator + 'static) -> Self {
        self.invalidator = Some(Box::new(invalidator));
        self
    }

    pub fn with_boxed_invalidator(mut self, invalidator: Option<Box<dyn CacheInvalidator>>) -> Self {
        self.invalidator = invalidator;
        self
    }

    pub fn with_cache_entry(mut self, key: CacheKey, value: CachedValue) -> Self {
        self.cache_entry = Some((key, value));
        self
    }
}

impl DepotModifier for StatementModifier {
    fn entities(&self) -> Vec<&'static EntityDef> {
        self.statement.entities()
    }

    fn cache_invalidator(&self) -> Option<&dyn CacheInvalidator> {
        self.invalidator.as_deref()
    }

    async fn invoke<C: Connection>(
        &mut self,
        connection: &mut C,
        config: &DepotConfig,
    ) -> Result<RowsAffected> {
        execute_statement(connection, &self.statement, config).await
    }

    fn update_cache(&self, cache: &DepotCache) {
        if let Some((key, value)) = &self.cache_entry {
            cache.store(key.clone(), value.clone());
        }
    }

    fn description(&self) -> String {
        let kind = match &self.statement {
            Statement::Select(..) => "Select",
            Statement::Insert(..) => "Insert",
            Statement::Update(..) => "Update",
            Statement::Delete(..) => "Delete",
        };
        format!("{} {}", kind, self.statement.entity().name)
    }
}

/// Inserts a record, assigning its generated key.
///
/// Table generated keys are allocated before the insert, identity keys read
/// back after it. The stored record, key included, is then cached.
pub struct InsertModifier<E: Entity> {
    record: E,
    key_generator: Option<KeyGenerator>,
}

impl<E: Entity> InsertModifier<E> {
    pub fn new(record: E, key_generator: Option<KeyGenerator>) -> Self {
        Self {
            record,
            key_generator,
        }
    }

    pub fn record(&self) -> &E {
        &self.record
    }

    pub fn into_record(self) -> E {
        self.record
    }
}

impl<E: Entity> DepotModifier for InsertModifier<E> {
    fn entities(&self) -> Vec<&'static EntityDef> {
        vec![E::entity_def()]
    }

    async fn invoke<C: Connection>(
        &mut self,
        connection: &mut C,
        config: &DepotConfig,
    ) -> Result<RowsAffected> {
        insert_record(connection, config, &mut self.record, self.key_generator.as_ref()).await
    }

    fn update_cache(&self, cache: &DepotCache) {
        match self.record.primary_key() {
            Ok(Some(key)) => cache.store(key.cache_key(), CachedValue::new(self.record.clone())),
            Ok(None) => {}
            Err(e) => log::warn!("Not caching the inserted record: {:#}", e),
        }
    }

    fn description(&self) -> String {
        format!("Insert {}", E::entity_def().name)
    }
}

/// Insert `record`, assigning its generated key when unset.
pub async fn insert_record<C: Connection, E: Entity>(
    connection: &mut C,
    config: &DepotConfig,
    record: &mut E,
    key_generator: Option<&KeyGenerator>,
) -> Result<RowsAffected> {
    if let Some(generator) = key_generator {
        let field = generator.field();
        if !generator.is_post_factum() && field.is_unset(&record.get_field(field.name)?) {
            let value = generator.next_value(connection).await?;
            generator.assign(record, value)?;
        }
    }
    let statement = Statement::Insert(InsertClause::new(&*record)?);
    let identity = matches!(&statement, Statement::Insert(v) if !v.identity_fields.is_empty());
    let result = execute_statement(connection, &statement, config).await?;
    if identity && let Some(generator) = key_generator {
        let value = generator.identity_value(connection, &result).await?;
        generator.assign(record, value)?;
    }
    Ok(result)
}

/// Updates a record by key, inserting it when no row matched or when its
/// key is not assigned yet.
pub struct StoreModifier<E: Entity> {
    record: E,
    key: Option<Key>,
    key_generator: Option<KeyGenerator>,
    created: bool,
}

impl<E: Entity> StoreModifier<E> {
    pub fn new(record: E, key_generator: Option<KeyGenerator>) -> Result<Self> {
        let key = assigned_key(&record)?;
        Ok(Self {
            record,
            key,
            key_generator,
            created: false,
        })
    }

    /// Whether the last invocation inserted the record.
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn into_record(self) -> E {
        self.record
    }
}

/// The primary key of `record` when every key field holds a set value.
pub fn assigned_key<E: Entity>(record: &E) -> Result<Option<Key>> {
    let entity = E::entity_def();
    if !entity.has_primary_key() {
        return Ok(None);
    }
    for field in entity.primary_key_fields() {
        if field.is_unset(&record.get_field(field.name)?) {
            return Ok(None);
        }
    }
    record.primary_key()
}

impl<E: Entity> DepotModifier for StoreModifier<E> {
    fn entities(&self) -> Vec<&'static EntityDef> {
        vec![E::entity_def()]
    }

    fn cache_invalidator(&self) -> Option<&dyn CacheInvalidator> {
        self.key.as_ref().map(|k| k as &dyn CacheInvalidator)
    }

    async fn invoke<C: Connection>(
        &mut self,
        connection: &mut C,
        config: &DepotConfig,
    ) -> Result<RowsAffected> {
        self.created = false;
        if let Some(key) = &self.key {
            let fields = E::entity_def().column_fields().map(|f| f.name);
            let update = UpdateClause::with_record(Some(key.clone().into()), &self.record, fields)?;
            let result = execute_statement(connection, &Statement::Update(update), config).await?;
            if result.rows_affected > 0 {
                return Ok(result);
            }
        }
        let result = insert_record(
            connection,
            config,
            &mut self.record,
            self.key_generator.as_ref(),
        )
        .await?;
        self.created = true;
        Ok(result)
    }

    fn update_cache(&self, cache: &DepotCache) {
        match self.record.primary_key() {
            Ok(Some(key)) => cache.store(key.cache_key(), CachedValue::new(self.record.clone())),
            Ok(None) => {}
            Err(e) => log::warn!("Not caching the stored record: {:#}", e),
        }
    }

    fn description(&self) -> String {
        format!("Store {}", E::entity_def().name)
    }
}
