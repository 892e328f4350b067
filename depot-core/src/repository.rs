use crate::{
    CacheInvalidator, CachedValue, Clause, ConnectionProvider, DeleteClause, Entity, EntityDef,
    Expression, FindAllQuery, FindOneQuery, InsertModifier, Key, PersistenceContext, Result,
    SelectClause, StatementModifier, StoreModifier, UpdateClause, Value, WhereClause,
    error::configuration_error,
};
use std::sync::Arc;

/// Typed access to the records of a database.
///
/// Every method runs one query or modifier through the shared
/// [`PersistenceContext`], modifiers return the number of rows touched.
pub struct DepotRepository<P: ConnectionProvider> {
    context: Arc<PersistenceContext<P>>,
}

impl<P: ConnectionProvider> Clone for DepotRepository<P> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<P: ConnectionProvider> DepotRepository<P> {
    pub fn new(context: Arc<PersistenceContext<P>>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<PersistenceContext<P>> {
        &self.context
    }

    /// Load the record with primary key `key`.
    pub async fn load<E: Entity>(&self, key: Key) -> Result<Option<E>> {
        if key.entity() != E::entity_def() {
            return Err(configuration_error(format!(
                "Key of {} used to load {}",
                key.entity().name,
                E::entity_def().name
            )));
        }
        self.load_with([Clause::where_(key)]).await
    }

    /// Load the first record selected by `clauses`.
    pub async fn load_with<E: Entity>(
        &self,
        clauses: impl IntoIterator<Item = Clause>,
    ) -> Result<Option<E>> {
        let select = SelectClause::new(E::entity_def(), clauses)?;
        self.context
            .invoke_query(&FindOneQuery::<E>::new(select))
            .await
    }

    pub async fn find_all<E: Entity>(
        &self,
        clauses: impl IntoIterator<Item = Clause>,
    ) -> Result<Vec<E>> {
        let select = SelectClause::new(E::entity_def(), clauses)?;
        self.context
            .invoke_query(&FindAllQuery::<E>::new(select))
            .await
    }

    /// Insert `record`, writing back the key generated for it.
    pub async fn insert<E: Entity>(&self, record: &mut E) -> Result<u64> {
        let marshaller = self.context.marshaller(E::entity_def()).await?;
        let mut modifier =
            InsertModifier::new(record.clone(), marshaller.key_generator().cloned());
        let result = self.context.invoke_modifier(&mut modifier).await?;
        *record = modifier.into_record();
        Ok(result.rows_affected)
    }

    /// Update every column of `record`, the cache then holds `record`.
    pub async fn update<E: Entity>(&self, record: &E) -> Result<u64> {
        let key = required_key(record, "update")?;
        let fields = E::entity_def()
            .column_fields()
            .filter(|f| !f.primary_key)
            .map(|f| f.name);
        let update = UpdateClause::with_record(Some(key.clone().into()), record, fields)?;
        let mut modifier = StatementModifier::new(update)
            .with_invalidator(key.clone())
            .with_cache_entry(key.cache_key(), CachedValue::new(record.clone()));
        Ok(self.context.invoke_modifier(&mut modifier).await?.rows_affected)
    }

    /// Update some columns of `record`, its cache entry is evicted.
    pub async fn update_fields<E: Entity, N: AsRef<str>>(
        &self,
        record: &E,
        fields: impl IntoIterator<Item = N>,
    ) -> Result<u64> {
        let key = required_key(record, "update")?;
        let update = UpdateClause::with_record(Some(key.clone().into()), record, fields)?;
        let mut modifier = StatementModifier::new(update).with_invalidator(key);
        Ok(self.context.invoke_modifier(&mut modifier).await?.rows_affected)
    }

    /// Assign `fields` to the row with primary key `key`.
    pub async fn update_partial<N: AsRef<str>>(
        &self,
        key: Key,
        fields: impl IntoIterator<Item = (N, Value)>,
    ) -> Result<u64> {
        let entity = key.entity();
        let invalidator: Box<dyn CacheInvalidator> = Box::new(key.clone());
        self.update_partial_where(entity, key, Some(invalidator), fields)
            .await
    }

    /// Assign `fields` to every row matching `where_clause`.
    pub async fn update_partial_where<N: AsRef<str>>(
        &self,
        entity: &'static EntityDef,
        where_clause: impl Into<WhereClause>,
        invalidator: Option<Box<dyn CacheInvalidator>>,
        fields: impl IntoIterator<Item = (N, Value)>,
    ) -> Result<u64> {
        let assignments = fields.into_iter().map(|(n, v)| (n, Expression::Value(v)));
        let update = UpdateClause::new(entity, Some(where_clause.into()), assignments)?;
        let mut modifier = StatementModifier::new(update).with_boxed_invalidator(invalidator);
        Ok(self.context.invoke_modifier(&mut modifier).await?.rows_affected)
    }

    /// Assign literal SQL to the columns of the row with primary key `key`,
    /// like `count + 1` or `NOW()`.
    pub async fn update_literal<N: AsRef<str>>(
        &self,
        key: Key,
        fields: impl IntoIterator<Item = (N, &'static str)>,
    ) -> Result<u64> {
        let assignments = fields
            .into_iter()
            .map(|(n, literal)| (n, Expression::literal(literal)));
        let update = UpdateClause::new(key.entity(), Some(key.clone().into()), assignments)?;
        let mut modifier = StatementModifier::new(update).with_invalidator(key);
        Ok(self.context.invoke_modifier(&mut modifier).await?.rows_affected)
    }

    /// Update `record` or insert it when absent, returns whether it was
    /// inserted.
    ///
    /// Records whose key is not assigned yet are inserted right away.
    pub async fn store<E: Entity>(&self, record: &mut E) -> Result<bool> {
        let marshaller = self.context.marshaller(E::entity_def()).await?;
        let mut modifier =
            StoreModifier::new(record.clone(), marshaller.key_generator().cloned())?;
        self.context.invoke_modifier(&mut modifier).await?;
        let created = modifier.created();
        *record = modifier.into_record();
        Ok(created)
    }

    /// Delete the row of `record`.
    pub async fn delete<E: Entity>(&self, record: &E) -> Result<u64> {
        let key = required_key(record, "delete")?;
        self.delete_key(key).await
    }

    /// Delete the row with primary key `key`.
    pub async fn delete_key(&self, key: Key) -> Result<u64> {
        let entity = key.entity();
        let invalidator: Box<dyn CacheInvalidator> = Box::new(key.clone());
        self.delete_all(entity, key, Some(invalidator)).await
    }

    /// Delete every row matching `where_clause`.
    pub async fn delete_all(
        &self,
        entity: &'static EntityDef,
        where_clause: impl Into<WhereClause>,
        invalidator: Option<Box<dyn CacheInvalidator>>,
    ) -> Result<u64> {
        let delete = DeleteClause::new(entity, where_clause)?;
        let mut modifier = StatementModifier::new(delete).with_boxed_invalidator(invalidator);
        Ok(self.context.invoke_modifier(&mut modifier).await?.rows_affected)
    }
}

fn required_key<E: Entity>(record: &E, action: &str) -> Result<Key> {
    record.primary_key()?.ok_or_else(|| {
        configuration_error(format!(
            "Can't {} {} with null primary key",
            action,
            E::entity_def().name
        ))
    })
}
