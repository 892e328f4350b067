use crate::{
    Connection, DepotConfig, DepotModifier, DepotTypes, Driver, EntityDef, Executor, KeyGenerator,
    Result, RowsAffected, SchemaMigration, SqlWriter, TableMeta, Value, operation,
    stream::TryStreamExt, writer::Context,
};

/// Lifecycle of the table behind an entity.
///
/// `Unresolved -> Resolving -> {Created | Migrating -> Migrated} -> Ready`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Unresolved,
    Resolving,
    Created,
    Migrating,
    Migrated,
    Ready,
}

/// A resolved entity: its table exists and matches the declaration.
#[derive(Debug)]
pub struct Marshaller {
    entity: &'static EntityDef,
    key_generator: Option<KeyGenerator>,
    history: Vec<TableState>,
}

impl Marshaller {
    pub fn entity(&self) -> &'static EntityDef {
        self.entity
    }

    pub fn key_generator(&self) -> Option<&KeyGenerator> {
        self.key_generator.as_ref()
    }

    pub fn state(&self) -> TableState {
        self.history.last().copied().unwrap_or(TableState::Unresolved)
    }

    /// The states crossed while resolving.
    pub fn history(&self) -> &[TableState] {
        &self.history
    }
}

/// Creates or migrates the table of an entity.
pub(crate) struct TableResolution {
    entity: &'static EntityDef,
    migrations: Vec<SchemaMigration>,
    key_generator: Option<KeyGenerator>,
    history: Vec<TableState>,
}

impl TableResolution {
    pub fn new(entity: &'static EntityDef, mut migrations: Vec<SchemaMigration>) -> Self {
        migrations.sort_by_key(SchemaMigration::target_version);
        Self {
            entity,
            migrations,
            key_generator: KeyGenerator::for_entity(entity),
            history: vec![TableState::Unresolved],
        }
    }

    pub fn into_marshaller(self) -> Marshaller {
        Marshaller {
            entity: self.entity,
            key_generator: self.key_generator,
            history: self.history,
        }
    }

    fn transition(&mut self, state: TableState) {
        log::debug!("Table of {} is {:?}", self.entity.name, state);
        self.history.push(state);
    }

    async fn create<C: Connection>(&mut self, connection: &mut C, config: &DepotConfig) -> Result<()> {
        let entity = self.entity;
        let writer = connection.driver().sql_writer();
        let mut sql = String::with_capacity(256);
        writer.write_create_table(&mut sql, entity)?;
        log::info!("Creating table {}: {}", entity.table, sql);
        operation::execute_sql(connection, sql).await?;
        for index in entity.indexes {
            let columns = index_columns(entity, index.fields)?;
            let mut sql = String::with_capacity(64);
            writer.write_create_index(&mut sql, entity.table, index.name, &columns, index.unique);
            operation::execute_sql(connection, sql).await?;
        }
        for index in entity.full_text_indexes {
            for sql in writer.full_text_index_statements(entity, index)? {
                operation::execute_sql(connection, sql).await?;
            }
        }
        update_version(connection, config, entity.table, entity.version.max(1)).await?;
        self.transition(TableState::Created);
        Ok(())
    }

    async fn migrate<C: Connection>(
        &mut self,
        connection: &mut C,
        config: &DepotConfig,
        current_version: i32,
    ) -> Result<()> {
        let entity = self.entity;
        let table = entity.table;
        log::info!(
            "Migrating {} from {} to {}",
            table,
            current_version,
            entity.version
        );
        self.transition(TableState::Migrating);
        for migration in self
            .migrations
            .iter()
            .filter(|m| m.run_before_default() && m.should_run(current_version))
        {
            migration.apply(entity, connection).await?;
        }

        let meta = connection.table_metadata(table).await?.unwrap_or_default();
        let writer = connection.driver().sql_writer();
        for field in entity.column_fields() {
            if meta.has_column(field.column) {
                continue;
            }
            let definition = writer.column_definition(field, None)?;
            log::info!("Adding column to {}: {} {}", table, field.column, definition);
            let mut sql = String::with_capacity(64);
            writer.write_add_column(&mut sql, table, field.column, &definition);
            operation::execute_sql(connection, sql).await?;
            if matches!(field.value, Value::Timestamp(..)) {
                let mut sql = String::with_capacity(64);
                writer.write_set_now(&mut sql, table, field.column);
                log::info!("Assigning current time to TIMESTAMP column: {}", sql);
                operation::execute_sql(connection, sql).await?;
            }
        }
        if config.drop_undeclared_columns {
            for column in undeclared_columns(entity, &meta, &writer) {
                log::info!("Dropping undeclared column {}.{}", table, column);
                let mut sql = String::with_capacity(64);
                writer.write_drop_column(&mut sql, table, column);
                operation::execute_sql(connection, sql).await?;
            }
        }
        if entity.has_primary_key() && !meta.has_primary_key {
            let columns: Vec<&str> = entity.primary_key_fields().map(|f| f.column).collect();
            log::info!("Adding primary key to {}: {:?}", table, columns);
            let mut sql = String::with_capacity(64);
            writer.write_add_primary_key(&mut sql, table, &columns);
            operation::execute_sql(connection, sql).await?;
        } else if !entity.has_primary_key() && meta.has_primary_key {
            log::info!("Dropping primary key from {}", table);
            let mut sql = String::with_capacity(64);
            writer.write_drop_primary_key(&mut sql, table);
            operation::execute_sql(connection, sql).await?;
        }
        for index in entity.indexes {
            if meta.has_index(index.name) {
                continue;
            }
            let columns = index_columns(entity, index.fields)?;
            let mut sql = String::with_capacity(64);
            writer.write_create_index(&mut sql, table, index.name, &columns, index.unique);
            log::info!("Adding index: {}", sql);
            operation::execute_sql(connection, sql).await?;
        }
        for index in entity.full_text_indexes {
            if writer.has_full_text_index(&meta, index) {
                continue;
            }
            log::info!("Adding full text index {} to {}", index.name, table);
            for sql in writer.full_text_index_statements(entity, index)? {
                operation::execute_sql(connection, sql).await?;
            }
        }

        for migration in self
            .migrations
            .iter()
            .filter(|m| !m.run_before_default() && m.should_run(current_version))
        {
            migration.apply(entity, connection).await?;
        }
        update_version(connection, config, table, entity.version).await?;
        self.transition(TableState::Migrated);
        Ok(())
    }
}

impl DepotModifier for TableResolution {
    async fn invoke<C: Connection>(
        &mut self,
        connection: &mut C,
        config: &DepotConfig,
    ) -> Result<RowsAffected> {
        // A retry starts over
        self.history.truncate(1);
        self.transition(TableState::Resolving);
        let entity = self.entity;
        if !entity.has_table() {
            self.transition(TableState::Ready);
            return Ok(RowsAffected::default());
        }
        ensure_version_table(connection, config).await?;
        match connection.table_metadata(entity.table).await? {
            None => self.create(connection, config).await?,
            Some(..) if entity.version < 0 => {}
            Some(..) => {
                let current_version = read_version(connection, config, entity.table).await?;
                if current_version < entity.version {
                    self.migrate(connection, config, current_version).await?;
                } else if current_version > entity.version {
                    log::warn!(
                        "Table {} is at version {}, newer than the declared {}",
                        entity.table,
                        current_version,
                        entity.version
                    );
                }
            }
        }
        if let Some(generator) = &self.key_generator {
            generator.init(connection).await?;
        }
        self.transition(TableState::Ready);
        Ok(RowsAffected::default())
    }

    fn description(&self) -> String {
        format!("Resolve {}", self.entity.name)
    }
}

fn index_columns(entity: &'static EntityDef, fields: &[&str]) -> Result<Vec<&'static str>> {
    fields
        .iter()
        .map(|f| entity.field(f).map(|f| f.column))
        .collect()
}

fn undeclared_columns<'m, W: SqlWriter>(
    entity: &'static EntityDef,
    meta: &'m TableMeta,
    writer: &W,
) -> Vec<&'m str> {
    meta.columns
        .iter()
        .filter(|c| {
            !entity
                .column_fields()
                .any(|f| f.column.eq_ignore_ascii_case(c))
                && !writer.is_private_column(c)
        })
        .map(String::as_str)
        .collect()
}

async fn ensure_version_table<C: Connection>(connection: &mut C, config: &DepotConfig) -> Result<()> {
    let table = config.schema_version_table.as_str();
    if connection.table_metadata(table).await?.is_some() {
        return Ok(());
    }
    let mut sql = String::with_capacity(96);
    connection.driver().sql_writer().write_create_table_columns(
        &mut sql,
        table,
        &[
            ("persistentClass", "VARCHAR(255) NOT NULL".into()),
            ("version", "INTEGER NOT NULL".into()),
        ],
        &[],
    );
    log::info!("Creating schema version table {}", table);
    operation::execute_sql(connection, sql).await?;
    Ok(())
}

/// The recorded version of `table`, 1 when nothing is recorded.
async fn read_version<C: Connection>(
    connection: &mut C,
    config: &DepotConfig,
    table: &str,
) -> Result<i32> {
    let types = DepotTypes::trivial();
    let mut context = Context::new(&types);
    let mut sql = String::with_capacity(64);
    connection.driver().sql_writer().write_simple_select(
        &mut context,
        &mut sql,
        &config.schema_version_table,
        &["version"],
        &["persistentClass"],
        false,
    );
    let query = operation::prepare_with(connection, sql, vec![table.into()]).await?;
    let rows: Vec<_> = connection.fetch(query).try_collect().await?;
    Ok(rows
        .first()
        .and_then(|r| r.values().first())
        .and_then(Value::as_i64)
        .map_or(1, |v| v as i32))
}

/// Record `version` for `table`, inserting the row when missing.
async fn update_version<C: Connection>(
    connection: &mut C,
    config: &DepotConfig,
    table: &str,
    version: i32,
) -> Result<()> {
    let writer = connection.driver().sql_writer();
    let types = DepotTypes::trivial();
    let mut context = Context::new(&types);
    let mut sql = String::with_capacity(64);
    writer.write_simple_update(
        &mut context,
        &mut sql,
        &config.schema_version_table,
        &["version"],
        &["persistentClass"],
    );
    let query = operation::prepare_with(
        connection,
        sql,
        vec![Value::Int32(Some(version)), table.into()],
    )
    .await?;
    if connection.execute(query).await?.rows_affected > 0 {
        return Ok(());
    }
    let mut context = Context::new(&types);
    let mut sql = String::with_capacity(64);
    writer.write_simple_insert(
        &mut context,
        &mut sql,
        &config.schema_version_table,
        &["persistentClass", "version"],
    );
    let query = operation::prepare_with(
        connection,
        sql,
        vec![table.into(), Value::Int32(Some(version))],
    )
    .await?;
    connection.execute(query).await?;
    Ok(())
}
