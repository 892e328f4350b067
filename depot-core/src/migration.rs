use crate::{
    Connection, ConnectionProvider, DepotConfig, DepotError, DepotModifier, DepotTypes, Driver,
    EntityDef, Error, Executor, PersistenceContext, Result, RowsAffected, SqlWriter, TableMeta,
    Value, operation, writer::Context,
};
use futures::future::BoxFuture;
use std::{borrow::Cow, fmt, future::Future, sync::Arc};
use time::{OffsetDateTime, PrimitiveDateTime};

/// The connection handed to an [`EntityMigration`].
pub trait MigrationConnection: Send {
    /// The dialect of the connection.
    fn writer(&self) -> Box<dyn SqlWriter>;

    /// Columns, indexes and primary key of `table`, `None` when missing.
    fn describe_table<'s>(
        &'s mut self,
        table: &'s str,
    ) -> BoxFuture<'s, Result<Option<TableMeta>>>;

    fn execute_sql(&mut self, sql: String) -> BoxFuture<'_, Result<RowsAffected>>;
}

impl<C: Connection> MigrationConnection for C {
    fn writer(&self) -> Box<dyn SqlWriter> {
        Box::new(Driver::sql_writer(self.driver()))
    }

    fn describe_table<'s>(
        &'s mut self,
        table: &'s str,
    ) -> BoxFuture<'s, Result<Option<TableMeta>>> {
        Box::pin(self.table_metadata(table))
    }

    fn execute_sql(&mut self, sql: String) -> BoxFuture<'_, Result<RowsAffected>> {
        Box::pin(operation::execute_sql(self, sql))
    }
}

/// Hand written change to the table of an entity, for what the column
/// variants of [`SchemaMigration`] cannot express.
pub trait EntityMigration: Send + Sync {
    fn apply<'a>(
        &'a self,
        entity: &'static EntityDef,
        connection: &'a mut dyn MigrationConnection,
    ) -> BoxFuture<'a, Result<()>>;

    /// Shown in logs and errors.
    fn description(&self) -> String {
        "custom migration".into()
    }
}

impl fmt::Debug for dyn EntityMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// A versioned change to the table of one entity.
///
/// Runs while the entity is being resolved, when the version recorded for
/// the table is below `target_version`. Every column variant tolerates
/// finding its work already done.
#[derive(Debug, Clone)]
pub enum SchemaMigration {
    Drop {
        target_version: i32,
        column: Cow<'static, str>,
    },
    /// Rename a column to the column of `new_field`.
    Rename {
        target_version: i32,
        old_column: Cow<'static, str>,
        new_field: Cow<'static, str>,
    },
    /// Change the column of `field` to its declared definition.
    Retype {
        target_version: i32,
        field: Cow<'static, str>,
    },
    /// Add the column of `field` filling existing rows with `default`, then
    /// switch to the declared default.
    Add {
        target_version: i32,
        field: Cow<'static, str>,
        default: Cow<'static, str>,
    },
    /// Run `migration`, before or after the automatic column diff.
    Custom {
        target_version: i32,
        run_before_default: bool,
        migration: Arc<dyn EntityMigration>,
    },
}

impl SchemaMigration {
    pub fn drop(target_version: i32, column: impl Into<Cow<'static, str>>) -> Self {
        SchemaMigration::Drop {
            target_version,
            column: column.into(),
        }
    }

    pub fn rename(
        target_version: i32,
        old_column: impl Into<Cow<'static, str>>,
        new_field: impl Into<Cow<'static, str>>,
    ) -> Self {
        SchemaMigration::Rename {
            target_version,
            old_column: old_column.into(),
            new_field: new_field.into(),
        }
    }

    pub fn retype(target_version: i32, field: impl Into<Cow<'static, str>>) -> Self {
        SchemaMigration::Retype {
            target_version,
            field: field.into(),
        }
    }

    pub fn add(
        target_version: i32,
        field: impl Into<Cow<'static, str>>,
        default: impl Into<Cow<'static, str>>,
    ) -> Self {
        SchemaMigration::Add {
            target_version,
            field: field.into(),
            default: default.into(),
        }
    }

    pub fn custom(
        target_version: i32,
        run_before_default: bool,
        migration: impl EntityMigration + 'static,
    ) -> Self {
        SchemaMigration::Custom {
            target_version,
            run_before_default,
            migration: Arc::new(migration),
        }
    }

    pub fn target_version(&self) -> i32 {
        match self {
            SchemaMigration::Drop { target_version, .. }
            | SchemaMigration::Rename { target_version, .. }
            | SchemaMigration::Retype { target_version, .. }
            | SchemaMigration::Add { target_version, .. }
            | SchemaMigration::Custom { target_version, .. } => *target_version,
        }
    }

    /// Whether it runs before the automatic column diff.
    pub fn run_before_default(&self) -> bool {
        match self {
            SchemaMigration::Retype { .. } => false,
            SchemaMigration::Custom {
                run_before_default, ..
            } => *run_before_default,
            _ => true,
        }
    }

    pub fn should_run(&self, current_version: i32) -> bool {
        current_version < self.target_version()
    }

    /// Check the fields named by the migration exist on `entity`.
    pub fn validate(&self, entity: &'static EntityDef) -> Result<()> {
        match self {
            SchemaMigration::Drop { .. } | SchemaMigration::Custom { .. } => Ok(()),
            SchemaMigration::Rename { new_field, .. } => entity.field(new_field).map(|_| ()),
            SchemaMigration::Retype { field, .. } | SchemaMigration::Add { field, .. } => {
                entity.field(field).map(|_| ())
            }
        }
    }

    /// Apply to the table of `entity`, returning the statements' effect.
    pub async fn apply<C: Connection>(
        &self,
        entity: &'static EntityDef,
        connection: &mut C,
    ) -> Result<RowsAffected> {
        let table = entity.table;
        let Some(meta) = connection.table_metadata(table).await? else {
            return Err(migration_error(format!(
                "Table {} does not exist, cannot run {:?}",
                table, self
            )));
        };
        if let SchemaMigration::Custom { migration, .. } = self {
            log::info!("Running {:?} on {}", migration, table);
            migration.apply(entity, connection).await?;
            return Ok(RowsAffected::new(1));
        }
        let writer = connection.driver().sql_writer();
        let mut sql = String::with_capacity(64);
        match self {
            SchemaMigration::Custom { .. } => {}
            SchemaMigration::Drop { column, .. } => {
                if !meta.has_column(column) {
                    log::warn!("{}.{} already dropped", table, column);
                    return Ok(RowsAffected::default());
                }
                log::info!("Dropping {} from {}", column, table);
                writer.write_drop_column(&mut sql, table, column);
                operation::execute_sql(connection, sql).await?;
            }
            SchemaMigration::Rename {
                old_column,
                new_field,
                ..
            } => {
                let field = entity.field(new_field)?;
                let has_old = meta.has_column(old_column);
                let has_new = meta.has_column(field.column);
                match (has_old, has_new) {
                    (false, true) => {
                        log::warn!(
                            "{}.{} already renamed to {}",
                            table,
                            old_column,
                            field.column
                        );
                        return Ok(RowsAffected::default());
                    }
                    (false, false) => {
                        return Err(migration_error(format!(
                            "{} does not contain {}",
                            table, old_column
                        )));
                    }
                    (true, true) => {
                        return Err(migration_error(format!(
                            "{} already contains {}",
                            table, field.column
                        )));
                    }
                    (true, false) => {}
                }
                log::info!("Renaming {} to {} in {}", old_column, field.column, table);
                let definition = writer.column_definition(field, None)?;
                writer.write_rename_column(&mut sql, table, old_column, field.column, &definition);
                operation::execute_sql(connection, sql).await?;
            }
            SchemaMigration::Retype { field, .. } => {
                let field = entity.field(field)?;
                if !meta.has_column(field.column) {
                    log::warn!("{}.{} does not exist, nothing to retype", table, field.column);
                    return Ok(RowsAffected::default());
                }
                log::info!("Updating type of {} in {}", field.column, table);
                for sql in writer.change_column_statements(table, field, None)? {
                    operation::execute_sql(connection, sql).await?;
                }
            }
            SchemaMigration::Add { field, default, .. } => {
                let field = entity.field(field)?;
                if meta.has_column(field.column) {
                    log::warn!("{}.{} already added", table, field.column);
                    return Ok(RowsAffected::default());
                }
                log::info!(
                    "Adding {} to {} with default {}",
                    field.column,
                    table,
                    default
                );
                let definition = writer.column_definition(field, Some(&**default))?;
                writer.write_add_column(&mut sql, table, field.column, &definition);
                operation::execute_sql(connection, sql).await?;
                for sql in writer.change_column_statements(table, field, None)? {
                    operation::execute_sql(connection, sql).await?;
                }
            }
        }
        Ok(RowsAffected::new(1))
    }
}

pub(crate) fn migration_error(message: String) -> Error {
    let error = Error::new(DepotError::Migration(message));
    log::error!("{:#}", error);
    error
}

/// A one time data transformation, recorded in the migration ledger once
/// it completed.
pub trait DataMigration: Send + Sync {
    /// Unique name of the migration in the ledger.
    fn ident(&self) -> &str;

    fn invoke<P: ConnectionProvider>(
        &self,
        context: &PersistenceContext<P>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// The ledger row lifecycle of a data migration.
pub(crate) enum LedgerAction<'a> {
    /// Insert the row, failing with a duplicate key when already claimed.
    Claim(&'a str),
    /// Stamp the completion time.
    Complete(&'a str),
    /// Remove the claim of a failed migration.
    Release(&'a str),
}

pub(crate) struct LedgerModifier<'a> {
    pub action: LedgerAction<'a>,
}

impl DepotModifier for LedgerModifier<'_> {
    async fn invoke<C: Connection>(
        &mut self,
        connection: &mut C,
        config: &DepotConfig,
    ) -> Result<RowsAffected> {
        let table = config.migration_history_table.as_str();
        let writer = connection.driver().sql_writer();
        let types = DepotTypes::trivial();
        let mut context = Context::new(&types);
        let mut sql = String::with_capacity(64);
        let values = match self.action {
            LedgerAction::Claim(ident) => {
                if connection.table_metadata(table).await?.is_none() {
                    let mut create = String::with_capacity(96);
                    writer.write_create_table_columns(
                        &mut create,
                        table,
                        &[
                            ("ident", "VARCHAR(255) NOT NULL".into()),
                            ("whenCompleted", "TIMESTAMP NULL".into()),
                        ],
                        &["ident"],
                    );
                    log::info!("Creating migration history table {}", table);
                    operation::execute_sql(connection, create).await?;
                }
                writer.write_simple_insert(&mut context, &mut sql, table, &["ident"]);
                vec![Value::from(ident)]
            }
            LedgerAction::Complete(ident) => {
                let now = OffsetDateTime::now_utc();
                writer.write_simple_update(
                    &mut context,
                    &mut sql,
                    table,
                    &["whenCompleted"],
                    &["ident"],
                );
                vec![
                    Value::Timestamp(Some(PrimitiveDateTime::new(now.date(), now.time()))),
                    Value::from(ident),
                ]
            }
            LedgerAction::Release(ident) => {
                writer.write_simple_delete(&mut context, &mut sql, table, &["ident"]);
                vec![Value::from(ident)]
            }
        };
        let query = operation::prepare_with(connection, sql, values).await?;
        connection.execute(query).await
    }

    fn description(&self) -> String {
        match self.action {
            LedgerAction::Claim(ident) => format!("Claim migration {}", ident),
            LedgerAction::Complete(ident) => format!("Complete migration {}", ident),
            LedgerAction::Release(ident) => format!("Release migration {}", ident),
        }
    }
}
