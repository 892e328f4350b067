use crate::{
    Connection, DepotTypes, Driver, Entity, EntityDef, Error, Executor, FieldDef, Generation,
    Result, RowsAffected, SqlWriter, TableGenerator, Value, operation, stream::TryStreamExt,
    writer::Context,
};

/// Reads of a sequence row before giving up on a contended allocation.
const MAX_ALLOCATION_ATTEMPTS: usize = 16;

/// Produces the values of a generated primary key field.
#[derive(Debug, Clone)]
pub enum KeyGenerator {
    /// Auto increment column, the value is read back after the insert.
    Identity {
        table: &'static str,
        field: &'static FieldDef,
    },
    /// Values allocated from a row of a sequence table before the insert.
    Table {
        field: &'static FieldDef,
        generator: TableGenerator,
    },
}

impl KeyGenerator {
    pub fn for_entity(entity: &'static EntityDef) -> Option<Self> {
        let (field, generation) = entity.generated_field()?;
        Some(match generation {
            Generation::Identity => KeyGenerator::Identity {
                table: entity.table,
                field,
            },
            Generation::Table(generator) => KeyGenerator::Table { field, generator },
        })
    }

    pub fn field(&self) -> &'static FieldDef {
        match self {
            KeyGenerator::Identity { field, .. } | KeyGenerator::Table { field, .. } => field,
        }
    }

    /// Whether the value is only known after the insert.
    pub fn is_post_factum(&self) -> bool {
        matches!(self, KeyGenerator::Identity { .. })
    }

    /// Create the sequence table and row when missing.
    pub async fn init<C: Connection>(&self, connection: &mut C) -> Result<()> {
        let KeyGenerator::Table { generator, .. } = self else {
            return Ok(());
        };
        let writer = connection.driver().sql_writer();
        if connection.table_metadata(generator.table).await?.is_none() {
            let mut sql = String::with_capacity(128);
            writer.write_create_table_columns(
                &mut sql,
                generator.table,
                &[
                    (generator.pk_column, "VARCHAR(255)".into()),
                    (generator.value_column, "INTEGER NOT NULL".into()),
                ],
                &[generator.pk_column],
            );
            log::info!("Creating sequence table {}", generator.table);
            operation::execute_sql(connection, sql).await?;
        }
        let types = DepotTypes::trivial();
        let mut context = Context::new(&types);
        let mut sql = String::with_capacity(64);
        writer.write_simple_select(
            &mut context,
            &mut sql,
            generator.table,
            &[generator.value_column],
            &[generator.pk_column],
            false,
        );
        let query =
            operation::prepare_with(connection, sql, vec![generator.pk_value.into()]).await?;
        let rows: Vec<_> = connection.fetch(query).try_collect().await?;
        if !rows.is_empty() {
            return Ok(());
        }
        let mut context = Context::new(&types);
        let mut sql = String::with_capacity(64);
        writer.write_simple_insert(
            &mut context,
            &mut sql,
            generator.table,
            &[generator.pk_column, generator.value_column],
        );
        let query = operation::prepare_with(
            connection,
            sql,
            vec![
                generator.pk_value.into(),
                Value::Int64(Some(generator.initial_value())),
            ],
        )
        .await?;
        connection.execute(query).await?;
        Ok(())
    }

    /// Allocate the next value.
    ///
    /// The sequence row only advances when it still holds the value that was
    /// read, so two allocators never hand out the same block. The loser reads
    /// again.
    pub async fn next_value<C: Connection>(&self, connection: &mut C) -> Result<i64> {
        let KeyGenerator::Table { generator, .. } = self else {
            return Err(Error::msg(
                "Identity keys are assigned by the database during the insert",
            ));
        };
        let writer = connection.driver().sql_writer();
        let types = DepotTypes::trivial();
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let mut context = Context::new(&types);
            let mut sql = String::with_capacity(64);
            writer.write_simple_select(
                &mut context,
                &mut sql,
                generator.table,
                &[generator.value_column],
                &[generator.pk_column],
                true,
            );
            let query =
                operation::prepare_with(connection, sql, vec![generator.pk_value.into()]).await?;
            let rows: Vec<_> = connection.fetch(query).try_collect().await?;
            let value = rows
                .first()
                .and_then(|r| r.values().first())
                .and_then(Value::as_i64)
                .ok_or_else(|| {
                    Error::msg(format!(
                        "Failed to find next primary key value [table={}, column={}, where={}={}]",
                        generator.table, generator.value_column, generator.pk_column, generator.pk_value
                    ))
                })?;
            let mut context = Context::new(&types);
            let mut sql = String::with_capacity(96);
            writer.write_simple_update(
                &mut context,
                &mut sql,
                generator.table,
                &[generator.value_column],
                &[generator.pk_column, generator.value_column],
            );
            let query = operation::prepare_with(
                connection,
                sql,
                vec![
                    Value::Int64(Some(value + generator.allocation_size)),
                    generator.pk_value.into(),
                    Value::Int64(Some(value)),
                ],
            )
            .await?;
            if connection.execute(query).await?.rows_affected > 0 {
                return Ok(value);
            }
            log::debug!(
                "Sequence {} moved past {} while allocating (attempt {})",
                generator.pk_value,
                value,
                attempt
            );
        }
        Err(Error::msg(format!(
            "Could not allocate a value from sequence {} after {} attempts",
            generator.pk_value, MAX_ALLOCATION_ATTEMPTS
        )))
    }

    /// The identity generated by the insert that produced `result`.
    pub async fn identity_value<C: Connection>(
        &self,
        connection: &mut C,
        result: &RowsAffected,
    ) -> Result<i64> {
        if let Some(id) = result.last_affected_id {
            return Ok(id);
        }
        let KeyGenerator::Identity { table, field } = self else {
            return Err(Error::msg("Table generated keys are known before the insert"));
        };
        let mut sql = String::with_capacity(64);
        connection
            .driver()
            .sql_writer()
            .write_last_insert_id(&mut sql, table, field.column);
        let rows: Vec<_> = connection.fetch(sql.into()).try_collect().await?;
        rows.first()
            .and_then(|r| r.values().first())
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                Error::msg(format!(
                    "Unable to read the identity generated for {}.{}",
                    table, field.column
                ))
            })
    }

    /// Write a generated value into the key field of `record`.
    pub fn assign<E: Entity>(&self, record: &mut E, value: i64) -> Result<()> {
        let field = self.field();
        record.set_field(field.name, Value::Int64(Some(value)).try_as(&field.value)?)
    }
}
