use crate::{PostgresDriver, PostgresPrepared, ValueHolder};
use async_stream::try_stream;
use depot_core::{
    Connection, Error, ErrorContext, Executor, Query, QueryResult, Result, Row, RowLabeled,
    RowNames, RowsAffected, TableMeta,
    stream::{Stream, StreamExt, TryStreamExt},
    truncate_long,
};
use std::{pin::pin, sync::Arc};
use tokio_postgres::Client;

pub struct PostgresConnection {
    pub(crate) client: Client,
}

impl PostgresConnection {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    async fn names(&self, sql: &str, table: &str) -> Result<Vec<String>> {
        self.client
            .query(sql, &[&table])
            .await?
            .iter()
            .map(|row| row.try_get::<_, String>(0).map_err(Into::into))
            .collect()
    }
}

fn row_values(row: tokio_postgres::Row) -> Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(e) => {
                let column = &row.columns()[i];
                Err(Error::new(e).context(format!(
                    "Could not decode column {} `{}` of type {}",
                    i,
                    column.name(),
                    column.type_()
                )))
            }
        })
        .collect()
}

impl Executor for PostgresConnection {
    type Driver = PostgresDriver;

    fn driver(&self) -> &Self::Driver {
        &PostgresDriver {}
    }

    async fn prepare(&mut self, sql: String) -> Result<Query<Self::Driver>> {
        let statement = self.client.prepare(&sql).await.map_err(|e| {
            let e = Error::new(e).context(format!(
                "While preparing the query:\n{}",
                truncate_long(&sql)
            ));
            log::error!("{:#}", e);
            e
        })?;
        Ok(Query::Prepared(PostgresPrepared::new(statement, sql)))
    }

    fn run(
        &mut self,
        query: Query<Self::Driver>,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        let context = Arc::new(format!("While running the query:\n{}", query));
        try_stream! {
            let stream = match query {
                Query::Raw(sql) => {
                    self.client
                        .query_raw(sql.as_str(), Vec::<ValueHolder>::new())
                        .await?
                }
                Query::Prepared(mut prepared) => {
                    let params = prepared.take_params()?;
                    self.client.query_raw(&prepared.statement, params).await?
                }
            };
            let mut stream = pin!(stream);
            let mut labels: Option<RowNames> = None;
            let mut rows = 0;
            while let Some(row) = stream.next().await.transpose()? {
                let labels = labels
                    .get_or_insert_with(|| {
                        row.columns().iter().map(|c| c.name().to_string()).collect()
                    })
                    .clone();
                rows += 1;
                yield QueryResult::Row(RowLabeled::new(labels, row_values(row)?));
            }
            if rows == 0 {
                let affected = stream.rows_affected().unwrap_or_default();
                yield QueryResult::Affected(RowsAffected::new(affected));
            }
        }
        .map_err(move |e: Error| {
            let e = e.context(context.clone());
            log::error!("{:#}", e);
            e
        })
    }
}

impl Connection for PostgresConnection {
    async fn table_metadata(&mut self, table: &str) -> Result<Option<TableMeta>> {
        let context = || format!("While reading the metadata of table `{}`", table);
        let columns = self
            .names(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 ORDER BY ordinal_position",
                table,
            )
            .await
            .with_context(context)?;
        if columns.is_empty() {
            return Ok(None);
        }
        let primary_keys = self
            .names(
                "SELECT constraint_name::text FROM information_schema.table_constraints \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 AND constraint_type = 'PRIMARY KEY'",
                table,
            )
            .await
            .with_context(context)?;
        let indexes = self
            .names(
                "SELECT indexname::text FROM pg_indexes \
                 WHERE schemaname = current_schema() AND tablename = $1",
                table,
            )
            .await
            .with_context(context)?;
        Ok(Some(TableMeta {
            columns,
            indexes: indexes
                .into_iter()
                .filter(|v| !primary_keys.contains(v))
                .collect(),
            has_primary_key: !primary_keys.is_empty(),
        }))
    }
}
