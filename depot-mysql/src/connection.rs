use crate::{MySQLDriver, MySQLPrepared, RowWrap};
use async_stream::try_stream;
use depot_core::{
    Connection, Error, ErrorContext, Executor, Query, QueryResult, Result, RowsAffected,
    TableMeta,
    stream::{Stream, StreamExt, TryStreamExt},
};
use mysql_async::{Conn, prelude::Queryable};
use std::sync::Arc;

/// A pooled MySQL session, returned to the pool when dropped.
pub struct MySQLConnection {
    pub(crate) connection: Conn,
}

impl MySQLConnection {
    pub fn new(connection: Conn) -> Self {
        Self { connection }
    }
}

fn affected(rows_affected: u64, last_insert_id: Option<u64>) -> QueryResult {
    QueryResult::Affected(RowsAffected {
        rows_affected,
        last_affected_id: last_insert_id
            .filter(|v| *v > 0)
            .and_then(|v| i64::try_from(v).ok()),
    })
}

impl Executor for MySQLConnection {
    type Driver = MySQLDriver;

    fn driver(&self) -> &Self::Driver {
        &MySQLDriver {}
    }

    async fn prepare(&mut self, query: String) -> Result<Query<Self::Driver>> {
        let statement = self
            .connection
            .prep(query.as_str())
            .await
            .with_context(|| format!("While preparing the query:\n{}", query))?;
        Ok(Query::Prepared(MySQLPrepared::new(statement, query)))
    }

    fn run(
        &mut self,
        query: Query<Self::Driver>,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        let context = Arc::new(format!("While running the query:\n{}", query));
        try_stream! {
            match query {
                Query::Raw(sql) => {
                    let mut result = self.connection.query_iter(sql).await?;
                    let mut rows = 0;
                    while let Some(mut stream) = result.stream::<RowWrap>().await? {
                        while let Some(row) = stream.next().await.transpose()? {
                            rows += 1;
                            yield QueryResult::Row(row.0);
                        }
                    }
                    if rows == 0 {
                        yield affected(result.affected_rows(), result.last_insert_id());
                    }
                }
                Query::Prepared(mut prepared) => {
                    let params = prepared.take_params()?;
                    let mut result = self
                        .connection
                        .exec_iter(prepared.statement, params)
                        .await?;
                    let mut rows = 0;
                    while let Some(mut stream) = result.stream::<RowWrap>().await? {
                        while let Some(row) = stream.next().await.transpose()? {
                            rows += 1;
                            yield QueryResult::Row(row.0);
                        }
                    }
                    if rows == 0 {
                        yield affected(result.affected_rows(), result.last_insert_id());
                    }
                }
            }
        }
        .map_err(move |e: Error| {
            let e = e.context(context.clone());
            log::error!("{:#}", e);
            e
        })
    }
}

impl Connection for MySQLConnection {
    async fn table_metadata(&mut self, table: &str) -> Result<Option<TableMeta>> {
        let context = || format!("While reading the metadata of table `{}`", table);
        let columns: Vec<String> = self
            .connection
            .exec(
                "SELECT COLUMN_NAME FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
                (table,),
            )
            .await
            .with_context(context)?;
        if columns.is_empty() {
            return Ok(None);
        }
        let indexes: Vec<String> = self
            .connection
            .exec(
                "SELECT DISTINCT INDEX_NAME FROM information_schema.STATISTICS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
                (table,),
            )
            .await
            .with_context(context)?;
        let has_primary_key = indexes.iter().any(|v| v == "PRIMARY");
        Ok(Some(TableMeta {
            columns,
            indexes: indexes.into_iter().filter(|v| v != "PRIMARY").collect(),
            has_primary_key,
        }))
    }
}
