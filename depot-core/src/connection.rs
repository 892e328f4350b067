use crate::{
    Driver, Error, Query, QueryResult, Result, RowLabeled, RowsAffected,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::future::Future;

pub trait Executor: Send + Sized {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    fn prepare(&mut self, query: String)
    -> impl Future<Output = Result<Query<Self::Driver>>> + Send;

    /// General method to send any query and return any result type (either row or count)
    fn run(
        &mut self,
        query: Query<Self::Driver>,
    ) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Execute the query and returns the rows.
    fn fetch(&mut self, query: Query<Self::Driver>) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.run(query).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute the query and return the total number of rows affected.
    fn execute(
        &mut self,
        query: Query<Self::Driver>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }
}

/// On disk shape of a table, as far as migrations care.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct TableMeta {
    pub columns: Vec<String>,
    pub indexes: Vec<String>,
    pub has_primary_key: bool,
}

impl TableMeta {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
    pub fn has_index(&self, index: &str) -> bool {
        self.indexes.iter().any(|c| c.eq_ignore_ascii_case(index))
    }
}

/// A live database session.
pub trait Connection: Executor {
    /// Columns, indexes and primary key of `table`, `None` when the table
    /// does not exist.
    fn table_metadata(
        &mut self,
        table: &str,
    ) -> impl Future<Output = Result<Option<TableMeta>>> + Send;
}

/// Source of connections, usually a pool.
///
/// `ident` names the database, `read_only` lets providers route reads to
/// replicas.
pub trait ConnectionProvider: Send + Sync {
    type Connection: Connection;

    fn get_connection(
        &self,
        ident: &str,
        read_only: bool,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;

    /// Return a healthy connection after use.
    fn release_connection(&self, ident: &str, read_only: bool, connection: Self::Connection);

    /// Hand back a connection whose last operation failed, the provider
    /// decides whether it can be reused.
    fn connection_failed(
        &self,
        ident: &str,
        read_only: bool,
        connection: Self::Connection,
        error: &Error,
    );
}
