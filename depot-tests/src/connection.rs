use crate::{MockDatabase, MockDriver, MockPrepared};
use depot_core::{
    Connection, ConnectionProvider, Error, Executor, Query, QueryResult, Result, TableMeta,
    stream::{self, Stream},
};

/// A session on a [`MockDatabase`], every statement runs immediately.
pub struct MockConnection {
    database: MockDatabase,
}

impl MockConnection {
    pub fn new(database: MockDatabase) -> Self {
        Self { database }
    }
}

impl Executor for MockConnection {
    type Driver = MockDriver;

    fn driver(&self) -> &Self::Driver {
        &MockDriver {}
    }

    async fn prepare(&mut self, query: String) -> Result<Query<Self::Driver>> {
        Ok(Query::Prepared(MockPrepared::new(query)))
    }

    fn run(
        &mut self,
        query: Query<Self::Driver>,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        let result = match query {
            Query::Raw(sql) => self.database.execute(&sql, Vec::new()),
            Query::Prepared(prepared) => self.database.execute(&prepared.sql, prepared.values),
        };
        let items: Vec<Result<QueryResult>> = match result {
            Ok(items) => items.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(items)
    }
}

impl Connection for MockConnection {
    async fn table_metadata(&mut self, table: &str) -> Result<Option<TableMeta>> {
        Ok(self.database.table_metadata(table))
    }
}

/// Hands out connections to one [`MockDatabase`], counting them.
#[derive(Clone)]
pub struct MockProvider {
    database: MockDatabase,
}

impl MockProvider {
    pub fn new(database: MockDatabase) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &MockDatabase {
        &self.database
    }
}

impl ConnectionProvider for MockProvider {
    type Connection = MockConnection;

    async fn get_connection(&self, ident: &str, read_only: bool) -> Result<MockConnection> {
        log::trace!("Connection to {} (read only: {})", ident, read_only);
        self.database.connection_acquired();
        Ok(MockConnection::new(self.database.clone()))
    }

    fn release_connection(&self, _ident: &str, _read_only: bool, _connection: MockConnection) {
        self.database.connection_released();
    }

    fn connection_failed(
        &self,
        ident: &str,
        _read_only: bool,
        _connection: MockConnection,
        error: &Error,
    ) {
        log::debug!("Connection to {} failed: {:#}", ident, error);
        self.database.connection_failed();
    }
}
