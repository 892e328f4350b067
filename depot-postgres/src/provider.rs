use crate::{PostgresConnection, PostgresDriver};
use depot_core::{ConnectionProvider, Driver, Error, ErrorContext, Result, truncate_long};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::spawn;
use tokio_postgres::NoTls;
use url::Url;

/// Opens `tokio-postgres` sessions on demand and keeps the released ones
/// for reuse, at most `max_idle` of them.
#[derive(Clone)]
pub struct PostgresConnectionProvider {
    url: Arc<str>,
    idle: Arc<Mutex<Vec<PostgresConnection>>>,
    max_idle: usize,
}

impl PostgresConnectionProvider {
    pub fn new(url: &str) -> Result<Self> {
        let context = || format!("While configuring postgres for `{}`", truncate_long(url));
        let prefix = format!("{}://", PostgresDriver::NAME);
        if !url.starts_with(&prefix) {
            let error = Error::msg(format!(
                "Postgres connection url must start with `{}`",
                &prefix
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let url = Url::parse(url).with_context(context)?;
        Ok(Self {
            url: url.as_str().into(),
            idle: Default::default(),
            max_idle: 8,
        })
    }

    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    async fn connect(&self) -> Result<PostgresConnection> {
        let (client, connection) = tokio_postgres::connect(&self.url, NoTls)
            .await
            .with_context(|| format!("While trying to connect to `{}`", truncate_long(&self.url)))?;
        spawn(async move {
            if let Err(e) = connection.await
                && !e.is_closed()
            {
                log::error!("Postgres connection error: {:#}", e);
            }
        });
        Ok(PostgresConnection::new(client))
    }
}

impl ConnectionProvider for PostgresConnectionProvider {
    type Connection = PostgresConnection;

    async fn get_connection(&self, ident: &str, read_only: bool) -> Result<PostgresConnection> {
        log::trace!("Connection to {} (read only: {})", ident, read_only);
        loop {
            let Some(connection) = self.idle.lock().pop() else {
                break;
            };
            if !connection.is_closed() {
                return Ok(connection);
            }
        }
        self.connect()
            .await
            .with_context(|| format!("While getting a postgres connection for `{}`", ident))
    }

    fn release_connection(&self, _ident: &str, _read_only: bool, connection: PostgresConnection) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle && !connection.is_closed() {
            idle.push(connection);
        }
    }

    fn connection_failed(
        &self,
        ident: &str,
        read_only: bool,
        connection: PostgresConnection,
        error: &Error,
    ) {
        if PostgresDriver::new().is_transient(error) {
            log::warn!("Dropping a failed connection of `{}`", ident);
            return;
        }
        // Statement errors leave the session usable
        self.release_connection(ident, read_only, connection);
    }
}
