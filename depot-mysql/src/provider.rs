use crate::{MySQLConnection, MySQLDriver};
use depot_core::{ConnectionProvider, Driver, Error, ErrorContext, Result, truncate_long};
use mysql_async::{Opts, OptsBuilder, Pool};
use url::Url;

/// Connections from a `mysql_async` pool.
///
/// The pool spawns its background tasks on creation, build the provider
/// from inside a tokio runtime.
#[derive(Clone)]
pub struct MySQLConnectionProvider {
    pool: Pool,
}

impl MySQLConnectionProvider {
    pub fn new(url: &str) -> Result<Self> {
        let context = || format!("While creating a MySQL pool for `{}`", truncate_long(url));
        let prefix = format!("{}://", MySQLDriver::NAME);
        if !url.starts_with(&prefix) {
            let error = Error::msg(format!(
                "MySQL connection url must start with `{}`",
                &prefix
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let url = Url::parse(url).with_context(context)?;
        let opts = Opts::from_url(url.as_str()).with_context(context)?;
        // Updates report the rows they matched, not only the ones they changed
        let opts = OptsBuilder::from_opts(opts).client_found_rows(true);
        Ok(Self {
            pool: Pool::new(opts),
        })
    }

    /// Close every pooled connection.
    pub async fn disconnect(self) -> Result<()> {
        self.pool
            .disconnect()
            .await
            .context("While disconnecting the MySQL pool")
    }
}

impl ConnectionProvider for MySQLConnectionProvider {
    type Connection = MySQLConnection;

    async fn get_connection(&self, ident: &str, read_only: bool) -> Result<MySQLConnection> {
        log::trace!("Connection to {} (read only: {})", ident, read_only);
        let connection = self
            .pool
            .get_conn()
            .await
            .with_context(|| format!("While getting a MySQL connection for `{}`", ident))?;
        Ok(MySQLConnection::new(connection))
    }

    fn release_connection(&self, _ident: &str, _read_only: bool, connection: MySQLConnection) {
        drop(connection);
    }

    fn connection_failed(
        &self,
        ident: &str,
        _read_only: bool,
        connection: MySQLConnection,
        error: &Error,
    ) {
        // The pool checks returned connections and discards the broken ones
        if MySQLDriver::new().is_transient(error) {
            log::warn!("Returning a failed connection of `{}` to the pool", ident);
        }
        drop(connection);
    }
}
