use crate::{MySQLPrepared, MySQLSqlWriter};
use depot_core::{Driver, Error};
use mysql_async::DriverError;

/// Server error raised on a unique constraint violation.
const ER_DUP_ENTRY: u16 = 1062;
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
const ER_LOCK_DEADLOCK: u16 = 1213;

#[derive(Clone, Copy, Default)]
pub struct MySQLDriver;
impl MySQLDriver {
    pub const fn new() -> Self {
        Self
    }
}

fn mysql_error(error: &Error) -> Option<&mysql_async::Error> {
    error
        .chain()
        .find_map(|e| e.downcast_ref::<mysql_async::Error>())
}

impl Driver for MySQLDriver {
    type SqlWriter = MySQLSqlWriter;
    type Prepared = MySQLPrepared;

    const NAME: &'static str = "mysql";
    fn sql_writer(&self) -> Self::SqlWriter {
        MySQLSqlWriter::default()
    }

    fn is_duplicate_row(&self, error: &Error) -> bool {
        matches!(
            mysql_error(error),
            Some(mysql_async::Error::Server(e)) if e.code == ER_DUP_ENTRY
        )
    }

    fn is_transient(&self, error: &Error) -> bool {
        match mysql_error(error) {
            Some(mysql_async::Error::Io(..)) => true,
            Some(mysql_async::Error::Driver(DriverError::ConnectionClosed)) => true,
            Some(mysql_async::Error::Server(e)) => {
                e.code == ER_LOCK_WAIT_TIMEOUT || e.code == ER_LOCK_DEADLOCK
            }
            _ => false,
        }
    }
}
