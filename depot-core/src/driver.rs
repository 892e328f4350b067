use crate::{Error, Prepared, SqlWriter};

/// Dialect liaison: SQL rendering plus classification of driver failures.
pub trait Driver: Send + Sync + Sized {
    type SqlWriter: SqlWriter + 'static;
    type Prepared: Prepared;

    /// Url scheme of the driver, like `mysql`.
    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;

    /// Whether the failure is a unique constraint violation.
    fn is_duplicate_row(&self, error: &Error) -> bool;

    /// Whether the failure is a lost connection worth retrying once.
    fn is_transient(&self, error: &Error) -> bool;
}
