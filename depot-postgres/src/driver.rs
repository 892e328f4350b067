use crate::{PostgresPrepared, PostgresSqlWriter};
use depot_core::{Driver, Error};
use tokio_postgres::error::SqlState;

#[derive(Clone, Copy, Default)]
pub struct PostgresDriver {}

impl PostgresDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

fn postgres_error(error: &Error) -> Option<&tokio_postgres::Error> {
    error
        .chain()
        .find_map(|e| e.downcast_ref::<tokio_postgres::Error>())
}

impl Driver for PostgresDriver {
    type SqlWriter = PostgresSqlWriter;
    type Prepared = PostgresPrepared;

    const NAME: &'static str = "postgres";

    fn sql_writer(&self) -> PostgresSqlWriter {
        PostgresSqlWriter {}
    }

    fn is_duplicate_row(&self, error: &Error) -> bool {
        postgres_error(error).and_then(|e| e.code()) == Some(&SqlState::UNIQUE_VIOLATION)
    }

    fn is_transient(&self, error: &Error) -> bool {
        let Some(error) = postgres_error(error) else {
            return false;
        };
        if error.is_closed() {
            return true;
        }
        let transient = [
            SqlState::CONNECTION_EXCEPTION,
            SqlState::CONNECTION_FAILURE,
            SqlState::ADMIN_SHUTDOWN,
            SqlState::T_R_SERIALIZATION_FAILURE,
            SqlState::T_R_DEADLOCK_DETECTED,
        ];
        error.code().is_some_and(|code| transient.contains(code))
    }
}
