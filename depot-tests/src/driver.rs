use crate::{MockError, MockPrepared};
use depot_core::{Driver, Error, GenericSqlWriter};

/// Driver of the [`MockDatabase`](crate::MockDatabase), writing generic SQL.
#[derive(Clone, Copy, Default)]
pub struct MockDriver;
impl MockDriver {
    pub const fn new() -> Self {
        Self
    }
}

fn mock_error(error: &Error) -> Option<&MockError> {
    error.chain().find_map(|e| e.downcast_ref::<MockError>())
}

impl Driver for MockDriver {
    type SqlWriter = GenericSqlWriter;
    type Prepared = MockPrepared;
    const NAME: &'static str = "mock";

    fn sql_writer(&self) -> Self::SqlWriter {
        GenericSqlWriter::default()
    }

    fn is_duplicate_row(&self, error: &Error) -> bool {
        matches!(mock_error(error), Some(MockError::Duplicate(..)))
    }

    fn is_transient(&self, error: &Error) -> bool {
        matches!(mock_error(error), Some(MockError::Transient(..)))
    }
}
