use crate::Error;
use thiserror::Error as ThisError;

/// Failure kinds callers may want to tell apart.
///
/// They travel inside [`crate::Error`]; use [`DepotError::of`] (or
/// `anyhow::Error::downcast_ref`) to recover them.
#[derive(Debug, ThisError)]
pub enum DepotError {
    /// A modifier violated a unique constraint.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    /// Programming error: malformed keys, unknown fields, ambiguous clauses.
    #[error("{0}")]
    Configuration(String),
    /// The schema is in a state a migration cannot safely interpret.
    #[error("Migration failure: {0}")]
    Migration(String),
    #[error("Query failure {0}")]
    QueryFailure(String),
    #[error("Modifier failure {0}")]
    ModifierFailure(String),
}

impl DepotError {
    /// Find the first `DepotError` in the error chain.
    pub fn of(error: &Error) -> Option<&DepotError> {
        // Context layers are only reachable through `Error::downcast_ref`
        error
            .downcast_ref::<DepotError>()
            .or_else(|| error.chain().find_map(|e| e.downcast_ref::<DepotError>()))
    }

    pub fn is_duplicate_key(error: &Error) -> bool {
        matches!(Self::of(error), Some(DepotError::DuplicateKey(..)))
    }

    pub fn is_configuration(error: &Error) -> bool {
        matches!(Self::of(error), Some(DepotError::Configuration(..)))
    }

    pub fn is_migration(error: &Error) -> bool {
        matches!(Self::of(error), Some(DepotError::Migration(..)))
    }
}

/// Build a configuration error, logging it at the point it is raised.
pub(crate) fn configuration_error(message: impl Into<String>) -> Error {
    let error = Error::new(DepotError::Configuration(message.into()));
    log::error!("{:#}", error);
    error
}
