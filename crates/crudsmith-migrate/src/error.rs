//! Error types for migrations and code generation.

use crudsmith_core::ParseError;

use crate::executor::MigrationStep;

/// Errors that can occur while migrating or writing generated code.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The table named by `[alter table]` is not in the schema.
    #[error("table '{table}' to be altered does not exist in schema '{schema}'")]
    PriorTableNotFound {
        /// The prior table name.
        table: String,
        /// Schema that was searched.
        schema: String,
    },

    /// A migration statement failed; the rest of the entity was skipped.
    #[error("{step} failed: {source}")]
    Step {
        /// The step that failed.
        step: MigrationStep,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },

    /// IO error while writing output units.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The entity cannot be rendered or migrated as described.
    #[error("Invalid entity: {0}")]
    Invalid(#[from] ParseError),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
