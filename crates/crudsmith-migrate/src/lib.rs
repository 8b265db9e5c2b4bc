//! Postgres migrations and code generation for crudsmith definition files.
//!
//! `crudsmith-migrate` takes the entities parsed by `crudsmith-core` and
//! either writes their data access code to output units or applies them to
//! a Postgres database:
//!
//! - **Executor** - creates each entity's table, moving objects that hold
//!   its canonical names aside and copying rows from an altered table
//! - **Dialect** - Postgres statement text
//! - **Connection** - the [`Database`](connection::Database) seam, a real
//!   pool and a dry run that only prints
//! - **Output** - one generated file per distinct entity file name
//!
//! # Example
//!
//! ```rust,ignore
//! use crudsmith_migrate::prelude::*;
//!
//! let parsed = crudsmith_core::parse_str(&std::fs::read_to_string("models.crud")?)?;
//! let db = PgDatabase::connect(&parsed.config).await?;
//! let executor = MigrationExecutor::new(&db, &parsed.config.user);
//! for result in executor.migrate_all(&parsed.entities).await {
//!     let report = result?;
//!     println!("{} -> {}", report.entity, report.table);
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Write generated code next to the definition file
//! crudsmith generate models.crud
//!
//! # Generate and migrate
//! crudsmith generate models.crud --migrate --owner app_owner
//!
//! # Print the migration statements without connecting
//! crudsmith plan models.crud
//! ```

pub mod connection;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod naming;
pub mod output;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::connection::{Database, DryRunDatabase, PgDatabase};
    pub use crate::dialect::PostgresDialect;
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::{MigrationExecutor, MigrationReport, MigrationStep};
    pub use crate::naming::{find_free_name, Displaced, ObjectKind};
    pub use crate::output::{write_units, OutputUnits, WrittenUnit};
}
