//! # crudsmith-core
//!
//! Parses entity definition files and turns them into a schema model and
//! generated data access code.
//!
//! This crate provides:
//! - Identifier helpers (validation, snake casing, whitespace cleanup)
//! - The schema model: entities, columns, and the type mapping tables
//! - A line-driven parser for the definition file format
//! - A code renderer emitting `sqlx` based Rust modules
//!
//! ```rust
//! use crudsmith_core::prelude::*;
//!
//! let file = parse_str(
//!     "[server] localhost\n[user] app\n[password] pw\n[database] appdb\n\
//!      [schema] public\n[ssl] false\n[underscore] true\n[package] models\n\
//!      [add struct]\ntype User struct {\nloginID int [primary]\nuserName string [index]\n}\n",
//! )
//! .unwrap();
//!
//! let user = &file.entities[0];
//! assert_eq!(user.table_name, "tbl_user");
//! assert_eq!(user.primary_column().unwrap().storage_name, "login_id");
//!
//! let code = RustRenderer::new(&file.config.package).render(user, true).unwrap();
//! assert!(code.contains("get_users_by_user_name"));
//! ```

pub mod config;
pub mod error;
pub mod names;
pub mod parser;
pub mod render;
pub mod schema;

pub use error::{LineError, ParseError};
pub use parser::{parse_lines, parse_str, ParsedFile, Parser};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{ConfigKey, NamingPolicy, SessionConfig};
    pub use crate::error::{LineError, ParseError};
    pub use crate::parser::{parse_lines, parse_str, ParsedFile, Parser};
    pub use crate::render::{CodeRenderer, CrudStatements, RustRenderer};
    pub use crate::schema::{
        ColumnDescriptor, ColumnRemap, EntityDescriptor, EntityMode, LogicalType, StorageType,
    };
}
