//! Code rendering.
//!
//! A [`CodeRenderer`] turns one entity into source text. Output for all
//! entities sharing a file name is concatenated into one output unit, with
//! the unit header written only for the first of them.

mod rust;
mod statements;

pub use rust::RustRenderer;
pub use statements::{ColumnStatement, CrudStatements};

use crate::error::Result;
use crate::schema::EntityDescriptor;

/// Produces source text for one entity.
///
/// Renderers are pure: they see only the descriptor, never a database.
pub trait CodeRenderer {
    /// Renders `entity`, including the unit header when `first_in_unit`.
    ///
    /// # Errors
    ///
    /// Fails for a descriptor without a primary key.
    fn render(&self, entity: &EntityDescriptor, first_in_unit: bool) -> Result<String>;
}
