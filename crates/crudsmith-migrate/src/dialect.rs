//! Postgres statement text for migrations.
//!
//! Every method returns one statement without a trailing semicolon; the
//! executor sends each in its own round trip.

use crudsmith_core::names::quote_if_mixed_case;
use crudsmith_core::schema::{ColumnDescriptor, ColumnRemap, EntityDescriptor};

use crate::naming::ObjectKind;

/// Looks up a table in a schema. Binds: table name, schema.
pub const TABLE_EXISTS: &str = "SELECT EXISTS(SELECT * FROM information_schema.tables \
     WHERE table_name = $1 AND table_schema = $2)";

/// Looks up any relation (index, sequence, ...) in a schema. Binds:
/// relation name, schema.
pub const RELATION_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM pg_class c \
     JOIN pg_namespace n ON n.oid = c.relnamespace \
     WHERE c.relname = $1 AND n.nspname = $2)";

/// Postgres migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new Postgres dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Catalog lookup used for objects of `kind`.
    #[must_use]
    pub const fn exists_query(self, kind: ObjectKind) -> &'static str {
        match kind {
            ObjectKind::Table => TABLE_EXISTS,
            ObjectKind::Index | ObjectKind::Sequence => RELATION_EXISTS,
        }
    }

    /// Renames an existing object of `kind` in the entity's schema.
    #[must_use]
    pub fn rename(self, kind: ObjectKind, entity: &EntityDescriptor, from: &str, to: &str) -> String {
        match kind {
            ObjectKind::Table => {
                format!("ALTER TABLE IF EXISTS {} RENAME TO {to}", entity.qualify(from))
            }
            ObjectKind::Index => {
                format!("ALTER INDEX {} RENAME TO {to}", schema_qualify(entity, from))
            }
            ObjectKind::Sequence => {
                format!("ALTER SEQUENCE {} RENAME TO {to}", schema_qualify(entity, from))
            }
        }
    }

    /// Creates the entity's table with every column in declaration order.
    #[must_use]
    pub fn create_table(self, entity: &EntityDescriptor) -> String {
        let columns = entity
            .columns
            .iter()
            .map(column_definition)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({columns})",
            entity.qualified_table_name()
        )
    }

    /// Hands the table to `owner`.
    #[must_use]
    pub fn table_owner(self, entity: &EntityDescriptor, owner: &str) -> String {
        format!("ALTER TABLE {} OWNER TO {owner}", entity.qualified_table_name())
    }

    /// Grants every table privilege to `owner`.
    #[must_use]
    pub fn grant_table(self, entity: &EntityDescriptor, owner: &str) -> String {
        format!(
            "GRANT ALL ON TABLE {} TO {owner}",
            entity.qualified_table_name()
        )
    }

    /// Copies rows positionally from `source` through the remap.
    #[must_use]
    pub fn copy_rows(self, entity: &EntityDescriptor, source: &str, remap: &[ColumnRemap]) -> String {
        let new = remap.iter().map(|r| r.new.as_str()).collect::<Vec<_>>().join(", ");
        let old = remap.iter().map(|r| r.old.as_str()).collect::<Vec<_>>().join(", ");
        format!(
            "INSERT INTO {} ({new}) (SELECT {old} FROM {source})",
            entity.qualified_table_name()
        )
    }

    /// Counts the rows of `source`.
    #[must_use]
    pub fn count_rows(self, source: &str) -> String {
        format!("SELECT COUNT(*) FROM {source}")
    }

    /// Largest value of `column` in `source`, as a `bigint`.
    #[must_use]
    pub fn max_value(self, source: &str, column: &str) -> String {
        format!("SELECT MAX({column})::bigint FROM {source}")
    }

    /// Adds the named primary-key constraint.
    #[must_use]
    pub fn add_primary_key(self, entity: &EntityDescriptor, constraint: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {constraint} PRIMARY KEY ({column})",
            entity.qualified_table_name()
        )
    }

    /// Creates the key sequence starting at `start`.
    #[must_use]
    pub fn create_sequence(self, entity: &EntityDescriptor, sequence: &str, start: i64) -> String {
        format!(
            "CREATE SEQUENCE {} INCREMENT 1 MINVALUE 1 MAXVALUE {} START {start} CACHE 1",
            schema_qualify(entity, sequence),
            i64::MAX
        )
    }

    /// Hands the sequence to `owner`.
    #[must_use]
    pub fn sequence_owner(self, entity: &EntityDescriptor, sequence: &str, owner: &str) -> String {
        format!(
            "ALTER SEQUENCE {} OWNER TO {owner}",
            schema_qualify(entity, sequence)
        )
    }

    /// Grants every sequence privilege to `owner`.
    #[must_use]
    pub fn grant_sequence(self, entity: &EntityDescriptor, sequence: &str, owner: &str) -> String {
        format!(
            "GRANT ALL ON SEQUENCE {} TO {owner}",
            schema_qualify(entity, sequence)
        )
    }

    /// Makes the sequence the key column's default.
    #[must_use]
    pub fn bind_sequence(self, entity: &EntityDescriptor, column: &str, sequence: &str) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {column} SET DEFAULT nextval('{}'::regclass)",
            entity.qualified_table_name(),
            schema_qualify(entity, sequence)
        )
    }

    /// Creates a btree index on one column.
    #[must_use]
    pub fn create_index(self, entity: &EntityDescriptor, name: &str, column: &str) -> String {
        format!(
            "CREATE INDEX {name} ON {} USING btree ({column})",
            entity.qualified_table_name()
        )
    }
}

fn schema_qualify(entity: &EntityDescriptor, name: &str) -> String {
    format!("{}.{name}", quote_if_mixed_case(&entity.schema))
}

fn column_definition(column: &ColumnDescriptor) -> String {
    let mut parts = vec![column.storage_name.clone(), column.storage_type.to_string()];
    if !column.is_nullable() {
        parts.push("NOT NULL".to_string());
    }
    if column.is_soft_delete_flag {
        parts.push("DEFAULT false".to_string());
    }
    parts.join(" ")
}
