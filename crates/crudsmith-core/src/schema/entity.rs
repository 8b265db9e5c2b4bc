//! Column and entity descriptors.

use serde::Serialize;

use super::types::{LogicalType, NullableType, StorageType};
use crate::names::quote_if_mixed_case;

/// One physical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Identifier as written in the file.
    pub source_name: String,
    /// Column name after the naming policy.
    pub storage_name: String,
    /// Type token as written.
    pub source_type: LogicalType,
    /// Postgres column type.
    pub storage_type: StorageType,
    /// Bound from `[size:n]`.
    pub size: Option<u32>,
    /// `[primary]`
    pub is_primary: bool,
    /// `[index]`
    pub is_indexed: bool,
    /// `[patch]`
    pub is_patchable: bool,
    /// `[deleted]`
    pub is_soft_delete_flag: bool,
    /// `[deletedon]`
    pub is_soft_delete_timestamp: bool,
    /// Set by `[nulls]`.
    pub nullable: Option<NullableType>,
    /// Text between backticks, passed through to the renderer.
    pub metadata: Option<String>,
}

impl ColumnDescriptor {
    /// Creates a plain column with no options.
    #[must_use]
    pub fn new(
        source_name: impl Into<String>,
        storage_name: impl Into<String>,
        source_type: LogicalType,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            storage_name: storage_name.into(),
            source_type,
            storage_type: source_type.storage_type(None),
            size: None,
            is_primary: false,
            is_indexed: false,
            is_patchable: false,
            is_soft_delete_flag: false,
            is_soft_delete_timestamp: false,
            nullable: None,
            metadata: None,
        }
    }

    /// Whether the column accepts NULL. Primary keys never do.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable.is_some() && !self.is_primary
    }

    /// Type of the field in generated Rust code.
    #[must_use]
    pub fn rust_type(&self) -> String {
        let base = self.storage_type.rust_type();
        if self.is_nullable() {
            format!("Option<{base}>")
        } else {
            base.to_string()
        }
    }
}

/// An old-to-new column pair from an `[alter table]` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRemap {
    /// Column in the prior table, used verbatim.
    pub old: String,
    /// Column in the new table, already resolved.
    pub new: String,
}

/// Whether an entity creates a fresh table or replaces an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EntityMode {
    /// `[add struct]`
    Create,
    /// `[alter table] prior`: rows are copied from `prior_table`.
    Alter {
        /// Table rows are copied from.
        prior_table: String,
        /// Copy mapping in declaration order.
        remap: Vec<ColumnRemap>,
    },
}

/// One entity: a generated record type and its table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityDescriptor {
    /// Record type name, first letter upper-case.
    pub name: String,
    /// Resolved table name.
    pub table_name: String,
    /// Database from the session header.
    pub database: String,
    /// Schema from the session header.
    pub schema: String,
    /// Output unit this entity is rendered into.
    pub file_name: String,
    /// Whether generated code holds prepared statements.
    pub prepared: bool,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDescriptor>,
    /// Create or alter.
    #[serde(flatten)]
    pub mode: EntityMode,
}

impl EntityDescriptor {
    /// The `[primary]` column.
    ///
    /// Parsed entities always have one; a hand-built descriptor may not.
    #[must_use]
    pub fn primary_column(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.is_primary)
    }

    /// The first `[deleted]` and first `[deletedon]` column, if the entity
    /// has both.
    #[must_use]
    pub fn soft_delete_pair(&self) -> Option<(&ColumnDescriptor, &ColumnDescriptor)> {
        let flag = self.columns.iter().find(|c| c.is_soft_delete_flag)?;
        let stamp = self.columns.iter().find(|c| c.is_soft_delete_timestamp)?;
        Some((flag, stamp))
    }

    /// Checks that `[deleted]` and `[deletedon]` columns are either both
    /// present or both absent.
    #[must_use]
    pub fn check_soft_delete_pair(&self) -> bool {
        let flags = self.columns.iter().filter(|c| c.is_soft_delete_flag).count();
        let stamps = self
            .columns
            .iter()
            .filter(|c| c.is_soft_delete_timestamp)
            .count();
        (flags == 0) == (stamps == 0)
    }

    /// Columns marked `[index]`.
    pub fn indexed_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_indexed)
    }

    /// Columns marked `[patch]`.
    pub fn patchable_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_patchable)
    }

    /// `database.schema.table`, quoting a mixed-case database or schema.
    #[must_use]
    pub fn qualified_table_name(&self) -> String {
        self.qualify(&self.table_name)
    }

    /// Qualifies another table in this entity's database and schema.
    #[must_use]
    pub fn qualify(&self, table: &str) -> String {
        format!(
            "{}.{}.{table}",
            quote_if_mixed_case(&self.database),
            quote_if_mixed_case(&self.schema)
        )
    }

    /// The prior-table column that feeds the new primary key, found through
    /// the alter remap.
    #[must_use]
    pub fn old_primary_column(&self) -> Option<&str> {
        let EntityMode::Alter { remap, .. } = &self.mode else {
            return None;
        };
        let primary = self.primary_column()?;
        remap
            .iter()
            .find(|pair| pair.new == primary.storage_name)
            .map(|pair| pair.old.as_str())
    }

    /// Canonical name of the primary-key constraint.
    #[must_use]
    pub fn primary_key_constraint_name(&self) -> Option<String> {
        self.primary_column()
            .map(|pk| format!("pk_{}_{}", self.table_name, pk.storage_name))
    }

    /// Canonical name of the primary-key sequence.
    #[must_use]
    pub fn sequence_name(&self) -> Option<String> {
        self.primary_column()
            .map(|pk| format!("{}_{}_seq", self.table_name, pk.storage_name))
    }

    /// Canonical name of the index on `column`.
    #[must_use]
    pub fn index_name(&self, column: &ColumnDescriptor) -> String {
        format!("ix_{}_{}", self.table_name, column.storage_name)
    }

    /// Whether this entity replaces an existing table.
    #[must_use]
    pub const fn is_alter(&self) -> bool {
        matches!(self.mode, EntityMode::Alter { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(columns: Vec<ColumnDescriptor>, mode: EntityMode) -> EntityDescriptor {
        EntityDescriptor {
            name: "Order".into(),
            table_name: "tbl_order".into(),
            database: "ShopDb".into(),
            schema: "public".into(),
            file_name: "order.rs".into(),
            prepared: true,
            columns,
            mode,
        }
    }

    fn pk() -> ColumnDescriptor {
        let mut col = ColumnDescriptor::new("id", "id", LogicalType::Int64);
        col.is_primary = true;
        col
    }

    #[test]
    fn test_canonical_names() {
        let mut sku = ColumnDescriptor::new("sku", "sku", LogicalType::String);
        sku.is_indexed = true;
        let e = entity(vec![pk(), sku], EntityMode::Create);

        assert_eq!(e.primary_key_constraint_name().as_deref(), Some("pk_tbl_order_id"));
        assert_eq!(e.sequence_name().as_deref(), Some("tbl_order_id_seq"));
        let ix: Vec<_> = e.indexed_columns().map(|c| e.index_name(c)).collect();
        assert_eq!(ix, ["ix_tbl_order_sku"]);
        assert_eq!(e.qualified_table_name(), "\"ShopDb\".public.tbl_order");
    }

    #[test]
    fn test_soft_delete_pair_check() {
        let mut flag = ColumnDescriptor::new("gone", "gone", LogicalType::Bool);
        flag.is_soft_delete_flag = true;
        let mut stamp = ColumnDescriptor::new("goneAt", "gone_at", LogicalType::Time);
        stamp.is_soft_delete_timestamp = true;

        let e = entity(vec![pk(), flag.clone(), stamp.clone()], EntityMode::Create);
        assert!(e.check_soft_delete_pair());
        let (f, s) = e.soft_delete_pair().unwrap();
        assert_eq!((f.source_name.as_str(), s.source_name.as_str()), ("gone", "goneAt"));

        assert!(!entity(vec![pk(), flag.clone()], EntityMode::Create).check_soft_delete_pair());
        assert!(!entity(vec![pk(), stamp.clone()], EntityMode::Create).check_soft_delete_pair());
        assert!(entity(vec![pk()], EntityMode::Create).check_soft_delete_pair());

        let mut hidden = ColumnDescriptor::new("hidden", "hidden", LogicalType::Bool);
        hidden.is_soft_delete_flag = true;
        let e = entity(vec![pk(), flag, hidden, stamp], EntityMode::Create);
        assert!(e.check_soft_delete_pair());
        let (f, _) = e.soft_delete_pair().unwrap();
        assert_eq!(f.source_name, "gone");
    }

    #[test]
    fn test_old_primary_column() {
        let mode = EntityMode::Alter {
            prior_table: "orders_v1".into(),
            remap: vec![
                ColumnRemap { old: "OrderNo".into(), new: "id".into() },
                ColumnRemap { old: "Sku".into(), new: "sku".into() },
            ],
        };
        let e = entity(vec![pk()], mode);
        assert_eq!(e.old_primary_column(), Some("OrderNo"));
        assert!(e.is_alter());

        assert_eq!(entity(vec![pk()], EntityMode::Create).old_primary_column(), None);
    }

    #[test]
    fn test_primary_key_never_nullable() {
        let mut col = pk();
        col.nullable = Some(crate::schema::wrap_nullable(LogicalType::Int64).unwrap());
        assert!(!col.is_nullable());
        assert_eq!(col.rust_type(), "i64");

        let mut note = ColumnDescriptor::new("note", "note", LogicalType::String);
        note.nullable = Some(crate::schema::wrap_nullable(LogicalType::String).unwrap());
        assert_eq!(note.rust_type(), "Option<String>");
    }
}
