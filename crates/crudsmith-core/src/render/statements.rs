//! CRUD statement text for one entity.

use crate::error::{ParseError, Result};
use crate::schema::{ColumnDescriptor, EntityDescriptor};

/// A statement tied to one column (index lookups and patches).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnStatement {
    /// Storage name of the column.
    pub column: String,
    /// Statement text.
    pub sql: String,
}

/// Every statement the generated data access code runs.
///
/// Placeholders are numbered Postgres style. When the entity has a
/// soft-delete pair, key and index lookups take two extra booleans that
/// bound the flag column: `(flag = $n OR flag = $n+1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudStatements {
    /// Fetch one row by primary key.
    pub select_by_id: String,
    /// Insert every non-key column, returning the new key.
    pub insert: String,
    /// Update every non-key column by key; `None` when the key is the only
    /// column.
    pub update: Option<String>,
    /// Set the soft-delete pair by key.
    pub mark_deleted: Option<String>,
    /// Delete by key.
    pub delete: String,
    /// One lookup per `[index]` column, ordered by key.
    pub select_by_index: Vec<ColumnStatement>,
    /// One single-column update per `[patch]` column.
    pub patch: Vec<ColumnStatement>,
}

impl CrudStatements {
    /// Builds the statements for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingPrimaryKey`] for an entity without a
    /// `[primary]` column.
    pub fn new(entity: &EntityDescriptor) -> Result<Self> {
        let pk = entity
            .primary_column()
            .ok_or_else(|| ParseError::MissingPrimaryKey(entity.name.clone()))?;
        let table = entity.qualified_table_name();
        let key = &pk.storage_name;
        let select_list = join_names(entity.columns.iter());
        let data: Vec<&ColumnDescriptor> =
            entity.columns.iter().filter(|c| !c.is_primary).collect();

        let soft_delete = entity.soft_delete_pair();
        let filter = |first: usize| {
            soft_delete.map_or_else(String::new, |(flag, _)| {
                let flag = &flag.storage_name;
                format!(" AND ({flag} = ${first} OR {flag} = ${})", first + 1)
            })
        };

        let select_by_id = format!(
            "SELECT {select_list} FROM {table} WHERE {key} = $1{}",
            filter(2)
        );

        let insert = if data.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES RETURNING {key}")
        } else {
            let placeholders = (1..=data.len())
                .map(|i| format!("${i}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders}) RETURNING {key}",
                join_names(data.iter().copied())
            )
        };

        let update = (!data.is_empty()).then(|| {
            let assignments = data
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{} = ${}", c.storage_name, i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "UPDATE {table} SET {assignments} WHERE {key} = ${}",
                data.len() + 1
            )
        });

        let mark_deleted = soft_delete.map(|(flag, stamp)| {
            format!(
                "UPDATE {table} SET {} = $1, {} = $2 WHERE {key} = $3",
                flag.storage_name, stamp.storage_name
            )
        });

        let delete = format!("DELETE FROM {table} WHERE {key} = $1");

        let select_by_index = entity
            .indexed_columns()
            .map(|c| ColumnStatement {
                column: c.storage_name.clone(),
                sql: format!(
                    "SELECT {select_list} FROM {table} WHERE {} = $1{} ORDER BY {key}",
                    c.storage_name,
                    filter(2)
                ),
            })
            .collect();

        let patch = entity
            .patchable_columns()
            .map(|c| ColumnStatement {
                column: c.storage_name.clone(),
                sql: format!("UPDATE {table} SET {} = $1 WHERE {key} = $2", c.storage_name),
            })
            .collect();

        Ok(Self {
            select_by_id,
            insert,
            update,
            mark_deleted,
            delete,
            select_by_index,
            patch,
        })
    }
}

fn join_names<'a>(columns: impl Iterator<Item = &'a ColumnDescriptor>) -> String {
    columns
        .map(|c| c.storage_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
