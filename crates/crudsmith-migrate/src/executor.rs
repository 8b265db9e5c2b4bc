//! Migration executor.
//!
//! Applies one entity at a time: it moves objects holding the entity's
//! canonical names out of the way, creates the table, copies rows from
//! the prior table, then adds the key, its sequence and the indexes.
//! Every statement is its own round trip and nothing runs in a
//! transaction.

use std::fmt;

use chrono::{DateTime, Utc};
use crudsmith_core::schema::{EntityDescriptor, EntityMode};
use crudsmith_core::ParseError;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::connection::Database;
use crate::dialect::PostgresDialect;
use crate::error::{MigrateError, Result};
use crate::naming::{find_free_name, stored_identifier, Displaced, ObjectKind};

/// A stage of the migration of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStep {
    /// Looking up the table named by `[alter table]`.
    CheckPriorTable,
    /// Finding or freeing the name of an object.
    ResolveName(ObjectKind, String),
    /// Renaming an existing object to a free name.
    RenameExisting(ObjectKind, String),
    /// `CREATE TABLE`.
    CreateTable,
    /// Owner and grants on the table.
    TablePermissions,
    /// Reading the row count and largest key of the copy source.
    ReadSequenceStart,
    /// Adding the primary-key constraint.
    AddPrimaryKey,
    /// Creating the key sequence with its owner and grants.
    CreateSequence,
    /// Making the sequence the key column's default.
    BindSequence,
    /// Creating an index.
    CreateIndex(String),
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckPriorTable => f.write_str("checking the table to alter"),
            Self::ResolveName(kind, name) => write!(f, "checking {kind} name '{name}'"),
            Self::RenameExisting(kind, name) => write!(f, "renaming existing {kind} '{name}'"),
            Self::CreateTable => f.write_str("creating the table"),
            Self::TablePermissions => f.write_str("assigning table permissions"),
            Self::ReadSequenceStart => f.write_str("reading the last key of the copied rows"),
            Self::AddPrimaryKey => f.write_str("adding the primary key constraint"),
            Self::CreateSequence => f.write_str("creating the key sequence"),
            Self::BindSequence => f.write_str("binding the key sequence"),
            Self::CreateIndex(name) => write!(f, "creating index '{name}'"),
        }
    }
}

/// What a successful migration did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Entity name.
    pub entity: String,
    /// Qualified name of the created table.
    pub table: String,
    /// Existing objects renamed to free the canonical names.
    pub displaced: Vec<Displaced>,
    /// Qualified table rows were copied from, for `[alter table]`.
    pub copy_source: Option<String>,
    /// Whether the row copy ran and succeeded.
    pub rows_copied: bool,
    /// First value of the key sequence.
    pub sequence_start: i64,
    /// Names of the created indexes.
    pub indexes: Vec<String>,
    /// When the migration finished.
    pub applied_at: DateTime<Utc>,
}

/// Applies entities to a database.
pub struct MigrationExecutor<'a, D: Database> {
    db: &'a D,
    dialect: PostgresDialect,
    owner: String,
}

impl<'a, D: Database> MigrationExecutor<'a, D> {
    /// Creates an executor that hands new tables and sequences to `owner`.
    pub fn new(db: &'a D, owner: impl Into<String>) -> Self {
        Self {
            db,
            dialect: PostgresDialect::new(),
            owner: owner.into(),
        }
    }

    /// Returns the dialect.
    #[must_use]
    pub const fn dialect(&self) -> &PostgresDialect {
        &self.dialect
    }

    /// Migrates every entity in order.
    ///
    /// A failed entity is logged and does not stop the ones after it.
    pub async fn migrate_all(&self, entities: &[EntityDescriptor]) -> Vec<Result<MigrationReport>> {
        let mut results = Vec::with_capacity(entities.len());
        for entity in entities {
            let result = self.migrate(entity).await;
            if let Err(e) = &result {
                error!(entity = %entity.name, error = %e, "Migration failed");
            }
            results.push(result);
        }
        results
    }

    /// Migrates one entity.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::PriorTableNotFound`] when an altered table
    /// is missing, and [`MigrateError::Step`] for the first statement that
    /// fails. A failed row copy is logged and does not stop the migration.
    pub async fn migrate(&self, entity: &EntityDescriptor) -> Result<MigrationReport> {
        let d = self.dialect;
        let pk = entity
            .primary_column()
            .ok_or_else(|| ParseError::MissingPrimaryKey(entity.name.clone()))?;
        let table = entity.qualified_table_name();
        info!(entity = %entity.name, table = %table, alter = entity.is_alter(), "Migrating entity");

        let remap = match &entity.mode {
            EntityMode::Create => None,
            EntityMode::Alter { prior_table, remap } => {
                self.check_prior_table(entity, prior_table).await?;
                Some((prior_table, remap))
            }
        };

        let mut displaced = Vec::new();
        let table_rename = self
            .claim_name(entity, ObjectKind::Table, &entity.table_name)
            .await?;
        displaced.extend(table_rename.clone());

        let copy_source = remap.map(|(prior_table, _)| {
            let source = match &table_rename {
                Some(moved) if *prior_table == entity.table_name => moved.to.as_str(),
                _ => prior_table.as_str(),
            };
            entity.qualify(source)
        });

        let key = &pk.storage_name;
        let constraint = stored_identifier(&format!("pk_{}_{key}", entity.table_name));
        let sequence = stored_identifier(&format!("{}_{key}_seq", entity.table_name));
        displaced.extend(self.claim_name(entity, ObjectKind::Index, &constraint).await?);
        displaced.extend(self.claim_name(entity, ObjectKind::Sequence, &sequence).await?);
        let indexes: Vec<(String, &str)> = entity
            .indexed_columns()
            .map(|c| (stored_identifier(&entity.index_name(c)), c.storage_name.as_str()))
            .collect();
        for (index, _) in &indexes {
            displaced.extend(self.claim_name(entity, ObjectKind::Index, index).await?);
        }

        self.run(MigrationStep::CreateTable, &d.create_table(entity))
            .await?;
        self.run(MigrationStep::TablePermissions, &d.table_owner(entity, &self.owner))
            .await?;
        self.run(MigrationStep::TablePermissions, &d.grant_table(entity, &self.owner))
            .await?;

        let mut rows_copied = false;
        if let (Some(source), Some((_, remap))) = (&copy_source, remap) {
            if remap.is_empty() {
                warn!(entity = %entity.name, source = %source, "No columns mapped, skipping the row copy");
            } else {
                let sql = d.copy_rows(entity, source, remap);
                debug!(sql = %sql, "Executing SQL");
                match self.db.execute(&sql).await {
                    Ok(()) => rows_copied = true,
                    Err(e) => warn!(
                        source = %source,
                        table = %table,
                        error = %e,
                        "Copying rows failed, continuing without them"
                    ),
                }
            }
        }

        let sequence_start = match (&copy_source, entity.old_primary_column()) {
            (Some(source), Some(old_pk)) if rows_copied => {
                self.sequence_start(source, old_pk).await?
            }
            _ => 1,
        };

        self.run(
            MigrationStep::AddPrimaryKey,
            &d.add_primary_key(entity, &constraint, &pk.storage_name),
        )
        .await?;
        self.run(
            MigrationStep::CreateSequence,
            &d.create_sequence(entity, &sequence, sequence_start),
        )
        .await?;
        self.run(
            MigrationStep::CreateSequence,
            &d.sequence_owner(entity, &sequence, &self.owner),
        )
        .await?;
        self.run(
            MigrationStep::CreateSequence,
            &d.grant_sequence(entity, &sequence, &self.owner),
        )
        .await?;
        self.run(
            MigrationStep::BindSequence,
            &d.bind_sequence(entity, &pk.storage_name, &sequence),
        )
        .await?;

        for (index, column) in &indexes {
            self.run(
                MigrationStep::CreateIndex(index.clone()),
                &d.create_index(entity, index, column),
            )
            .await?;
        }

        info!(
            entity = %entity.name,
            table = %table,
            rows_copied,
            sequence_start,
            "Entity migrated"
        );
        Ok(MigrationReport {
            entity: entity.name.clone(),
            table,
            displaced,
            copy_source,
            rows_copied,
            sequence_start,
            indexes: indexes.into_iter().map(|(name, _)| name).collect(),
            applied_at: Utc::now(),
        })
    }

    async fn check_prior_table(&self, entity: &EntityDescriptor, prior_table: &str) -> Result<()> {
        let sql = self.dialect.exists_query(ObjectKind::Table);
        let exists = self
            .db
            .query_bool(sql, &[prior_table, entity.schema.as_str()])
            .await
            .map_err(|source| MigrateError::Step {
                step: MigrationStep::CheckPriorTable,
                source,
            })?;
        if exists {
            Ok(())
        } else {
            Err(MigrateError::PriorTableNotFound {
                table: prior_table.to_string(),
                schema: entity.schema.clone(),
            })
        }
    }

    /// Frees `canonical` for the entity, renaming whatever holds it.
    ///
    /// Names are compared the way Postgres stores them, cut to 63 bytes.
    async fn claim_name(
        &self,
        entity: &EntityDescriptor,
        kind: ObjectKind,
        canonical: &str,
    ) -> Result<Option<Displaced>> {
        let canonical = stored_identifier(canonical);
        let canonical = canonical.as_str();
        let db = self.db;
        let sql = self.dialect.exists_query(kind);
        let schema = entity.schema.as_str();
        let free = find_free_name(canonical, |name| async move {
            db.query_bool(sql, &[name.as_str(), schema]).await
        })
        .await
        .map_err(|source| MigrateError::Step {
            step: MigrationStep::ResolveName(kind, canonical.to_string()),
            source,
        })?;

        if free == canonical {
            return Ok(None);
        }
        info!(kind = %kind, from = canonical, to = %free, "Renaming existing object");
        self.run(
            MigrationStep::RenameExisting(kind, canonical.to_string()),
            &self.dialect.rename(kind, entity, canonical, &free),
        )
        .await?;
        Ok(Some(Displaced {
            kind,
            from: canonical.to_string(),
            to: free,
        }))
    }

    /// `MAX(old key) + 1` when the source has rows, else 1.
    async fn sequence_start(&self, table: &str, old_pk: &str) -> Result<i64> {
        let step = |e| MigrateError::Step {
            step: MigrationStep::ReadSequenceStart,
            source: e,
        };
        let rows = self
            .db
            .query_i64(&self.dialect.count_rows(table))
            .await
            .map_err(step)?
            .unwrap_or(0);
        if rows == 0 {
            return Ok(1);
        }
        let last = self
            .db
            .query_i64(&self.dialect.max_value(table, old_pk))
            .await
            .map_err(step)?
            .unwrap_or(0);
        Ok(last.saturating_add(1))
    }

    async fn run(&self, step: MigrationStep, sql: &str) -> Result<()> {
        debug!(sql = %sql, "Executing SQL");
        self.db
            .execute(sql)
            .await
            .map_err(|source| MigrateError::Step { step, source })
    }
}
