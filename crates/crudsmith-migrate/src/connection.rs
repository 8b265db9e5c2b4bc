//! Database handles used by the migration executor.
//!
//! The executor only needs three capabilities, captured by [`Database`]:
//! run a statement, answer a yes/no catalog lookup, and read one integer.
//! [`PgDatabase`] talks to Postgres; [`DryRunDatabase`] prints statements
//! instead of running them.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crudsmith_core::config::SessionConfig;
use crudsmith_core::schema::{EntityDescriptor, EntityMode};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use tracing::{debug, info};

/// Statement execution used by the migration executor.
#[allow(async_fn_in_trait)]
pub trait Database {
    /// Runs one statement, discarding any result.
    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error>;

    /// Runs a query returning a single boolean, binding `binds` as text.
    async fn query_bool(&self, sql: &str, binds: &[&str]) -> Result<bool, sqlx::Error>;

    /// Runs a query returning a single nullable integer.
    async fn query_i64(&self, sql: &str) -> Result<Option<i64>, sqlx::Error>;
}

/// A Postgres pool capped at one connection.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connects with the values of a definition file header.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the connection cannot be made.
    pub async fn connect(config: &SessionConfig) -> Result<Self, sqlx::Error> {
        let options = connect_options(config);
        info!(
            server = %config.server,
            database = %config.database,
            ssl = config.ssl,
            "Connecting to Postgres"
        );
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Connects with a `postgres://` URL.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the URL is invalid or the connection
    /// cannot be made.
    pub async fn connect_url(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(1).connect(url).await?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Closes the pool, waiting for the connection to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl Database for PgDatabase {
    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn query_bool(&self, sql: &str, binds: &[&str]) -> Result<bool, sqlx::Error> {
        let mut query = sqlx::query_scalar::<_, bool>(sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        query.fetch_one(&self.pool).await
    }

    async fn query_i64(&self, sql: &str) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i64>>(sql)
            .fetch_one(&self.pool)
            .await
    }
}

/// Splits `host[:port]`, leaving the host whole if the port is not a number.
fn split_server(server: &str) -> (&str, Option<u16>) {
    match server.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (server, None),
        },
        None => (server, None),
    }
}

fn connect_options(config: &SessionConfig) -> PgConnectOptions {
    let (host, port) = split_server(&config.server);
    let ssl_mode = if config.ssl {
        PgSslMode::Require
    } else {
        PgSslMode::Disable
    };
    let options = PgConnectOptions::new()
        .host(host)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .ssl_mode(ssl_mode);
    match port {
        Some(port) => options.port(port),
        None => options,
    }
}

/// Prints statements instead of running them.
///
/// Catalog lookups answer `true` for names given to
/// [`DryRunDatabase::assume_existing`] and for the objects that printed
/// statements have created or renamed. Integer queries answer `NULL`, so
/// a planned sequence always starts at 1.
#[derive(Debug, Default)]
pub struct DryRunDatabase {
    existing: Mutex<HashSet<String>>,
}

impl DryRunDatabase {
    /// Creates a dry run where no object exists yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Treats the named tables or relations as present.
    #[must_use]
    pub fn assume_existing<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog().extend(names.into_iter().map(Into::into));
        self
    }

    /// Treats each `[alter table]` prior table as present, unless an
    /// earlier entity creates it.
    #[must_use]
    pub fn assume_prior_tables(self, entities: &[EntityDescriptor]) -> Self {
        let mut created = HashSet::new();
        let mut prior = Vec::new();
        for entity in entities {
            if let EntityMode::Alter { prior_table, .. } = &entity.mode {
                if !created.contains(prior_table.as_str()) {
                    prior.push(prior_table.clone());
                }
            }
            created.insert(entity.table_name.as_str());
        }
        self.assume_existing(prior)
    }

    fn catalog(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.existing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Database for DryRunDatabase {
    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        println!("{sql};");
        let (freed, taken) = catalog_effect(sql);
        let mut catalog = self.catalog();
        if let Some(name) = freed {
            catalog.remove(name);
        }
        if let Some(name) = taken {
            catalog.insert(name.to_string());
        }
        Ok(())
    }

    async fn query_bool(&self, sql: &str, binds: &[&str]) -> Result<bool, sqlx::Error> {
        let found = binds
            .first()
            .is_some_and(|name| self.catalog().contains(*name));
        debug!(sql, ?binds, found, "Dry-run lookup");
        Ok(found)
    }

    async fn query_i64(&self, sql: &str) -> Result<Option<i64>, sqlx::Error> {
        debug!(sql, "Dry-run query");
        Ok(None)
    }
}

/// The object name a migration statement frees and the one it takes.
fn catalog_effect(sql: &str) -> (Option<&str>, Option<&str>) {
    let words: Vec<&str> = sql.split_whitespace().collect();
    match words.as_slice() {
        ["CREATE", "TABLE", "IF", "NOT", "EXISTS", name, ..]
        | ["CREATE", "SEQUENCE" | "INDEX", name, ..]
        | ["ALTER", "TABLE", _, "ADD", "CONSTRAINT", name, ..] => (None, Some(object_name(name))),
        ["ALTER", "TABLE", "IF", "EXISTS", from, "RENAME", "TO", to]
        | ["ALTER", "INDEX" | "SEQUENCE", from, "RENAME", "TO", to] => {
            (Some(object_name(from)), Some(object_name(to)))
        }
        _ => (None, None),
    }
}

/// Last segment of a possibly qualified name, without quotes.
fn object_name(qualified: &str) -> &str {
    qualified
        .rsplit('.')
        .next()
        .map_or(qualified, |name| name.trim_matches('"'))
}
