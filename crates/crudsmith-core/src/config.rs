//! Session configuration collected from the header of a definition file.

use std::fmt;

use serde::Serialize;

use crate::names::{to_snake_case, validate_identifier, NameError};

/// One of the eight header options every definition file must set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKey {
    /// `[server]`: host, optionally with `:port`.
    Server,
    /// `[user]`
    User,
    /// `[password]`
    Password,
    /// `[database]`
    Database,
    /// `[schema]`
    Schema,
    /// `[ssl]`
    Ssl,
    /// `[underscore]`: selects the naming policy.
    Underscore,
    /// `[package]`: name of the generated module.
    Package,
}

impl ConfigKey {
    /// Every header key, in the order they are usually written.
    pub const ALL: [Self; 8] = [
        Self::Server,
        Self::User,
        Self::Password,
        Self::Database,
        Self::Schema,
        Self::Ssl,
        Self::Underscore,
        Self::Package,
    ];

    /// Matches the lower-cased text between the brackets.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.token() == token)
    }

    /// The bracket text for this key.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::User => "user",
            Self::Password => "password",
            Self::Database => "database",
            Self::Schema => "schema",
            Self::Ssl => "ssl",
            Self::Underscore => "underscore",
            Self::Package => "package",
        }
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.token())
    }
}

/// How table and column names written in the file become storage names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    /// `[underscore] true`: `loginID` becomes `login_id`.
    SnakeCase,
    /// `[underscore] false`: `loginID` becomes `loginid`.
    #[default]
    Lowercase,
}

impl NamingPolicy {
    /// Resolves a user-written identifier to its storage name.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if snake-casing rejects the identifier.
    pub fn resolve(self, name: &str) -> Result<String, NameError> {
        match self {
            Self::SnakeCase => to_snake_case(name),
            Self::Lowercase => Ok(name.to_lowercase()),
        }
    }

    /// Synthesizes the table name for an entity declared without `[table]`.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if the entity name is not a valid identifier.
    pub fn default_table_name(self, entity: &str) -> Result<String, NameError> {
        validate_identifier(entity)?;
        Ok(match self {
            Self::SnakeCase => format!("tbl_{}", to_snake_case(entity)?),
            Self::Lowercase => format!("tbl{}", entity.to_lowercase()),
        })
    }
}

/// Values set by the header of a definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    /// Database host, with an optional `:port`.
    pub server: String,
    /// Login role.
    pub user: String,
    /// Login password.
    #[serde(skip_serializing)]
    pub password: String,
    /// Target database.
    pub database: String,
    /// Target schema.
    pub schema: String,
    /// Whether connections require TLS.
    pub ssl: bool,
    /// Naming policy for tables and columns.
    pub naming: NamingPolicy,
    /// Package (module) name written into generated code.
    pub package: String,
}

/// Tracks which header options have been seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeenKeys(u8);

impl SeenKeys {
    /// Marks `key` as seen, returning `false` if it already was.
    pub fn insert(&mut self, key: ConfigKey) -> bool {
        let fresh = self.0 & key.bit() == 0;
        self.0 |= key.bit();
        fresh
    }

    /// Returns the keys not seen yet, in header order.
    #[must_use]
    pub fn missing(self) -> Vec<ConfigKey> {
        ConfigKey::ALL
            .into_iter()
            .filter(|key| self.0 & key.bit() == 0)
            .collect()
    }

    /// Returns true once all eight keys are present.
    #[must_use]
    pub fn is_complete(self) -> bool {
        self.missing().is_empty()
    }
}
