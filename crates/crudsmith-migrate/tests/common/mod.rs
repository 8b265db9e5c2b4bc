#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use crudsmith_core::prelude::*;
use crudsmith_migrate::connection::Database;

/// A complete header using snake-case naming.
pub const HEADER: &str = "\
[server] localhost
[user] app
[password] secret
[database] appdb
[schema] public
[ssl] false
[underscore] true
[package] models
";

pub fn parse_entities(body: &str) -> Vec<EntityDescriptor> {
    let input = format!("{HEADER}{body}");
    parse_str(&input)
        .unwrap_or_else(|e| panic!("Failed to parse:\n{input}\nError: {e}"))
        .entities
}

pub fn parse_entity(body: &str) -> EntityDescriptor {
    let mut all = parse_entities(body);
    assert_eq!(all.len(), 1, "expected exactly one entity");
    all.remove(0)
}

#[derive(Default)]
struct State {
    tables: HashSet<String>,
    relations: HashSet<String>,
    scalars: Vec<(String, Option<i64>)>,
    failures: Vec<String>,
    executed: Vec<String>,
    lookups: Vec<(String, Vec<String>)>,
}

/// In-memory stand-in for Postgres.
///
/// Catalog lookups answer from the configured table and relation names,
/// integer queries from the first scalar whose fragment the SQL contains.
/// Any statement containing a failure fragment errors.
#[derive(Default)]
pub struct FakeDatabase {
    state: Mutex<State>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tables(self, names: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .tables
            .extend(names.iter().map(|n| (*n).to_string()));
        self
    }

    #[must_use]
    pub fn with_relations(self, names: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .relations
            .extend(names.iter().map(|n| (*n).to_string()));
        self
    }

    #[must_use]
    pub fn with_scalar(self, fragment: &str, value: Option<i64>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scalars
            .push((fragment.to_string(), value));
        self
    }

    #[must_use]
    pub fn failing_on(self, fragment: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .push(fragment.to_string());
        self
    }

    /// Statements passed to `execute`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    /// Names looked up in the catalogs, in order.
    pub fn looked_up_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .lookups
            .iter()
            .map(|(_, binds)| binds[0].clone())
            .collect()
    }

    fn check(state: &State, sql: &str) -> Result<(), sqlx::Error> {
        match state.failures.iter().find(|f| sql.contains(f.as_str())) {
            Some(_) => Err(sqlx::Error::Protocol(format!("injected failure: {sql}"))),
            None => Ok(()),
        }
    }
}

impl Database for FakeDatabase {
    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(sql.to_string());
        Self::check(&state, sql)
    }

    async fn query_bool(&self, sql: &str, binds: &[&str]) -> Result<bool, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        state
            .lookups
            .push((sql.to_string(), binds.iter().map(|b| (*b).to_string()).collect()));
        Self::check(&state, sql)?;
        let names = if sql.contains("information_schema.tables") {
            &state.tables
        } else {
            &state.relations
        };
        Ok(names.contains(binds[0]))
    }

    async fn query_i64(&self, sql: &str) -> Result<Option<i64>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Self::check(&state, sql)?;
        Ok(state
            .scalars
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .and_then(|(_, value)| *value))
    }
}
