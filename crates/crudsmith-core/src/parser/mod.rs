//! Definition file parser.
//!
//! The parser is a line-driven state machine. A file starts with a header
//! of `[key] value` lines, followed by entity blocks:
//!
//! ```text
//! [server] localhost
//! [user] app
//! [password] secret
//! [database] appdb
//! [schema] public
//! [ssl] false
//! [underscore] true
//! [package] models
//!
//! [add struct]
//! type User struct {
//!     loginID int [primary]
//!     userName string [size:40] [index]
//! }
//!
//! [alter table] tbl_user
//! loginID [to] loginID
//! userName [to] userName
//! [add struct]
//! type User struct {
//!     loginID int [primary]
//!     userName string [index]
//!     removed bool [deleted]
//!     removedOn time.Time [deletedon]
//! }
//! ```
//!
//! Each line moves the machine between the states of [`State`]. The first
//! error aborts the file.

mod column;
mod scan;

use std::mem;

use serde::Serialize;
use tracing::{debug, trace};

use self::column::parse_column;
use self::scan::first_bracket;
use crate::config::{ConfigKey, NamingPolicy, SeenKeys, SessionConfig};
use crate::error::{LineError, ParseError, Result};
use crate::names::{normalize_whitespace, upper_first, validate_identifier};
use crate::schema::{ColumnRemap, EntityDescriptor, EntityMode};

/// Everything a definition file describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFile {
    /// Header values.
    pub config: SessionConfig,
    /// Entities in declaration order.
    pub entities: Vec<EntityDescriptor>,
}

/// Options gathered before the `type Name` line of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EntityDraft {
    mode: EntityMode,
    table: Option<String>,
    file_name: Option<String>,
    prepared: bool,
}

impl EntityDraft {
    const fn new(mode: EntityMode) -> Self {
        Self {
            mode,
            table: None,
            file_name: None,
            prepared: true,
        }
    }
}

/// Column remaps gathered in an `[alter table]` block.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AlterDraft {
    prior_table: String,
    remap: Vec<ColumnRemap>,
}

/// Parser state between lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum State {
    /// Header options and block openers.
    #[default]
    TopLevel,
    /// `OldCol [to] NewCol` lines after `[alter table]`.
    InAlterBlock(AlterDraft),
    /// Entity options, waiting for `type Name`.
    InEntityBlock(EntityDraft),
    /// Column lines until a lone `}`.
    CollectingColumns(EntityDescriptor),
}

impl State {
    const fn describe(&self) -> &'static str {
        match self {
            Self::TopLevel => "header",
            Self::InAlterBlock(_) => "[alter table] block",
            Self::InEntityBlock(_) => "[add struct] block before its type line",
            Self::CollectingColumns(_) => "column list",
        }
    }
}

/// Incremental parser fed one line at a time.
///
/// After an error the parser should be discarded.
#[derive(Debug, Default)]
pub struct Parser {
    state: State,
    config: SessionConfig,
    seen: SeenKeys,
    entities: Vec<EntityDescriptor>,
    line: usize,
}

impl Parser {
    /// Creates a parser at the start of a file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next line.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, tagged with its line number.
    pub fn feed_line(&mut self, line: &str) -> std::result::Result<(), LineError> {
        self.line += 1;
        let state = mem::take(&mut self.state);
        match self.step(state, line) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(error) => Err(LineError {
                line: self.line,
                error,
            }),
        }
    }

    /// Ends the input and returns the parsed file.
    ///
    /// # Errors
    ///
    /// Fails if the header is incomplete or a block was left open.
    pub fn finish(self) -> std::result::Result<ParsedFile, LineError> {
        let at_end = |error| LineError {
            line: self.line + 1,
            error,
        };
        if self.state != State::TopLevel {
            return Err(at_end(ParseError::structural(format!(
                "input ended inside the {}",
                self.state.describe()
            ))));
        }
        if !self.seen.is_complete() {
            return Err(at_end(ParseError::MissingConfiguration(self.seen.missing())));
        }
        debug!(entities = self.entities.len(), "Parsed definition file");
        Ok(ParsedFile {
            config: self.config,
            entities: self.entities,
        })
    }

    fn step(&mut self, state: State, line: &str) -> Result<State> {
        match state {
            State::TopLevel => self.top_level(line),
            State::InAlterBlock(draft) => self.alter_block(draft, line),
            State::InEntityBlock(draft) => self.entity_block(draft, line),
            State::CollectingColumns(entity) => self.collect_column(entity, line),
        }
    }

    fn top_level(&mut self, line: &str) -> Result<State> {
        let Some(bracket) = first_bracket(line) else {
            return Ok(State::TopLevel);
        };

        if let Some(key) = ConfigKey::from_token(&bracket.content) {
            self.set_option(key, bracket.rest.trim())?;
            return Ok(State::TopLevel);
        }

        match bracket.content.as_str() {
            "add struct" => {
                self.require_config()?;
                Ok(State::InEntityBlock(EntityDraft::new(EntityMode::Create)))
            }
            "alter table" => {
                self.require_config()?;
                let prior_table = bracket.rest.trim();
                if prior_table.is_empty() {
                    return Err(ParseError::MissingValue("[alter table]".into()));
                }
                validate_identifier(prior_table).map_err(ParseError::invalid_name("prior table"))?;
                Ok(State::InAlterBlock(AlterDraft {
                    prior_table: prior_table.to_string(),
                    remap: Vec::new(),
                }))
            }
            // Free text between blocks.
            _ => Ok(State::TopLevel),
        }
    }

    fn set_option(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        if !self.seen.insert(key) {
            return Err(ParseError::DuplicateOption(key));
        }
        if value.is_empty() {
            return Err(ParseError::MissingValue(key.to_string()));
        }
        trace!(option = %key, "Header option set");

        let flag = value.eq_ignore_ascii_case("true");
        match key {
            ConfigKey::Server => self.config.server = value.to_string(),
            ConfigKey::User => self.config.user = value.to_string(),
            ConfigKey::Password => self.config.password = value.to_string(),
            ConfigKey::Database => self.config.database = value.to_string(),
            ConfigKey::Schema => self.config.schema = value.to_string(),
            ConfigKey::Ssl => self.config.ssl = flag,
            ConfigKey::Underscore => {
                self.config.naming = if flag {
                    NamingPolicy::SnakeCase
                } else {
                    NamingPolicy::Lowercase
                };
            }
            ConfigKey::Package => self.config.package = value.to_string(),
        }
        Ok(())
    }

    fn require_config(&self) -> Result<()> {
        let missing = self.seen.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ParseError::MissingConfiguration(missing))
        }
    }

    fn alter_block(&self, mut draft: AlterDraft, line: &str) -> Result<State> {
        let line = normalize_whitespace(line);
        if line.is_empty() {
            return Ok(State::InAlterBlock(draft));
        }
        let Some((before, after)) = line.split_once('[') else {
            return Err(ParseError::structural(format!(
                "expected a bracketed directive in [alter table] block, found '{line}'"
            )));
        };
        let directive = after.to_lowercase();

        if directive == "add struct]" {
            return Ok(State::InEntityBlock(EntityDraft::new(EntityMode::Alter {
                prior_table: draft.prior_table,
                remap: draft.remap,
            })));
        }
        if directive == "copy cols]" && before.trim().is_empty() {
            return Ok(State::InAlterBlock(draft));
        }
        if !directive.starts_with("to]") {
            return Err(ParseError::MissingRename(line));
        }

        let old = before.trim();
        let new = after["to]".len()..].trim();
        if old.is_empty() || new.is_empty() {
            return Err(ParseError::IncompleteRename(line));
        }
        let new = self
            .config
            .naming
            .resolve(new)
            .map_err(ParseError::invalid_name("column"))?;
        draft.remap.push(ColumnRemap {
            old: old.to_string(),
            new,
        });
        Ok(State::InAlterBlock(draft))
    }

    fn entity_block(&self, mut draft: EntityDraft, line: &str) -> Result<State> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(State::InEntityBlock(draft));
        }

        if trimmed.starts_with('[') {
            let bracket = first_bracket(trimmed).ok_or_else(|| {
                ParseError::structural(format!("unterminated entity option '{trimmed}'"))
            })?;
            let value = bracket.rest.trim();
            match bracket.content.as_str() {
                "table" => {
                    draft.table = if value.is_empty() {
                        None
                    } else {
                        validate_identifier(value).map_err(ParseError::invalid_name("table"))?;
                        Some(value.to_string())
                    };
                }
                "file name" => {
                    draft.file_name = (!value.is_empty()).then(|| rust_file_name(value));
                }
                "prepared" => {
                    draft.prepared = !(value.eq_ignore_ascii_case("false")
                        || value.eq_ignore_ascii_case("f"));
                }
                other => {
                    return Err(ParseError::structural(format!(
                        "unknown entity option [{other}]"
                    )));
                }
            }
            return Ok(State::InEntityBlock(draft));
        }

        if trimmed.starts_with(|c| c == 't' || c == 'T') {
            let Some(name) = trimmed.split_whitespace().nth(1) else {
                return Err(ParseError::structural(format!(
                    "no entity name given on '{trimmed}'"
                )));
            };
            return self.open_entity(draft, name).map(State::CollectingColumns);
        }

        Err(ParseError::structural(format!(
            "expected an entity option or 'type Name', found '{trimmed}'"
        )))
    }

    fn open_entity(&self, draft: EntityDraft, name: &str) -> Result<EntityDescriptor> {
        validate_identifier(name).map_err(ParseError::invalid_name("entity"))?;
        let name = upper_first(name);
        let naming = self.config.naming;

        let table_name = match draft.table {
            Some(table) => naming.resolve(&table),
            None => naming.default_table_name(&name),
        }
        .map_err(ParseError::invalid_name("table"))?;
        let file_name = draft
            .file_name
            .unwrap_or_else(|| format!("{}.rs", name.to_lowercase()));

        debug!(entity = %name, table = %table_name, file = %file_name, "Entity opened");
        Ok(EntityDescriptor {
            name,
            table_name,
            database: self.config.database.clone(),
            schema: self.config.schema.clone(),
            file_name,
            prepared: draft.prepared,
            columns: Vec::new(),
            mode: draft.mode,
        })
    }

    fn collect_column(&mut self, mut entity: EntityDescriptor, line: &str) -> Result<State> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(State::CollectingColumns(entity));
        }
        if trimmed == "}" {
            self.close_entity(entity)?;
            return Ok(State::TopLevel);
        }

        let Some(column) = parse_column(line, self.config.naming)? else {
            trace!(entity = %entity.name, line = trimmed, "Column ignored");
            return Ok(State::CollectingColumns(entity));
        };
        if column.is_primary {
            if let Some(existing) = entity.primary_column() {
                return Err(ParseError::DuplicatePrimaryKey {
                    entity: entity.name.clone(),
                    existing: existing.source_name.clone(),
                    column: column.source_name,
                });
            }
        }
        entity.columns.push(column);
        Ok(State::CollectingColumns(entity))
    }

    fn close_entity(&mut self, entity: EntityDescriptor) -> Result<()> {
        if !entity.check_soft_delete_pair() {
            return Err(ParseError::SoftDeletePairing(entity.name));
        }
        if entity.primary_column().is_none() {
            return Err(ParseError::MissingPrimaryKey(entity.name));
        }
        debug!(
            entity = %entity.name,
            table = %entity.table_name,
            columns = entity.columns.len(),
            alter = entity.is_alter(),
            "Entity parsed"
        );
        self.entities.push(entity);
        Ok(())
    }
}

/// Appends `.rs` unless present, lower-casing an existing extension.
fn rust_file_name(value: &str) -> String {
    let ext_start = value.len().saturating_sub(3);
    match value.get(ext_start..) {
        Some(ext) if ext.eq_ignore_ascii_case(".rs") => {
            format!("{}.rs", &value[..ext_start])
        }
        _ => format!("{value}.rs"),
    }
}

/// Parses a sequence of lines.
///
/// # Errors
///
/// Returns the first problem found, tagged with its line number.
pub fn parse_lines<I, S>(lines: I) -> std::result::Result<ParsedFile, LineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = Parser::new();
    for line in lines {
        parser.feed_line(line.as_ref())?;
    }
    parser.finish()
}

/// Parses a whole definition file held in memory.
///
/// # Errors
///
/// Returns the first problem found, tagged with its line number.
pub fn parse_str(input: &str) -> std::result::Result<ParsedFile, LineError> {
    parse_lines(input.lines())
}
