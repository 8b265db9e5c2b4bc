//! Rust code renderer.
//!
//! Emits one `sqlx` data access section per entity: SQL constants, the
//! record type, constructors, JSON helpers, CRUD methods, and in prepared
//! mode a data layer holding prepared statements on a dedicated
//! connection.

use tracing::debug;

use super::statements::CrudStatements;
use super::CodeRenderer;
use crate::error::{ParseError, Result};
use crate::names::to_snake_case;
use crate::schema::{ColumnDescriptor, EntityDescriptor, StorageType};

/// Renders entities as Rust modules using `sqlx`, `serde` and `serde_json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RustRenderer {
    package: String,
}

impl RustRenderer {
    /// Creates a renderer for the given package name.
    #[must_use]
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
        }
    }

    fn header(&self) -> String {
        format!(
            "//! Data access for the `{}` package.\n\
             //!\n\
             //! Generated by crudsmith. Edits are lost on regeneration.\n\
             \n\
             #![allow(dead_code)]\n\
             \n\
             #[allow(unused_imports)]\n\
             use sqlx::{{Connection as _, Executor as _, Statement as _}};\n",
            self.package
        )
    }
}

impl CodeRenderer for RustRenderer {
    fn render(&self, entity: &EntityDescriptor, first_in_unit: bool) -> Result<String> {
        let stmts = CrudStatements::new(entity)?;
        let pk = entity
            .primary_column()
            .ok_or_else(|| ParseError::MissingPrimaryKey(entity.name.clone()))?;
        let names = EntityNames::new(entity);
        let access = if entity.prepared {
            Access::Layer
        } else {
            Access::Pool
        };
        let ctx = Context {
            entity,
            pk,
            names: &names,
            stmts: &stmts,
            access,
        };

        let mut out = String::new();
        if first_in_unit {
            out.push_str(&self.header());
        }
        out.push_str(&ctx.constants());
        if entity.soft_delete_pair().is_some() {
            out.push_str(&ctx.filter_enum());
        }
        out.push_str(&ctx.record_type());
        if entity.prepared {
            out.push_str(&ctx.data_layer());
        }
        out.push_str(&ctx.free_functions());
        out.push_str(&ctx.methods());

        debug!(
            entity = %entity.name,
            prepared = entity.prepared,
            bytes = out.len(),
            "Rendered entity"
        );
        Ok(out)
    }
}

/// Names derived from the entity name.
struct EntityNames {
    ty: String,
    snake: String,
    plural: String,
    konst: String,
    filter: String,
    layer: String,
}

impl EntityNames {
    fn new(entity: &EntityDescriptor) -> Self {
        let snake = snake(&entity.name, &entity.table_name);
        Self {
            ty: entity.name.clone(),
            plural: format!("{snake}s"),
            konst: snake.to_uppercase(),
            filter: format!("{}Filter", entity.name),
            layer: format!("{}DataLayer", entity.name),
            snake,
        }
    }
}

/// How generated functions reach the database.
#[derive(Clone, Copy)]
enum Access {
    /// Ad hoc statements on a pool.
    Pool,
    /// Prepared statements held by the data layer.
    Layer,
}

struct Context<'a> {
    entity: &'a EntityDescriptor,
    pk: &'a ColumnDescriptor,
    names: &'a EntityNames,
    stmts: &'a CrudStatements,
    access: Access,
}

impl Context<'_> {
    fn param(&self, used: bool) -> String {
        let unused = if used { "" } else { "_" };
        match self.access {
            Access::Pool => format!("{unused}pool: &sqlx::PgPool"),
            Access::Layer => format!("{unused}layer: &mut {}", self.names.layer),
        }
    }

    const fn executor(&self) -> &'static str {
        match self.access {
            Access::Pool => "pool",
            Access::Layer => "&mut layer.conn",
        }
    }

    fn query(&self, konst: &str, field: &str) -> String {
        match self.access {
            Access::Pool => format!("sqlx::query({konst})"),
            Access::Layer => format!("layer.{field}.query()"),
        }
    }

    fn query_as(&self, konst: &str, field: &str) -> String {
        match self.access {
            Access::Pool => format!("sqlx::query_as::<_, {}>({konst})", self.names.ty),
            Access::Layer => format!("layer.{field}.query_as::<{}>()", self.names.ty),
        }
    }

    fn query_scalar(&self, konst: &str, field: &str, ty: &str) -> String {
        match self.access {
            Access::Pool => format!("sqlx::query_scalar::<_, {ty}>({konst})"),
            Access::Layer => format!("layer.{field}.query_scalar::<{ty}>()"),
        }
    }

    fn konst(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.names.konst)
    }

    fn has_filter(&self) -> bool {
        self.entity.soft_delete_pair().is_some()
    }

    fn filter_param(&self) -> String {
        if self.has_filter() {
            format!(", filter: {}", self.names.filter)
        } else {
            String::new()
        }
    }

    fn filter_prelude(&self, indent: &str) -> String {
        if self.has_filter() {
            format!("{indent}let (lower, upper) = filter.bounds();\n")
        } else {
            String::new()
        }
    }

    fn filter_binds(&self) -> Vec<String> {
        if self.has_filter() {
            vec!["lower".into(), "upper".into()]
        } else {
            Vec::new()
        }
    }

    fn constants(&self) -> String {
        let s = self.stmts;
        let mut consts = vec![
            (self.konst("SELECT_BY_ID"), &s.select_by_id),
            (self.konst("INSERT"), &s.insert),
        ];
        if let Some(update) = &s.update {
            consts.push((self.konst("UPDATE"), update));
        }
        if let Some(mark) = &s.mark_deleted {
            consts.push((self.konst("MARK_DELETED"), mark));
        }
        consts.push((self.konst("DELETE"), &s.delete));
        for stmt in &s.select_by_index {
            let field = self.column_by_storage(&stmt.column);
            consts.push((self.konst(&format!("GET_BY_{}", field.to_uppercase())), &stmt.sql));
        }
        for stmt in &s.patch {
            let field = self.column_by_storage(&stmt.column);
            consts.push((self.konst(&format!("PATCH_{}", field.to_uppercase())), &stmt.sql));
        }

        let mut out = String::from("\n");
        for (name, sql) in consts {
            out.push_str(&format!("const {name}: &str = {sql:?};\n"));
        }
        out
    }

    fn column_by_storage(&self, storage: &str) -> String {
        self.entity
            .columns
            .iter()
            .find(|c| c.storage_name == storage)
            .map_or_else(|| storage.to_string(), field_name)
    }

    fn filter_enum(&self) -> String {
        let filter = &self.names.filter;
        format!(
            "\n/// Which `{ty}` rows a lookup returns, by soft-delete flag.\n\
             #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]\n\
             pub enum {filter} {{\n\
             \x20   /// Rows not marked deleted.\n\
             \x20   #[default]\n\
             \x20   Exists,\n\
             \x20   /// Rows marked deleted.\n\
             \x20   Deleted,\n\
             \x20   /// Every row.\n\
             \x20   All,\n\
             }}\n\
             \n\
             impl {filter} {{\n\
             \x20   const fn bounds(self) -> (bool, bool) {{\n\
             \x20       match self {{\n\
             \x20           Self::Exists => (false, false),\n\
             \x20           Self::Deleted => (true, true),\n\
             \x20           Self::All => (false, true),\n\
             \x20       }}\n\
             \x20   }}\n\
             }}\n",
            ty = self.names.ty
        )
    }

    fn record_type(&self) -> String {
        let mut out = format!(
            "\n/// Row of `{}`.\n\
             #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]\n\
             pub struct {} {{\n",
            self.entity.qualified_table_name(),
            self.names.ty
        );
        for col in &self.entity.columns {
            if let Some(meta) = &col.metadata {
                out.push_str(&format!("    #[{}]\n", meta.trim()));
            }
            if field_name(col) != col.storage_name {
                out.push_str(&format!("    #[sqlx(rename = \"{}\")]\n", col.storage_name));
            }
            out.push_str(&format!(
                "    pub {}: {},\n",
                field_ident(col),
                col.rust_type()
            ));
        }
        out.push_str("}\n");
        out
    }

    fn data_layer(&self) -> String {
        let mut fields = vec![
            ("select_by_id".to_string(), self.konst("SELECT_BY_ID")),
            ("insert".to_string(), self.konst("INSERT")),
        ];
        if self.stmts.update.is_some() {
            fields.push(("update".into(), self.konst("UPDATE")));
        }
        if self.stmts.mark_deleted.is_some() {
            fields.push(("mark_deleted".into(), self.konst("MARK_DELETED")));
        }
        fields.push(("delete".into(), self.konst("DELETE")));
        for col in self.entity.indexed_columns() {
            let field = field_name(col);
            fields.push((
                format!("get_by_{field}"),
                self.konst(&format!("GET_BY_{}", field.to_uppercase())),
            ));
        }
        for col in self.entity.patchable_columns() {
            let field = field_name(col);
            fields.push((
                format!("patch_{field}"),
                self.konst(&format!("PATCH_{}", field.to_uppercase())),
            ));
        }

        let layer = &self.names.layer;
        let snake = &self.names.snake;
        let mut out = format!(
            "\n/// Prepared `{ty}` statements on one dedicated connection.\n\
             pub struct {layer} {{\n\
             \x20   conn: sqlx::postgres::PgConnection,\n",
            ty = self.names.ty
        );
        for (field, _) in &fields {
            out.push_str(&format!(
                "    {field}: sqlx::postgres::PgStatement<'static>,\n"
            ));
        }
        out.push_str("}\n");

        out.push_str(&format!(
            "\n/// Takes a connection from `pool` and prepares every `{ty}` statement on it.\n\
             pub async fn init_{snake}_data_layer(pool: &sqlx::PgPool) -> Result<{layer}, sqlx::Error> {{\n\
             \x20   let mut conn = pool.acquire().await?.detach();\n",
            ty = self.names.ty
        ));
        for (field, konst) in &fields {
            out.push_str(&format!("    let {field} = conn.prepare({konst}).await?;\n"));
        }
        out.push_str(&format!("    Ok({layer} {{\n        conn,\n"));
        for (field, _) in &fields {
            out.push_str(&format!("        {field},\n"));
        }
        out.push_str("    })\n}\n");

        out.push_str(&format!(
            "\n/// Closes the connection held by the data layer.\n\
             pub async fn close_{snake}_data_layer(layer: {layer}) -> Result<(), sqlx::Error> {{\n\
             \x20   layer.conn.close().await\n\
             }}\n"
        ));
        out
    }

    fn free_functions(&self) -> String {
        let ty = &self.names.ty;
        let snake = &self.names.snake;
        let plural = &self.names.plural;
        let key = field_ident(self.pk);
        let key_ty = self.pk.rust_type();

        let mut binds = vec![key.clone()];
        binds.extend(self.filter_binds());
        let mut out = format!(
            "\n/// Loads the `{ty}` with the given key.\n\
             pub async fn new_{snake}({}, {key}: {key_ty}{}) -> Result<{ty}, sqlx::Error> {{\n\
             {}\
             \x20   {}\n\
             }}\n",
            self.param(true),
            self.filter_param(),
            self.filter_prelude("    "),
            chain(
                &self.query_as(&self.konst("SELECT_BY_ID"), "select_by_id"),
                &binds,
                "fetch_one",
                self.executor(),
                "        ",
            ),
        );

        out.push_str(&format!(
            "\n/// Decodes a `{ty}` from JSON.\n\
             pub fn {snake}_from_json(json: &[u8]) -> Result<{ty}, serde_json::Error> {{\n\
             \x20   serde_json::from_slice(json)\n\
             }}\n\
             \n\
             /// Encodes a list of `{ty}` values as JSON.\n\
             pub fn {plural}_to_json({plural}: &[{ty}]) -> Result<Vec<u8>, serde_json::Error> {{\n\
             \x20   serde_json::to_vec({plural})\n\
             }}\n"
        ));

        for col in self.entity.indexed_columns() {
            let field = field_name(col);
            let ident = field_ident(col);
            let (param_ty, _) = param_type(col);
            let mut binds = vec![format!("&{ident}")];
            binds.extend(self.filter_binds());
            out.push_str(&format!(
                "\n/// Loads every `{ty}` whose `{}` matches, ordered by key.\n\
                 pub async fn get_{plural}_by_{field}({}, {ident}: {param_ty}{}) -> Result<Vec<{ty}>, sqlx::Error> {{\n\
                 {}\
                 \x20   {}\n\
                 }}\n",
                col.storage_name,
                self.param(true),
                self.filter_param(),
                self.filter_prelude("    "),
                chain(
                    &self.query_as(
                        &self.konst(&format!("GET_BY_{}", field.to_uppercase())),
                        &format!("get_by_{field}"),
                    ),
                    &binds,
                    "fetch_all",
                    self.executor(),
                    "        ",
                ),
            ));
        }
        out
    }

    fn methods(&self) -> String {
        let ty = &self.names.ty;
        let key = field_ident(self.pk);
        let key_ty = self.pk.rust_type();
        let exec = self.executor();
        let self_key = format!("&self.{key}");
        let data: Vec<&ColumnDescriptor> =
            self.entity.columns.iter().filter(|c| !c.is_primary).collect();

        let mut out = format!(
            "\nimpl {ty} {{\n\
             \x20   /// Encodes this value as JSON.\n\
             \x20   pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {{\n\
             \x20       serde_json::to_vec(self)\n\
             \x20   }}\n"
        );

        // fetch_by_id
        let mut binds = vec![key.clone()];
        binds.extend(self.filter_binds());
        out.push_str(&format!(
            "\n    /// Reloads this value from the row with the given key.\n\
             \x20   pub async fn fetch_by_id(&mut self, {}, {key}: {key_ty}{}) -> Result<(), sqlx::Error> {{\n\
             {}\
             \x20       *self = {}?;\n\
             \x20       Ok(())\n\
             \x20   }}\n",
            self.param(true),
            self.filter_param(),
            self.filter_prelude("        "),
            chain(
                &self.query_as(&self.konst("SELECT_BY_ID"), "select_by_id"),
                &binds,
                "fetch_one",
                exec,
                "            ",
            ),
        ));

        // insert
        let binds: Vec<String> = data
            .iter()
            .map(|c| format!("&self.{}", field_ident(c)))
            .collect();
        out.push_str(&format!(
            "\n    /// Inserts this value and stores the generated key.\n\
             \x20   pub async fn insert(&mut self, {}) -> Result<(), sqlx::Error> {{\n\
             \x20       self.{key} = {}?;\n\
             \x20       Ok(())\n\
             \x20   }}\n",
            self.param(true),
            chain(
                &self.query_scalar(&self.konst("INSERT"), "insert", &key_ty),
                &binds,
                "fetch_one",
                exec,
                "            ",
            ),
        ));

        // update
        if self.stmts.update.is_some() {
            let mut binds = binds.clone();
            binds.push(self_key.clone());
            out.push_str(&self.execute_method(
                "Writes every non-key field back to the row.",
                "update(&self",
                "",
                &self.query(&self.konst("UPDATE"), "update"),
                &binds,
                "",
            ));
        } else {
            out.push_str(&format!(
                "\n    /// The key is the only column, so there is nothing to write.\n\
                 \x20   pub async fn update(&self, {}) -> Result<u64, sqlx::Error> {{\n\
                 \x20       Ok(0)\n\
                 \x20   }}\n",
                self.param(false)
            ));
        }

        // mark_deleted
        if let Some((flag, stamp)) = self.entity.soft_delete_pair() {
            let flag_ident = field_ident(flag);
            let stamp_ident = field_ident(stamp);
            out.push_str(&self.execute_method(
                "Sets the soft-delete flag and timestamp.",
                "mark_deleted(&mut self",
                &format!(
                    ", {flag_ident}: {}, {stamp_ident}: {}",
                    flag.rust_type(),
                    stamp.rust_type()
                ),
                &self.query(&self.konst("MARK_DELETED"), "mark_deleted"),
                &[flag_ident.clone(), stamp_ident.clone(), self_key.clone()],
                &format!(
                    "        self.{flag_ident} = {flag_ident};\n        self.{stamp_ident} = {stamp_ident};\n"
                ),
            ));
        }

        // delete
        out.push_str(&self.execute_method(
            "Deletes the row with this value's key.",
            "delete(&self",
            "",
            &self.query(&self.konst("DELETE"), "delete"),
            &[self_key.clone()],
            "",
        ));

        // patches
        for col in self.entity.patchable_columns() {
            let field = field_name(col);
            let ident = field_ident(col);
            let (param_ty, borrowed) = param_type(col);
            let assign = if borrowed {
                format!("        self.{ident} = {ident}.to_owned();\n")
            } else {
                format!("        self.{ident} = {ident};\n")
            };
            out.push_str(&self.execute_method(
                &format!("Updates only `{}`.", col.storage_name),
                &format!("patch_{field}(&mut self"),
                &format!(", {ident}: {param_ty}"),
                &self.query(
                    &self.konst(&format!("PATCH_{}", field.to_uppercase())),
                    &format!("patch_{field}"),
                ),
                &[format!("&{ident}"), self_key.clone()],
                &assign,
            ));
        }

        out.push_str("}\n");
        out
    }

    /// A method that executes one statement and returns the affected row
    /// count, assigning fields afterwards.
    fn execute_method(
        &self,
        doc: &str,
        signature_head: &str,
        extra_params: &str,
        head: &str,
        binds: &[String],
        assign: &str,
    ) -> String {
        format!(
            "\n    /// {doc}\n\
             \x20   pub async fn {signature_head}, {}{extra_params}) -> Result<u64, sqlx::Error> {{\n\
             \x20       let done = {}?;\n\
             {assign}\
             \x20       Ok(done.rows_affected())\n\
             \x20   }}\n",
            self.param(true),
            chain(head, binds, "execute", self.executor(), "            "),
        )
    }
}

/// A query builder chain: binds, then the terminal call.
fn chain(head: &str, binds: &[String], finish: &str, executor: &str, indent: &str) -> String {
    let mut out = head.to_string();
    for bind in binds {
        out.push_str(&format!("\n{indent}.bind({bind})"));
    }
    out.push_str(&format!("\n{indent}.{finish}({executor})\n{indent}.await"));
    out
}

/// Parameter type for a column value, and whether it is borrowed.
fn param_type(col: &ColumnDescriptor) -> (String, bool) {
    if col.is_nullable() {
        return (col.rust_type(), false);
    }
    match col.storage_type {
        StorageType::Varchar(_) => ("&str".into(), true),
        StorageType::Bytea => ("&[u8]".into(), true),
        _ => (col.rust_type(), false),
    }
}

fn snake(name: &str, fallback: &str) -> String {
    to_snake_case(name).unwrap_or_else(|_| fallback.to_lowercase())
}

/// Field name of a column in the record type, without raw-identifier
/// escaping.
fn field_name(col: &ColumnDescriptor) -> String {
    snake(&col.source_name, &col.storage_name)
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use",
    "where", "while", "abstract", "become", "box", "do", "final", "gen", "macro", "override",
    "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Field name as a Rust identifier.
fn field_ident(col: &ColumnDescriptor) -> String {
    let name = field_name(col);
    match name.as_str() {
        "self" | "super" | "crate" => format!("{name}_"),
        _ if KEYWORDS.contains(&name.as_str()) => format!("r#{name}"),
        _ => name,
    }
}
