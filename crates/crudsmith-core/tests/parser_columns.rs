//! Tests for entity blocks and column lines.

mod common;
use common::*;

use crudsmith_core::prelude::*;

#[test]
fn round_trip_soft_delete_entity() {
    let e = entity(
        "[add struct]
type Session struct {
    id int [primary]
    name string
    active bool [deleted]
    removedAt time [deletedon]
}
",
    );
    assert_eq!(e.primary_column().unwrap().source_name, "id");
    let (flag, stamp) = e.soft_delete_pair().unwrap();
    assert_eq!(flag.source_name, "active");
    assert_eq!(stamp.source_name, "removedAt");
    assert_eq!(stamp.storage_name, "removed_at");
    assert!(e.check_soft_delete_pair());
    assert_eq!(e.mode, EntityMode::Create);
}

#[test]
fn declaration_order_is_kept() {
    let e = entity(
        "[add struct]
type Order struct {
    zeta string
    id int64 [primary]
    alpha float64
}
",
    );
    let names: Vec<_> = e.columns.iter().map(|c| c.storage_name.as_str()).collect();
    assert_eq!(names, ["zeta", "id", "alpha"]);
}

#[test]
fn entity_name_is_capitalised() {
    let e = entity("[add struct]\ntype invoice struct {\nid int [primary]\n}\n");
    assert_eq!(e.name, "Invoice");
    assert_eq!(e.table_name, "tbl_invoice");
    assert_eq!(e.file_name, "invoice.rs");
    assert!(e.prepared);
    assert_eq!(e.database, "appdb");
    assert_eq!(e.schema, "public");
}

#[test]
fn default_table_name_lowercase_policy() {
    let file = parse_ok(&format!(
        "{LOWERCASE_HEADER}[add struct]\ntype LineItem struct {{\nitemID int [primary]\n}}\n"
    ));
    let e = &file.entities[0];
    assert_eq!(e.table_name, "tbllineitem");
    assert_eq!(e.columns[0].storage_name, "itemid");
}

#[test]
fn entity_options() {
    let e = entity(
        "[add struct]
[table] LineItems
[file name] billing.RS
[prepared] f
type LineItem struct {
    id int [primary]
}
",
    );
    assert_eq!(e.table_name, "line_items");
    assert_eq!(e.file_name, "billing.rs");
    assert!(!e.prepared);
}

#[test]
fn empty_entity_options_keep_defaults() {
    let e = entity("[add struct]\n[table]\n[file name]   \n[prepared]\ntype Tag struct {\nid int [primary]\n}\n");
    assert_eq!(e.table_name, "tbl_tag");
    assert_eq!(e.file_name, "tag.rs");
    assert!(e.prepared);
}

#[test]
fn size_bounds_text_columns() {
    let e = entity("[add struct]\ntype Tag struct {\nid int [primary]\nlabel string [size:10]\n}\n");
    assert_eq!(e.columns[1].storage_type, StorageType::Varchar(Some(10)));
    assert_eq!(e.columns[1].storage_type.to_string(), "character varying(10)");
}

#[test]
fn ignored_columns_are_dropped() {
    let e = entity(
        "[add struct]
type Tag struct {
    id int [primary]
    cache map[string]int [ignore]
    label string
}
",
    );
    assert_eq!(e.columns.len(), 2);
}

#[test]
fn metadata_is_passed_through() {
    let e = entity(
        "[add struct]\ntype Tag struct {\nid int [primary]\nlabel string `serde(rename = \"name\")` [index]\n}\n",
    );
    let label = &e.columns[1];
    assert_eq!(label.metadata.as_deref(), Some("serde(rename = \"name\")"));
    assert!(label.is_indexed);
}

#[test]
fn nullable_columns() {
    let e = entity(
        "[add struct]
type Tag struct {
    id int [primary] [nulls]
    note string [nulls]
    size int
}
",
    );
    assert!(!e.columns[0].is_nullable());
    assert!(e.columns[1].is_nullable());
    assert!(!e.columns[2].is_nullable());
}

#[test]
fn several_entities_in_one_file() {
    let all = entities(
        "[add struct]\ntype A struct {\nid int [primary]\n}\n\nbetween blocks\n\n[add struct]\ntype B struct {\nid int [primary]\n}\n",
    );
    let names: Vec<_> = all.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["A", "B"]);
}

#[test]
fn error_missing_primary_key() {
    let err = body_err("[add struct]\ntype Tag struct {\nlabel string\n}\n");
    assert_eq!(err, ParseError::MissingPrimaryKey("Tag".into()));
}

#[test]
fn error_duplicate_primary_key() {
    let err = body_err("[add struct]\ntype Tag struct {\nid int [primary]\nid2 int [primary]\n}\n");
    assert!(matches!(err, ParseError::DuplicatePrimaryKey { ref existing, ref column, .. }
        if existing == "id" && column == "id2"));
}

#[test]
fn error_non_integer_primary_key() {
    let err = body_err("[add struct]\ntype Tag struct {\nid float64 [primary]\n}\n");
    assert!(matches!(err, ParseError::InvalidPrimaryKeyType { .. }));
}

#[test]
fn error_deleted_without_deletedon() {
    let err = body_err("[add struct]\ntype Tag struct {\nid int [primary]\ngone bool [deleted]\n}\n");
    assert_eq!(err, ParseError::SoftDeletePairing("Tag".into()));
}

#[test]
fn error_deletedon_without_deleted() {
    let err = body_err("[add struct]\ntype Tag struct {\nid int [primary]\ngoneOn time.Time [deletedon]\n}\n");
    assert_eq!(err, ParseError::SoftDeletePairing("Tag".into()));
}

#[test]
fn two_deleted_flags_share_one_stamp() {
    let e = entity(
        "[add struct]
type Post struct {
    id int [primary]
    removed bool [deleted]
    hidden bool [deleted]
    removedOn time [deletedon]
}
",
    );
    assert!(e.check_soft_delete_pair());
    let (flag, stamp) = e.soft_delete_pair().unwrap();
    assert_eq!(flag.source_name, "removed");
    assert_eq!(stamp.source_name, "removedOn");

    let statements = CrudStatements::new(&e).unwrap();
    assert!(statements.select_by_id.contains("(removed = $2 OR removed = $3)"));
    assert!(!statements.select_by_id.contains("hidden ="));
}

#[test]
fn error_size_on_non_text() {
    let err = body_err("[add struct]\ntype Tag struct {\nid int [primary]\nage int [size:10]\n}\n");
    assert!(matches!(err, ParseError::UnsupportedOption { .. }));
}

#[test]
fn error_unsupported_type() {
    let err = body_err("[add struct]\ntype Tag struct {\nid int [primary]\nratio complex64\n}\n");
    assert_eq!(err, ParseError::UnsupportedType("complex64".into()));
}

#[test]
fn error_column_line_without_type() {
    let err = body_err("[add struct]\ntype Tag struct {\nid int [primary]\nlabel\n}\n");
    assert!(matches!(err, ParseError::Structural(_)));
}

#[test]
fn error_bad_column_name() {
    let err = body_err("[add struct]\ntype Tag struct {\nid int [primary]\nmy-label string\n}\n");
    assert!(matches!(err, ParseError::InvalidName { context: "column", .. }));
}

#[test]
fn error_type_line_without_name() {
    let err = body_err("[add struct]\ntype\n");
    assert!(matches!(err, ParseError::Structural(_)));
}

#[test]
fn error_unknown_entity_option() {
    let err = body_err("[add struct]\n[owner] admin\n");
    assert!(matches!(err, ParseError::Structural(_)));
}

#[test]
fn error_unclosed_block() {
    let err = parse_err(&format!("{HEADER}[add struct]\ntype Tag struct {{\nid int [primary]\n"));
    assert_eq!(err.line, 12);
    assert!(matches!(err.error, ParseError::Structural(_)));
}
