//! Tests for `[alter table]` blocks.

mod common;
use common::*;

use crudsmith_core::prelude::*;

const ALTER_USER: &str = "\
[alter table] tbl_user
LoginID   [to]   loginID
Name [TO] userName
[copy cols]

[add struct]
type User struct {
    loginID int [primary]
    userName string [index]
}
";

#[test]
fn remap_is_collected_in_order() {
    let e = entity(ALTER_USER);
    let EntityMode::Alter { prior_table, remap } = &e.mode else {
        panic!("expected alter mode, got {:?}", e.mode);
    };
    assert_eq!(prior_table, "tbl_user");
    assert_eq!(
        remap,
        &[
            ColumnRemap { old: "LoginID".into(), new: "login_id".into() },
            ColumnRemap { old: "Name".into(), new: "user_name".into() },
        ]
    );
}

#[test]
fn old_primary_column_follows_remap() {
    let e = entity(ALTER_USER);
    assert_eq!(e.old_primary_column(), Some("LoginID"));
}

#[test]
fn remap_without_primary_mapping() {
    let e = entity(
        "[alter table] legacy_users\nName [to] userName\n[add struct]\ntype User struct {\nloginID int [primary]\nuserName string\n}\n",
    );
    assert!(e.is_alter());
    assert_eq!(e.old_primary_column(), None);
}

#[test]
fn copy_cols_only() {
    let e = entity("[alter table] tbl_tag\n[copy cols]\n[add struct]\ntype Tag struct {\nid int [primary]\n}\n");
    assert_eq!(
        e.mode,
        EntityMode::Alter {
            prior_table: "tbl_tag".into(),
            remap: Vec::new()
        }
    );
}

#[test]
fn lowercase_policy_resolves_new_names() {
    let file = parse_ok(&format!(
        "{LOWERCASE_HEADER}[alter table] tbluser\nLoginID [to] loginID\n[add struct]\ntype User struct {{\nloginID int [primary]\n}}\n"
    ));
    let EntityMode::Alter { remap, .. } = &file.entities[0].mode else {
        panic!("expected alter mode");
    };
    assert_eq!(remap[0].new, "loginid");
    assert_eq!(file.entities[0].old_primary_column(), Some("LoginID"));
}

#[test]
fn error_missing_prior_table() {
    assert_eq!(
        body_err("[alter table]   \n"),
        ParseError::MissingValue("[alter table]".into())
    );
}

#[test]
fn error_invalid_prior_table() {
    assert!(matches!(
        body_err("[alter table] old-users\n"),
        ParseError::InvalidName { context: "prior table", .. }
    ));
}

#[test]
fn error_line_without_bracket() {
    assert!(matches!(
        body_err("[alter table] tbl_user\nLoginID loginID\n"),
        ParseError::Structural(_)
    ));
}

#[test]
fn error_missing_to() {
    assert_eq!(
        body_err("[alter table] tbl_user\nLoginID [into] loginID\n"),
        ParseError::MissingRename("LoginID [into] loginID".into())
    );
}

#[test]
fn error_rename_without_new_column() {
    assert!(matches!(
        body_err("[alter table] tbl_user\nLoginID [to]\n"),
        ParseError::IncompleteRename(_)
    ));
}

#[test]
fn error_rename_without_old_column() {
    assert!(matches!(
        body_err("[alter table] tbl_user\n[to] loginID\n"),
        ParseError::IncompleteRename(_)
    ));
}

#[test]
fn error_input_ends_in_alter_block() {
    assert!(matches!(
        body_err("[alter table] tbl_user\nLoginID [to] loginID\n"),
        ParseError::Structural(_)
    ));
}
