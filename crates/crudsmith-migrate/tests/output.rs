//! Output unit tests.

mod common;
use common::*;

use crudsmith_core::prelude::*;
use crudsmith_migrate::prelude::*;

const BILLING: &str = "
[add struct]
[file name] billing
type Invoice struct {
    id int64 [primary]
    total float64
}

[add struct]
type Customer struct {
    id int [primary]
    name string [index]
}

[add struct]
[file name] billing.rs
type Payment struct {
    id int64 [primary]
    invoiceID int64 [index]
}
";

#[test]
fn test_units_grouped_by_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let entities = parse_entities(BILLING);
    let units = write_units(&RustRenderer::new("models"), &entities, dir.path()).unwrap();

    assert_eq!(units.len(), 2);
    assert_eq!(units[0].name, "billing.rs");
    assert_eq!(units[0].path, dir.path().join("billing.rs"));
    assert_eq!(units[0].entities, ["Invoice", "Payment"]);
    assert_eq!(units[1].path, dir.path().join("customer.rs"));
    assert_eq!(units[1].entities, ["Customer"]);

    let billing = std::fs::read_to_string(dir.path().join("billing.rs")).unwrap();
    assert_eq!(billing.matches("//! Data access for the `models` package.").count(), 1);
    assert!(billing.starts_with("//! Data access"));
    let invoice = billing.find("pub struct Invoice {").unwrap();
    let payment = billing.find("pub struct Payment {").unwrap();
    assert!(invoice < payment);

    let customer = std::fs::read_to_string(dir.path().join("customer.rs")).unwrap();
    assert!(customer.contains("pub async fn get_customers_by_name("));
}

#[test]
fn test_existing_file_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("customer.rs"), "// hand written\n").unwrap();
    std::fs::write(dir.path().join("customer_gen_1.rs"), "// older output\n").unwrap();

    let entities = parse_entities(BILLING);
    let units = write_units(&RustRenderer::new("models"), &entities, dir.path()).unwrap();

    assert_eq!(units[1].name, "customer.rs");
    assert_eq!(units[1].path, dir.path().join("customer_gen_2.rs"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("customer.rs")).unwrap(),
        "// hand written\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("customer_gen_1.rs")).unwrap(),
        "// older output\n"
    );
    let generated = std::fs::read_to_string(&units[1].path).unwrap();
    assert!(generated.contains("pub struct Customer {"));
}

#[test]
fn test_write_entity_returns_unit_path() {
    let dir = tempfile::tempdir().unwrap();
    let entities = parse_entities(BILLING);
    let renderer = RustRenderer::new("models");

    let mut units = OutputUnits::new(dir.path().join("generated"));
    let first = units.write_entity(&renderer, &entities[0]).unwrap().to_path_buf();
    let third = units.write_entity(&renderer, &entities[2]).unwrap().to_path_buf();
    assert_eq!(first, third);
    assert_eq!(first, dir.path().join("generated").join("billing.rs"));

    let written = units.finish().unwrap();
    assert_eq!(written.len(), 1);
    assert!(first.exists());
}

#[test]
fn test_failed_render_removes_partial_units() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("customer.rs"), "// hand written\n").unwrap();
    let mut entities = parse_entities(BILLING);
    for column in &mut entities[2].columns {
        column.is_primary = false;
    }

    let err = write_units(&RustRenderer::new("models"), &entities, dir.path()).unwrap_err();
    assert!(matches!(
        err,
        MigrateError::Invalid(ParseError::MissingPrimaryKey(ref name)) if name == "Payment"
    ));

    let left: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(left, ["customer.rs"]);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("customer.rs")).unwrap(),
        "// hand written\n"
    );
}

#[test]
fn test_abandon_deletes_open_units() {
    let dir = tempfile::tempdir().unwrap();
    let entities = parse_entities(BILLING);
    let renderer = RustRenderer::new("models");

    let mut units = OutputUnits::new(dir.path());
    let billing = units.write_entity(&renderer, &entities[0]).unwrap().to_path_buf();
    let customer = units.write_entity(&renderer, &entities[1]).unwrap().to_path_buf();
    assert!(billing.exists() && customer.exists());

    units.abandon();
    assert!(!billing.exists());
    assert!(!customer.exists());
}
