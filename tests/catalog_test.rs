//! Catalog enumeration and schema resolution against fixture images.

mod common;

use common::*;
use ese::ese::catalog::{ColumnClass, ColumnType};
use ese::ese::database::EseDatabase;
use ese::EseError;

#[test]
fn catalog_enumerates_both_tables() {
    let file = standard_image(4096).into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();

    let tables = db.tables().unwrap();
    let names: Vec<&str> = tables.iter().map(|table| table.name()).collect();
    assert_eq!(names, vec!["MSysObjects", "People"]);

    let people = db.table_by_name("People").unwrap().expect("People exists");
    assert_eq!(people.id(), PEOPLE_TABLE_ID);
    assert_eq!(db.table_count().unwrap(), 2);
}

#[test]
fn table_lookup_is_case_insensitive() {
    let file = standard_image(4096).into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();
    assert!(db.table_by_name("people").unwrap().is_some());
    assert!(db.table_by_name("PEOPLE").unwrap().is_some());
    assert!(db.table_by_name("nonexistent").unwrap().is_none());
}

#[test]
fn people_schema_resolves_completely() {
    let file = standard_image(4096).into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();
    let people = db.table_by_name("People").unwrap().unwrap();
    let schema = people.schema();

    assert_eq!(schema.data_root, PEOPLE_DATA_ROOT);
    assert_eq!(schema.long_value_root, PEOPLE_LV_ROOT);
    assert_eq!(people.column_count(), 4);

    let id = schema.column(1).unwrap();
    assert_eq!(id.name, "id");
    assert_eq!(id.column_type, ColumnType::SignedInt32);
    assert_eq!(id.class(), ColumnClass::Fixed);
    assert_eq!(id.fixed_size, 4);

    let name = schema.column_by_name("name").unwrap();
    assert_eq!(name.id, 128);
    assert_eq!(name.codepage, 1200);
    assert_eq!(name.class(), ColumnClass::Variable);

    let notes = schema.column(256).unwrap();
    assert_eq!(notes.column_type, ColumnType::LargeText);
    assert_eq!(notes.class(), ColumnClass::Tagged);

    let indexes: Vec<&str> = schema.indexes.iter().map(|index| index.name.as_str()).collect();
    assert_eq!(indexes, vec!["ByName"]);
    assert_eq!(schema.indexes[0].root_page, PEOPLE_INDEX_ROOT);
}

#[test]
fn missing_catalog_root_reports_catalog_missing() {
    // Image with pages but nothing valid at page 4.
    let file = ImageBuilder::new(4096)
        .page(
            6,
            PageWriter::new(4096, root_leaf_flags()).root_header().finish(),
        )
        .into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();
    // Page 4 is an empty filler page without the catalog's structure;
    // resolution must fail rather than invent tables.
    match db.tables() {
        Ok(tables) => assert!(tables.is_empty()),
        Err(EseError::CatalogMissing(_)) => {}
        Err(other) => panic!("unexpected error: {}", other),
    }
}

#[test]
fn schema_is_cached_across_calls() {
    let file = standard_image(4096).into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();
    let first = db.tables().unwrap();
    let second = db.tables().unwrap();
    assert_eq!(first.len(), second.len());
    // Same Arc'd schema underneath
    assert!(std::ptr::eq(
        first[1].schema() as *const _,
        second[1].schema() as *const _
    ));
}
