//! Tree traversal properties: sibling chains, cycles, cache behavior.

mod common;

use common::*;
use ese::ese::database::EseDatabase;
use ese::EseError;

/// People data tree split over two sibling leaves under a branch root.
/// With `cycle` set, the leaves' next links form 10 -> 11 -> 10.
fn two_leaf_image(cycle: bool) -> ImageBuilder {
    let page_size = 4096u32;
    let (leaf_one, leaf_two) = (10u32, 11u32);
    let data_root = 9u32;

    let record_a = RecordWriter::new()
        .fixed(&1i32.to_le_bytes())
        .fixed(&[30u8])
        .variable(Some(b"A\x00"))
        .finish(2, 128);
    let record_b = RecordWriter::new()
        .fixed(&2i32.to_le_bytes())
        .fixed(&[40u8])
        .variable(Some(b"B\x00"))
        .finish(2, 128);

    let root = PageWriter::new(page_size, branch_root_flags())
        .root_header()
        .branch_cell(&[0x7f, 0x01], leaf_one)
        .branch_cell(&[0x7f, 0x02], leaf_two)
        .finish();
    let page_one = PageWriter::new(page_size, leaf_flags())
        .prev_next(0, leaf_two)
        .empty_prefix()
        .keyed_cell(&[0x7f, 0x01], &record_a)
        .finish();
    let page_two = PageWriter::new(page_size, leaf_flags())
        .prev_next(leaf_one, if cycle { leaf_one } else { 0 })
        .empty_prefix()
        .keyed_cell(&[0x7f, 0x02], &record_b)
        .finish();

    // Catalog pointing People's data root at the branch page.
    let rows: Vec<Vec<u8>> = vec![
        catalog_row(PEOPLE_TABLE_ID, 1, PEOPLE_TABLE_ID, data_root, 0, 0, "People"),
        catalog_row(PEOPLE_TABLE_ID, 2, 1, 4, 4, 0, "id"),
        catalog_row(PEOPLE_TABLE_ID, 2, 2, 2, 1, 0, "age"),
        catalog_row(PEOPLE_TABLE_ID, 2, 128, 10, 0, 1200, "name"),
    ];
    let mut catalog = PageWriter::new(page_size, root_leaf_flags()).root_header();
    for (index, row) in rows.into_iter().enumerate() {
        catalog = catalog.keyed_cell(&[0x7f, index as u8 + 1], &row);
    }

    ImageBuilder::new(page_size)
        .page(4, catalog.finish())
        .page(data_root, root)
        .page(leaf_one, page_one)
        .page(leaf_two, page_two)
}

#[test]
fn full_scan_crosses_sibling_leaves() {
    let file = two_leaf_image(false).into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();
    let people = db.table_by_name("People").unwrap().unwrap();

    let ids: Vec<i32> = people
        .records()
        .unwrap()
        .map(|record| {
            record
                .unwrap()
                .value(1)
                .unwrap()
                .as_single()
                .unwrap()
                .as_i32()
                .unwrap()
        })
        .collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(people.record_count().unwrap(), 2);
}

#[test]
fn sibling_cycle_aborts_after_one_pass() {
    let file = two_leaf_image(true).into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();
    let people = db.table_by_name("People").unwrap().unwrap();

    let mut ids = Vec::new();
    let mut error = None;
    for record in people.records().unwrap() {
        match record {
            Ok(record) => ids.push(
                record.value(1).unwrap().as_single().unwrap().as_i32().unwrap(),
            ),
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }
    // Both pages emitted exactly once before the abort
    assert_eq!(ids, vec![1, 2]);
    assert!(matches!(error, Some(EseError::TreeCycle { page: 10 })));
}

#[test]
fn cursor_error_leaves_other_cursors_usable() {
    let file = two_leaf_image(true).into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();
    let people = db.table_by_name("People").unwrap().unwrap();

    // First cursor hits the cycle
    let result: Result<Vec<_>, _> = people.records().unwrap().collect();
    assert!(result.is_err());

    // A fresh cursor on the same handle still reads records
    let first = people.records().unwrap().next().unwrap().unwrap();
    assert_eq!(first.value(2).unwrap().as_single().unwrap().as_u8(), Some(30));
}

#[test]
fn page_reads_are_idempotent_through_the_cache() {
    let file = standard_image(4096).into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();

    let first = db.read_page(4).unwrap();
    let second = db.read_page(4).unwrap();
    assert_eq!(first.raw(), second.raw());

    // And identical to an uncached raw read
    let raw = db.read_page_raw(4).unwrap();
    assert_eq!(first.raw(), &raw[..]);
}

#[test]
fn out_of_range_page_is_io_not_zeroes() {
    let file = standard_image(4096).into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();
    let beyond = db.page_count() + 1;
    assert!(matches!(db.read_page(beyond), Err(EseError::Io(_))));
}

#[test]
fn reopening_yields_identical_record_streams() {
    let file = two_leaf_image(false).into_temp_file();

    let collect = || -> Vec<(u32, Vec<u8>, u32, Vec<u8>)> {
        let db = EseDatabase::open(file.path()).unwrap();
        let people = db.table_by_name("People").unwrap().unwrap();
        let columns: Vec<u32> = people.columns().map(|column| column.id).collect();
        let mut out = Vec::new();
        for record in people.records().unwrap() {
            let record = record.unwrap();
            for &column in &columns {
                let value = record.value(column).unwrap();
                let bytes = value
                    .as_single()
                    .map(|raw| raw.bytes.clone())
                    .unwrap_or_default();
                out.push((people.id(), record.key().to_vec(), column, bytes));
            }
        }
        out
    };

    assert_eq!(collect(), collect());
}

#[test]
fn empty_table_scans_cleanly() {
    let page_size = 4096u32;
    let file = ImageBuilder::new(page_size)
        .page(4, standard_catalog_page(page_size))
        .page(
            PEOPLE_DATA_ROOT,
            PageWriter::new(page_size, root_leaf_flags() | ese::ese::page::PageFlags::EMPTY)
                .root_header()
                .finish(),
        )
        .into_temp_file();
    let db = EseDatabase::open(file.path()).unwrap();
    let people = db.table_by_name("People").unwrap().unwrap();
    assert_eq!(people.record_count().unwrap(), 0);
}
