#![cfg(feature = "cli")]
//! Smoke tests for the `ese` CLI subcommand entry points.

mod common;

use common::*;
use ese::cli;

fn run<F>(execute: F) -> String
where
    F: FnOnce(&mut dyn std::io::Write) -> Result<(), ese::EseError>,
{
    let mut output = Vec::new();
    execute(&mut output).expect("subcommand succeeds");
    String::from_utf8(output).expect("utf8 output")
}

#[test]
fn parse_reports_header_and_page_summary() {
    let file = standard_image(4096).into_temp_file();
    let output = run(|writer| {
        cli::parse::execute(
            &cli::parse::ParseOptions {
                file: file.path().display().to_string(),
                verbose: false,
                json: false,
            },
            writer,
        )
    });
    assert!(output.contains("page size:       4096"));
    assert!(output.contains("format revision: 0xc"));
    assert!(output.contains("root pages:"));
}

#[test]
fn parse_json_is_machine_readable() {
    let file = standard_image(4096).into_temp_file();
    let output = run(|writer| {
        cli::parse::execute(
            &cli::parse::ParseOptions {
                file: file.path().display().to_string(),
                verbose: false,
                json: true,
            },
            writer,
        )
    });
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["page_size"], 4096);
    assert_eq!(value["used_shadow_header"], false);
}

#[test]
fn tables_lists_the_catalog() {
    let file = standard_image(4096).into_temp_file();
    let output = run(|writer| {
        cli::tables::execute(
            &cli::tables::TablesOptions {
                file: file.path().display().to_string(),
                verbose: true,
                json: false,
            },
            writer,
        )
    });
    assert!(output.contains("People"));
    assert!(output.contains("MSysObjects"));
    assert!(output.contains("name"));
    assert!(output.contains("ByName"));
}

#[test]
fn records_displays_decoded_values() {
    let file = standard_image(4096).into_temp_file();
    let output = run(|writer| {
        cli::records::execute(
            &cli::records::RecordsOptions {
                file: file.path().display().to_string(),
                table: "People".to_string(),
                limit: None,
                json: false,
            },
            writer,
        )
    });
    assert!(output.contains("Bob"));
    assert!(output.contains("42"));
    assert!(output.contains("1 record(s)"));
}

#[test]
fn export_json_round_trips_through_serde() {
    let file = standard_image(4096).into_temp_file();
    let output = run(|writer| {
        cli::export::execute(
            &cli::export::ExportOptions {
                file: file.path().display().to_string(),
                table: Some("People".to_string()),
                json: true,
            },
            writer,
        )
    });
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["table"], "People");
    assert_eq!(value["rows"][0]["name"], "Bob");
    assert_eq!(value["rows"][0]["age"], 42);
}

#[test]
fn checksum_validates_every_page() {
    let file = standard_image(4096).into_temp_file();
    let output = run(|writer| {
        cli::checksum::execute(
            &cli::checksum::ChecksumOptions {
                file: file.path().display().to_string(),
                page: None,
                bad_only: false,
                json: false,
            },
            writer,
        )
    });
    assert!(output.contains("All page checksums valid"));
}

#[test]
fn validate_reports_clean_fixture() {
    let file = standard_image(4096).into_temp_file();
    let output = run(|writer| {
        cli::validate::execute(
            &cli::validate::ValidateOptions {
                file: file.path().display().to_string(),
                json: false,
            },
            writer,
        )
    });
    assert!(output.contains("No structural issues found"));
    assert!(output.contains("tables checked:  2"));
}

#[test]
fn find_locates_database_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let image = standard_image(4096).build();
    std::fs::write(dir.path().join("store.edb"), &image).unwrap();
    std::fs::write(dir.path().join("readme.txt"), b"noise").unwrap();

    let output = run(|writer| {
        cli::find::execute(
            &cli::find::FindOptions {
                dir: dir.path().display().to_string(),
                verbose: true,
                json: false,
            },
            writer,
        )
    });
    assert!(output.contains("store.edb"));
    assert!(!output.contains("readme.txt"));
    assert!(output.contains("1 file(s) found"));
}

#[test]
fn dump_formats_page_bytes() {
    let file = standard_image(4096).into_temp_file();
    let output = run(|writer| {
        cli::dump::execute(
            &cli::dump::DumpOptions {
                file: file.path().display().to_string(),
                page: Some(4),
                offset: None,
                length: Some(64),
                raw: false,
            },
            writer,
        )
    });
    assert!(output.contains("page 4 (64 bytes)"));
    assert!(output.contains('|'));
}
