//! Integration tests for the `demo run` command.
use openercot::cli::RunOpts;
use openercot::cli::demo::handle_demo_run_command;
use openercot::settings::Settings;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Read a CSV output file as a header and rows of fields
fn read_output(output_dir: &Path, file_name: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(output_dir.join(file_name)).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

/// An integration test for the `demo run` command.
#[test]
fn test_handle_demo_run_command() {
    unsafe { std::env::set_var("OPENERCOT_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("output");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        overwrite: false,
        debug_model: true,
    };
    handle_demo_run_command("simple", &opts, Some(Settings::default())).unwrap();

    for file_name in [
        "metadata.toml",
        "units.csv",
        "dispatch.csv",
        "dispatch_by_carrier.csv",
        "storage.csv",
        "flows.csv",
        "prices.csv",
        "fallbacks.csv",
        "chunks.csv",
        "debug_bids.csv",
        "openercot_info.log",
        "openercot_error.log",
    ] {
        assert!(
            output_dir.join(file_name).is_file(),
            "Missing output file {file_name}"
        );
    }

    // Three days solved a day at a time, with every chunk solved
    let (headers, chunks) = read_output(&output_dir, "chunks.csv");
    let status = headers.iter().position(|header| header == "status").unwrap();
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|chunk| chunk[status] == "solved"));

    // The retired unit and the unit only registered after the end of the run are left out
    let (headers, units) = read_output(&output_dir, "units.csv");
    let unit_id = headers.iter().position(|header| header == "unit_id").unwrap();
    let ids: Vec<_> = units.iter().map(|unit| unit[unit_id].as_str()).collect();
    assert_eq!(ids.len(), 9);
    assert!(!ids.contains(&"1009-GT2"));
    assert!(!ids.contains(&"1011-1"));

    // Every hour has a complete set of dispatch values
    let (headers, dispatch) = read_output(&output_dir, "dispatch.csv");
    let value = headers.iter().position(|header| header == "dispatch").unwrap();
    assert_eq!(dispatch.len(), 72 * 8);
    assert!(dispatch.iter().all(|row| !row[value].is_empty()));

    // The coal plant's fuel has no usable price so its default bid was used
    let fallbacks = fs::read_to_string(output_dir.join("fallbacks.csv")).unwrap();
    assert!(fallbacks.contains("1004-ST1,2022-01,fuel_price_default,SUB"));
    assert!(fallbacks.contains("1010-1,,capacity_missing,"));
}
