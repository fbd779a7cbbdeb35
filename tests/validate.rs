//! Integration tests for the `validate` command.
use openercot::cli::handle_validate_command;
use openercot::settings::Settings;
use std::path::PathBuf;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("simple")
}

/// An integration test for the `validate` command.
#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("OPENERCOT_LOG_LEVEL", "off") };
    handle_validate_command(&get_model_dir(), Some(Settings::default())).unwrap();
}
