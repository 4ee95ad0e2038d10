//! An integration test for the `validate` command.
use hourly_dispatch::cli::{InputOpts, handle_validate_command};
use hourly_dispatch::settings::Settings;
use std::path::{Path, PathBuf};

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("two_area")
}

/// An integration test for the `validate` command.
#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("DISPATCH_LOG_LEVEL", "off") };
    handle_validate_command(
        &get_model_dir(),
        &InputOpts::default(),
        Some(Settings::default()),
    )
    .unwrap();
}
