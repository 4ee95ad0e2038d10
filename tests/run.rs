//! An integration test for the `run` command.
use hourly_dispatch::cli::{RunOpts, handle_run_command};
use hourly_dispatch::settings::Settings;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("two_area")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("DISPATCH_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        debug_model: Some(true),
        ..Default::default()
    };
    handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();

    for file_name in [
        "production.csv",
        "storage.csv",
        "balance.csv",
        "commitment.csv",
        "prices.csv",
        "reference_trade.csv",
        "costs.csv",
        "summary.toml",
        "metadata.toml",
        "debug_coefficients.csv",
        "debug_constraint_counts.csv",
        "debug_commitment.csv",
    ] {
        assert!(
            tempdir.path().join(file_name).is_file(),
            "{file_name} was not written"
        );
    }
}
