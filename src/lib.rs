//! Common functionality for the hourly dispatch model.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod area;
pub mod calendar;
pub mod cli;
pub mod coefficients;
pub mod dispatch;
pub mod fleet;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod series;
pub mod settings;
pub mod technology;
pub mod trade;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the program's config directory, falling back to the current directory
pub fn get_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        return PathBuf::from(".");
    };
    config_dir.push("hourly_dispatch");
    config_dir
}
