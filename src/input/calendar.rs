//! Code for reading the hours file.
use super::*;
use crate::calendar::{Calendar, Month, Week};
use serde::Deserialize;

const HOURS_FILE_NAME: &str = "hours.csv";

/// A row of the hours file
#[derive(Debug, Deserialize, PartialEq)]
struct HourRaw {
    hour: u32,
    month: Month,
    week: Week,
}

/// Read the calendar of modelled hours from the specified model directory.
pub fn read_calendar(model_dir: &Path) -> Result<Calendar> {
    let file_path = model_dir.join(HOURS_FILE_NAME);
    let hours = read_csv::<HourRaw>(&file_path)?;
    Calendar::new(hours.into_iter().map(|row| (row.hour, row.month, row.week)))
        .with_context(|| input_err_msg(&file_path))
}
