//! Code for reading hourly series. All series are given in long format with one row per hour.
use super::*;
use crate::area::{AreaID, AreaMap, ExoAreaID, ExoAreaMap};
use crate::calendar::Calendar;
use crate::id::IDCollection;
use crate::series::{HourlySeries, SeriesMap};
use crate::technology::{TechnologyID, TechnologySets};
use serde::Deserialize;

const DEMAND_FILE_NAME: &str = "demand.csv";
const NON_MARKET_FILE_NAME: &str = "non_market.csv";
const EXO_PRICES_FILE_NAME: &str = "exo_prices.csv";
const VRE_PROFILES_FILE_NAME: &str = "vre_profiles.csv";

/// An hourly value for an area
#[derive(Debug, Deserialize, PartialEq)]
struct AreaValueRaw {
    area_id: String,
    hour: u32,
    value: f64,
}

/// An hourly price for an exogenous area
#[derive(Debug, Deserialize, PartialEq)]
struct ExoPriceRaw {
    exo_area_id: String,
    hour: u32,
    value: f64,
}

/// An hourly load factor for a VRE technology in an area
#[derive(Debug, Deserialize, PartialEq)]
struct VreProfileRaw {
    area_id: String,
    technology_id: String,
    hour: u32,
    value: f64,
}

/// Read all hourly series from the specified model directory.
pub fn read_hourly_series(
    model_dir: &Path,
    areas: &AreaMap,
    exo_areas: &ExoAreaMap,
    technology_sets: &TechnologySets,
    calendar: &Calendar,
) -> Result<HourlySeries> {
    let demand = read_area_series(
        &model_dir.join(DEMAND_FILE_NAME),
        areas,
        calendar,
        check_non_negative,
    )?;
    let non_market = read_area_series(
        &model_dir.join(NON_MARKET_FILE_NAME),
        areas,
        calendar,
        check_non_negative,
    )?;
    let exo_prices = read_exo_prices(&model_dir.join(EXO_PRICES_FILE_NAME), exo_areas, calendar)?;
    let vre_profiles = read_vre_profiles(
        &model_dir.join(VRE_PROFILES_FILE_NAME),
        areas,
        technology_sets,
        calendar,
    )?;

    Ok(HourlySeries {
        demand,
        non_market,
        exo_prices,
        vre_profiles,
    })
}

fn check_finite(value: f64, name: &str) -> Result<()> {
    ensure!(value.is_finite(), "{name} must be a finite number (got {value})");
    Ok(())
}

fn check_load_factor(value: f64, name: &str) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&value),
        "{name} must be between 0 and 1 (got {value})"
    );
    Ok(())
}

/// Read a series given for every modelled area
fn read_area_series<F>(
    file_path: &Path,
    areas: &AreaMap,
    calendar: &Calendar,
    check_value: F,
) -> Result<SeriesMap<AreaID>>
where
    F: Fn(f64, &str) -> Result<()>,
{
    let rows = read_csv::<AreaValueRaw>(file_path)?;
    let read = || -> Result<SeriesMap<AreaID>> {
        let rows = rows
            .into_iter()
            .map(|row| {
                check_value(row.value, "value")?;
                Ok((areas.get_id_by_str(&row.area_id)?, row.hour, row.value))
            })
            .collect::<Result<Vec<_>>>()?;
        let keys = areas.keys().cloned();
        fill_series(rows, keys, calendar, |area_id| format!("area {area_id}"))
    };

    read().with_context(|| input_err_msg(file_path))
}

fn read_exo_prices(
    file_path: &Path,
    exo_areas: &ExoAreaMap,
    calendar: &Calendar,
) -> Result<SeriesMap<ExoAreaID>> {
    let rows = read_csv_optional::<ExoPriceRaw>(file_path)?;
    let read = || -> Result<SeriesMap<ExoAreaID>> {
        let rows = rows
            .into_iter()
            .map(|row| {
                check_finite(row.value, "value")?;
                Ok((exo_areas.get_id_by_str(&row.exo_area_id)?, row.hour, row.value))
            })
            .collect::<Result<Vec<_>>>()?;
        let keys = exo_areas.keys().cloned();
        fill_series(rows, keys, calendar, |exo_area_id| {
            format!("exogenous area {exo_area_id}")
        })
    };

    read().with_context(|| input_err_msg(file_path))
}

fn read_vre_profiles(
    file_path: &Path,
    areas: &AreaMap,
    technology_sets: &TechnologySets,
    calendar: &Calendar,
) -> Result<SeriesMap<(AreaID, TechnologyID)>> {
    let rows = read_csv_optional::<VreProfileRaw>(file_path)?;
    let read = || -> Result<SeriesMap<(AreaID, TechnologyID)>> {
        let rows = rows
            .into_iter()
            .map(|row| {
                check_load_factor(row.value, "value")?;
                let area_id = areas.get_id_by_str(&row.area_id)?;
                let technology_id = technology_sets
                    .vre
                    .get_id_by_str(&row.technology_id)
                    .with_context(|| format!("{} is not a VRE technology", row.technology_id))?;
                Ok(((area_id, technology_id), row.hour, row.value))
            })
            .collect::<Result<Vec<_>>>()?;
        let keys = areas.keys().flat_map(|area_id| {
            technology_sets
                .vre
                .iter()
                .map(move |technology_id| (area_id.clone(), technology_id.clone()))
        });
        fill_series(rows, keys, calendar, |(area_id, technology_id)| {
            format!("{technology_id} in area {area_id}")
        })
    };

    read().with_context(|| input_err_msg(file_path))
}

/// Arrange (key, hour label, value) rows into one series per key.
///
/// Every key in `keys` must have exactly one value for every hour. Rows for other keys are
/// rejected.
fn fill_series<K, I, D>(
    rows: Vec<(K, u32, f64)>,
    keys: I,
    calendar: &Calendar,
    describe: D,
) -> Result<SeriesMap<K>>
where
    K: Eq + Hash + Clone,
    I: Iterator<Item = K>,
    D: Fn(&K) -> String,
{
    let mut partial: IndexMap<K, Vec<Option<f64>>> = keys
        .map(|key| (key, vec![None; calendar.num_hours()]))
        .collect();
    for (key, label, value) in rows {
        let hour = calendar.hour_index(label)?;
        let series = partial
            .get_mut(&key)
            .with_context(|| format!("Unexpected series for {}", describe(&key)))?;
        ensure!(
            series[hour].replace(value).is_none(),
            "Duplicate value for {} in hour {label}",
            describe(&key)
        );
    }

    partial
        .into_iter()
        .map(|(key, series)| {
            let values = series
                .into_iter()
                .enumerate()
                .map(|(hour, value)| {
                    value.with_context(|| {
                        format!(
                            "Missing value for {} in hour {}",
                            describe(&key),
                            calendar.hour_label(hour)
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((key, values))
        })
        .collect()
}
