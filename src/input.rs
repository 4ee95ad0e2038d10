//! Common routines for handling input data.
use crate::area::check_areas_disjoint;
use crate::coefficients::derive_coefficients;
use crate::id::{HasID, IDLike};
use crate::model::{Model, ModelParameters};
use crate::units::Dimensionless;
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use log::info;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fmt::Debug;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};

mod calendar;
use calendar::read_calendar;
mod costs;
use costs::read_cost_inputs;
mod fleet;
use fleet::read_fleet;
mod series;
use series::read_hourly_series;
mod sets;
use sets::{read_areas, read_exo_areas, read_technologies, read_technology_sets};
mod thermal;
use thermal::read_thermal_parameters;
mod trade;
use trade::read_trade_limits;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = read_csv_internal(file_path)?;
    ensure!(!vec.is_empty(), "CSV file {} cannot be empty", file_path.display());

    Ok(vec)
}

/// Read a series of type `T`s from a CSV file.
///
/// The file may be missing or contain only a header, in which case an empty `Vec` is returned.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    if !file_path.is_file() {
        return Ok(Vec::new());
    }

    read_csv_internal(file_path)
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::Reader::from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;

    Ok(toml_data)
}

/// Format an error message to include the file path.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a [`Dimensionless`] value, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(Dimensionless(value))
}

/// Read a [`Dimensionless`] value, checking that it is between 0 and 1 and not zero
pub fn deserialise_proportion_nonzero<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialise_proportion(deserialiser)?;
    if value == Dimensionless(0.0) {
        Err(serde::de::Error::custom("Value cannot be zero"))?;
    }

    Ok(value)
}

/// Check that a value is finite and not negative
pub fn check_non_negative(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number greater than or equal to zero (got {value})"
    );

    Ok(())
}

/// Inserts a key-value pair into a map, returning an error if the key already exists.
pub fn try_insert<K, V>(map: &mut IndexMap<K, V>, key: K, value: V) -> Result<()>
where
    K: Eq + Hash + Debug,
{
    if map.contains_key(&key) {
        bail!("Duplicate entry for {key:?}");
    }
    map.insert(key, value);

    Ok(())
}

/// Read a CSV file of items with IDs.
///
/// As this function is only ever used for top-level CSV files (i.e. the ones which actually define
/// the IDs for a given type), we use an ordered map to maintain the order in the input files.
pub fn read_csv_id_file<T, ID: IDLike>(file_path: &Path) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID> + DeserializeOwned,
{
    fn fill_and_validate_map<T, ID: IDLike>(file_path: &Path) -> Result<IndexMap<ID, T>>
    where
        T: HasID<ID> + DeserializeOwned,
    {
        let mut map = IndexMap::new();
        for record in read_csv_optional::<T>(file_path)? {
            let id = record.get_id().clone();
            ensure!(!id.borrow().is_empty(), "IDs cannot be empty");
            let existing = map.insert(id.clone(), record).is_some();
            ensure!(!existing, "Duplicate ID found: {id}");
        }

        Ok(map)
    }

    fill_and_validate_map(file_path).with_context(|| input_err_msg(file_path))
}

/// Get the directory containing the inputs for a run.
///
/// Inputs for different scenarios and weather years may be stored in subfolders of the model
/// directory, named `<scenario>/<year>`. If neither is given, the model directory itself is used.
pub fn get_input_dir(model_dir: &Path, scenario: Option<&str>, year: Option<&str>) -> Result<PathBuf> {
    let mut input_dir = model_dir.to_path_buf();
    if let Some(scenario) = scenario {
        input_dir.push(scenario);
    }
    if let Some(year) = year {
        input_dir.push(year);
    }

    ensure!(
        input_dir.is_dir(),
        "Input folder {} does not exist",
        input_dir.display()
    );

    Ok(input_dir)
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The loaded model, with derived coefficients, or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;

    let areas = read_areas(model_dir)?;
    let exo_areas = read_exo_areas(model_dir)?;
    check_areas_disjoint(&areas, &exo_areas)?;
    let calendar = read_calendar(model_dir)?;
    let technologies = read_technologies(model_dir)?;
    let technology_sets = read_technology_sets(model_dir, &technologies)?;
    info!(
        "Loaded {} areas, {} exogenous areas, {} technologies and {} hours",
        areas.len(),
        exo_areas.len(),
        technologies.len(),
        calendar.num_hours()
    );

    if let Some(reference_area) = &parameters.reference_area {
        ensure!(
            areas.contains_key(reference_area),
            "Reference area {reference_area} is not a modelled area"
        );
    }

    let series = read_hourly_series(
        model_dir,
        &areas,
        &exo_areas,
        &technology_sets,
        &calendar,
    )?;
    let (thermal_operation, thermal_costs) =
        read_thermal_parameters(model_dir, &technology_sets, &calendar)?;
    let fleet = read_fleet(
        model_dir,
        &areas,
        &technologies,
        &technology_sets,
        &calendar,
        thermal_operation,
    )?;
    let trade = read_trade_limits(model_dir, &areas, &exo_areas)?;
    let cost_inputs = read_cost_inputs(model_dir, &areas, &technology_sets, &calendar, thermal_costs)?;
    let coefficients = derive_coefficients(&cost_inputs);

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        areas,
        exo_areas,
        calendar,
        technologies,
        technology_sets,
        series,
        fleet,
        trade,
        coefficients,
    })
}
