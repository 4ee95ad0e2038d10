//! The module responsible for writing output data to disk.
use crate::area::AreaID;
use crate::calendar::Month;
use crate::dispatch::{HourlyVariableMap, Problem, Solution, Variables};
use crate::model::Model;
use crate::technology::{GroupID, TechnologyID};
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The output file name for generation by technology group
const PRODUCTION_FILE_NAME: &str = "production.csv";

/// The output file name for storage operation
const STORAGE_FILE_NAME: &str = "storage.csv";

/// The output file name for the supply/demand balance
const BALANCE_FILE_NAME: &str = "balance.csv";

/// The output file name for committed capacity
const COMMITMENT_FILE_NAME: &str = "commitment.csv";

/// The output file name for electricity prices
const PRICES_FILE_NAME: &str = "prices.csv";

/// The output file name for trade with the reference area
const REFERENCE_TRADE_FILE_NAME: &str = "reference_trade.csv";

/// The output file name for hourly costs and emissions
const COSTS_FILE_NAME: &str = "costs.csv";

/// The output file name for the run summary
const SUMMARY_FILE_NAME: &str = "summary.toml";

/// The output file name for derived coefficients
const COEFFICIENTS_FILE_NAME: &str = "debug_coefficients.csv";

/// The output file name for the number of rows in each constraint family
const CONSTRAINT_COUNTS_FILE_NAME: &str = "debug_constraint_counts.csv";

/// The output file name for initial and solved committed capacity
const DEBUG_COMMITMENT_FILE_NAME: &str = "debug_commitment.csv";

/// Get the default output directory for the model specified at `model_dir`.
///
/// Results for a scenario and year go in subfolders, mirroring the layout of the model's inputs.
pub fn get_output_dir(
    model_dir: &Path,
    scenario: Option<&str>,
    year: Option<&str>,
    results_root: PathBuf,
) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    let mut path = results_root;
    path.push(model_name);
    path.extend(scenario);
    path.extend(year);

    Ok(path)
}

/// Create a new output directory, deleting any existing contents if `allow_overwrite` is set.
///
/// # Returns
///
/// Whether an existing output directory will be overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the production CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ProductionRow {
    area_id: AreaID,
    hour: u32,
    group: GroupID,
    generation: f64,
}

/// Represents a row in the storage CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StorageRow {
    area_id: AreaID,
    hour: u32,
    technology_id: TechnologyID,
    charge: f64,
    discharge: f64,
    net_flow: f64,
    stored_energy: f64,
}

/// Represents a row in the balance CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct BalanceRow {
    area_id: AreaID,
    hour: u32,
    demand: f64,
    net_imports: f64,
    net_exo_imports: f64,
    unserved_load: f64,
}

/// Represents a row in the commitment CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CommitmentRow {
    area_id: AreaID,
    hour: u32,
    technology_id: TechnologyID,
    committed_capacity: f64,
}

/// Represents a row in the prices CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PriceRow {
    area_id: AreaID,
    hour: u32,
    price: f64,
}

/// Represents a row in the reference trade CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ReferenceTradeRow {
    hour: u32,
    partner_id: AreaID,
    net_import: f64,
}

/// Represents a row in the costs CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CostRow {
    area_id: AreaID,
    hour: u32,
    cost: f64,
    emissions: f64,
}

/// Totals for the whole run
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Summary {
    /// The objective value (total cost in millions)
    objective: f64,
    total_cost: f64,
    total_emissions: f64,
    total_unserved_load: f64,
}

/// Represents a row in the coefficients debug file.
///
/// Coefficients which could not be derived are left empty.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CoefficientRow {
    technology_id: TechnologyID,
    area_id: AreaID,
    month: Month,
    variable_cost: Option<f64>,
    generation_cost: Option<f64>,
    commitment_cost: Option<f64>,
    startup_cost: Option<f64>,
    ramp_cost: Option<f64>,
}

/// Represents a row in the constraint counts debug file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ConstraintCountRow {
    family: String,
    rows: usize,
}

/// Represents a row in the commitment debug file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DebugCommitmentRow {
    area_id: AreaID,
    hour: u32,
    technology_id: TechnologyID,
    initial_guess: Option<f64>,
    committed_capacity: f64,
}

/// Write the run summary to file
fn write_summary(output_path: &Path, solution: &Solution) -> Result<()> {
    let vars = solution.variables();
    let total = |values: &HourlyVariableMap<AreaID>| -> f64 {
        solution.iter_values(values).map(|(_, _, value)| value).sum()
    };
    let summary = Summary {
        objective: solution.objective_value(),
        total_cost: total(&vars.cost),
        total_emissions: total(&vars.emissions),
        total_unserved_load: total(&vars.unserved),
    };

    let file_path = output_path.join(SUMMARY_FILE_NAME);
    fs::write(&file_path, toml::to_string(&summary)?)?;

    Ok(())
}

/// Write all results of a run to the output folder
pub fn write_results(
    output_path: &Path,
    model: &Model,
    solution: &Solution,
    save_debug_info: bool,
) -> Result<()> {
    let mut writer = DataWriter::create(output_path, model, save_debug_info)?;
    writer.write_production(model, solution)?;
    writer.write_storage(model, solution)?;
    writer.write_balance(model, solution)?;
    writer.write_commitment(model, solution)?;
    writer.write_prices(model, solution)?;
    writer.write_reference_trade(model, solution)?;
    writer.write_costs(model, solution)?;
    writer.write_debug_info(model, solution)?;
    writer.flush()?;

    write_summary(output_path, solution)
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    coefficients_writer: csv::Writer<File>,
    constraint_counts_writer: csv::Writer<File>,
    commitment_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            coefficients_writer: new_writer(COEFFICIENTS_FILE_NAME)?,
            constraint_counts_writer: new_writer(CONSTRAINT_COUNTS_FILE_NAME)?,
            commitment_writer: new_writer(DEBUG_COMMITMENT_FILE_NAME)?,
        })
    }

    /// Write all debug info to output files
    fn write_debug_info(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        self.write_coefficients(model)?;
        self.write_constraint_counts(solution.problem())?;
        self.write_commitment(model, solution)?;

        Ok(())
    }

    /// Write derived cost coefficients to file
    fn write_coefficients(&mut self, model: &Model) -> Result<()> {
        let coefficients = &model.coefficients;
        let keys: IndexSet<_> = coefficients
            .variable_cost
            .keys()
            .chain(coefficients.generation_cost.keys())
            .chain(coefficients.commitment_cost.keys())
            .chain(coefficients.startup_cost.keys())
            .chain(coefficients.ramp_cost.keys())
            .collect();

        for key in keys {
            let (technology_id, area_id, month) = key;
            let row = CoefficientRow {
                technology_id: technology_id.clone(),
                area_id: area_id.clone(),
                month: *month,
                variable_cost: coefficients.variable_cost.get(key).copied().map(f64::from),
                generation_cost: coefficients.generation_cost.get(key).copied().map(f64::from),
                commitment_cost: coefficients.commitment_cost.get(key).copied().map(f64::from),
                startup_cost: coefficients.startup_cost.get(key).copied().map(f64::from),
                ramp_cost: coefficients.ramp_cost.get(key).copied().map(f64::from),
            };
            self.coefficients_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the number of rows in each constraint family to file
    fn write_constraint_counts(&mut self, problem: &Problem) -> Result<()> {
        for (family, rows) in problem.row_counts() {
            let row = ConstraintCountRow {
                family: family.to_string(),
                rows,
            };
            self.constraint_counts_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the initial guess and solved value of committed capacity to file
    fn write_commitment(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        let problem = solution.problem();
        for ((area_id, technology_id), hour, var) in solution.variables().committed.iter() {
            let row = DebugCommitmentRow {
                area_id: area_id.clone(),
                hour: model.calendar.hour_label(hour),
                technology_id: technology_id.clone(),
                initial_guess: problem.initial_value(var),
                committed_capacity: solution.value(var),
            };
            self.commitment_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.coefficients_writer.flush()?;
        self.constraint_counts_writer.flush()?;
        self.commitment_writer.flush()?;

        Ok(())
    }
}

/// An object for writing the results of a run to file
pub struct DataWriter {
    production_writer: csv::Writer<File>,
    storage_writer: csv::Writer<File>,
    balance_writer: csv::Writer<File>,
    commitment_writer: csv::Writer<File>,
    prices_writer: csv::Writer<File>,
    reference_trade_writer: Option<csv::Writer<File>>,
    costs_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `model` - The model (the reference trade file is only created if it has a reference area)
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, model: &Model, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        let reference_trade_writer = if model.parameters.reference_area.is_some() {
            Some(new_writer(REFERENCE_TRADE_FILE_NAME)?)
        } else {
            None
        };

        Ok(Self {
            production_writer: new_writer(PRODUCTION_FILE_NAME)?,
            storage_writer: new_writer(STORAGE_FILE_NAME)?,
            balance_writer: new_writer(BALANCE_FILE_NAME)?,
            commitment_writer: new_writer(COMMITMENT_FILE_NAME)?,
            prices_writer: new_writer(PRICES_FILE_NAME)?,
            reference_trade_writer,
            costs_writer: new_writer(COSTS_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write generation summed by technology group
    pub fn write_production(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        let vars = solution.variables();
        for area_id in model.areas.keys() {
            for hour in model.calendar.iter_hours() {
                let mut by_group: IndexMap<&GroupID, f64> = IndexMap::new();
                for (technology_id, technology) in &model.technologies {
                    let key = (area_id.clone(), technology_id.clone());
                    let generation = solution.value(vars.generation.get(&key, hour));
                    *by_group.entry(&technology.group).or_default() += generation;
                }

                for (group, generation) in by_group {
                    let row = ProductionRow {
                        area_id: area_id.clone(),
                        hour: model.calendar.hour_label(hour),
                        group: group.clone(),
                        generation,
                    };
                    self.production_writer.serialize(row)?;
                }
            }
        }

        Ok(())
    }

    /// Write charging, discharging and stored energy of storage technologies
    pub fn write_storage(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        let vars = solution.variables();
        for ((area_id, technology_id), hour, stored) in vars.stored.iter() {
            let key = (area_id.clone(), technology_id.clone());
            let charge = solution.value(vars.charge.get(&key, hour));
            let discharge = solution.value(vars.generation.get(&key, hour));
            let row = StorageRow {
                area_id: area_id.clone(),
                hour: model.calendar.hour_label(hour),
                technology_id: technology_id.clone(),
                charge,
                discharge,
                net_flow: discharge - charge,
                stored_energy: solution.value(stored),
            };
            self.storage_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write demand, trade and unserved load for each area
    pub fn write_balance(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        let vars = solution.variables();
        for area_id in model.areas.keys() {
            let demand = model.series.demand(area_id)?;
            for hour in model.calendar.iter_hours() {
                let row = BalanceRow {
                    area_id: area_id.clone(),
                    hour: model.calendar.hour_label(hour),
                    demand: demand[hour],
                    net_imports: net_imports(vars, solution, area_id, hour),
                    net_exo_imports: net_exo_imports(model, vars, solution, area_id, hour),
                    unserved_load: solution.value(vars.unserved.get(area_id, hour)),
                };
                self.balance_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write committed capacity of thermal technologies
    pub fn write_commitment(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        for ((area_id, technology_id), hour, committed_capacity) in
            solution.iter_values(&solution.variables().committed)
        {
            let row = CommitmentRow {
                area_id: area_id.clone(),
                hour: model.calendar.hour_label(hour),
                technology_id: technology_id.clone(),
                committed_capacity,
            };
            self.commitment_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write electricity prices to a CSV file
    pub fn write_prices(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        for (area_id, hour, price) in solution.iter_prices() {
            let row = PriceRow {
                area_id: area_id.clone(),
                hour: model.calendar.hour_label(hour),
                price,
            };
            self.prices_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write net imports into the reference area from each other area.
    ///
    /// Does nothing if there is no reference area.
    pub fn write_reference_trade(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        let (Some(writer), Some(reference)) = (
            self.reference_trade_writer.as_mut(),
            model.parameters.reference_area.as_ref(),
        ) else {
            return Ok(());
        };

        let vars = solution.variables();
        let trade_efficiency = model.parameters.trade_efficiency();
        for hour in model.calendar.iter_hours() {
            for partner_id in model.areas.keys().filter(|id| *id != reference) {
                let key = (reference.clone(), partner_id.clone());
                let imports = solution.value(vars.imports.get(&key, hour));
                let exports = solution.value(vars.exports.get(&key, hour));
                let row = ReferenceTradeRow {
                    hour: model.calendar.hour_label(hour),
                    partner_id: partner_id.clone(),
                    net_import: imports * trade_efficiency - exports,
                };
                writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write hourly costs and emissions of each area
    pub fn write_costs(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        let vars = solution.variables();
        for (area_id, hour, cost) in solution.iter_values(&vars.cost) {
            let row = CostRow {
                area_id: area_id.clone(),
                hour: model.calendar.hour_label(hour),
                cost,
                emissions: solution.value(vars.emissions.get(area_id, hour)),
            };
            self.costs_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write debug information to CSV files
    pub fn write_debug_info(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_debug_info(model, solution)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.production_writer.flush()?;
        self.storage_writer.flush()?;
        self.balance_writer.flush()?;
        self.commitment_writer.flush()?;
        self.prices_writer.flush()?;
        if let Some(wtr) = &mut self.reference_trade_writer {
            wtr.flush()?;
        }
        self.costs_writer.flush()?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

/// Imports less exports between an area and the other modelled areas
fn net_imports(vars: &Variables, solution: &Solution, area_id: &AreaID, hour: usize) -> f64 {
    vars.imports
        .keys()
        .filter(|(to, _)| to == area_id)
        .map(|key| {
            solution.value(vars.imports.get(key, hour)) - solution.value(vars.exports.get(key, hour))
        })
        .sum()
}

/// Imports less exports between an area and the exogenous areas
fn net_exo_imports(
    model: &Model,
    vars: &Variables,
    solution: &Solution,
    area_id: &AreaID,
    hour: usize,
) -> f64 {
    model
        .exo_areas
        .keys()
        .map(|exo_area_id| {
            let key = (area_id.clone(), exo_area_id.clone());
            solution.value(vars.exo_imports.get(&key, hour))
                - solution.value(vars.exo_exports.get(&key, hour))
        })
        .sum()
}
