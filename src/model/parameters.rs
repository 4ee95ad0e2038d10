//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::area::AreaID;
use crate::input::{deserialise_proportion_nonzero, input_err_msg, read_toml};
use crate::technology::TechnologyID;
use crate::units::{Dimensionless, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

define_param_default!(default_load_uncertainty, Dimensionless, 0.01);
define_param_default!(default_reserve_margin, Dimensionless, 0.1);
define_param_default!(default_value_of_lost_load, MoneyPerEnergy, 15000.0);
define_param_default!(default_transport_loss, Dimensionless, 0.02);
define_param_default!(default_nuclear_technology, TechnologyID, "nuclear");
define_param_default!(default_hydro_technology, TechnologyID, "lake_phs");

/// Round-trip efficiency components of a storage technology
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct StorageEfficiency {
    /// Fraction of charged energy which is stored
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub charge: Dimensionless,
    /// Fraction of stored energy which is delivered on discharge
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub discharge: Dimensionless,
}

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Fraction of demand held as reserve against forecast errors
    #[serde(default = "default_load_uncertainty")]
    pub load_uncertainty: Dimensionless,
    /// Extra margin applied to the demand-related reserve requirement
    #[serde(default = "default_reserve_margin")]
    pub reserve_margin: Dimensionless,
    /// The cost applied to unserved load
    #[serde(default = "default_value_of_lost_load")]
    pub value_of_lost_load: MoneyPerEnergy,
    /// The fraction of energy lost when trading between areas
    #[serde(default = "default_transport_loss")]
    pub transport_loss: Dimensionless,
    /// The thermal technology whose availability is limited week by week
    #[serde(default = "default_nuclear_technology")]
    pub nuclear_technology: TechnologyID,
    /// The storage technology with natural inflows and monthly limits
    #[serde(default = "default_hydro_technology")]
    pub hydro_technology: TechnologyID,
    /// The area for which trade with each other area is reported
    #[serde(default)]
    pub reference_area: Option<AreaID>,
    /// Charge and discharge efficiencies for storage technologies
    #[serde(default)]
    pub storage_efficiency: IndexMap<TechnologyID, StorageEfficiency>,
}

/// Check that a parameter is finite and not negative
fn check_non_negative(value: Dimensionless, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Dimensionless(0.0),
        "{name} must be a finite number greater than or equal to zero"
    );

    Ok(())
}

/// Check that the `value_of_lost_load` parameter is valid
fn check_value_of_lost_load(value: MoneyPerEnergy) -> Result<()> {
    ensure!(
        value.is_finite() && value > MoneyPerEnergy(0.0),
        "value_of_lost_load must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `transport_loss` parameter is valid
fn check_transport_loss(value: Dimensionless) -> Result<()> {
    ensure!(
        value >= Dimensionless(0.0) && value < Dimensionless(1.0),
        "transport_loss must be at least zero and less than one"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_non_negative(self.load_uncertainty, "load_uncertainty")?;
        check_non_negative(self.reserve_margin, "reserve_margin")?;
        check_value_of_lost_load(self.value_of_lost_load)?;
        check_transport_loss(self.transport_loss)?;

        // storage_efficiency values already validated with deserialise_proportion_nonzero

        Ok(())
    }

    /// Charge and discharge efficiency for a storage technology
    pub fn storage_efficiency(&self, technology_id: &TechnologyID) -> Result<&StorageEfficiency> {
        self.storage_efficiency
            .get(technology_id)
            .with_context(|| format!("No storage efficiency given for {technology_id}"))
    }

    /// The fraction of exported energy which arrives at the importing area
    pub fn trade_efficiency(&self) -> f64 {
        1.0 - self.transport_loss.value()
    }
}
