//! The model is the complete, read-only set of inputs for one dispatch run.
use crate::area::{AreaMap, ExoAreaMap};
use crate::calendar::Calendar;
use crate::coefficients::Coefficients;
use crate::fleet::Fleet;
use crate::series::HourlySeries;
use crate::technology::{TechnologyMap, TechnologySets};
use crate::trade::TradeLimits;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Scalar parameters from model.toml
    pub parameters: ModelParameters,
    /// Modelled areas
    pub areas: AreaMap,
    /// Exogenous areas
    pub exo_areas: ExoAreaMap,
    /// The hours modelled
    pub calendar: Calendar,
    /// All technologies
    pub technologies: TechnologyMap,
    /// The partition of technologies into sets
    pub technology_sets: TechnologySets,
    /// Hourly inputs
    pub series: HourlySeries,
    /// Capacities and technology parameters
    pub fleet: Fleet,
    /// Trade capacities
    pub trade: TradeLimits,
    /// Derived cost and emission coefficients
    pub coefficients: Coefficients,
}

impl Model {
    /// Whether the weekly nuclear availability limit applies.
    ///
    /// This is only the case if the nuclear technology is a thermal technology in this model.
    pub fn has_nuclear(&self) -> bool {
        self.technology_sets
            .is_thermal(&self.parameters.nuclear_technology)
    }

    /// Whether hydro inflows and monthly limits apply.
    ///
    /// This is only the case if the hydro technology is a storage technology in this model.
    pub fn has_hydro(&self) -> bool {
        self.technology_sets
            .is_storage(&self.parameters.hydro_technology)
    }
}
