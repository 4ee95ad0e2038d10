//! The generation and storage fleet of each area, along with technology-level parameters.
use crate::area::AreaID;
use crate::calendar::{Month, Week};
use crate::technology::TechnologyID;
use crate::units::{Dimensionless, MoneyPerEnergy};
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// Stored energy and inflows are given in TWh, whereas the model works in GWh
pub const GWH_PER_TWH: f64 = 1000.0;

/// A key for parameters which vary by area and technology
pub type AreaTechnologyKey = (AreaID, TechnologyID);

/// Availability factors for a thermal technology in an area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Availability {
    /// The maximum fraction of capacity which may be online in any hour
    pub max: Dimensionless,
    /// The maximum average fraction of capacity online over the year
    pub yearly: Dimensionless,
}

/// Monthly multipliers for the charge and discharge capacity of hydro storage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HydroLimits {
    /// Multiplier for the charge capacity
    pub max_in: Dimensionless,
    /// Multiplier for the discharge capacity
    pub max_out: Dimensionless,
}

/// Operational limits of a thermal technology
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalOperation {
    /// The minimum generation as a fraction of online capacity
    pub min_stable_generation: Dimensionless,
    /// The number of hours capacity must stay online after starting up
    pub min_time_on: usize,
    /// The number of hours capacity must stay offline after shutting down
    pub min_time_off: usize,
}

/// Installed capacities and related parameters
#[derive(Debug, Default, PartialEq)]
pub struct Fleet {
    /// Generation (or discharge) capacity in GW
    pub capacities: IndexMap<AreaTechnologyKey, f64>,
    /// Charge capacity of storage in GW
    pub charge_capacities: IndexMap<AreaTechnologyKey, f64>,
    /// Maximum stored energy of storage in TWh
    pub storage_capacities: IndexMap<AreaTechnologyKey, f64>,
    /// Availability of thermal technologies
    pub availability: IndexMap<AreaTechnologyKey, Availability>,
    /// Weekly maximum availability factor for the nuclear technology
    pub nuclear_availability: IndexMap<(AreaID, Week), Dimensionless>,
    /// Monthly limits for the hydro storage technology
    pub hydro_limits: IndexMap<(AreaID, Month), HydroLimits>,
    /// Monthly natural inflows to hydro storage in TWh
    pub lake_inflows: IndexMap<(AreaID, Month), f64>,
    /// Operational limits of thermal technologies
    pub thermal: IndexMap<TechnologyID, ThermalOperation>,
    /// Reserve needed per unit of VRE capacity
    pub reserve_requirements: IndexMap<TechnologyID, Dimensionless>,
    /// Variable cost of discharging storage
    pub storage_costs: IndexMap<TechnologyID, MoneyPerEnergy>,
}

impl Fleet {
    /// Installed capacity in GW
    pub fn capacity(&self, area_id: &AreaID, technology_id: &TechnologyID) -> Result<f64> {
        self.capacities
            .get(&(area_id.clone(), technology_id.clone()))
            .copied()
            .with_context(|| format!("No capacity given for {technology_id} in area {area_id}"))
    }

    /// Charge capacity of storage in GW
    pub fn charge_capacity(&self, area_id: &AreaID, technology_id: &TechnologyID) -> Result<f64> {
        self.charge_capacities
            .get(&(area_id.clone(), technology_id.clone()))
            .copied()
            .with_context(|| {
                format!("No charge capacity given for {technology_id} in area {area_id}")
            })
    }

    /// Maximum stored energy in GWh
    pub fn max_stored_energy(&self, area_id: &AreaID, technology_id: &TechnologyID) -> Result<f64> {
        let capacity = self
            .storage_capacities
            .get(&(area_id.clone(), technology_id.clone()))
            .with_context(|| {
                format!("No storage capacity given for {technology_id} in area {area_id}")
            })?;

        Ok(capacity * GWH_PER_TWH)
    }

    /// Availability factors for a thermal technology
    pub fn availability(
        &self,
        area_id: &AreaID,
        technology_id: &TechnologyID,
    ) -> Result<&Availability> {
        self.availability
            .get(&(area_id.clone(), technology_id.clone()))
            .with_context(|| {
                format!("No availability given for {technology_id} in area {area_id}")
            })
    }

    /// Maximum availability factor for nuclear in the given week
    pub fn nuclear_availability(&self, area_id: &AreaID, week: Week) -> Result<Dimensionless> {
        self.nuclear_availability
            .get(&(area_id.clone(), week))
            .copied()
            .with_context(|| {
                format!("No nuclear availability given for area {area_id} in week {week}")
            })
    }

    /// Hydro limits for the given month
    pub fn hydro_limits(&self, area_id: &AreaID, month: Month) -> Result<&HydroLimits> {
        self.hydro_limits
            .get(&(area_id.clone(), month))
            .with_context(|| format!("No hydro limits given for area {area_id} in month {month}"))
    }

    /// Natural inflow to hydro storage over the given month in GWh
    pub fn lake_inflow(&self, area_id: &AreaID, month: Month) -> Result<f64> {
        let inflow = self
            .lake_inflows
            .get(&(area_id.clone(), month))
            .with_context(|| format!("No lake inflow given for area {area_id} in month {month}"))?;

        Ok(inflow * GWH_PER_TWH)
    }

    /// Operational limits for a thermal technology
    pub fn thermal_operation(&self, technology_id: &TechnologyID) -> Result<&ThermalOperation> {
        self.thermal
            .get(technology_id)
            .with_context(|| format!("No thermal parameters given for {technology_id}"))
    }

    /// Reserve requirement per unit capacity of a VRE technology
    pub fn reserve_requirement(&self, technology_id: &TechnologyID) -> Result<Dimensionless> {
        self.reserve_requirements
            .get(technology_id)
            .copied()
            .with_context(|| format!("No reserve requirement given for {technology_id}"))
    }

    /// Variable cost of a storage technology
    pub fn storage_cost(&self, technology_id: &TechnologyID) -> Result<MoneyPerEnergy> {
        self.storage_costs
            .get(technology_id)
            .copied()
            .with_context(|| format!("No storage cost given for {technology_id}"))
    }
}
