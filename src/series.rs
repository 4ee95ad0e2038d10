//! Hourly time series. Each series holds one value per hour of the calendar.
use crate::area::{AreaID, ExoAreaID};
use crate::technology::TechnologyID;
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// A map of hourly series, each with one value per hour
pub type SeriesMap<K> = IndexMap<K, Vec<f64>>;

/// All hourly inputs
#[derive(Debug, Default, PartialEq)]
pub struct HourlySeries {
    /// Demand in each area, in GW
    pub demand: SeriesMap<AreaID>,
    /// Generation of the non-market technology in each area, in GW
    pub non_market: SeriesMap<AreaID>,
    /// Prices in exogenous areas, in EUR/MWh
    pub exo_prices: SeriesMap<ExoAreaID>,
    /// Load factors for VRE technologies in each area
    pub vre_profiles: SeriesMap<(AreaID, TechnologyID)>,
}

impl HourlySeries {
    /// Hourly demand for an area
    pub fn demand(&self, area_id: &AreaID) -> Result<&[f64]> {
        self.demand
            .get(area_id)
            .map(Vec::as_slice)
            .with_context(|| format!("No demand given for area {area_id}"))
    }

    /// Hourly non-market generation for an area
    pub fn non_market(&self, area_id: &AreaID) -> Result<&[f64]> {
        self.non_market
            .get(area_id)
            .map(Vec::as_slice)
            .with_context(|| format!("No non-market generation given for area {area_id}"))
    }

    /// Hourly prices for an exogenous area
    pub fn exo_price(&self, exo_area_id: &ExoAreaID) -> Result<&[f64]> {
        self.exo_prices
            .get(exo_area_id)
            .map(Vec::as_slice)
            .with_context(|| format!("No prices given for exogenous area {exo_area_id}"))
    }

    /// Hourly load factors for a VRE technology in an area
    pub fn vre_profile(&self, area_id: &AreaID, technology_id: &TechnologyID) -> Result<&[f64]> {
        self.vre_profiles
            .get(&(area_id.clone(), technology_id.clone()))
            .map(Vec::as_slice)
            .with_context(|| format!("No load factors given for {technology_id} in area {area_id}"))
    }
}
