//! Limits on trade between areas and with exogenous areas.
use crate::area::{AreaID, ExoAreaID};
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// Import and export capacity between a modelled area and an exogenous area, in GW
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExoLink {
    /// Maximum imports into the modelled area
    pub max_import: f64,
    /// Maximum exports from the modelled area
    pub max_export: f64,
}

/// Trade capacities
#[derive(Debug, Default, PartialEq)]
pub struct TradeLimits {
    /// Maximum imports into the first area from the second, in GW
    pub links: IndexMap<(AreaID, AreaID), f64>,
    /// Trade capacity with exogenous areas
    pub exo_links: IndexMap<(AreaID, ExoAreaID), ExoLink>,
}

impl TradeLimits {
    /// The maximum imports into `to` from `from`
    pub fn link_capacity(&self, to: &AreaID, from: &AreaID) -> Result<f64> {
        self.links
            .get(&(to.clone(), from.clone()))
            .copied()
            .with_context(|| format!("No link capacity given for imports into {to} from {from}"))
    }

    /// Trade capacity between an area and an exogenous area
    pub fn exo_link(&self, area_id: &AreaID, exo_area_id: &ExoAreaID) -> Result<&ExoLink> {
        self.exo_links
            .get(&(area_id.clone(), exo_area_id.clone()))
            .with_context(|| {
                format!("No exogenous link capacity given between {area_id} and {exo_area_id}")
            })
    }
}
