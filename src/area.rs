//! Areas are the regions whose demand, fleet and storage are modelled explicitly. Exogenous areas
//! are neighbours which are represented only by a price and bounded trade capacity.
use crate::id::{define_id_getter, define_id_type};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;

define_id_type! {AreaID}
define_id_type! {ExoAreaID}

/// A map of [`Area`]s, keyed by area ID
pub type AreaMap = IndexMap<AreaID, Area>;

/// A map of [`ExoArea`]s, keyed by exogenous area ID
pub type ExoAreaMap = IndexMap<ExoAreaID, ExoArea>;

/// A modelled area with its own demand, fleet and storage
#[derive(Debug, Deserialize, PartialEq)]
pub struct Area {
    /// A unique identifier for the area (e.g. "FR")
    pub id: AreaID,
    /// A text description of the area
    pub description: String,
}
define_id_getter! {Area, AreaID}

/// A neighbouring area which is not modelled, but can be traded with
#[derive(Debug, Deserialize, PartialEq)]
pub struct ExoArea {
    /// A unique identifier for the exogenous area
    pub id: ExoAreaID,
    /// A text description of the exogenous area
    pub description: String,
}
define_id_getter! {ExoArea, ExoAreaID}

/// Check that no ID is used both for a modelled and an exogenous area
pub fn check_areas_disjoint(areas: &AreaMap, exo_areas: &ExoAreaMap) -> Result<()> {
    for id in exo_areas.keys() {
        ensure!(
            !areas.contains_key(&*id.0),
            "Area {id} is listed both as a modelled and an exogenous area"
        );
    }

    Ok(())
}

/// Iterate over ordered pairs of distinct areas, i.e. the possible trade links
pub fn iter_area_pairs(areas: &AreaMap) -> impl Iterator<Item = (&AreaID, &AreaID)> {
    areas.keys().flat_map(move |a1| {
        areas
            .keys()
            .filter(move |a2| *a2 != a1)
            .map(move |a2| (a1, a2))
    })
}
