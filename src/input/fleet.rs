//! Code for reading capacities and other fleet parameters.
use super::*;
use crate::area::{AreaID, AreaMap};
use crate::calendar::{Calendar, Month, Week};
use crate::fleet::{Availability, Fleet, HydroLimits, ThermalOperation};
use crate::id::IDCollection;
use crate::technology::{TechnologyID, TechnologyMap, TechnologySets};
use crate::units::MoneyPerEnergy;
use indexmap::IndexSet;
use log::warn;
use serde::Deserialize;

const CAPACITIES_FILE_NAME: &str = "capacities.csv";
const CHARGE_CAPACITIES_FILE_NAME: &str = "charge_capacities.csv";
const STORAGE_CAPACITIES_FILE_NAME: &str = "storage_capacities.csv";
const AVAILABILITY_FILE_NAME: &str = "availability.csv";
const NUCLEAR_AVAILABILITY_FILE_NAME: &str = "nuclear_availability.csv";
const HYDRO_LIMITS_FILE_NAME: &str = "hydro_limits.csv";
const LAKE_INFLOWS_FILE_NAME: &str = "lake_inflows.csv";
const RESERVE_REQUIREMENTS_FILE_NAME: &str = "reserve_requirements.csv";
const STORAGE_COSTS_FILE_NAME: &str = "storage_costs.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct AreaTechnologyValueRaw {
    area_id: String,
    technology_id: String,
    value: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct AvailabilityRaw {
    area_id: String,
    technology_id: String,
    #[serde(deserialize_with = "deserialise_proportion")]
    max_af: Dimensionless,
    #[serde(deserialize_with = "deserialise_proportion")]
    yearly_af: Dimensionless,
}

#[derive(Debug, Deserialize, PartialEq)]
struct NuclearAvailabilityRaw {
    area_id: String,
    week: Week,
    #[serde(deserialize_with = "deserialise_proportion")]
    value: Dimensionless,
}

#[derive(Debug, Deserialize, PartialEq)]
struct HydroLimitsRaw {
    area_id: String,
    month: Month,
    max_in: Dimensionless,
    max_out: Dimensionless,
}

#[derive(Debug, Deserialize, PartialEq)]
struct LakeInflowRaw {
    area_id: String,
    month: Month,
    value: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct TechnologyValueRaw {
    technology_id: String,
    value: f64,
}

/// Read the fleet of each area from the specified model directory.
///
/// Only the capacities file is required. Missing values for parameters which turn out to be needed
/// are reported when the problem is built.
pub fn read_fleet(
    model_dir: &Path,
    areas: &AreaMap,
    technologies: &TechnologyMap,
    technology_sets: &TechnologySets,
    calendar: &Calendar,
    thermal: IndexMap<TechnologyID, ThermalOperation>,
) -> Result<Fleet> {
    let capacities = read_capacity_file(model_dir, CAPACITIES_FILE_NAME, true, areas, technologies)?;
    let charge_capacities = read_capacity_file(
        model_dir,
        CHARGE_CAPACITIES_FILE_NAME,
        false,
        areas,
        &technology_sets.storage,
    )?;
    let storage_capacities = read_capacity_file(
        model_dir,
        STORAGE_CAPACITIES_FILE_NAME,
        false,
        areas,
        &technology_sets.storage,
    )?;
    let availability =
        read_availability(&model_dir.join(AVAILABILITY_FILE_NAME), areas, technology_sets)?;
    let nuclear_availability = read_nuclear_availability(
        &model_dir.join(NUCLEAR_AVAILABILITY_FILE_NAME),
        areas,
        calendar,
    )?;
    let (hydro_limits, lake_inflows) = read_hydro(model_dir, areas, calendar)?;

    let file_path = model_dir.join(RESERVE_REQUIREMENTS_FILE_NAME);
    let rows = read_csv_optional::<TechnologyValueRaw>(&file_path)?;
    let reserve_requirements = read_technology_values(rows.into_iter(), &technology_sets.vre)
        .and_then(|values| {
            values
                .into_iter()
                .map(|(id, value)| {
                    ensure!(
                        value <= 1.0,
                        "Reserve requirement for {id} must be between 0 and 1 (got {value})"
                    );
                    Ok((id, Dimensionless(value)))
                })
                .collect::<Result<IndexMap<_, _>>>()
        })
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(STORAGE_COSTS_FILE_NAME);
    let rows = read_csv_optional::<TechnologyValueRaw>(&file_path)?;
    let storage_costs = read_technology_values(rows.into_iter(), &technology_sets.storage)
        .with_context(|| input_err_msg(&file_path))?
        .into_iter()
        .map(|(id, value)| (id, MoneyPerEnergy(value)))
        .collect();

    Ok(Fleet {
        capacities,
        charge_capacities,
        storage_capacities,
        availability,
        nuclear_availability,
        hydro_limits,
        lake_inflows,
        thermal,
        reserve_requirements,
        storage_costs,
    })
}

/// Read a file of capacities for the given technologies
fn read_capacity_file(
    model_dir: &Path,
    file_name: &str,
    required: bool,
    areas: &AreaMap,
    technology_ids: &dyn IDCollection<TechnologyID>,
) -> Result<IndexMap<(AreaID, TechnologyID), f64>> {
    let file_path = model_dir.join(file_name);
    let rows = if required {
        read_csv::<AreaTechnologyValueRaw>(&file_path)?
    } else {
        read_csv_optional::<AreaTechnologyValueRaw>(&file_path)?
    };

    read_area_technology_values(rows.into_iter(), areas, technology_ids)
        .with_context(|| input_err_msg(&file_path))
}

/// Read non-negative values keyed by area and technology.
///
/// Technologies must be found in `technology_ids`.
fn read_area_technology_values<I>(
    iter: I,
    areas: &AreaMap,
    technology_ids: &dyn IDCollection<TechnologyID>,
) -> Result<IndexMap<(AreaID, TechnologyID), f64>>
where
    I: Iterator<Item = AreaTechnologyValueRaw>,
{
    let mut map = IndexMap::new();
    for row in iter {
        let area_id = areas.get_id_by_str(&row.area_id)?;
        let technology_id = technology_ids.get_id_by_str(&row.technology_id)?;
        check_non_negative(row.value, "value")?;
        try_insert(&mut map, (area_id, technology_id), row.value)?;
    }

    Ok(map)
}

/// Read non-negative values keyed by technology
fn read_technology_values<I>(
    iter: I,
    technology_ids: &IndexSet<TechnologyID>,
) -> Result<IndexMap<TechnologyID, f64>>
where
    I: Iterator<Item = TechnologyValueRaw>,
{
    let mut map = IndexMap::new();
    for row in iter {
        let technology_id = technology_ids.get_id_by_str(&row.technology_id)?;
        check_non_negative(row.value, "value")?;
        try_insert(&mut map, technology_id, row.value)?;
    }

    Ok(map)
}

fn read_availability(
    file_path: &Path,
    areas: &AreaMap,
    technology_sets: &TechnologySets,
) -> Result<IndexMap<(AreaID, TechnologyID), Availability>> {
    let rows = read_csv_optional::<AvailabilityRaw>(file_path)?;
    let read = || -> Result<_> {
        let mut map = IndexMap::new();
        for row in rows {
            let area_id = areas.get_id_by_str(&row.area_id)?;
            let technology_id = technology_sets
                .thermal
                .get_id_by_str(&row.technology_id)
                .with_context(|| format!("{} is not a thermal technology", row.technology_id))?;
            let availability = Availability {
                max: row.max_af,
                yearly: row.yearly_af,
            };
            try_insert(&mut map, (area_id, technology_id), availability)?;
        }

        Ok(map)
    };

    read().with_context(|| input_err_msg(file_path))
}

fn read_nuclear_availability(
    file_path: &Path,
    areas: &AreaMap,
    calendar: &Calendar,
) -> Result<IndexMap<(AreaID, Week), Dimensionless>> {
    let rows = read_csv_optional::<NuclearAvailabilityRaw>(file_path)?;
    let read = || -> Result<_> {
        let mut map = IndexMap::new();
        for row in rows {
            let area_id = areas.get_id_by_str(&row.area_id)?;
            if !calendar.contains_week(row.week) {
                warn!("Nuclear availability given for week {} which is not modelled", row.week);
            }
            try_insert(&mut map, (area_id, row.week), row.value)?;
        }

        Ok(map)
    };

    read().with_context(|| input_err_msg(file_path))
}

/// Hydro limits and lake inflows, both keyed by area and month
type HydroInputs = (
    IndexMap<(AreaID, Month), HydroLimits>,
    IndexMap<(AreaID, Month), f64>,
);

fn read_hydro(model_dir: &Path, areas: &AreaMap, calendar: &Calendar) -> Result<HydroInputs> {
    let file_path = model_dir.join(HYDRO_LIMITS_FILE_NAME);
    let rows = read_csv_optional::<HydroLimitsRaw>(&file_path)?;
    let read_limits = || -> Result<_> {
        let mut map = IndexMap::new();
        for row in rows {
            let area_id = areas.get_id_by_str(&row.area_id)?;
            check_non_negative(row.max_in.value(), "max_in")?;
            check_non_negative(row.max_out.value(), "max_out")?;
            let limits = HydroLimits {
                max_in: row.max_in,
                max_out: row.max_out,
            };
            try_insert(&mut map, (area_id, row.month), limits)?;
        }

        Ok(map)
    };
    let hydro_limits = read_limits().with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(LAKE_INFLOWS_FILE_NAME);
    let rows = read_csv_optional::<LakeInflowRaw>(&file_path)?;
    let read_inflows = || -> Result<_> {
        let mut map = IndexMap::new();
        for row in rows {
            let area_id = areas.get_id_by_str(&row.area_id)?;
            check_non_negative(row.value, "value")?;
            if !calendar.contains_month(row.month) {
                warn!("Lake inflow given for month {} which is not modelled", row.month);
            }
            try_insert(&mut map, (area_id, row.month), row.value)?;
        }

        Ok(map)
    };
    let lake_inflows = read_inflows().with_context(|| input_err_msg(&file_path))?;

    Ok((hydro_limits, lake_inflows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{areas, assert_error, technologies, technology_sets};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn row(area_id: &str, technology_id: &str, value: f64) -> AreaTechnologyValueRaw {
        AreaTechnologyValueRaw {
            area_id: area_id.into(),
            technology_id: technology_id.into(),
            value,
        }
    }

    #[rstest]
    fn test_read_area_technology_values(areas: AreaMap, technologies: TechnologyMap) {
        let rows = [row("FR", "gas", 10.0), row("DE", "gas", 5.0)];
        let map = read_area_technology_values(rows.into_iter(), &areas, &technologies).unwrap();
        assert_eq!(map.len(), 2);
        assert_approx_eq!(
            f64,
            map[&(AreaID::new("DE"), TechnologyID::new("gas"))],
            5.0
        );
    }

    #[rstest]
    fn test_read_area_technology_values_duplicate(areas: AreaMap, technologies: TechnologyMap) {
        let rows = [row("FR", "gas", 10.0), row("FR", "gas", 5.0)];
        assert!(read_area_technology_values(rows.into_iter(), &areas, &technologies).is_err());
    }

    #[rstest]
    fn test_read_area_technology_values_negative(areas: AreaMap, technologies: TechnologyMap) {
        let rows = [row("FR", "gas", -1.0)];
        assert_error!(
            read_area_technology_values(rows.into_iter(), &areas, &technologies),
            "value must be a finite number greater than or equal to zero (got -1)"
        );
    }

    #[rstest]
    fn test_read_area_technology_values_wrong_set(areas: AreaMap, technology_sets: TechnologySets) {
        let rows = [row("FR", "gas", 1.0)];
        assert_error!(
            read_area_technology_values(rows.into_iter(), &areas, &technology_sets.storage),
            "Unknown ID gas found"
        );
    }

    #[rstest]
    fn test_read_technology_values(technology_sets: TechnologySets) {
        let rows = [TechnologyValueRaw {
            technology_id: "pv".into(),
            value: 0.05,
        }];
        let map = read_technology_values(rows.into_iter(), &technology_sets.vre).unwrap();
        assert_approx_eq!(f64, map["pv"], 0.05);
    }
}
