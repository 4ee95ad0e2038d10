//! Code for reading parameters of thermal technologies.
use super::*;
use crate::calendar::Calendar;
use crate::coefficients::ThermalCostParameters;
use crate::fleet::ThermalOperation;
use crate::id::IDCollection;
use crate::technology::{TechnologyID, TechnologySets};
use crate::units::{
    EmissionsPerHeat, HeatPerCapacity, MoneyPerCapacity, MoneyPerEmissions, MoneyPerEnergy,
};
use serde::Deserialize;

const THERMAL_PARAMETERS_FILE_NAME: &str = "thermal_parameters.csv";

/// A map of thermal operational limits, keyed by technology
pub type ThermalOperationMap = IndexMap<TechnologyID, ThermalOperation>;

/// A map of raw thermal cost parameters, keyed by technology
pub type ThermalCostMap = IndexMap<TechnologyID, ThermalCostParameters>;

/// A row of the thermal parameters file.
///
/// Empty cost cells are treated as missing values.
#[derive(Debug, Deserialize, PartialEq)]
struct ThermalParametersRaw {
    technology_id: String,
    efficiency: Option<Dimensionless>,
    eff50: Option<Dimensionless>,
    co2_factor: Option<EmissionsPerHeat>,
    co2_price: Option<MoneyPerEmissions>,
    non_fuel_vom: Option<MoneyPerEnergy>,
    su_fixed_cost: Option<MoneyPerCapacity>,
    su_fuel_cons: Option<HeatPerCapacity>,
    ramp_fuel_cons: Option<HeatPerCapacity>,
    #[serde(deserialize_with = "deserialise_proportion")]
    min_stable_gen: Dimensionless,
    min_time_on: usize,
    min_time_off: usize,
}

/// Read operational limits and cost parameters for thermal technologies.
///
/// Every thermal technology must have exactly one row.
pub fn read_thermal_parameters(
    model_dir: &Path,
    technology_sets: &TechnologySets,
    calendar: &Calendar,
) -> Result<(ThermalOperationMap, ThermalCostMap)> {
    let file_path = model_dir.join(THERMAL_PARAMETERS_FILE_NAME);
    let rows = read_csv_optional::<ThermalParametersRaw>(&file_path)?;
    read_thermal_parameters_from_iter(rows.into_iter(), technology_sets, calendar)
        .with_context(|| input_err_msg(&file_path))
}

fn read_thermal_parameters_from_iter<I>(
    iter: I,
    technology_sets: &TechnologySets,
    calendar: &Calendar,
) -> Result<(ThermalOperationMap, ThermalCostMap)>
where
    I: Iterator<Item = ThermalParametersRaw>,
{
    let mut operation = ThermalOperationMap::new();
    let mut costs = ThermalCostMap::new();
    for row in iter {
        let technology_id = technology_sets
            .thermal
            .get_id_by_str(&row.technology_id)
            .with_context(|| format!("{} is not a thermal technology", row.technology_id))?;
        for (duration, name) in [(row.min_time_on, "min_time_on"), (row.min_time_off, "min_time_off")]
        {
            calendar
                .check_duration(duration)
                .with_context(|| format!("Invalid {name} for {technology_id}"))?;
        }

        try_insert(
            &mut operation,
            technology_id.clone(),
            ThermalOperation {
                min_stable_generation: row.min_stable_gen,
                min_time_on: row.min_time_on,
                min_time_off: row.min_time_off,
            },
        )?;
        costs.insert(
            technology_id,
            ThermalCostParameters {
                efficiency: row.efficiency,
                eff50: row.eff50,
                co2_factor: row.co2_factor,
                co2_price: row.co2_price,
                non_fuel_vom: row.non_fuel_vom,
                su_fixed_cost: row.su_fixed_cost,
                su_fuel_cons: row.su_fuel_cons,
                ramp_fuel_cons: row.ramp_fuel_cons,
            },
        );
    }

    for technology_id in &technology_sets.thermal {
        ensure!(
            operation.contains_key(technology_id),
            "No thermal parameters given for {technology_id}"
        );
    }

    Ok((operation, costs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, calendar, technology_sets};
    use rstest::rstest;

    fn raw(technology_id: &str, min_time_on: usize) -> ThermalParametersRaw {
        ThermalParametersRaw {
            technology_id: technology_id.into(),
            efficiency: Some(Dimensionless(0.5)),
            eff50: None,
            co2_factor: None,
            co2_price: None,
            non_fuel_vom: None,
            su_fixed_cost: None,
            su_fuel_cons: None,
            ramp_fuel_cons: None,
            min_stable_gen: Dimensionless(0.3),
            min_time_on,
            min_time_off: 1,
        }
    }

    #[rstest]
    fn test_read_thermal_parameters(technology_sets: TechnologySets, calendar: Calendar) {
        let (operation, costs) = read_thermal_parameters_from_iter(
            [raw("gas", 2)].into_iter(),
            &technology_sets,
            &calendar,
        )
        .unwrap();
        assert_eq!(operation["gas"].min_time_on, 2);
        assert_eq!(costs["gas"].efficiency, Some(Dimensionless(0.5)));
        assert!(costs["gas"].eff50.is_none());
    }

    #[rstest]
    fn test_read_thermal_parameters_missing(technology_sets: TechnologySets, calendar: Calendar) {
        assert_error!(
            read_thermal_parameters_from_iter([].into_iter(), &technology_sets, &calendar),
            "No thermal parameters given for gas"
        );
    }

    #[rstest]
    fn test_read_thermal_parameters_not_thermal(
        technology_sets: TechnologySets,
        calendar: Calendar,
    ) {
        assert_error!(
            read_thermal_parameters_from_iter([raw("pv", 2)].into_iter(), &technology_sets, &calendar),
            "pv is not a thermal technology"
        );
    }

    #[rstest]
    fn test_read_thermal_parameters_duration_too_long(
        technology_sets: TechnologySets,
        calendar: Calendar,
    ) {
        assert_error!(
            read_thermal_parameters_from_iter([raw("gas", 6)].into_iter(), &technology_sets, &calendar),
            "Invalid min_time_on for gas"
        );
    }
}
