//! Code for reading fuel prices and price factors.
use super::*;
use crate::area::{AreaID, AreaMap};
use crate::calendar::{Calendar, Month};
use crate::coefficients::{CostInputs, FuelID, FuelPrice, ThermalCostParameters};
use crate::id::IDCollection;
use crate::technology::{TechnologyID, TechnologySets};
use crate::units::MoneyPerHeat;
use log::warn;
use serde::Deserialize;

const FUELS_FILE_NAME: &str = "fuels.csv";
const FUEL_TIME_FACTORS_FILE_NAME: &str = "fuel_time_factors.csv";
const FUEL_AREA_FACTORS_FILE_NAME: &str = "fuel_area_factors.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct FuelRaw {
    technology_id: String,
    fuel: FuelID,
    price: MoneyPerHeat,
}

#[derive(Debug, Deserialize, PartialEq)]
struct FuelTimeFactorRaw {
    fuel: FuelID,
    month: Month,
    value: Dimensionless,
}

#[derive(Debug, Deserialize, PartialEq)]
struct FuelAreaFactorRaw {
    fuel: FuelID,
    area_id: String,
    value: MoneyPerHeat,
}

/// Read the inputs needed to derive cost coefficients.
///
/// All files are optional. Coefficients which cannot be derived are left out, so a model without
/// thermal technologies needs none of these files.
pub fn read_cost_inputs(
    model_dir: &Path,
    areas: &AreaMap,
    technology_sets: &TechnologySets,
    calendar: &Calendar,
    thermal: IndexMap<TechnologyID, ThermalCostParameters>,
) -> Result<CostInputs> {
    let file_path = model_dir.join(FUELS_FILE_NAME);
    let rows = read_csv_optional::<FuelRaw>(&file_path)?;
    let fuels = read_fuels_from_iter(rows.into_iter(), technology_sets)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(FUEL_TIME_FACTORS_FILE_NAME);
    let rows = read_csv_optional::<FuelTimeFactorRaw>(&file_path)?;
    let fuel_time_factors = read_time_factors_from_iter(rows.into_iter(), calendar)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(FUEL_AREA_FACTORS_FILE_NAME);
    let rows = read_csv_optional::<FuelAreaFactorRaw>(&file_path)?;
    let fuel_area_factors = read_area_factors_from_iter(rows.into_iter(), areas)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(CostInputs {
        fuels,
        fuel_time_factors,
        fuel_area_factors,
        thermal,
    })
}

fn read_fuels_from_iter<I>(
    iter: I,
    technology_sets: &TechnologySets,
) -> Result<IndexMap<TechnologyID, FuelPrice>>
where
    I: Iterator<Item = FuelRaw>,
{
    let mut fuels = IndexMap::new();
    for row in iter {
        let technology_id = technology_sets
            .thermal
            .get_id_by_str(&row.technology_id)
            .with_context(|| format!("{} is not a thermal technology", row.technology_id))?;
        let fuel_price = FuelPrice {
            fuel: row.fuel,
            price: row.price,
        };
        try_insert(&mut fuels, technology_id, fuel_price)?;
    }

    Ok(fuels)
}

fn read_time_factors_from_iter<I>(
    iter: I,
    calendar: &Calendar,
) -> Result<IndexMap<(FuelID, Month), Dimensionless>>
where
    I: Iterator<Item = FuelTimeFactorRaw>,
{
    let mut factors = IndexMap::new();
    for row in iter {
        check_non_negative(row.value.value(), "value")?;
        if !calendar.contains_month(row.month) {
            warn!(
                "Fuel time factor given for month {} which is not modelled",
                row.month
            );
        }
        try_insert(&mut factors, (row.fuel, row.month), row.value)?;
    }

    Ok(factors)
}

fn read_area_factors_from_iter<I>(
    iter: I,
    areas: &AreaMap,
) -> Result<IndexMap<(FuelID, AreaID), MoneyPerHeat>>
where
    I: Iterator<Item = FuelAreaFactorRaw>,
{
    let mut factors = IndexMap::new();
    for row in iter {
        let area_id = areas.get_id_by_str(&row.area_id)?;
        ensure!(row.value.is_finite(), "Fuel area factors must be finite");
        try_insert(&mut factors, (row.fuel, area_id), row.value)?;
    }

    Ok(factors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{areas, assert_error, calendar, technology_sets};
    use rstest::rstest;

    #[rstest]
    fn test_read_fuels(technology_sets: TechnologySets) {
        let rows = [FuelRaw {
            technology_id: "gas".into(),
            fuel: "natural_gas".into(),
            price: MoneyPerHeat(8.0),
        }];
        let fuels = read_fuels_from_iter(rows.into_iter(), &technology_sets).unwrap();
        assert_eq!(fuels["gas"].fuel, FuelID::new("natural_gas"));
    }

    #[rstest]
    fn test_read_fuels_not_thermal(technology_sets: TechnologySets) {
        let rows = [FuelRaw {
            technology_id: "battery".into(),
            fuel: "natural_gas".into(),
            price: MoneyPerHeat(8.0),
        }];
        assert_error!(
            read_fuels_from_iter(rows.into_iter(), &technology_sets),
            "battery is not a thermal technology"
        );
    }

    #[rstest]
    fn test_read_time_factors_duplicate(calendar: Calendar) {
        let row = || FuelTimeFactorRaw {
            fuel: "natural_gas".into(),
            month: 1,
            value: Dimensionless(1.1),
        };
        assert!(read_time_factors_from_iter([row(), row()].into_iter(), &calendar).is_err());
    }

    #[rstest]
    fn test_read_area_factors(areas: AreaMap) {
        let rows = [FuelAreaFactorRaw {
            fuel: "natural_gas".into(),
            area_id: "DE".into(),
            value: MoneyPerHeat(-0.5),
        }];
        let factors = read_area_factors_from_iter(rows.into_iter(), &areas).unwrap();
        assert_eq!(
            factors[&(FuelID::new("natural_gas"), AreaID::new("DE"))],
            MoneyPerHeat(-0.5)
        );
    }
}
