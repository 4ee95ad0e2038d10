//! Derivation of unit cost and emission coefficients for thermal technologies.
//!
//! Costs depend on the fuel price, which varies by area and month, so they are keyed by
//! (technology, area, month). Emissions only depend on the technology.
//!
//! Coefficients are computed independently of one another. Where a raw value needed for a
//! coefficient is missing, that coefficient is left out for the affected keys rather than given a
//! default value.
use crate::area::AreaID;
use crate::calendar::Month;
use crate::id::define_id_type;
use crate::technology::TechnologyID;
use crate::units::{
    Dimensionless, EmissionsPerCapacity, EmissionsPerEnergy, EmissionsPerHeat, HeatPerCapacity,
    HeatPerEnergy, MoneyPerCapacity, MoneyPerEmissions, MoneyPerEnergy, MoneyPerHeat,
};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;
use std::fmt::Display;
use std::hash::Hash;

define_id_type! {FuelID}

/// The key for cost coefficients
pub type CostKey = (TechnologyID, AreaID, Month);

/// A map of cost coefficients
pub type CostMap<T> = IndexMap<CostKey, T>;

/// A map of emission coefficients
pub type EmissionsMap<T> = IndexMap<TechnologyID, T>;

/// The fuel used by a thermal technology and its base price
#[derive(Debug, Clone, PartialEq)]
pub struct FuelPrice {
    /// The fuel burnt by the technology
    pub fuel: FuelID,
    /// The base price of the fuel
    pub price: MoneyPerHeat,
}

/// Raw cost and emission parameters for a thermal technology.
///
/// Any of these may be missing from the input data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThermalCostParameters {
    /// Efficiency at full load
    pub efficiency: Option<Dimensionless>,
    /// Efficiency at half load
    pub eff50: Option<Dimensionless>,
    /// Emission factor of the fuel
    pub co2_factor: Option<EmissionsPerHeat>,
    /// Price of emissions
    pub co2_price: Option<MoneyPerEmissions>,
    /// Variable cost not related to fuel
    pub non_fuel_vom: Option<MoneyPerEnergy>,
    /// Fixed cost of starting up capacity
    pub su_fixed_cost: Option<MoneyPerCapacity>,
    /// Fuel burnt when starting up capacity
    pub su_fuel_cons: Option<HeatPerCapacity>,
    /// Fuel burnt when ramping up capacity
    pub ramp_fuel_cons: Option<HeatPerCapacity>,
}

impl ThermalCostParameters {
    /// Heat rate at full load, plus the penalty for running below full load
    fn generation_heat_rate(&self) -> Option<HeatPerEnergy> {
        let two = Dimensionless(2.0);
        let rate = two / self.efficiency? - self.eff50?.recip();
        Some(HeatPerEnergy::PER_MWH * rate)
    }

    /// Heat rate attributable to capacity being online
    fn commitment_heat_rate(&self) -> Option<HeatPerEnergy> {
        let rate = self.eff50?.recip() - self.efficiency?.recip();
        Some(HeatPerEnergy::PER_MWH * rate)
    }

    /// Heat rate at full load
    fn full_load_heat_rate(&self) -> Option<HeatPerEnergy> {
        Some(HeatPerEnergy::PER_MWH / self.efficiency?)
    }

    /// The cost of fuel including its emissions, given the (adjusted) fuel price
    fn heat_cost(&self, fuel_price: MoneyPerHeat) -> Option<MoneyPerHeat> {
        Some(fuel_price + self.co2_factor? * self.co2_price?)
    }
}

/// All raw inputs needed to derive coefficients
#[derive(Debug, Default, PartialEq)]
pub struct CostInputs {
    /// Fuel and fuel price for each thermal technology
    pub fuels: IndexMap<TechnologyID, FuelPrice>,
    /// Multiplier for fuel prices in each month
    pub fuel_time_factors: IndexMap<(FuelID, Month), Dimensionless>,
    /// Adder for fuel prices in each area
    pub fuel_area_factors: IndexMap<(FuelID, AreaID), MoneyPerHeat>,
    /// Cost parameters for each thermal technology
    pub thermal: IndexMap<TechnologyID, ThermalCostParameters>,
}

/// Derived cost and emission coefficients
#[derive(Debug, Default, PartialEq)]
pub struct Coefficients {
    /// Full variable cost of generation (vOM)
    pub variable_cost: CostMap<MoneyPerEnergy>,
    /// Cost per unit of generation (genOM)
    pub generation_cost: CostMap<MoneyPerEnergy>,
    /// Cost per unit of online capacity (onOM)
    pub commitment_cost: CostMap<MoneyPerEnergy>,
    /// Cost per unit of capacity started up
    pub startup_cost: CostMap<MoneyPerCapacity>,
    /// Cost per unit of upward ramping
    pub ramp_cost: CostMap<MoneyPerCapacity>,
    /// Emissions per unit of generation
    pub generation_emissions: EmissionsMap<EmissionsPerEnergy>,
    /// Emissions per unit of online capacity
    pub commitment_emissions: EmissionsMap<EmissionsPerEnergy>,
    /// Emissions per unit of capacity started up
    pub startup_emissions: EmissionsMap<EmissionsPerCapacity>,
    /// Emissions per unit of upward ramping
    pub ramp_emissions: EmissionsMap<EmissionsPerCapacity>,
}

/// Coefficients for the four quantities of a thermal technology which incur costs or emissions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalCoefficients {
    /// Per unit of generation
    pub generation: f64,
    /// Per unit of online capacity
    pub commitment: f64,
    /// Per unit of capacity started up
    pub startup: f64,
    /// Per unit of upward ramping
    pub ramp: f64,
}

impl Coefficients {
    /// Cost coefficients for a thermal technology in the given area and month
    pub fn thermal_costs(
        &self,
        technology_id: &TechnologyID,
        area_id: &AreaID,
        month: Month,
    ) -> Result<ThermalCoefficients> {
        let key = (technology_id.clone(), area_id.clone(), month);
        let describe = format!("{technology_id} in area {area_id} in month {month}");
        Ok(ThermalCoefficients {
            generation: lookup(&self.generation_cost, &key, "genOM", &describe)?,
            commitment: lookup(&self.commitment_cost, &key, "onOM", &describe)?,
            startup: lookup(&self.startup_cost, &key, "startup cost", &describe)?,
            ramp: lookup(&self.ramp_cost, &key, "ramp cost", &describe)?,
        })
    }

    /// Emission coefficients for a thermal technology
    pub fn thermal_emissions(&self, technology_id: &TechnologyID) -> Result<ThermalCoefficients> {
        Ok(ThermalCoefficients {
            generation: lookup(
                &self.generation_emissions,
                technology_id,
                "generation emissions",
                technology_id,
            )?,
            commitment: lookup(
                &self.commitment_emissions,
                technology_id,
                "commitment emissions",
                technology_id,
            )?,
            startup: lookup(
                &self.startup_emissions,
                technology_id,
                "startup emissions",
                technology_id,
            )?,
            ramp: lookup(
                &self.ramp_emissions,
                technology_id,
                "ramp emissions",
                technology_id,
            )?,
        })
    }
}

/// Look up a coefficient which is required by the dispatch problem
fn lookup<K, T>(map: &IndexMap<K, T>, key: &K, name: &str, describe: &dyn Display) -> Result<f64>
where
    K: Hash + Eq,
    T: Copy + Into<f64>,
{
    map.get(key)
        .copied()
        .map(Into::into)
        .with_context(|| format!("No {name} coefficient for {describe}"))
}

/// Insert a coefficient if it could be calculated and is finite
fn insert_if_valid<K, T>(map: &mut IndexMap<K, T>, key: &K, value: Option<T>, name: &str)
where
    K: std::hash::Hash + Eq + Clone + std::fmt::Debug,
    T: Copy + Into<f64>,
{
    match value {
        Some(value) if value.into().is_finite() => {
            map.insert(key.clone(), value);
        }
        _ => debug!("Dropping {name} coefficient for {key:?}: missing or invalid inputs"),
    }
}

/// Calculate the fuel price for a technology in a given area and month.
///
/// The base price is scaled by the fuel's time factor for the month and the fuel's area factor is
/// then added.
pub fn adjusted_fuel_price(
    price: MoneyPerHeat,
    time_factor: Dimensionless,
    area_factor: MoneyPerHeat,
) -> MoneyPerHeat {
    price * time_factor + area_factor
}

/// Derive cost and emission coefficients from raw cost inputs
pub fn derive_coefficients(inputs: &CostInputs) -> Coefficients {
    let mut coefficients = Coefficients::default();

    for (technology_id, fuel_price) in &inputs.fuels {
        let Some(params) = inputs.thermal.get(technology_id) else {
            debug!("No cost parameters given for {technology_id}; its coefficients are dropped");
            continue;
        };

        let time_factors = inputs
            .fuel_time_factors
            .iter()
            .filter(|((fuel, _), _)| *fuel == fuel_price.fuel);
        for ((_, month), time_factor) in time_factors {
            let area_factors = inputs
                .fuel_area_factors
                .iter()
                .filter(|((fuel, _), _)| *fuel == fuel_price.fuel);
            for ((_, area_id), area_factor) in area_factors {
                let key = (technology_id.clone(), area_id.clone(), *month);
                let price = adjusted_fuel_price(fuel_price.price, *time_factor, *area_factor);
                insert_cost_coefficients(&mut coefficients, &key, params, price);
            }
        }
    }

    for (technology_id, params) in &inputs.thermal {
        insert_emission_coefficients(&mut coefficients, technology_id, params);
    }

    coefficients
}

/// Calculate the cost coefficients for one (technology, area, month)
fn insert_cost_coefficients(
    coefficients: &mut Coefficients,
    key: &CostKey,
    params: &ThermalCostParameters,
    fuel_price: MoneyPerHeat,
) {
    let heat_cost = params.heat_cost(fuel_price);

    let variable_cost = heat_cost
        .zip(params.full_load_heat_rate())
        .zip(params.non_fuel_vom)
        .map(|((cost, rate), vom)| cost * rate + vom);
    let generation_cost = heat_cost
        .zip(params.generation_heat_rate())
        .map(|(cost, rate)| cost * rate);
    let commitment_cost = heat_cost
        .zip(params.commitment_heat_rate())
        .zip(params.non_fuel_vom)
        .map(|((cost, rate), vom)| cost * rate + vom);
    let startup_cost = heat_cost
        .zip(params.su_fuel_cons)
        .zip(params.su_fixed_cost)
        .map(|((cost, cons), fixed)| cost * cons + fixed);
    let ramp_cost = heat_cost
        .zip(params.ramp_fuel_cons)
        .map(|(cost, cons)| cost * cons);

    insert_if_valid(&mut coefficients.variable_cost, key, variable_cost, "vOM");
    insert_if_valid(&mut coefficients.generation_cost, key, generation_cost, "genOM");
    insert_if_valid(&mut coefficients.commitment_cost, key, commitment_cost, "onOM");
    insert_if_valid(&mut coefficients.startup_cost, key, startup_cost, "startup cost");
    insert_if_valid(&mut coefficients.ramp_cost, key, ramp_cost, "ramp cost");
}

/// Calculate the emission coefficients for one technology
fn insert_emission_coefficients(
    coefficients: &mut Coefficients,
    technology_id: &TechnologyID,
    params: &ThermalCostParameters,
) {
    let co2_factor = params.co2_factor;
    let generation = co2_factor
        .zip(params.generation_heat_rate())
        .map(|(factor, rate)| factor * rate);
    let commitment = co2_factor
        .zip(params.commitment_heat_rate())
        .map(|(factor, rate)| factor * rate);
    let startup = co2_factor
        .zip(params.su_fuel_cons)
        .map(|(factor, cons)| factor * cons);
    let ramp = co2_factor
        .zip(params.ramp_fuel_cons)
        .map(|(factor, cons)| factor * cons);

    insert_if_valid(
        &mut coefficients.generation_emissions,
        technology_id,
        generation,
        "generation emissions",
    );
    insert_if_valid(
        &mut coefficients.commitment_emissions,
        technology_id,
        commitment,
        "commitment emissions",
    );
    insert_if_valid(
        &mut coefficients.startup_emissions,
        technology_id,
        startup,
        "startup emissions",
    );
    insert_if_valid(
        &mut coefficients.ramp_emissions,
        technology_id,
        ramp,
        "ramp emissions",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, cost_inputs, thermal_cost_parameters};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn key(area: &str, month: Month) -> CostKey {
        ("gas".into(), area.into(), month)
    }

    #[test]
    fn test_adjusted_fuel_price() {
        let price = adjusted_fuel_price(MoneyPerHeat(10.0), Dimensionless(1.2), MoneyPerHeat(0.5));
        assert_approx_eq!(f64, price.value(), 12.5, epsilon = 1e-9);
    }

    #[rstest]
    fn test_derive_coefficients_no_carbon(cost_inputs: CostInputs) {
        let coefficients = derive_coefficients(&cost_inputs);

        // Heat cost is 10 EUR/GJ; heat rates are 7.2, 5.4 and 1.8 GJ/MWh
        let key = key("FR", 1);
        assert_approx_eq!(f64, coefficients.variable_cost[&key].value(), 72.0, epsilon = 1e-9);
        assert_approx_eq!(f64, coefficients.generation_cost[&key].value(), 54.0, epsilon = 1e-9);
        assert_approx_eq!(f64, coefficients.commitment_cost[&key].value(), 18.0, epsilon = 1e-9);
        assert_approx_eq!(f64, coefficients.startup_cost[&key].value(), 0.0, epsilon = 1e-9);
        assert_approx_eq!(f64, coefficients.ramp_cost[&key].value(), 0.0, epsilon = 1e-9);
        assert_approx_eq!(
            f64,
            coefficients.generation_emissions[&TechnologyID::new("gas")].value(),
            0.0,
            epsilon = 1e-9
        );
    }

    #[rstest]
    fn test_derive_coefficients_joins(mut cost_inputs: CostInputs) {
        let fuel: FuelID = "natural_gas".into();
        cost_inputs
            .fuel_time_factors
            .insert((fuel.clone(), 2), Dimensionless(2.0));
        cost_inputs
            .fuel_area_factors
            .insert((fuel, "DE".into()), MoneyPerHeat(1.0));
        let coefficients = derive_coefficients(&cost_inputs);

        // One entry per (month, area) combination with factors for the fuel
        assert_eq!(coefficients.generation_cost.len(), 4);

        // 10 * 2 + 1 = 21 EUR/GJ
        assert_approx_eq!(
            f64,
            coefficients.generation_cost[&key("DE", 2)].value(),
            21.0 * 5.4,
            epsilon = 1e-9
        );
    }

    #[rstest]
    fn test_derive_coefficients_with_carbon(mut cost_inputs: CostInputs) {
        let params = cost_inputs.thermal.get_mut("gas").unwrap();
        params.co2_factor = Some(EmissionsPerHeat(100.0));
        params.co2_price = Some(MoneyPerEmissions(50.0));
        params.su_fuel_cons = Some(HeatPerCapacity(2.0));
        params.su_fixed_cost = Some(MoneyPerCapacity(3.0));
        params.ramp_fuel_cons = Some(HeatPerCapacity(1.0));
        params.non_fuel_vom = Some(MoneyPerEnergy(1.0));
        let coefficients = derive_coefficients(&cost_inputs);

        // Heat cost is 10 + 100 * 50 / 1000 = 15 EUR/GJ
        let key = key("FR", 1);
        assert_approx_eq!(
            f64,
            coefficients.variable_cost[&key].value(),
            15.0 * 7.2 + 1.0,
            epsilon = 1e-9
        );
        assert_approx_eq!(
            f64,
            coefficients.generation_cost[&key].value(),
            15.0 * 5.4,
            epsilon = 1e-9
        );
        assert_approx_eq!(
            f64,
            coefficients.commitment_cost[&key].value(),
            15.0 * 1.8 + 1.0,
            epsilon = 1e-9
        );
        assert_approx_eq!(
            f64,
            coefficients.startup_cost[&key].value(),
            15.0 * 2.0 + 3.0,
            epsilon = 1e-9
        );
        assert_approx_eq!(f64, coefficients.ramp_cost[&key].value(), 15.0, epsilon = 1e-9);

        let gas = TechnologyID::new("gas");
        assert_approx_eq!(
            f64,
            coefficients.generation_emissions[&gas].value(),
            540.0,
            epsilon = 1e-9
        );
        assert_approx_eq!(
            f64,
            coefficients.commitment_emissions[&gas].value(),
            180.0,
            epsilon = 1e-9
        );
        assert_approx_eq!(f64, coefficients.startup_emissions[&gas].value(), 200.0, epsilon = 1e-9);
        assert_approx_eq!(f64, coefficients.ramp_emissions[&gas].value(), 100.0, epsilon = 1e-9);
    }

    #[rstest]
    fn test_thermal_costs(cost_inputs: CostInputs) {
        let coefficients = derive_coefficients(&cost_inputs);
        let costs = coefficients
            .thermal_costs(&"gas".into(), &"FR".into(), 1)
            .unwrap();
        assert_approx_eq!(f64, costs.generation, 54.0, epsilon = 1e-9);
        assert_approx_eq!(f64, costs.commitment, 18.0, epsilon = 1e-9);
    }

    #[rstest]
    fn test_thermal_costs_missing(cost_inputs: CostInputs) {
        let coefficients = derive_coefficients(&cost_inputs);
        assert_error!(
            coefficients.thermal_costs(&"gas".into(), &"FR".into(), 7),
            "No genOM coefficient for gas in area FR in month 7"
        );
    }

    #[rstest]
    fn test_derive_coefficients_missing_values(mut cost_inputs: CostInputs) {
        let params = cost_inputs.thermal.get_mut("gas").unwrap();
        params.eff50 = None;
        params.su_fuel_cons = None;
        let coefficients = derive_coefficients(&cost_inputs);

        // Coefficients needing the missing values are dropped; the others are kept
        let key = key("FR", 1);
        assert!(coefficients.variable_cost.contains_key(&key));
        assert!(!coefficients.generation_cost.contains_key(&key));
        assert!(!coefficients.commitment_cost.contains_key(&key));
        assert!(!coefficients.startup_cost.contains_key(&key));
        assert!(coefficients.ramp_cost.contains_key(&key));
        assert!(coefficients.generation_emissions.is_empty());
        assert!(coefficients.startup_emissions.is_empty());
    }

    #[rstest]
    fn test_derive_coefficients_missing_join(
        mut cost_inputs: CostInputs,
        thermal_cost_parameters: ThermalCostParameters,
    ) {
        // A technology whose fuel has no time factors
        cost_inputs.fuels.insert(
            "coal".into(),
            FuelPrice {
                fuel: "hard_coal".into(),
                price: MoneyPerHeat(3.0),
            },
        );
        cost_inputs
            .thermal
            .insert("coal".into(), thermal_cost_parameters);
        let coefficients = derive_coefficients(&cost_inputs);

        assert!(
            coefficients
                .generation_cost
                .keys()
                .all(|(technology_id, _, _)| *technology_id == TechnologyID::new("gas"))
        );
        assert!(
            coefficients
                .generation_emissions
                .contains_key(&TechnologyID::new("coal"))
        );
    }

    #[test]
    fn test_derive_coefficients_infinite() {
        let params = ThermalCostParameters {
            efficiency: Some(Dimensionless(0.0)),
            eff50: Some(Dimensionless(0.4)),
            co2_factor: Some(EmissionsPerHeat(0.0)),
            ..Default::default()
        };
        let mut coefficients = Coefficients::default();
        insert_emission_coefficients(&mut coefficients, &"gas".into(), &params);
        assert!(coefficients.generation_emissions.is_empty());
    }
}
