//! Fixtures for tests
//!
//! The fixture model has two areas (FR and DE) over six hours, split into two months and two weeks.
//! Each area has one technology of each kind: `pv` (VRE), `gas` (thermal), `battery` (storage) and
//! `nmd` (non-market).
use crate::area::{Area, AreaMap};
use crate::calendar::Calendar;
use crate::coefficients::{CostInputs, FuelID, FuelPrice, ThermalCostParameters, derive_coefficients};
use crate::fleet::{AreaTechnologyKey, Availability, Fleet, HydroLimits, ThermalOperation};
use crate::model::{Model, ModelParameters, parameters::StorageEfficiency};
use crate::series::HourlySeries;
use crate::technology::{Technology, TechnologyMap, TechnologySetKind, TechnologySets};
use crate::trade::TradeLimits;
use crate::units::{
    Dimensionless, EmissionsPerHeat, HeatPerCapacity, MoneyPerCapacity, MoneyPerEmissions,
    MoneyPerEnergy, MoneyPerHeat,
};
use indexmap::indexmap;
use itertools::iproduct;
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn areas() -> AreaMap {
    [("FR", "France"), ("DE", "Germany")]
        .into_iter()
        .map(|(id, description)| {
            let area = Area {
                id: id.into(),
                description: description.into(),
            };
            (area.id.clone(), area)
        })
        .collect()
}

#[fixture]
pub fn technologies() -> TechnologyMap {
    [("pv", "solar"), ("gas", "gas"), ("battery", "battery"), ("nmd", "nmd")]
        .into_iter()
        .map(|(id, group)| {
            let technology = Technology {
                id: id.into(),
                group: group.into(),
            };
            (technology.id.clone(), technology)
        })
        .collect()
}

#[fixture]
pub fn technology_sets() -> TechnologySets {
    let memberships = [
        (TechnologySetKind::Vre, "pv"),
        (TechnologySetKind::Thermal, "gas"),
        (TechnologySetKind::Storage, "battery"),
        (TechnologySetKind::NonMarket, "nmd"),
        (TechnologySetKind::Frr, "gas"),
        (TechnologySetKind::Frr, "battery"),
    ]
    .into_iter()
    .map(|(kind, id)| (kind, id.into()));

    TechnologySets::from_memberships(&technologies(), memberships).unwrap()
}

#[fixture]
pub fn calendar() -> Calendar {
    Calendar::new([
        (0, 1, 1),
        (1, 1, 1),
        (2, 1, 1),
        (3, 2, 2),
        (4, 2, 2),
        (5, 2, 2),
    ])
    .unwrap()
}

/// A fleet with no storage costs and no nuclear or hydro parameters
#[fixture]
pub fn fleet() -> Fleet {
    let areas = ["FR", "DE"];
    let capacities = [("pv", 20.0), ("gas", 100.0), ("battery", 10.0)];
    Fleet {
        capacities: iproduct!(areas, capacities)
            .map(|(area, (technology, value))| ((area.into(), technology.into()), value))
            .collect(),
        charge_capacities: areas
            .iter()
            .map(|area| (((*area).into(), "battery".into()), 10.0))
            .collect(),
        storage_capacities: areas
            .iter()
            .map(|area| (((*area).into(), "battery".into()), 0.05))
            .collect(),
        availability: areas
            .iter()
            .map(|area| {
                let availability = Availability {
                    max: Dimensionless(0.9),
                    yearly: Dimensionless(0.8),
                };
                (((*area).into(), "gas".into()), availability)
            })
            .collect(),
        thermal: indexmap! {
            "gas".into() => ThermalOperation {
                min_stable_generation: Dimensionless(0.3),
                min_time_on: 2,
                min_time_off: 1,
            }
        },
        reserve_requirements: indexmap! {"pv".into() => Dimensionless(0.05)},
        ..Default::default()
    }
}

#[fixture]
pub fn thermal_cost_parameters() -> ThermalCostParameters {
    ThermalCostParameters {
        efficiency: Some(Dimensionless(0.5)),
        eff50: Some(Dimensionless(0.4)),
        co2_factor: Some(EmissionsPerHeat(0.0)),
        co2_price: Some(MoneyPerEmissions(0.0)),
        non_fuel_vom: Some(MoneyPerEnergy(0.0)),
        su_fixed_cost: Some(MoneyPerCapacity(0.0)),
        su_fuel_cons: Some(HeatPerCapacity(0.0)),
        ramp_fuel_cons: Some(HeatPerCapacity(0.0)),
    }
}

/// Cost inputs for gas, with fuel factors for month 1 in FR only
#[fixture]
pub fn cost_inputs(thermal_cost_parameters: ThermalCostParameters) -> CostInputs {
    let fuel: FuelID = "natural_gas".into();
    CostInputs {
        fuels: indexmap! {
            "gas".into() => FuelPrice {
                fuel: fuel.clone(),
                price: MoneyPerHeat(10.0),
            }
        },
        fuel_time_factors: indexmap! {(fuel.clone(), 1) => Dimensionless(1.0)},
        fuel_area_factors: indexmap! {(fuel, "FR".into()) => MoneyPerHeat(0.0)},
        thermal: indexmap! {"gas".into() => thermal_cost_parameters},
    }
}

#[fixture]
pub fn model_parameters() -> ModelParameters {
    ModelParameters {
        load_uncertainty: Dimensionless(0.01),
        reserve_margin: Dimensionless(0.1),
        value_of_lost_load: MoneyPerEnergy(15000.0),
        transport_loss: Dimensionless(0.02),
        nuclear_technology: "nuclear".into(),
        hydro_technology: "lake_phs".into(),
        reference_area: Some("FR".into()),
        storage_efficiency: indexmap! {
            "battery".into() => StorageEfficiency {
                charge: Dimensionless(0.9),
                discharge: Dimensionless(0.9),
            }
        },
    }
}

/// A complete model which can be built and solved
#[fixture]
pub fn model(
    model_parameters: ModelParameters,
    areas: AreaMap,
    calendar: Calendar,
    technologies: TechnologyMap,
    technology_sets: TechnologySets,
    mut fleet: Fleet,
    mut cost_inputs: CostInputs,
) -> Model {
    let solar = vec![0.0, 0.2, 0.5, 0.5, 0.2, 0.0];
    let series = HourlySeries {
        demand: indexmap! {
            "FR".into() => vec![50.0, 60.0, 70.0, 80.0, 60.0, 50.0],
            "DE".into() => vec![40.0, 45.0, 50.0, 55.0, 50.0, 45.0],
        },
        non_market: indexmap! {
            "FR".into() => vec![5.0; 6],
            "DE".into() => vec![5.0; 6],
        },
        exo_prices: indexmap! {},
        vre_profiles: indexmap! {
            ("FR".into(), "pv".into()) => solar.clone(),
            ("DE".into(), "pv".into()) => solar,
        },
    };

    fleet
        .storage_costs
        .insert("battery".into(), MoneyPerEnergy(1.0));
    let trade = TradeLimits {
        links: indexmap! {
            ("FR".into(), "DE".into()) => 5.0,
            ("DE".into(), "FR".into()) => 5.0,
        },
        exo_links: indexmap! {},
    };

    // Fuel factors for every month and area
    let fuel: FuelID = "natural_gas".into();
    cost_inputs
        .fuel_time_factors
        .insert((fuel.clone(), 2), Dimensionless(1.0));
    cost_inputs
        .fuel_area_factors
        .insert((fuel, "DE".into()), MoneyPerHeat(0.0));
    let coefficients = derive_coefficients(&cost_inputs);

    Model {
        model_path: PathBuf::from("model"),
        parameters: model_parameters,
        areas,
        exo_areas: indexmap! {},
        calendar,
        technologies,
        technology_sets,
        series,
        fleet,
        trade,
        coefficients,
    }
}

/// The fixture model with a hydro reservoir (`lake_phs`) in each area.
///
/// The inflow is 10 GWh in month 1 and 20 GWh in month 2.
#[fixture]
pub fn hydro_model(mut model: Model) -> Model {
    let technology = Technology {
        id: "lake_phs".into(),
        group: "hydro".into(),
    };
    model
        .technologies
        .insert(technology.id.clone(), technology);
    model.technology_sets.storage.insert("lake_phs".into());
    model.parameters.storage_efficiency.insert(
        "lake_phs".into(),
        StorageEfficiency {
            charge: Dimensionless(0.8),
            discharge: Dimensionless(0.9),
        },
    );

    let fleet = &mut model.fleet;
    fleet.storage_costs.insert("lake_phs".into(), MoneyPerEnergy(0.0));
    for area in ["FR", "DE"] {
        let key: AreaTechnologyKey = (area.into(), "lake_phs".into());
        fleet.capacities.insert(key.clone(), 10.0);
        fleet.charge_capacities.insert(key.clone(), 5.0);
        fleet.storage_capacities.insert(key, 1.0);
        for (month, inflow) in [(1, 0.01), (2, 0.02)] {
            fleet.hydro_limits.insert(
                (area.into(), month),
                HydroLimits {
                    max_in: Dimensionless(1.0),
                    max_out: Dimensionless(0.8),
                },
            );
            fleet.lake_inflows.insert((area.into(), month), inflow);
        }
    }

    model
}

/// The fixture model with gas treated as the nuclear technology.
///
/// Its availability is 0.8 in week 1 and 0.7 in week 2.
#[fixture]
pub fn nuclear_model(mut model: Model) -> Model {
    model.parameters.nuclear_technology = "gas".into();
    for area in ["FR", "DE"] {
        for (week, availability) in [(1, 0.8), (2, 0.7)] {
            model
                .fleet
                .nuclear_availability
                .insert((area.into(), week), Dimensionless(availability));
        }
    }

    model
}
