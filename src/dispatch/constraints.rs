//! Code for adding constraints to the dispatch problem.
//!
//! Every family has one row per tuple. Time is circular, so rules linking an hour to the next one
//! wrap from the last hour to the first.
use super::problem::{Bounds, ConstraintFamily, ProblemBuilder};
use super::variables::{VariableSeries, Variables};
use crate::area::{AreaID, iter_area_pairs};
use crate::calendar::{Month, Week};
use crate::model::Model;
use crate::technology::TechnologyID;
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// Corresponding keys for a constraint family along with the row offset in the problem
#[derive(Debug)]
pub struct KeysWithOffset<T> {
    offset: usize,
    keys: Vec<T>,
}

impl<T> KeysWithOffset<T> {
    /// Zip the keys with the corresponding dual values in the solution, accounting for the offset
    pub fn zip_duals<'a>(&'a self, duals: &'a [f64]) -> impl Iterator<Item = (&'a T, f64)> {
        assert!(
            self.offset + self.keys.len() <= duals.len(),
            "Bad constraint keys: dual rows out of range"
        );

        self.keys.iter().zip(duals[self.offset..].iter().copied())
    }
}

/// Indicates the area and hour covered by each adequacy constraint
pub type AdequacyKeys = KeysWithOffset<(AreaID, usize)>;

/// Terms which are repeated in every hour, shifted to that hour
type HourlyTerms = Vec<(VariableSeries, f64)>;

/// Add all constraints to the problem.
///
/// Note: adequacy constraints are added first, as their dual values are later retrieved to give
/// prices.
pub fn add_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<AdequacyKeys> {
    let adequacy_keys = add_adequacy_constraints(builder, vars, model)?;
    add_vre_constraints(builder, vars, model)?;
    add_non_market_constraints(builder, vars, model)?;
    add_thermal_constraints(builder, vars, model)?;
    if model.has_nuclear() {
        add_nuclear_constraints(builder, vars, model)?;
    }
    add_storage_constraints(builder, vars, model)?;
    add_reserve_constraints(builder, vars, model)?;
    add_trade_constraints(builder, vars, model)?;
    add_cost_constraints(builder, vars, model)?;
    add_emissions_constraints(builder, vars, model)?;

    Ok(adequacy_keys)
}

/// Add one row per hour, each with the same terms shifted to that hour
fn add_hourly_rows<F>(
    builder: &mut ProblemBuilder,
    family: ConstraintFamily,
    num_hours: usize,
    terms: &[(VariableSeries, f64)],
    mut bounds: F,
) -> Result<()>
where
    F: FnMut(usize) -> Bounds,
{
    for hour in 0..num_hours {
        builder.add_row(
            family,
            bounds(hour),
            terms.iter().map(|(series, coeff)| (series.at(hour), *coeff)),
        )?;
    }

    Ok(())
}

/// Add supply/demand adequacy constraints.
///
/// Generation, imports and unserved load must meet demand plus exports and storage charging.
fn add_adequacy_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<AdequacyKeys> {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = builder.num_rows();

    let mut keys = Vec::new();
    for area_id in model.areas.keys() {
        let demand = model.series.demand(area_id)?;

        let mut terms = HourlyTerms::new();
        for technology_id in model.technologies.keys() {
            let key = (area_id.clone(), technology_id.clone());
            terms.push((vars.generation.series(&key), 1.0));
        }
        for technology_id in &model.technology_sets.storage {
            let key = (area_id.clone(), technology_id.clone());
            terms.push((vars.charge.series(&key), -1.0));
        }
        for (area1, area2) in vars.imports.keys().filter(|(area1, _)| area1 == area_id) {
            let key = (area1.clone(), area2.clone());
            terms.push((vars.imports.series(&key), 1.0));
            terms.push((vars.exports.series(&key), -1.0));
        }
        for exo_area_id in model.exo_areas.keys() {
            let key = (area_id.clone(), exo_area_id.clone());
            terms.push((vars.exo_imports.series(&key), 1.0));
            terms.push((vars.exo_exports.series(&key), -1.0));
        }
        terms.push((vars.unserved.series(area_id), 1.0));

        let num_hours = model.calendar.num_hours();
        add_hourly_rows(
            builder,
            ConstraintFamily::Adequacy,
            num_hours,
            &terms,
            |hour| Bounds::equal(demand[hour]),
        )?;
        keys.extend((0..num_hours).map(|hour| (area_id.clone(), hour)));
    }

    Ok(KeysWithOffset { offset, keys })
}

/// Generation of VRE is limited by its load factor in each hour
fn add_vre_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<()> {
    for area_id in model.areas.keys() {
        for technology_id in &model.technology_sets.vre {
            let capacity = model.fleet.capacity(area_id, technology_id)?;
            let load_factors = model.series.vre_profile(area_id, technology_id)?;
            let key = (area_id.clone(), technology_id.clone());
            add_hourly_rows(
                builder,
                ConstraintFamily::VreCeiling,
                model.calendar.num_hours(),
                &[(vars.generation.series(&key), 1.0)],
                |hour| Bounds::at_most(capacity * load_factors[hour]),
            )?;
        }
    }

    Ok(())
}

/// Generation of the non-market technology follows its fixed profile
fn add_non_market_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<()> {
    let technology_id = &model.technology_sets.non_market;
    for area_id in model.areas.keys() {
        let profile = model.series.non_market(area_id)?;
        let key = (area_id.clone(), technology_id.clone());
        add_hourly_rows(
            builder,
            ConstraintFamily::FixedProfile,
            model.calendar.num_hours(),
            &[(vars.generation.series(&key), 1.0)],
            |hour| Bounds::equal(profile[hour]),
        )?;
    }

    Ok(())
}

/// Add commitment, availability and ramping constraints for thermal technologies
fn add_thermal_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<()> {
    let calendar = &model.calendar;
    let num_hours = calendar.num_hours();

    for area_id in model.areas.keys() {
        for technology_id in &model.technology_sets.thermal {
            let capacity = model.fleet.capacity(area_id, technology_id)?;
            let availability = model.fleet.availability(area_id, technology_id)?;
            let operation = model.fleet.thermal_operation(technology_id)?;
            let available = capacity * availability.max.value();
            for (duration, name) in [
                (operation.min_time_on, "min_time_on"),
                (operation.min_time_off, "min_time_off"),
            ] {
                calendar
                    .check_duration(duration)
                    .with_context(|| format!("Invalid {name} for {technology_id}"))?;
            }

            let key = (area_id.clone(), technology_id.clone());
            let generation = vars.generation.series(&key);
            let reserve = vars.reserve.series(&key);
            let on = vars.committed.series(&key);
            let startup = vars.startup.series(&key);
            let shutdown = vars.shutdown.series(&key);
            let ramp_up = vars.ramp_up.series(&key);

            add_hourly_rows(
                builder,
                ConstraintFamily::CommitmentCeiling,
                num_hours,
                &[(on, 1.0)],
                |_| Bounds::at_most(available),
            )?;
            add_hourly_rows(
                builder,
                ConstraintFamily::GenerationCommitted,
                num_hours,
                &[(generation, 1.0), (reserve, 1.0), (on, -1.0)],
                |_| Bounds::at_most(0.0),
            )?;
            add_hourly_rows(
                builder,
                ConstraintFamily::MinStableGeneration,
                num_hours,
                &[
                    (on, operation.min_stable_generation.value()),
                    (generation, -1.0),
                ],
                |_| Bounds::at_most(0.0),
            )?;

            // Mean committed capacity over the year
            let weight = 1.0 / num_hours as f64;
            builder.add_row(
                ConstraintFamily::YearlyAvailability,
                Bounds::at_most(capacity * availability.yearly.value()),
                (0..num_hours).map(|hour| (on.at(hour), weight)),
            )?;

            for hour in calendar.iter_hours() {
                let next = calendar.next_hour(hour);

                builder.add_row(
                    ConstraintFamily::CommitmentDynamics,
                    Bounds::equal(0.0),
                    [
                        (on.at(next), 1.0),
                        (on.at(hour), -1.0),
                        (startup.at(hour), -1.0),
                        (shutdown.at(hour), 1.0),
                    ],
                )?;

                // Capacity shut down recently cannot start up again
                let recent_shutdowns = calendar
                    .lookback_window(hour, operation.min_time_off)
                    .map(|w| (shutdown.at(w), 1.0));
                builder.add_row(
                    ConstraintFamily::StartupHeadroom,
                    Bounds::at_most(available),
                    [(startup.at(hour), 1.0), (on.at(hour), 1.0)]
                        .into_iter()
                        .chain(recent_shutdowns),
                )?;

                // Capacity started up recently cannot shut down again
                let recent_startups = calendar
                    .lookback_window(hour, operation.min_time_on)
                    .map(|w| (startup.at(w), 1.0));
                builder.add_row(
                    ConstraintFamily::ShutdownHeadroom,
                    Bounds::at_most(0.0),
                    [(shutdown.at(hour), 1.0), (on.at(hour), -1.0)]
                        .into_iter()
                        .chain(recent_startups),
                )?;

                builder.add_row(
                    ConstraintFamily::RampTracking,
                    Bounds::at_least(0.0),
                    [
                        (ramp_up.at(next), 1.0),
                        (generation.at(next), -1.0),
                        (generation.at(hour), 1.0),
                    ],
                )?;
            }
        }
    }

    Ok(())
}

/// Committed nuclear capacity is limited by its availability in each week
fn add_nuclear_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<()> {
    let calendar = &model.calendar;
    let technology_id = &model.parameters.nuclear_technology;
    for area_id in model.areas.keys() {
        let capacity = model.fleet.capacity(area_id, technology_id)?;
        let weekly: IndexMap<Week, f64> = calendar
            .iter_weeks()
            .map(|week| {
                let availability = model.fleet.nuclear_availability(area_id, week)?;
                Ok((week, capacity * availability.value()))
            })
            .collect::<Result<_>>()?;

        let key = (area_id.clone(), technology_id.clone());
        add_hourly_rows(
            builder,
            ConstraintFamily::NuclearWeeklyCap,
            calendar.num_hours(),
            &[(vars.committed.series(&key), 1.0)],
            |hour| Bounds::at_most(weekly[&calendar.week_of(hour)]),
        )?;
    }

    Ok(())
}

/// Monthly limits and natural inflow for hydro storage
struct HydroMonth {
    max_in: f64,
    max_out: f64,
    /// Inflow over the month in GWh
    inflow: f64,
    /// Number of hours of the month which are modelled
    num_hours: usize,
}

/// Read the hydro inputs for every month in the calendar
fn hydro_months(model: &Model, area_id: &AreaID) -> Result<IndexMap<Month, HydroMonth>> {
    model
        .calendar
        .iter_months()
        .map(|(month, hours)| {
            let limits = model.fleet.hydro_limits(area_id, month)?;
            let hydro_month = HydroMonth {
                max_in: limits.max_in.value(),
                max_out: limits.max_out.value(),
                inflow: model.fleet.lake_inflow(area_id, month)?,
                num_hours: hours.len(),
            };
            Ok((month, hydro_month))
        })
        .collect()
}

/// Add capacity, flow and state-of-charge constraints for storage technologies
fn add_storage_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<()> {
    let calendar = &model.calendar;
    let num_hours = calendar.num_hours();

    for area_id in model.areas.keys() {
        for technology_id in &model.technology_sets.storage {
            let efficiency = model.parameters.storage_efficiency(technology_id)?;
            let eta_in = efficiency.charge.value();
            let eta_out = efficiency.discharge.value();
            let capacity = model.fleet.capacity(area_id, technology_id)?;
            let charge_capacity = model.fleet.charge_capacity(area_id, technology_id)?;
            let max_stored = model.fleet.max_stored_energy(area_id, technology_id)?;
            let hydro = if model.has_hydro() && *technology_id == model.parameters.hydro_technology
            {
                Some(hydro_months(model, area_id)?)
            } else {
                None
            };
            let hydro_month = |hour| hydro.as_ref().map(|months| &months[&calendar.month_of(hour)]);

            let key = (area_id.clone(), technology_id.clone());
            let generation = vars.generation.series(&key);
            let reserve = vars.reserve.series(&key);
            let charge = vars.charge.series(&key);
            let stored = vars.stored.series(&key);

            add_hourly_rows(
                builder,
                ConstraintFamily::StorageCapacity,
                num_hours,
                &[(stored, 1.0)],
                |_| Bounds::at_most(max_stored),
            )?;
            add_hourly_rows(
                builder,
                ConstraintFamily::StorageInflow,
                num_hours,
                &[(charge, 1.0)],
                |hour| {
                    let factor = hydro_month(hour).map_or(1.0, |month| month.max_in);
                    Bounds::at_most(charge_capacity * factor)
                },
            )?;
            add_hourly_rows(
                builder,
                ConstraintFamily::StorageOutflow,
                num_hours,
                &[(generation, 1.0), (reserve, 1.0)],
                |hour| {
                    let factor = hydro_month(hour).map_or(1.0, |month| month.max_out);
                    Bounds::at_most(capacity * factor)
                },
            )?;

            for hour in calendar.iter_hours() {
                let next = calendar.next_hour(hour);

                // Natural inflow is spread evenly over the hours of the month
                let inflow = hydro_month(hour).map_or(0.0, |month| {
                    month.inflow / month.num_hours as f64 / eta_out
                });
                builder.add_row(
                    ConstraintFamily::StateOfCharge,
                    Bounds::equal(inflow),
                    [
                        (stored.at(next), 1.0),
                        (stored.at(hour), -1.0),
                        (charge.at(hour), -eta_in),
                        (generation.at(hour), 1.0 / eta_out),
                    ],
                )?;
            }

            if let Some(months) = &hydro {
                for (month, hours) in calendar.iter_months() {
                    let terms = hours.iter().flat_map(|hour| {
                        [
                            (generation.at(*hour), 1.0),
                            (charge.at(*hour), -eta_in * eta_out),
                        ]
                    });
                    builder.add_row(
                        ConstraintFamily::HydroMonthlyBalance,
                        Bounds::equal(months[&month].inflow),
                        terms,
                    )?;
                }
            }
        }
    }

    Ok(())
}

/// The upward reserve which must be held in an area in each hour.
///
/// This covers the forecast error of VRE and the uncertainty of demand.
pub fn reserve_requirement(model: &Model, area_id: &AreaID) -> Result<Vec<f64>> {
    let mut vre_requirement = 0.0;
    for technology_id in &model.technology_sets.vre {
        let requirement = model.fleet.reserve_requirement(technology_id)?;
        vre_requirement += requirement.value() * model.fleet.capacity(area_id, technology_id)?;
    }

    let parameters = &model.parameters;
    let demand_factor =
        parameters.load_uncertainty.value() * (1.0 + parameters.reserve_margin.value());
    let demand = model.series.demand(area_id)?;

    Ok(demand
        .iter()
        .map(|demand| vre_requirement + demand * demand_factor)
        .collect())
}

/// Add reserve requirement constraints, and forbid reserve from non-FRR technologies
fn add_reserve_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<()> {
    let num_hours = model.calendar.num_hours();
    let sets = &model.technology_sets;

    for area_id in model.areas.keys() {
        let requirement = reserve_requirement(model, area_id)?;
        let terms: HourlyTerms = sets
            .frr
            .iter()
            .map(|technology_id| {
                let key = (area_id.clone(), technology_id.clone());
                (vars.reserve.series(&key), 1.0)
            })
            .collect();
        add_hourly_rows(
            builder,
            ConstraintFamily::ReserveRequirement,
            num_hours,
            &terms,
            |hour| Bounds::equal(requirement[hour]),
        )?;

        for technology_id in &sets.no_frr {
            let key = (area_id.clone(), technology_id.clone());
            add_hourly_rows(
                builder,
                ConstraintFamily::NonFrrReserve,
                num_hours,
                &[(vars.reserve.series(&key), 1.0)],
                |_| Bounds::equal(0.0),
            )?;
        }
    }

    Ok(())
}

/// Add trade constraints between modelled areas and with exogenous areas
fn add_trade_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<()> {
    let num_hours = model.calendar.num_hours();
    let trade_efficiency = model.parameters.trade_efficiency();

    for (area1, area2) in iter_area_pairs(&model.areas) {
        let key = (area1.clone(), area2.clone());
        let imports = vars.imports.series(&key);
        let exports = vars.exports.series(&(area2.clone(), area1.clone()));

        // Imports are what the partner exports, less losses
        add_hourly_rows(
            builder,
            ConstraintFamily::TradeReciprocity,
            num_hours,
            &[(imports, 1.0), (exports, -trade_efficiency)],
            |_| Bounds::equal(0.0),
        )?;

        let link_capacity = model.trade.link_capacity(area1, area2)?;
        add_hourly_rows(
            builder,
            ConstraintFamily::InterconnectionCap,
            num_hours,
            &[(imports, 1.0)],
            |_| Bounds::at_most(link_capacity),
        )?;
    }

    for area_id in model.areas.keys() {
        for exo_area_id in model.exo_areas.keys() {
            let link = model.trade.exo_link(area_id, exo_area_id)?;
            let key = (area_id.clone(), exo_area_id.clone());
            add_hourly_rows(
                builder,
                ConstraintFamily::ExoImportCap,
                num_hours,
                &[(vars.exo_imports.series(&key), 1.0)],
                |_| Bounds::at_most(link.max_import),
            )?;
            add_hourly_rows(
                builder,
                ConstraintFamily::ExoExportCap,
                num_hours,
                &[(vars.exo_exports.series(&key), 1.0)],
                |_| Bounds::at_most(link.max_export),
            )?;
        }
    }

    Ok(())
}

/// Define the hourly cost of each area.
///
/// Thermal costs depend on the month, so the terms are collected per month.
fn add_cost_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<()> {
    let calendar = &model.calendar;
    let sets = &model.technology_sets;
    let trade_efficiency = model.parameters.trade_efficiency();
    let value_of_lost_load = model.parameters.value_of_lost_load.value();

    // Exogenous prices are the same for every area
    let exo_prices: IndexMap<_, _> = model
        .exo_areas
        .keys()
        .map(|exo_area_id| Ok((exo_area_id, model.series.exo_price(exo_area_id)?)))
        .collect::<Result<_>>()?;

    for area_id in model.areas.keys() {
        let cost = vars.cost.series(area_id);

        // Terms which do not depend on the month
        let mut fixed_terms = vec![
            (cost, 1.0),
            (vars.unserved.series(area_id), -value_of_lost_load),
        ];
        for technology_id in &sets.storage {
            let storage_cost = model.fleet.storage_cost(technology_id)?;
            let key = (area_id.clone(), technology_id.clone());
            fixed_terms.push((vars.generation.series(&key), -storage_cost.value()));
        }

        let mut monthly_terms = IndexMap::new();
        for month in calendar.iter_month_labels() {
            let mut terms = fixed_terms.clone();
            for technology_id in &sets.thermal {
                let costs = model
                    .coefficients
                    .thermal_costs(technology_id, area_id, month)?;
                let key = (area_id.clone(), technology_id.clone());
                terms.extend([
                    (vars.generation.series(&key), -costs.generation),
                    (vars.committed.series(&key), -costs.commitment),
                    (vars.startup.series(&key), -costs.startup),
                    (vars.ramp_up.series(&key), -costs.ramp),
                ]);
            }
            monthly_terms.insert(month, terms);
        }

        for hour in calendar.iter_hours() {
            let terms = &monthly_terms[&calendar.month_of(hour)];
            let exo_terms = exo_prices.iter().flat_map(|(exo_area_id, prices)| {
                let key = (area_id.clone(), (*exo_area_id).clone());
                let price = prices[hour] / trade_efficiency;
                [
                    (vars.exo_imports.get(&key, hour), -price),
                    (vars.exo_exports.get(&key, hour), price),
                ]
            });
            builder.add_row(
                ConstraintFamily::HourlyCost,
                Bounds::equal(0.0),
                terms
                    .iter()
                    .map(|(series, coeff)| (series.at(hour), *coeff))
                    .chain(exo_terms),
            )?;
        }
    }

    Ok(())
}

/// Define the hourly emissions of each area
fn add_emissions_constraints(
    builder: &mut ProblemBuilder,
    vars: &Variables,
    model: &Model,
) -> Result<()> {
    let emissions: IndexMap<&TechnologyID, _> = model
        .technology_sets
        .thermal
        .iter()
        .map(|technology_id| {
            let coefficients = model.coefficients.thermal_emissions(technology_id)?;
            Ok((technology_id, coefficients))
        })
        .collect::<Result<_>>()?;

    for area_id in model.areas.keys() {
        let mut terms = vec![(vars.emissions.series(area_id), 1.0)];
        for (technology_id, coefficients) in &emissions {
            let key = (area_id.clone(), (*technology_id).clone());
            terms.extend([
                (vars.generation.series(&key), -coefficients.generation),
                (vars.committed.series(&key), -coefficients.commitment),
                (vars.startup.series(&key), -coefficients.startup),
                (vars.ramp_up.series(&key), -coefficients.ramp),
            ]);
        }

        add_hourly_rows(
            builder,
            ConstraintFamily::HourlyEmissions,
            model.calendar.num_hours(),
            &terms,
            |_| Bounds::equal(0.0),
        )?;
    }

    Ok(())
}
