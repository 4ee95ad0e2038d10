//! Building and solving the hourly dispatch problem.
//!
//! The problem is assembled in full from a loaded [`Model`] and then handed to HiGHS. It minimises
//! the total cost of meeting demand in every area and hour, and the dual values of the adequacy
//! constraints give electricity prices.
use crate::model::Model;
use anyhow::Result;
use log::{debug, info};

mod constraints;
mod problem;
mod solution;
mod variables;

pub use constraints::{AdequacyKeys, KeysWithOffset, reserve_requirement};
pub use problem::{Bounds, ConstraintFamily, Problem, ProblemBuilder, Row, Variable};
pub use solution::{ModelError, Solution, solve_optimal};
pub use variables::{COST_SCALE, HourlyVariableMap, TechnologyVariables, VariableSeries, Variables};

/// A dispatch problem which is ready to be solved
#[derive(Debug)]
pub struct DispatchProblem {
    problem: Problem,
    variables: Variables,
    adequacy_keys: AdequacyKeys,
}

impl DispatchProblem {
    /// Build the dispatch problem for the model.
    ///
    /// Fails if any parameter needed by an enabled constraint family is missing.
    pub fn build(model: &Model) -> Result<Self> {
        let mut builder = ProblemBuilder::new();
        let variables = Variables::new(&mut builder, model)?;
        let adequacy_keys = constraints::add_constraints(&mut builder, &variables, model)?;
        let problem = builder.finish();

        info!(
            "Built dispatch problem with {} columns and {} rows",
            problem.num_columns(),
            problem.num_rows()
        );
        for (family, count) in problem.row_counts() {
            debug!("{family}: {count} rows");
        }

        Ok(Self {
            problem,
            variables,
            adequacy_keys,
        })
    }

    /// The assembled problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// The variables of the problem
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Solve the problem.
    ///
    /// A result which is not optimal is an error.
    pub fn solve(self) -> Result<Solution> {
        info!("Solving dispatch problem");
        let solution =
            solution::solve_problem(self.problem, self.variables, self.adequacy_keys)?;

        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{AreaID, AreaMap};
    use crate::calendar::Calendar;
    use crate::coefficients::{CostInputs, derive_coefficients};
    use crate::fixture::{areas, cost_inputs, hydro_model, model, model_parameters, nuclear_model};
    use crate::fleet::{Availability, Fleet, ThermalOperation};
    use crate::model::ModelParameters;
    use crate::series::HourlySeries;
    use crate::technology::{Technology, TechnologyID, TechnologySetKind, TechnologySets};
    use crate::trade::TradeLimits;
    use crate::units::{Dimensionless, MoneyPerHeat};
    use float_cmp::assert_approx_eq;
    use indexmap::indexmap;
    use rstest::{fixture, rstest};
    use std::path::PathBuf;

    /// Two areas over three hours, served only by gas, with no storage, trade or reserve
    #[fixture]
    fn gas_only_model(
        mut model_parameters: ModelParameters,
        areas: AreaMap,
        mut cost_inputs: CostInputs,
    ) -> Model {
        model_parameters.load_uncertainty = Dimensionless(0.0);
        model_parameters.reference_area = None;

        let technologies = [("gas", "gas"), ("nmd", "nmd")]
            .into_iter()
            .map(|(id, group)| {
                let technology = Technology {
                    id: id.into(),
                    group: group.into(),
                };
                (technology.id.clone(), technology)
            })
            .collect();
        let technology_sets = TechnologySets::from_memberships(
            &technologies,
            [
                (TechnologySetKind::Thermal, "gas".into()),
                (TechnologySetKind::Frr, "gas".into()),
                (TechnologySetKind::NonMarket, "nmd".into()),
            ],
        )
        .unwrap();

        let availability = Availability {
            max: Dimensionless(1.0),
            yearly: Dimensionless(1.0),
        };
        let fleet = Fleet {
            capacities: indexmap! {
                ("FR".into(), "gas".into()) => 100.0,
                ("DE".into(), "gas".into()) => 100.0,
            },
            availability: indexmap! {
                ("FR".into(), "gas".into()) => availability,
                ("DE".into(), "gas".into()) => availability,
            },
            thermal: indexmap! {
                "gas".into() => ThermalOperation {
                    min_stable_generation: Dimensionless(0.3),
                    min_time_on: 2,
                    min_time_off: 1,
                }
            },
            ..Default::default()
        };

        cost_inputs.fuel_area_factors.insert(
            ("natural_gas".into(), "DE".into()),
            MoneyPerHeat(0.0),
        );
        let series = HourlySeries {
            demand: indexmap! {
                "FR".into() => vec![30.0, 50.0, 40.0],
                "DE".into() => vec![20.0, 20.0, 20.0],
            },
            non_market: indexmap! {
                "FR".into() => vec![0.0; 3],
                "DE".into() => vec![0.0; 3],
            },
            ..Default::default()
        };
        let trade = TradeLimits {
            links: indexmap! {
                ("FR".into(), "DE".into()) => 0.0,
                ("DE".into(), "FR".into()) => 0.0,
            },
            ..Default::default()
        };

        Model {
            model_path: PathBuf::from("model"),
            parameters: model_parameters,
            areas,
            exo_areas: indexmap! {},
            calendar: Calendar::new([(0, 1, 1), (1, 1, 1), (2, 1, 1)]).unwrap(),
            technologies,
            technology_sets,
            series,
            fleet,
            trade,
            coefficients: derive_coefficients(&cost_inputs),
        }
    }

    /// Check that every row of the problem holds for the solution
    fn assert_feasible(solution: &Solution) {
        for row in solution.problem().iter_rows() {
            let activity = row.activity(solution.column_values());
            assert!(
                row.bounds().contains(activity, 1e-5),
                "{} row violated: {activity} not in {:?}",
                row.family(),
                row.bounds()
            );
        }
    }

    #[rstest]
    fn test_solve(model: Model) {
        let solution = DispatchProblem::build(&model).unwrap().solve().unwrap();
        assert_feasible(&solution);

        // The objective is the scaled sum of hourly costs
        let total_cost: f64 = solution
            .iter_values(&solution.variables().cost)
            .map(|(_, _, cost)| cost)
            .sum();
        assert_approx_eq!(
            f64,
            solution.objective_value(),
            total_cost / COST_SCALE,
            epsilon = 1e-9
        );

        // There is a price for every area and hour
        assert_eq!(
            solution.iter_prices().count(),
            model.areas.len() * model.calendar.num_hours()
        );
    }

    #[rstest]
    fn test_commitment_dynamics_hold(model: Model) {
        let solution = DispatchProblem::build(&model).unwrap().solve().unwrap();
        let vars = solution.variables();
        let key = (AreaID::new("FR"), TechnologyID::new("gas"));
        let num_hours = model.calendar.num_hours();
        for hour in 0..num_hours {
            let next = (hour + 1) % num_hours;
            let on = solution.value(vars.committed.get(&key, hour));
            let on_next = solution.value(vars.committed.get(&key, next));
            let startup = solution.value(vars.startup.get(&key, hour));
            let shutdown = solution.value(vars.shutdown.get(&key, hour));
            assert_approx_eq!(f64, on_next, on + startup - shutdown, epsilon = 1e-6);
        }
    }

    #[rstest]
    fn test_gas_only(gas_only_model: Model) {
        let model = gas_only_model;
        let solution = DispatchProblem::build(&model).unwrap().solve().unwrap();
        assert_feasible(&solution);

        // Committed capacity follows demand exactly, as being online has a cost
        let vars = solution.variables();
        for area_id in model.areas.keys() {
            let key = (area_id.clone(), TechnologyID::new("gas"));
            let demand = model.series.demand(area_id).unwrap();
            for hour in model.calendar.iter_hours() {
                let on = solution.value(vars.committed.get(&key, hour));
                let generation = solution.value(vars.generation.get(&key, hour));
                assert_approx_eq!(f64, on, demand[hour], epsilon = 1e-6);
                assert_approx_eq!(f64, generation, demand[hour], epsilon = 1e-6);
            }
        }

        // (genOM + onOM) * total demand, with genOM = 54 and onOM = 18
        let total_demand = 120.0 + 60.0;
        assert_approx_eq!(
            f64,
            solution.objective_value(),
            (54.0 + 18.0) * total_demand / COST_SCALE,
            epsilon = 1e-9
        );

        // Serving one more MWh means generating and committing one more MWh
        assert_eq!(solution.iter_prices().count(), 6);
        for (area_id, hour, price) in solution.iter_prices() {
            assert!(
                (price - 72.0).abs() < 1e-3,
                "Price in {area_id} at hour {hour} is {price}"
            );
        }
    }

    #[rstest]
    fn test_initial_commitment(model: Model) {
        let dispatch = DispatchProblem::build(&model).unwrap();
        let initial = dispatch.problem().initial_solution();
        assert_eq!(initial.len(), dispatch.problem().num_columns());

        // Capacity of 100 GW with maximum availability of 0.9
        let vars = dispatch.variables();
        for (_, _, var) in vars.committed.iter() {
            assert_approx_eq!(f64, initial[var.index()], 90.0, epsilon = 1e-9);
        }
        for (_, _, var) in vars.generation.iter() {
            assert_approx_eq!(f64, initial[var.index()], 0.0);
        }
    }

    #[rstest]
    fn test_hydro_monthly_balance_holds(hydro_model: Model) {
        let model = hydro_model;
        let solution = DispatchProblem::build(&model).unwrap().solve().unwrap();
        assert_feasible(&solution);

        let vars = solution.variables();
        for area_id in model.areas.keys() {
            let key = (area_id.clone(), TechnologyID::new("lake_phs"));
            for (month, hours) in model.calendar.iter_months() {
                let net_discharge: f64 = hours
                    .iter()
                    .map(|hour| {
                        solution.value(vars.generation.get(&key, *hour))
                            - 0.8 * 0.9 * solution.value(vars.charge.get(&key, *hour))
                    })
                    .sum();
                let inflow = model.fleet.lake_inflow(area_id, month).unwrap();
                assert_approx_eq!(f64, net_discharge, inflow, epsilon = 1e-5);
            }
        }
    }

    #[rstest]
    fn test_nuclear_cap_holds(nuclear_model: Model) {
        let model = nuclear_model;
        let solution = DispatchProblem::build(&model).unwrap().solve().unwrap();
        assert_feasible(&solution);

        let vars = solution.variables();
        let key = (AreaID::new("FR"), TechnologyID::new("gas"));
        for hour in model.calendar.iter_hours() {
            let cap = if model.calendar.week_of(hour) == 1 { 80.0 } else { 70.0 };
            assert!(solution.value(vars.committed.get(&key, hour)) <= cap + 1e-6);
        }
    }

    #[rstest]
    fn test_infeasible(mut model: Model) {
        // Fixed generation far above what can be consumed, stored or exported
        let num_hours = model.calendar.num_hours();
        model.series.non_market.insert("FR".into(), vec![1e4; num_hours]);
        let result = DispatchProblem::build(&model).unwrap().solve();
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ModelError>(),
            Some(ModelError::NonOptimal(_))
        ));
    }
}
