//! Solving the dispatch problem with HiGHS and reading back the results.
use super::constraints::AdequacyKeys;
use super::problem::{Problem, Variable};
use super::variables::{COST_SCALE, HourlyVariableMap, Variables};
use crate::area::AreaID;
use crate::log::is_logging_disabled_by_env;
use highs::{HighsModelStatus, HighsStatus, Sense, SolvedModel};
use log::info;
use std::error::Error;
use std::fmt;
use std::hash::Hash;

/// An error from the solver
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The model could not be passed to the solver
    Incoherent(HighsStatus),
    /// The solver finished without finding an optimal solution
    NonOptimal(HighsModelStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            ModelError::NonOptimal(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
        }
    }
}

impl Error for ModelError {}

/// Try to solve the model, returning an error if the model is incoherent or the result is not
/// optimal
pub fn solve_optimal(model: highs::Model) -> Result<SolvedModel, ModelError> {
    let solved = model.try_solve().map_err(ModelError::Incoherent)?;

    match solved.status() {
        HighsModelStatus::Optimal => Ok(solved),
        status => Err(ModelError::NonOptimal(status)),
    }
}

/// Enable logging for the HiGHS solver
fn enable_highs_logging(model: &mut highs::Model) {
    // **HACK**: Skip this step if logging is disabled (e.g. when running tests)
    if is_logging_disabled_by_env() {
        return;
    }

    model.set_option("log_to_console", true);
    model.set_option("output_flag", true);
}

/// Solve the problem, minimising the objective
pub(super) fn solve_problem(
    problem: Problem,
    variables: Variables,
    adequacy_keys: AdequacyKeys,
) -> Result<Solution, ModelError> {
    let mut highs_model = problem.to_highs().optimise(Sense::Minimise);
    enable_highs_logging(&mut highs_model);

    // Warm start from the initial guesses (e.g. committed capacity at its available capacity)
    highs_model
        .try_set_solution(Some(&problem.initial_solution()), None, None, None)
        .map_err(ModelError::Incoherent)?;

    let solved = solve_optimal(highs_model)?;
    let solution = solved.get_solution();
    let columns = solution.columns().to_vec();
    let duals = solution.dual_rows().to_vec();
    let objective = problem.objective_value(&columns);
    info!("Found optimal solution with objective value {objective}");

    Ok(Solution {
        problem,
        variables,
        adequacy_keys,
        columns,
        duals,
        objective,
    })
}

/// The solution to the dispatch problem
#[derive(Debug)]
pub struct Solution {
    problem: Problem,
    variables: Variables,
    adequacy_keys: AdequacyKeys,
    columns: Vec<f64>,
    duals: Vec<f64>,
    objective: f64,
}

impl Solution {
    /// The problem which was solved
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// The variables of the problem
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// The value of the objective function (total cost in millions)
    pub fn objective_value(&self) -> f64 {
        self.objective
    }

    /// The value of a variable
    pub fn value(&self, var: Variable) -> f64 {
        self.columns[var.index()]
    }

    /// The values of all columns, in column order
    pub fn column_values(&self) -> &[f64] {
        &self.columns
    }

    /// Iterate over the values of a family of variables
    pub fn iter_values<'a, K>(
        &'a self,
        map: &'a HourlyVariableMap<K>,
    ) -> impl Iterator<Item = (&'a K, usize, f64)>
    where
        K: Eq + Hash,
    {
        map.iter().map(|(key, hour, var)| (key, hour, self.value(var)))
    }

    /// Iterate over the electricity price for each area and hour.
    ///
    /// This is the dual value of the adequacy constraint, scaled back to currency per MWh.
    pub fn iter_prices(&self) -> impl Iterator<Item = (&AreaID, usize, f64)> {
        self.adequacy_keys
            .zip_duals(&self.duals)
            .map(|((area_id, hour), dual)| (area_id, *hour, dual * COST_SCALE))
    }
}
