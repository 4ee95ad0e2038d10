//! An immutable linear problem, assembled in full before it is handed to the solver.
//!
//! Columns are non-negative unless stated otherwise and only hourly cost columns carry an
//! objective coefficient. Rows are tagged with the [`ConstraintFamily`] which generated them.
use anyhow::{Result, ensure};
use highs::RowProblem;
use indexmap::IndexMap;
use strum::{Display, EnumIter, IntoEnumIterator};

/// A decision variable in the problem.
///
/// This does **not** include the value of the variable; it refers to a particular column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

impl Variable {
    /// The index of the column in the problem
    pub fn index(self) -> usize {
        self.0
    }

    /// The variable `offset` columns after this one
    pub(super) fn offset(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}

/// Lower and upper bounds for a column or row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lower bound (may be negative infinity)
    pub lower: f64,
    /// Upper bound (may be infinity)
    pub upper: f64,
}

impl Bounds {
    /// Values greater than or equal to zero
    pub fn non_negative() -> Self {
        Self::at_least(0.0)
    }

    /// Values less than or equal to `upper`
    pub fn at_most(upper: f64) -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper,
        }
    }

    /// Values greater than or equal to `lower`
    pub fn at_least(lower: f64) -> Self {
        Self {
            lower,
            upper: f64::INFINITY,
        }
    }

    /// Exactly `value`
    pub fn equal(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// Check that the bounds are well formed
    fn check(self) -> Result<()> {
        ensure!(
            !self.lower.is_nan() && !self.upper.is_nan(),
            "Bounds cannot be NaN"
        );
        ensure!(
            self.lower <= self.upper && self.lower < f64::INFINITY && self.upper > f64::NEG_INFINITY,
            "Invalid bounds: lower bound {} is greater than upper bound {}",
            self.lower,
            self.upper
        );

        Ok(())
    }

    /// Whether `value` lies within the bounds, to the given tolerance
    pub fn contains(self, value: f64, tolerance: f64) -> bool {
        value >= self.lower - tolerance && value <= self.upper + tolerance
    }
}

/// The rule which generated a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintFamily {
    /// Supply equals demand in each area and hour
    Adequacy,
    /// VRE generation limited by capacity and load factor
    VreCeiling,
    /// Non-market generation fixed to its profile
    FixedProfile,
    /// Committed capacity limited by available capacity
    CommitmentCeiling,
    /// Generation and reserve limited by committed capacity
    GenerationCommitted,
    /// Generation at least the minimum stable fraction of committed capacity
    MinStableGeneration,
    /// Average committed capacity limited by yearly availability
    YearlyAvailability,
    /// Committed nuclear capacity limited by weekly availability
    NuclearWeeklyCap,
    /// Committed capacity changes by start-ups less shutdowns
    CommitmentDynamics,
    /// Start-ups limited by capacity which has been off for long enough
    StartupHeadroom,
    /// Shutdowns limited by capacity which has been on for long enough
    ShutdownHeadroom,
    /// Ramp-up at least the increase in generation
    RampTracking,
    /// Stored energy limited by storage capacity
    StorageCapacity,
    /// Charging limited by charge capacity
    StorageInflow,
    /// Discharge and reserve limited by capacity
    StorageOutflow,
    /// Stored energy carried from one hour to the next
    StateOfCharge,
    /// Net hydro discharge over a month equals natural inflow
    HydroMonthlyBalance,
    /// Reserve from eligible technologies meets the requirement
    ReserveRequirement,
    /// Reserve from ineligible technologies is zero
    NonFrrReserve,
    /// Imports equal the partner's exports less losses
    TradeReciprocity,
    /// Imports limited by interconnection capacity
    InterconnectionCap,
    /// Imports from exogenous areas limited by link capacity
    ExoImportCap,
    /// Exports to exogenous areas limited by link capacity
    ExoExportCap,
    /// Definition of hourly cost
    HourlyCost,
    /// Definition of hourly emissions
    HourlyEmissions,
}

/// A column of the problem
#[derive(Debug, Clone, PartialEq)]
struct Column {
    cost: f64,
    bounds: Bounds,
    initial: Option<f64>,
}

/// A row of the problem
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    family: ConstraintFamily,
    bounds: Bounds,
    terms: Vec<(Variable, f64)>,
}

impl Row {
    /// The family which generated this row
    pub fn family(&self) -> ConstraintFamily {
        self.family
    }

    /// The bounds on the row's activity
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// The (variable, coefficient) terms of the row
    pub fn terms(&self) -> &[(Variable, f64)] {
        &self.terms
    }

    /// The row's activity for the given column values
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.index()])
            .sum()
    }
}

/// Incrementally assembles a [`Problem`]
#[derive(Debug, Default)]
pub struct ProblemBuilder {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl ProblemBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column with the given objective coefficient and bounds
    pub fn add_column(&mut self, cost: f64, bounds: Bounds) -> Variable {
        let var = Variable(self.columns.len());
        self.columns.push(Column {
            cost,
            bounds,
            initial: None,
        });

        var
    }

    /// Set the initial guess for a column
    pub fn set_initial_value(&mut self, var: Variable, value: f64) {
        self.columns[var.index()].initial = Some(value);
    }

    /// The number of columns added so far
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// The number of rows added so far
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Add a row whose activity (the sum of `terms`) must lie within `bounds`.
    ///
    /// Terms referring to the same variable are kept separate; the solver sums them.
    pub fn add_row<I>(&mut self, family: ConstraintFamily, bounds: Bounds, terms: I) -> Result<()>
    where
        I: IntoIterator<Item = (Variable, f64)>,
    {
        bounds.check()?;
        let terms: Vec<_> = terms.into_iter().collect();
        for (var, coeff) in &terms {
            ensure!(
                coeff.is_finite(),
                "Non-finite coefficient {coeff} in {family} constraint"
            );
            assert!(var.index() < self.columns.len(), "Unknown variable in {family} row");
        }

        self.rows.push(Row {
            family,
            bounds,
            terms,
        });

        Ok(())
    }

    /// Finish building, returning the immutable problem
    pub fn finish(self) -> Problem {
        Problem {
            columns: self.columns,
            rows: self.rows,
        }
    }
}

/// A fully assembled linear problem
#[derive(Debug, PartialEq)]
pub struct Problem {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Problem {
    /// The number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// The number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Iterate over all rows in the order they were added
    pub fn iter_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Iterate over the rows generated by the given family
    pub fn iter_family(&self, family: ConstraintFamily) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |row| row.family == family)
    }

    /// The number of rows in each family, including families with no rows
    pub fn row_counts(&self) -> IndexMap<ConstraintFamily, usize> {
        let mut counts: IndexMap<_, _> = ConstraintFamily::iter().map(|f| (f, 0)).collect();
        for row in &self.rows {
            counts[&row.family] += 1;
        }

        counts
    }

    /// The objective coefficient of a column
    pub fn cost(&self, var: Variable) -> f64 {
        self.columns[var.index()].cost
    }

    /// The initial guess for a column, if any
    pub fn initial_value(&self, var: Variable) -> Option<f64> {
        self.columns[var.index()].initial
    }

    /// Starting values for every column, in column order.
    ///
    /// Columns without an initial guess start at zero, moved inside their bounds.
    pub fn initial_solution(&self) -> Vec<f64> {
        self.columns
            .iter()
            .map(|column| {
                column
                    .initial
                    .unwrap_or(0.0)
                    .clamp(column.bounds.lower, column.bounds.upper)
            })
            .collect()
    }

    /// The objective value for the given column values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(values)
            .map(|(column, value)| column.cost * value)
            .sum()
    }

    /// Convert to a problem for the HiGHS solver.
    ///
    /// Columns and rows keep their indices.
    pub fn to_highs(&self) -> RowProblem {
        let mut problem = RowProblem::default();
        let cols: Vec<_> = self
            .columns
            .iter()
            .map(|column| problem.add_column(column.cost, column.bounds.lower..=column.bounds.upper))
            .collect();
        for row in &self.rows {
            problem.add_row(
                row.bounds.lower..=row.bounds.upper,
                row.terms.iter().map(|(var, coeff)| (cols[var.index()], *coeff)),
            );
        }

        problem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Bounds::non_negative(), true)]
    #[case(Bounds::equal(3.0), true)]
    #[case(Bounds::at_most(-1.0), true)]
    #[case(Bounds { lower: 2.0, upper: 1.0 }, false)]
    #[case(Bounds::at_most(f64::NAN), false)]
    #[case(Bounds::at_least(f64::INFINITY), false)]
    fn test_bounds_check(#[case] bounds: Bounds, #[case] expected_valid: bool) {
        assert_eq!(bounds.check().is_ok(), expected_valid);
    }

    #[test]
    fn test_add_row() {
        let mut builder = ProblemBuilder::new();
        let x = builder.add_column(1.0, Bounds::non_negative());
        let y = builder.add_column(2.0, Bounds::non_negative());
        builder
            .add_row(
                ConstraintFamily::Adequacy,
                Bounds::equal(1.0),
                [(x, 1.0), (y, 1.0)],
            )
            .unwrap();
        assert_error!(
            builder.add_row(
                ConstraintFamily::VreCeiling,
                Bounds::at_most(1.0),
                [(x, f64::NAN)]
            ),
            "Non-finite coefficient NaN in vre_ceiling constraint"
        );

        let problem = builder.finish();
        assert_eq!(problem.num_columns(), 2);
        assert_eq!(problem.num_rows(), 1);
        let counts = problem.row_counts();
        assert_eq!(counts[&ConstraintFamily::Adequacy], 1);
        assert_eq!(counts[&ConstraintFamily::VreCeiling], 0);
        assert_approx_eq!(f64, problem.objective_value(&[1.0, 2.0]), 5.0);
        let row = problem.iter_family(ConstraintFamily::Adequacy).next().unwrap();
        assert_approx_eq!(f64, row.activity(&[0.25, 0.75]), 1.0);
    }

    #[test]
    fn test_initial_value() {
        let mut builder = ProblemBuilder::new();
        let x = builder.add_column(0.0, Bounds::non_negative());
        let y = builder.add_column(0.0, Bounds::non_negative());
        builder.set_initial_value(y, 4.0);
        let problem = builder.finish();
        assert_eq!(problem.initial_value(x), None);
        assert_eq!(problem.initial_value(y), Some(4.0));
        assert_eq!(problem.initial_solution(), [0.0, 4.0]);
    }

    #[test]
    fn test_initial_solution_within_bounds() {
        let mut builder = ProblemBuilder::new();
        builder.add_column(0.0, Bounds::equal(2.0));
        builder.add_column(0.0, Bounds::at_most(-1.0));
        let z = builder.add_column(0.0, Bounds { lower: 0.0, upper: 5.0 });
        builder.set_initial_value(z, 8.0);
        let problem = builder.finish();
        assert_eq!(problem.initial_solution(), [2.0, -1.0, 5.0]);
    }

    #[test]
    fn test_to_highs_with_initial_solution() {
        let mut builder = ProblemBuilder::new();
        let x = builder.add_column(1.0, Bounds::non_negative());
        let y = builder.add_column(2.0, Bounds::non_negative());
        builder.set_initial_value(y, 3.0);
        builder
            .add_row(
                ConstraintFamily::Adequacy,
                Bounds::equal(3.0),
                [(x, 1.0), (y, 1.0)],
            )
            .unwrap();
        let problem = builder.finish();

        let mut model = problem.to_highs().optimise(highs::Sense::Minimise);
        model
            .try_set_solution(Some(&problem.initial_solution()), None, None, None)
            .unwrap();
        let solved = model.try_solve().unwrap();
        let solution = solved.get_solution();
        assert_approx_eq!(f64, solution.columns()[0], 3.0, epsilon = 1e-9);
        assert_approx_eq!(f64, solution.columns()[1], 0.0, epsilon = 1e-9);

        // A starting point of the wrong length is rejected
        let mut model = problem.to_highs().optimise(highs::Sense::Minimise);
        assert!(model.try_set_solution(Some(&[1.0]), None, None, None).is_err());
    }

    #[test]
    fn test_to_highs_solves() {
        let mut builder = ProblemBuilder::new();
        let x = builder.add_column(1.0, Bounds::non_negative());
        let y = builder.add_column(2.0, Bounds::non_negative());
        builder
            .add_row(
                ConstraintFamily::Adequacy,
                Bounds::equal(3.0),
                [(x, 1.0), (y, 1.0)],
            )
            .unwrap();
        builder
            .add_row(ConstraintFamily::VreCeiling, Bounds::at_most(1.0), [(x, 1.0)])
            .unwrap();
        let problem = builder.finish();

        let solved = problem
            .to_highs()
            .optimise(highs::Sense::Minimise)
            .try_solve()
            .unwrap();
        let solution = solved.get_solution();
        assert_approx_eq!(f64, solution.columns()[0], 1.0, epsilon = 1e-9);
        assert_approx_eq!(f64, solution.columns()[1], 2.0, epsilon = 1e-9);
        assert_approx_eq!(f64, problem.objective_value(solution.columns()), 5.0, epsilon = 1e-9);
    }
}
