//! The decision variables of the dispatch problem.
use super::problem::{Bounds, ProblemBuilder, Variable};
use crate::area::{AreaID, ExoAreaID, iter_area_pairs};
use crate::model::Model;
use crate::technology::TechnologyID;
use anyhow::Result;
use indexmap::IndexMap;
use itertools::iproduct;
use std::hash::Hash;

/// Hourly costs are divided by this to give the objective, and prices are scaled back up by it
pub const COST_SCALE: f64 = 1_000_000.0;

/// Variables with one column per key and hour.
///
/// The columns for a key are contiguous, so looking up a variable only needs the first column for
/// the key.
#[derive(Debug)]
pub struct HourlyVariableMap<K> {
    first_columns: IndexMap<K, Variable>,
    num_hours: usize,
}

impl<K: Eq + Hash> HourlyVariableMap<K> {
    /// Add columns for every key and hour to the problem
    fn new<I>(builder: &mut ProblemBuilder, keys: I, num_hours: usize, cost: f64) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        let mut first_columns = IndexMap::new();
        for key in keys {
            let first = builder.add_column(cost, Bounds::non_negative());
            for _ in 1..num_hours {
                builder.add_column(cost, Bounds::non_negative());
            }

            let existing = first_columns.insert(key, first).is_some();
            assert!(!existing, "Duplicate key for hourly variables");
        }

        Self {
            first_columns,
            num_hours,
        }
    }

    /// Get the variable for the given key and hour.
    ///
    /// # Panics
    ///
    /// If there is no variable for the key.
    pub fn get(&self, key: &K, hour: usize) -> Variable {
        assert!(hour < self.num_hours, "Hour {hour} out of range");
        self.first_columns
            .get(key)
            .expect("No variable found for given key")
            .offset(hour)
    }

    /// The variables for a key in every hour.
    ///
    /// # Panics
    ///
    /// If there is no variable for the key.
    pub fn series(&self, key: &K) -> VariableSeries {
        VariableSeries {
            first: self.get(key, 0),
            num_hours: self.num_hours,
        }
    }

    /// Iterate over the keys
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.first_columns.keys()
    }

    /// Iterate over every (key, hour, variable)
    pub fn iter(&self) -> impl Iterator<Item = (&K, usize, Variable)> {
        self.first_columns
            .iter()
            .flat_map(|(key, first)| (0..self.num_hours).map(move |h| (key, h, first.offset(h))))
    }

    /// Whether there are any variables for the key
    pub fn contains_key(&self, key: &K) -> bool {
        self.first_columns.contains_key(key)
    }
}

/// The variables for a single key, one per hour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableSeries {
    first: Variable,
    num_hours: usize,
}

impl VariableSeries {
    /// The variable for the given hour
    pub fn at(self, hour: usize) -> Variable {
        assert!(hour < self.num_hours, "Hour {hour} out of range");
        self.first.offset(hour)
    }
}

/// Variables indexed by area and technology
pub type TechnologyVariables = HourlyVariableMap<(AreaID, TechnologyID)>;

/// All variables in the dispatch problem.
///
/// All variables are non-negative. Only hourly costs appear in the objective.
#[derive(Debug)]
pub struct Variables {
    /// Generation (or discharge) of every technology
    pub generation: TechnologyVariables,
    /// Committed capacity of thermal technologies
    pub committed: TechnologyVariables,
    /// Capacity started up in the hour
    pub startup: TechnologyVariables,
    /// Capacity shut down in the hour
    pub shutdown: TechnologyVariables,
    /// Increase in generation from the previous hour
    pub ramp_up: TechnologyVariables,
    /// Energy drawn to charge storage
    pub charge: TechnologyVariables,
    /// Energy held in storage at the start of the hour
    pub stored: TechnologyVariables,
    /// Upward reserve of every technology
    pub reserve: TechnologyVariables,
    /// Demand which is not served
    pub unserved: HourlyVariableMap<AreaID>,
    /// Imports into the first area from the second
    pub imports: HourlyVariableMap<(AreaID, AreaID)>,
    /// Exports from the first area to the second
    pub exports: HourlyVariableMap<(AreaID, AreaID)>,
    /// Imports into an area from an exogenous area
    pub exo_imports: HourlyVariableMap<(AreaID, ExoAreaID)>,
    /// Exports from an area to an exogenous area
    pub exo_exports: HourlyVariableMap<(AreaID, ExoAreaID)>,
    /// Cost of operating each area
    pub cost: HourlyVariableMap<AreaID>,
    /// Emissions of each area
    pub emissions: HourlyVariableMap<AreaID>,
}

impl Variables {
    /// Add all variables to the problem.
    ///
    /// Committed capacity is given an initial guess of its available capacity.
    pub fn new(builder: &mut ProblemBuilder, model: &Model) -> Result<Self> {
        let num_hours = model.calendar.num_hours();
        let sets = &model.technology_sets;
        let areas = || model.areas.keys().cloned();
        let all = || iproduct!(areas(), model.technologies.keys().cloned());
        let thermal = || iproduct!(areas(), sets.thermal.iter().cloned());
        let storage = || iproduct!(areas(), sets.storage.iter().cloned());
        let area_pairs = || iter_area_pairs(&model.areas).map(|(a1, a2)| (a1.clone(), a2.clone()));
        let exo_pairs = || iproduct!(areas(), model.exo_areas.keys().cloned());

        let variables = Self {
            generation: HourlyVariableMap::new(builder, all(), num_hours, 0.0),
            committed: HourlyVariableMap::new(builder, thermal(), num_hours, 0.0),
            startup: HourlyVariableMap::new(builder, thermal(), num_hours, 0.0),
            shutdown: HourlyVariableMap::new(builder, thermal(), num_hours, 0.0),
            ramp_up: HourlyVariableMap::new(builder, thermal(), num_hours, 0.0),
            charge: HourlyVariableMap::new(builder, storage(), num_hours, 0.0),
            stored: HourlyVariableMap::new(builder, storage(), num_hours, 0.0),
            reserve: HourlyVariableMap::new(builder, all(), num_hours, 0.0),
            unserved: HourlyVariableMap::new(builder, areas(), num_hours, 0.0),
            imports: HourlyVariableMap::new(builder, area_pairs(), num_hours, 0.0),
            exports: HourlyVariableMap::new(builder, area_pairs(), num_hours, 0.0),
            exo_imports: HourlyVariableMap::new(builder, exo_pairs(), num_hours, 0.0),
            exo_exports: HourlyVariableMap::new(builder, exo_pairs(), num_hours, 0.0),
            cost: HourlyVariableMap::new(builder, areas(), num_hours, 1.0 / COST_SCALE),
            emissions: HourlyVariableMap::new(builder, areas(), num_hours, 0.0),
        };

        for ((area_id, technology_id), _, var) in variables.committed.iter() {
            let available = model.fleet.capacity(area_id, technology_id)?
                * model.fleet.availability(area_id, technology_id)?.max.value();
            builder.set_initial_value(var, available);
        }

        Ok(variables)
    }
}
