//! The load table, keyed by bus, scenario and timepoint.
use anyhow::{Result, ensure};

/// Demand in MW for every `(bus, scenario, timepoint)` combination.
///
/// Stored densely so the balance-constraint loops index straight into a flat
/// vector; input entries are sparse and missing combinations denote zero.
#[derive(PartialEq, Clone, Debug)]
pub struct LoadMap {
    values: Vec<f64>,
    n_scenarios: usize,
    n_timepoints: usize,
}

impl LoadMap {
    /// Create a table of zeros for the given dimensions
    pub fn new(n_buses: usize, n_scenarios: usize, n_timepoints: usize) -> Self {
        Self {
            values: vec![0.0; n_buses * n_scenarios * n_timepoints],
            n_scenarios,
            n_timepoints,
        }
    }

    fn index(&self, bus: usize, scenario: usize, timepoint: usize) -> usize {
        (bus * self.n_scenarios + scenario) * self.n_timepoints + timepoint
    }

    /// The load in MW at the given combination (zero if never set)
    pub fn get(&self, bus: usize, scenario: usize, timepoint: usize) -> f64 {
        self.values[self.index(bus, scenario, timepoint)]
    }

    /// Set the load for a combination, rejecting duplicate entries
    pub fn insert(&mut self, bus: usize, scenario: usize, timepoint: usize, mw: f64) -> Result<()> {
        let index = self.index(bus, scenario, timepoint);
        ensure!(
            self.values[index] == 0.0,
            "Duplicate load entry for bus {bus}, scenario {scenario}, timepoint {timepoint}"
        );
        self.values[index] = mw;

        Ok(())
    }
}
