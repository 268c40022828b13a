//! Generator records and the two-stage classification.
#![allow(missing_docs)]
use std::rc::Rc;

/// Whether a generator's decisions are made before or after the scenario is observed.
///
/// The classification is implicit in the input data: a generator is variable
/// iff it has capacity-factor entries. It is resolved once at load time so
/// the model assembly never has to re-derive it.
#[derive(PartialEq, Clone, Debug)]
pub enum Stage {
    /// Dispatchable generator: capacity and dispatch are first-stage
    /// decisions, shared across scenarios.
    Dispatchable,
    /// Variable (e.g. renewable) generator: capacity and dispatch are
    /// second-stage recourse decisions, indexed by scenario. Dispatch is
    /// bounded by `capacity_factors[s * n_timepoints + t]` times installed
    /// capacity.
    Variable {
        /// Dense capacity-factor table, indexed `[scenario][timepoint]`.
        /// Complete: one entry per (scenario, timepoint) pair.
        capacity_factors: Vec<f64>,
    },
}

/// A generator with a quadratic production cost
#[derive(PartialEq, Clone, Debug)]
pub struct Generator {
    /// Unique name identifying the generator
    pub name: Rc<str>,
    /// Free-form technology label
    pub tech: String,
    /// Dense index of the bus this generator is connected to
    pub bus: usize,
    /// Quadratic production cost coefficient, >= 0
    pub c2: f64,
    /// Linear production cost coefficient
    pub c1: f64,
    /// Constant production cost term
    pub c0: f64,
    /// Investment cost per MW of installed capacity
    pub invest_cost: f64,
    /// Pre-existing capacity in MW; a lower bound on installed capacity
    pub exist_cap: f64,
    /// Maximum installable capacity in MW, >= `exist_cap`
    pub cap_limit: f64,
    /// Variable O&M cost per MWh dispatched
    pub var_om_cost: f64,
    /// First- or second-stage classification
    pub stage: Stage,
}

impl Generator {
    /// Whether this generator's dispatch is a second-stage (recourse) decision
    pub fn is_variable(&self) -> bool {
        matches!(self.stage, Stage::Variable { .. })
    }

    /// The capacity factor for `(scenario, timepoint)`, or `None` for
    /// dispatchable generators.
    pub fn capacity_factor(&self, scenario: usize, timepoint: usize, n_timepoints: usize) -> Option<f64> {
        match &self.stage {
            Stage::Dispatchable => None,
            Stage::Variable { capacity_factors } => {
                Some(capacity_factors[scenario * n_timepoints + timepoint])
            }
        }
    }
}
