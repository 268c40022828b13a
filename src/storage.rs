//! Energy-storage records.
#![allow(missing_docs)]
use std::rc::Rc;

/// An energy-storage unit (e.g. a battery)
#[derive(PartialEq, Clone, Debug)]
pub struct EnergyStorage {
    /// Unique name identifying the storage unit
    pub name: Rc<str>,
    /// Free-form technology label
    pub tech: String,
    /// Dense index of the bus this unit is connected to
    pub bus: usize,
    /// Investment cost per MW of power capacity
    pub invest_cost: f64,
    /// Pre-existing power capacity in MW; a lower bound on installed capacity
    pub exist_power_cap: f64,
    /// Pre-existing energy capacity in MWh
    pub exist_energy_cap: f64,
    /// Variable O&M cost per MWh charged or discharged
    pub var_om_cost: f64,
    /// Round-trip efficiency, in (0, 1]. The square root applies to each of
    /// charge and discharge.
    pub efficiency: f64,
    /// Hours of storage at full power; energy capacity is `duration` times
    /// power capacity.
    pub duration: f64,
}

impl EnergyStorage {
    /// The one-way efficiency `sqrt(eta)` applied to charging; discharge is
    /// divided by the same factor.
    pub fn one_way_efficiency(&self) -> f64 {
        self.efficiency.sqrt()
    }
}
