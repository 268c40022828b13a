//! The energy-storage submodel.
//!
//! Each unit gets a first-stage power capacity and, per scenario and
//! timepoint, charge, discharge and state-of-energy variables. The
//! state-of-energy dynamics wrap cyclically within each timeseries, so the
//! energy balance closes over every loop.
use crate::model::costs::{BusInjections, CostRegisters};
use crate::settings::ExpectationMode;
use crate::solver::{LinearExpr, Problem, QuadExpr, Variable};
use crate::system::System;

/// The decision variables added by the storage submodel.
///
/// Units are indexed by their position in system order.
#[derive(Debug)]
pub struct StorageVariables {
    power_cap: Vec<Variable>,
    charge: Vec<Variable>,
    discharge: Vec<Variable>,
    soe: Vec<Variable>,
    n_scenarios: usize,
    n_timepoints: usize,
}

impl StorageVariables {
    fn index(&self, unit: usize, scenario: usize, timepoint: usize) -> usize {
        (unit * self.n_scenarios + scenario) * self.n_timepoints + timepoint
    }

    /// First-stage power capacity of a unit
    pub fn power_cap(&self, unit: usize) -> Variable {
        self.power_cap[unit]
    }

    pub fn charge(&self, unit: usize, scenario: usize, timepoint: usize) -> Variable {
        self.charge[self.index(unit, scenario, timepoint)]
    }

    pub fn discharge(&self, unit: usize, scenario: usize, timepoint: usize) -> Variable {
        self.discharge[self.index(unit, scenario, timepoint)]
    }

    /// State of energy at the end of a timepoint
    pub fn soe(&self, unit: usize, scenario: usize, timepoint: usize) -> Variable {
        self.soe[self.index(unit, scenario, timepoint)]
    }
}

/// Add storage variables, constraints and cost terms to the problem.
///
/// The net injection `discharge - charge` of each unit is accumulated into
/// the bus-injection register.
pub fn add_storage_submodel(
    problem: &mut Problem,
    system: &System,
    expectation: ExpectationMode,
    costs: &mut CostRegisters,
    injections: &mut BusInjections,
) -> StorageVariables {
    let n_scenarios = system.scenarios.len();
    let n_timepoints = system.timescale.len();
    let mut vars = StorageVariables {
        power_cap: Vec::new(),
        charge: Vec::new(),
        discharge: Vec::new(),
        soe: Vec::new(),
        n_scenarios,
        n_timepoints,
    };
    let mut local = CostRegisters::new(n_timepoints);

    for (e, unit) in system.storage.values().enumerate() {
        let power_cap = problem.add_column(
            format!("vEPCAP[{}]", unit.name),
            unit.exist_power_cap..,
        );
        vars.power_cap.push(power_cap);

        let mut invest = QuadExpr::new();
        invest.add_linear_term(power_cap, unit.invest_cost);
        local.add_period(&invest);

        let sqrt_eta = unit.one_way_efficiency();
        for (s, scenario) in system.scenarios.values().enumerate() {
            let weight = expectation.scenario_weight(scenario.probability, n_scenarios);

            for (t, timepoint) in system.timescale.iter() {
                let label = format!("{},{},{}", unit.name, scenario.name, timepoint.name);
                let charge = problem.add_column(format!("vCHG[{label}]"), 0.0..);
                let discharge = problem.add_column(format!("vDIS[{label}]"), 0.0..);
                let soe = problem.add_column(format!("vSOE[{label}]"), 0.0..);
                vars.charge.push(charge);
                vars.discharge.push(discharge);
                vars.soe.push(soe);

                // State of energy cannot exceed the energy capacity,
                // `duration * vEPCAP`
                let mut row = LinearExpr::new();
                row.add_term(soe, 1.0);
                row.add_term(power_cap, -unit.duration);
                problem.add_row(format!("cSoeMax[{label}]"), ..=0.0, row);

                // Charging and discharging share the power capacity
                let mut row = LinearExpr::new();
                row.add_term(charge, 1.0);
                row.add_term(discharge, 1.0);
                row.add_term(power_cap, -1.0);
                problem.add_row(format!("cPowerMax[{label}]"), ..=0.0, row);

                injections.add_term(unit.bus, s, t, discharge, 1.0);
                injections.add_term(unit.bus, s, t, charge, -1.0);

                let mut om = QuadExpr::new();
                om.add_linear_term(charge, unit.var_om_cost * weight);
                om.add_linear_term(discharge, unit.var_om_cost * weight);
                local.add_timepoint(t, &om);
            }

            // Dynamics: SOE[t] = SOE[prev(t)] + sqrt(eta) * CHG * dur
            //                    - DIS * dur / sqrt(eta),
            // with prev wrapping within each timeseries. For a timeseries of
            // length one this pins net cycling to zero.
            for (t, timepoint) in system.timescale.iter() {
                let dur = timepoint.duration_hrs;
                let mut row = LinearExpr::new();
                row.add_term(vars.soe(e, s, t), 1.0);
                row.add_term(vars.soe(e, s, timepoint.prev), -1.0);
                row.add_term(vars.charge(e, s, t), -sqrt_eta * dur);
                row.add_term(vars.discharge(e, s, t), dur / sqrt_eta);
                problem.add_row(
                    format!("cSoeBalance[{},{},{}]", unit.name, scenario.name, timepoint.name),
                    0.0..=0.0,
                    row,
                );
            }
        }
    }

    costs.merge_from(&local);

    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::storage_system;
    use crate::model::generator::add_generator_submodel;
    use crate::model::transmission::add_transmission_submodel;
    use crate::network::build_admittance;
    use crate::settings::FlowLimits;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// Storage shifts energy from the cheap to the expensive timepoint and
    /// the state of energy closes over the loop.
    #[rstest]
    fn test_storage_cycles_between_timepoints(storage_system: System) {
        let system = storage_system;
        let mut problem = Problem::new();
        let mut costs = CostRegisters::new(system.timescale.len());
        let mut injections = BusInjections::new(
            system.buses.len(),
            system.scenarios.len(),
            system.timescale.len(),
        );

        add_generator_submodel(
            &mut problem,
            &system,
            ExpectationMode::SourceCompat,
            &mut costs,
            &mut injections,
        );
        let storage_vars = add_storage_submodel(
            &mut problem,
            &system,
            ExpectationMode::SourceCompat,
            &mut costs,
            &mut injections,
        );
        let admittance = build_admittance(system.buses.len(), &system.lines, false);
        add_transmission_submodel(
            &mut problem,
            &system,
            &admittance,
            &injections,
            FlowLimits::PerBus,
        );

        problem.set_objective(costs.weighted_objective(&system.timescale));
        let solution = problem.solve().unwrap();

        // The system has load 80 at t0 and 40 at t1 but only 60 MW of cheap
        // generation, so storage charges 20 in t1 and discharges 20 in t0.
        let charge_t0 = solution.value(storage_vars.charge(0, 0, 0));
        let discharge_t0 = solution.value(storage_vars.discharge(0, 0, 0));
        let charge_t1 = solution.value(storage_vars.charge(0, 0, 1));
        let discharge_t1 = solution.value(storage_vars.discharge(0, 0, 1));
        assert_approx_eq!(f64, discharge_t0, 20.0, epsilon = 1e-3);
        assert_approx_eq!(f64, charge_t1, 20.0, epsilon = 1e-3);
        assert_approx_eq!(f64, charge_t0, 0.0, epsilon = 1e-3);
        assert_approx_eq!(f64, discharge_t1, 0.0, epsilon = 1e-3);

        // Net cycling around the loop is zero (perfect efficiency here)
        let net: f64 = (0..system.timescale.len())
            .map(|t| {
                solution.value(storage_vars.charge(0, 0, t))
                    - solution.value(storage_vars.discharge(0, 0, t))
            })
            .sum();
        assert_approx_eq!(f64, net, 0.0, epsilon = 1e-3);

        // Power capacity covers the larger of charge and discharge
        let cap = solution.value(storage_vars.power_cap(0));
        assert_approx_eq!(f64, cap, 20.0, epsilon = 1e-3);
    }

    /// With a single timepoint the dynamics pin net cycling to zero
    #[rstest]
    fn test_single_timepoint_no_net_cycling(storage_system: System) {
        let mut system = storage_system;
        // Shrink the horizon to one self-wrapping timepoint
        system.timescale.timeseries[0].number_timepoints = 1;
        system.timescale.timeseries[0].timepoints.truncate(1);
        system.timescale.timepoints.truncate(1);
        system.timescale.timepoints[0].prev = 0;
        system.timescale.timepoint_names.truncate(1);
        system.loads = crate::demand::LoadMap::new(1, 1, 1);
        system.loads.insert(0, 0, 0, 40.0).unwrap();
        // An imperfect round trip makes any cycling strictly lossy
        system.storage[0].efficiency = 0.8;

        let mut problem = Problem::new();
        let mut costs = CostRegisters::new(1);
        let mut injections = BusInjections::new(1, 1, 1);
        add_generator_submodel(
            &mut problem,
            &system,
            ExpectationMode::SourceCompat,
            &mut costs,
            &mut injections,
        );
        let storage_vars = add_storage_submodel(
            &mut problem,
            &system,
            ExpectationMode::SourceCompat,
            &mut costs,
            &mut injections,
        );
        let admittance = build_admittance(system.buses.len(), &system.lines, false);
        add_transmission_submodel(
            &mut problem,
            &system,
            &admittance,
            &injections,
            FlowLimits::PerBus,
        );

        problem.set_objective(costs.weighted_objective(&system.timescale));
        let solution = problem.solve().unwrap();

        // sqrt(eta) * CHG = DIS / sqrt(eta) with eta < 1 forces both to zero
        assert_approx_eq!(f64, solution.value(storage_vars.charge(0, 0, 0)), 0.0, epsilon = 1e-3);
        assert_approx_eq!(
            f64,
            solution.value(storage_vars.discharge(0, 0, 0)),
            0.0,
            epsilon = 1e-3
        );
    }
}
