//! The transmission submodel.
//!
//! Adds bus-angle variables and the DC flow expressions derived from the
//! susceptance matrix, caps flows, and ties every submodel together through
//! the bus power-balance constraints.
use crate::model::costs::BusInjections;
use crate::network::Admittance;
use crate::settings::FlowLimits;
use crate::solver::{LinearExpr, Problem, Variable};
use crate::system::System;

/// The decision variables and flow expressions added by the transmission submodel
#[derive(Debug)]
pub struct TransmissionVariables {
    theta: Vec<Variable>,
    /// Net DC power leaving each bus, indexed like `theta`
    flows: Vec<LinearExpr>,
    n_scenarios: usize,
    n_timepoints: usize,
}

impl TransmissionVariables {
    fn index(&self, bus: usize, scenario: usize, timepoint: usize) -> usize {
        (bus * self.n_scenarios + scenario) * self.n_timepoints + timepoint
    }

    /// Voltage angle at a bus. The slack bus is fixed to zero.
    pub fn theta(&self, bus: usize, scenario: usize, timepoint: usize) -> Variable {
        self.theta[self.index(bus, scenario, timepoint)]
    }

    /// The net DC power leaving a bus, `sum_m B[n,m] (theta_n - theta_m)`
    pub fn flow(&self, bus: usize, scenario: usize, timepoint: usize) -> &LinearExpr {
        &self.flows[self.index(bus, scenario, timepoint)]
    }
}

/// Add angle variables, flow caps and the bus power-balance constraints.
///
/// The balance at each bus is an inequality: accumulated injections must
/// cover the load plus the net flow leaving the bus. Over-supply is
/// implicitly curtailed.
pub fn add_transmission_submodel(
    problem: &mut Problem,
    system: &System,
    admittance: &Admittance,
    injections: &BusInjections,
    flow_limits: FlowLimits,
) -> TransmissionVariables {
    let n_buses = system.buses.len();
    let n_scenarios = system.scenarios.len();
    let n_timepoints = system.timescale.len();
    let b = admittance.susceptance();

    let mut vars = TransmissionVariables {
        theta: Vec::with_capacity(n_buses * n_scenarios * n_timepoints),
        flows: Vec::new(),
        n_scenarios,
        n_timepoints,
    };

    for (n, bus) in system.buses.values().enumerate() {
        for scenario in system.scenarios.values() {
            for (_, timepoint) in system.timescale.iter() {
                let theta = problem.add_column(
                    format!("THETA[{},{},{}]", bus.name, scenario.name, timepoint.name),
                    ..,
                );
                vars.theta.push(theta);
                if n == system.slack_bus {
                    problem.fix(theta, 0.0);
                }
            }
        }
    }

    // Flow leaving bus n: the diagonal of B cancels out of the angle
    // differences, so only off-diagonal couplings appear.
    for (n, bus) in system.buses.values().enumerate() {
        for (s, scenario) in system.scenarios.values().enumerate() {
            for (t, timepoint) in system.timescale.iter() {
                let mut flow = LinearExpr::new();
                for m in 0..n_buses {
                    if m == n || b[(n, m)] == 0.0 {
                        continue;
                    }
                    flow.add_term(vars.theta(n, s, t), b[(n, m)]);
                    flow.add_term(vars.theta(m, s, t), -b[(n, m)]);
                }

                // An isolated bus has the empty flow expression and a zero
                // aggregate cap, so its row would be `-0 <= 0 <= 0`. Eliding
                // it changes nothing about the feasible set.
                if flow_limits == FlowLimits::PerBus && !is_isolated(&flow) {
                    let cap = admittance.max_flow[n];
                    problem.add_row(
                        format!("cFlowMax[{},{},{}]", bus.name, scenario.name, timepoint.name),
                        -cap..=cap,
                        flow.clone(),
                    );
                }

                vars.flows.push(flow);
            }
        }
    }

    if flow_limits == FlowLimits::PerLine {
        for line in &system.lines {
            let susceptance = line.susceptance();
            for (s, scenario) in system.scenarios.values().enumerate() {
                for (t, timepoint) in system.timescale.iter() {
                    let mut flow = LinearExpr::new();
                    flow.add_term(vars.theta(line.from, s, t), susceptance);
                    flow.add_term(vars.theta(line.to, s, t), -susceptance);
                    problem.add_row(
                        format!("cLineMax[{},{},{}]", line.name, scenario.name, timepoint.name),
                        -line.rate..=line.rate,
                        flow,
                    );
                }
            }
        }
    }

    // Power balance: injections cover load plus net outgoing flow
    for (n, bus) in system.buses.values().enumerate() {
        for (s, scenario) in system.scenarios.values().enumerate() {
            for (t, timepoint) in system.timescale.iter() {
                let mut balance = LinearExpr::new();
                balance += injections.get(n, s, t);
                for (var, coeff) in vars.flow(n, s, t).iter() {
                    balance.add_term(var, -coeff);
                }

                let load = system.loads.get(n, s, t);
                problem.add_row(
                    format!("cBalance[{},{},{}]", bus.name, scenario.name, timepoint.name),
                    load..,
                    balance,
                );
            }
        }
    }

    vars
}

/// Whether a bus has no transmission coupling at all.
///
/// Such a bus has an identically-zero flow expression and a zero aggregate
/// flow cap, so its flow-limit row is vacuous and is not added.
fn is_isolated(flow: &LinearExpr) -> bool {
    flow.iter().next().is_none()
}
