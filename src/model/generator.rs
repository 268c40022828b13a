//! The generator submodel.
//!
//! Dispatchable generators make first-stage decisions: one capacity and one
//! dispatch schedule shared by every scenario. Variable generators make
//! second-stage (recourse) decisions indexed by scenario, with dispatch
//! bounded by the scenario's capacity factor times installed capacity.
use crate::generator::Generator;
use crate::model::costs::{BusInjections, CostRegisters};
use crate::settings::ExpectationMode;
use crate::solver::{LinearExpr, Problem, QuadExpr, Variable};
use crate::system::System;

/// The decision variables added by the generator submodel.
///
/// Generators are indexed by their position within the dispatchable or
/// variable group, in system order.
#[derive(Debug)]
pub struct GeneratorVariables {
    dispatch: Vec<Variable>,
    capacity: Vec<Variable>,
    dispatch_v: Vec<Variable>,
    capacity_v: Vec<Variable>,
    n_scenarios: usize,
    n_timepoints: usize,
}

impl GeneratorVariables {
    /// First-stage dispatch of dispatchable generator `gn` at a timepoint
    pub fn dispatch(&self, gn: usize, timepoint: usize) -> Variable {
        self.dispatch[gn * self.n_timepoints + timepoint]
    }

    /// First-stage capacity of dispatchable generator `gn`
    pub fn capacity(&self, gn: usize) -> Variable {
        self.capacity[gn]
    }

    /// Second-stage dispatch of variable generator `gv` in a scenario at a timepoint
    pub fn dispatch_v(&self, gv: usize, scenario: usize, timepoint: usize) -> Variable {
        self.dispatch_v[(gv * self.n_scenarios + scenario) * self.n_timepoints + timepoint]
    }

    /// Second-stage capacity of variable generator `gv` in a scenario
    pub fn capacity_v(&self, gv: usize, scenario: usize) -> Variable {
        self.capacity_v[gv * self.n_scenarios + scenario]
    }
}

/// Add generator variables, constraints and cost terms to the problem.
///
/// Injections at each generator's bus are accumulated into `injections`.
/// Cost terms are accumulated into the shared `costs` registers; the
/// submodel's own contribution is also returned separately for the itemized
/// generator-cost output.
pub fn add_generator_submodel(
    problem: &mut Problem,
    system: &System,
    expectation: ExpectationMode,
    costs: &mut CostRegisters,
    injections: &mut BusInjections,
) -> (GeneratorVariables, CostRegisters) {
    let n_scenarios = system.scenarios.len();
    let n_timepoints = system.timescale.len();
    let mut vars = GeneratorVariables {
        dispatch: Vec::new(),
        capacity: Vec::new(),
        dispatch_v: Vec::new(),
        capacity_v: Vec::new(),
        n_scenarios,
        n_timepoints,
    };
    let mut local = CostRegisters::new(n_timepoints);

    for generator in system.dispatchable_generators() {
        let cap = problem.add_column(
            format!("vCAP[{}]", generator.name),
            generator.exist_cap..=generator.cap_limit,
        );
        vars.capacity.push(cap);

        let mut invest = QuadExpr::new();
        invest.add_linear_term(cap, generator.invest_cost);
        local.add_period(&invest);

        for (t, timepoint) in system.timescale.iter() {
            let dispatch = problem.add_column(
                format!("vGEN[{},{}]", generator.name, timepoint.name),
                0.0..,
            );
            vars.dispatch.push(dispatch);

            // Dispatch cannot exceed installed capacity
            let mut row = LinearExpr::new();
            row.add_term(dispatch, 1.0);
            row.add_term(cap, -1.0);
            problem.add_row(
                format!("cGenMax[{},{}]", generator.name, timepoint.name),
                ..=0.0,
                row,
            );

            // First-stage dispatch feeds the bus in every scenario
            for s in 0..n_scenarios {
                injections.add_term(generator.bus, s, t, dispatch, 1.0);
            }

            local.add_timepoint(t, &production_cost(generator, dispatch, 1.0));
        }
    }

    for generator in system.variable_generators() {
        for (s, scenario) in system.scenarios.values().enumerate() {
            let weight = expectation.scenario_weight(scenario.probability, n_scenarios);

            let cap = problem.add_column(
                format!("vCAPV[{},{}]", generator.name, scenario.name),
                generator.exist_cap..=generator.cap_limit,
            );
            vars.capacity_v.push(cap);

            let mut invest = QuadExpr::new();
            invest.add_linear_term(cap, generator.invest_cost * weight);
            local.add_period(&invest);

            for (t, timepoint) in system.timescale.iter() {
                let dispatch = problem.add_column(
                    format!("vGENV[{},{},{}]", generator.name, scenario.name, timepoint.name),
                    0.0..,
                );
                vars.dispatch_v.push(dispatch);

                // Dispatch cannot exceed the capacity factor times capacity
                let cf = generator
                    .capacity_factor(s, t, n_timepoints)
                    .expect("variable generator has a complete capacity-factor table");
                let mut row = LinearExpr::new();
                row.add_term(dispatch, 1.0);
                row.add_term(cap, -cf);
                problem.add_row(
                    format!("cGenMaxV[{},{},{}]", generator.name, scenario.name, timepoint.name),
                    ..=0.0,
                    row,
                );

                injections.add_term(generator.bus, s, t, dispatch, 1.0);

                local.add_timepoint(t, &production_cost(generator, dispatch, weight));
            }
        }
    }

    costs.merge_from(&local);

    (vars, local)
}

/// The production cost of one generator's dispatch at one timepoint,
/// `weight * (c2 d^2 + (c1 + vom) d + c0)`
fn production_cost(generator: &Generator, dispatch: Variable, weight: f64) -> QuadExpr {
    let mut term = QuadExpr::new();
    term.add_quadratic_term(dispatch, dispatch, generator.c2 * weight);
    term.add_linear_term(dispatch, (generator.c1 + generator.var_om_cost) * weight);
    term.add_constant(generator.c0 * weight);

    term
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{two_bus_system, variable_generator};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// Capacity is sized to the load and stays within its bounds
    #[rstest]
    fn test_generator_capacity_tracks_dispatch(two_bus_system: System) {
        let system = two_bus_system;
        let mut problem = Problem::new();
        let mut costs = CostRegisters::new(system.timescale.len());
        let mut injections = BusInjections::new(
            system.buses.len(),
            system.scenarios.len(),
            system.timescale.len(),
        );

        let (vars, _) = add_generator_submodel(
            &mut problem,
            &system,
            ExpectationMode::SourceCompat,
            &mut costs,
            &mut injections,
        );

        // One dispatchable generator, one timepoint: force dispatch of 50
        let mut demand = LinearExpr::new();
        demand.add_term(vars.dispatch(0, 0), 1.0);
        problem.add_row("demand", 50.0.., demand);
        problem.set_objective(costs.weighted_objective(&system.timescale));

        let solution = problem.solve().unwrap();
        let generator = system.dispatchable_generators().next().unwrap();
        let capacity = solution.value(vars.capacity(0));
        assert_approx_eq!(f64, solution.value(vars.dispatch(0, 0)), 50.0, epsilon = 1e-4);
        assert!(capacity >= 50.0 - 1e-4);
        assert!(capacity >= generator.exist_cap - 1e-9 && capacity <= generator.cap_limit + 1e-9);

        // Cost: 10 * 50 dispatch + 2 * 50 invest
        assert_approx_eq!(f64, solution.objective_value(), 600.0, epsilon = 1e-3);
    }

    /// Variable dispatch is limited by the capacity factor
    #[rstest]
    fn test_variable_dispatch_capped_by_capacity_factor(two_bus_system: System) {
        let mut system = two_bus_system;
        let wind = variable_generator("wind", 1, vec![0.4]);
        system
            .generators
            .insert(std::rc::Rc::clone(&wind.name), wind);
        let mut problem = Problem::new();
        let mut costs = CostRegisters::new(system.timescale.len());
        let mut injections = BusInjections::new(
            system.buses.len(),
            system.scenarios.len(),
            system.timescale.len(),
        );

        let (vars, _) = add_generator_submodel(
            &mut problem,
            &system,
            ExpectationMode::SourceCompat,
            &mut costs,
            &mut injections,
        );

        // Reward variable dispatch, unconstrained otherwise: it can rise only
        // as far as cf * capacity, and capacity only as far as its limit.
        let mut objective = costs.weighted_objective(&system.timescale);
        objective.add_linear_term(vars.dispatch_v(0, 0, 0), -1000.0);
        problem.set_objective(objective);

        let solution = problem.solve().unwrap();
        let generator = system.variable_generators().next().unwrap();
        let cf = generator.capacity_factor(0, 0, system.timescale.len()).unwrap();
        let dispatch = solution.value(vars.dispatch_v(0, 0, 0));
        let capacity = solution.value(vars.capacity_v(0, 0));
        assert_approx_eq!(f64, dispatch, cf * capacity, epsilon = 1e-3);
        assert_approx_eq!(f64, capacity, generator.cap_limit, epsilon = 1e-3);
    }
}
