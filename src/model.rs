//! Code for assembling and solving the capacity-expansion model.
//!
//! The composer invokes the submodels in a fixed order — generator, storage,
//! transmission, policy — because transmission consumes the bus injections
//! the first two produce. Each submodel registers its variables and
//! constraints with the shared problem and accumulates additively into the
//! shared cost registers; the objective is the weighted sum of per-timepoint
//! costs plus the per-period cost.
#![allow(missing_docs)]
use crate::model::costs::{BusInjections, CostRegisters};
use crate::model::generator::{GeneratorVariables, add_generator_submodel};
use crate::model::policy::add_policy_submodel;
use crate::model::storage::{StorageVariables, add_storage_submodel};
use crate::model::transmission::{TransmissionVariables, add_transmission_submodel};
use crate::network::build_admittance;
use crate::settings::Settings;
use crate::solver::{Problem, Solution};
use crate::system::System;
use crate::time::TimescaleInfo;
use ::log::info;
use anyhow::Result;
use std::io;

pub mod costs;
pub mod generator;
pub mod policy;
pub mod storage;
pub mod transmission;

/// The assembled (but not yet solved) optimisation model
pub struct ExpansionModel {
    problem: Problem,
    generators: GeneratorVariables,
    storage: StorageVariables,
    transmission: TransmissionVariables,
    costs: CostRegisters,
    gen_costs: CostRegisters,
}

/// Assemble the full model for a system.
///
/// Assembly cannot fail: every reference in the system has already been
/// resolved at load time.
pub fn build_model(system: &System, settings: &Settings) -> ExpansionModel {
    let mut problem = Problem::new();
    if let Some(limit) = settings.solver_time_limit {
        problem.set_time_limit(limit);
    }
    // Let the solver talk when we are listening at debug level
    problem.set_verbose(::log::log_enabled!(::log::Level::Debug));

    let mut costs = CostRegisters::new(system.timescale.len());
    let mut injections = BusInjections::new(
        system.buses.len(),
        system.scenarios.len(),
        system.timescale.len(),
    );

    let (generators, gen_costs) = add_generator_submodel(
        &mut problem,
        system,
        settings.expectation_mode,
        &mut costs,
        &mut injections,
    );
    let storage = add_storage_submodel(
        &mut problem,
        system,
        settings.expectation_mode,
        &mut costs,
        &mut injections,
    );
    let admittance = build_admittance(system.buses.len(), &system.lines, settings.include_shunts);
    let transmission = add_transmission_submodel(
        &mut problem,
        system,
        &admittance,
        &injections,
        settings.flow_limits,
    );
    add_policy_submodel(&mut problem, system, &transmission);

    problem.set_objective(costs.weighted_objective(&system.timescale));
    info!(
        "Assembled model with {} variables and {} constraints",
        problem.num_columns(),
        problem.num_rows()
    );

    ExpansionModel {
        problem,
        generators,
        storage,
        transmission,
        costs,
        gen_costs,
    }
}

impl ExpansionModel {
    /// Write a human-readable dump of the assembled problem
    pub fn write_debug(&self, writer: &mut impl io::Write) -> io::Result<()> {
        self.problem.write_debug(writer)
    }

    /// Hand the model to the solver, consuming it.
    ///
    /// On anything other than an (almost) optimal outcome the error carries
    /// the solver's termination status unchanged and no results exist.
    pub fn solve(self) -> Result<SolvedModel> {
        let solution = self.problem.solve()?;
        info!("Solved with total cost {:.6}", solution.objective_value());

        Ok(SolvedModel {
            solution,
            generators: self.generators,
            storage: self.storage,
            transmission: self.transmission,
            costs: self.costs,
            gen_costs: self.gen_costs,
        })
    }
}

/// A solved model: the primal solution plus everything needed to read it back
#[derive(Debug)]
pub struct SolvedModel {
    pub solution: Solution,
    pub generators: GeneratorVariables,
    pub storage: StorageVariables,
    pub transmission: TransmissionVariables,
    pub costs: CostRegisters,
    pub gen_costs: CostRegisters,
}

/// Itemized costs evaluated at the solution
pub struct CostBreakdown {
    /// Weighted sum of the per-timepoint operational costs
    pub timepoint: f64,
    /// The per-period fixed cost
    pub period: f64,
    pub total: f64,
}

impl SolvedModel {
    /// Evaluate a set of cost registers at the solution
    pub fn breakdown(&self, registers: &CostRegisters, timescale: &TimescaleInfo) -> CostBreakdown {
        let timepoint: f64 = timescale
            .iter()
            .map(|(index, tp)| tp.weight * self.solution.evaluate(registers.timepoint(index)))
            .sum();
        let period = self.solution.evaluate(registers.period());

        CostBreakdown {
            timepoint,
            period,
            total: timepoint + period,
        }
    }
}
