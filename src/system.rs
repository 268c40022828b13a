//! The system aggregate: everything read from the input directory.
#![allow(missing_docs)]
use crate::demand::LoadMap;
use crate::generator::Generator;
use crate::input::bus::read_buses;
use crate::input::capacity_factor::read_capacity_factors;
use crate::input::generator::read_generators;
use crate::input::line::read_lines;
use crate::input::load::read_loads;
use crate::input::policy::read_policy;
use crate::input::scenario::read_scenarios;
use crate::input::storage::read_storage;
use crate::input::time::read_timescale;
use crate::network::{Bus, Line};
use crate::policy::Policy;
use crate::scenario::Scenario;
use crate::storage::EnergyStorage;
use crate::time::TimescaleInfo;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use ::log::info;
use std::path::Path;
use std::rc::Rc;

/// The subdirectory of the model directory holding the input CSV files
pub const INPUTS_DIR_NAME: &str = "inputs";

/// The validated, immutable description of the power system.
///
/// Constructed once by [`System::from_path`] and read-only thereafter. All
/// cross-references (bus names, scenario names, timepoint names) have been
/// resolved to dense indices, so model assembly never fails on lookups.
#[derive(Debug)]
pub struct System {
    pub buses: IndexMap<Rc<str>, Bus>,
    pub lines: Vec<Line>,
    pub generators: IndexMap<Rc<str>, Generator>,
    pub storage: IndexMap<Rc<str>, EnergyStorage>,
    pub scenarios: IndexMap<Rc<str>, Scenario>,
    pub timescale: TimescaleInfo,
    pub loads: LoadMap,
    pub policy: Policy,
    /// Dense index of the angle-reference bus
    pub slack_bus: usize,
}

impl System {
    /// Read and validate a system from `<main_dir>/inputs/`.
    ///
    /// Any missing file, malformed column or dangling reference aborts the
    /// load with a diagnostic naming the offending file.
    pub fn from_path<P: AsRef<Path>>(main_dir: P) -> Result<System> {
        let inputs_dir = main_dir.as_ref().join(INPUTS_DIR_NAME);
        ensure!(
            inputs_dir.is_dir(),
            "Input directory {} not found",
            inputs_dir.to_string_lossy()
        );

        let buses = read_buses(&inputs_dir)?;
        let lines = read_lines(&inputs_dir, &buses)?;
        let scenarios = read_scenarios(&inputs_dir)?;
        let timescale = read_timescale(&inputs_dir)?;
        let capacity_factors = read_capacity_factors(&inputs_dir, &scenarios, &timescale)?;
        let generators = read_generators(&inputs_dir, &buses, capacity_factors)?;
        let storage = read_storage(&inputs_dir, &buses)?;
        let loads = read_loads(&inputs_dir, &buses, &scenarios, &timescale)?;
        let policy = read_policy(&inputs_dir)?;

        let slack_bus = buses
            .values()
            .position(|bus| bus.slack)
            .expect("slack bus validated on read");

        let system = System {
            buses,
            lines,
            generators,
            storage,
            scenarios,
            timescale,
            loads,
            policy,
            slack_bus,
        };
        info!(
            "Loaded system: {} buses, {} lines, {} generators ({} variable), {} storage units, \
             {} scenarios, {} timepoints",
            system.buses.len(),
            system.lines.len(),
            system.generators.len(),
            system.variable_generators().count(),
            system.storage.len(),
            system.scenarios.len(),
            system.timescale.len(),
        );

        Ok(system)
    }

    /// Iterate over first-stage (dispatchable) generators
    pub fn dispatchable_generators(&self) -> impl Iterator<Item = &Generator> {
        self.generators.values().filter(|generator| !generator.is_variable())
    }

    /// Iterate over second-stage (variable) generators
    pub fn variable_generators(&self) -> impl Iterator<Item = &Generator> {
        self.generators.values().filter(|generator| generator.is_variable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Stage;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    /// Write a complete two-bus model to `<dir>/inputs/`
    fn create_two_bus_inputs(dir: &Path) {
        let inputs = dir.join(INPUTS_DIR_NAME);
        std::fs::create_dir(&inputs).unwrap();
        let write = |name: &str, contents: &str| {
            let mut file = File::create(inputs.join(name)).unwrap();
            writeln!(file, "{contents}").unwrap();
        };

        write(
            "buses.csv",
            "name,kv,type,lat,lon,slack\nA,230,pq,0,0,true\nB,230,pq,1,1,false",
        );
        write(
            "lines.csv",
            "name,from_bus,to_bus,rate,r,x,g,b\nAB,A,B,100,0,0.1,0,0",
        );
        write("scenarios.csv", "name,probability\nbase,1.0");
        write(
            "timeseries.csv",
            "id,name,duration_of_timepoints,number_timepoints,scale_to_period\n0,all,1,1,1",
        );
        write("timepoints.csv", "id,name,timeseries_name\n0,t0,all");
        write(
            "generators.csv",
            "name,tech,bus_name,c2,c1,c0,invest_cost,exist_cap,cap_limit,var_om_cost\n\
             thermal,ccgt,A,0,10,0,2,0,1000,0\n\
             wind,onshore,B,0,0,0,1,0,1000,0",
        );
        write(
            "energy_storage.csv",
            "name,tech,bus_name,invest_cost,exist_power_cap,exist_energy_cap,var_om_cost,efficiency,duration\n\
             batt,li-ion,B,1.5,0,0,0.1,0.9,4",
        );
        write(
            "loads.csv",
            "bus_name,scenario_name,timepoint_name,load_mw\nB,base,t0,50",
        );
        write(
            "capacity_factors.csv",
            "generator_name,scenario_name,timepoint_name,capacity_factor\nwind,base,t0,0.4",
        );
        write("max_diffangle.csv", "max_diffangle\n30");
    }

    #[test]
    fn test_system_from_path() {
        let dir = tempdir().unwrap();
        create_two_bus_inputs(dir.path());

        let system = System::from_path(dir.path()).unwrap();
        assert_eq!(system.buses.len(), 2);
        assert_eq!(system.slack_bus, 0);
        assert_eq!(system.lines.len(), 1);
        assert_eq!(system.dispatchable_generators().count(), 1);
        assert_eq!(system.variable_generators().count(), 1);
        assert_eq!(system.loads.get(1, 0, 0), 50.0);

        let wind = &system.generators["wind"];
        assert!(matches!(
            &wind.stage,
            Stage::Variable { capacity_factors } if capacity_factors == &vec![0.4]
        ));
    }

    #[test]
    fn test_system_from_path_missing_inputs_dir() {
        let dir = tempdir().unwrap();
        let result = System::from_path(dir.path());
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("inputs"));
    }

    #[test]
    fn test_system_from_path_missing_file() {
        let dir = tempdir().unwrap();
        create_two_bus_inputs(dir.path());
        std::fs::remove_file(dir.path().join(INPUTS_DIR_NAME).join("loads.csv")).unwrap();

        let result = System::from_path(dir.path());
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("loads.csv"));
    }
}
