//! The module responsible for writing result data to disk.
//!
//! Result files are written only after a successful solve; a failed solve
//! leaves the output directory without result CSVs.
use crate::model::SolvedModel;
use crate::system::System;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The subdirectory of the model directory holding result files by default
pub const OUTPUTS_DIR_NAME: &str = "outputs";

const GEN_CAP_FILE_NAME: &str = "gen_cap.csv";
const GEN_DISPATCH_FILE_NAME: &str = "gen_dispatch.csv";
const VAR_GEN_CAP_FILE_NAME: &str = "var_gen_cap.csv";
const VAR_GEN_DISPATCH_FILE_NAME: &str = "var_gen_dispatch.csv";
const STORAGE_CAP_FILE_NAME: &str = "storage_cap.csv";
const STORAGE_DISPATCH_FILE_NAME: &str = "storage_dispatch.csv";
const COSTS_FILE_NAME: &str = "costs_itemized.csv";
const GEN_COSTS_FILE_NAME: &str = "gen_costs_itemized.csv";

/// Create the output directory (with parents) if it does not yet exist
pub fn create_output_directory(output_path: &Path) -> Result<()> {
    if output_path.is_dir() {
        // already exists
        return Ok(());
    }

    fs::create_dir_all(output_path)
        .with_context(|| format!("Could not create {}", output_path.to_string_lossy()))
}

/// A row of `gen_cap.csv`
#[derive(Serialize)]
struct GenCapRow<'a> {
    gen_name: &'a str,
    #[serde(rename = "GenCapacity")]
    capacity: f64,
}

/// A row of `gen_dispatch.csv`
#[derive(Serialize)]
struct GenDispatchRow<'a> {
    gen_name: &'a str,
    timepoint: &'a str,
    #[serde(rename = "GenDispatch")]
    dispatch: f64,
}

/// A row of `var_gen_cap.csv`
#[derive(Serialize)]
struct VarGenCapRow<'a> {
    gen_name: &'a str,
    scenario: &'a str,
    #[serde(rename = "VarGenCapacity")]
    capacity: f64,
}

/// A row of `var_gen_dispatch.csv`
#[derive(Serialize)]
struct VarGenDispatchRow<'a> {
    gen_name: &'a str,
    scenario: &'a str,
    timepoint: &'a str,
    #[serde(rename = "VarGenDispatch")]
    dispatch: f64,
}

/// A row of `storage_cap.csv`
#[derive(Serialize)]
struct StorageCapRow<'a> {
    storage_name: &'a str,
    #[serde(rename = "PowerCapacity")]
    power_capacity: f64,
    #[serde(rename = "EnergyCapacity")]
    energy_capacity: f64,
}

/// A row of `storage_dispatch.csv`
#[derive(Serialize)]
struct StorageDispatchRow<'a> {
    storage_name: &'a str,
    scenario: &'a str,
    timepoint: &'a str,
    #[serde(rename = "Charge")]
    charge: f64,
    #[serde(rename = "Discharge")]
    discharge: f64,
    #[serde(rename = "StateOfEnergy")]
    state_of_energy: f64,
}

/// A row of the itemized cost files
#[derive(Serialize, Deserialize)]
pub struct CostRow {
    /// One of `CostPerTimepoint`, `CostPerPeriod` or `TotalCost`
    pub component: String,
    /// The cost of that component at the solution
    pub cost: f64,
}

/// Writes the result CSV files for a solved model
pub struct DataWriter {
    output_path: PathBuf,
}

impl DataWriter {
    /// Create a writer targeting the given output directory
    pub fn create(output_path: &Path) -> Result<Self> {
        create_output_directory(output_path)?;

        Ok(Self {
            output_path: output_path.to_owned(),
        })
    }

    /// Write every result file for a solved model
    pub fn write_results(&self, system: &System, solved: &SolvedModel) -> Result<()> {
        self.write_gen_capacities(system, solved)?;
        self.write_gen_dispatch(system, solved)?;
        self.write_storage_results(system, solved)?;
        self.write_costs(system, solved)?;

        Ok(())
    }

    fn writer(&self, file_name: &str) -> Result<csv::Writer<fs::File>> {
        let file_path = self.output_path.join(file_name);
        csv::Writer::from_path(&file_path)
            .with_context(|| format!("Could not create {}", file_path.to_string_lossy()))
    }

    fn write_gen_capacities(&self, system: &System, solved: &SolvedModel) -> Result<()> {
        let mut writer = self.writer(GEN_CAP_FILE_NAME)?;
        for (gn, generator) in system.dispatchable_generators().enumerate() {
            writer.serialize(GenCapRow {
                gen_name: &generator.name,
                capacity: solved.solution.value(solved.generators.capacity(gn)),
            })?;
        }
        writer.flush()?;

        let mut writer = self.writer(VAR_GEN_CAP_FILE_NAME)?;
        for (gv, generator) in system.variable_generators().enumerate() {
            for (s, scenario) in system.scenarios.values().enumerate() {
                writer.serialize(VarGenCapRow {
                    gen_name: &generator.name,
                    scenario: &scenario.name,
                    capacity: solved.solution.value(solved.generators.capacity_v(gv, s)),
                })?;
            }
        }
        writer.flush()?;

        Ok(())
    }

    fn write_gen_dispatch(&self, system: &System, solved: &SolvedModel) -> Result<()> {
        let mut writer = self.writer(GEN_DISPATCH_FILE_NAME)?;
        for (gn, generator) in system.dispatchable_generators().enumerate() {
            for (t, timepoint) in system.timescale.iter() {
                writer.serialize(GenDispatchRow {
                    gen_name: &generator.name,
                    timepoint: &timepoint.name,
                    dispatch: solved.solution.value(solved.generators.dispatch(gn, t)),
                })?;
            }
        }
        writer.flush()?;

        let mut writer = self.writer(VAR_GEN_DISPATCH_FILE_NAME)?;
        for (gv, generator) in system.variable_generators().enumerate() {
            for (s, scenario) in system.scenarios.values().enumerate() {
                for (t, timepoint) in system.timescale.iter() {
                    writer.serialize(VarGenDispatchRow {
                        gen_name: &generator.name,
                        scenario: &scenario.name,
                        timepoint: &timepoint.name,
                        dispatch: solved.solution.value(solved.generators.dispatch_v(gv, s, t)),
                    })?;
                }
            }
        }
        writer.flush()?;

        Ok(())
    }

    fn write_storage_results(&self, system: &System, solved: &SolvedModel) -> Result<()> {
        let mut writer = self.writer(STORAGE_CAP_FILE_NAME)?;
        for (e, unit) in system.storage.values().enumerate() {
            let power_capacity = solved.solution.value(solved.storage.power_cap(e));
            writer.serialize(StorageCapRow {
                storage_name: &unit.name,
                power_capacity,
                energy_capacity: unit.duration * power_capacity,
            })?;
        }
        writer.flush()?;

        let mut writer = self.writer(STORAGE_DISPATCH_FILE_NAME)?;
        for (e, unit) in system.storage.values().enumerate() {
            for (s, scenario) in system.scenarios.values().enumerate() {
                for (t, timepoint) in system.timescale.iter() {
                    writer.serialize(StorageDispatchRow {
                        storage_name: &unit.name,
                        scenario: &scenario.name,
                        timepoint: &timepoint.name,
                        charge: solved.solution.value(solved.storage.charge(e, s, t)),
                        discharge: solved.solution.value(solved.storage.discharge(e, s, t)),
                        state_of_energy: solved.solution.value(solved.storage.soe(e, s, t)),
                    })?;
                }
            }
        }
        writer.flush()?;

        Ok(())
    }

    fn write_costs(&self, system: &System, solved: &SolvedModel) -> Result<()> {
        for (file_name, registers) in [
            (COSTS_FILE_NAME, &solved.costs),
            (GEN_COSTS_FILE_NAME, &solved.gen_costs),
        ] {
            let breakdown = solved.breakdown(registers, &system.timescale);
            let mut writer = self.writer(file_name)?;
            writer.serialize(CostRow {
                component: "CostPerTimepoint".into(),
                cost: breakdown.timepoint,
            })?;
            writer.serialize(CostRow {
                component: "CostPerPeriod".into(),
                cost: breakdown.period,
            })?;
            writer.serialize(CostRow {
                component: "TotalCost".into(),
                cost: breakdown.total,
            })?;
            writer.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{solve_system, two_bus_system};
    use crate::input::read_csv;
    use crate::settings::Settings;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Deserialize)]
    struct GenCapReadback {
        gen_name: String,
        #[serde(rename = "GenCapacity")]
        capacity: f64,
    }

    #[derive(Deserialize)]
    struct GenDispatchReadback {
        #[serde(rename = "GenDispatch")]
        dispatch: f64,
    }

    /// All result files appear and the emitted primal values reproduce the
    /// reported total cost.
    #[rstest]
    fn test_write_results_round_trip(two_bus_system: System) {
        let system = two_bus_system;
        let solved = solve_system(&system, &Settings::default()).unwrap();

        let dir = tempdir().unwrap();
        let writer = DataWriter::create(dir.path()).unwrap();
        writer.write_results(&system, &solved).unwrap();

        for file_name in [
            GEN_CAP_FILE_NAME,
            GEN_DISPATCH_FILE_NAME,
            VAR_GEN_CAP_FILE_NAME,
            VAR_GEN_DISPATCH_FILE_NAME,
            STORAGE_CAP_FILE_NAME,
            STORAGE_DISPATCH_FILE_NAME,
            COSTS_FILE_NAME,
            GEN_COSTS_FILE_NAME,
        ] {
            assert!(dir.path().join(file_name).exists(), "{file_name} missing");
        }

        // Recompute the objective from the emitted values
        let caps: Vec<GenCapReadback> = read_csv(&dir.path().join(GEN_CAP_FILE_NAME))
            .unwrap()
            .collect();
        let dispatch: Vec<GenDispatchReadback> = read_csv(&dir.path().join(GEN_DISPATCH_FILE_NAME))
            .unwrap()
            .collect();
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].gen_name, "thermal");

        let generator = &system.generators[caps[0].gen_name.as_str()];
        let weight = system.timescale.timepoints[0].weight;
        let recomputed = weight
            * (generator.c2 * dispatch[0].dispatch.powi(2)
                + (generator.c1 + generator.var_om_cost) * dispatch[0].dispatch
                + generator.c0)
            + generator.invest_cost * caps[0].capacity;

        let costs: Vec<CostRow> = read_csv(&dir.path().join(COSTS_FILE_NAME)).unwrap().collect();
        let total = costs
            .iter()
            .find(|row| row.component == "TotalCost")
            .unwrap()
            .cost;
        let relative = (recomputed - total).abs() / total.abs();
        assert!(relative < 1e-6, "relative error {relative}");

        // The itemization is internally consistent
        let timepoint = costs
            .iter()
            .find(|row| row.component == "CostPerTimepoint")
            .unwrap()
            .cost;
        let period = costs
            .iter()
            .find(|row| row.component == "CostPerPeriod")
            .unwrap()
            .cost;
        assert_approx_eq!(f64, timepoint + period, total, epsilon = 1e-9);
    }
}
