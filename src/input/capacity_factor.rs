//! Code for reading variable-generator capacity factors from input files.
use crate::input::{deserialise_proportion, input_err_msg, read_csv};
use crate::scenario::Scenario;
use crate::time::TimescaleInfo;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

const CAPACITY_FACTORS_FILE_NAME: &str = "capacity_factors.csv";

/// A capacity-factor record as it appears in the input file
#[derive(PartialEq, Debug, Deserialize)]
struct CapacityFactorRaw {
    generator_name: String,
    scenario_name: String,
    timepoint_name: String,
    #[serde(deserialize_with = "deserialise_proportion")]
    capacity_factor: f64,
}

/// Read `capacity_factors.csv`, grouped by generator name.
///
/// Each generator's table is dense over `(scenario, timepoint)`; a generator
/// that appears at all must have an entry for every combination. Generator
/// names are validated by the caller against the generator table.
pub fn read_capacity_factors(
    inputs_dir: &Path,
    scenarios: &IndexMap<Rc<str>, Scenario>,
    timescale: &TimescaleInfo,
) -> Result<HashMap<String, Vec<f64>>> {
    let file_path = inputs_dir.join(CAPACITY_FACTORS_FILE_NAME);
    read_capacity_factors_from_iter(read_csv(&file_path)?, scenarios, timescale)
        .with_context(|| input_err_msg(&file_path))
}

fn read_capacity_factors_from_iter<I>(
    iter: I,
    scenarios: &IndexMap<Rc<str>, Scenario>,
    timescale: &TimescaleInfo,
) -> Result<HashMap<String, Vec<f64>>>
where
    I: Iterator<Item = CapacityFactorRaw>,
{
    let n_timepoints = timescale.len();
    let table_len = scenarios.len() * n_timepoints;

    // NaN marks entries not yet seen, so completeness can be checked below
    let mut tables: HashMap<String, Vec<f64>> = HashMap::new();
    for raw in iter {
        let scenario = scenarios
            .get_index_of(raw.scenario_name.as_str())
            .with_context(|| {
                format!(
                    "Capacity factor for {}: unknown scenario {}",
                    raw.generator_name, raw.scenario_name
                )
            })?;
        let timepoint = timescale
            .timepoint_index(raw.timepoint_name.as_str())
            .with_context(|| {
                format!(
                    "Capacity factor for {}: unknown timepoint {}",
                    raw.generator_name, raw.timepoint_name
                )
            })?;

        let table = tables
            .entry(raw.generator_name.clone())
            .or_insert_with(|| vec![f64::NAN; table_len]);
        let entry = &mut table[scenario * n_timepoints + timepoint];
        ensure!(
            entry.is_nan(),
            "Duplicate capacity factor for generator {}, scenario {}, timepoint {}",
            raw.generator_name,
            raw.scenario_name,
            raw.timepoint_name
        );
        *entry = raw.capacity_factor;
    }

    // A variable generator must cover every (scenario, timepoint) pair
    for (name, table) in &tables {
        ensure!(
            table.iter().all(|cf| !cf.is_nan()),
            "Generator {name} has capacity factors for only some (scenario, timepoint) pairs"
        );
    }

    Ok(tables)
}
