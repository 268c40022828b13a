//! Code for reading load profiles from input files.
use crate::demand::LoadMap;
use crate::input::{input_err_msg, read_csv};
use crate::network::Bus;
use crate::scenario::Scenario;
use crate::time::TimescaleInfo;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const LOADS_FILE_NAME: &str = "loads.csv";

/// A load record as it appears in the input file
#[derive(PartialEq, Debug, Deserialize)]
struct LoadRaw {
    bus_name: String,
    scenario_name: String,
    timepoint_name: String,
    load_mw: f64,
}

/// Read loads from `loads.csv` into a dense table.
///
/// The file may be sparse; combinations with no entry have zero load.
pub fn read_loads(
    inputs_dir: &Path,
    buses: &IndexMap<Rc<str>, Bus>,
    scenarios: &IndexMap<Rc<str>, Scenario>,
    timescale: &TimescaleInfo,
) -> Result<LoadMap> {
    let file_path = inputs_dir.join(LOADS_FILE_NAME);
    read_loads_from_iter(read_csv(&file_path)?, buses, scenarios, timescale)
        .with_context(|| input_err_msg(&file_path))
}

fn read_loads_from_iter<I>(
    iter: I,
    buses: &IndexMap<Rc<str>, Bus>,
    scenarios: &IndexMap<Rc<str>, Scenario>,
    timescale: &TimescaleInfo,
) -> Result<LoadMap>
where
    I: Iterator<Item = LoadRaw>,
{
    let mut loads = LoadMap::new(buses.len(), scenarios.len(), timescale.len());
    for raw in iter {
        let bus = buses
            .get_index_of(raw.bus_name.as_str())
            .with_context(|| format!("Load entry: unknown bus {}", raw.bus_name))?;
        let scenario = scenarios
            .get_index_of(raw.scenario_name.as_str())
            .with_context(|| format!("Load entry: unknown scenario {}", raw.scenario_name))?;
        let timepoint = timescale
            .timepoint_index(raw.timepoint_name.as_str())
            .with_context(|| format!("Load entry: unknown timepoint {}", raw.timepoint_name))?;

        loads.insert(bus, scenario, timepoint, raw.load_mw)?;
    }

    Ok(loads)
}
