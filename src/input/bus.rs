//! Code for reading buses from input files.
use crate::input::{input_err_msg, read_csv};
use crate::network::Bus;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const BUSES_FILE_NAME: &str = "buses.csv";

/// A bus record as it appears in the input file
#[derive(PartialEq, Debug, Deserialize)]
struct BusRaw {
    name: String,
    kv: f64,
    #[serde(rename = "type")]
    kind: String,
    lat: f64,
    lon: f64,
    slack: bool,
}

/// Read buses from `buses.csv` in the input directory.
///
/// The returned map preserves file order; a bus's position in the map is its
/// dense index throughout the model. Exactly one bus must be the slack bus.
pub fn read_buses(inputs_dir: &Path) -> Result<IndexMap<Rc<str>, Bus>> {
    let file_path = inputs_dir.join(BUSES_FILE_NAME);
    read_buses_from_iter(read_csv(&file_path)?).with_context(|| input_err_msg(&file_path))
}

fn read_buses_from_iter<I>(iter: I) -> Result<IndexMap<Rc<str>, Bus>>
where
    I: Iterator<Item = BusRaw>,
{
    let mut buses = IndexMap::new();
    for raw in iter {
        let name: Rc<str> = raw.name.into();
        let bus = Bus {
            name: Rc::clone(&name),
            kv: raw.kv,
            kind: raw.kind,
            lat: raw.lat,
            lon: raw.lon,
            slack: raw.slack,
        };

        ensure!(
            buses.insert(name, bus).is_none(),
            "Duplicate bus name found"
        );
    }
    ensure!(!buses.is_empty(), "No buses found");

    let slack_count = buses.values().filter(|bus| bus.slack).count();
    ensure!(
        slack_count == 1,
        "Exactly one bus must be the slack bus (found {slack_count})"
    );

    Ok(buses)
}
