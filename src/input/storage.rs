//! Code for reading energy-storage units from input files.
use crate::input::{deserialise_proportion_nonzero, input_err_msg, read_csv};
use crate::network::Bus;
use crate::storage::EnergyStorage;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const STORAGE_FILE_NAME: &str = "energy_storage.csv";

/// A storage record as it appears in the input file
#[derive(PartialEq, Debug, Deserialize)]
struct EnergyStorageRaw {
    name: String,
    tech: String,
    bus_name: String,
    invest_cost: f64,
    exist_power_cap: f64,
    exist_energy_cap: f64,
    var_om_cost: f64,
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    efficiency: f64,
    duration: f64,
}

impl EnergyStorageRaw {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.exist_power_cap >= 0.0,
            "exist_power_cap must be non-negative"
        );
        ensure!(
            self.exist_energy_cap >= 0.0,
            "exist_energy_cap must be non-negative"
        );
        ensure!(self.duration > 0.0, "duration must be positive");

        Ok(())
    }
}

/// Read storage units from `energy_storage.csv`, resolving bus names.
pub fn read_storage(
    inputs_dir: &Path,
    buses: &IndexMap<Rc<str>, Bus>,
) -> Result<IndexMap<Rc<str>, EnergyStorage>> {
    let file_path = inputs_dir.join(STORAGE_FILE_NAME);
    read_storage_from_iter(read_csv(&file_path)?, buses).with_context(|| input_err_msg(&file_path))
}

fn read_storage_from_iter<I>(
    iter: I,
    buses: &IndexMap<Rc<str>, Bus>,
) -> Result<IndexMap<Rc<str>, EnergyStorage>>
where
    I: Iterator<Item = EnergyStorageRaw>,
{
    let mut storage = IndexMap::new();
    for raw in iter {
        raw.validate()
            .with_context(|| format!("Invalid storage unit {}", raw.name))?;
        let bus = buses
            .get_index_of(raw.bus_name.as_str())
            .with_context(|| format!("Storage {}: unknown bus {}", raw.name, raw.bus_name))?;

        let name: Rc<str> = raw.name.into();
        let unit = EnergyStorage {
            name: Rc::clone(&name),
            tech: raw.tech,
            bus,
            invest_cost: raw.invest_cost,
            exist_power_cap: raw.exist_power_cap,
            exist_energy_cap: raw.exist_energy_cap,
            var_om_cost: raw.var_om_cost,
            efficiency: raw.efficiency,
            duration: raw.duration,
        };

        ensure!(
            storage.insert(name, unit).is_none(),
            "Duplicate storage name found"
        );
    }

    Ok(storage)
}
