//! Code for reading generators from input files.
use crate::generator::{Generator, Stage};
use crate::input::{input_err_msg, read_csv};
use crate::network::Bus;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

const GENERATORS_FILE_NAME: &str = "generators.csv";

/// A generator record as it appears in the input file
#[derive(PartialEq, Debug, Deserialize)]
struct GeneratorRaw {
    name: String,
    tech: String,
    bus_name: String,
    c2: f64,
    c1: f64,
    c0: f64,
    invest_cost: f64,
    exist_cap: f64,
    cap_limit: f64,
    var_om_cost: f64,
}

impl GeneratorRaw {
    fn validate(&self) -> Result<()> {
        ensure!(self.c2 >= 0.0, "c2 must be non-negative");
        ensure!(self.invest_cost >= 0.0, "invest_cost must be non-negative");
        ensure!(self.exist_cap >= 0.0, "exist_cap must be non-negative");
        ensure!(
            self.cap_limit >= self.exist_cap,
            "cap_limit must be at least exist_cap"
        );
        ensure!(self.var_om_cost >= 0.0, "var_om_cost must be non-negative");

        Ok(())
    }
}

/// Read generators from `generators.csv`, resolving bus names and tagging
/// each generator with its stage.
///
/// A generator is second-stage (variable) iff it has capacity-factor entries;
/// `capacity_factors` is consumed here and any entry naming an unknown
/// generator is an error.
pub fn read_generators(
    inputs_dir: &Path,
    buses: &IndexMap<Rc<str>, Bus>,
    mut capacity_factors: HashMap<String, Vec<f64>>,
) -> Result<IndexMap<Rc<str>, Generator>> {
    let file_path = inputs_dir.join(GENERATORS_FILE_NAME);
    read_generators_from_iter(read_csv(&file_path)?, buses, &mut capacity_factors)
        .with_context(|| input_err_msg(&file_path))
}

fn read_generators_from_iter<I>(
    iter: I,
    buses: &IndexMap<Rc<str>, Bus>,
    capacity_factors: &mut HashMap<String, Vec<f64>>,
) -> Result<IndexMap<Rc<str>, Generator>>
where
    I: Iterator<Item = GeneratorRaw>,
{
    let mut generators = IndexMap::new();
    for raw in iter {
        raw.validate()
            .with_context(|| format!("Invalid generator {}", raw.name))?;
        let bus = buses
            .get_index_of(raw.bus_name.as_str())
            .with_context(|| format!("Generator {}: unknown bus {}", raw.name, raw.bus_name))?;

        let stage = match capacity_factors.remove(&raw.name) {
            Some(table) => Stage::Variable {
                capacity_factors: table,
            },
            None => Stage::Dispatchable,
        };

        let name: Rc<str> = raw.name.into();
        let generator = Generator {
            name: Rc::clone(&name),
            tech: raw.tech,
            bus,
            c2: raw.c2,
            c1: raw.c1,
            c0: raw.c0,
            invest_cost: raw.invest_cost,
            exist_cap: raw.exist_cap,
            cap_limit: raw.cap_limit,
            var_om_cost: raw.var_om_cost,
            stage,
        };

        ensure!(
            generators.insert(name, generator).is_none(),
            "Duplicate generator name found"
        );
    }

    // Anything left over names a generator that doesn't exist
    if let Some(name) = capacity_factors.keys().next() {
        anyhow::bail!("Capacity factors reference unknown generator {name}");
    }

    Ok(generators)
}
