//! Code for reading scenarios from input files.
use crate::input::{deserialise_proportion, input_err_msg, read_csv};
use crate::scenario::{Scenario, check_probabilities_sum_to_one};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const SCENARIOS_FILE_NAME: &str = "scenarios.csv";

/// A scenario record as it appears in the input file
#[derive(PartialEq, Debug, Deserialize)]
struct ScenarioRaw {
    name: String,
    #[serde(deserialize_with = "deserialise_proportion")]
    probability: f64,
}

/// Read scenarios from `scenarios.csv`.
///
/// Probabilities must each lie in [0, 1] and sum to one.
pub fn read_scenarios(inputs_dir: &Path) -> Result<IndexMap<Rc<str>, Scenario>> {
    let file_path = inputs_dir.join(SCENARIOS_FILE_NAME);
    read_scenarios_from_iter(read_csv(&file_path)?).with_context(|| input_err_msg(&file_path))
}

fn read_scenarios_from_iter<I>(iter: I) -> Result<IndexMap<Rc<str>, Scenario>>
where
    I: Iterator<Item = ScenarioRaw>,
{
    let mut scenarios = IndexMap::new();
    for raw in iter {
        let name: Rc<str> = raw.name.into();
        let scenario = Scenario {
            name: Rc::clone(&name),
            probability: raw.probability,
        };

        ensure!(
            scenarios.insert(name, scenario).is_none(),
            "Duplicate scenario name found"
        );
    }
    ensure!(!scenarios.is_empty(), "No scenarios found");

    check_probabilities_sum_to_one(scenarios.values().map(|scenario| scenario.probability))?;

    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_scenarios_file(dir_path: &Path, contents: &str) {
        let file_path = dir_path.join(SCENARIOS_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_read_scenarios() {
        let dir = tempdir().unwrap();
        create_scenarios_file(dir.path(), "name,probability\nlow,0.5\nhigh,0.5");

        let scenarios = read_scenarios(dir.path()).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios["low"].probability, 0.5);
        assert_eq!(scenarios.get_index_of("high"), Some(1));
    }

    #[test]
    fn test_read_scenarios_bad_sum() {
        let dir = tempdir().unwrap();
        create_scenarios_file(dir.path(), "name,probability\nlow,0.5\nhigh,0.4");
        assert!(read_scenarios(dir.path()).is_err());
    }

    #[test]
    fn test_read_scenarios_out_of_range() {
        let dir = tempdir().unwrap();
        create_scenarios_file(dir.path(), "name,probability\nonly,1.5");
        assert!(read_scenarios(dir.path()).is_err());
    }
}
