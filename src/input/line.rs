//! Code for reading transmission lines from input files.
use crate::input::{input_err_msg, read_csv};
use crate::network::{Bus, Line};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const LINES_FILE_NAME: &str = "lines.csv";

/// A line record as it appears in the input file
#[derive(PartialEq, Debug, Deserialize)]
struct LineRaw {
    name: String,
    from_bus: String,
    to_bus: String,
    rate: f64,
    r: f64,
    x: f64,
    g: f64,
    b: f64,
}

/// Read lines from `lines.csv`, resolving bus names to dense indices.
///
/// Parallel lines between the same pair of buses are permitted.
pub fn read_lines(inputs_dir: &Path, buses: &IndexMap<Rc<str>, Bus>) -> Result<Vec<Line>> {
    let file_path = inputs_dir.join(LINES_FILE_NAME);
    read_lines_from_iter(read_csv(&file_path)?, buses).with_context(|| input_err_msg(&file_path))
}

fn read_lines_from_iter<I>(iter: I, buses: &IndexMap<Rc<str>, Bus>) -> Result<Vec<Line>>
where
    I: Iterator<Item = LineRaw>,
{
    let mut lines = Vec::new();
    for raw in iter {
        let from = buses
            .get_index_of(raw.from_bus.as_str())
            .with_context(|| format!("Line {}: unknown bus {}", raw.name, raw.from_bus))?;
        let to = buses
            .get_index_of(raw.to_bus.as_str())
            .with_context(|| format!("Line {}: unknown bus {}", raw.name, raw.to_bus))?;

        ensure!(raw.rate > 0.0, "Line {}: rate must be positive", raw.name);
        ensure!(raw.x > 0.0, "Line {}: reactance must be positive", raw.name);

        lines.push(Line {
            name: raw.name.into(),
            from,
            to,
            rate: raw.rate,
            r: raw.r,
            x: raw.x,
            g: raw.g,
            b: raw.b,
        });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::buses;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_lines_file(dir_path: &Path, contents: &str) {
        let file_path = dir_path.join(LINES_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[rstest]
    fn test_read_lines(buses: IndexMap<Rc<str>, Bus>) {
        let dir = tempdir().unwrap();
        create_lines_file(
            dir.path(),
            "name,from_bus,to_bus,rate,r,x,g,b\nAB,A,B,100,0,0.1,0,0",
        );

        let lines = read_lines(dir.path(), &buses).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].from, 0);
        assert_eq!(lines[0].to, 1);
        assert_eq!(lines[0].rate, 100.0);
    }

    #[rstest]
    fn test_read_lines_unknown_bus(buses: IndexMap<Rc<str>, Bus>) {
        let dir = tempdir().unwrap();
        create_lines_file(
            dir.path(),
            "name,from_bus,to_bus,rate,r,x,g,b\nAB,A,C,100,0,0.1,0,0",
        );
        assert!(read_lines(dir.path(), &buses).is_err());
    }

    #[rstest]
    #[case("name,from_bus,to_bus,rate,r,x,g,b\nAB,A,B,0,0,0.1,0,0")] // zero rate
    #[case("name,from_bus,to_bus,rate,r,x,g,b\nAB,A,B,100,0,0,0,0")] // zero reactance
    fn test_read_lines_invalid(buses: IndexMap<Rc<str>, Bus>, #[case] contents: &str) {
        let dir = tempdir().unwrap();
        create_lines_file(dir.path(), contents);
        assert!(read_lines(dir.path(), &buses).is_err());
    }
}
