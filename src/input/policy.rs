//! Code for reading policy parameters from input files.
use crate::input::{input_err_msg, read_csv};
use crate::policy::Policy;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;

const MAX_DIFFANGLE_FILE_NAME: &str = "max_diffangle.csv";

/// The angle-limit record as it appears in the input file (a single row, in degrees)
#[derive(PartialEq, Debug, Deserialize)]
struct MaxDiffangleRaw {
    max_diffangle: f64,
}

/// Read the policy parameters. The angle limit is given in degrees in
/// `max_diffangle.csv` and stored in radians.
pub fn read_policy(inputs_dir: &Path) -> Result<Policy> {
    let file_path = inputs_dir.join(MAX_DIFFANGLE_FILE_NAME);
    let raw: MaxDiffangleRaw = read_csv(&file_path)?
        .exactly_one()
        .ok()
        .context("max_diffangle.csv must contain exactly one value")
        .with_context(|| input_err_msg(&file_path))?;

    ensure!(
        raw.max_diffangle > 0.0,
        "max_diffangle must be positive (in {})",
        file_path.to_string_lossy()
    );

    Ok(Policy {
        max_diffangle: raw.max_diffangle.to_radians(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_policy_file(dir_path: &Path, contents: &str) {
        let file_path = dir_path.join(MAX_DIFFANGLE_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_read_policy_converts_to_radians() {
        let dir = tempdir().unwrap();
        create_policy_file(dir.path(), "max_diffangle\n90");

        let policy = read_policy(dir.path()).unwrap();
        assert_approx_eq!(f64, policy.max_diffangle, std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_read_policy_rejects_multiple_rows() {
        let dir = tempdir().unwrap();
        create_policy_file(dir.path(), "max_diffangle\n90\n45");
        assert!(read_policy(dir.path()).is_err());
    }

    #[test]
    fn test_read_policy_rejects_nonpositive() {
        let dir = tempdir().unwrap();
        create_policy_file(dir.path(), "max_diffangle\n0");
        assert!(read_policy(dir.path()).is_err());
    }
}
