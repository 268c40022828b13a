//! Code for loading per-model settings.
use crate::input::read_toml;
use anyhow::Result;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// How scenario-dependent cost terms are weighted in the objective.
#[derive(Clone, Copy, PartialEq, Debug, DeserializeLabeledStringEnum)]
pub enum ExpectationMode {
    /// Weight each scenario by `probability / number of scenarios`.
    ///
    /// This reproduces the historical formulation; the extra division is
    /// redundant if probabilities are meant to be the full weighting.
    #[string = "source_compat"]
    SourceCompat,
    /// Weight each scenario by its probability alone
    #[string = "probability_only"]
    ProbabilityOnly,
}

impl Default for ExpectationMode {
    fn default() -> Self {
        Self::SourceCompat
    }
}

impl ExpectationMode {
    /// The objective weight for a scenario with the given probability
    pub fn scenario_weight(&self, probability: f64, n_scenarios: usize) -> f64 {
        match self {
            Self::SourceCompat => probability / n_scenarios as f64,
            Self::ProbabilityOnly => probability,
        }
    }
}

/// How transmission flows are capped.
#[derive(Clone, Copy, PartialEq, Debug, DeserializeLabeledStringEnum)]
pub enum FlowLimits {
    /// Cap the aggregate net flow leaving each bus by the summed rating of
    /// its incident lines. This is the historical formulation; it is looser
    /// than per-line caps.
    #[string = "per_bus"]
    PerBus,
    /// Cap the flow on each line by its own rating
    #[string = "per_line"]
    PerLine,
}

impl Default for FlowLimits {
    fn default() -> Self {
        Self::PerBus
    }
}

/// Per-model settings from `settings.toml` in the model directory.
///
/// Every field has a default, and the file itself is optional.
#[derive(PartialEq, Debug, Default, Deserialize)]
pub struct Settings {
    /// The program log level; overridden by the environment variable
    #[serde(default)]
    pub log_level: Option<String>,
    /// Whether to write a human-readable dump of the assembled model
    #[serde(default)]
    pub debug_model: bool,
    /// Weighting of scenario-dependent cost terms
    #[serde(default)]
    pub expectation_mode: ExpectationMode,
    /// Flow-cap formulation
    #[serde(default)]
    pub flow_limits: FlowLimits,
    /// Whether line shunts enter the admittance matrix
    #[serde(default)]
    pub include_shunts: bool,
    /// Solver time limit in seconds
    #[serde(default)]
    pub solver_time_limit: Option<f64>,
}

impl Settings {
    /// Read settings from the model directory, or defaults if the file is absent
    pub fn load(model_dir: &Path) -> Result<Settings> {
        let file_path = model_dir.join(SETTINGS_FILE_NAME);
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(&file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_settings_load_no_file() {
        let dir = tempdir().unwrap();
        assert_eq!(Settings::load(dir.path()).unwrap(), Settings::default());
    }

    #[test]
    fn test_settings_load() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(
                file,
                "log_level = \"warn\"\nexpectation_mode = \"probability_only\"\nflow_limits = \"per_line\""
            )
            .unwrap();
        }

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.log_level.as_deref(), Some("warn"));
        assert_eq!(settings.expectation_mode, ExpectationMode::ProbabilityOnly);
        assert_eq!(settings.flow_limits, FlowLimits::PerLine);
        assert!(!settings.debug_model);
    }

    #[test]
    fn test_scenario_weight() {
        assert_eq!(ExpectationMode::SourceCompat.scenario_weight(0.5, 2), 0.25);
        assert_eq!(ExpectationMode::ProbabilityOnly.scenario_weight(0.5, 2), 0.5);
    }
}
