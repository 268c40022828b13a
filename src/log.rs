//! Logging for the load → assemble → solve → write pipeline.
//!
//! A thin `fern` setup. Records go to stderr, coloured when it is a
//! terminal, each prefixed with the pipeline stage that emitted it rather
//! than the raw module path, so a run reads as a sequence of stages. When an
//! output directory is known, records are also appended to a log file next
//! to the results, there with full timestamps and module targets.
use anyhow::{Context, Result};
use chrono::Local;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::env;
use std::io::IsTerminal;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log file appended next to the results
const LOG_FILE_NAME: &str = "capgrid.log";

/// Fallback when neither the environment nor the settings give a level
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// The pipeline stage a record belongs to, derived from its module target
fn stage(target: &str) -> &'static str {
    let module = target.strip_prefix("capgrid::").unwrap_or(target);
    match module.split("::").next().unwrap_or(module) {
        "input" | "system" => "load",
        "model" => "assemble",
        "solver" => "solve",
        "output" => "write",
        _ => "run",
    }
}

/// Resolve the level: `CAPGRID_LOG_LEVEL` wins over `settings.toml`
fn resolve_level(log_level_from_settings: Option<&str>) -> Result<LevelFilter> {
    let name = match env::var("CAPGRID_LOG_LEVEL") {
        Ok(name) => name,
        Err(_) => match log_level_from_settings {
            Some(name) => name.to_string(),
            None => return Ok(DEFAULT_LOG_LEVEL),
        },
    };

    LevelFilter::from_str(&name).with_context(|| format!("Unknown log level: {name}"))
}

/// Initialise the program logger.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_path`: The directory to append the log file in (if Some)
pub fn init(log_level_from_settings: Option<&str>, log_file_path: Option<&Path>) -> Result<()> {
    let level = resolve_level(log_level_from_settings)?;

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .debug(Color::Cyan)
        .trace(Color::BrightBlack);
    let use_colour = std::io::stderr().is_terminal();

    let terminal = Dispatch::new()
        .format(move |out, message, record| {
            let time = Local::now().format("%H:%M:%S");
            let stage = stage(record.target());
            if use_colour {
                let level = colours.color(record.level());
                out.finish(format_args!("{time} {level} {stage}: {message}"));
            } else {
                out.finish(format_args!("{time} {} {stage}: {message}", record.level()));
            }
        })
        .chain(std::io::stderr());

    let mut root = Dispatch::new().level(level).chain(terminal);

    if let Some(dir) = log_file_path {
        let file = fern::log_file(dir.join(LOG_FILE_NAME))
            .context("Could not open the log file")?;
        root = root.chain(
            Dispatch::new()
                .format(|out, message, record| {
                    let time = Local::now().format("%Y-%m-%d %H:%M:%S");
                    out.finish(format_args!(
                        "{time} {} {}: {message}",
                        record.level(),
                        record.target()
                    ));
                })
                .chain(file),
        );
    }

    root.apply().context("Logger already initialised")?;
    LOGGER_INIT.set(()).unwrap();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage() {
        assert_eq!(stage("capgrid::input::bus"), "load");
        assert_eq!(stage("capgrid::system"), "load");
        assert_eq!(stage("capgrid::model::storage"), "assemble");
        assert_eq!(stage("capgrid::solver"), "solve");
        assert_eq!(stage("capgrid::output"), "write");
        assert_eq!(stage("capgrid::cli"), "run");
        assert_eq!(stage("some_dependency"), "run");
    }

    #[test]
    fn test_resolve_level() {
        // NB: tests that set CAPGRID_LOG_LEVEL would race; only the
        // settings/default paths are exercised here
        if env::var("CAPGRID_LOG_LEVEL").is_err() {
            assert_eq!(resolve_level(None).unwrap(), DEFAULT_LOG_LEVEL);
            assert_eq!(resolve_level(Some("warn")).unwrap(), LevelFilter::Warn);
            assert!(resolve_level(Some("noisy")).is_err());
        }
    }
}
