//! Code for reading and resolving the time structure from input files.
//!
//! Timepoints are linked to their timeseries by name. The resolver computes
//! each timepoint's duration, weight and previous timepoint; the previous of
//! the first timepoint in a timeseries is the last, closing the loop.
use crate::input::{input_err_msg, read_csv};
use crate::time::{TimescaleInfo, Timepoint, Timeseries};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const TIMESERIES_FILE_NAME: &str = "timeseries.csv";
const TIMEPOINTS_FILE_NAME: &str = "timepoints.csv";

/// A timeseries record as it appears in the input file
#[derive(PartialEq, Debug, Deserialize)]
struct TimeseriesRaw {
    id: u32,
    name: String,
    duration_of_timepoints: f64,
    number_timepoints: usize,
    scale_to_period: f64,
}

/// A timepoint record as it appears in the input file
#[derive(PartialEq, Debug, Deserialize)]
struct TimepointRaw {
    id: u32,
    name: String,
    timeseries_name: String,
}

/// Read `timeseries.csv` and `timepoints.csv` and resolve them into a
/// [`TimescaleInfo`].
pub fn read_timescale(inputs_dir: &Path) -> Result<TimescaleInfo> {
    let ts_path = inputs_dir.join(TIMESERIES_FILE_NAME);
    let tp_path = inputs_dir.join(TIMEPOINTS_FILE_NAME);

    let mut timeseries: Vec<TimeseriesRaw> = read_csv(&ts_path)?.collect();
    timeseries.sort_by_key(|raw| raw.id);
    let mut timepoints: Vec<TimepointRaw> = read_csv(&tp_path)?.collect();
    timepoints.sort_by_key(|raw| raw.id);

    resolve_timescale(timeseries, timepoints).with_context(|| input_err_msg(&tp_path))
}

fn resolve_timescale(
    timeseries_raw: Vec<TimeseriesRaw>,
    timepoints_raw: Vec<TimepointRaw>,
) -> Result<TimescaleInfo> {
    ensure!(!timeseries_raw.is_empty(), "No timeseries found");
    ensure!(!timepoints_raw.is_empty(), "No timepoints found");

    let mut timeseries = Vec::with_capacity(timeseries_raw.len());
    let mut timeseries_names = IndexMap::new();
    for raw in timeseries_raw {
        ensure!(
            raw.duration_of_timepoints > 0.0,
            "Timeseries {}: timepoint duration must be positive",
            raw.name
        );
        ensure!(
            raw.number_timepoints > 0,
            "Timeseries {}: must contain at least one timepoint",
            raw.name
        );
        ensure!(
            raw.scale_to_period > 0.0,
            "Timeseries {}: scale to period must be positive",
            raw.name
        );

        let name: Rc<str> = raw.name.into();
        ensure!(
            timeseries_names
                .insert(Rc::clone(&name), timeseries.len())
                .is_none(),
            "Duplicate timeseries name {name}"
        );
        timeseries.push(Timeseries {
            name,
            duration_of_timepoints: raw.duration_of_timepoints,
            number_timepoints: raw.number_timepoints,
            scale_to_period: raw.scale_to_period,
            timepoints: Vec::new(),
        });
    }

    // Link each timepoint to its timeseries. Input is sorted by id, so each
    // timeseries accumulates its members in id order.
    let mut timepoints = Vec::with_capacity(timepoints_raw.len());
    let mut timepoint_names = IndexMap::new();
    let mut ids = Vec::with_capacity(timepoints_raw.len());
    for raw in timepoints_raw {
        let ts_index = *timeseries_names
            .get(raw.timeseries_name.as_str())
            .with_context(|| {
                format!("Timepoint {}: unknown timeseries {}", raw.name, raw.timeseries_name)
            })?;
        let ts = &mut timeseries[ts_index];

        let name: Rc<str> = raw.name.into();
        ensure!(
            timepoint_names
                .insert(Rc::clone(&name), timepoints.len())
                .is_none(),
            "Duplicate timepoint name {name}"
        );
        ensure!(
            !ids.contains(&raw.id),
            "Duplicate timepoint id {}",
            raw.id
        );

        ts.timepoints.push(timepoints.len());
        timepoints.push(Timepoint {
            id: raw.id,
            name,
            timeseries: ts_index,
            duration_hrs: ts.duration_of_timepoints,
            weight: ts.duration_of_timepoints * ts.scale_to_period,
            prev: 0, // filled in below
        });
        ids.push(raw.id);
    }

    // Validate membership and id contiguity, then close each loop
    for ts in &timeseries {
        ensure!(
            ts.timepoints.len() == ts.number_timepoints,
            "Timeseries {} expects {} timepoints but has {}",
            ts.name,
            ts.number_timepoints,
            ts.timepoints.len()
        );

        for pair in ts.timepoints.windows(2) {
            ensure!(
                ids[pair[1]] == ids[pair[0]] + 1,
                "Timeseries {}: timepoint ids must form a contiguous range",
                ts.name
            );
        }
    }
    for ts in &timeseries {
        let last = *ts.timepoints.last().unwrap();
        let mut prev = last;
        for &index in &ts.timepoints {
            timepoints[index].prev = prev;
            prev = index;
        }
    }

    Ok(TimescaleInfo {
        timeseries,
        timepoints,
        timepoint_names,
        timeseries_names,
    })
}
