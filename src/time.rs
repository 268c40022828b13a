//! Timepoints and timeseries: the time structure of the optimisation horizon.
//!
//! A timeseries is an ordered, cyclically-closed collection of timepoints
//! sharing a duration and a scale factor. The resolver in [`crate::input::time`]
//! links each timepoint to its timeseries, computes its weight and its
//! previous timepoint, wrapping the first timepoint of each timeseries back
//! to the last.
#![allow(missing_docs)]
use indexmap::IndexMap;
use std::rc::Rc;

/// An atomic time step of the optimisation horizon
#[derive(PartialEq, Clone, Debug)]
pub struct Timepoint {
    /// Numeric id as given in the input. Ids within a timeseries form a
    /// contiguous ascending range.
    pub id: u32,
    /// Unique name identifying the timepoint
    pub name: Rc<str>,
    /// Dense index of the timeseries this timepoint belongs to
    pub timeseries: usize,
    /// Length of this timepoint in hours
    pub duration_hrs: f64,
    /// Multiplier converting a per-timepoint cost into a per-period cost
    pub weight: f64,
    /// Dense index of the previous timepoint, cyclic within the timeseries
    pub prev: usize,
}

/// An ordered, cyclically-closed collection of timepoints
#[derive(PartialEq, Clone, Debug)]
pub struct Timeseries {
    pub name: Rc<str>,
    /// Length of each timepoint in hours
    pub duration_of_timepoints: f64,
    /// Number of timepoints this timeseries must contain
    pub number_timepoints: usize,
    /// Factor scaling one pass of this timeseries to the full period
    pub scale_to_period: f64,
    /// Dense indices of the member timepoints, in id order
    pub timepoints: Vec<usize>,
}

/// The resolved time structure: all timeseries and timepoints, with lookups.
#[derive(PartialEq, Debug)]
pub struct TimescaleInfo {
    pub timeseries: Vec<Timeseries>,
    /// Timepoints sorted by id; a timepoint's dense index is its position here
    pub timepoints: Vec<Timepoint>,
    pub timepoint_names: IndexMap<Rc<str>, usize>,
    pub timeseries_names: IndexMap<Rc<str>, usize>,
}

impl TimescaleInfo {
    /// Number of timepoints across all timeseries
    pub fn len(&self) -> usize {
        self.timepoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timepoints.is_empty()
    }

    /// Look up a timepoint's dense index by name
    pub fn timepoint_index(&self, name: &str) -> Option<usize> {
        self.timepoint_names.get(name).copied()
    }

    /// Iterate over `(dense index, timepoint)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Timepoint)> {
        self.timepoints.iter().enumerate()
    }
}
