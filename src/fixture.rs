//! Fixtures for tests
use crate::demand::LoadMap;
use crate::generator::{Generator, Stage};
use crate::model::{SolvedModel, build_model};
use crate::network::{Bus, Line};
use crate::policy::Policy;
use crate::scenario::Scenario;
use crate::settings::Settings;
use crate::storage::EnergyStorage;
use crate::system::System;
use crate::time::{TimescaleInfo, Timepoint, Timeseries};
use anyhow::Result;
use indexmap::IndexMap;
use rstest::fixture;
use std::rc::Rc;

/// Assemble and solve a system in one step
pub fn solve_system(system: &System, settings: &Settings) -> Result<SolvedModel> {
    build_model(system, settings).solve()
}

pub fn bus(name: &str, slack: bool) -> Bus {
    Bus {
        name: name.into(),
        kv: 230.0,
        kind: "pq".into(),
        lat: 0.0,
        lon: 0.0,
        slack,
    }
}

pub fn line(name: &str, from: usize, to: usize, rate: f64, x: f64) -> Line {
    Line {
        name: name.into(),
        from,
        to,
        rate,
        r: 0.0,
        x,
        g: 0.0,
        b: 0.0,
    }
}

/// A dispatchable generator with a linear cost
pub fn generator(name: &str, bus: usize, c1: f64, invest_cost: f64, cap_limit: f64) -> Generator {
    Generator {
        name: name.into(),
        tech: "thermal".into(),
        bus,
        c2: 0.0,
        c1,
        c0: 0.0,
        invest_cost,
        exist_cap: 0.0,
        cap_limit,
        var_om_cost: 0.0,
        stage: Stage::Dispatchable,
    }
}

/// A free variable generator; the small O&M cost keeps its dispatch unique
pub fn variable_generator(name: &str, bus: usize, capacity_factors: Vec<f64>) -> Generator {
    Generator {
        name: name.into(),
        tech: "wind".into(),
        bus,
        c2: 0.0,
        c1: 0.0,
        c0: 0.0,
        invest_cost: 0.0,
        exist_cap: 0.0,
        cap_limit: 1000.0,
        var_om_cost: 0.01,
        stage: Stage::Variable { capacity_factors },
    }
}

fn index_by_name<T>(items: Vec<T>, name: impl Fn(&T) -> Rc<str>) -> IndexMap<Rc<str>, T> {
    items.into_iter().map(|item| (name(&item), item)).collect()
}

/// A timescale of one timeseries with unit durations and scale
pub fn make_timescale(timepoint_names: &[&str]) -> TimescaleInfo {
    let n = timepoint_names.len();
    let timeseries = Timeseries {
        name: "all".into(),
        duration_of_timepoints: 1.0,
        number_timepoints: n,
        scale_to_period: 1.0,
        timepoints: (0..n).collect(),
    };
    let timepoints = timepoint_names
        .iter()
        .enumerate()
        .map(|(index, name)| Timepoint {
            id: index as u32,
            name: (*name).into(),
            timeseries: 0,
            duration_hrs: 1.0,
            weight: 1.0,
            prev: if index == 0 { n - 1 } else { index - 1 },
        })
        .collect::<Vec<_>>();
    let timepoint_names = timepoints
        .iter()
        .enumerate()
        .map(|(index, tp)| (Rc::clone(&tp.name), index))
        .collect();

    TimescaleInfo {
        timeseries: vec![timeseries],
        timepoints,
        timepoint_names,
        timeseries_names: [("all".into(), 0)].into_iter().collect(),
    }
}

#[fixture]
pub fn buses() -> IndexMap<Rc<str>, Bus> {
    index_by_name(vec![bus("A", true), bus("B", false)], |bus| {
        Rc::clone(&bus.name)
    })
}

#[fixture]
pub fn scenarios() -> IndexMap<Rc<str>, Scenario> {
    index_by_name(
        vec![Scenario {
            name: "base".into(),
            probability: 1.0,
        }],
        |scenario| Rc::clone(&scenario.name),
    )
}

#[fixture]
pub fn timescale() -> TimescaleInfo {
    make_timescale(&["t0", "t1"])
}

/// A two-bus system: cheap generation at the slack bus, 50 MW of load behind
/// a single line.
#[fixture]
pub fn two_bus_system() -> System {
    let mut loads = LoadMap::new(2, 1, 1);
    loads.insert(1, 0, 0, 50.0).unwrap();

    System {
        buses: buses(),
        lines: vec![line("AB", 0, 1, 100.0, 0.1)],
        generators: index_by_name(vec![generator("thermal", 0, 10.0, 2.0, 1000.0)], |g| Rc::clone(&g.name)),
        storage: IndexMap::new(),
        scenarios: scenarios(),
        timescale: make_timescale(&["t0"]),
        loads,
        policy: Policy {
            max_diffangle: 360.0_f64.to_radians(),
        },
        slack_bus: 0,
    }
}

/// A single-bus system with capacity-limited cheap generation, expensive
/// backup and a storage unit, over two timepoints with uneven load.
#[fixture]
pub fn storage_system() -> System {
    let mut loads = LoadMap::new(1, 1, 2);
    loads.insert(0, 0, 0, 80.0).unwrap();
    loads.insert(0, 0, 1, 40.0).unwrap();

    System {
        buses: index_by_name(vec![bus("A", true)], |bus| Rc::clone(&bus.name)),
        lines: Vec::new(),
        generators: index_by_name(
            vec![
                generator("cheap", 0, 1.0, 1.0, 60.0),
                generator("backup", 0, 100.0, 1.0, 1000.0),
            ],
            |g| Rc::clone(&g.name),
        ),
        storage: index_by_name(
            vec![EnergyStorage {
                name: "batt".into(),
                tech: "li-ion".into(),
                bus: 0,
                invest_cost: 1.0,
                exist_power_cap: 0.0,
                exist_energy_cap: 0.0,
                var_om_cost: 0.0,
                efficiency: 1.0,
                duration: 1.0,
            }],
            |unit| Rc::clone(&unit.name),
        ),
        scenarios: scenarios(),
        timescale: make_timescale(&["t0", "t1"]),
        loads,
        policy: Policy {
            max_diffangle: 360.0_f64.to_radians(),
        },
        slack_bus: 0,
    }
}
