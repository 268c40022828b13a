//! The network representation: buses, transmission lines and the nodal admittance matrix.
#![allow(missing_docs)]
use nalgebra::DMatrix;
use num_complex::Complex64;
use std::rc::Rc;

/// A bus (node) of the transmission network
#[derive(PartialEq, Clone, Debug)]
pub struct Bus {
    /// Unique name identifying the bus
    pub name: Rc<str>,
    /// Nominal voltage level in kV
    pub kv: f64,
    /// Free-form bus type label
    pub kind: String,
    pub lat: f64,
    pub lon: f64,
    /// Whether this bus is the angle reference. Exactly one bus has this set.
    pub slack: bool,
}

/// A transmission line modelled as a π-branch.
///
/// Bus endpoints are stored as dense indices into the system's bus table.
/// Parallel lines between the same pair of buses are permitted; their
/// admittances sum in the nodal matrix.
#[derive(PartialEq, Clone, Debug)]
pub struct Line {
    pub name: Rc<str>,
    /// Index of the sending bus
    pub from: usize,
    /// Index of the receiving bus
    pub to: usize,
    /// Thermal rating in MW
    pub rate: f64,
    /// Series resistance in p.u.
    pub r: f64,
    /// Series reactance in p.u.
    pub x: f64,
    /// Shunt conductance in p.u.
    pub g: f64,
    /// Shunt susceptance in p.u.
    pub b: f64,
}

impl Line {
    /// The series admittance `1 / (r + jx)` of this line
    pub fn series_admittance(&self) -> Complex64 {
        Complex64::new(self.r, self.x).inv()
    }

    /// The DC susceptance of this line, `-Im(1/(r + jx))`.
    ///
    /// Positive for any line with `x > 0`; equals `1/x` for a lossless line.
    pub fn susceptance(&self) -> f64 {
        -self.series_admittance().im
    }
}

/// The assembled nodal quantities the optimisation model reads from the network.
pub struct Admittance {
    /// Complex nodal admittance matrix, indexed `[bus, bus]`
    pub y: DMatrix<Complex64>,
    /// Aggregate thermal rating of the lines incident to each bus, in MW
    pub max_flow: Vec<f64>,
}

impl Admittance {
    /// The susceptance matrix `B = Im(Y)` governing DC flows
    pub fn susceptance(&self) -> DMatrix<f64> {
        self.y.map(|y| y.im)
    }
}

/// Assemble the nodal admittance matrix and per-bus flow caps from the line list.
///
/// Each line contributes its series admittance `y = 1/(r + jx)` as
/// `Y[f,t] -= y`, `Y[t,f] -= y`, `Y[f,f] += y`, `Y[t,t] += y`. With
/// `include_shunts`, the full shunt `g + jb` is additionally applied at both
/// endpoints, without the conventional halving of the π-model. Shunt terms
/// only touch the diagonal, which cancels in angle-difference flow
/// expressions.
pub fn build_admittance(n_buses: usize, lines: &[Line], include_shunts: bool) -> Admittance {
    let mut y = DMatrix::from_element(n_buses, n_buses, Complex64::new(0.0, 0.0));
    let mut max_flow = vec![0.0; n_buses];

    for line in lines {
        let (f, t) = (line.from, line.to);
        let series = line.series_admittance();

        y[(f, t)] -= series;
        y[(t, f)] -= series;
        y[(f, f)] += series;
        y[(t, t)] += series;

        if include_shunts {
            let shunt = Complex64::new(line.g, line.b);
            y[(f, f)] += shunt;
            y[(t, t)] += shunt;
        }

        max_flow[f] += line.rate;
        max_flow[t] += line.rate;
    }

    Admittance { y, max_flow }
}
