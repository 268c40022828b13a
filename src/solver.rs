//! Provides data structures and functions for performing optimisation.
//!
//! The optimisation problem is built up as named real variables with bounds,
//! linear constraint rows and a quadratic objective, then handed to the
//! Clarabel interior-point solver. Clarabel solves problems of the form
//! `minimise (1/2) x'Px + q'x subject to Ax + s = b, s in K`, so [`Problem`]
//! translates bounds and rows into an equality cone followed by a
//! non-negative cone.
#![allow(missing_docs)]
use anyhow::{Result, anyhow};
use clarabel::algebra::CscMatrix;
use clarabel::solver::SupportedConeT::{NonnegativeConeT, ZeroConeT};
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus};
use ::log::debug;
use std::fmt::{self, Display};
use std::io;
use std::ops::{AddAssign, Bound, RangeBounds};

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it
/// refers to a particular column of the problem.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Variable(usize);

/// A weighted sum of variables plus a constant
#[derive(Clone, Default, Debug)]
pub struct LinearExpr {
    terms: Vec<(Variable, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `coeff * var` to the expression
    pub fn add_term(&mut self, var: Variable, coeff: f64) {
        self.terms.push((var, coeff));
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Iterate over the `(variable, coefficient)` terms
    pub fn iter(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.terms.iter().copied()
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }
}

impl AddAssign<&LinearExpr> for LinearExpr {
    fn add_assign(&mut self, rhs: &LinearExpr) {
        self.terms.extend_from_slice(&rhs.terms);
        self.constant += rhs.constant;
    }
}

/// A quadratic expression: a linear part plus `coeff * a * b` product terms.
///
/// Only convex expressions are meaningful as objectives; passing a
/// non-convex expression is a programming error that surfaces as a solver
/// failure.
#[derive(Clone, Default, Debug)]
pub struct QuadExpr {
    linear: LinearExpr,
    quadratic: Vec<(Variable, Variable, f64)>,
}

impl QuadExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_linear_term(&mut self, var: Variable, coeff: f64) {
        self.linear.add_term(var, coeff);
    }

    pub fn add_constant(&mut self, value: f64) {
        self.linear.add_constant(value);
    }

    /// Append `coeff * a * b` to the expression
    pub fn add_quadratic_term(&mut self, a: Variable, b: Variable, coeff: f64) {
        self.quadratic.push((a, b, coeff));
    }

    /// Add `factor` times another expression to this one
    pub fn add_scaled(&mut self, other: &QuadExpr, factor: f64) {
        for &(var, coeff) in &other.linear.terms {
            self.linear.add_term(var, coeff * factor);
        }
        self.linear.constant += other.linear.constant * factor;
        for &(a, b, coeff) in &other.quadratic {
            self.quadratic.push((a, b, coeff * factor));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.linear.terms.is_empty() && self.quadratic.is_empty() && self.linear.constant == 0.0
    }
}

impl AddAssign<&QuadExpr> for QuadExpr {
    fn add_assign(&mut self, rhs: &QuadExpr) {
        self.add_scaled(rhs, 1.0);
    }
}

/// Termination status reported by the solver
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Status {
    Optimal,
    AlmostOptimal,
    Infeasible,
    Unbounded,
    IterationLimit,
    TimeLimit,
    Other(String),
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Optimal => write!(f, "optimal"),
            Status::AlmostOptimal => write!(f, "almost optimal"),
            Status::Infeasible => write!(f, "infeasible"),
            Status::Unbounded => write!(f, "unbounded"),
            Status::IterationLimit => write!(f, "iteration limit reached"),
            Status::TimeLimit => write!(f, "time limit reached"),
            Status::Other(raw) => write!(f, "{raw}"),
        }
    }
}

impl From<&SolverStatus> for Status {
    fn from(status: &SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => Status::Optimal,
            SolverStatus::AlmostSolved => Status::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                Status::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => Status::Unbounded,
            SolverStatus::MaxIterations => Status::IterationLimit,
            SolverStatus::MaxTime => Status::TimeLimit,
            other => Status::Other(format!("{other:?}")),
        }
    }
}

/// A column of the problem
struct Column {
    name: String,
    lb: f64,
    ub: f64,
    fixed: Option<f64>,
}

/// A constraint row `lb <= terms <= ub`
struct Row {
    name: String,
    terms: Vec<(usize, f64)>,
    lb: f64,
    ub: f64,
}

/// A convex quadratic optimisation problem under construction
#[derive(Default)]
pub struct Problem {
    columns: Vec<Column>,
    rows: Vec<Row>,
    objective: QuadExpr,
    time_limit: Option<f64>,
    verbose: bool,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a real variable with the given bounds.
    ///
    /// The name is kept for the human-readable model dump only.
    pub fn add_column(&mut self, name: impl Into<String>, bounds: impl RangeBounds<f64>) -> Variable {
        let (lb, ub) = bound_pair(bounds);
        self.columns.push(Column {
            name: name.into(),
            lb,
            ub,
            fixed: None,
        });

        Variable(self.columns.len() - 1)
    }

    /// Pin a variable to a value.
    ///
    /// The solution reports exactly this value for the variable, regardless
    /// of solver tolerance.
    pub fn fix(&mut self, var: Variable, value: f64) {
        self.columns[var.0].fixed = Some(value);
    }

    /// Add the constraint `lb <= expr <= ub`.
    ///
    /// One-sided and equality constraints are expressed through the bounds;
    /// any constant in `expr` is folded into them.
    pub fn add_row(
        &mut self,
        name: impl Into<String>,
        bounds: impl RangeBounds<f64>,
        expr: LinearExpr,
    ) {
        let (lb, ub) = bound_pair(bounds);
        self.rows.push(Row {
            name: name.into(),
            terms: expr.terms.iter().map(|&(var, coeff)| (var.0, coeff)).collect(),
            lb: lb - expr.constant,
            ub: ub - expr.constant,
        });
    }

    /// Set the (quadratic) objective to minimise
    pub fn set_objective(&mut self, objective: QuadExpr) {
        self.objective = objective;
    }

    /// Limit the solver's run time in seconds. This is the only cancellation
    /// mechanism; when the limit is hit the solve fails with
    /// [`Status::TimeLimit`].
    pub fn set_time_limit(&mut self, seconds: f64) {
        self.time_limit = Some(seconds);
    }

    /// Enable the solver's own progress output
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Solve the problem, consuming it.
    ///
    /// # Returns
    ///
    /// The solution if the solver reports (almost) optimality; otherwise an
    /// error carrying the solver's termination status unchanged.
    pub fn solve(self) -> Result<Solution> {
        let n = self.columns.len();

        // Objective: clarabel minimises (1/2) x'Px + q'x, so a diagonal
        // quadratic coefficient c becomes P[i,i] = 2c. P is upper triangular.
        let mut q = vec![0.0; n];
        for &(var, coeff) in &self.objective.linear.terms {
            q[var.0] += coeff;
        }
        let mut p_triplets = Vec::with_capacity(self.objective.quadratic.len());
        for &(a, b, coeff) in &self.objective.quadratic {
            if a.0 == b.0 {
                p_triplets.push((a.0, a.0, 2.0 * coeff));
            } else {
                p_triplets.push((a.0.min(b.0), a.0.max(b.0), coeff));
            }
        }
        let p = csc_from_triplets(n, n, p_triplets);

        // Equality rows first (the zero cone), then inequalities written as
        // `terms <= rhs` (the non-negative cone).
        let mut a_triplets = Vec::new();
        let mut b = Vec::new();
        fn push_row(
            triplets: &mut Vec<(usize, usize, f64)>,
            b: &mut Vec<f64>,
            terms: &[(usize, f64)],
            scale: f64,
            rhs: f64,
        ) {
            let row = b.len();
            for &(col, coeff) in terms {
                triplets.push((row, col, scale * coeff));
            }
            b.push(rhs);
        }

        for (i, column) in self.columns.iter().enumerate() {
            if let Some(value) = column.fixed {
                push_row(&mut a_triplets, &mut b, &[(i, 1.0)], 1.0, value);
            }
        }
        for row in &self.rows {
            if row.lb == row.ub {
                push_row(&mut a_triplets, &mut b, &row.terms, 1.0, row.ub);
            }
        }
        let n_eq = b.len();

        for row in &self.rows {
            if row.lb == row.ub {
                continue;
            }
            if row.ub.is_finite() {
                push_row(&mut a_triplets, &mut b, &row.terms, 1.0, row.ub);
            }
            if row.lb.is_finite() {
                push_row(&mut a_triplets, &mut b, &row.terms, -1.0, -row.lb);
            }
        }
        for (i, column) in self.columns.iter().enumerate() {
            if column.fixed.is_some() {
                continue;
            }
            if column.ub.is_finite() {
                push_row(&mut a_triplets, &mut b, &[(i, 1.0)], 1.0, column.ub);
            }
            if column.lb.is_finite() {
                push_row(&mut a_triplets, &mut b, &[(i, 1.0)], -1.0, -column.lb);
            }
        }
        let m = b.len();
        let a = csc_from_triplets(m, n, a_triplets);

        let mut cones = Vec::new();
        if n_eq > 0 {
            cones.push(ZeroConeT(n_eq));
        }
        if m > n_eq {
            cones.push(NonnegativeConeT(m - n_eq));
        }

        let mut settings = DefaultSettings::default();
        settings.verbose = self.verbose;
        if let Some(limit) = self.time_limit {
            settings.time_limit = limit;
        }

        debug!("Solving problem with {n} columns and {m} rows ({n_eq} equalities)");
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = Status::from(&solver.solution.status);
        debug!("Solver finished: {status}");
        match status {
            Status::Optimal | Status::AlmostOptimal => {
                let values = self
                    .columns
                    .iter()
                    .zip(solver.solution.x.iter())
                    .map(|(column, &x)| column.fixed.unwrap_or(x))
                    .collect();
                let mut solution = Solution {
                    values,
                    objective_value: 0.0,
                    status,
                };
                solution.objective_value = solution.evaluate(&self.objective);

                Ok(solution)
            }
            status => Err(anyhow!("Could not solve: {status}")),
        }
    }

    /// Write a human-readable dump of the problem
    pub fn write_debug(&self, writer: &mut impl io::Write) -> io::Result<()> {
        writeln!(writer, "minimise")?;
        for &(var, coeff) in &self.objective.linear.terms {
            writeln!(writer, "  {:+} {}", coeff, self.columns[var.0].name)?;
        }
        for &(a, b, coeff) in &self.objective.quadratic {
            writeln!(
                writer,
                "  {:+} {} * {}",
                coeff, self.columns[a.0].name, self.columns[b.0].name
            )?;
        }
        if self.objective.linear.constant != 0.0 {
            writeln!(writer, "  {:+}", self.objective.linear.constant)?;
        }

        writeln!(writer, "subject to")?;
        for row in &self.rows {
            let terms = row
                .terms
                .iter()
                .map(|&(col, coeff)| format!("{:+} {}", coeff, self.columns[col].name))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(writer, "  {}: {} <= {} <= {}", row.name, row.lb, terms, row.ub)?;
        }

        writeln!(writer, "columns")?;
        for column in &self.columns {
            match column.fixed {
                Some(value) => writeln!(writer, "  {} fixed at {}", column.name, value)?,
                None => writeln!(writer, "  {} in [{}, {}]", column.name, column.lb, column.ub)?,
            }
        }

        Ok(())
    }
}

/// The primal solution to a solved problem.
///
/// Only constructible from a successful solve, so result extraction cannot
/// observe a failed or half-built model.
#[derive(Debug)]
pub struct Solution {
    values: Vec<f64>,
    objective_value: f64,
    status: Status,
}

impl Solution {
    /// The value of a variable in the solution
    pub fn value(&self, var: Variable) -> f64 {
        self.values[var.0]
    }

    /// Evaluate an expression at the solution
    pub fn evaluate(&self, expr: &QuadExpr) -> f64 {
        let mut total = expr.linear.constant;
        for &(var, coeff) in &expr.linear.terms {
            total += coeff * self.values[var.0];
        }
        for &(a, b, coeff) in &expr.quadratic {
            total += coeff * self.values[a.0] * self.values[b.0];
        }

        total
    }

    /// Evaluate a linear expression at the solution
    pub fn evaluate_linear(&self, expr: &LinearExpr) -> f64 {
        let mut total = expr.constant;
        for &(var, coeff) in &expr.terms {
            total += coeff * self.values[var.0];
        }

        total
    }

    /// The objective value at the solution
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    /// The solver's termination status (optimal or almost optimal)
    pub fn status(&self) -> &Status {
        &self.status
    }
}

/// Extract `(lower, upper)` from range syntax, with infinities for open ends
fn bound_pair(bounds: impl RangeBounds<f64>) -> (f64, f64) {
    let lb = match bounds.start_bound() {
        Bound::Included(&value) | Bound::Excluded(&value) => value,
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let ub = match bounds.end_bound() {
        Bound::Included(&value) | Bound::Excluded(&value) => value,
        Bound::Unbounded => f64::INFINITY,
    };

    (lb, ub)
}

/// Build a compressed-sparse-column matrix from (row, col, value) triplets,
/// summing duplicates
fn csc_from_triplets(m: usize, n: usize, mut triplets: Vec<(usize, usize, f64)>) -> CscMatrix<f64> {
    triplets.sort_by_key(|&(row, col, _)| (col, row));

    let mut counts = vec![0usize; n];
    let mut rowval = Vec::with_capacity(triplets.len());
    let mut nzval: Vec<f64> = Vec::with_capacity(triplets.len());
    let mut last = None;
    for &(row, col, value) in &triplets {
        if last == Some((row, col)) {
            *nzval.last_mut().unwrap() += value;
        } else {
            rowval.push(row);
            nzval.push(value);
            counts[col] += 1;
            last = Some((row, col));
        }
    }

    let mut colptr = Vec::with_capacity(n + 1);
    let mut total = 0;
    colptr.push(0);
    for count in counts {
        total += count;
        colptr.push(total);
    }

    CscMatrix::new(m, n, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_solve_linear() {
        // minimise x + 2y subject to x + y = 1, x and y non-negative
        let mut problem = Problem::new();
        let x = problem.add_column("x", 0.0..);
        let y = problem.add_column("y", 0.0..);

        let mut balance = LinearExpr::new();
        balance.add_term(x, 1.0);
        balance.add_term(y, 1.0);
        problem.add_row("balance", 1.0..=1.0, balance);

        let mut objective = QuadExpr::new();
        objective.add_linear_term(x, 1.0);
        objective.add_linear_term(y, 2.0);
        problem.set_objective(objective);

        let solution = problem.solve().unwrap();
        assert_approx_eq!(f64, solution.value(x), 1.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.value(y), 0.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.objective_value(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_quadratic() {
        // minimise (x - 3)^2, written as x^2 - 6x + 9
        let mut problem = Problem::new();
        let x = problem.add_column("x", ..);

        let mut objective = QuadExpr::new();
        objective.add_quadratic_term(x, x, 1.0);
        objective.add_linear_term(x, -6.0);
        objective.add_constant(9.0);
        problem.set_objective(objective);

        let solution = problem.solve().unwrap();
        assert_approx_eq!(f64, solution.value(x), 3.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.objective_value(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_quadratic_with_binding_bound() {
        // minimise x^2 subject to x >= 1
        let mut problem = Problem::new();
        let x = problem.add_column("x", 1.0..);

        let mut objective = QuadExpr::new();
        objective.add_quadratic_term(x, x, 1.0);
        problem.set_objective(objective);

        let solution = problem.solve().unwrap();
        assert_approx_eq!(f64, solution.value(x), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_infeasible() {
        let mut problem = Problem::new();
        let x = problem.add_column("x", 2.0..);

        let mut row = LinearExpr::new();
        row.add_term(x, 1.0);
        problem.add_row("cap", ..=1.0, row);

        let mut objective = QuadExpr::new();
        objective.add_linear_term(x, 1.0);
        problem.set_objective(objective);

        let error = problem.solve().unwrap_err();
        assert!(error.to_string().contains("infeasible"));
    }

    #[test]
    fn test_solve_unbounded() {
        let mut problem = Problem::new();
        let x = problem.add_column("x", 0.0..);

        let mut objective = QuadExpr::new();
        objective.add_linear_term(x, -1.0);
        problem.set_objective(objective);

        let error = problem.solve().unwrap_err();
        assert!(error.to_string().contains("unbounded"));
    }

    #[test]
    fn test_fix_reports_exact_value() {
        // minimise y subject to y >= x with x pinned
        let mut problem = Problem::new();
        let x = problem.add_column("x", ..);
        let y = problem.add_column("y", ..);
        problem.fix(x, 1.5);

        let mut row = LinearExpr::new();
        row.add_term(y, 1.0);
        row.add_term(x, -1.0);
        problem.add_row("above", 0.0.., row);

        let mut objective = QuadExpr::new();
        objective.add_linear_term(y, 1.0);
        problem.set_objective(objective);

        let solution = problem.solve().unwrap();
        assert_eq!(solution.value(x), 1.5);
        assert_approx_eq!(f64, solution.value(y), 1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_row_constant_folded_into_bounds() {
        // x + 1 >= 2 is x >= 1
        let mut problem = Problem::new();
        let x = problem.add_column("x", 0.0..);

        let mut row = LinearExpr::new();
        row.add_term(x, 1.0);
        row.add_constant(1.0);
        problem.add_row("shifted", 2.0.., row);

        let mut objective = QuadExpr::new();
        objective.add_linear_term(x, 1.0);
        problem.set_objective(objective);

        let solution = problem.solve().unwrap();
        assert_approx_eq!(f64, solution.value(x), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_evaluate() {
        let mut problem = Problem::new();
        let x = problem.add_column("x", 2.0..=2.0);

        let mut objective = QuadExpr::new();
        objective.add_linear_term(x, 1.0);
        problem.set_objective(objective);
        let solution = problem.solve().unwrap();

        let mut expr = QuadExpr::new();
        expr.add_quadratic_term(x, x, 1.5);
        expr.add_linear_term(x, 1.0);
        expr.add_constant(0.5);
        assert_approx_eq!(f64, solution.evaluate(&expr), 8.5, epsilon = 1e-5);
    }

    #[test]
    fn test_write_debug() {
        let mut problem = Problem::new();
        let x = problem.add_column("x", 0.0..=10.0);
        let mut row = LinearExpr::new();
        row.add_term(x, 3.0);
        problem.add_row("cap", ..=6.0, row);

        let mut objective = QuadExpr::new();
        objective.add_linear_term(x, 1.0);
        problem.set_objective(objective);

        let mut buffer = Vec::new();
        problem.write_debug(&mut buffer).unwrap();
        let dump = String::from_utf8(buffer).unwrap();
        assert!(dump.contains("minimise"));
        assert!(dump.contains("cap"));
        assert!(dump.contains('x'));
    }

    #[test]
    fn test_csc_from_triplets_sums_duplicates() {
        let matrix = csc_from_triplets(2, 2, vec![(0, 0, 1.0), (0, 0, 2.0), (1, 1, 4.0)]);
        assert_eq!(matrix.colptr, vec![0, 1, 2]);
        assert_eq!(matrix.rowval, vec![0, 1]);
        assert_eq!(matrix.nzval, vec![3.0, 4.0]);
    }
}
