//! Scenarios for the stochastic stage of the optimisation.
use anyhow::{Result, ensure};
use float_cmp::approx_eq;
use std::rc::Rc;

/// Tolerance for the probability-sum check
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// A realisation of the random data (loads and capacity factors)
#[derive(PartialEq, Clone, Debug)]
pub struct Scenario {
    /// Unique name identifying the scenario
    pub name: Rc<str>,
    /// Probability of this scenario occurring, in [0, 1]
    pub probability: f64,
}

/// Check that scenario probabilities sum to (approximately) one
pub fn check_probabilities_sum_to_one<I>(probabilities: I) -> Result<()>
where
    I: Iterator<Item = f64>,
{
    let sum: f64 = probabilities.sum();
    ensure!(
        approx_eq!(f64, sum, 1.0, epsilon = PROBABILITY_SUM_TOLERANCE),
        "Sum of scenario probabilities does not equal one (actual: {sum})"
    );

    Ok(())
}
