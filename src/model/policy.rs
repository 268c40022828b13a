//! The policy submodel.
//!
//! Applies system-wide policy constraints on top of the physical model. Only
//! the angle limit is implemented; budget and emissions limits are reserved.
use crate::model::transmission::TransmissionVariables;
use crate::solver::{LinearExpr, Problem};
use crate::system::System;

/// Constrain every bus angle to the policy's angle limit
pub fn add_policy_submodel(
    problem: &mut Problem,
    system: &System,
    transmission: &TransmissionVariables,
) {
    let limit = system.policy.max_diffangle;
    for (n, bus) in system.buses.values().enumerate() {
        for (s, scenario) in system.scenarios.values().enumerate() {
            for (t, timepoint) in system.timescale.iter() {
                let mut row = LinearExpr::new();
                row.add_term(transmission.theta(n, s, t), 1.0);
                problem.add_row(
                    format!("cAngleLimit[{},{},{}]", bus.name, scenario.name, timepoint.name),
                    -limit..=limit,
                    row,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{generator, solve_system, two_bus_system};
    use crate::settings::Settings;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// A tight angle limit binds and shifts dispatch to the loaded bus
    #[rstest]
    fn test_angle_limit_binds(two_bus_system: System) {
        let mut system = two_bus_system;
        // Local but expensive backup generation at bus B
        let backup = generator("backup", 1, 100.0, 2.0, 1000.0);
        system
            .generators
            .insert(std::rc::Rc::clone(&backup.name), backup);

        // One degree: imports over the line are capped at B * theta_lim
        let limit = 1.0_f64.to_radians();
        system.policy.max_diffangle = limit;

        let solved = solve_system(&system, &Settings::default()).unwrap();

        let theta_b = solved.solution.value(solved.transmission.theta(1, 0, 0));
        assert_approx_eq!(f64, theta_b, -limit, epsilon = 1e-6);

        // Imports cover 10 * theta_lim; the backup generator serves the rest
        let import = 10.0 * limit;
        let cheap = solved.solution.value(solved.generators.dispatch(0, 0));
        let local = solved.solution.value(solved.generators.dispatch(1, 0));
        assert_approx_eq!(f64, cheap, import, epsilon = 1e-3);
        assert_approx_eq!(f64, local, 50.0 - import, epsilon = 1e-3);
    }
}
