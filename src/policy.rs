//! Policy parameters applied on top of the physical network model.

/// System-wide policy parameters.
///
/// Only the angle limit is active; budget and emissions limits are reserved
/// slots and are not read from input.
#[derive(PartialEq, Clone, Debug)]
pub struct Policy {
    /// Maximum bus voltage angle magnitude in radians
    pub max_diffangle: f64,
}
