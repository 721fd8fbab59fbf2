//! Leg model module
//!
//! A [`LegModel`] owns the fixed geometry of one leg and the latest joint angles reported for it.
//! It provides forward and inverse kinematics of the 3 joint chain and the feed-forward torques
//! needed to hold the leg against gravity while realising a demanded foot force.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod dynamics;
pub mod kinematics;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

// Internal
pub use params::*;
pub use kinematics::LinkPoint;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of joints in each leg.
pub const NUM_JOINTS: usize = comms_if::eqpt::NUM_JOINTS_PER_LEG;

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Vector of the (base, shoulder, elbow) joint values of a leg.
pub type JointVector = Vector3<f64>;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during leg calculations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LegError {
    #[error(
        "Target for leg {leg} is unreachable: {distance_m:.4} m from the shoulder, \
        reach is [{min_reach_m:.4}, {max_reach_m:.4}] m"
    )]
    Unreachable {
        leg: usize,
        distance_m: f64,
        min_reach_m: f64,
        max_reach_m: f64,
    },

    #[error("Target for leg {0} contains non-finite values")]
    NonFiniteTarget(usize),
}
