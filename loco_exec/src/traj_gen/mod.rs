//! Trajectory generation module
//!
//! Builds smooth multi-joint trajectories through a sequence of timed waypoints. Each joint is a
//! chain of quintic segments chosen to minimise the integrated squared jerk while passing exactly
//! through the waypoint positions and any velocities or accelerations constrained at them.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod trajectory;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use trajectory::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while building a trajectory.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TrajError {
    #[error("At least 2 waypoints are required, got {0}")]
    TooFewWaypoints(usize),

    #[error("Waypoint times must be finite and strictly increasing (waypoint {0})")]
    TimesNotIncreasing(usize),

    #[error("Expected {expected} {what} but got {found}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Waypoint {waypoint} has a non-finite {what}")]
    NonFiniteWaypoint {
        what: &'static str,
        waypoint: usize,
    },

    #[error("The optimisation for joint {0} is singular, the waypoints do not constrain it")]
    SingularSystem(usize),
}
