//! Gait control module
//!
//! Runs the locomotion state machine. Each control cycle the controller advances its clock,
//! evaluates the transition table, runs the handler of the active state and produces one command
//! frame for every joint on the robot.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod dynamic_walk;
mod gait_state;
mod params;
mod stand_up;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::{leg::LegError, traj_gen::TrajError};

// Internal
pub use dynamic_walk::{SwingMode, WalkPlan};
pub use gait_state::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during GaitCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum GaitCtrlError {
    #[error("Invalid gait control parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    LegError(#[from] LegError),

    #[error("Could not build the trajectory for leg {leg}: {source}")]
    TrajError {
        leg: usize,
        #[source]
        source: TrajError,
    },

    #[error("No stand up trajectory has been planned")]
    NoStandUpPlan,

    #[error("No walk plan is available")]
    NoWalkPlan,
}
