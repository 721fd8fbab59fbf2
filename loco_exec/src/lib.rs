//! # Locomotion library.
//!
//! This library holds the legged locomotion controller: the leg models, body orientation
//! estimation, trajectory generation, foot force allocation, the gait state machine and the
//! real-time loop which runs it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator feedback handling - publishes feedback into the controller's shared state
pub mod fbk;

/// Stance force allocation - splits the body weight between the feet
pub mod force_alloc;

/// Gait control module - runs the stand up and walking state machine
pub mod gait_ctrl;

/// Leg model - kinematics and statics of a single leg
pub mod leg;

/// Orientation estimation - fuses the leg IMUs into a body orientation
pub mod orient_est;

/// Executable parameters
pub mod params;

/// Real-time loop - paces the gait controller at a fixed period
pub mod rt_loop;

/// Simulated transport and input device
#[cfg(feature = "sim")]
pub mod sim;

/// Trajectory generation - minimum jerk trajectories through waypoints
pub mod traj_gen;
