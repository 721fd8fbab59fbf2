//! # Communications interface crate.
//!
//! Provides the interfaces between the locomotion controller and its external
//! collaborators: the actuator transport (commands out, feedback in) and the
//! operator input device.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command and feedback definitions for equipment (the actuator group)
pub mod eqpt;

/// Operator input device interface
pub mod input;
