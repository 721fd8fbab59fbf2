//! # Actuator transport
//!
//! The transport owns discovery, serialisation and lifetime of commands to the actuator group.
//! The controller only sees this trait.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{CommandFrame, FeedbackFrame};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Callback invoked by the transport, on its own thread, whenever new feedback arrives.
pub type FeedbackHandler = Box<dyn Fn(&FeedbackFrame) + Send + Sync + 'static>;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait ActuatorTransport {
    /// Number of joints in the actuator group.
    fn num_joints(&self) -> usize;

    /// Send one command frame to the actuator group.
    fn send_command(&mut self, frame: &CommandFrame) -> Result<(), TransportError>;

    /// Register a handler to be called with every feedback frame.
    fn add_feedback_handler(&mut self, handler: FeedbackHandler);
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Command frame contains {found} joints but the group has {expected}")]
    FrameSizeMismatch { expected: usize, found: usize },

    #[error("The transport is not connected to the actuator group")]
    NotConnected,

    #[error("Could not send the command frame: {0}")]
    SendFailed(String),
}
