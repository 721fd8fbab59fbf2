//! # Equipment Interface
//!
//! This module defines the structures exchanged with the actuator transport, and the trait the
//! transport implements.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod joint;
pub mod transport;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use joint::*;
pub use transport::*;
