//! Body orientation estimation module
//!
//! Fuses the IMUs of every leg into a gravity direction expressed in the body frame, and once the
//! robot is standing runs a Madgwick filter on the averaged accelerometer and gyroscope readings
//! to track the full body orientation.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod madgwick;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use madgwick::Madgwick;
pub use state::*;
