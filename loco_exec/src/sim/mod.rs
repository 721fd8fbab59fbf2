//! Simulated collaborators
//!
//! A transport and an input device which let the controller run without hardware. The transport
//! echoes commanded positions back as feedback for a level, stationary body.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod input;
mod transport;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use input::SimInput;
pub use transport::SimTransport;
