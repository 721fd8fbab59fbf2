//! # Operator input device
//!
//! Joystick semantics (button mapping, scaling, dead zones) belong to the device implementation.

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait InputDevice {
    /// Whether the device is currently connected.
    fn is_connected(&self) -> bool;

    /// Poll the device. Must be called once per cycle before reading any of the commands.
    fn update(&mut self);

    /// Demanded body translation velocity `[x, y, z]` in the body frame.
    ///
    /// Units: meters/second
    fn translation_velocity_cmd(&self) -> [f64; 3];

    /// Demanded body rotation velocity `[x, y, z]` in the body frame.
    ///
    /// Units: radians/second
    fn rotation_velocity_cmd(&self) -> [f64; 3];

    /// Whether the quit button has been pushed since the last update.
    fn quit_button_pushed(&self) -> bool;
}
