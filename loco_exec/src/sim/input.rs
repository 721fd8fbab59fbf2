//! Simulated operator input

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant};

use comms_if::input::InputDevice;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Input device which walks forward at a constant speed and quits after a fixed time.
#[derive(Debug)]
pub struct SimInput {
    forward_speed_ms: f64,

    run_duration: Duration,

    /// Time of the first update.
    start: Option<Instant>,

    quit: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimInput {
    pub fn new(forward_speed_ms: f64, run_duration: Duration) -> Self {
        Self {
            forward_speed_ms,
            run_duration,
            start: None,
            quit: false,
        }
    }
}

impl InputDevice for SimInput {
    fn is_connected(&self) -> bool {
        true
    }

    fn update(&mut self) {
        let start = *self.start.get_or_insert_with(Instant::now);
        self.quit = start.elapsed() >= self.run_duration;
    }

    fn translation_velocity_cmd(&self) -> [f64; 3] {
        [self.forward_speed_ms, 0.0, 0.0]
    }

    fn rotation_velocity_cmd(&self) -> [f64; 3] {
        [0.0; 3]
    }

    fn quit_button_pushed(&self) -> bool {
        self.quit
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_quits_after_duration() {
        let mut input = SimInput::new(0.125, Duration::from_millis(20));
        assert!(input.is_connected());

        input.update();
        assert!(!input.quit_button_pushed());
        assert_eq!(input.translation_velocity_cmd(), [0.125, 0.0, 0.0]);

        std::thread::sleep(Duration::from_millis(25));
        input.update();
        assert!(input.quit_button_pushed());
    }

    #[test]
    fn test_zero_duration_quits_immediately() {
        let mut input = SimInput::new(0.0, Duration::default());
        input.update();
        assert!(input.quit_button_pushed());
    }
}
