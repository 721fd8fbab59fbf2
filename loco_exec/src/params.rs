//! # Locomotion Executable Parameters
//!
//! This module provide parameters for the locomotion executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocoExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub control_period_s: f64,

    /// Rate at which the simulated transport delivers feedback.
    ///
    /// Units: hertz
    pub sim_fbk_rate_hz: f64,

    /// Time after which the simulated input presses quit.
    ///
    /// Units: seconds
    pub sim_run_duration_s: f64,

    /// Forward speed demanded by the simulated input.
    ///
    /// Units: meters/second
    pub sim_forward_speed_ms: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LocoExecParams {
    /// The control period, or `None` if it is not a positive number of seconds.
    pub fn control_period(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.control_period_s)
            .ok()
            .filter(|d| *d > Duration::ZERO)
    }

    /// Time the simulated input runs for, or `None` if it is negative or not representable.
    pub fn sim_run_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.sim_run_duration_s).ok()
    }
}

impl Default for LocoExecParams {
    fn default() -> Self {
        Self {
            control_period_s: 0.005,
            sim_fbk_rate_hz: 200.0,
            sim_run_duration_s: 20.0,
            sim_forward_speed_ms: 0.125,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_control_period() {
        let mut params = LocoExecParams::default();
        let period = params.control_period().unwrap();
        assert!((period.as_secs_f64() - 0.005).abs() < 1e-9);

        for &bad in [0.0, -0.005, std::f64::NAN, std::f64::INFINITY, 1e30].iter() {
            params.control_period_s = bad;
            assert_eq!(params.control_period(), None, "period {} accepted", bad);
        }
    }

    #[test]
    fn test_sim_run_duration() {
        let mut params = LocoExecParams::default();
        assert_eq!(params.sim_run_duration(), Some(Duration::from_secs(20)));

        params.sim_run_duration_s = 0.0;
        assert_eq!(params.sim_run_duration(), Some(Duration::ZERO));

        for &bad in [-1.0, std::f64::NAN, std::f64::INFINITY, 1e30].iter() {
            params.sim_run_duration_s = bad;
            assert_eq!(params.sim_run_duration(), None, "duration {} accepted", bad);
        }
    }
}
