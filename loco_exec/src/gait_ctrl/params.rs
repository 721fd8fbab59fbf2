//! Parameters structure for GaitCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{GaitCtrlError, GaitVariant, StateDurations};
use crate::leg::{JointVector, LegMount, LegParams, NUM_JOINTS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for gait control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Which state machine to run.
    pub variant: GaitVariant,

    // ---- TIMING ----

    /// Duration of each of the two stand up phases of the quadruped gait.
    ///
    /// Units: seconds
    pub startup_s: f64,

    /// Duration of the hexapod stand up.
    ///
    /// Units: seconds
    pub hexapod_startup_s: f64,

    /// Duration of one dynamic walk cycle.
    ///
    /// Units: seconds
    pub gait_cycle_s: f64,

    // ---- BODY ----

    /// Total mass carried by the stance legs.
    ///
    /// Units: kilograms
    pub body_mass_kg: f64,

    /// Magnitude of gravity.
    ///
    /// Units: meters/second^2
    pub gravity_mss: f64,

    /// Gain of the body orientation filter.
    pub madgwick_beta: f64,

    // ---- LEGS ----

    /// Geometry shared by every leg.
    pub leg: LegParams,

    /// Mounting of each leg, in leg index order.
    pub legs: Vec<LegMount>,

    /// Legs used only for manipulation during the dynamic walk.
    pub manip_legs: Vec<usize>,

    /// The two pairs of legs which swing together during the dynamic walk.
    pub virtual_legs: [[usize; 2]; 2],

    // ---- STANCES ----
    //
    // Stance offsets are expressed along a leg's mounting direction and rotated into the body
    // frame by the leg's mount angle.

    /// Wide stance taken with the body on the ground.
    ///
    /// Units: meters
    pub spread_stance_m: [f64; 3],

    /// Standing stance.
    ///
    /// Units: meters
    pub home_stance_m: [f64; 3],

    /// Hold pose of the manipulation legs.
    ///
    /// Units: meters
    pub manip_hold_m: [f64; 3],

    /// Body frame offset added to the manipulation leg hold pose.
    ///
    /// Units: meters
    pub manip_hold_offset_m: [f64; 3],

    // ---- STAND UP ----

    /// Joint offset of the raised waypoint during stand up, expressed for a left leg.
    ///
    /// Units: radians
    pub stand_up_mid_offset_rad: [f64; NUM_JOINTS],

    /// Legs which step through the raised waypoint in the first half of the stand up. The others
    /// step in the second half.
    pub stand_up_step_first_legs: Vec<usize>,

    /// Offset added to the time in state when ramping up the stand up foot forces, keeping the
    /// forces non-zero on the first cycle.
    ///
    /// Units: seconds
    pub force_ramp_offset: f64,

    // ---- DYNAMIC WALK ----

    /// Body frame height of the swing apex above the straight line step.
    ///
    /// Units: meters
    pub swing_apex_m: [f64; 3],

    /// Maximum length of a single step.
    ///
    /// Units: meters
    pub max_step_m: f64,

    /// Body frame offset of the stance mid waypoint.
    ///
    /// Units: meters
    pub stance_mid_offset_m: [f64; 3],

    /// Fraction of the body weight pushed by each swing foot.
    pub swing_foot_force_frac: f64,

    /// Fraction of the body weight pushed by each stance foot.
    pub stance_foot_force_frac: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn num_legs(&self) -> usize {
        self.legs.len()
    }

    /// Weight of the body.
    ///
    /// Units: newtons
    pub fn weight_n(&self) -> f64 {
        self.body_mass_kg * self.gravity_mss
    }

    pub fn spread_stance(&self) -> Vector3<f64> {
        Vector3::from(self.spread_stance_m)
    }

    pub fn home_stance(&self) -> Vector3<f64> {
        Vector3::from(self.home_stance_m)
    }

    pub fn stand_up_mid_offset(&self) -> JointVector {
        JointVector::from(self.stand_up_mid_offset_rad)
    }

    /// Check the parameters describe a runnable gait and return the state durations.
    pub fn validate(&self) -> Result<StateDurations, GaitCtrlError> {
        let num_legs = self.num_legs();

        let check_duration = |name: &str, value: f64| {
            match Duration::try_from_secs_f64(value) {
                Ok(d) if d > Duration::ZERO => Ok(d),
                _ => Err(GaitCtrlError::InvalidParams(format!(
                    "{} must be a positive representable duration, got {}",
                    name, value
                ))),
            }
        };

        let durations = StateDurations {
            startup: check_duration("startup_s", self.startup_s)?,
            hexapod_startup: check_duration("hexapod_startup_s", self.hexapod_startup_s)?,
            gait_cycle: check_duration("gait_cycle_s", self.gait_cycle_s)?,
        };

        if num_legs == 0 {
            return Err(GaitCtrlError::InvalidParams("No legs defined".into()));
        }

        let walk_legs = self.virtual_legs.iter().flat_map(|v| v.iter());
        for &leg in walk_legs
            .chain(self.manip_legs.iter())
            .chain(self.stand_up_step_first_legs.iter())
        {
            if leg >= num_legs {
                return Err(GaitCtrlError::InvalidParams(format!(
                    "Leg index {} is out of range for {} legs",
                    leg, num_legs
                )));
            }
        }

        if !(self.weight_n() >= 0.0) || !(self.max_step_m >= 0.0) {
            return Err(GaitCtrlError::InvalidParams(
                "Body weight and maximum step must not be negative".into(),
            ));
        }

        Ok(durations)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            variant: GaitVariant::Quadruped,
            startup_s: 1.9,
            hexapod_startup_s: 4.5,
            gait_cycle_s: 0.8,
            body_mass_kg: 21.0,
            gravity_mss: 9.8,
            madgwick_beta: 0.1,
            leg: LegParams::default(),
            legs: LegMount::default_layout(),
            manip_legs: vec![2, 3],
            virtual_legs: [[0, 5], [1, 4]],
            spread_stance_m: [0.55, 0.0, 0.05],
            home_stance_m: [0.45, 0.0, -0.28],
            manip_hold_m: [0.35, 0.0, 0.0],
            manip_hold_offset_m: [0.07, 0.0, 0.0],
            stand_up_mid_offset_rad: [0.0, 0.3, -0.15],
            stand_up_step_first_legs: vec![0, 3, 4],
            force_ramp_offset: 0.0005,
            swing_apex_m: [0.0, 0.0, 0.08],
            max_step_m: 0.10,
            stance_mid_offset_m: [0.0, 0.0, -0.01],
            swing_foot_force_frac: 0.2,
            stance_foot_force_frac: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        let durations = Params::default().validate().unwrap();
        assert!((durations.startup.as_secs_f64() - 1.9).abs() < 1e-6);
        assert!((durations.gait_cycle.as_secs_f64() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::default();
        params.gait_cycle_s = 0.0;
        assert!(params.validate().is_err());

        let mut params = Params::default();
        params.manip_legs = vec![2, 6];
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_durations_are_rejected() {
        for &value in [1e30, std::f64::INFINITY, std::f64::NAN, -1.0].iter() {
            let params = Params {
                gait_cycle_s: value,
                ..Default::default()
            };
            match params.validate() {
                Err(GaitCtrlError::InvalidParams(msg)) => assert!(msg.contains("gait_cycle_s")),
                other => panic!("gait_cycle_s = {} gave {:?}", value, other),
            }
        }

        let params = Params {
            startup_s: 1e30,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let params: Params = util::params::from_str(
            r#"
            variant = "hexapod"
            startup_s = 2.5

            [leg]
            upper_length_m = 0.3
            "#,
        )
        .unwrap();

        assert_eq!(params.variant, GaitVariant::Hexapod);
        assert!((params.startup_s - 2.5).abs() < 1e-12);
        assert!((params.leg.upper_length_m - 0.3).abs() < 1e-12);
        assert!((params.leg.lower_length_m - 0.3).abs() < 1e-12);
        assert_eq!(params.legs.len(), 6);
    }
}
