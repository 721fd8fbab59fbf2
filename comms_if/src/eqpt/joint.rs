//! # Joint commands and feedback
//!
//! Commands and feedback are laid out leg-major, joint-minor: the command for joint `j` of leg
//! `i` lives at index `i * NUM_JOINTS_PER_LEG + j`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of actuated joints in each leg (base, shoulder, elbow).
pub const NUM_JOINTS_PER_LEG: usize = 3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demand for a single joint.
///
/// Each component is optional, a component which is `None` is not sent to the actuator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct JointCmd {
    /// Demanded position.
    ///
    /// Units: radians
    pub position_rad: Option<f64>,

    /// Demanded velocity.
    ///
    /// Units: radians/second
    pub velocity_rads: Option<f64>,

    /// Demanded torque (effort).
    ///
    /// Units: newton meters
    pub torque_nm: Option<f64>,
}

/// One tick's worth of joint demands for the whole robot.
///
/// Built fresh every cycle and handed straight to the transport.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CommandFrame {
    pub cmds: Vec<JointCmd>,
}

/// IMU data reported by the base module of a leg.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuFbk {
    /// Orientation of the module in the world, as a `[w, x, y, z]` quaternion.
    pub orientation_wxyz: Option<[f64; 4]>,

    /// Measured acceleration in the module frame.
    ///
    /// Units: meters/second^2
    pub accel_mss: Option<[f64; 3]>,

    /// Measured angular rate in the module frame.
    ///
    /// Units: radians/second
    pub gyro_rads: Option<[f64; 3]>,
}

/// Feedback delivered asynchronously by the transport.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FeedbackFrame {
    /// Monotonic time at which the feedback was received.
    ///
    /// Units: seconds
    pub timestamp_s: f64,

    /// Measured position of each joint, leg-major. `None` if the joint didn't report a position.
    ///
    /// Units: radians
    pub joint_positions_rad: Vec<Option<f64>>,

    /// IMU data for each leg.
    pub leg_imus: Vec<ImuFbk>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CommandFrame {
    /// Create a new frame for the given number of legs in which no component is set.
    pub fn new(num_legs: usize) -> Self {
        Self {
            cmds: vec![JointCmd::default(); num_legs * NUM_JOINTS_PER_LEG]
        }
    }

    /// Number of legs in the frame.
    pub fn num_legs(&self) -> usize {
        self.cmds.len() / NUM_JOINTS_PER_LEG
    }

    /// Get the commands for the given leg.
    pub fn leg(&self, leg_index: usize) -> &[JointCmd] {
        let offset = leg_index * NUM_JOINTS_PER_LEG;
        &self.cmds[offset..offset + NUM_JOINTS_PER_LEG]
    }

    pub fn leg_mut(&mut self, leg_index: usize) -> &mut [JointCmd] {
        let offset = leg_index * NUM_JOINTS_PER_LEG;
        &mut self.cmds[offset..offset + NUM_JOINTS_PER_LEG]
    }

    /// Set the components of the given leg's commands.
    ///
    /// Components passed as `None` are left untouched.
    pub fn set_leg(
        &mut self,
        leg_index: usize,
        positions_rad: Option<[f64; NUM_JOINTS_PER_LEG]>,
        velocities_rads: Option<[f64; NUM_JOINTS_PER_LEG]>,
        torques_nm: Option<[f64; NUM_JOINTS_PER_LEG]>,
    ) {
        let offset = leg_index * NUM_JOINTS_PER_LEG;

        for j in 0..NUM_JOINTS_PER_LEG {
            let cmd = &mut self.cmds[offset + j];

            if let Some(p) = positions_rad {
                cmd.position_rad = Some(p[j]);
            }
            if let Some(v) = velocities_rads {
                cmd.velocity_rads = Some(v[j]);
            }
            if let Some(t) = torques_nm {
                cmd.torque_nm = Some(t[j]);
            }
        }
    }
}

impl FeedbackFrame {
    /// Get the position feedback of the given leg, with absent values replaced by NaN.
    pub fn leg_positions_rad(&self, leg_index: usize) -> [f64; NUM_JOINTS_PER_LEG] {
        let mut pos = [std::f64::NAN; NUM_JOINTS_PER_LEG];

        for (j, p) in pos.iter_mut().enumerate() {
            if let Some(Some(v)) = self.joint_positions_rad.get(leg_index * NUM_JOINTS_PER_LEG + j) {
                *p = *v;
            }
        }

        pos
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_set_leg() {
        let mut frame = CommandFrame::new(2);

        frame.set_leg(1, Some([1.0, 2.0, 3.0]), None, Some([0.1, 0.2, 0.3]));

        assert_eq!(frame.num_legs(), 2);
        assert!(frame.leg(0).iter().all(|c| *c == JointCmd::default()));
        assert_eq!(frame.cmds[4].position_rad, Some(2.0));
        assert_eq!(frame.cmds[4].velocity_rads, None);
        assert_eq!(frame.cmds[5].torque_nm, Some(0.3));

        // Setting only velocity keeps the other components
        frame.set_leg(1, None, Some([0.0; 3]), None);
        assert_eq!(frame.cmds[3].position_rad, Some(1.0));
        assert_eq!(frame.cmds[3].velocity_rads, Some(0.0));
    }

    #[test]
    fn test_leg_positions() {
        let fbk = FeedbackFrame {
            timestamp_s: 0.0,
            joint_positions_rad: vec![Some(0.1), None, Some(0.3), Some(1.0)],
            leg_imus: vec![],
        };

        let p = fbk.leg_positions_rad(0);
        assert_eq!(p[0], 0.1);
        assert!(p[1].is_nan());
        assert_eq!(p[2], 0.3);

        // Second leg only partly reported
        let p = fbk.leg_positions_rad(1);
        assert_eq!(p[0], 1.0);
        assert!(p[1].is_nan() && p[2].is_nan());
    }
}
