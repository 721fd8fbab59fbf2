//! Actuator feedback handling
//!
//! The transport delivers feedback on its own thread. [`FbkHandler`] publishes each frame into
//! the shared latest-value slots of the legs and the orientation estimator, which the control
//! loop reads from.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::eqpt::{FeedbackFrame, FeedbackHandler, ImuFbk};

use crate::{
    leg::{JointVector, LegModel},
    orient_est::OrientationEstimator,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Publishes feedback into the controller's shared state.
pub struct FbkHandler {
    legs: Vec<Arc<LegModel>>,
    estimator: Arc<OrientationEstimator>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FbkHandler {
    pub fn new(legs: Vec<Arc<LegModel>>, estimator: Arc<OrientationEstimator>) -> Self {
        Self { legs, estimator }
    }

    /// Handle one feedback frame.
    ///
    /// The orientation estimate is updated first, then each leg's joint positions. Legs missing
    /// from the frame read as NaN.
    pub fn handle(&self, fbk: &FeedbackFrame) {
        let imus: Vec<ImuFbk> = (0..self.legs.len())
            .map(|i| fbk.leg_imus.get(i).copied().unwrap_or_default())
            .collect();

        self.estimator.ingest(&imus, fbk.timestamp_s);

        for (i, leg) in self.legs.iter().enumerate() {
            leg.set_joint_angles(JointVector::from(fbk.leg_positions_rad(i)));
        }
    }

    /// Convert into a handler which can be registered with a transport.
    pub fn into_transport_handler(self) -> FeedbackHandler {
        Box::new(move |fbk| self.handle(fbk))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::gait_ctrl::{GaitCtrl, Params};
    use nalgebra::Vector3;

    #[test]
    fn test_feedback_reaches_controller() {
        let ctrl = GaitCtrl::new(Params::default()).unwrap();
        let handler = ctrl.fbk_handler().into_transport_handler();

        let mut positions = vec![Some(0.5); 18];
        positions[4] = None;

        let leg_imus = ctrl
            .legs()
            .iter()
            .map(|l| {
                let q = l.base_rotation();
                ImuFbk {
                    orientation_wxyz: Some([q.w, q.i, q.j, q.k]),
                    accel_mss: Some([0.0, 0.0, 9.81]),
                    gyro_rads: Some([0.0; 3]),
                }
            })
            .collect();

        handler(&FeedbackFrame {
            timestamp_s: 0.1,
            joint_positions_rad: positions,
            leg_imus,
        });

        assert_eq!(ctrl.legs()[0].joint_angles(), JointVector::repeat(0.5));

        let leg_1 = ctrl.legs()[1].joint_angles();
        assert!(leg_1[1].is_nan());
        assert_eq!(leg_1[0], 0.5);

        let g = ctrl.estimator().gravity_direction();
        assert!((g - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_short_frame() {
        let ctrl = GaitCtrl::new(Params::default()).unwrap();
        let handler = ctrl.fbk_handler();

        handler.handle(&FeedbackFrame {
            timestamp_s: 0.0,
            joint_positions_rad: vec![Some(0.1); 3],
            leg_imus: vec![],
        });

        assert_eq!(ctrl.legs()[0].joint_angles(), JointVector::repeat(0.1));
        assert!(ctrl.legs()[5].joint_angles().iter().all(|a| a.is_nan()));
        assert_eq!(ctrl.estimator().gravity_direction(), Vector3::zeros());
    }
}
