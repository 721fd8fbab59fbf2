//! Leg kinematics
//!
//! The chain is a yaw joint at the mounting point followed by two pitch joints. In the leg's base
//! frame the X+ axis points radially away from the body and Z+ points up. The pitch joints are
//! mirrored for right legs, so all geometry is computed on the physical angles of a left leg
//! (`phi_1`, `phi_2`) and converted back with the configuration's pitch sign.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Isometry3, Matrix3, Point3, Translation3, UnitQuaternion, Vector3};

use super::{JointVector, LegError, LegModel};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance applied to the reach limits of the leg.
const REACH_TOLERANCE_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point fixed on the leg, given by how far along each link it sits.
///
/// A value of 0 is the start of the link and 1 is the end of it. The shoulder offset is always
/// included.
#[derive(Debug, Clone, Copy)]
pub struct LinkPoint {
    pub upper_frac: f64,
    pub lower_frac: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LinkPoint {
    pub const SHOULDER: LinkPoint = LinkPoint::new(0.0, 0.0);
    pub const UPPER_MID: LinkPoint = LinkPoint::new(0.5, 0.0);
    pub const ELBOW: LinkPoint = LinkPoint::new(1.0, 0.0);
    pub const LOWER_MID: LinkPoint = LinkPoint::new(1.0, 0.5);
    pub const FOOT: LinkPoint = LinkPoint::new(1.0, 1.0);

    pub const fn new(upper_frac: f64, lower_frac: f64) -> Self {
        Self {
            upper_frac,
            lower_frac,
        }
    }
}

impl LegModel {
    /// Pose of the foot in the body frame for the given joint positions.
    ///
    /// The orientation is that of the lower link, with X+ pointing from the elbow to the foot.
    pub fn forward_kinematics(&self, joint_positions: &JointVector) -> Isometry3<f64> {
        let (phi_1, phi_2) = self.physical_pitch(joint_positions);

        let link_rot = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), joint_positions[0])
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -(phi_1 + phi_2));

        let pos_leg = self.point_in_leg_frame(joint_positions, LinkPoint::FOOT);

        self.base_frame
            * Isometry3::from_parts(Translation3::from(pos_leg), link_rot)
    }

    /// Position of the foot in the body frame for the given joint positions.
    pub fn foot_position(&self, joint_positions: &JointVector) -> Vector3<f64> {
        self.point_position(joint_positions, LinkPoint::FOOT)
    }

    /// Position of any point on the leg in the body frame.
    pub fn point_position(&self, joint_positions: &JointVector, point: LinkPoint) -> Vector3<f64> {
        let pos_leg = self.point_in_leg_frame(joint_positions, point);
        (self.base_frame * Point3::from(pos_leg)).coords
    }

    /// Find the joint positions which place the foot at the given body frame position.
    ///
    /// Of the two elbow solutions the knee-up one is always returned.
    pub fn inverse_kinematics(&self, target_body: &Vector3<f64>) -> Result<JointVector, LegError> {
        if !target_body.iter().all(|v| v.is_finite()) {
            return Err(LegError::NonFiniteTarget(self.index));
        }

        let l_1 = self.params.upper_length_m;
        let l_2 = self.params.lower_length_m;

        let target_leg = self
            .base_frame
            .inverse_transform_point(&Point3::from(*target_body));

        let q_0 = target_leg.y.atan2(target_leg.x);

        // Position of the target in the plane of the pitch joints, relative to the shoulder
        let rho = (target_leg.x.powi(2) + target_leg.y.powi(2)).sqrt() - self.params.shoulder_offset_m;
        let h = target_leg.z;

        let dist_sq = rho.powi(2) + h.powi(2);
        let dist = dist_sq.sqrt();

        if dist > self.params.max_reach_m() + REACH_TOLERANCE_M
            || dist < self.params.min_reach_m() - REACH_TOLERANCE_M
        {
            return Err(LegError::Unreachable {
                leg: self.index,
                distance_m: dist,
                min_reach_m: self.params.min_reach_m(),
                max_reach_m: self.params.max_reach_m(),
            });
        }

        let cos_elbow = util::maths::clamp(
            (dist_sq - l_1.powi(2) - l_2.powi(2)) / (2.0 * l_1 * l_2),
            -1.0,
            1.0,
        );

        let phi_2 = -cos_elbow.acos();
        let phi_1 = h.atan2(rho) - (l_2 * phi_2.sin()).atan2(l_1 + l_2 * phi_2.cos());

        let sign = self.configuration.pitch_sign();

        Ok(JointVector::new(q_0, sign * phi_1, sign * phi_2))
    }

    /// Jacobian of the foot position in the body frame with respect to the joint positions.
    pub fn foot_jacobian(&self, joint_positions: &JointVector) -> Matrix3<f64> {
        self.point_jacobian(joint_positions, LinkPoint::FOOT)
    }

    /// Jacobian of a point on the leg, in the body frame, with respect to the joint positions.
    pub fn point_jacobian(&self, joint_positions: &JointVector, point: LinkPoint) -> Matrix3<f64> {
        let (phi_1, phi_2) = self.physical_pitch(joint_positions);
        let sign = self.configuration.pitch_sign();
        let (sin_q0, cos_q0) = joint_positions[0].sin_cos();

        let upper = point.upper_frac * self.params.upper_length_m;
        let lower = point.lower_frac * self.params.lower_length_m;

        let rho = self.params.shoulder_offset_m + upper * phi_1.cos() + lower * (phi_1 + phi_2).cos();

        // Partial derivatives of the radial distance and height wrt the two pitch joints
        let drho_dq1 = -sign * (upper * phi_1.sin() + lower * (phi_1 + phi_2).sin());
        let dh_dq1 = sign * (upper * phi_1.cos() + lower * (phi_1 + phi_2).cos());
        let drho_dq2 = -sign * lower * (phi_1 + phi_2).sin();
        let dh_dq2 = sign * lower * (phi_1 + phi_2).cos();

        #[rustfmt::skip]
        let jac_leg = Matrix3::new(
            -rho * sin_q0, drho_dq1 * cos_q0, drho_dq2 * cos_q0,
             rho * cos_q0, drho_dq1 * sin_q0, drho_dq2 * sin_q0,
             0.0,          dh_dq1,            dh_dq2,
        );

        self.base_frame.rotation.to_rotation_matrix().matrix() * jac_leg
    }

    fn physical_pitch(&self, joint_positions: &JointVector) -> (f64, f64) {
        let sign = self.configuration.pitch_sign();
        (sign * joint_positions[1], sign * joint_positions[2])
    }

    fn point_in_leg_frame(&self, joint_positions: &JointVector, point: LinkPoint) -> Vector3<f64> {
        let (phi_1, phi_2) = self.physical_pitch(joint_positions);

        let upper = point.upper_frac * self.params.upper_length_m;
        let lower = point.lower_frac * self.params.lower_length_m;

        let rho = self.params.shoulder_offset_m + upper * phi_1.cos() + lower * (phi_1 + phi_2).cos();
        let h = upper * phi_1.sin() + lower * (phi_1 + phi_2).sin();

        Vector3::new(
            rho * joint_positions[0].cos(),
            rho * joint_positions[0].sin(),
            h,
        )
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::leg::{LegMount, LegParams};

    fn all_legs() -> Vec<LegModel> {
        LegMount::default_layout()
            .iter()
            .enumerate()
            .map(|(i, m)| LegModel::new(i, m, &LegParams::default()))
            .collect()
    }

    /// Grid of physical (left leg) angles covering the knee-up workspace.
    fn physical_grid() -> Vec<JointVector> {
        let mut grid = Vec::new();
        for &q_0 in [-0.6, 0.0, 0.6].iter() {
            for &phi_1 in [-0.5, 0.0, 0.4, 0.8].iter() {
                for &phi_2 in [-2.0, -1.2, -0.5].iter() {
                    grid.push(JointVector::new(q_0, phi_1, phi_2));
                }
            }
        }
        grid
    }

    #[test]
    fn test_fk_ik_round_trip() {
        for leg in all_legs() {
            for physical in physical_grid() {
                let q = leg.mirror(&physical);
                assert!(leg.within_limits(&q));

                let foot = leg.foot_position(&q);
                let q_ik = leg
                    .inverse_kinematics(&foot)
                    .unwrap_or_else(|e| panic!("IK failed for {:?}: {}", q, e));

                assert!(
                    (q_ik - q).norm() < 1e-9,
                    "leg {}: expected {:?}, got {:?}",
                    leg.index(),
                    q,
                    q_ik
                );
                assert!((leg.foot_position(&q_ik) - foot).norm() < 1e-9);
            }
        }
    }

    #[test]
    fn test_fk_zero_pose() {
        let params = LegParams::default();
        let legs = all_legs();

        // Leg 2 points straight along body Y+ from (0, 0.1875, 0)
        let foot = legs[2].foot_position(&JointVector::zeros());
        let reach = params.shoulder_offset_m + params.upper_length_m + params.lower_length_m;
        assert!((foot - Vector3::new(0.0, 0.1875 + reach, 0.0)).norm() < 1e-12);

        let pose = legs[2].forward_kinematics(&JointVector::zeros());
        assert!((pose.translation.vector - foot).norm() < 1e-12);
    }

    #[test]
    fn test_right_leg_mirrors_left() {
        let legs = all_legs();

        // Raising the shoulder of a left leg is a positive rotation, for a right leg negative
        let up_left = legs[0].foot_position(&JointVector::new(0.0, 0.4, -1.0));
        let up_right = legs[1].foot_position(&JointVector::new(0.0, -0.4, 1.0));

        assert!((up_left.z - up_right.z).abs() < 1e-12);
        assert!((up_left.x - up_right.x).abs() < 1e-12);
        assert!((up_left.y + up_right.y).abs() < 1e-12);
    }

    #[test]
    fn test_ik_unreachable() {
        let legs = all_legs();

        match legs[0].inverse_kinematics(&Vector3::new(2.0, 0.0, 0.0)) {
            Err(LegError::Unreachable { leg, .. }) => assert_eq!(leg, 0),
            r => panic!("Expected unreachable, got {:?}", r),
        }

        // Too close to the shoulder
        let shoulder = legs[0].point_position(&JointVector::zeros(), LinkPoint::SHOULDER);
        assert!(legs[0].inverse_kinematics(&shoulder).is_err());

        match legs[0].inverse_kinematics(&Vector3::new(std::f64::NAN, 0.0, 0.0)) {
            Err(LegError::NonFiniteTarget(0)) => (),
            r => panic!("Expected non-finite error, got {:?}", r),
        }
    }

    #[test]
    fn test_jacobian_matches_finite_difference() {
        const STEP: f64 = 1e-6;

        for leg in all_legs() {
            let q = leg.mirror(&JointVector::new(0.3, 0.4, -1.2));

            for &point in [LinkPoint::UPPER_MID, LinkPoint::ELBOW, LinkPoint::FOOT].iter() {
                let jac = leg.point_jacobian(&q, point);

                for j in 0..3 {
                    let mut q_plus = q;
                    let mut q_minus = q;
                    q_plus[j] += STEP;
                    q_minus[j] -= STEP;

                    let col = (leg.point_position(&q_plus, point)
                        - leg.point_position(&q_minus, point))
                        / (2.0 * STEP);

                    assert!(
                        (jac.column(j) - col).norm() < 1e-6,
                        "leg {} column {}",
                        leg.index(),
                        j
                    );
                }
            }
        }
    }
}
