//! Leg statics used for feed-forward torque commands

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

use super::{kinematics::LinkPoint, JointVector, LegModel};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LegModel {
    /// Point masses making up the leg, as `(mass_kg, location)` pairs.
    pub fn mass_points(&self) -> [(f64, LinkPoint); 4] {
        [
            (self.params.shoulder_module_mass_kg, LinkPoint::SHOULDER),
            (self.params.upper_link_mass_kg, LinkPoint::UPPER_MID),
            (self.params.elbow_module_mass_kg, LinkPoint::ELBOW),
            (self.params.lower_link_mass_kg, LinkPoint::LOWER_MID),
        ]
    }

    /// Torques which hold the leg's own weight and push the foot with `foot_force_n`.
    ///
    /// `gravity_mss` is the gravity vector in the body frame, `foot_force_n` is the force the foot
    /// exerts on the ground, also in the body frame. Joint velocities are not used by the static
    /// compensation.
    ///
    /// Non-finite joint positions produce non-finite torques.
    pub fn compensating_torques(
        &self,
        joint_positions: &JointVector,
        _joint_velocities_rads: &JointVector,
        gravity_mss: &Vector3<f64>,
        foot_force_n: &Vector3<f64>,
    ) -> JointVector {
        let mut torques = JointVector::zeros();

        for &(mass_kg, point) in self.mass_points().iter() {
            let jac = self.point_jacobian(joint_positions, point);
            torques -= jac.transpose() * (gravity_mss * mass_kg);
        }

        torques + self.foot_jacobian(joint_positions).transpose() * foot_force_n
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::leg::{LegMount, LegParams};

    fn gravity() -> Vector3<f64> {
        Vector3::new(0.0, 0.0, -9.8)
    }

    #[test]
    fn test_base_yaw_needs_no_torque_when_level() {
        let leg = LegModel::new(0, &LegMount::default_layout()[0], &LegParams::default());
        let q = JointVector::new(0.2, 0.3, -1.2);

        let tau = leg.compensating_torques(&q, &JointVector::zeros(), &gravity(), &Vector3::zeros());

        // Gravity along the yaw axis cannot load the base joint
        assert!(tau[0].abs() < 1e-12);

        // The shoulder has to lift the leg, which is a positive rotation for a left leg
        assert!(tau[1] > 0.0);
    }

    #[test]
    fn test_torques_mirror_for_right_leg() {
        let layout = LegMount::default_layout();
        let left = LegModel::new(0, &layout[0], &LegParams::default());
        let right = LegModel::new(1, &layout[1], &LegParams::default());

        let physical = JointVector::new(0.0, 0.3, -1.2);
        let force = Vector3::new(0.0, 0.0, -40.0);

        let tau_l = left.compensating_torques(&left.mirror(&physical), &JointVector::zeros(), &gravity(), &force);
        let tau_r = right.compensating_torques(&right.mirror(&physical), &JointVector::zeros(), &gravity(), &force);

        assert!((right.mirror(&tau_r) - tau_l).norm() < 1e-9);
    }

    #[test]
    fn test_foot_force_maps_through_jacobian() {
        let leg = LegModel::new(2, &LegMount::default_layout()[2], &LegParams::default());
        let q = JointVector::new(0.0, 0.4, -1.0);
        let force = Vector3::new(0.0, 0.0, -50.0);

        let tau_grav = leg.compensating_torques(&q, &JointVector::zeros(), &gravity(), &Vector3::zeros());
        let tau_all = leg.compensating_torques(&q, &JointVector::zeros(), &gravity(), &force);

        let expected = leg.foot_jacobian(&q).transpose() * force;
        assert!((tau_all - tau_grav - expected).norm() < 1e-9);
    }

    #[test]
    fn test_nan_positions_propagate() {
        let leg = LegModel::new(0, &LegMount::default_layout()[0], &LegParams::default());
        let tau = leg.compensating_torques(
            &JointVector::repeat(std::f64::NAN),
            &JointVector::zeros(),
            &gravity(),
            &Vector3::zeros(),
        );

        assert!(tau.iter().any(|t| t.is_nan()));
    }
}
