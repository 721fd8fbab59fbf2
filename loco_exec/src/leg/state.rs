//! Leg model state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Mutex;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use super::{JointVector, LegConfiguration, LegMount, LegParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Model of a single leg.
///
/// The geometry is fixed at construction. The joint angles are written by the feedback thread and
/// read by the control thread, so they sit behind their own lock and are only ever copied out.
#[derive(Debug)]
pub struct LegModel {
    pub(super) index: usize,

    pub(super) configuration: LegConfiguration,

    pub(super) params: LegParams,

    /// Transform from the leg's base frame to the body frame.
    pub(super) base_frame: Isometry3<f64>,

    joint_angles: Mutex<JointVector>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LegModel {
    /// Create a new leg from its mounting and the shared leg geometry.
    ///
    /// The joint angles are unknown (NaN) until the first feedback is received.
    pub fn new(index: usize, mount: &LegMount, params: &LegParams) -> Self {
        let angle_rad = mount.mount_angle_deg.to_radians();

        let base_frame = Isometry3::from_parts(
            Translation3::new(
                mount.mount_radius_m * angle_rad.cos(),
                mount.mount_radius_m * angle_rad.sin(),
                0.0,
            ),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle_rad),
        );

        Self {
            index,
            configuration: mount.configuration,
            params: *params,
            base_frame,
            joint_angles: Mutex::new(JointVector::repeat(std::f64::NAN)),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn params(&self) -> &LegParams {
        &self.params
    }

    /// Rotation part of the base frame.
    pub fn base_rotation(&self) -> &UnitQuaternion<f64> {
        &self.base_frame.rotation
    }

    /// Store the latest measured joint angles.
    pub fn set_joint_angles(&self, angles: JointVector) {
        match self.joint_angles.lock() {
            Ok(mut guard) => *guard = angles,
            Err(poisoned) => *poisoned.into_inner() = angles,
        }
    }

    /// Copy of the latest measured joint angles. Joints with no feedback are NaN.
    pub fn joint_angles(&self) -> JointVector {
        match self.joint_angles.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Rotate an offset expressed along the leg's mounting direction into the body frame.
    ///
    /// Only the rotation of the base frame is applied, the mounting translation is not added.
    pub fn nominal_point(&self, offset: &Vector3<f64>) -> Vector3<f64> {
        self.base_frame.rotation * offset
    }

    /// Mirror the pitch components of a joint space offset to match this leg's configuration.
    ///
    /// Offsets are expressed for a left leg.
    pub fn mirror(&self, offset: &JointVector) -> JointVector {
        let sign = self.configuration.pitch_sign();
        JointVector::new(offset[0], sign * offset[1], sign * offset[2])
    }

    /// Returns true if the given joint positions lie within the mechanical limits of the leg.
    pub fn within_limits(&self, joint_positions: &JointVector) -> bool {
        let physical = self.mirror(joint_positions);

        (0..physical.len()).all(|i| {
            physical[i] >= self.params.min_joint_pos_rad[i]
                && physical[i] <= self.params.max_joint_pos_rad[i]
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
