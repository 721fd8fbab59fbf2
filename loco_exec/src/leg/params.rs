//! Leg geometry parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::NUM_JOINTS;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Side of the body a leg is mounted on.
///
/// Legs on the right have their shoulder and elbow actuators mounted the other way round, so the
/// pitch axes of the chain are mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegConfiguration {
    Left,
    Right,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Where a leg is mounted on the body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LegMount {
    /// Angle of the leg about the body Z+ axis, measured from the body X+ (forward) axis.
    ///
    /// Units: degrees
    pub mount_angle_deg: f64,

    /// Distance from the body origin to the base joint.
    ///
    /// Units: meters
    pub mount_radius_m: f64,

    pub configuration: LegConfiguration,
}

/// Geometry and mass properties shared by every leg.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LegParams {
    // ---- GEOMETRY ----

    /// Radial offset from the base joint axis to the shoulder joint.
    ///
    /// Units: meters
    pub shoulder_offset_m: f64,

    /// Length of the link between the shoulder and elbow joints.
    ///
    /// Units: meters
    pub upper_length_m: f64,

    /// Length of the link between the elbow joint and the foot.
    ///
    /// Units: meters
    pub lower_length_m: f64,

    // ---- MASSES ----

    /// Mass of the shoulder actuator, located at the shoulder joint.
    ///
    /// Units: kilograms
    pub shoulder_module_mass_kg: f64,

    /// Mass of the upper link, located at its midpoint.
    ///
    /// Units: kilograms
    pub upper_link_mass_kg: f64,

    /// Mass of the elbow actuator, located at the elbow joint.
    ///
    /// Units: kilograms
    pub elbow_module_mass_kg: f64,

    /// Mass of the lower link, located at its midpoint.
    ///
    /// Units: kilograms
    pub lower_link_mass_kg: f64,

    // ---- CAPABILITIES ----

    /// Minimum joint positions, expressed for a left leg.
    ///
    /// Units: radians
    pub min_joint_pos_rad: [f64; NUM_JOINTS],

    /// Maximum joint positions, expressed for a left leg.
    ///
    /// Units: radians
    pub max_joint_pos_rad: [f64; NUM_JOINTS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LegConfiguration {
    /// Sign applied to the pitch joints to convert between joint space and the physical angles of
    /// a left leg.
    pub fn pitch_sign(&self) -> f64 {
        match self {
            LegConfiguration::Left => 1.0,
            LegConfiguration::Right => -1.0,
        }
    }
}

impl LegMount {
    pub fn new(mount_angle_deg: f64, mount_radius_m: f64, configuration: LegConfiguration) -> Self {
        Self {
            mount_angle_deg,
            mount_radius_m,
            configuration,
        }
    }

    /// The default six leg layout, ordered by leg index.
    pub fn default_layout() -> Vec<LegMount> {
        use LegConfiguration::*;

        vec![
            LegMount::new(30.0, 0.2375, Left),
            LegMount::new(-30.0, 0.2375, Right),
            LegMount::new(90.0, 0.1875, Left),
            LegMount::new(-90.0, 0.1875, Right),
            LegMount::new(150.0, 0.2375, Left),
            LegMount::new(-150.0, 0.2375, Right),
        ]
    }
}

impl LegParams {
    /// Furthest the foot can be from the shoulder joint.
    pub fn max_reach_m(&self) -> f64 {
        self.upper_length_m + self.lower_length_m
    }

    /// Closest the foot can be to the shoulder joint.
    pub fn min_reach_m(&self) -> f64 {
        (self.upper_length_m - self.lower_length_m).abs()
    }
}

impl Default for LegParams {
    fn default() -> Self {
        Self {
            shoulder_offset_m: 0.06,
            upper_length_m: 0.25,
            lower_length_m: 0.30,
            shoulder_module_mass_kg: 0.36,
            upper_link_mass_kg: 0.20,
            elbow_module_mass_kg: 0.36,
            lower_link_mass_kg: 0.15,
            min_joint_pos_rad: [-1.0, -1.2, -2.6],
            max_joint_pos_rad: [1.0, 1.4, -0.1],
        }
    }
}
