//! Stance force allocation
//!
//! Splits the body weight between the stance feet. Each foot's share is inversely proportional to
//! its horizontal distance from the centre of mass, where "horizontal" means perpendicular to the
//! current gravity direction.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Blend factor of a foot which is fully in stance.
pub const FULL_STANCE_BLEND: f64 = 1.0;

/// Gain of the blend modulation applied to each foot's share.
const BLEND_GAIN: f64 = 0.33;

/// Smallest horizontal distance used for a foot, so a foot under the centre of mass carries the
/// load instead of producing non-finite shares.
///
/// Units: meters
const MIN_HORIZONTAL_DIST_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Allocates the body weight across a fixed set of stance points.
#[derive(Debug, Clone)]
pub struct StanceForceAllocator {
    /// Stance foot positions in the body frame.
    stance_xyz: Vec<Vector3<f64>>,

    /// Per foot blend factor, [`FULL_STANCE_BLEND`] for every foot in full stance.
    blend_factors: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StanceForceAllocator {
    pub fn new(stance_xyz: Vec<Vector3<f64>>) -> Self {
        let blend_factors = vec![FULL_STANCE_BLEND; stance_xyz.len()];
        Self {
            stance_xyz,
            blend_factors,
        }
    }

    pub fn stance_xyz(&self) -> &[Vector3<f64>] {
        &self.stance_xyz
    }

    /// Force each foot must exert on the ground, in the body frame.
    pub fn compute(&self, gravity_direction: &Vector3<f64>, total_weight_n: f64) -> Vec<Vector3<f64>> {
        allocate(
            gravity_direction,
            &self.stance_xyz,
            &self.blend_factors,
            total_weight_n,
        )
    }
}

/// Force each stance foot must exert on the ground for all feet in full stance.
///
/// The forces point along `gravity_direction` and their components along it sum to
/// `total_weight_n`. A stance point on the gravity line through the body origin takes almost all of
/// the weight.
pub fn compute_foot_forces(
    gravity_direction: &Vector3<f64>,
    stance_xyz: &[Vector3<f64>],
    total_weight_n: f64,
) -> Vec<Vector3<f64>> {
    allocate(
        gravity_direction,
        stance_xyz,
        &vec![FULL_STANCE_BLEND; stance_xyz.len()],
        total_weight_n,
    )
}

fn allocate(
    gravity_direction: &Vector3<f64>,
    stance_xyz: &[Vector3<f64>],
    blend_factors: &[f64],
    total_weight_n: f64,
) -> Vec<Vector3<f64>> {
    let up = -gravity_direction;

    // Horizontal distance of each foot from the centre of mass
    let mut factors: Vec<f64> = stance_xyz
        .iter()
        .map(|s| (up * up.dot(s) - s).norm().max(MIN_HORIZONTAL_DIST_M))
        .collect();

    let dist_sum: f64 = factors.iter().sum();
    for f in factors.iter_mut() {
        *f = dist_sum / *f;
    }

    let inv_sum: f64 = factors.iter().sum();
    for (f, blend) in factors.iter_mut().zip(blend_factors.iter()) {
        *f /= inv_sum;
        *f *= 1.0 + BLEND_GAIN * (PI * blend).sin();
    }

    factors
        .iter()
        .map(|f| gravity_direction * (f * total_weight_n))
        .collect()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn ring(radius: f64, n: usize) -> Vec<Vector3<f64>> {
        (0..n)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / n as f64;
                Vector3::new(radius * a.cos(), radius * a.sin(), -0.28)
            })
            .collect()
    }

    #[test]
    fn test_symmetric_stance_shares_equally() {
        let down = Vector3::new(0.0, 0.0, -1.0);
        let forces = compute_foot_forces(&down, &ring(0.45, 6), 200.0);

        assert_eq!(forces.len(), 6);
        for f in forces.iter() {
            assert!((f - down * (200.0 / 6.0)).norm() < 1e-9);
        }
    }

    #[test]
    fn test_forces_sum_to_weight() {
        let stance = vec![
            Vector3::new(0.4, 0.3, -0.3),
            Vector3::new(0.5, -0.2, -0.25),
            Vector3::new(-0.1, 0.45, -0.3),
            Vector3::new(-0.45, -0.35, -0.28),
        ];

        let g = Vector3::new(0.1, -0.2, -1.0).normalize();
        let forces = compute_foot_forces(&g, &stance, 150.0);

        let along: f64 = forces.iter().map(|f| f.dot(&g)).sum();
        assert!((along - 150.0).abs() < 1e-9);

        // Every force points along gravity
        for f in forces.iter() {
            assert!(f.cross(&g).norm() < 1e-9);
            assert!(f.dot(&g) > 0.0);
        }
    }

    #[test]
    fn test_closer_feet_carry_more() {
        let down = Vector3::new(0.0, 0.0, -1.0);
        let stance = vec![Vector3::new(0.2, 0.0, -0.3), Vector3::new(-0.4, 0.0, -0.3)];
        let forces = compute_foot_forces(&down, &stance, 90.0);

        assert!((forces[0].z + 60.0).abs() < 1e-9);
        assert!((forces[1].z + 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_foot_under_body_stays_finite() {
        let down = Vector3::new(0.0, 0.0, -1.0);
        let stance = vec![
            Vector3::new(0.0, 0.0, -0.3),
            Vector3::new(0.4, 0.2, -0.3),
            Vector3::new(-0.4, 0.2, -0.3),
        ];
        let forces = compute_foot_forces(&down, &stance, 120.0);

        for f in forces.iter() {
            assert!(f.iter().all(|c| c.is_finite()));
        }

        let along: f64 = forces.iter().map(|f| f.dot(&down)).sum();
        assert!((along - 120.0).abs() < 1e-6);
        assert!(forces[0].dot(&down) > 119.9);
    }

    #[test]
    fn test_zero_gravity_gives_no_force() {
        let allocator = StanceForceAllocator::new(ring(0.45, 4));
        let forces = allocator.compute(&Vector3::zeros(), 100.0);

        for f in forces.iter() {
            assert_eq!(*f, Vector3::zeros());
        }
    }
}
