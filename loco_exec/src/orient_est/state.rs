//! Orientation estimator state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Mutex, MutexGuard};

use comms_if::eqpt::ImuFbk;
use log::trace;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use super::Madgwick;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fused gravity vectors shorter than this are treated as having no information.
const MIN_GRAVITY_NORM: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Estimates the body orientation from the IMUs mounted at the base of each leg.
///
/// Feedback is ingested on the transport's feedback thread while the control thread reads the
/// estimate, so all methods take `&self` and the estimator is shared behind an `Arc`.
#[derive(Debug)]
pub struct OrientationEstimator {
    /// Rotation from each leg's base frame to the body frame.
    base_rotations: Vec<UnitQuaternion<f64>>,

    fused: Mutex<FusedState>,

    /// Timestamp of the last feedback used, guarded separately from the fused state.
    last_fbk_time_s: Mutex<Option<f64>>,
}

#[derive(Debug)]
struct FusedState {
    /// Unit gravity direction in the body frame, zero until the first valid feedback.
    gravity_direction: Vector3<f64>,

    filter: Madgwick,

    filter_enabled: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OrientationEstimator {
    pub fn new(base_rotations: Vec<UnitQuaternion<f64>>, madgwick_beta: f64) -> Self {
        Self {
            base_rotations,
            fused: Mutex::new(FusedState {
                gravity_direction: Vector3::zeros(),
                filter: Madgwick::new(madgwick_beta),
                filter_enabled: false,
            }),
            last_fbk_time_s: Mutex::new(None),
        }
    }

    /// Latest gravity direction in the body frame.
    ///
    /// Zero until at least one leg has reported a valid orientation.
    pub fn gravity_direction(&self) -> Vector3<f64> {
        self.fused().gravity_direction
    }

    /// Latest body orientation from the attitude filter.
    pub fn body_orientation(&self) -> UnitQuaternion<f64> {
        self.fused().filter.orientation()
    }

    pub fn filter_enabled(&self) -> bool {
        self.fused().filter_enabled
    }

    /// Start running the attitude filter on incoming feedback.
    pub fn start_filter(&self) {
        let mut fused = self.fused();
        if !fused.filter_enabled {
            fused.filter.reset();
            fused.filter_enabled = true;
        }
    }

    /// Update the estimate from one feedback sample.
    ///
    /// `imus` holds the IMU of each leg's base module in leg order. Legs with a missing or
    /// non-finite orientation are left out of the gravity average, and if no leg is valid the
    /// previous estimate is kept.
    pub fn ingest(&self, imus: &[ImuFbk], timestamp_s: f64) {
        let dt_s = self.update_timestamp(timestamp_s);

        let gravity = self.fuse_gravity(imus);
        let imu_avg = self.average_imu(imus);

        let mut fused = self.fused();

        if let Some(g) = gravity {
            fused.gravity_direction = g;
        }

        if fused.filter_enabled {
            if let (Some((gyro, accel)), Some(dt_s)) = (imu_avg, dt_s) {
                fused.filter.update_imu(&gyro, &accel, dt_s);
            }
        }
    }

    fn fused(&self) -> MutexGuard<FusedState> {
        match self.fused.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record the new timestamp and return the positive time step since the previous one.
    fn update_timestamp(&self, timestamp_s: f64) -> Option<f64> {
        let mut last = match self.last_fbk_time_s.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !timestamp_s.is_finite() {
            return None;
        }

        match *last {
            Some(prev) if timestamp_s <= prev => {
                trace!("Feedback timestamp did not advance ({} <= {})", timestamp_s, prev);
                None
            }
            Some(prev) => {
                *last = Some(timestamp_s);
                Some(timestamp_s - prev)
            }
            None => {
                *last = Some(timestamp_s);
                None
            }
        }
    }

    /// Average of the gravity direction seen by each valid leg, in the body frame.
    fn fuse_gravity(&self, imus: &[ImuFbk]) -> Option<Vector3<f64>> {
        let mut sum = Vector3::zeros();
        let mut num_valid = 0;

        for (base_rot, imu) in self.base_rotations.iter().zip(imus.iter()) {
            let module_rot = match leg_orientation(imu) {
                Some(r) => r,
                None => continue,
            };

            // Gravity points down in the world, rotate it into the module frame and then into the
            // body frame through the module's fixed mounting.
            let g = base_rot * (module_rot.inverse() * Vector3::new(0.0, 0.0, -1.0));

            if g.iter().all(|v| v.is_finite()) {
                sum += g;
                num_valid += 1;
            }
        }

        if num_valid == 0 || sum.norm() < MIN_GRAVITY_NORM {
            return None;
        }

        Some(sum.normalize())
    }

    /// Average angular rate and unit acceleration across valid legs, in the body frame.
    fn average_imu(&self, imus: &[ImuFbk]) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let mut gyro_sum = Vector3::zeros();
        let mut accel_sum = Vector3::zeros();
        let mut num_valid = 0;

        for (base_rot, imu) in self.base_rotations.iter().zip(imus.iter()) {
            let (gyro, accel) = match (imu.gyro_rads, imu.accel_mss) {
                (Some(g), Some(a)) => (Vector3::from(g), Vector3::from(a)),
                _ => continue,
            };

            let accel_norm = accel.norm();
            if !gyro.iter().all(|v| v.is_finite())
                || !accel_norm.is_finite()
                || accel_norm < MIN_GRAVITY_NORM
            {
                continue;
            }

            gyro_sum += base_rot * gyro;
            accel_sum += base_rot * (accel / accel_norm);
            num_valid += 1;
        }

        if num_valid == 0 {
            return None;
        }

        let n = num_valid as f64;
        Some((gyro_sum / n, accel_sum / n))
    }
}

/// Orientation of a leg's module in the world frame, if it is present and finite.
fn leg_orientation(imu: &ImuFbk) -> Option<UnitQuaternion<f64>> {
    let [w, x, y, z] = imu.orientation_wxyz?;
    let q = Quaternion::new(w, x, y, z);

    if !q.coords.iter().all(|v| v.is_finite()) || q.norm() < MIN_GRAVITY_NORM {
        return None;
    }

    Some(UnitQuaternion::from_quaternion(q))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::NAN;

    fn mount_rotations() -> Vec<UnitQuaternion<f64>> {
        [30.0f64, -30.0, 90.0, -90.0, 150.0, -150.0]
            .iter()
            .map(|a| UnitQuaternion::from_axis_angle(&Vector3::z_axis(), a.to_radians()))
            .collect()
    }

    /// IMU feedback for a body with the given orientation in the world.
    fn imus_for_body(body: &UnitQuaternion<f64>) -> Vec<ImuFbk> {
        mount_rotations()
            .iter()
            .map(|base| {
                let module = body * base;
                let accel = module.inverse() * Vector3::new(0.0, 0.0, 9.81);
                ImuFbk {
                    orientation_wxyz: Some([module.w, module.i, module.j, module.k]),
                    accel_mss: Some([accel.x, accel.y, accel.z]),
                    gyro_rads: Some([0.0, 0.0, 0.0]),
                }
            })
            .collect()
    }

    #[test]
    fn test_gravity_starts_at_zero() {
        let est = OrientationEstimator::new(mount_rotations(), 0.1);
        assert_eq!(est.gravity_direction(), Vector3::zeros());
    }

    #[test]
    fn test_level_body_gravity_is_down() {
        let est = OrientationEstimator::new(mount_rotations(), 0.1);
        est.ingest(&imus_for_body(&UnitQuaternion::identity()), 0.0);

        assert!((est.gravity_direction() - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_tilted_body_gravity() {
        let est = OrientationEstimator::new(mount_rotations(), 0.1);
        let body = UnitQuaternion::from_euler_angles(0.2, -0.1, 0.7);
        est.ingest(&imus_for_body(&body), 0.0);

        let expected = body.inverse() * Vector3::new(0.0, 0.0, -1.0);
        assert!((est.gravity_direction() - expected).norm() < 1e-9);
    }

    #[test]
    fn test_nan_legs_are_excluded() {
        let est = OrientationEstimator::new(mount_rotations(), 0.1);
        let body = UnitQuaternion::from_euler_angles(0.1, 0.1, 0.0);

        let mut imus = imus_for_body(&body);
        imus[1].orientation_wxyz = Some([NAN, NAN, NAN, NAN]);
        imus[4].orientation_wxyz = None;

        est.ingest(&imus, 0.0);

        let expected = body.inverse() * Vector3::new(0.0, 0.0, -1.0);
        assert!((est.gravity_direction() - expected).norm() < 1e-9);
    }

    #[test]
    fn test_all_invalid_keeps_previous() {
        let est = OrientationEstimator::new(mount_rotations(), 0.1);
        est.ingest(&imus_for_body(&UnitQuaternion::identity()), 0.0);

        let invalid = vec![ImuFbk::default(); 6];
        est.ingest(&invalid, 0.01);

        assert!((est.gravity_direction() - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_filter_only_runs_once_started() {
        let est = OrientationEstimator::new(mount_rotations(), 0.5);
        let body = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.2);
        let imus = imus_for_body(&body);

        for i in 0..100 {
            est.ingest(&imus, i as f64 * 0.005);
        }
        assert!(!est.filter_enabled());
        assert!(est.body_orientation().angle() < 1e-12);

        est.start_filter();
        for i in 100..2100 {
            est.ingest(&imus, i as f64 * 0.005);
        }

        // Roll and pitch follow the accelerometers
        let predicted = est.body_orientation().inverse() * Vector3::z();
        let expected = body.inverse() * Vector3::z();
        assert!((predicted - expected).norm() < 1e-2);
    }

    #[test]
    fn test_stale_timestamp_skips_filter() {
        let est = OrientationEstimator::new(mount_rotations(), 0.5);
        est.start_filter();

        let imus = imus_for_body(&UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3));
        est.ingest(&imus, 1.0);
        est.ingest(&imus, 1.0);
        est.ingest(&imus, 0.5);

        assert!(est.body_orientation().angle() < 1e-12);
    }
}
