//! Madgwick attitude filter, IMU only (no magnetometer)

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gradient descent attitude filter.
///
/// The quaternion rotates vectors from the sensor frame into the earth frame.
#[derive(Debug, Clone)]
pub struct Madgwick {
    /// Filter gain, larger values trust the accelerometer more.
    beta: f64,

    /// Components in `(w, x, y, z)` order.
    q: [f64; 4],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Madgwick {
    pub fn new(beta: f64) -> Self {
        Self {
            beta,
            q: [1.0, 0.0, 0.0, 0.0],
        }
    }

    pub fn reset(&mut self) {
        self.q = [1.0, 0.0, 0.0, 0.0];
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(Quaternion::new(self.q[0], self.q[1], self.q[2], self.q[3]))
    }

    /// Advance the filter by `dt_s` with the given angular rate and acceleration.
    ///
    /// The acceleration only needs to be correct in direction. A zero acceleration skips the
    /// correction step and integrates the gyro alone. Non-finite inputs or a non-positive time
    /// step leave the filter unchanged.
    pub fn update_imu(&mut self, gyro_rads: &Vector3<f64>, accel: &Vector3<f64>, dt_s: f64) {
        if !(dt_s > 0.0)
            || gyro_rads.iter().any(|v| !v.is_finite())
            || accel.iter().any(|v| !v.is_finite())
        {
            return;
        }

        let [q0, q1, q2, q3] = self.q;
        let (gx, gy, gz) = (gyro_rads.x, gyro_rads.y, gyro_rads.z);

        // Rate of change of the quaternion from the gyro
        let mut q_dot = [
            0.5 * (-q1 * gx - q2 * gy - q3 * gz),
            0.5 * (q0 * gx + q2 * gz - q3 * gy),
            0.5 * (q0 * gy - q1 * gz + q3 * gx),
            0.5 * (q0 * gz + q1 * gy - q2 * gx),
        ];

        let accel_norm = accel.norm();
        if accel_norm > 0.0 {
            let a = accel / accel_norm;

            // Gradient of the objective function matching the predicted gravity to `a`
            let s = [
                4.0 * q0 * q2 * q2 + 2.0 * q2 * a.x + 4.0 * q0 * q1 * q1 - 2.0 * q1 * a.y,
                4.0 * q1 * q3 * q3 - 2.0 * q3 * a.x + 4.0 * q0 * q0 * q1 - 2.0 * q0 * a.y - 4.0 * q1
                    + 8.0 * q1 * q1 * q1
                    + 8.0 * q1 * q2 * q2
                    + 4.0 * q1 * a.z,
                4.0 * q0 * q0 * q2 + 2.0 * q0 * a.x + 4.0 * q2 * q3 * q3 - 2.0 * q3 * a.y - 4.0 * q2
                    + 8.0 * q2 * q1 * q1
                    + 8.0 * q2 * q2 * q2
                    + 4.0 * q2 * a.z,
                4.0 * q1 * q1 * q3 - 2.0 * q1 * a.x + 4.0 * q2 * q2 * q3 - 2.0 * q2 * a.y,
            ];

            let s_norm = s.iter().map(|v| v * v).sum::<f64>().sqrt();
            if s_norm > 0.0 {
                for (qd, si) in q_dot.iter_mut().zip(s.iter()) {
                    *qd -= self.beta * si / s_norm;
                }
            }
        }

        let mut q = [
            q0 + q_dot[0] * dt_s,
            q1 + q_dot[1] * dt_s,
            q2 + q_dot[2] * dt_s,
            q3 + q_dot[3] * dt_s,
        ];

        let norm = q.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in q.iter_mut() {
                *v /= norm;
            }
            self.q = q;
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
    fn test_level_and_still_stays_identity() {
        let mut filter = Madgwick::new(0.1);

        for _ in 0..1000 {
            filter.update_imu(&Vector3::zeros(), &Vector3::new(0.0, 0.0, 9.81), 0.005);
        }

        assert!(filter.orientation().angle() < 1e-9);
    }

    #[test]
    fn test_converges_to_tilt() {
        let mut filter = Madgwick::new(0.5);

        // Sensor rolled by 0.3 rad, gravity as seen by the sensor
        let tilt = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3);
        let accel = tilt.inverse() * Vector3::new(0.0, 0.0, 9.81);

        for _ in 0..2000 {
            filter.update_imu(&Vector3::zeros(), &accel, 0.005);
        }

        let predicted = filter.orientation().inverse() * Vector3::z();
        assert!((predicted - accel.normalize()).norm() < 1e-2);
    }

    #[test]
    fn test_gyro_integration() {
        let mut filter = Madgwick::new(0.0);

        // Yaw at 1 rad/s for 0.5 s, the accelerometer cannot observe yaw
        for _ in 0..100 {
            filter.update_imu(&Vector3::new(0.0, 0.0, 1.0), &Vector3::new(0.0, 0.0, 1.0), 0.005);
        }

        let (_, _, yaw) = filter.orientation().euler_angles();
        assert!((yaw - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_step_ignored() {
        let mut filter = Madgwick::new(0.1);
        filter.update_imu(&Vector3::new(1.0, 0.0, 0.0), &Vector3::z(), 0.0);
        filter.update_imu(&Vector3::new(std::f64::NAN, 0.0, 0.0), &Vector3::z(), 0.01);

        assert!(filter.orientation().angle() < 1e-12);
    }
}
