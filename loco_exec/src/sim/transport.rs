//! Simulated actuator transport

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use comms_if::eqpt::{
    ActuatorTransport, CommandFrame, FeedbackFrame, FeedbackHandler, ImuFbk, TransportError,
    NUM_JOINTS_PER_LEG,
};
use log::{debug, warn};
use nalgebra::{UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Acceleration measured by a stationary IMU.
///
/// Units: meters/second^2
const STANDARD_GRAVITY_MSS: f64 = 9.81;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Transport which reports the last commanded positions as feedback.
pub struct SimTransport {
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
    fbk_thread: Option<JoinHandle<()>>,
}

struct Shared {
    positions: Mutex<Vec<Option<f64>>>,
    handlers: Mutex<Vec<FeedbackHandler>>,
    leg_imus: Vec<ImuFbk>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimTransport {
    /// Start the simulated transport for legs with the given mount angles.
    ///
    /// Feedback is delivered to the registered handlers at `fbk_rate_hz` on a background thread.
    pub fn start(mount_angles_deg: &[f64], fbk_rate_hz: f64) -> Self {
        let leg_imus = mount_angles_deg
            .iter()
            .map(|a| level_imu(a.to_radians()))
            .collect();

        let shared = Arc::new(Shared {
            positions: Mutex::new(vec![None; mount_angles_deg.len() * NUM_JOINTS_PER_LEG]),
            handlers: Mutex::new(Vec::new()),
            leg_imus,
        });
        let stop = Arc::new(AtomicBool::new(false));

        let period = Duration::from_secs_f64(1.0 / fbk_rate_hz.max(1.0));

        let fbk_thread = {
            let shared = shared.clone();
            let stop = stop.clone();
            thread::spawn(move || fbk_loop(&shared, &stop, period))
        };

        debug!("SimTransport started at {:.1} Hz", fbk_rate_hz);

        Self {
            shared,
            stop,
            fbk_thread: Some(fbk_thread),
        }
    }

    /// Build and deliver one feedback frame immediately.
    pub fn publish_feedback(&self, timestamp_s: f64) {
        publish(&self.shared, timestamp_s);
    }
}

impl ActuatorTransport for SimTransport {
    fn num_joints(&self) -> usize {
        lock(&self.shared.positions).len()
    }

    fn send_command(&mut self, frame: &CommandFrame) -> Result<(), TransportError> {
        let mut positions = lock(&self.shared.positions);

        if frame.cmds.len() != positions.len() {
            return Err(TransportError::FrameSizeMismatch {
                expected: positions.len(),
                found: frame.cmds.len(),
            });
        }

        for (pos, cmd) in positions.iter_mut().zip(frame.cmds.iter()) {
            if let Some(p) = cmd.position_rad {
                *pos = Some(p);
            }
        }

        Ok(())
    }

    fn add_feedback_handler(&mut self, handler: FeedbackHandler) {
        lock(&self.shared.handlers).push(handler);
    }
}

impl Drop for SimTransport {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);

        if let Some(handle) = self.fbk_thread.take() {
            if handle.join().is_err() {
                warn!("SimTransport feedback thread panicked");
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn fbk_loop(shared: &Shared, stop: &AtomicBool, period: Duration) {
    let start = Instant::now();

    while !stop.load(Ordering::Acquire) {
        thread::sleep(period);
        publish(shared, start.elapsed().as_secs_f64());
    }
}

fn publish(shared: &Shared, timestamp_s: f64) {
    let frame = FeedbackFrame {
        timestamp_s,
        joint_positions_rad: lock(&shared.positions).clone(),
        leg_imus: shared.leg_imus.clone(),
    };

    for handler in lock(&shared.handlers).iter() {
        handler(&frame);
    }
}

/// IMU reading of a leg's base module on a level, stationary body.
fn level_imu(mount_angle_rad: f64) -> ImuFbk {
    let orientation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), mount_angle_rad);

    // Gravity is along the module's Z axis since the mounting only rotates about Z
    let accel = orientation.inverse() * Vector3::new(0.0, 0.0, STANDARD_GRAVITY_MSS);

    ImuFbk {
        orientation_wxyz: Some([orientation.w, orientation.i, orientation.j, orientation.k]),
        accel_mss: Some([accel.x, accel.y, accel.z]),
        gyro_rads: Some([0.0; 3]),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_echoes_commanded_positions() {
        let mut transport = SimTransport::start(&[30.0, -30.0], 1.0);
        assert_eq!(transport.num_joints(), 6);

        let received = Arc::new(Mutex::new(Vec::new()));
        {
            let received = received.clone();
            transport.add_feedback_handler(Box::new(move |f: &FeedbackFrame| {
                received.lock().unwrap().push(f.clone());
            }));
        }

        // Nothing commanded yet
        transport.publish_feedback(0.0);

        let mut frame = CommandFrame::new(2);
        frame.set_leg(1, Some([0.1, 0.2, 0.3]), None, None);
        transport.send_command(&frame).unwrap();
        transport.publish_feedback(0.1);

        let received = received.lock().unwrap();
        let first = received.iter().find(|f| f.timestamp_s == 0.0).unwrap();
        assert!(first.joint_positions_rad.iter().all(|p| p.is_none()));

        let second = received.iter().find(|f| f.timestamp_s == 0.1).unwrap();
        assert_eq!(second.leg_positions_rad(1), [0.1, 0.2, 0.3]);
        assert!(second.leg_positions_rad(0).iter().all(|p| p.is_nan()));
    }

    #[test]
    fn test_rejects_wrong_frame_size() {
        let mut transport = SimTransport::start(&[0.0], 1.0);

        match transport.send_command(&CommandFrame::new(2)) {
            Err(TransportError::FrameSizeMismatch { expected: 3, found: 6 }) => (),
            r => panic!("Expected size mismatch, got {:?}", r),
        }
    }

    #[test]
    fn test_level_imu() {
        let imu = level_imu(90f64.to_radians());
        let accel = imu.accel_mss.unwrap();

        assert!(accel[0].abs() < 1e-12);
        assert!(accel[1].abs() < 1e-12);
        assert!((accel[2] - STANDARD_GRAVITY_MSS).abs() < 1e-12);
    }
}
