//! Real-time control loop
//!
//! Paces the gait controller at a fixed period. Each cycle the input device is polled, the
//! controller is run with the measured time since the previous cycle and the resulting frame is
//! sent to the actuators. Overruns are not caught up, the next cycle simply starts late.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use comms_if::{eqpt::ActuatorTransport, input::InputDevice};
use log::{debug, error, info, trace, warn};
use nalgebra::Vector3;
use serde::Serialize;

use crate::gait_ctrl::{GaitCtrl, InputData};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fixed period control loop.
pub struct RtLoop {
    period: Duration,

    keep_running: Arc<AtomicBool>,
}

/// Summary of a loop run.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct LoopReport {
    pub num_cycles: u64,

    /// Total number of cycles which started late.
    pub num_overruns: u64,

    /// Longest run of consecutive late cycles.
    pub max_consec_overruns: u64,

    pub num_send_errors: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RtLoopError {
    #[error("The input device is not connected")]
    InputNotConnected,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RtLoop {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            keep_running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Flag which keeps the loop running while set. Clearing it stops the loop at the end of the
    /// current cycle.
    pub fn keep_running(&self) -> Arc<AtomicBool> {
        self.keep_running.clone()
    }

    /// Run the loop until the keep running flag is cleared or quit is pressed on the input.
    pub fn run<I, T>(
        &mut self,
        gait_ctrl: &mut GaitCtrl,
        input: &mut I,
        transport: &mut T,
    ) -> Result<LoopReport, RtLoopError>
    where
        I: InputDevice + ?Sized,
        T: ActuatorTransport + ?Sized,
    {
        if !input.is_connected() {
            return Err(RtLoopError::InputNotConnected);
        }

        let mut report = LoopReport::default();
        let mut consec_overruns = 0u64;
        let mut prev = Instant::now();

        info!("Starting control loop at {:.1} Hz", 1.0 / self.period.as_secs_f64());

        while self.keep_running.load(Ordering::Acquire) {
            // ---- PACING ----

            let now = Instant::now();
            match overrun(prev, self.period, now) {
                Some(late) => {
                    consec_overruns += 1;
                    report.num_overruns += 1;
                    report.max_consec_overruns = report.max_consec_overruns.max(consec_overruns);
                    warn!("Cycle overran by {:.06} s", late.as_secs_f64());
                }
                None => consec_overruns = 0,
            }
            thread::sleep(sleep_duration(prev, self.period, now));

            let now = Instant::now();
            let dt = now.duration_since(prev);
            prev = now;

            // ---- INPUT ----

            input.update();

            if input.quit_button_pushed() {
                info!("Quit requested, stopping after this cycle");
                self.keep_running.store(false, Ordering::Release);
            }

            let input_data = InputData {
                dt,
                translation_velocity_cmd: Vector3::from(input.translation_velocity_cmd()),
                rotation_velocity_cmd: Vector3::from(input.rotation_velocity_cmd()),
            };

            // ---- CONTROL ----

            match gait_ctrl.proc(&input_data) {
                Ok((frame, status)) => {
                    trace!("GaitCtrl status: {:?}", status);

                    if let Err(e) = transport.send_command(&frame) {
                        report.num_send_errors += 1;
                        warn!("Could not send command frame: {}", e);
                    }
                }
                Err(e) => error!("GaitCtrl processing failed: {}", e),
            }

            report.num_cycles += 1;
        }

        debug!("Control loop stopped: {:?}", report);

        Ok(report)
    }
}

/// Time to sleep so the next cycle starts one period after `prev`. Never negative.
pub fn sleep_duration(prev: Instant, period: Duration, now: Instant) -> Duration {
    (prev + period)
        .checked_duration_since(now)
        .unwrap_or_default()
}

/// How late the cycle starting at `now` is, if at all.
pub fn overrun(prev: Instant, period: Duration, now: Instant) -> Option<Duration> {
    now.checked_duration_since(prev + period)
        .filter(|late| *late > Duration::default())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::gait_ctrl::Params;
    use comms_if::eqpt::{CommandFrame, FeedbackHandler, TransportError};

    /// Input which quits after a fixed number of updates.
    struct CountingInput {
        num_updates: usize,
        quit_after: usize,
    }

    impl InputDevice for CountingInput {
        fn is_connected(&self) -> bool {
            true
        }

        fn update(&mut self) {
            self.num_updates += 1;
        }

        fn translation_velocity_cmd(&self) -> [f64; 3] {
            [0.1, 0.0, 0.0]
        }

        fn rotation_velocity_cmd(&self) -> [f64; 3] {
            [0.0; 3]
        }

        fn quit_button_pushed(&self) -> bool {
            self.num_updates >= self.quit_after
        }
    }

    struct DisconnectedInput;

    impl InputDevice for DisconnectedInput {
        fn is_connected(&self) -> bool {
            false
        }
        fn update(&mut self) {}
        fn translation_velocity_cmd(&self) -> [f64; 3] {
            [0.0; 3]
        }
        fn rotation_velocity_cmd(&self) -> [f64; 3] {
            [0.0; 3]
        }
        fn quit_button_pushed(&self) -> bool {
            false
        }
    }

    /// Transport which records frames, failing every `fail_every`th send.
    #[derive(Default)]
    struct RecordingTransport {
        frames: Vec<CommandFrame>,
        fail_every: Option<usize>,
        num_sends: usize,
    }

    impl ActuatorTransport for RecordingTransport {
        fn num_joints(&self) -> usize {
            18
        }

        fn send_command(&mut self, frame: &CommandFrame) -> Result<(), TransportError> {
            self.num_sends += 1;
            if let Some(n) = self.fail_every {
                if self.num_sends % n == 0 {
                    return Err(TransportError::NotConnected);
                }
            }
            self.frames.push(frame.clone());
            Ok(())
        }

        fn add_feedback_handler(&mut self, _handler: FeedbackHandler) {}
    }

    #[test]
    fn test_sleep_duration() {
        let prev = Instant::now();
        let period = Duration::from_millis(5);

        assert_eq!(
            sleep_duration(prev, period, prev + Duration::from_millis(2)),
            Duration::from_millis(3)
        );
        assert_eq!(sleep_duration(prev, period, prev + period), Duration::default());
        assert_eq!(
            sleep_duration(prev, period, prev + Duration::from_millis(9)),
            Duration::default()
        );

        assert_eq!(overrun(prev, period, prev + Duration::from_millis(2)), None);
        assert_eq!(overrun(prev, period, prev + period), None);
        assert_eq!(
            overrun(prev, period, prev + Duration::from_millis(9)),
            Some(Duration::from_millis(4))
        );
    }

    #[test]
    fn test_quit_completes_cycle() {
        let mut ctrl = GaitCtrl::new(Params::default()).unwrap();
        let mut input = CountingInput {
            num_updates: 0,
            quit_after: 10,
        };
        let mut transport = RecordingTransport::default();

        let mut rt_loop = RtLoop::new(Duration::from_millis(1));
        let report = rt_loop.run(&mut ctrl, &mut input, &mut transport).unwrap();

        assert_eq!(report.num_cycles, 10);
        assert_eq!(transport.frames.len(), 10);
        assert!(!rt_loop.keep_running().load(Ordering::Acquire));

        for frame in transport.frames.iter() {
            assert_eq!(frame.num_legs(), 6);
        }
    }

    #[test]
    fn test_send_errors_do_not_stop_loop() {
        let mut ctrl = GaitCtrl::new(Params::default()).unwrap();
        let mut input = CountingInput {
            num_updates: 0,
            quit_after: 9,
        };
        let mut transport = RecordingTransport {
            fail_every: Some(3),
            ..Default::default()
        };

        let report = RtLoop::new(Duration::from_millis(1))
            .run(&mut ctrl, &mut input, &mut transport)
            .unwrap();

        assert_eq!(report.num_cycles, 9);
        assert_eq!(report.num_send_errors, 3);
        assert_eq!(transport.frames.len(), 6);
    }

    #[test]
    fn test_external_stop() {
        let mut ctrl = GaitCtrl::new(Params::default()).unwrap();
        let mut input = CountingInput {
            num_updates: 0,
            quit_after: usize::MAX,
        };
        let mut transport = RecordingTransport::default();

        let mut rt_loop = RtLoop::new(Duration::from_millis(1));
        rt_loop.keep_running().store(false, Ordering::Release);

        let report = rt_loop.run(&mut ctrl, &mut input, &mut transport).unwrap();
        assert_eq!(report.num_cycles, 0);
        assert!(transport.frames.is_empty());
    }

    #[test]
    fn test_disconnected_input() {
        let mut ctrl = GaitCtrl::new(Params::default()).unwrap();
        let mut transport = RecordingTransport::default();

        match RtLoop::new(Duration::from_millis(1)).run(&mut ctrl, &mut DisconnectedInput, &mut transport) {
            Err(RtLoopError::InputNotConnected) => (),
            r => panic!("Expected input error, got {:?}", r),
        }
    }
}
