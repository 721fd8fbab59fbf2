//! Implementations for the GaitCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::{sync::Arc, time::Duration};

use comms_if::eqpt::CommandFrame;
use log::{debug, error, info, trace, warn};
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use super::{GaitCtrlError, GaitState, Params, StateDurations, WalkPlan};
use crate::{
    fbk::FbkHandler,
    force_alloc::StanceForceAllocator,
    leg::{JointVector, LegError, LegModel},
    orient_est::OrientationEstimator,
    traj_gen::Trajectory,
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gait control module state
pub struct GaitCtrl {
    pub(super) params: Params,

    durations: StateDurations,

    pub(super) legs: Vec<Arc<LegModel>>,

    pub(super) estimator: Arc<OrientationEstimator>,

    /// Splits the body weight over every leg at the home stance.
    pub(super) allocator: StanceForceAllocator,

    state: GaitState,

    /// Controller clock, the sum of every cycle's measured time step.
    clock: Duration,

    /// Value of the clock when the active state was last entered.
    state_entry: Duration,

    /// Stand up trajectory of each leg.
    pub(super) stand_up_plan: Option<Vec<Trajectory>>,

    pub(super) walk_plan: Option<WalkPlan>,

    /// Number of walk plans made, also selects which virtual leg swings next.
    pub(super) num_walk_plans: u64,

    /// Last joint positions commanded to each leg.
    pub(super) last_cmd_positions: Vec<Option<JointVector>>,

    pub(super) report: StatusReport,
}

/// Input data to gait control.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// Measured time since the previous cycle.
    pub dt: Duration,

    /// Demanded body translation velocity.
    ///
    /// Units: meters/second,
    /// Frame: Body
    pub translation_velocity_cmd: Vector3<f64>,

    /// Demanded body rotation velocity.
    ///
    /// Units: radians/second,
    /// Frame: Body
    pub rotation_velocity_cmd: Vector3<f64>,
}

/// Status report for GaitCtrl processing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub state: GaitState,

    /// Units: seconds
    pub time_in_state_s: f64,

    pub num_walk_plans: u64,

    /// Number of legs whose inverse kinematics failed this cycle.
    pub num_ik_failures: usize,

    pub gravity_direction: [f64; 3],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitCtrl {
    /// Create a new controller from the given parameters.
    ///
    /// The controller starts in the initial state of its gait variant.
    pub fn new(params: Params) -> Result<Self, GaitCtrlError> {
        let durations = params.validate()?;

        let legs: Vec<Arc<LegModel>> = params
            .legs
            .iter()
            .enumerate()
            .map(|(i, mount)| Arc::new(LegModel::new(i, mount, &params.leg)))
            .collect();

        let estimator = Arc::new(OrientationEstimator::new(
            legs.iter().map(|l| *l.base_rotation()).collect(),
            params.madgwick_beta,
        ));

        let home = params.home_stance();
        let allocator =
            StanceForceAllocator::new(legs.iter().map(|l| l.nominal_point(&home)).collect());

        let state = GaitState::initial(params.variant);
        let num_legs = legs.len();

        Ok(Self {
            params,
            durations,
            legs,
            estimator,
            allocator,
            state,
            clock: Duration::default(),
            state_entry: Duration::default(),
            stand_up_plan: None,
            walk_plan: None,
            num_walk_plans: 0,
            last_cmd_positions: vec![None; num_legs],
            report: StatusReport {
                state,
                time_in_state_s: 0.0,
                num_walk_plans: 0,
                num_ik_failures: 0,
                gravity_direction: [0.0; 3],
            },
        })
    }

    pub fn state(&self) -> GaitState {
        self.state
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn legs(&self) -> &[Arc<LegModel>] {
        &self.legs
    }

    pub fn estimator(&self) -> &Arc<OrientationEstimator> {
        &self.estimator
    }

    pub fn walk_plan(&self) -> Option<&WalkPlan> {
        self.walk_plan.as_ref()
    }

    /// Create a feedback handler which updates this controller's legs and orientation estimate.
    pub fn fbk_handler(&self) -> FbkHandler {
        FbkHandler::new(self.legs.clone(), self.estimator.clone())
    }

    fn time_in_state(&self) -> Duration {
        self.clock
            .checked_sub(self.state_entry)
            .unwrap_or_default()
    }

    /// Enter the given state, running its entry actions.
    ///
    /// If an entry action fails the controller freezes.
    fn enter(&mut self, next: GaitState, input: &InputData) {
        let prev = self.state;

        if next != prev {
            info!(
                "GaitCtrl {:?} -> {:?} after {:.3} s",
                prev,
                next,
                self.time_in_state().as_secs_f64()
            );
        } else {
            debug!("GaitCtrl re-entering {:?}", next);
        }

        self.state = next;
        self.state_entry = self.clock;

        let result = match next {
            GaitState::StandUpPhase2 => self.plan_stand_up(self.params.startup_s),
            GaitState::DynamicWalk => {
                if prev != GaitState::DynamicWalk {
                    info!("Starting body orientation filter");
                    self.estimator.start_filter();
                }
                self.replan_walk(&input.translation_velocity_cmd)
            }
            GaitState::Frozen => {
                warn!("GaitCtrl frozen, holding measured joint positions");
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            error!("Could not enter {:?}: {}", next, e);
            self.enter(GaitState::Frozen, input);
        }
    }

    /// Run the handler of the active state.
    fn run_state(&mut self, t_s: f64) -> Result<CommandFrame, GaitCtrlError> {
        match self.state {
            GaitState::StandUpPhase1 => Ok(self.spread_all_legs()),
            GaitState::StandUpPhase2 | GaitState::StandUp => self.exec_stand_up(t_s),
            GaitState::StandUpPlan => {
                self.plan_stand_up(self.params.hexapod_startup_s)?;
                Ok(CommandFrame::new(self.legs.len()))
            }
            GaitState::NormalRun => self.exec_stand_up(std::f64::INFINITY),
            GaitState::DynamicWalk => self.follow_dynamic_gait(t_s),
            GaitState::Frozen => Ok(self.freeze()),
        }
    }

    /// Hold every joint at its latest measured position.
    pub(super) fn freeze(&self) -> CommandFrame {
        let mut frame = CommandFrame::new(self.legs.len());

        for (i, leg) in self.legs.iter().enumerate() {
            let angles = leg.joint_angles();

            for (cmd, angle) in frame.leg_mut(i).iter_mut().zip(angles.iter()) {
                cmd.position_rad = if angle.is_finite() { Some(*angle) } else { None };
                cmd.velocity_rads = Some(0.0);
            }
        }

        frame
    }

    /// Joint positions to start a trajectory from.
    ///
    /// Uses the measured angles if they are all known, then the last commanded angles, then
    /// `fallback`.
    pub(super) fn start_angles(&self, leg_idx: usize, fallback: &JointVector) -> JointVector {
        let measured = self.legs[leg_idx].joint_angles();

        if measured.iter().all(|a| a.is_finite()) {
            measured
        } else if let Some(last) = self.last_cmd_positions[leg_idx] {
            debug!("No feedback for leg {}, starting from last command", leg_idx);
            last
        } else {
            debug!("No feedback or command for leg {}, using fallback", leg_idx);
            *fallback
        }
    }

    /// Set one leg's commands in the frame, remembering the commanded position.
    pub(super) fn command_leg(
        &mut self,
        frame: &mut CommandFrame,
        leg_idx: usize,
        positions: Option<JointVector>,
        velocities: Option<JointVector>,
        torques: Option<JointVector>,
    ) {
        if positions.is_some() {
            self.last_cmd_positions[leg_idx] = positions;
        }

        frame.set_leg(
            leg_idx,
            positions.map(|p| p.into()),
            velocities.map(|v| v.into()),
            torques.map(|t| t.into()),
        );
    }

    /// Record a per-cycle inverse kinematics failure.
    pub(super) fn ik_failed(&mut self, err: LegError) {
        warn!("{}", err);
        self.report.num_ik_failures += 1;
    }

    /// Current gravity vector in the body frame.
    ///
    /// Units: meters/second^2
    pub(super) fn gravity_vector(&self) -> Vector3<f64> {
        self.estimator.gravity_direction() * self.params.gravity_mss
    }
}

impl State for GaitCtrl {
    type InitData = ();
    type InitError = GaitCtrlError;

    type InputData = InputData;
    type OutputData = CommandFrame;
    type StatusReport = StatusReport;
    type ProcError = GaitCtrlError;

    /// Restart the controller from the initial state of its gait variant, dropping any plans.
    fn init(&mut self, _: Self::InitData) -> Result<(), Self::InitError> {
        self.state = GaitState::initial(self.params.variant);
        self.clock = Duration::default();
        self.state_entry = Duration::default();
        self.stand_up_plan = None;
        self.walk_plan = None;
        self.num_walk_plans = 0;
        self.last_cmd_positions = vec![None; self.legs.len()];

        info!("GaitCtrl initialised in {:?}", self.state);

        Ok(())
    }

    /// Perform cyclic processing of gait control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.report.num_ik_failures = 0;
        self.clock += input_data.dt;

        let plan_ready = self.stand_up_plan.is_some();
        if let Some(next) = self
            .state
            .transition(self.time_in_state(), &self.durations, plan_ready)
        {
            self.enter(next, input_data);
        }

        let t_s = self.time_in_state().as_secs_f64();

        let frame = match self.run_state(t_s) {
            Ok(f) => f,
            Err(e) => {
                error!("GaitCtrl error in {:?}: {}", self.state, e);
                self.enter(GaitState::Frozen, input_data);
                self.freeze()
            }
        };

        self.report.state = self.state;
        self.report.time_in_state_s = self.time_in_state().as_secs_f64();
        self.report.num_walk_plans = self.num_walk_plans;
        self.report.gravity_direction = self.estimator.gravity_direction().into();

        trace!("GaitCtrl output: {:?}", frame);

        Ok((frame, self.report))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
