//! Dynamic walk on two virtual legs
//!
//! The walking legs are paired diagonally into two virtual legs. Each gait cycle one virtual leg
//! swings forward while the other stays in stance and returns to the home stance, then the roles
//! swap. The remaining legs are held up for manipulation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::CommandFrame;
use log::{info, warn};
use nalgebra::{DMatrix, DVector, Vector3};
use serde::Serialize;

use super::{GaitCtrl, GaitCtrlError};
use crate::{
    leg::{JointVector, NUM_JOINTS},
    traj_gen::{TrajSample, Trajectory},
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which virtual leg swings during a gait cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwingMode {
    VirtualLeg1,
    VirtualLeg2,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectories for one gait cycle.
#[derive(Debug, Clone)]
pub struct WalkPlan {
    pub swing_mode: SwingMode,

    pub swing_legs: [usize; 2],
    pub stance_legs: [usize; 2],

    /// Trajectory of each swing leg, in the same order as `swing_legs`.
    pub swing_trajs: Vec<Trajectory>,

    /// Trajectory of each stance leg, in the same order as `stance_legs`.
    pub stance_trajs: Vec<Trajectory>,

    /// Units: seconds
    pub duration_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwingMode {
    /// Swing mode of the given gait cycle, alternating starting with the first virtual leg.
    pub fn for_cycle(cycle: u64) -> Self {
        if cycle % 2 == 0 {
            SwingMode::VirtualLeg1
        } else {
            SwingMode::VirtualLeg2
        }
    }

    /// The `(swing, stance)` leg groups for this mode.
    pub fn groups(&self, virtual_legs: &[[usize; 2]; 2]) -> ([usize; 2], [usize; 2]) {
        match self {
            SwingMode::VirtualLeg1 => (virtual_legs[0], virtual_legs[1]),
            SwingMode::VirtualLeg2 => (virtual_legs[1], virtual_legs[0]),
        }
    }
}

impl GaitCtrl {
    /// Plan one gait cycle.
    ///
    /// # Inputs
    /// - `swing_mode`: Which virtual leg swings.
    /// - `stance_start`: Joint positions the stance legs start from, in stance leg order.
    /// - `translation_cmd`: Demanded body velocity, only the horizontal part is used.
    ///
    /// The plan depends only on its inputs and the parameters.
    pub fn plan_dynamic_gait(
        &self,
        swing_mode: SwingMode,
        stance_start: &[JointVector; 2],
        translation_cmd: &Vector3<f64>,
    ) -> Result<WalkPlan, GaitCtrlError> {
        let (swing_legs, stance_legs) = swing_mode.groups(&self.params.virtual_legs);

        let duration_s = self.params.gait_cycle_s;
        let home = self.params.home_stance();
        let step = self.step(translation_cmd);
        let apex = Vector3::from(self.params.swing_apex_m);
        let stance_mid_offset = Vector3::from(self.params.stance_mid_offset_m);

        let mut swing_trajs = Vec::with_capacity(2);
        for &i in swing_legs.iter() {
            let leg = &self.legs[i];

            let start = leg.inverse_kinematics(&leg.nominal_point(&home))?;
            let start_xyz = leg.foot_position(&start);
            let mid = leg.inverse_kinematics(&(start_xyz + step * 0.5 + apex))?;
            let end = leg.inverse_kinematics(&(start_xyz + step))?;

            swing_trajs.push(build_cycle_traj(i, [start, mid, end], duration_s)?);
        }

        let mut stance_trajs = Vec::with_capacity(2);
        for (&i, start) in stance_legs.iter().zip(stance_start.iter()) {
            let leg = &self.legs[i];

            let home_xyz = leg.nominal_point(&home);
            let start_xyz = leg.foot_position(start);
            let mid = leg.inverse_kinematics(&(start_xyz * 0.5 + home_xyz * 0.5 + stance_mid_offset))?;
            let end = leg.inverse_kinematics(&home_xyz)?;

            stance_trajs.push(build_cycle_traj(i, [*start, mid, end], duration_s)?);
        }

        Ok(WalkPlan {
            swing_mode,
            swing_legs,
            stance_legs,
            swing_trajs,
            stance_trajs,
            duration_s,
        })
    }

    /// Plan the next gait cycle from the current leg positions.
    ///
    /// If planning fails the previous plan is kept, and only if there is none is the error
    /// returned.
    pub(super) fn replan_walk(&mut self, translation_cmd: &Vector3<f64>) -> Result<(), GaitCtrlError> {
        let swing_mode = SwingMode::for_cycle(self.num_walk_plans);
        self.num_walk_plans += 1;

        let (_, stance_legs) = swing_mode.groups(&self.params.virtual_legs);

        let planned = self
            .stance_start_angles(&stance_legs)
            .and_then(|start| self.plan_dynamic_gait(swing_mode, &start, translation_cmd));

        match planned {
            Ok(plan) => {
                info!(
                    "Walk cycle {} planned, swinging legs {:?}",
                    self.num_walk_plans, plan.swing_legs
                );
                self.walk_plan = Some(plan);
                Ok(())
            }
            Err(e) if self.walk_plan.is_some() => {
                warn!("Walk planning failed, keeping the previous plan: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Follow the active walk plan.
    pub(super) fn follow_dynamic_gait(&mut self, t_s: f64) -> Result<CommandFrame, GaitCtrlError> {
        let weight_n = self.params.weight_n();

        // (leg, sample, foot force fraction)
        let samples: Vec<(usize, TrajSample, f64)> = match self.walk_plan {
            Some(ref plan) => {
                let swing = plan
                    .swing_legs
                    .iter()
                    .zip(plan.swing_trajs.iter())
                    .map(|(&i, t)| (i, t.sample(t_s), self.params.swing_foot_force_frac));
                let stance = plan
                    .stance_legs
                    .iter()
                    .zip(plan.stance_trajs.iter())
                    .map(|(&i, t)| (i, t.sample(t_s), self.params.stance_foot_force_frac));
                swing.chain(stance).collect()
            }
            None => return Err(GaitCtrlError::NoWalkPlan),
        };

        let mut frame = CommandFrame::new(self.legs.len());

        self.hold_manip_legs(&mut frame);

        let gravity_vec = self.gravity_vector();
        let gravity_dir = self.estimator.gravity_direction();

        for (i, sample, force_frac) in samples {
            let pos = JointVector::from_iterator(sample.position.iter().cloned());
            let vel = JointVector::from_iterator(sample.velocity.iter().cloned());

            let foot_force = gravity_dir * (force_frac * weight_n);
            let torques = self.legs[i].compensating_torques(&pos, &vel, &gravity_vec, &foot_force);

            self.command_leg(&mut frame, i, Some(pos), None, Some(torques));
        }

        Ok(frame)
    }

    /// Joint positions the stance legs start the next cycle from.
    fn stance_start_angles(&self, stance_legs: &[usize; 2]) -> Result<[JointVector; 2], GaitCtrlError> {
        let home = self.params.home_stance();
        let mut stance_start = [JointVector::zeros(); 2];

        for (start, &i) in stance_start.iter_mut().zip(stance_legs.iter()) {
            let leg = &self.legs[i];
            let fallback = leg.inverse_kinematics(&leg.nominal_point(&home))?;
            *start = self.start_angles(i, &fallback);
        }

        Ok(stance_start)
    }

    /// Hold the manipulation legs at their fixed pose.
    fn hold_manip_legs(&mut self, frame: &mut CommandFrame) {
        let hold = Vector3::from(self.params.manip_hold_m);
        let offset = Vector3::from(self.params.manip_hold_offset_m);

        for i in self.params.manip_legs.clone() {
            let leg = self.legs[i].clone();

            match leg.inverse_kinematics(&(leg.nominal_point(&hold) + offset)) {
                Ok(q) => self.command_leg(frame, i, Some(q), None, None),
                Err(e) => self.ik_failed(e),
            }
        }
    }

    /// Horizontal foot displacement over one cycle, limited to the maximum step length.
    fn step(&self, translation_cmd: &Vector3<f64>) -> Vector3<f64> {
        let step = Vector3::new(translation_cmd.x, translation_cmd.y, 0.0) * self.params.gait_cycle_s;
        let length = step.norm();

        if length > self.params.max_step_m {
            step * (self.params.max_step_m / length)
        } else {
            step
        }
    }
}

/// Build a three waypoint trajectory starting and ending at rest.
fn build_cycle_traj(
    leg: usize,
    points: [JointVector; 3],
    duration_s: f64,
) -> Result<Trajectory, GaitCtrlError> {
    let rest = Some(DVector::zeros(NUM_JOINTS));
    let constraints = vec![rest.clone(), None, rest];

    Trajectory::build(
        &[0.0, 0.5 * duration_s, duration_s],
        &DMatrix::from_fn(NUM_JOINTS, 3, |r, c| points[c][r]),
        &constraints,
        &constraints,
    )
    .map_err(|source| GaitCtrlError::TrajError { leg, source })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
