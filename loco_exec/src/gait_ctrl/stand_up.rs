//! Stand up behaviours

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::CommandFrame;
use log::info;
use nalgebra::{DMatrix, DVector};

use super::{GaitCtrl, GaitCtrlError};
use crate::{
    leg::{JointVector, NUM_JOINTS},
    traj_gen::Waypoints,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fraction of the stand up duration at which each waypoint is reached.
const STAND_UP_TIME_FRACS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitCtrl {
    /// Command every leg to the spread stance.
    pub(super) fn spread_all_legs(&mut self) -> CommandFrame {
        let spread = self.params.spread_stance();
        let mut frame = CommandFrame::new(self.legs.len());

        for i in 0..self.legs.len() {
            let leg = self.legs[i].clone();

            match leg.inverse_kinematics(&leg.nominal_point(&spread)) {
                Ok(q) => self.command_leg(&mut frame, i, Some(q), None, None),
                Err(e) => self.ik_failed(e),
            }
        }

        frame
    }

    /// Plan the stand up trajectory of every leg.
    ///
    /// Each leg moves from its current position to the home stance, stepping through a raised
    /// waypoint either in the first or the second half of the motion. The plan is only installed
    /// if every leg's trajectory can be built.
    pub(super) fn plan_stand_up(&mut self, duration_s: f64) -> Result<(), GaitCtrlError> {
        let home = self.params.home_stance();
        let mid_offset = self.params.stand_up_mid_offset();

        let times_s: Vec<f64> = STAND_UP_TIME_FRACS.iter().map(|f| f * duration_s).collect();
        let rest = Some(DVector::zeros(NUM_JOINTS));
        let constraints = vec![rest.clone(), None, rest.clone(), None, rest];

        let mut plan = Vec::with_capacity(self.legs.len());
        let mut all_waypoints = Vec::with_capacity(self.legs.len());

        for (i, leg) in self.legs.iter().enumerate() {
            let end = leg.inverse_kinematics(&leg.nominal_point(&home))?;
            let start = self.start_angles(i, &end);
            let mid = end + leg.mirror(&mid_offset);

            let cols: [&JointVector; 5] = if self.params.stand_up_step_first_legs.contains(&i) {
                [&start, &mid, &end, &end, &end]
            } else {
                [&start, &start, &start, &mid, &end]
            };

            let waypoints = Waypoints {
                times_s: times_s.clone(),
                positions: DMatrix::from_fn(NUM_JOINTS, cols.len(), |r, c| cols[c][r]),
                velocities: constraints.clone(),
                accelerations: constraints.clone(),
            };

            let traj = waypoints
                .build()
                .map_err(|source| GaitCtrlError::TrajError { leg: i, source })?;

            plan.push(traj);
            all_waypoints.push(waypoints);
        }

        info!("Stand up planned over {:.2} s", duration_s);
        util::session::save_with_timestamp("gait_ctrl/stand_up_plan.json", all_waypoints);

        self.stand_up_plan = Some(plan);

        Ok(())
    }

    /// Follow the stand up trajectories with gravity compensation and ramped foot forces.
    ///
    /// Times past the end of the trajectories hold the final pose.
    pub(super) fn exec_stand_up(&mut self, t_s: f64) -> Result<CommandFrame, GaitCtrlError> {
        let gravity_vec = self.gravity_vector();
        let ramp = (t_s + self.params.force_ramp_offset).min(1.0);
        let foot_forces = self
            .allocator
            .compute(&self.estimator.gravity_direction(), self.params.weight_n());

        let samples = match self.stand_up_plan {
            Some(ref plan) => plan.iter().map(|t| t.sample(t_s)).collect::<Vec<_>>(),
            None => return Err(GaitCtrlError::NoStandUpPlan),
        };

        let mut frame = CommandFrame::new(self.legs.len());

        for (i, sample) in samples.into_iter().enumerate() {
            let pos = JointVector::from_iterator(sample.position.iter().cloned());
            let vel = JointVector::from_iterator(sample.velocity.iter().cloned());

            let torques = self.legs[i].compensating_torques(
                &pos,
                &vel,
                &gravity_vec,
                &(foot_forces[i] * ramp),
            );

            self.command_leg(&mut frame, i, Some(pos), Some(vel), Some(torques));
        }

        Ok(frame)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
