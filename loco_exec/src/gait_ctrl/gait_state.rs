//! Gait state machine states and transition table

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The gait run by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaitVariant {
    /// Stand up in two phases, then walk on four legs while holding two legs up for manipulation.
    Quadruped,

    /// Stand up on all six legs and hold the pose.
    Hexapod,
}

/// States of the gait controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GaitState {
    /// Push every leg out to the spread stance with the body on the ground.
    StandUpPhase1,

    /// Lift the body along the stand up trajectories.
    StandUpPhase2,

    /// Walk using the two virtual legs.
    DynamicWalk,

    /// Plan the hexapod stand up.
    StandUpPlan,

    /// Lift the body on all six legs.
    StandUp,

    /// Hold the standing pose.
    NormalRun,

    /// Hold every joint where it is. Nothing leaves this state.
    Frozen,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Time limits used by the transition table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateDurations {
    pub startup: Duration,
    pub hexapod_startup: Duration,
    pub gait_cycle: Duration,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitState {
    pub fn initial(variant: GaitVariant) -> Self {
        match variant {
            GaitVariant::Quadruped => GaitState::StandUpPhase1,
            GaitVariant::Hexapod => GaitState::StandUpPlan,
        }
    }

    /// The state to enter next, if any.
    ///
    /// `plan_ready` is true once a stand up plan is available. Returning the current state means
    /// the state is re-entered, which restarts its clock.
    pub fn transition(
        self,
        time_in_state: Duration,
        durations: &StateDurations,
        plan_ready: bool,
    ) -> Option<GaitState> {
        use GaitState::*;

        match self {
            StandUpPhase1 if time_in_state >= durations.startup => Some(StandUpPhase2),
            StandUpPhase2 if time_in_state >= durations.startup => Some(DynamicWalk),
            DynamicWalk if time_in_state >= durations.gait_cycle => Some(DynamicWalk),
            StandUpPlan if plan_ready => Some(StandUp),
            StandUp if time_in_state >= durations.hexapod_startup => Some(NormalRun),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use GaitState::*;

    fn durations() -> StateDurations {
        StateDurations {
            startup: Duration::from_millis(1900),
            hexapod_startup: Duration::from_millis(4500),
            gait_cycle: Duration::from_millis(800),
        }
    }

    #[test]
    fn test_initial_states() {
        assert_eq!(GaitState::initial(GaitVariant::Quadruped), StandUpPhase1);
        assert_eq!(GaitState::initial(GaitVariant::Hexapod), StandUpPlan);
    }

    #[test]
    fn test_transition_table() {
        let d = durations();
        let before = Duration::from_millis(1895);
        let at = Duration::from_millis(1900);

        assert_eq!(StandUpPhase1.transition(before, &d, false), None);
        assert_eq!(StandUpPhase1.transition(at, &d, false), Some(StandUpPhase2));
        assert_eq!(StandUpPhase2.transition(before, &d, true), None);
        assert_eq!(StandUpPhase2.transition(at, &d, true), Some(DynamicWalk));

        assert_eq!(DynamicWalk.transition(Duration::from_millis(795), &d, false), None);
        assert_eq!(
            DynamicWalk.transition(Duration::from_millis(800), &d, false),
            Some(DynamicWalk)
        );

        assert_eq!(StandUpPlan.transition(Duration::from_secs(10), &d, false), None);
        assert_eq!(StandUpPlan.transition(Duration::from_secs(0), &d, true), Some(StandUp));
        assert_eq!(StandUp.transition(Duration::from_millis(4495), &d, true), None);
        assert_eq!(StandUp.transition(Duration::from_millis(4500), &d, true), Some(NormalRun));
    }

    #[test]
    fn test_terminal_states() {
        let d = durations();
        for &t in [Duration::from_secs(0), Duration::from_secs(1000)].iter() {
            assert_eq!(NormalRun.transition(t, &d, true), None);
            assert_eq!(Frozen.transition(t, &d, true), None);
        }
    }
}
