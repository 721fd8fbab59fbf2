//! Minimum jerk multi-segment polynomial trajectories

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use super::TrajError;
use util::maths::{falling_factorial, poly_deriv_val, poly_val};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of coefficients in each segment polynomial (quintic).
const NUM_COEFFS: usize = 6;

/// Lowest power which contributes to the jerk.
const FIRST_JERK_POWER: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A set of waypoints from which a trajectory can be built.
///
/// Each column of `positions` is one waypoint, each row one joint.
#[derive(Debug, Clone, Serialize)]
pub struct Waypoints {
    pub times_s: Vec<f64>,
    pub positions: DMatrix<f64>,
    pub velocities: Vec<Option<DVector<f64>>>,
    pub accelerations: Vec<Option<DVector<f64>>>,
}

/// A smooth trajectory for a number of joints.
#[derive(Debug, Clone)]
pub struct Trajectory {
    times_s: Vec<f64>,

    /// Ascending polynomial coefficients, indexed by joint then segment. Each segment is evaluated
    /// in time relative to its own start.
    coeffs: Vec<Vec<[f64; NUM_COEFFS]>>,

    /// Position of the final waypoint, returned as-is at and after the end time.
    end_position: DVector<f64>,
}

/// Position, velocity and acceleration of every joint at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajSample {
    pub position: DVector<f64>,
    pub velocity: DVector<f64>,
    pub acceleration: DVector<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoints {
    pub fn build(&self) -> Result<Trajectory, TrajError> {
        Trajectory::build(
            &self.times_s,
            &self.positions,
            &self.velocities,
            &self.accelerations,
        )
    }
}

impl Trajectory {
    /// Build a trajectory through the given waypoints.
    ///
    /// # Inputs
    /// - `times_s`: Strictly increasing time of each waypoint.
    /// - `positions`: Waypoint positions, one column per waypoint and one row per joint.
    /// - `velocities`: Velocity constraint at each waypoint, `None` leaves it free.
    /// - `accelerations`: Acceleration constraint at each waypoint, `None` leaves it free.
    ///
    /// Free interior waypoints keep the velocity and acceleration continuous across them.
    pub fn build(
        times_s: &[f64],
        positions: &DMatrix<f64>,
        velocities: &[Option<DVector<f64>>],
        accelerations: &[Option<DVector<f64>>],
    ) -> Result<Self, TrajError> {
        let num_points = times_s.len();
        let num_dims = positions.nrows();

        validate(times_s, positions, velocities, accelerations)?;

        let durations: Vec<f64> = times_s.windows(2).map(|w| w[1] - w[0]).collect();

        let mut coeffs = Vec::with_capacity(num_dims);

        for dim in 0..num_dims {
            let pos: Vec<f64> = (0..num_points).map(|i| positions[(dim, i)]).collect();
            let vel: Vec<Option<f64>> = velocities
                .iter()
                .map(|v| v.as_ref().map(|v| v[dim]))
                .collect();
            let acc: Vec<Option<f64>> = accelerations
                .iter()
                .map(|a| a.as_ref().map(|a| a[dim]))
                .collect();

            let mut segments =
                solve_dimension(&durations, &pos, &vel, &acc).ok_or(TrajError::SingularSystem(dim))?;

            // Pin the start of each segment to the waypoint exactly
            for (seg, p) in segments.iter_mut().zip(pos.iter()) {
                seg[0] = *p;
            }

            coeffs.push(segments);
        }

        Ok(Self {
            times_s: times_s.to_vec(),
            coeffs,
            end_position: positions.column(num_points - 1).into_owned(),
        })
    }

    pub fn num_dims(&self) -> usize {
        self.coeffs.len()
    }

    pub fn start_time_s(&self) -> f64 {
        self.times_s[0]
    }

    pub fn end_time_s(&self) -> f64 {
        self.times_s[self.times_s.len() - 1]
    }

    pub fn duration_s(&self) -> f64 {
        self.end_time_s() - self.start_time_s()
    }

    /// Sample the trajectory at time `t_s`. Times outside the trajectory are clamped to its ends.
    pub fn sample(&self, t_s: f64) -> TrajSample {
        let t_s = util::maths::clamp(t_s, self.start_time_s(), self.end_time_s());

        let num_segs = self.times_s.len() - 1;
        let seg = self.times_s[1..num_segs]
            .iter()
            .take_while(|&&t| t <= t_s)
            .count();
        let tau = t_s - self.times_s[seg];

        let num_dims = self.num_dims();
        let mut sample = TrajSample {
            position: DVector::zeros(num_dims),
            velocity: DVector::zeros(num_dims),
            acceleration: DVector::zeros(num_dims),
        };

        for (dim, segments) in self.coeffs.iter().enumerate() {
            let c = &segments[seg];
            sample.position[dim] = poly_val(tau, c);
            sample.velocity[dim] = poly_deriv_val(tau, c, 1);
            sample.acceleration[dim] = poly_deriv_val(tau, c, 2);
        }

        if t_s >= self.end_time_s() {
            sample.position.copy_from(&self.end_position);
        }

        sample
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn validate(
    times_s: &[f64],
    positions: &DMatrix<f64>,
    velocities: &[Option<DVector<f64>>],
    accelerations: &[Option<DVector<f64>>],
) -> Result<(), TrajError> {
    let num_points = times_s.len();
    let num_dims = positions.nrows();

    if num_points < 2 {
        return Err(TrajError::TooFewWaypoints(num_points));
    }

    for (i, w) in times_s.windows(2).enumerate() {
        if !w[0].is_finite() || !w[1].is_finite() || w[1] <= w[0] {
            return Err(TrajError::TimesNotIncreasing(i + 1));
        }
    }

    let check_len = |what, found| {
        if found != num_points {
            Err(TrajError::SizeMismatch {
                what,
                expected: num_points,
                found,
            })
        } else {
            Ok(())
        }
    };

    check_len("position waypoints", positions.ncols())?;
    check_len("velocity constraints", velocities.len())?;
    check_len("acceleration constraints", accelerations.len())?;

    for i in 0..num_points {
        if positions.column(i).iter().any(|p| !p.is_finite()) {
            return Err(TrajError::NonFiniteWaypoint {
                what: "position",
                waypoint: i,
            });
        }
    }

    for &(what, constraints) in [("velocity", velocities), ("acceleration", accelerations)].iter() {
        for (i, c) in constraints.iter().enumerate() {
            if let Some(c) = c {
                if c.len() != num_dims {
                    return Err(TrajError::SizeMismatch {
                        what,
                        expected: num_dims,
                        found: c.len(),
                    });
                }
                if c.iter().any(|v| !v.is_finite()) {
                    return Err(TrajError::NonFiniteWaypoint { what, waypoint: i });
                }
            }
        }
    }

    Ok(())
}

/// Solve for the segment coefficients of one joint.
///
/// The jerk cost is quadratic in the coefficients and every constraint is linear, so the optimum
/// is the solution of the KKT system
///
/// ```text
/// | 2H  A^T | |c|   |0|
/// | A   0   | |l| = |b|
/// ```
///
/// Returns `None` if the system is singular.
fn solve_dimension(
    durations: &[f64],
    pos: &[f64],
    vel: &[Option<f64>],
    acc: &[Option<f64>],
) -> Option<Vec<[f64; NUM_COEFFS]>> {
    let num_segs = durations.len();
    let num_points = pos.len();
    let num_vars = num_segs * NUM_COEFFS;

    // ---- CONSTRAINTS ----

    let mut rows: Vec<(Vec<(usize, f64)>, f64)> = Vec::new();

    for (seg, &dur) in durations.iter().enumerate() {
        let base = seg * NUM_COEFFS;

        rows.push((vec![(base, 1.0)], pos[seg]));
        rows.push((end_derivative_row(base, dur, 0), pos[seg + 1]));
    }

    // Continuity of velocity and acceleration at interior waypoints
    for point in 1..(num_points - 1) {
        let prev_base = (point - 1) * NUM_COEFFS;
        let next_base = point * NUM_COEFFS;

        for order in 1..=2 {
            let mut row = end_derivative_row(prev_base, durations[point - 1], order);
            row.push((next_base + order, -falling_factorial(order, order)));
            rows.push((row, 0.0));
        }
    }

    for (order, constraints) in [(1usize, vel), (2usize, acc)].iter() {
        for (point, c) in constraints.iter().enumerate() {
            if let Some(value) = c {
                let row = if point < num_segs {
                    vec![(point * NUM_COEFFS + order, falling_factorial(*order, *order))]
                } else {
                    end_derivative_row((num_segs - 1) * NUM_COEFFS, durations[num_segs - 1], *order)
                };
                rows.push((row, *value));
            }
        }
    }

    // ---- KKT SYSTEM ----

    let num_cons = rows.len();
    let size = num_vars + num_cons;

    let mut kkt = DMatrix::<f64>::zeros(size, size);
    let mut rhs = DVector::<f64>::zeros(size);

    for (seg, &dur) in durations.iter().enumerate() {
        let base = seg * NUM_COEFFS;
        for k in FIRST_JERK_POWER..NUM_COEFFS {
            for l in FIRST_JERK_POWER..NUM_COEFFS {
                kkt[(base + k, base + l)] = 2.0 * jerk_cost(k, l, dur);
            }
        }
    }

    for (i, (row, value)) in rows.iter().enumerate() {
        for &(col, coeff) in row.iter() {
            kkt[(num_vars + i, col)] = coeff;
            kkt[(col, num_vars + i)] = coeff;
        }
        rhs[num_vars + i] = *value;
    }

    let solution = kkt.lu().solve(&rhs)?;

    if solution.iter().any(|v| !v.is_finite()) {
        return None;
    }

    Some(
        (0..num_segs)
            .map(|seg| {
                let mut c = [0.0; NUM_COEFFS];
                for (k, c_k) in c.iter_mut().enumerate() {
                    *c_k = solution[seg * NUM_COEFFS + k];
                }
                c
            })
            .collect(),
    )
}

/// Constraint row for the `order`-th derivative at the end of a segment.
fn end_derivative_row(base: usize, duration: f64, order: usize) -> Vec<(usize, f64)> {
    (order..NUM_COEFFS)
        .map(|k| {
            (
                base + k,
                falling_factorial(k, order) * duration.powi((k - order) as i32),
            )
        })
        .collect()
}

/// Entry of the jerk cost Hessian for the `x^k` and `x^l` coefficients over a segment.
fn jerk_cost(k: usize, l: usize, duration: f64) -> f64 {
    let power = (k + l - 5) as i32;
    falling_factorial(k, 3) * falling_factorial(l, 3) * duration.powi(power) / power as f64
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
