//! # Trajectory Generation Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use loco_lib::{
    gait_ctrl::{GaitCtrl, Params, SwingMode},
    leg::JointVector,
    traj_gen::Trajectory,
};
use nalgebra::{DMatrix, DVector, Vector3};

fn traj_gen_benchmark(c: &mut Criterion) {
    // ---- Five waypoint joint space trajectory, as used by the stand up ----

    let times_s = [0.0, 1.125, 2.25, 3.375, 4.5];
    let positions = DMatrix::from_row_slice(
        3,
        5,
        &[
            0.0, 0.0, 0.0, 0.0, 0.0, //
            0.3, 0.6, 0.3, 0.1, 0.1, //
            -1.2, -1.35, -1.5, -1.6, -1.6,
        ],
    );
    let rest = Some(DVector::zeros(3));
    let constraints = vec![rest.clone(), None, rest.clone(), None, rest];

    c.bench_function("Trajectory::build", |b| {
        b.iter(|| Trajectory::build(&times_s, &positions, &constraints, &constraints).unwrap())
    });

    let traj = Trajectory::build(&times_s, &positions, &constraints, &constraints).unwrap();

    c.bench_function("Trajectory::sample", |b| b.iter(|| traj.sample(2.0)));

    // ---- One dynamic walk cycle ----

    let ctrl = GaitCtrl::new(Params::default()).unwrap();
    let home = ctrl.params().home_stance();
    let (_, stance_legs) = SwingMode::VirtualLeg1.groups(&ctrl.params().virtual_legs);

    let stance_start: Vec<JointVector> = stance_legs
        .iter()
        .map(|&i| {
            let leg = &ctrl.legs()[i];
            leg.inverse_kinematics(&leg.nominal_point(&home)).unwrap()
        })
        .collect();
    let stance_start = [stance_start[0], stance_start[1]];
    let cmd = Vector3::new(0.125, 0.0, 0.0);

    c.bench_function("GaitCtrl::plan_dynamic_gait", |b| {
        b.iter(|| {
            ctrl.plan_dynamic_gait(SwingMode::VirtualLeg1, &stance_start, &cmd)
                .unwrap()
        })
    });
}

criterion_group!(benches, traj_gen_benchmark);
criterion_main!(benches);
