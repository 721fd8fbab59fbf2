//! Main locomotion executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Connect to the input device and actuator transport
//!     - Register the feedback handler with the transport
//!     - Main loop, at a fixed period:
//!         - Input device polling
//!         - Gait control processing
//!         - Command frame transmission

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::info;
use structopt::StructOpt;

// Internal
use comms_if::{eqpt::ActuatorTransport, input::InputDevice};
use loco_lib::{
    gait_ctrl::{GaitCtrl, GaitVariant, Params},
    params::LocoExecParams,
    rt_loop::RtLoop,
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Legged locomotion controller
#[derive(Debug, StructOpt)]
#[structopt(name = "loco_exec")]
struct Opts {
    /// Executable parameter file, relative to the params directory.
    #[structopt(long, default_value = "loco_exec.toml")]
    exec_params: String,

    /// Gait control parameter file, relative to the params directory.
    #[structopt(long, default_value = "gait_ctrl.toml")]
    gait_params: String,

    /// Run the hexapod stand up instead of the gait in the parameter file.
    #[structopt(long)]
    hexapod: bool,

    /// Log every control cycle.
    #[structopt(long)]
    trace_loop: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("loco_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let hot_loop_level = if opts.trace_loop {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    logger_init(LevelFilter::Debug, hot_loop_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Legged Locomotion Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: LocoExecParams =
        util::params::load(&opts.exec_params).wrap_err("Could not load exec params")?;

    let mut gait_params: Params =
        util::params::load(&opts.gait_params).wrap_err("Could not load gait control params")?;

    if opts.hexapod {
        gait_params.variant = GaitVariant::Hexapod;
    }

    let period = exec_params
        .control_period()
        .ok_or_else(|| eyre!("Invalid control period: {} s", exec_params.control_period_s))?;

    session.save("params/loco_exec.json", exec_params.clone());
    session.save("params/gait_ctrl.json", gait_params.clone());

    info!("Parameters loaded, running the {:?} gait", gait_params.variant);

    // ---- INITIALISE MODULES ----

    let mount_angles_deg: Vec<f64> = gait_params
        .legs
        .iter()
        .map(|m| m.mount_angle_deg)
        .collect();

    let mut gait_ctrl = GaitCtrl::new(gait_params).wrap_err("Failed to create GaitCtrl")?;
    gait_ctrl
        .init(())
        .wrap_err("Failed to initialise GaitCtrl")?;
    info!("GaitCtrl init complete");

    // ---- INITIALISE EQUIPMENT ----

    let (mut input, mut transport) = connect(&exec_params, &mount_angles_deg)?;

    if !input.is_connected() {
        return Err(eyre!("Could not find the input device"));
    }
    info!("Input device connected");

    let expected_joints = gait_ctrl.legs().len() * comms_if::eqpt::NUM_JOINTS_PER_LEG;
    if transport.num_joints() != expected_joints {
        return Err(eyre!(
            "Actuator group has {} joints, expected {}",
            transport.num_joints(),
            expected_joints
        ));
    }

    transport.add_feedback_handler(gait_ctrl.fbk_handler().into_transport_handler());
    info!("Feedback handler registered");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut rt_loop = RtLoop::new(period);
    let report = rt_loop
        .run(&mut gait_ctrl, input.as_mut(), transport.as_mut())
        .wrap_err("Control loop failed")?;

    info!(
        "Control loop stopped after {} cycles ({} overruns, {} send errors)",
        report.num_cycles, report.num_overruns, report.num_send_errors
    );

    session.save("loop_report.json", report);

    // Stop the transport before closing the session
    drop(transport);

    info!("End of execution");
    session.exit();

    Ok(())
}

/// Connect to the input device and actuator transport.
#[cfg(feature = "sim")]
fn connect(
    exec_params: &LocoExecParams,
    mount_angles_deg: &[f64],
) -> Result<(Box<dyn InputDevice>, Box<dyn ActuatorTransport>), Report> {
    use loco_lib::sim::{SimInput, SimTransport};

    let run_duration = exec_params.sim_run_duration().ok_or_else(|| {
        eyre!(
            "Invalid simulated run duration: {} s",
            exec_params.sim_run_duration_s
        )
    })?;

    info!("Using the simulated input device and transport");

    let input = SimInput::new(exec_params.sim_forward_speed_ms, run_duration);
    let transport = SimTransport::start(mount_angles_deg, exec_params.sim_fbk_rate_hz);

    Ok((Box::new(input), Box::new(transport)))
}

/// Connect to the input device and actuator transport.
#[cfg(not(feature = "sim"))]
fn connect(
    _exec_params: &LocoExecParams,
    _mount_angles_deg: &[f64],
) -> Result<(Box<dyn InputDevice>, Box<dyn ActuatorTransport>), Report> {
    Err(eyre!(
        "No actuator transport is available, build with the `sim` feature"
    ))
}
