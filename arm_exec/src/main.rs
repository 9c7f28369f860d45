//! Main arm-side executable entry point.
//! 
//! # Architecture
//! 
//! The general execution methodology consists of:
//! 
//!     - Initialise all modules
//!     - Main loop:
//!         - Measured joint angles from the drives
//!         - Target acquisition from the active pose source
//!         - Arm control processing
//!         - Gripper processing
//!         - Drive demands
//!         - Telemetry
//! 
//! # Modules
//! 
//! All modules (e.g. `arm_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!     

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use arm_lib::{
    arm_ctrl::InitData,
    data_store::DataStore,
    drive::SimDrive,
    gripper::{GripperParams, GripperWidthMapper, PinchGripper},
    kinematics::Pose,
    params::{ArmExecParams, TargetSource},
    pose_source::{ManualTarget, PoseSource, SimHand},
    tm_server::TmServer,
};
use comms_if::net::NetParams;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use structopt::StructOpt;

// Internal
use util::{
    host,
    module::State,
    logger::logger_init,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of consecutive cycle overruns after which a warning is repeated only on the 1Hz cycle.
const OVERRUN_WARN_LIMIT: u64 = 50;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Arm executable
#[derive(Debug, StructOpt)]
#[structopt(name = "arm_exec")]
struct Opts {
    /// Directory, relative to the software root, in which to create the session
    #[structopt(long, default_value = "sessions")]
    sessions_dir: String,

    /// Stop after this many cycles, runs forever if not given
    #[structopt(long)]
    cycles: Option<u128>,
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
    let session = Session::new(
        "arm_exec", 
        &opts.sessions_dir
    ).wrap_err("Failed to create the session")?;

    // The exec parameters hold the logging configuration, so are loaded before the logger
    let exec_params: ArmExecParams = util::params::load(
        "arm_exec.toml"
    ).wrap_err("Could not load exec params")?;

    if !(exec_params.cycle_period_s > 0.0) || !exec_params.cycle_period_s.is_finite() {
        return Err(eyre!(
            "Cycle period must be positive, found {}", exec_params.cycle_period_s
        ));
    }

    // Initialise logger
    logger_init(&exec_params.log, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Arm Executable\n");
    info!(
        "Software root: {:?}", 
        host::get_arm_sw_root().wrap_err("Failed to get the software root")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams = util::params::load(
        "net.toml"
    ).wrap_err("Could not load net params")?;

    let gripper_params: GripperParams = util::params::load(
        "gripper.toml"
    ).wrap_err("Could not load gripper params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.arm_ctrl.init(
        InitData {
            params_file: "arm_ctrl.toml",
            initial_deg: exec_params.initial_joint_deg,
        },
        &session
    ).wrap_err("Failed to initialise ArmCtrl")?;
    info!("ArmCtrl init complete");

    ds.manual_target = ManualTarget::new(Pose::from_position_rpy(
        exec_params.target_position_m,
        exec_params.target_rpy_deg
    ));
    info!(
        "Manual target at {:?} m, {:?} deg", 
        exec_params.target_position_m, 
        exec_params.target_rpy_deg
    );

    let sim_hand = match exec_params.target_source {
        TargetSource::Manual => None,
        TargetSource::SimHand { radius_m, period_s } => {
            info!(
                "Following a simulated hand, radius {} m, period {} s", 
                radius_m, 
                period_s
            );
            Some(SimHand::new(
                ds.manual_target.pose, 
                radius_m, 
                period_s,
                (gripper_params.pinch_close_m, gripper_params.pinch_open_m)
            ))
        }
    };
    ds.use_hand_tracking = sim_hand.is_some();

    ds.gripper_mapper = Some(GripperWidthMapper::new(&gripper_params));
    ds.gripper = Some(PinchGripper::new(gripper_params));
    ds.update_jaw_aperture();
    info!("Gripper init complete");

    let mut drive = SimDrive::new(
        exec_params.drive_follow_rate_hz, 
        &ds.arm_ctrl.joints().cmd_deg()
    );
    ds.measured_deg = drive.measured_deg();

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let mut tm_server = {
        let s = TmServer::new(&net_params)
            .wrap_err("Failed to initialise TmServer")?;
        info!("TmServer listening on {}", s.local_addr());
        s
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let dt_s = exec_params.cycle_period_s;

    loop {

        if let Some(max) = opts.cycles {
            if ds.num_cycles >= max {
                info!("Requested number of cycles ({}) complete, stopping", max);
                break
            }
        }

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(exec_params.cycle_frequency_hz());

        // ---- DATA INPUT ----

        ds.measured_deg = drive.step(dt_s);

        if let Some(ref hand) = sim_hand {
            ds.hand_tracker.update(Some(hand.sample(ds.num_cycles as f64 * dt_s)));
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        let source: &dyn PoseSource = if ds.use_hand_tracking {
            &ds.hand_tracker
        } else {
            &ds.manual_target
        };

        match ds.arm_ctrl.advance(dt_s, source, Some(ds.measured_deg)) {
            Ok((o, r)) => {
                ds.arm_ctrl_output = o;
                ds.arm_ctrl_status_rpt = r;
            },
            Err(e) => {
                // The arm holds its last commanded pose
                warn!("Error during ArmCtrl processing: {}", e)
            }
        };

        // Gripper follows the pinch only while a hand is tracked
        let pinch = ds.hand_tracker.sample().map(|s| s.pinch_distance_m());
        if let Some(ref mut gripper) = ds.gripper {
            gripper.update(pinch, dt_s);
            gripper.drive(exec_params.drive_follow_rate_hz, dt_s);
        }
        ds.update_jaw_aperture();

        // Send demands to the drives
        drive.set_dems(&ds.arm_ctrl_output);

        // ---- TELEMETRY ----

        tm_server.send(&ds);

        if ds.is_1_hz_cycle {
            info!("{} telemetry peers connected", tm_server.num_peers());
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                ds.num_consec_cycle_overruns += 1;

                if ds.num_consec_cycle_overruns < OVERRUN_WARN_LIMIT || ds.is_1_hz_cycle {
                    warn!(
                        "Cycle overran by {:.06} s ({} consecutive)", 
                        cycle_dur.as_secs_f64() - cycle_period.as_secs_f64(),
                        ds.num_consec_cycle_overruns
                    );
                }
            }
        }

        ds.cycle_end();
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}
