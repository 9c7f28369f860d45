//! Arm control module
//!
//! Drives the end effector toward a target pose by solving inverse kinematics
//! every tick. Each tick runs up to `max_iterations` passes of:
//!
//! 1. pose error and Jacobian at the commanded joint angles,
//! 2. a damped least-squares solve for joint velocities,
//! 3. integration of those velocities into rate and range limited commands,
//!
//! stopping early once the end effector is within tolerance of the target.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod dls;
mod integrator;
pub mod jacobian;
mod joints;
mod params;
pub mod pose_error;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use joints::*;
pub use params::*;
pub use state::*;

pub use comms_if::tm::NUM_JOINTS;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ArmCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum ArmCtrlError {
    #[error("Invalid ArmCtrl parameters: {0}")]
    InvalidParams(String),

    #[error("Could not load the ArmCtrl parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Could not build the arm's chain: {0}")]
    ChainError(crate::kinematics::ChainParamsError),

    #[error("Invalid tick period {0} s, must be positive and finite")]
    InvalidTickPeriod(f64),
}
