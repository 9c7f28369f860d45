//! # Arm library.
//!
//! This library allows other crates in the workspace, and the arm executable's tests and
//! benchmarks, to access items defined inside the arm crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Arm control module - drives the end effector toward its target by inverse kinematics
pub mod arm_ctrl;

/// Global data store for the executable
pub mod data_store;

/// Simulated joint drives - turns joint demands into measured angles
pub mod drive;

/// Gripper - jaw aperture mapping and pinch control
pub mod gripper;

/// Kinematics - forward kinematics of the arm's chain
pub mod kinematics;

/// Executable parameters
pub mod params;

/// Pose sources - where the end effector target comes from
pub mod pose_source;

/// Telemetry server - serves arm snapshots to network peers
pub mod tm_server;
