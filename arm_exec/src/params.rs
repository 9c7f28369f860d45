//! # Arm Executable Parameters
//!
//! This module provide parameters for the arm executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

use crate::arm_ctrl::NUM_JOINTS;
use util::logger::LogParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmExecParams {

    /// Target period of one cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Rate at which the simulated drives follow their demands.
    ///
    /// Units: 1/seconds
    pub drive_follow_rate_hz: f64,

    /// Joint angles of the arm at startup.
    ///
    /// Units: degrees
    pub initial_joint_deg: [f64; NUM_JOINTS],

    /// Position of the manual end-effector target.
    ///
    /// Units: meters
    pub target_position_m: [f64; 3],

    /// Attitude of the manual end-effector target as roll, pitch, yaw.
    ///
    /// Units: degrees
    pub target_rpy_deg: [f64; 3],

    /// Where the end-effector target comes from.
    pub target_source: TargetSource,

    /// Logging configuration
    pub log: LogParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Source of the end-effector target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetSource {
    /// The fixed manual target.
    Manual,

    /// A scripted hand circling the manual target, tracked as if by a hand-tracking device.
    SimHand {
        /// Units: meters
        radius_m: f64,

        /// Units: seconds
        period_s: f64,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ArmExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.02,
            drive_follow_rate_hz: 10.0,
            initial_joint_deg: [0.0; NUM_JOINTS],
            target_position_m: [0.3, 0.0, 0.3],
            target_rpy_deg: [0.0; 3],
            target_source: TargetSource::Manual,
            log: LogParams::default(),
        }
    }
}

impl ArmExecParams {
    /// Number of cycles per second.
    pub fn cycle_frequency_hz(&self) -> f64 {
        1.0 / self.cycle_period_s
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_file() {
        let p: ArmExecParams =
            util::params::from_str(include_str!("../../params/arm_exec.toml")).unwrap();

        assert!(p.cycle_period_s > 0.0);
        assert!((p.cycle_frequency_hz() - 50.0).abs() < 1e-9);
        assert_eq!(p.log.level, "info");
        assert_eq!(p.target_source, TargetSource::Manual);
    }

    #[test]
    fn test_target_source() {
        let p: ArmExecParams = util::params::from_str(
            "[target_source]\ntype = \"sim_hand\"\nradius_m = 0.05\nperiod_s = 8.0\n",
        )
        .unwrap();
        assert_eq!(
            p.target_source,
            TargetSource::SimHand {
                radius_m: 0.05,
                period_s: 8.0
            }
        );

        // Not given, the manual target is used
        let p: ArmExecParams = util::params::from_str("cycle_period_s = 0.01\n").unwrap();
        assert_eq!(p.target_source, TargetSource::Manual);
    }
}
