//! # Data Store

use log::debug;

use crate::{
    arm_ctrl::{self, ArmDems, NUM_JOINTS},
    gripper::{GripperWidthMapper, PinchGripper},
    pose_source::{HandTracker, ManualTarget},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time at the start of the cycle
    pub session_time_s: f64,

    // Target sources
    pub manual_target: ManualTarget,
    pub hand_tracker: HandTracker,

    /// Use the hand tracker rather than the manual target, set from the exec's target source.
    pub use_hand_tracking: bool,

    // ArmCtrl
    pub arm_ctrl: arm_ctrl::ArmCtrl,
    pub arm_ctrl_output: ArmDems,
    pub arm_ctrl_status_rpt: arm_ctrl::StatusReport,

    /// Joint angles measured by the drives.
    ///
    /// Units: degrees
    pub measured_deg: [f64; NUM_JOINTS],

    // Gripper
    pub gripper: Option<PinchGripper>,
    pub gripper_mapper: Option<GripperWidthMapper>,

    /// Aperture currently reported by the gripper.
    pub jaw_aperture: i64,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears the items which are only valid for one cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        let cycles_per_s = (cycle_frequency_hz.round() as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_s == 0;

        self.arm_ctrl_status_rpt = arm_ctrl::StatusReport::default();

        self.session_time_s = util::session::try_get_elapsed_seconds().unwrap_or(0.0);
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        if self.is_1_hz_cycle {
            debug!(
                "Cycle {}: converged {}, {} iterations, err {:.4} m {:.3} deg",
                self.num_cycles,
                self.arm_ctrl_status_rpt.converged,
                self.arm_ctrl_status_rpt.iterations,
                self.arm_ctrl_status_rpt.pos_err_m,
                self.arm_ctrl_status_rpt.rot_err_deg
            );
        }

        self.num_cycles += 1;
    }

    /// Update the reported gripper aperture from the jaw states.
    pub fn update_jaw_aperture(&mut self) {
        if let (Some(gripper), Some(mapper)) = (&self.gripper, &self.gripper_mapper) {
            self.jaw_aperture = mapper.map(gripper.left(), gripper.right());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gripper::GripperParams;

    #[test]
    fn test_1_hz_cycle() {
        let mut ds = DataStore::default();

        let mut one_hz = Vec::new();
        for _ in 0..120 {
            ds.cycle_start(50.0);
            one_hz.push(ds.is_1_hz_cycle);
            ds.cycle_end();
        }

        assert_eq!(one_hz.iter().filter(|b| **b).count(), 3);
        assert!(one_hz[0] && one_hz[50] && one_hz[100]);
        assert_eq!(ds.num_cycles, 120);
    }

    #[test]
    fn test_jaw_aperture() {
        let mut ds = DataStore::default();
        ds.jaw_aperture = 7;

        // No gripper, aperture untouched
        ds.update_jaw_aperture();
        assert_eq!(ds.jaw_aperture, 7);

        let params = GripperParams::default();
        ds.gripper_mapper = Some(GripperWidthMapper::new(&params));
        ds.gripper = Some(PinchGripper::new(params));
        ds.update_jaw_aperture();
        assert_eq!(ds.jaw_aperture, 0);
    }
}
