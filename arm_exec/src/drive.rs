//! Simulated joint drive
//!
//! Stands in for the arm's joint controllers, turning commanded angles into
//! measured angles with a first order lag.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;

use crate::arm_ctrl::{ArmDems, NUM_JOINTS};
use util::maths::exp_follow;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// First order model of the joint drives.
#[derive(Debug, Clone)]
pub struct SimDrive {
    /// Rate at which the measured angles follow their targets.
    ///
    /// Units: 1/seconds
    follow_rate_hz: f64,

    /// Units: degrees
    target_deg: [f64; NUM_JOINTS],

    /// Units: degrees
    measured_deg: [f64; NUM_JOINTS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDrive {
    /// Create a drive resting at the given angles.
    pub fn new(follow_rate_hz: f64, initial_deg: &[f64; NUM_JOINTS]) -> Self {
        Self {
            follow_rate_hz,
            target_deg: *initial_deg,
            measured_deg: *initial_deg,
        }
    }

    /// Set new joint targets. Non-finite demands are ignored and the previous
    /// target kept.
    pub fn set_dems(&mut self, dems: &ArmDems) {
        for (i, (t, d)) in self.target_deg.iter_mut().zip(dems.pos_deg.iter()).enumerate() {
            if d.is_finite() {
                *t = *d;
            } else {
                warn!("Demand for joint {} is not finite, keeping the previous target", i);
            }
        }
    }

    /// Advance the drives by `dt_s` and return the measured angles.
    pub fn step(&mut self, dt_s: f64) -> [f64; NUM_JOINTS] {
        for (m, t) in self.measured_deg.iter_mut().zip(self.target_deg.iter()) {
            *m = exp_follow(*m, *t, self.follow_rate_hz, dt_s);
        }

        self.measured_deg
    }

    pub fn measured_deg(&self) -> [f64; NUM_JOINTS] {
        self.measured_deg
    }
}
