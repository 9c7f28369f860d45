//! # Arm telemetry records
//!
//! A record is one snapshot of the arm, written as a single line of JSON with a fixed number of
//! decimal places per field:
//!
//! ```text
//! {"seq":12,"ts":3.141593,"target_deg":[0.0000,...],"current_deg":[0.0000,...],"piper_jaw":40040}
//! ```
//!
//! The record is formatted by hand rather than through `serde_json` so that the precision of the
//! angles is fixed. Parsing goes through `serde_json`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt::Write;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of revolute joints on the arm.
pub const NUM_JOINTS: usize = 6;

/// If every angle in a record is within this magnitude the values are assumed to be in radians.
const RAD_HEURISTIC_MAX_ABS: f64 = 3.2;

/// Millidegrees per radian.
const MDEG_PER_RAD: f64 = 57295.7795;

/// Millidegrees per degree.
const MDEG_PER_DEG: f64 = 1000.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One telemetry snapshot of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ArmTm {
    /// Tick sequence number, incremented once per tick.
    pub seq: u64,

    /// Seconds since the start of the session.
    #[serde(rename = "ts")]
    pub ts_s: f64,

    /// Commanded joint angles.
    ///
    /// Units: degrees
    pub target_deg: [f64; NUM_JOINTS],

    /// Measured joint angles.
    ///
    /// Units: degrees
    pub current_deg: [f64; NUM_JOINTS],

    /// Gripper aperture in actuator units.
    #[serde(rename = "piper_jaw")]
    pub jaw: i64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmParseError {
    #[error("Empty record")]
    Empty,

    #[error("Could not deserialize the record: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmTm {
    /// Replace any non-finite values in the record with zero.
    pub fn sanitised(mut self) -> Self {
        if !self.ts_s.is_finite() {
            self.ts_s = 0.0;
        }
        for a in self.target_deg.iter_mut().chain(self.current_deg.iter_mut()) {
            if !a.is_finite() {
                *a = 0.0;
            }
        }
        self
    }

    /// Format the record as a single line, without the trailing newline.
    ///
    /// Non-finite values are written as zero so the line is always valid JSON.
    pub fn to_record(&self) -> String {
        let tm = self.sanitised();

        let mut line = String::with_capacity(192);

        // Writing into a String cannot fail
        write!(line, "{{\"seq\":{},\"ts\":{:.6},", tm.seq, tm.ts_s).ok();
        line.push_str("\"target_deg\":");
        write_angles(&mut line, &tm.target_deg);
        line.push_str(",\"current_deg\":");
        write_angles(&mut line, &tm.current_deg);
        write!(line, ",\"piper_jaw\":{}}}", tm.jaw).ok();

        line
    }

    /// Parse a record line.
    pub fn from_record(line: &str) -> Result<Self, TmParseError> {
        let line = line.trim();

        if line.is_empty() {
            return Err(TmParseError::Empty);
        }

        serde_json::from_str(line).map_err(TmParseError::DeserializeError)
    }

    /// The target angles converted to integer millidegrees.
    ///
    /// If all angles are small enough to be radians they are treated as radians, otherwise as
    /// degrees.
    pub fn target_mdeg(&self) -> [i64; NUM_JOINTS] {
        let max_abs = self.target_deg.iter().fold(0.0f64, |m, a| m.max(a.abs()));

        let factor = if max_abs <= RAD_HEURISTIC_MAX_ABS {
            MDEG_PER_RAD
        } else {
            MDEG_PER_DEG
        };

        let mut mdeg = [0i64; NUM_JOINTS];
        for (m, a) in mdeg.iter_mut().zip(self.target_deg.iter()) {
            *m = (a * factor).round() as i64;
        }
        mdeg
    }

    /// Gripper aperture clamped to be non-negative.
    pub fn jaw_cmd(&self) -> u64 {
        self.jaw.max(0) as u64
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Write an angle array as a JSON list with 4 decimal places.
fn write_angles(line: &mut String, angles: &[f64; NUM_JOINTS]) {
    line.push('[');
    for (i, a) in angles.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        write!(line, "{:.4}", a).ok();
    }
    line.push(']');
}
