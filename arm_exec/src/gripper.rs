//! # Gripper
//!
//! Maps the two-jaw gripper's jaw positions onto the aperture reported to the
//! arm, and drives the jaws from the operator's pinch when hand tracking.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use util::maths::{clamp, exp_follow, finite_or, inverse_lerp, lerp};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the gripper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GripperParams {
    /// Travel limits of the left jaw.
    pub left_jaw: JawLimits,

    /// Travel limits of the right jaw.
    pub right_jaw: JawLimits,

    /// Jaw gap when the gripper is fully closed.
    ///
    /// Units: meters
    pub closed_gap_m: f64,

    /// Largest physically possible jaw gap.
    ///
    /// Units: meters
    pub max_gap_m: f64,

    /// Aperture reported to the arm at the closed gap.
    pub aperture_min: f64,

    /// Aperture reported to the arm at the maximum gap.
    pub aperture_max: f64,

    /// Pinch distance at or below which the gripper is fully closed.
    ///
    /// Units: meters
    pub pinch_close_m: f64,

    /// Pinch distance at or above which the gripper is fully open.
    ///
    /// Units: meters
    pub pinch_open_m: f64,

    /// Rate at which the jaw drive targets follow the pinch.
    ///
    /// Units: 1/seconds
    pub follow_rate_hz: f64,
}

/// Travel limits of one jaw.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JawLimits {
    /// Units: meters
    pub lower_m: f64,

    /// Units: meters
    pub upper_m: f64,
}

/// State of one jaw's drive.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct JawState {
    /// Position the jaw is being driven to.
    ///
    /// Units: meters
    pub drive_target_m: f64,

    /// Measured position of the jaw.
    ///
    /// Units: meters
    pub position_m: f64,
}

/// Converts jaw positions into the actuator's aperture value.
#[derive(Debug, Clone)]
pub struct GripperWidthMapper {
    closed_gap_m: f64,
    max_gap_m: f64,
    aperture_min: f64,
    aperture_max: f64,
}

/// Gripper opened and closed by the distance between the operator's thumb and
/// index finger.
#[derive(Debug, Clone)]
pub struct PinchGripper {
    params: GripperParams,
    left: Option<JawState>,
    right: Option<JawState>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GripperParams {
    fn default() -> Self {
        Self {
            left_jaw: JawLimits {
                lower_m: 0.0,
                upper_m: 0.035,
            },
            right_jaw: JawLimits {
                lower_m: -0.035,
                upper_m: 0.0,
            },
            closed_gap_m: 0.0,
            max_gap_m: 0.07,
            aperture_min: 0.0,
            aperture_max: 80080.0,
            pinch_close_m: 0.02,
            pinch_open_m: 0.12,
            follow_rate_hz: 12.0,
        }
    }
}

impl JawLimits {
    pub fn clamp(&self, position_m: f64) -> f64 {
        clamp(&position_m, &self.lower_m, &self.upper_m)
    }
}

impl GripperWidthMapper {
    pub fn new(params: &GripperParams) -> Self {
        Self {
            closed_gap_m: params.closed_gap_m,
            max_gap_m: params.max_gap_m,
            aperture_min: params.aperture_min,
            aperture_max: params.aperture_max,
        }
    }

    /// Gap between the jaws, clamped into `[0, max_gap_m]`.
    ///
    /// Units: meters
    pub fn gap_m(&self, left: Option<&JawState>, right: Option<&JawState>) -> f64 {
        let gap = (read_jaw(left) - read_jaw(right)).abs();
        clamp(&gap, &0.0, &self.max_gap_m)
    }

    /// Aperture for a jaw gap. Gaps outside the known range map to the ends of
    /// the aperture range.
    pub fn aperture(&self, gap_m: f64) -> i64 {
        let gap_m = finite_or(gap_m, 0.0);
        let t = inverse_lerp(self.closed_gap_m, self.max_gap_m, gap_m);

        lerp(self.aperture_min, self.aperture_max, t).round() as i64
    }

    /// Aperture for the current state of both jaws.
    pub fn map(&self, left: Option<&JawState>, right: Option<&JawState>) -> i64 {
        self.aperture(self.gap_m(left, right))
    }
}

impl PinchGripper {
    /// Create a new gripper with both jaws at rest in their closed position.
    ///
    /// The left jaw closes at its lower limit and the right jaw at its upper limit.
    pub fn new(params: GripperParams) -> Self {
        let rest = |closed_m: f64| JawState {
            drive_target_m: closed_m,
            position_m: closed_m,
        };

        Self {
            left: Some(rest(params.left_jaw.lower_m)),
            right: Some(rest(params.right_jaw.upper_m)),
            params,
        }
    }

    /// Drive the jaws toward the opening matching the pinch distance.
    ///
    /// The jaws only move while the hand is tracked, with no pinch they hold.
    pub fn update(&mut self, pinch_distance_m: Option<f64>, dt_s: f64) {
        let pinch = match pinch_distance_m {
            Some(p) if p.is_finite() => p,
            _ => return,
        };

        let t = inverse_lerp(self.params.pinch_close_m, self.params.pinch_open_m, pinch);
        let rate = self.params.follow_rate_hz;

        let l = &self.params.left_jaw;
        let left_target = l.clamp(lerp(l.lower_m, l.upper_m, t));
        let r = &self.params.right_jaw;
        let right_target = r.clamp(lerp(r.upper_m, r.lower_m, t));

        if let Some(ref mut jaw) = self.left {
            jaw.drive_target_m = exp_follow(jaw.drive_target_m, left_target, rate, dt_s);
        }
        if let Some(ref mut jaw) = self.right {
            jaw.drive_target_m = exp_follow(jaw.drive_target_m, right_target, rate, dt_s);
        }
    }

    /// Move the measured jaw positions toward their drive targets.
    pub fn drive(&mut self, follow_rate_hz: f64, dt_s: f64) {
        for jaw in self.left.iter_mut().chain(self.right.iter_mut()) {
            jaw.position_m = exp_follow(jaw.position_m, jaw.drive_target_m, follow_rate_hz, dt_s);
        }
    }

    pub fn left(&self) -> Option<&JawState> {
        self.left.as_ref()
    }

    pub fn right(&self) -> Option<&JawState> {
        self.right.as_ref()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Position of a jaw, preferring its drive target, then its measured
/// position, then zero.
///
/// Units: meters
pub fn read_jaw(jaw: Option<&JawState>) -> f64 {
    match jaw {
        Some(j) if j.drive_target_m.is_finite() => j.drive_target_m,
        Some(j) if j.position_m.is_finite() => j.position_m,
        _ => 0.0,
    }
}
