//! Sources of the end-effector target pose

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use nalgebra::Vector3;
use std::f64::consts::PI;

use crate::kinematics::Pose;
use util::maths::lerp;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which can provide a target pose for the end effector.
///
/// Arm control skips the tick, holding the joints where they are, whenever the
/// source is inactive.
pub trait PoseSource {
    /// True if the source currently has a target.
    fn is_active(&self) -> bool;

    /// The current target, or `None` if the source is inactive.
    fn current_pose(&self) -> Option<Pose>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A fixed target set by the operator. Always active.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualTarget {
    pub pose: Pose,
}

/// One tracked-hand sample.
#[derive(Debug, Clone, Copy)]
pub struct HandSample {
    /// Pose of the tracked hand, which becomes the end-effector target.
    pub pose: Pose,

    /// Position of the thumb tip.
    ///
    /// Units: meters
    pub thumb_tip_m: Vector3<f64>,

    /// Position of the index finger tip.
    ///
    /// Units: meters
    pub index_tip_m: Vector3<f64>,
}

/// Target source following a tracked hand.
///
/// Only active while a hand is tracked.
#[derive(Debug, Clone, Default)]
pub struct HandTracker {
    sample: Option<HandSample>,
}

/// A hand following a scripted path, used in place of a hand-tracking device.
///
/// The hand circles in the world Y-Z plane, starting at `centre` with its attitude fixed, and
/// opens then closes its pinch once per period.
#[derive(Debug, Clone, Copy)]
pub struct SimHand {
    centre: Pose,

    /// Units: meters
    radius_m: f64,

    /// Units: seconds
    period_s: f64,

    /// Pinch distance when fully closed and fully open.
    ///
    /// Units: meters
    pinch_range_m: (f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ManualTarget {
    pub fn new(pose: Pose) -> Self {
        Self { pose }
    }
}

impl PoseSource for ManualTarget {
    fn is_active(&self) -> bool {
        true
    }

    fn current_pose(&self) -> Option<Pose> {
        Some(self.pose)
    }
}

impl HandSample {
    /// Distance between the thumb and index finger tips.
    ///
    /// Units: meters
    pub fn pinch_distance_m(&self) -> f64 {
        (self.thumb_tip_m - self.index_tip_m).norm()
    }
}

impl HandTracker {
    /// Update the tracker with the latest sample, `None` when the hand has
    /// been lost.
    pub fn update(&mut self, sample: Option<HandSample>) {
        match (self.sample.is_some(), sample.is_some()) {
            (false, true) => info!("Hand tracking acquired"),
            (true, false) => info!("Hand tracking lost"),
            _ => (),
        }

        self.sample = sample;
    }

    /// The latest sample if the hand is tracked.
    pub fn sample(&self) -> Option<&HandSample> {
        self.sample.as_ref()
    }
}

impl SimHand {
    pub fn new(centre: Pose, radius_m: f64, period_s: f64, pinch_range_m: (f64, f64)) -> Self {
        Self {
            centre,
            radius_m,
            period_s,
            pinch_range_m,
        }
    }

    /// The hand at `time_s` seconds after the start of the path.
    ///
    /// A non-positive period holds the hand at the start of the path.
    pub fn sample(&self, time_s: f64) -> HandSample {
        let phase = if self.period_s > 0.0 {
            2.0 * PI * time_s / self.period_s
        } else {
            0.0
        };

        let offset_m = Vector3::new(
            0.0,
            self.radius_m * phase.sin(),
            self.radius_m * (1.0 - phase.cos()),
        );
        let pose = Pose {
            position_m: self.centre.position_m + offset_m,
            attitude_q: self.centre.attitude_q,
        };

        let pinch_m = lerp(
            self.pinch_range_m.0,
            self.pinch_range_m.1,
            0.5 - 0.5 * phase.cos(),
        );

        HandSample {
            pose,
            thumb_tip_m: pose.position_m,
            index_tip_m: pose.position_m + Vector3::new(pinch_m, 0.0, 0.0),
        }
    }
}

impl PoseSource for HandTracker {
    fn is_active(&self) -> bool {
        self.sample.is_some()
    }

    fn current_pose(&self) -> Option<Pose> {
        self.sample.map(|s| s.pose)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_manual_target_always_active() {
        let pose = Pose::from_position_rpy([0.2, 0.0, 0.3], [0.0, 90.0, 0.0]);
        let target = ManualTarget::new(pose);

        assert!(target.is_active());
        assert_eq!(target.current_pose(), Some(pose));
    }

    #[test]
    fn test_hand_tracker_activity() {
        let mut tracker = HandTracker::default();
        assert!(!tracker.is_active());
        assert!(tracker.current_pose().is_none());

        let sample = HandSample {
            pose: Pose::from_position_rpy([0.3, 0.1, 0.2], [0.0, 0.0, 45.0]),
            thumb_tip_m: Vector3::new(0.0, 0.0, 0.0),
            index_tip_m: Vector3::new(0.03, 0.04, 0.0),
        };
        tracker.update(Some(sample));

        assert!(tracker.is_active());
        assert_eq!(tracker.current_pose(), Some(sample.pose));
        assert!((tracker.sample().unwrap().pinch_distance_m() - 0.05).abs() < 1e-12);

        tracker.update(None);
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_sim_hand_path() {
        let centre = Pose::from_position_rpy([0.3, 0.0, 0.3], [0.0, 10.0, 0.0]);
        let hand = SimHand::new(centre, 0.05, 4.0, (0.02, 0.12));

        // Starts at the centre, closed
        let start = hand.sample(0.0);
        assert!((start.pose.position_m - centre.position_m).norm() < 1e-12);
        assert!((start.pinch_distance_m() - 0.02).abs() < 1e-12);

        // Half way round it is at the top of the circle, fully open
        let half = hand.sample(2.0);
        let expected = centre.position_m + Vector3::new(0.0, 0.0, 0.1);
        assert!((half.pose.position_m - expected).norm() < 1e-12);
        assert!((half.pinch_distance_m() - 0.12).abs() < 1e-12);
        assert_eq!(half.pose.attitude_q, centre.attitude_q);

        // Stays on the circle
        for i in 0..40 {
            let s = hand.sample(0.1 * i as f64);
            let circle_centre = centre.position_m + Vector3::new(0.0, 0.0, 0.05);
            assert!(((s.pose.position_m - circle_centre).norm() - 0.05).abs() < 1e-12);
        }

        // No period, no motion
        let still = SimHand::new(centre, 0.05, 0.0, (0.02, 0.12));
        assert_eq!(still.sample(3.0).pose, centre);
    }
}
