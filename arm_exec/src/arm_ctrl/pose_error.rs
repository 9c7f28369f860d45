//! Pose error between the end effector and its target

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::Serialize;

use crate::kinematics::Pose;
use util::maths::wrap_angle_deg;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Error of the end effector relative to the target.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PoseError {
    /// Target position minus current position.
    ///
    /// Units: meters
    pub pos_m: Vector3<f64>,

    /// Euler angles (roll, pitch, yaw) of the rotation taking the current
    /// attitude onto the target, each wrapped into (-180, 180].
    ///
    /// Units: degrees
    pub rot_deg: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Calculate the error between the current end-effector frame and the target.
pub fn calc_pose_error(current: &Pose, target: &Pose) -> PoseError {
    let pos_m = target.position_m - current.position_m;

    let diff = target.attitude_q * current.attitude_q.inverse();
    let (roll, pitch, yaw) = diff.euler_angles();

    PoseError {
        pos_m,
        rot_deg: Vector3::new(
            wrap_angle_deg(roll.to_degrees()),
            wrap_angle_deg(pitch.to_degrees()),
            wrap_angle_deg(yaw.to_degrees()),
        ),
    }
}

/// Distance between the current end-effector position and the target.
///
/// Units: meters
pub fn distance_m(current: &Pose, target: &Pose) -> f64 {
    (target.position_m - current.position_m).norm()
}

/// Total angle between the current end-effector attitude and the target.
///
/// Units: degrees
pub fn angle_deg(current: &Pose, target: &Pose) -> f64 {
    current.attitude_q.angle_to(&target.attitude_q).to_degrees()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_identical_poses() {
        let p = Pose::from_position_rpy([0.1, 0.2, 0.3], [10.0, 20.0, 30.0]);
        let e = calc_pose_error(&p, &p);

        assert!(e.pos_m.norm() < 1e-12);
        assert!(e.rot_deg.norm() < 1e-9);
        assert!(angle_deg(&p, &p) < 1e-6);
    }

    #[test]
    fn test_position_error_direction() {
        let current = Pose::from_position_rpy([0.0, 0.0, 0.0], [0.0; 3]);
        let target = Pose::from_position_rpy([0.3, -0.1, 0.0], [0.0; 3]);
        let e = calc_pose_error(&current, &target);

        assert!((e.pos_m - Vector3::new(0.3, -0.1, 0.0)).norm() < 1e-12);
        assert!((distance_m(&current, &target) - 0.1f64.hypot(0.3)).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_error_single_axis() {
        let current = Pose::from_position_rpy([0.0; 3], [0.0, 0.0, 30.0]);
        let target = Pose::from_position_rpy([0.0; 3], [0.0, 0.0, 75.0]);
        let e = calc_pose_error(&current, &target);

        assert!((e.rot_deg - Vector3::new(0.0, 0.0, 45.0)).norm() < 1e-9);
        assert!((angle_deg(&current, &target) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_error_across_wrap() {
        // 170 -> -170 is a +20 deg rotation, not -340
        let current = Pose::from_position_rpy([0.0; 3], [0.0, 0.0, 170.0]);
        let target = Pose::from_position_rpy([0.0; 3], [0.0, 0.0, -170.0]);
        let e = calc_pose_error(&current, &target);

        assert!((e.rot_deg.z - 20.0).abs() < 1e-9);
        for r in e.rot_deg.iter() {
            assert!(*r > -180.0 && *r <= 180.0);
        }
    }
}
