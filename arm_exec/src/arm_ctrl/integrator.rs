//! Integration of solver velocities into joint commands

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use nalgebra::Vector6;

use super::{JointLimit, JointStore, StatusReport, NUM_JOINTS};
use util::maths::{clamp, move_towards, move_towards_angle_deg};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Integrate one solver iteration's joint velocities into the joint commands.
///
/// For each joint the angle change is limited to the joint's rate limits over
/// `dt_s`, added to the previous command and clamped into the joint's range.
/// The emitted command then moves from `tick_start_deg` toward this new angle
/// by no more than `|max_rate| * dt_s`, so repeated iterations within a tick
/// can never move a joint further than one tick's worth of travel.
///
/// Limit and rate flags are raised in `report`.
pub(crate) fn step(
    joints: &mut JointStore,
    tick_start_deg: &[f64; NUM_JOINTS],
    vel_rads: &Vector6<f64>,
    dt_s: f64,
    report: &mut StatusReport,
) {
    for (i, joint) in joints.iter_mut().enumerate() {
        let vel = if vel_rads[i].is_finite() {
            vel_rads[i]
        } else {
            warn!("Velocity of joint {} is not finite, using 0", i);
            0.0
        };

        let raw_change = vel.to_degrees() * dt_s;
        let min_change = joint.min_rate_degs * dt_s;
        let max_change = joint.max_rate_degs * dt_s;

        let change = clamp(&raw_change, &min_change, &max_change);
        if change != raw_change {
            report.rate_limited[i] = true;
        }

        let unlimited = joint.prev_cmd_deg + change;
        let new_deg = joint.limit.clamp(unlimited);
        if new_deg != unlimited {
            report.abs_pos_limited[i] = true;
        }

        let max_step = joint.max_rate_degs.abs() * dt_s;

        let smoothed = match joint.limit {
            JointLimit::Bounded { .. } => {
                joint.limit.clamp(move_towards(tick_start_deg[i], new_deg, max_step))
            }
            JointLimit::Unbounded => move_towards_angle_deg(tick_start_deg[i], new_deg, max_step),
        };

        joint.prev_cmd_deg = smoothed;
        joint.cmd_deg = smoothed;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_ctrl::Params;

    fn store(params: &Params, initial: [f64; NUM_JOINTS]) -> JointStore {
        JointStore::new(params, &initial).unwrap()
    }

    #[test]
    fn test_limit_containment() {
        let mut params = Params::default();
        for l in params.joint_limits.iter_mut() {
            *l = JointLimit::Bounded {
                lower_deg: -20.0,
                upper_deg: 20.0,
            };
        }
        params.max_rate_degs = [1000.0; NUM_JOINTS];
        params.min_rate_degs = [-1000.0; NUM_JOINTS];

        let mut joints = store(&params, [19.0, -19.0, 0.0, 5.0, -5.0, 20.0]);
        let vel = Vector6::new(10.0, -10.0, 50.0, -50.0, 3.0, 1.0);

        for _ in 0..50 {
            let start = joints.cmd_deg();
            let mut report = StatusReport::default();
            step(&mut joints, &start, &vel, 0.02, &mut report);

            for j in joints.iter() {
                assert!(j.limit.contains(j.cmd_deg), "{} outside limit", j.cmd_deg);
            }
        }

        let mut report = StatusReport::default();
        let start = joints.cmd_deg();
        step(&mut joints, &start, &vel, 0.02, &mut report);
        assert!(report.abs_pos_limited[0]);
        assert!(report.abs_pos_limited[1]);
    }

    #[test]
    fn test_velocity_bound_across_iterations() {
        let params = Params::default();
        let mut joints = store(&params, [0.0; NUM_JOINTS]);
        let dt = 0.02;
        let vel = Vector6::new(100.0, -100.0, 0.5, -0.5, 0.0, 2.0);

        for _ in 0..20 {
            let start = joints.cmd_deg();

            // Several iterations inside one tick
            for _ in 0..10 {
                let mut report = StatusReport::default();
                step(&mut joints, &start, &vel, dt, &mut report);
            }

            for (i, j) in joints.iter().enumerate() {
                let moved = (j.cmd_deg - start[i]).abs();
                assert!(moved <= j.max_rate_degs.abs() * dt + 1e-9);
                assert_eq!(j.cmd_deg, j.prev_cmd_deg);
            }
        }
    }

    #[test]
    fn test_rate_clamp() {
        let params = Params::default();
        let mut joints = store(&params, [0.0; NUM_JOINTS]);
        let mut report = StatusReport::default();

        let vel = Vector6::new(10.0, 0.1, 0.0, 0.0, 0.0, -10.0);
        step(&mut joints, &[0.0; NUM_JOINTS], &vel, 0.1, &mut report);

        // 60 deg/s over 0.1 s
        assert!((joints[0].cmd_deg - 6.0).abs() < 1e-9);
        assert!((joints[5].cmd_deg + 6.0).abs() < 1e-9);
        assert!((joints[1].cmd_deg - 0.1f64.to_degrees() * 0.1).abs() < 1e-9);
        assert!(report.rate_limited[0]);
        assert!(!report.rate_limited[1]);
        assert!(report.rate_limited[5]);
    }

    #[test]
    fn test_unbounded_crosses_wrap() {
        let params = Params::default();
        let mut joints = store(&params, [179.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let mut report = StatusReport::default();

        // +3 deg in one step carries joint 0 past 180 without turning back
        let vel = Vector6::new(3f64.to_radians(), 0.0, 0.0, 0.0, 0.0, 0.0);
        let start = joints.cmd_deg();
        step(&mut joints, &start, &vel, 1.0, &mut report);

        assert!((joints[0].cmd_deg - 182.0).abs() < 1e-9);
        assert!(!report.abs_pos_limited[0]);
    }

    #[test]
    fn test_non_finite_velocity_holds() {
        let params = Params::default();
        let mut joints = store(&params, [5.0; NUM_JOINTS]);
        let mut report = StatusReport::default();

        let vel = Vector6::new(f64::NAN, f64::INFINITY, 0.0, 0.0, 0.0, 0.0);
        step(&mut joints, &[5.0; NUM_JOINTS], &vel, 0.02, &mut report);

        assert_eq!(joints.cmd_deg(), [5.0; NUM_JOINTS]);
    }
}
