//! Geometric Jacobian of the arm

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix6, Vector3};

use super::NUM_JOINTS;
use crate::kinematics::JointAnchor;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the 6x6 geometric Jacobian of a revolute chain.
///
/// Column `i` holds the end-effector velocity produced by a unit angular rate
/// of joint `i`:
///
/// - rows 0-2: `axis x (ee_position - anchor_position)`, the linear part
/// - rows 3-5: `axis`, the angular part
pub fn calc_jacobian(anchors: &[JointAnchor; NUM_JOINTS], ee_pos_m: &Vector3<f64>) -> Matrix6<f64> {
    let mut jacobian = Matrix6::zeros();

    for (i, anchor) in anchors.iter().enumerate() {
        let axis = anchor.axis();
        let lever_m = ee_pos_m - anchor.position_m();
        let linear = axis.cross(&lever_m);

        for r in 0..3 {
            jacobian[(r, i)] = linear[r];
            jacobian[(r + 3, i)] = axis[r];
        }
    }

    jacobian
}

/// Replace any non-finite entries of the Jacobian with zero.
///
/// Returns `true` if any entry was replaced.
pub fn sanitise_jacobian(jacobian: &mut Matrix6<f64>) -> bool {
    let mut replaced = false;

    for v in jacobian.iter_mut() {
        if !v.is_finite() {
            *v = 0.0;
            replaced = true;
        }
    }

    replaced
}
