//! Damped least-squares solve with adaptive damping
//!
//! The joint velocities are found from the damped pseudo-inverse of the
//! Jacobian, built from its singular value decomposition `J = U S V^T`:
//!
//! ```text
//! qdot = V diag(s_i / (s_i^2 + lambda^2)) U^T e
//! ```
//!
//! where `lambda` is a Gaussian function of the position error magnitude.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use nalgebra::{Matrix6, Vector3, Vector6};

use super::Params;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Gaussian damping factor for a given position error magnitude.
///
/// `lambda = exp(-(err - mu)^2 / (2 sigma^2))`
pub fn gaussian_damping(pos_err_norm_m: f64, mu_m: f64, sigma_m: f64) -> f64 {
    let d = pos_err_norm_m - mu_m;
    (-(d * d) / (2.0 * sigma_m * sigma_m)).exp()
}

/// Damped inverse of a single singular value.
///
/// Returns zero where both the singular value and the damping vanish.
pub fn damped_singular_value(s: f64, lambda: f64) -> f64 {
    let denom = s * s + lambda * lambda;

    if denom > 0.0 {
        s / denom
    } else {
        0.0
    }
}

/// Build the weighted 6-vector error `[w_pos e_pos; w_rot rad(e_rot)]`.
pub fn weighted_error(pos_err_m: &Vector3<f64>, rot_err_deg: &Vector3<f64>, params: &Params) -> Vector6<f64> {
    Vector6::new(
        params.pos_weight * pos_err_m.x,
        params.pos_weight * pos_err_m.y,
        params.pos_weight * pos_err_m.z,
        params.rot_weight * rot_err_deg.x.to_radians(),
        params.rot_weight * rot_err_deg.y.to_radians(),
        params.rot_weight * rot_err_deg.z.to_radians(),
    )
}

/// Solve for the joint velocities which reduce the given error.
///
/// The damping only depends on the position error, the rotation error still
/// contributes to the error vector being solved against.
///
/// Units: radians/second per joint
pub fn solve(
    jacobian: &Matrix6<f64>,
    pos_err_m: &Vector3<f64>,
    rot_err_deg: &Vector3<f64>,
    params: &Params,
) -> Vector6<f64> {
    let e = weighted_error(pos_err_m, rot_err_deg, params);
    let lambda = gaussian_damping(pos_err_m.norm(), params.damping_mu_m, params.damping_sigma_m);

    let svd = jacobian.svd(true, true);

    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            warn!("Jacobian SVD did not produce U and V^T, holding joints");
            return Vector6::zeros();
        }
    };

    let damped = svd.singular_values.map(|s| damped_singular_value(s, lambda));

    let pinv = v_t.transpose() * Matrix6::from_diagonal(&damped) * u.transpose();
    let vel = pinv * e;

    if vel.iter().all(|v| v.is_finite()) {
        vel
    } else {
        warn!("Damped least-squares solve produced non-finite velocities, holding joints");
        Vector6::zeros()
    }
}
