//! Parameters structure for ArmCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{ArmCtrlError, JointLimit, NUM_JOINTS};
use crate::kinematics::ChainParams;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Arm control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- GEOMETRY ----
    /// Geometry of the arm's chain.
    pub chain: ChainParams,

    // ---- CAPABILITIES ----
    /// Range limit of each joint.
    pub joint_limits: [JointLimit; NUM_JOINTS],

    /// Minimum joint rotation rate (lowest negative value)
    ///
    /// Units: degrees/second
    pub min_rate_degs: [f64; NUM_JOINTS],

    /// Maximum joint rotation rate (highest positive value)
    ///
    /// Units: degrees/second
    pub max_rate_degs: [f64; NUM_JOINTS],

    // ---- SOLVER ----
    /// Spread of the Gaussian damping curve.
    ///
    /// Units: meters
    pub damping_sigma_m: f64,

    /// Centre of the Gaussian damping curve.
    ///
    /// Units: meters
    pub damping_mu_m: f64,

    /// Weight applied to the position error.
    pub pos_weight: f64,

    /// Weight applied to the rotation error (after conversion to radians).
    pub rot_weight: f64,

    /// Maximum number of solver iterations in one tick.
    pub max_iterations: usize,

    // ---- CONVERGENCE ----
    /// The end effector is in position when closer than this to the target.
    ///
    /// Units: meters
    pub dist_tolerance_m: f64,

    /// The end effector is in attitude when rotated less than this from the
    /// target.
    ///
    /// Units: degrees
    pub ang_tolerance_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            chain: ChainParams::default(),
            joint_limits: [JointLimit::Unbounded; NUM_JOINTS],
            min_rate_degs: [-60.0; NUM_JOINTS],
            max_rate_degs: [60.0; NUM_JOINTS],
            damping_sigma_m: 0.5,
            damping_mu_m: 0.0,
            pos_weight: 1.0,
            rot_weight: 0.3,
            max_iterations: 10,
            dist_tolerance_m: 0.01,
            ang_tolerance_deg: 0.5,
        }
    }
}

impl Params {
    /// Check that the parameters describe a usable controller.
    ///
    /// The chain geometry is checked separately when the chain is built.
    pub fn validate(&self) -> Result<(), ArmCtrlError> {
        let invalid = |msg: String| Err(ArmCtrlError::InvalidParams(msg));

        for i in 0..NUM_JOINTS {
            if let Err(e) = self.joint_limits[i].validate() {
                return invalid(format!("joint {}: {}", i, e));
            }

            let (min, max) = (self.min_rate_degs[i], self.max_rate_degs[i]);
            if !min.is_finite() || !max.is_finite() || min > max {
                return invalid(format!(
                    "joint {}: rate limits [{}, {}] are not an ordered pair",
                    i, min, max
                ));
            }
        }

        if !(self.damping_sigma_m > 0.0) || !self.damping_sigma_m.is_finite() {
            return invalid(format!(
                "damping sigma must be positive, found {}",
                self.damping_sigma_m
            ));
        }

        if !self.damping_mu_m.is_finite()
            || !self.pos_weight.is_finite()
            || !self.rot_weight.is_finite()
        {
            return invalid("damping mu and error weights must be finite".into());
        }

        if self.max_iterations == 0 {
            return invalid("at least one solver iteration is required".into());
        }

        if !(self.dist_tolerance_m >= 0.0) || !(self.ang_tolerance_deg >= 0.0) {
            return invalid("convergence tolerances must not be negative".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let mut p = Params::default();
        p.joint_limits[2] = JointLimit::Bounded {
            lower_deg: 10.0,
            upper_deg: -10.0,
        };
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.min_rate_degs[0] = 90.0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.damping_sigma_m = 0.0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.max_iterations = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_params_file() {
        let p: Params =
            util::params::from_str(include_str!("../../../params/arm_ctrl.toml")).unwrap();

        assert!(p.validate().is_ok());
        assert_eq!(p.chain.links.len(), NUM_JOINTS);
        assert_eq!(p.max_iterations, 10);
        assert_eq!(p.rot_weight, 0.3);
    }
}
