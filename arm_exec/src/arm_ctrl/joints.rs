//! Kinematic state of the arm's joints

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use serde::{Deserialize, Serialize};

// Internal
use super::{ArmCtrlError, Params, NUM_JOINTS};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Range limit of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JointLimit {
    /// Continuous joint, any angle is allowed.
    Unbounded,

    /// Revolute joint restricted to `[lower_deg, upper_deg]`.
    Bounded { lower_deg: f64, upper_deg: f64 },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State of a single joint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Joint {
    /// Range limit of the joint.
    pub limit: JointLimit,

    /// Lowest (most negative) allowed angular rate.
    ///
    /// Units: degrees/second
    pub min_rate_degs: f64,

    /// Highest allowed angular rate.
    ///
    /// Units: degrees/second
    pub max_rate_degs: f64,

    /// Angle currently commanded to the joint's drive. This is the target
    /// angle reported in telemetry.
    ///
    /// Units: degrees
    pub cmd_deg: f64,

    /// Commanded angle at the end of the previous solver iteration, which the
    /// next iteration integrates from.
    ///
    /// Units: degrees
    pub prev_cmd_deg: f64,

    /// Measured angle of the joint.
    ///
    /// Units: degrees
    pub current_deg: f64,
}

/// The kinematic state of every joint on the arm.
#[derive(Debug, Clone, Serialize)]
pub struct JointStore {
    joints: [Joint; NUM_JOINTS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointLimit {
    /// Clamp an angle into the limit.
    pub fn clamp(&self, angle_deg: f64) -> f64 {
        match *self {
            JointLimit::Unbounded => angle_deg,
            JointLimit::Bounded { lower_deg, upper_deg } => {
                clamp(&angle_deg, &lower_deg, &upper_deg)
            }
        }
    }

    /// True if the angle satisfies the limit.
    pub fn contains(&self, angle_deg: f64) -> bool {
        match *self {
            JointLimit::Unbounded => true,
            JointLimit::Bounded { lower_deg, upper_deg } => {
                lower_deg <= angle_deg && angle_deg <= upper_deg
            }
        }
    }

    /// Check the limit is well formed.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            JointLimit::Unbounded => Ok(()),
            JointLimit::Bounded { lower_deg, upper_deg } => {
                if !lower_deg.is_finite() || !upper_deg.is_finite() {
                    Err(format!("limit [{}, {}] is not finite", lower_deg, upper_deg))
                } else if lower_deg >= upper_deg {
                    Err(format!(
                        "lower limit {} is not below upper limit {}",
                        lower_deg, upper_deg
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl Default for JointLimit {
    fn default() -> Self {
        JointLimit::Unbounded
    }
}

impl JointStore {
    /// Create the store from the parameters and the arm's initial joint
    /// angles.
    ///
    /// Each joint's initial angle becomes both its commanded and previous
    /// commanded angle. Initial angles outside a joint's limits are clamped
    /// into it.
    pub fn new(params: &Params, initial_deg: &[f64; NUM_JOINTS]) -> Result<Self, ArmCtrlError> {
        params.validate()?;

        Ok(Self::from_valid_params(params, initial_deg))
    }

    fn from_valid_params(params: &Params, initial_deg: &[f64; NUM_JOINTS]) -> Self {
        let mut joints = [Joint {
            limit: JointLimit::Unbounded,
            min_rate_degs: 0.0,
            max_rate_degs: 0.0,
            cmd_deg: 0.0,
            prev_cmd_deg: 0.0,
            current_deg: 0.0,
        }; NUM_JOINTS];

        for (i, joint) in joints.iter_mut().enumerate() {
            let limit = params.joint_limits[i];

            let measured = if initial_deg[i].is_finite() {
                initial_deg[i]
            } else {
                warn!("Initial angle of joint {} is not finite, using 0", i);
                0.0
            };

            let cmd = limit.clamp(measured);
            if cmd != measured {
                warn!(
                    "Initial angle of joint {} ({:.3} deg) is outside its limits, clamped to {:.3} deg",
                    i, measured, cmd
                );
            }

            *joint = Joint {
                limit,
                min_rate_degs: params.min_rate_degs[i],
                max_rate_degs: params.max_rate_degs[i],
                cmd_deg: cmd,
                prev_cmd_deg: cmd,
                current_deg: measured,
            };
        }

        Self { joints }
    }

    /// Commanded angle of every joint.
    pub fn cmd_deg(&self) -> [f64; NUM_JOINTS] {
        let mut a = [0.0; NUM_JOINTS];
        for (a, j) in a.iter_mut().zip(self.joints.iter()) {
            *a = j.cmd_deg;
        }
        a
    }

    /// Measured angle of every joint.
    pub fn current_deg(&self) -> [f64; NUM_JOINTS] {
        let mut a = [0.0; NUM_JOINTS];
        for (a, j) in a.iter_mut().zip(self.joints.iter()) {
            *a = j.current_deg;
        }
        a
    }

    /// Update the measured angles. Non-finite readings are replaced by zero.
    pub fn set_measured(&mut self, measured_deg: &[f64; NUM_JOINTS]) {
        for (i, (j, m)) in self.joints.iter_mut().zip(measured_deg.iter()).enumerate() {
            if m.is_finite() {
                j.current_deg = *m;
            } else {
                warn!("Measured angle of joint {} is not finite, using 0", i);
                j.current_deg = 0.0;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Joint> {
        self.joints.iter_mut()
    }
}

impl Default for JointStore {
    fn default() -> Self {
        Self::from_valid_params(&Params::default(), &[0.0; NUM_JOINTS])
    }
}

impl std::ops::Index<usize> for JointStore {
    type Output = Joint;

    fn index(&self, index: usize) -> &Self::Output {
        &self.joints[index]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_limit_clamp() {
        let limit = JointLimit::Bounded {
            lower_deg: -10.0,
            upper_deg: 20.0,
        };
        assert_eq!(limit.clamp(-30.0), -10.0);
        assert_eq!(limit.clamp(5.0), 5.0);
        assert_eq!(limit.clamp(25.0), 20.0);
        assert!(limit.contains(20.0));
        assert!(!limit.contains(20.1));

        assert_eq!(JointLimit::Unbounded.clamp(720.0), 720.0);
        assert!(JointLimit::Unbounded.contains(-720.0));
    }

    #[test]
    fn test_limit_validate() {
        assert!(JointLimit::Unbounded.validate().is_ok());
        assert!(JointLimit::Bounded { lower_deg: -1.0, upper_deg: 1.0 }.validate().is_ok());
        assert!(JointLimit::Bounded { lower_deg: 1.0, upper_deg: 1.0 }.validate().is_err());
        assert!(JointLimit::Bounded { lower_deg: 2.0, upper_deg: 1.0 }.validate().is_err());
        assert!(JointLimit::Bounded { lower_deg: f64::NAN, upper_deg: 1.0 }.validate().is_err());
    }

    #[test]
    fn test_limit_deserialize() {
        #[derive(Deserialize)]
        struct Limits {
            limits: Vec<JointLimit>,
        }

        let l: Limits = toml::from_str(
            r#"limits = [
                { type = "unbounded" },
                { type = "bounded", lower_deg = -150.0, upper_deg = 150.0 },
            ]"#,
        )
        .unwrap();

        assert_eq!(l.limits[0], JointLimit::Unbounded);
        assert_eq!(
            l.limits[1],
            JointLimit::Bounded {
                lower_deg: -150.0,
                upper_deg: 150.0
            }
        );
    }

    #[test]
    fn test_store_init_clamps_and_sanitises() {
        let mut params = Params::default();
        params.joint_limits[1] = JointLimit::Bounded {
            lower_deg: 0.0,
            upper_deg: 90.0,
        };

        let store = JointStore::new(&params, &[10.0, -5.0, f64::NAN, 0.0, 0.0, 400.0]).unwrap();

        assert_eq!(store.cmd_deg(), [10.0, 0.0, 0.0, 0.0, 0.0, 400.0]);
        assert_eq!(store[1].prev_cmd_deg, 0.0);
        assert_eq!(store.current_deg()[1], -5.0);
        assert_eq!(store.current_deg()[2], 0.0);
    }
}
