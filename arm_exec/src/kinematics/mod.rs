//! # Kinematics module
//!
//! Forward kinematics of the arm's 6-joint serial revolute chain. This provides the joint anchor
//! frames and the end-effector frame consumed by arm control each tick.
//!
//! Body `i` of the chain has the world transform
//!
//! ```text
//! W_i = W_(i-1) * Origin_i * Anchor_i * Rx(q_i) * Anchor_i^-1
//! ```
//!
//! i.e. each joint rotates its body about the local X axis of its anchor, and the anchor point
//! itself does not move when the joint turns. The end effector is `W_5 * EeOffset`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Isometry3, Matrix6, Translation3, UnitQuaternion, Vector3};

use crate::arm_ctrl::jacobian::calc_jacobian;
pub use comms_if::tm::NUM_JOINTS;
pub use params::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A kinematic model of the arm, evaluated at a set of joint angles.
pub trait KinematicModel {
    /// The end-effector frame at the given joint angles.
    fn end_effector(&self, joints_deg: &[f64; NUM_JOINTS]) -> Pose;

    /// The 6x6 geometric Jacobian at the given joint angles, with rows ordered
    /// `[linear x, y, z; angular x, y, z]`.
    fn jacobian(&self, joints_deg: &[f64; NUM_JOINTS]) -> Matrix6<f64>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A rigid transform in the world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Position of the frame origin.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Attitude of the frame, rotating vectors from the frame into the world.
    pub attitude_q: UnitQuaternion<f64>,
}

/// World-frame placement of one joint.
#[derive(Debug, Clone, Copy)]
pub struct JointAnchor {
    /// World transform of the body the joint moves.
    pub body: Isometry3<f64>,

    /// Anchor of the joint in the body frame. The joint rotates about the
    /// anchor's local X axis.
    pub anchor: Isometry3<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    origin: Isometry3<f64>,
    anchor: Isometry3<f64>,
}

/// The arm's serial chain.
#[derive(Debug, Clone)]
pub struct Chain {
    links: [Link; NUM_JOINTS],
    ee_offset: Isometry3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Build a pose from a position and roll/pitch/yaw angles in degrees.
    pub fn from_position_rpy(position_m: [f64; 3], rpy_deg: [f64; 3]) -> Self {
        Self {
            position_m: Vector3::from(position_m),
            attitude_q: quat_from_rpy_deg(rpy_deg),
        }
    }

    /// True if every component of the pose is finite.
    pub fn is_finite(&self) -> bool {
        self.position_m.iter().all(|v| v.is_finite())
            && self.attitude_q.coords.iter().all(|v| v.is_finite())
    }

    /// The pose as an isometry.
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position_m), self.attitude_q)
    }
}

impl From<Isometry3<f64>> for Pose {
    fn from(iso: Isometry3<f64>) -> Self {
        Self {
            position_m: iso.translation.vector,
            attitude_q: iso.rotation,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            attitude_q: UnitQuaternion::identity(),
        }
    }
}

impl JointAnchor {
    /// Position of the joint anchor in the world frame.
    pub fn position_m(&self) -> Vector3<f64> {
        (self.body * self.anchor).translation.vector
    }

    /// World rotation axis of the joint, normalised.
    pub fn axis(&self) -> Vector3<f64> {
        let axis = (self.body.rotation * self.anchor.rotation) * Vector3::x();
        axis.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
    }
}

impl Default for JointAnchor {
    fn default() -> Self {
        Self {
            body: Isometry3::identity(),
            anchor: Isometry3::identity(),
        }
    }
}

impl Chain {
    /// Build the chain from its parameters.
    pub fn from_params(params: &ChainParams) -> Result<Self, ChainParamsError> {
        if params.links.len() != NUM_JOINTS {
            return Err(ChainParamsError::WrongNumLinks(params.links.len()));
        }

        let mut links = [Link {
            origin: Isometry3::identity(),
            anchor: Isometry3::identity(),
        }; NUM_JOINTS];

        for (link, p) in links.iter_mut().zip(params.links.iter()) {
            link.origin = isometry_from(p.origin_m, p.origin_rpy_deg);
            link.anchor = isometry_from(p.anchor_m, p.anchor_rpy_deg);
        }

        Ok(Self {
            links,
            ee_offset: isometry_from(params.ee_offset_m, params.ee_offset_rpy_deg),
        })
    }

    /// World placement of every joint at the given angles.
    pub fn joint_anchors(&self, joints_deg: &[f64; NUM_JOINTS]) -> [JointAnchor; NUM_JOINTS] {
        let mut anchors = [JointAnchor::default(); NUM_JOINTS];
        let mut parent = Isometry3::identity();

        for (i, link) in self.links.iter().enumerate() {
            let rot = Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&Vector3::x_axis(), joints_deg[i].to_radians()),
            );

            let body = parent * link.origin * link.anchor * rot * link.anchor.inverse();

            anchors[i] = JointAnchor {
                body,
                anchor: link.anchor,
            };
            parent = body;
        }

        anchors
    }
}

impl Default for Chain {
    /// A chain with every frame at the origin, useful only as a placeholder
    /// before initialisation.
    fn default() -> Self {
        Self {
            links: [Link {
                origin: Isometry3::identity(),
                anchor: Isometry3::identity(),
            }; NUM_JOINTS],
            ee_offset: Isometry3::identity(),
        }
    }
}

impl KinematicModel for Chain {
    fn end_effector(&self, joints_deg: &[f64; NUM_JOINTS]) -> Pose {
        let anchors = self.joint_anchors(joints_deg);
        Pose::from(anchors[NUM_JOINTS - 1].body * self.ee_offset)
    }

    fn jacobian(&self, joints_deg: &[f64; NUM_JOINTS]) -> Matrix6<f64> {
        let anchors = self.joint_anchors(joints_deg);
        let ee = anchors[NUM_JOINTS - 1].body * self.ee_offset;
        calc_jacobian(&anchors, &ee.translation.vector)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a quaternion from roll, pitch and yaw in degrees.
pub fn quat_from_rpy_deg(rpy_deg: [f64; 3]) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(
        rpy_deg[0].to_radians(),
        rpy_deg[1].to_radians(),
        rpy_deg[2].to_radians(),
    )
}

fn isometry_from(position_m: [f64; 3], rpy_deg: [f64; 3]) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::from(Vector3::from(position_m)),
        quat_from_rpy_deg(rpy_deg),
    )
}
