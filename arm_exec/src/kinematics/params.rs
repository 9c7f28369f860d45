//! Parameters describing the geometry of the arm's chain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Geometry of the whole chain.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ChainParams {
    /// One entry per joint, ordered from the base outwards.
    pub links: Vec<LinkParams>,

    /// Position of the end effector in the last joint's body frame.
    ///
    /// Units: meters
    pub ee_offset_m: [f64; 3],

    /// Orientation of the end effector in the last joint's body frame, as
    /// roll, pitch, yaw.
    ///
    /// Units: degrees
    pub ee_offset_rpy_deg: [f64; 3],
}

/// Geometry of a single link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkParams {
    /// Rest position of the link's body in its parent's body frame.
    ///
    /// Units: meters
    pub origin_m: [f64; 3],

    /// Rest orientation of the link's body in its parent's body frame.
    ///
    /// Units: degrees
    pub origin_rpy_deg: [f64; 3],

    /// Position of the joint anchor in the link's body frame.
    ///
    /// Units: meters
    pub anchor_m: [f64; 3],

    /// Orientation of the joint anchor in the link's body frame. The joint
    /// rotates about the X axis of this frame.
    ///
    /// Units: degrees
    pub anchor_rpy_deg: [f64; 3],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ChainParamsError {
    #[error("Expected 6 links in the chain, found {0}")]
    WrongNumLinks(usize),
}
