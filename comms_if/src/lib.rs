//! # Communications interface crate.
//!
//! Provides the telemetry record exported by the arm executable and the network server which
//! carries it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telemetry record definitions
pub mod tm;

/// Network module
pub mod net;
