//! Math utilities for dead-wheel odometry.
//!
//! - `rotation`: planar points and the rotation primitive.
//! - `odometry`: the pose estimator and its calibration.

pub mod odometry;
pub mod rotation;
