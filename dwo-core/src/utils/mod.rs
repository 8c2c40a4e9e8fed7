//! Utility re-exports and helper macros for dead-wheel odometry.
//!
//! This module re-exports the estimator, the controller and timing, and provides
//! a helper macro for `'static` state:
//!
//! - `controllers`: encoder drivers and the periodic odometry controller
//! - `math`: rotation primitive and the three-wheel pose estimator
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod controllers;
pub mod math;

pub use controllers::OdometryController;
pub use embassy_time::*;
pub use math::odometry::{Pose, PoseEstimator, RobotConfig};
pub use math::rotation::Point2D;
#[doc(hidden)]
pub use static_cell::StaticCell;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `StaticCell` for type `$t` and initializes it with
/// `$val`, returning a mutable reference to the stored value. Each expansion
/// site may only run once.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: $crate::utils::StaticCell<$t> = $crate::utils::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
