//! Three dead-wheel odometry for robots on no-std embedded platforms.
//!
//! For a runnable host simulation, see the `mock-mcu` application.
#![cfg_attr(not(test), no_std)]

pub mod utils;
