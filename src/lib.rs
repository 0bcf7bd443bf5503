#![no_std]
//! Bias calibration and orientation estimation for six-axis inertial sensors
//! (MPU-6050 class accelerometer + gyroscope).
//!
//! - [`calibration_blocking`] / [`calibration_async`]: windowed averaging and the
//!   proportional offset-correction loop
//! - [`orientation`]: tilt angles and a complementary filter over pitch and roll
//!
//! All readings are fixed-point integers, see [`units`].

mod fmt;

pub mod calibration;
pub mod calibration_async;
pub mod calibration_blocking;
pub mod error;
pub mod orientation;
pub mod port;
pub mod sample;
pub mod sampler;
pub mod tilt;
pub mod units;

#[cfg(test)]
mod testing;
