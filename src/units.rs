//! Fixed-point units
//!
//! Every integer reading handled by this crate is the sensor-native unit
//! multiplied by [`FIXED_POINT_SCALE`]:
//! - acceleration: micro-g (1 g = 1_000_000)
//! - rotation: micro-degrees per second
//!
//! Keeping the scale explicit avoids sprinkling `1_000_000` literals around the
//! calibration targets and the orientation math.

/// Multiplier between native sensor units and the fixed-point integers
pub const FIXED_POINT_SCALE: i32 = 1_000_000;

/// Fixed-point representation of 1 g (the expected reading of the vertical axis at rest)
pub const TARGET_G: i32 = FIXED_POINT_SCALE;

/// Convert a fixed-point value to native units (g or °/s)
pub fn to_native_f32(value: i32) -> f32 {
    value as f32 / FIXED_POINT_SCALE as f32
}
