//! Instantaneous tilt from the accelerometer
//!
//! At rest the accelerometer measures only gravity, so the angle between each
//! device axis and the gravity vector follows from the current reading alone:
//! - x: atan2(ay, sqrt(ax² + az²))
//! - y: atan2(ax, sqrt(ay² + az²))
//! - z: atan2(sqrt(ax² + ay²), az), the inclination of the Z axis from vertical
//!
//! The ratio between channels is all that matters, so fixed-point readings are
//! used directly without rescaling.

use crate::sample::SensorSample;

/// Tilt angles in degrees, all zero when the sensor lies flat.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TiltAngles {
    /// Tilt around the X axis, -90° to 90°
    pub x: f32,
    /// Tilt around the Y axis, -90° to 90°
    pub y: f32,
    /// Inclination of the Z axis from vertical, 0° to 180°
    pub z: f32,
}

impl From<&SensorSample> for TiltAngles {
    fn from(sample: &SensorSample) -> Self {
        let x = sample.ax() as f64;
        let y = sample.ay() as f64;
        let z = sample.az() as f64;

        Self {
            x: libm::atan2(y, libm::sqrt(x * x + z * z)).to_degrees() as f32,
            y: libm::atan2(x, libm::sqrt(y * y + z * z)).to_degrees() as f32,
            z: libm::atan2(libm::sqrt(x * x + y * y), z).to_degrees() as f32,
        }
    }
}

impl From<SensorSample> for TiltAngles {
    fn from(sample: SensorSample) -> Self {
        Self::from(&sample)
    }
}
