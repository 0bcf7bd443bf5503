use crate::units::to_native_f32;

/// One of the six sensor channels, in read order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Channel {
    Ax = 0,
    Ay = 1,
    Az = 2,
    Gx = 3,
    Gy = 4,
    Gz = 5,
}

impl Channel {
    /// All channels: accelerometer x, y, z then gyro x, y, z
    pub const ALL: [Channel; 6] = [
        Channel::Ax,
        Channel::Ay,
        Channel::Az,
        Channel::Gx,
        Channel::Gy,
        Channel::Gz,
    ];

    /// Position of the channel inside a sample
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_accel(self) -> bool {
        matches!(self, Self::Ax | Self::Ay | Self::Az)
    }

    pub const fn is_gyro(self) -> bool {
        !self.is_accel()
    }
}

/// Raw (or corrected) readings of all six channels, in fixed-point units
/// (see [`crate::units`]).
/// Also used to represent calibration offsets.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSample {
    pub(crate) ax: i32,
    pub(crate) ay: i32,
    pub(crate) az: i32,
    pub(crate) gx: i32,
    pub(crate) gy: i32,
    pub(crate) gz: i32,
}

/// Per-channel additive correction applied to raw readings.
pub type OffsetVector = SensorSample;

impl SensorSample {
    pub const fn new(ax: i32, ay: i32, az: i32, gx: i32, gy: i32, gz: i32) -> Self {
        Self {
            ax,
            ay,
            az,
            gx,
            gy,
            gz,
        }
    }

    /// All channels set to zero
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0, 0, 0)
    }

    /// Build a sample from the accelerometer and gyro triples returned by a port
    pub const fn from_triples(accel: (i32, i32, i32), gyro: (i32, i32, i32)) -> Self {
        Self::new(accel.0, accel.1, accel.2, gyro.0, gyro.1, gyro.2)
    }

    pub fn ax(&self) -> i32 {
        self.ax
    }

    pub fn ay(&self) -> i32 {
        self.ay
    }

    pub fn az(&self) -> i32 {
        self.az
    }

    pub fn gx(&self) -> i32 {
        self.gx
    }

    pub fn gy(&self) -> i32 {
        self.gy
    }

    pub fn gz(&self) -> i32 {
        self.gz
    }

    /// Accelerometer triple
    pub fn accel(&self) -> (i32, i32, i32) {
        (self.ax, self.ay, self.az)
    }

    /// Gyro triple
    pub fn gyro(&self) -> (i32, i32, i32) {
        (self.gx, self.gy, self.gz)
    }

    pub fn get(&self, channel: Channel) -> i32 {
        match channel {
            Channel::Ax => self.ax,
            Channel::Ay => self.ay,
            Channel::Az => self.az,
            Channel::Gx => self.gx,
            Channel::Gy => self.gy,
            Channel::Gz => self.gz,
        }
    }

    pub fn set(&mut self, channel: Channel, value: i32) {
        match channel {
            Channel::Ax => self.ax = value,
            Channel::Ay => self.ay = value,
            Channel::Az => self.az = value,
            Channel::Gx => self.gx = value,
            Channel::Gy => self.gy = value,
            Channel::Gz => self.gz = value,
        }
    }

    /// Apply offsets channel by channel.
    ///
    /// The addition saturates: a reading pushed past the `i32` range by a large
    /// offset is clamped instead of wrapping around to the opposite sign.
    pub fn with_offsets(&self, offsets: &OffsetVector) -> Self {
        let mut corrected = *self;
        for channel in Channel::ALL {
            corrected.set(
                channel,
                self.get(channel).saturating_add(offsets.get(channel)),
            );
        }
        corrected
    }

    /// Readings converted to native units (g and °/s)
    pub fn scaled(&self) -> ScaledSample {
        ScaledSample {
            ax: to_native_f32(self.ax),
            ay: to_native_f32(self.ay),
            az: to_native_f32(self.az),
            gx: to_native_f32(self.gx),
            gy: to_native_f32(self.gy),
            gz: to_native_f32(self.gz),
        }
    }
}

/// Readings in native units: acceleration in g, rotation in degrees per second.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaledSample {
    ax: f32,
    ay: f32,
    az: f32,
    gx: f32,
    gy: f32,
    gz: f32,
}

impl ScaledSample {
    pub fn ax(&self) -> f32 {
        self.ax
    }

    pub fn ay(&self) -> f32 {
        self.ay
    }

    pub fn az(&self) -> f32 {
        self.az
    }

    pub fn gx(&self) -> f32 {
        self.gx
    }

    pub fn gy(&self) -> f32 {
        self.gy
    }

    pub fn gz(&self) -> f32 {
        self.gz
    }
}

#[cfg(test)]
mod tests {
    use super::{Channel, SensorSample};
    use crate::units::TARGET_G;

    #[test]
    fn test_channel_access() {
        let mut sample = SensorSample::new(1, 2, 3, 4, 5, 6);
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
            assert_eq!(sample.get(*channel), i as i32 + 1);
        }
        sample.set(Channel::Gy, -50);
        assert_eq!(sample.gy(), -50);
        assert!(Channel::Az.is_accel());
        assert!(Channel::Gx.is_gyro());
    }

    #[test]
    fn test_with_offsets() {
        let raw = SensorSample::new(5000, -200, 995_000, 12, -7, 0);
        let offsets = SensorSample::new(-5000, 200, 5000, -12, 7, 0);
        assert_eq!(
            raw.with_offsets(&offsets),
            SensorSample::new(0, 0, TARGET_G, 0, 0, 0)
        );
    }

    #[test]
    fn test_with_offsets_saturates() {
        let raw = SensorSample::new(i32::MAX, i32::MIN, 0, 0, 0, 0);
        let offsets = SensorSample::new(10, -10, 0, 0, 0, 0);
        let corrected = raw.with_offsets(&offsets);
        assert_eq!(corrected.ax(), i32::MAX);
        assert_eq!(corrected.ay(), i32::MIN);
    }

    #[test]
    fn test_scaled() {
        let scaled = SensorSample::new(0, -500_000, TARGET_G, 250_000_000, 0, 0).scaled();
        assert_eq!(scaled.ay(), -0.5);
        assert_eq!(scaled.az(), 1.0);
        assert_eq!(scaled.gx(), 250.0);
    }
}
