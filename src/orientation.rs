//! Pitch and roll estimation with a complementary filter
//!
//! The accelerometer gives a drift-free but noisy angle, an integrated rate gives
//! a smooth angle that drifts. The filter blends both every cycle:
//!
//! ```text
//! pitch = α·(pitch + ax·s·dt) + (1 - α)·accel_pitch
//! roll  = α·(roll  - ay·s·dt) + (1 - α)·accel_roll
//! ```
//!
//! The integrated rate is the fixed-point accelerometer reading, a stand-in for
//! a true gyro rate, multiplied by the rate scale `s`. The default scale is 1;
//! use `1.0 / FIXED_POINT_SCALE as f64` to integrate in g.

use crate::{
    sample::SensorSample,
    sampler::{OffsetSampler, OffsetSamplerAsync},
    tilt::TiltAngles,
};

/// Default weight of the integrated estimate
pub const DEFAULT_ALPHA: f64 = 0.98;

/// Default factor applied to the fixed-point rate before integrating it
pub const DEFAULT_RATE_SCALE: f64 = 1.0;

/// Pitch angle (degrees) derived from the accelerometer alone
pub fn accel_pitch(sample: &SensorSample) -> f64 {
    let x = sample.ax() as f64;
    let y = sample.ay() as f64;
    let z = sample.az() as f64;
    libm::atan2(y, libm::sqrt(x * x + z * z)).to_degrees()
}

/// Roll angle (degrees) derived from the accelerometer alone
pub fn accel_roll(sample: &SensorSample) -> f64 {
    let x = sample.ax() as f64;
    let y = sample.ay() as f64;
    let z = sample.az() as f64;
    libm::atan2(-x, libm::sqrt(y * y + z * z)).to_degrees()
}

/// Running filter output, kept across read cycles.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrientationState {
    /// Pitch in degrees
    pub pitch: f64,
    /// Roll in degrees
    pub roll: f64,
    /// Caller clock timestamp of the last update, in microseconds
    pub last_update_us: Option<u64>,
}

/// Everything derived from one corrected sample.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Orientation {
    /// Instantaneous tilt angles
    pub tilt: TiltAngles,
    /// Filtered pitch in degrees
    pub pitch: f64,
    /// Filtered roll in degrees
    pub roll: f64,
}

/// Complementary filter over pitch and roll.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ComplementaryFilter {
    state: OrientationState,
    alpha: f64,
    rate_scale: f64,
}

impl Default for ComplementaryFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl ComplementaryFilter {
    /// New filter starting level; `alpha` is clamped to `[0, 1]`
    pub fn new(alpha: f64) -> Self {
        Self::with_state(alpha, OrientationState::default())
    }

    /// Resume from a previous state
    pub fn with_state(alpha: f64, state: OrientationState) -> Self {
        Self {
            state,
            alpha: alpha.clamp(0.0, 1.0),
            rate_scale: DEFAULT_RATE_SCALE,
        }
    }

    /// Change the factor applied to the integrated rate
    pub fn with_rate_scale(mut self, rate_scale: f64) -> Self {
        self.rate_scale = rate_scale;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn rate_scale(&self) -> f64 {
        self.rate_scale
    }

    pub fn state(&self) -> OrientationState {
        self.state
    }

    pub fn pitch(&self) -> f64 {
        self.state.pitch
    }

    pub fn roll(&self) -> f64 {
        self.state.roll
    }

    /// Back to level, forgetting the last timestamp
    pub fn reset(&mut self) {
        self.state = OrientationState::default();
    }

    /// Advance the filter by `dt` seconds; returns `(pitch, roll)` in degrees
    pub fn update(&mut self, sample: &SensorSample, dt: f64) -> (f64, f64) {
        let alpha = self.alpha;
        let scale = self.rate_scale;
        let state = &mut self.state;

        state.pitch += sample.ax() as f64 * scale * dt;
        state.roll -= sample.ay() as f64 * scale * dt;

        state.pitch = alpha * state.pitch + (1.0 - alpha) * accel_pitch(sample);
        state.roll = alpha * state.roll + (1.0 - alpha) * accel_roll(sample);

        (state.pitch, state.roll)
    }

    /// Advance the filter to `now_us` (caller clock, microseconds).
    ///
    /// The first update after creation or [`reset`](Self::reset) uses `dt = 0`;
    /// a clock going backwards is treated the same way.
    pub fn update_at(&mut self, sample: &SensorSample, now_us: u64) -> (f64, f64) {
        let dt = match self.state.last_update_us {
            Some(last) => now_us.saturating_sub(last) as f64 / 1_000_000.0,
            None => 0.0,
        };
        self.state.last_update_us = Some(now_us);
        self.update(sample, dt)
    }

    /// Tilt angles plus the filter advanced by `dt` seconds
    pub fn estimate(&mut self, sample: &SensorSample, dt: f64) -> Orientation {
        let (pitch, roll) = self.update(sample, dt);
        Orientation {
            tilt: TiltAngles::from(sample),
            pitch,
            roll,
        }
    }
}

/// Read one corrected sample and derive the orientation from it
pub fn estimate_orientation<S>(
    sampler: &mut S,
    filter: &mut ComplementaryFilter,
    dt: f64,
) -> Orientation
where
    S: OffsetSampler,
{
    let sample = sampler.sample();
    filter.estimate(&sample, dt)
}

/// Async twin of [`estimate_orientation`]
pub async fn estimate_orientation_async<S>(
    sampler: &mut S,
    filter: &mut ComplementaryFilter,
    dt: f64,
) -> Orientation
where
    S: OffsetSamplerAsync,
{
    let sample = sampler.sample().await;
    filter.estimate(&sample, dt)
}

#[cfg(test)]
mod tests {
    use super::{
        accel_pitch, accel_roll, estimate_orientation, estimate_orientation_async,
        ComplementaryFilter, DEFAULT_ALPHA, DEFAULT_RATE_SCALE,
    };
    use crate::{
        sample::SensorSample,
        sampler::BiasedSampler,
        testing::ConstantSensor,
        units::{FIXED_POINT_SCALE, TARGET_G},
    };
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_accel_angles() {
        let level = SensorSample::new(0, 0, TARGET_G, 0, 0, 0);
        assert_eq!(accel_pitch(&level), 0.0);
        assert_eq!(accel_roll(&level), 0.0);

        let nose_up = SensorSample::new(-TARGET_G, 0, 0, 0, 0, 0);
        assert_abs_diff_eq!(accel_roll(&nose_up), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(accel_pitch(&nose_up), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_alpha_one_only_integrates() {
        let mut filter = ComplementaryFilter::new(1.0);
        let sample = SensorSample::new(500_000, -250_000, 800_000, 0, 0, 0);

        for _ in 0..3 {
            filter.update(&sample, 0.1);
        }

        assert_abs_diff_eq!(filter.pitch(), 150_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(filter.roll(), 75_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rate_is_integrated_on_raw_values() {
        let mut filter = ComplementaryFilter::default();
        assert_eq!(filter.rate_scale(), DEFAULT_RATE_SCALE);

        let sample = SensorSample::new(100_000, -50_000, 990_000, 0, 0, 0);
        let (pitch, roll) = filter.update(&sample, 0.01);

        // 0.98·(100_000·0.01) + 0.02·accel_pitch
        let expected_pitch = 0.98 * 1000.0 + 0.02 * accel_pitch(&sample);
        let expected_roll = 0.98 * 500.0 + 0.02 * accel_roll(&sample);
        assert_abs_diff_eq!(pitch, expected_pitch, epsilon = 1e-9);
        assert_abs_diff_eq!(roll, expected_roll, epsilon = 1e-9);
    }

    #[test]
    fn test_native_rate_scale() {
        let mut filter =
            ComplementaryFilter::new(1.0).with_rate_scale(1.0 / FIXED_POINT_SCALE as f64);
        let sample = SensorSample::new(500_000, -250_000, 800_000, 0, 0, 0);

        filter.update(&sample, 0.1);

        assert_abs_diff_eq!(filter.pitch(), 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(filter.roll(), 0.025, epsilon = 1e-12);
    }

    #[test]
    fn test_alpha_zero_follows_accelerometer() {
        let mut filter = ComplementaryFilter::new(0.0);
        let samples = [
            SensorSample::new(0, 500_000, 866_025, 0, 0, 0),
            SensorSample::new(-300_000, 0, 950_000, 0, 0, 0),
            SensorSample::new(100_000, -700_000, 700_000, 0, 0, 0),
        ];

        for sample in samples.iter() {
            let (pitch, roll) = filter.update(sample, 0.5);
            assert_eq!(pitch, accel_pitch(sample));
            assert_eq!(roll, accel_roll(sample));
        }
        assert_abs_diff_eq!(filter.pitch(), -45.0, epsilon = 0.5);
    }

    #[test]
    fn test_converges_to_accelerometer_angle() {
        let mut filter = ComplementaryFilter::default();
        let sample = SensorSample::new(0, 500_000, 866_025, 0, 0, 0);
        let target = accel_pitch(&sample);

        for n in 1..=10 {
            filter.update(&sample, 0.0);
            let expected = (1.0 - libm::pow(DEFAULT_ALPHA, n as f64)) * target;
            assert_abs_diff_eq!(filter.pitch(), expected, epsilon = 1e-9);
        }
        for _ in 0..1000 {
            filter.update(&sample, 0.0);
        }
        assert_abs_diff_eq!(filter.pitch(), target, epsilon = 1e-6);
        assert_abs_diff_eq!(target, 30.0, epsilon = 1e-3);
    }

    #[test]
    fn test_update_at_uses_elapsed_time() {
        let mut filter = ComplementaryFilter::new(1.0);
        let sample = SensorSample::new(TARGET_G, 0, 0, 0, 0, 0);

        filter.update_at(&sample, 1_000_000);
        assert_eq!(filter.pitch(), 0.0);
        assert_eq!(filter.state().last_update_us, Some(1_000_000));

        filter.update_at(&sample, 1_500_000);
        assert_abs_diff_eq!(filter.pitch(), 500_000.0, epsilon = 1e-6);

        // clock going backwards contributes nothing
        filter.update_at(&sample, 1_200_000);
        assert_abs_diff_eq!(filter.pitch(), 500_000.0, epsilon = 1e-6);

        filter.reset();
        assert_eq!(filter.state().last_update_us, None);
        assert_eq!(filter.pitch(), 0.0);
    }

    #[test]
    fn test_alpha_is_clamped() {
        assert_eq!(ComplementaryFilter::new(1.5).alpha(), 1.0);
        assert_eq!(ComplementaryFilter::new(-0.2).alpha(), 0.0);
        assert_eq!(ComplementaryFilter::default().alpha(), DEFAULT_ALPHA);
    }

    #[test]
    fn test_estimate_orientation_uses_offsets() {
        let port = ConstantSensor::new(SensorSample::new(5000, -3000, 995_000, 10, 10, 10));
        let mut sampler =
            BiasedSampler::with_offsets(port, SensorSample::new(-5000, 3000, 5000, 0, 0, 0));
        let mut filter = ComplementaryFilter::new(0.0);

        let orientation = estimate_orientation(&mut sampler, &mut filter, 0.01);
        assert_eq!(orientation.tilt.x, 0.0);
        assert_eq!(orientation.tilt.y, 0.0);
        assert_eq!(orientation.tilt.z, 0.0);
        assert_eq!(orientation.pitch, 0.0);
        assert_eq!(orientation.roll, 0.0);

        let orientation = embassy_futures::block_on(estimate_orientation_async(
            &mut sampler,
            &mut filter,
            0.01,
        ));
        assert_eq!(orientation.pitch, 0.0);
        assert_eq!(sampler.release().reads(), 2);
    }
}
