//! Calibration building blocks shared by the blocking and async loops.
//!
//! The loop itself lives in [`crate::calibration_blocking`] and
//! [`crate::calibration_async`]; everything here is pure computation.

use crate::{
    error::CalibrationError,
    sample::{Channel, OffsetVector, SensorSample},
    units::TARGET_G,
};

/// Number of settle samples discarded before each mean computation
pub const DISCARD_SAMPLES: usize = 101;
/// Number of samples averaged into each mean
pub const WINDOW_SAMPLES: usize = 1000;
/// Delay between consecutive samples
pub const SAMPLE_DELAY_MS: u32 = 1;
/// Accelerometer tolerance around the channel target (micro-g)
pub const ACCEL_DEAD_ZONE: i32 = 1000;
/// Gyro tolerance around zero (micro-degrees per second)
pub const GYRO_DEAD_ZONE: i32 = 1000;
/// Proportional correction divisor for accelerometer channels
pub const ACCEL_DIVISOR: i32 = 8;
/// Proportional correction divisor for gyro channels
pub const GYRO_DIVISOR: i32 = 4;
/// Correction iterations allowed before giving up.
///
/// Each iteration shrinks the remaining error by a factor `1 - k / divisor`, where
/// `k` is how much of an offset change shows up in the readings (1 for software
/// offsets). With the default divisors this covers `0.1 <= k <= 1` for initial
/// errors up to 20 dead zones wide (about 240 iterations at `k = 0.1`).
pub const MAX_ITERATIONS: usize = 300;

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// `offset + (target - mean) / divisor`, truncating toward zero and saturating
fn proportional_step(offset: i32, target: i32, mean: i32, divisor: i32) -> i32 {
    let error = target as i64 - mean as i64;
    let step = error.checked_div(divisor as i64).unwrap_or(0);
    clamp_i32(offset as i64 + step)
}

/// Tolerance band around a channel target within which the channel is calibrated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct DeadZone {
    value: i32,
}

impl DeadZone {
    pub const fn new(value: i32) -> Self {
        Self {
            value: value.saturating_abs(),
        }
    }

    /// Get the half-width of the band
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Check if `value` lies within the band centered on `target`
    pub fn is_value_within(self, target: i32, value: i32) -> bool {
        (target as i64 - value as i64).unsigned_abs() <= self.value as u64
    }

    /// If the current mean is not acceptable, compute the next offset.
    ///
    /// This is a purely proportional step: the remaining error (`target - mean`)
    /// divided by `divisor` is added to the current offset. Integer division
    /// truncates toward zero, so errors smaller than `divisor` produce no change;
    /// the band must be wider than the divisor for the loop to settle.
    pub fn next_offset(self, target: i32, mean: i32, current_offset: i32, divisor: i32) -> i32 {
        if self.is_value_within(target, mean) {
            current_offset
        } else {
            proportional_step(current_offset, target, mean, divisor)
        }
    }
}

/// Axis and direction of gravity while the sensor rests during calibration.
///
/// The named axis targets `±TARGET_G`, every other channel targets zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ReferenceGravity {
    Zero,
    XN,
    XP,
    YN,
    YP,
    ZN,
    /// Sensor flat, package facing up
    #[default]
    ZP,
}

impl ReferenceGravity {
    /// Expected mean readings of a perfectly calibrated sensor at rest
    pub fn target(self) -> SensorSample {
        match self {
            Self::Zero => SensorSample::zero(),
            Self::XN => SensorSample::new(-TARGET_G, 0, 0, 0, 0, 0),
            Self::XP => SensorSample::new(TARGET_G, 0, 0, 0, 0, 0),
            Self::YN => SensorSample::new(0, -TARGET_G, 0, 0, 0, 0),
            Self::YP => SensorSample::new(0, TARGET_G, 0, 0, 0, 0),
            Self::ZN => SensorSample::new(0, 0, -TARGET_G, 0, 0, 0),
            Self::ZP => SensorSample::new(0, 0, TARGET_G, 0, 0, 0),
        }
    }
}

/// Bit flags stating which channels are still outside their dead zone
/// (six bits are used: acceleration x, y, z and gyro x, y, z)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct CalibrationActions {
    flags: u8,
}

impl CalibrationActions {
    const ALL: u8 = 0x3f;

    /// Build an empty bit set
    pub fn empty() -> Self {
        Self { flags: 0 }
    }

    /// Build a full bit set
    pub fn all() -> Self {
        Self { flags: Self::ALL }
    }

    /// Check if we have nothing more to calibrate
    pub fn is_empty(self) -> bool {
        self.flags == 0
    }

    /// Check if the given channel still needs a correction
    pub fn contains(self, channel: Channel) -> bool {
        self.flags & (1 << channel.index()) != 0
    }

    /// Set or clear the flag of the given channel
    pub fn with_channel(self, channel: Channel, value: bool) -> Self {
        let flag = 1 << channel.index();
        Self {
            flags: if value {
                self.flags | flag
            } else {
                self.flags & !flag
            },
        }
    }

    /// Number of channels still outside their dead zone
    pub fn pending_count(self) -> u32 {
        self.flags.count_ones()
    }

    /// Number of channels inside their dead zone (0 to 6)
    pub fn ready_count(self) -> u32 {
        6 - self.pending_count()
    }
}

/// Calibration parameters.
/// (all the values that influence calibration and do not change between calibration loop runs)
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct CalibrationParameters {
    /// Accelerometer dead zone
    pub accel_dead_zone: DeadZone,
    /// Gyro dead zone
    pub gyro_dead_zone: DeadZone,
    /// Settle samples discarded before each mean
    pub discard: usize,
    /// Samples averaged into each mean
    pub window: usize,
    /// Delay between consecutive samples
    pub sample_delay_ms: u32,
    /// Correction iterations allowed before reporting non-convergence
    pub max_iterations: usize,
    /// Reference gravity (defines the accelerometer targets)
    pub gravity: ReferenceGravity,
    /// Proportional correction divisor for accelerometer channels
    pub accel_divisor: i32,
    /// Proportional correction divisor for gyro channels
    pub gyro_divisor: i32,
    /// Offsets applied while taking the first mean
    pub initial_offsets: OffsetVector,
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl CalibrationParameters {
    /// Defaults for a sensor resting flat, package facing up
    pub const DEFAULT: Self = Self::new(ReferenceGravity::ZP);

    /// Create calibration parameters for a given reference gravity
    /// (sensible defaults are used for all other parameters)
    pub const fn new(gravity: ReferenceGravity) -> Self {
        Self {
            accel_dead_zone: DeadZone::new(ACCEL_DEAD_ZONE),
            gyro_dead_zone: DeadZone::new(GYRO_DEAD_ZONE),
            discard: DISCARD_SAMPLES,
            window: WINDOW_SAMPLES,
            sample_delay_ms: SAMPLE_DELAY_MS,
            max_iterations: MAX_ITERATIONS,
            gravity,
            accel_divisor: ACCEL_DIVISOR,
            gyro_divisor: GYRO_DIVISOR,
            initial_offsets: OffsetVector::zero(),
        }
    }

    /// Change accelerometer dead zone
    /// (consumes and returns `Self` to be callable in a "builder-like" pattern)
    pub fn with_accel_dead_zone(self, value: i32) -> Self {
        Self {
            accel_dead_zone: DeadZone::new(value),
            ..self
        }
    }

    /// Change gyro dead zone
    pub fn with_gyro_dead_zone(self, value: i32) -> Self {
        Self {
            gyro_dead_zone: DeadZone::new(value),
            ..self
        }
    }

    /// Change the number of discarded settle samples
    pub fn with_discard(self, discard: usize) -> Self {
        Self { discard, ..self }
    }

    /// Change the averaging window size
    pub fn with_window(self, window: usize) -> Self {
        Self { window, ..self }
    }

    /// Change the delay between samples
    pub fn with_sample_delay_ms(self, sample_delay_ms: u32) -> Self {
        Self {
            sample_delay_ms,
            ..self
        }
    }

    /// Change the iteration cap
    /// (see [`MAX_ITERATIONS`] for the range of sensors the default covers)
    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Change the reference gravity
    pub fn with_gravity(self, gravity: ReferenceGravity) -> Self {
        Self { gravity, ..self }
    }

    /// Change the proportional correction divisors
    pub fn with_divisors(self, accel_divisor: i32, gyro_divisor: i32) -> Self {
        Self {
            accel_divisor,
            gyro_divisor,
            ..self
        }
    }

    /// Start from known offsets instead of zero
    pub fn with_initial_offsets(self, initial_offsets: OffsetVector) -> Self {
        Self {
            initial_offsets,
            ..self
        }
    }

    /// Reject parameters the loop cannot work with
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.window == 0 {
            return Err(CalibrationError::EmptyWindow);
        }
        if self.accel_divisor == 0 || self.gyro_divisor == 0 {
            return Err(CalibrationError::InvalidDivisor);
        }
        Ok(())
    }

    pub fn dead_zone(&self, channel: Channel) -> DeadZone {
        if channel.is_accel() {
            self.accel_dead_zone
        } else {
            self.gyro_dead_zone
        }
    }

    pub fn divisor(&self, channel: Channel) -> i32 {
        if channel.is_accel() {
            self.accel_divisor
        } else {
            self.gyro_divisor
        }
    }

    /// Expected calibrated mean of a channel
    pub fn target(&self, channel: Channel) -> i32 {
        self.gravity.target().get(channel)
    }

    /// Channels whose mean is outside the dead zone
    pub fn pending_channels(&self, mean: &SensorSample) -> CalibrationActions {
        Channel::ALL
            .iter()
            .fold(CalibrationActions::empty(), |actions, &channel| {
                let within = self
                    .dead_zone(channel)
                    .is_value_within(self.target(channel), mean.get(channel));
                actions.with_channel(channel, !within)
            })
    }

    /// Proportional correction for one channel, regardless of its dead zone
    fn corrected(&self, channel: Channel, mean: &SensorSample, offset: i32) -> i32 {
        proportional_step(
            offset,
            self.target(channel),
            mean.get(channel),
            self.divisor(channel),
        )
    }
}

/// Holds temporary values during sample mean computation.
///
/// Sums are kept in 64 bits: a full window of readings near the `i32` limits
/// would overflow a 32-bit accumulator after only a couple of samples.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct MeanAccumulator {
    sums: [i64; 6],
    count: usize,
    window: usize,
}

impl MeanAccumulator {
    /// Initializes the sums with zero values for a window of `window` samples
    pub fn new(window: usize) -> Result<Self, CalibrationError> {
        if window == 0 {
            return Err(CalibrationError::EmptyWindow);
        }
        Ok(Self {
            sums: [0; 6],
            count: 0,
            window,
        })
    }

    /// Adds a new sample
    pub fn add(&mut self, sample: &SensorSample) {
        for channel in Channel::ALL {
            self.sums[channel.index()] += sample.get(channel) as i64;
        }
        self.count += 1;
    }

    /// Number of samples added so far
    pub fn count(&self) -> usize {
        self.count
    }

    /// Compute average values (consumes `self` because the computation is done).
    ///
    /// Sums are divided by the window size, truncating toward zero.
    pub fn means(self) -> SensorSample {
        let mut mean = SensorSample::zero();
        for channel in Channel::ALL {
            mean.set(
                channel,
                clamp_i32(self.sums[channel.index()] / self.window as i64),
            );
        }
        mean
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CalibrationPhase {
    Converging,
    Done,
}

/// Structured snapshot emitted after every calibration iteration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct CalibrationProgress {
    /// 1-based iteration number (0 for the initial mean)
    pub iteration: usize,
    /// Offsets applied while the mean was collected
    pub offsets: OffsetVector,
    /// Mean readings under `offsets`
    pub mean: SensorSample,
    /// Offsets that will be committed by the next iteration
    pub tentative: OffsetVector,
    /// Channels outside their dead zone in this iteration
    pub pending: CalibrationActions,
}

impl CalibrationProgress {
    pub fn is_converged(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn ready_count(&self) -> u32 {
        self.pending.ready_count()
    }
}

/// Receives calibration progress; reporting is left entirely to the implementor.
pub trait CalibrationObserver {
    fn on_progress(&mut self, progress: &CalibrationProgress);
}

impl<F> CalibrationObserver for F
where
    F: FnMut(&CalibrationProgress),
{
    fn on_progress(&mut self, progress: &CalibrationProgress) {
        self(progress)
    }
}

/// Observer discarding every update
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopObserver;

impl CalibrationObserver for NoopObserver {
    fn on_progress(&mut self, _progress: &CalibrationProgress) {}
}

/// State of a calibration run: the offsets, the last mean and the convergence bookkeeping.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct CalibrationState {
    phase: CalibrationPhase,
    offsets: OffsetVector,
    tentative: OffsetVector,
    mean: SensorSample,
    pending: CalibrationActions,
    iterations: usize,
}

impl CalibrationState {
    /// Start a run from the mean observed under `offsets`.
    ///
    /// If every channel is already inside its dead zone the run is immediately
    /// [`CalibrationPhase::Done`] and `offsets` are kept as they are. Otherwise the
    /// first correction is applied to all six channels to form the initial guess.
    pub fn start(
        parameters: &CalibrationParameters,
        offsets: OffsetVector,
        mean: SensorSample,
    ) -> Self {
        let pending = parameters.pending_channels(&mean);
        let mut tentative = offsets;
        let phase = if pending.is_empty() {
            CalibrationPhase::Done
        } else {
            for channel in Channel::ALL {
                tentative.set(
                    channel,
                    parameters.corrected(channel, &mean, offsets.get(channel)),
                );
            }
            CalibrationPhase::Converging
        };

        Self {
            phase,
            offsets,
            tentative,
            mean,
            pending,
            iterations: 0,
        }
    }

    /// Make the tentative offsets the live ones and return them
    pub fn commit(&mut self) -> OffsetVector {
        self.offsets = self.tentative;
        self.offsets
    }

    /// Test the mean collected under the committed offsets and prepare the next guess.
    ///
    /// Readiness is recomputed from scratch: a channel that was ready in a previous
    /// iteration and drifted out again gets corrected again.
    pub fn evaluate(
        &mut self,
        parameters: &CalibrationParameters,
        mean: SensorSample,
    ) -> CalibrationProgress {
        self.iterations += 1;
        self.mean = mean;
        self.pending = parameters.pending_channels(&mean);

        for channel in Channel::ALL {
            if self.pending.contains(channel) {
                let next = parameters.dead_zone(channel).next_offset(
                    parameters.target(channel),
                    mean.get(channel),
                    self.tentative.get(channel),
                    parameters.divisor(channel),
                );
                self.tentative.set(channel, next);
            }
        }

        if self.pending.is_empty() {
            self.phase = CalibrationPhase::Done;
        }

        self.progress()
    }

    pub fn progress(&self) -> CalibrationProgress {
        CalibrationProgress {
            iteration: self.iterations,
            offsets: self.offsets,
            mean: self.mean,
            tentative: self.tentative,
            pending: self.pending,
        }
    }

    /// Error describing the run as it stands
    pub fn not_converged(&self) -> CalibrationError {
        CalibrationError::NotConverged {
            iterations: self.iterations,
            mean: self.mean,
            offsets: self.offsets,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == CalibrationPhase::Done
    }

    /// Offsets committed by the last iteration
    pub fn offsets(&self) -> OffsetVector {
        self.offsets
    }

    pub fn tentative(&self) -> OffsetVector {
        self.tentative
    }

    pub fn mean(&self) -> SensorSample {
        self.mean
    }

    pub fn pending(&self) -> CalibrationActions {
        self.pending
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}
