//! Synthetic sensors and delays used by the unit tests.

use crate::{
    port::{SensorPort, SensorPortAsync},
    sample::{Channel, OffsetVector, SensorSample},
    sampler::{OffsetSampler, OffsetSamplerAsync},
};

/// Delay that returns immediately and keeps track of the requested time.
#[derive(Default)]
pub struct NoopDelay {
    pub total_ns: u64,
}

impl embedded_hal::delay::DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

impl embedded_hal_async::delay::DelayNs for NoopDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

/// Port returning the same reading forever.
pub struct ConstantSensor {
    sample: SensorSample,
    reads: usize,
}

impl ConstantSensor {
    pub fn new(sample: SensorSample) -> Self {
        Self { sample, reads: 0 }
    }

    /// Number of complete (accel + gyro) reads
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl SensorPort for ConstantSensor {
    fn read_acceleration(&mut self) -> (i32, i32, i32) {
        self.reads += 1;
        self.sample.accel()
    }

    fn read_rotation(&mut self) -> (i32, i32, i32) {
        self.sample.gyro()
    }
}

impl SensorPortAsync for ConstantSensor {
    async fn read_acceleration(&mut self) -> (i32, i32, i32) {
        SensorPort::read_acceleration(self)
    }

    async fn read_rotation(&mut self) -> (i32, i32, i32) {
        SensorPort::read_rotation(self)
    }
}

/// Port returning `settle` for the first `settle_reads` reads, then `steady`.
pub struct ScriptedSensor {
    settle: SensorSample,
    steady: SensorSample,
    settle_reads: usize,
    reads: usize,
}

impl ScriptedSensor {
    pub fn new(settle: SensorSample, settle_reads: usize, steady: SensorSample) -> Self {
        Self {
            settle,
            steady,
            settle_reads,
            reads: 0,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    fn current(&self) -> SensorSample {
        if self.reads <= self.settle_reads {
            self.settle
        } else {
            self.steady
        }
    }
}

impl SensorPort for ScriptedSensor {
    fn read_acceleration(&mut self) -> (i32, i32, i32) {
        self.reads += 1;
        self.current().accel()
    }

    fn read_rotation(&mut self) -> (i32, i32, i32) {
        self.current().gyro()
    }
}

/// Sampler whose corrected reading is an affine function of the applied offset:
/// `reading = base + k * offset`.
///
/// `k = 1` is a plain software offset, `0 < k < 1` models a device whose offset
/// registers are coarser than its readings, `k = 0` a sensor ignoring offsets.
pub struct AffineSampler {
    base: SensorSample,
    k: f64,
    offsets: OffsetVector,
    samples: usize,
}

impl AffineSampler {
    pub fn new(base: SensorSample, k: f64) -> Self {
        Self {
            base,
            k,
            offsets: OffsetVector::zero(),
            samples: 0,
        }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    fn reading(&mut self) -> SensorSample {
        self.samples += 1;
        let mut sample = SensorSample::zero();
        for channel in Channel::ALL {
            let shift = libm::round(self.k * self.offsets.get(channel) as f64) as i64;
            let value = self.base.get(channel) as i64 + shift;
            sample.set(channel, value.clamp(i32::MIN as i64, i32::MAX as i64) as i32);
        }
        sample
    }
}

impl OffsetSampler for AffineSampler {
    fn sample(&mut self) -> SensorSample {
        self.reading()
    }

    fn offsets(&self) -> OffsetVector {
        self.offsets
    }

    fn set_offsets(&mut self, offsets: OffsetVector) {
        self.offsets = offsets;
    }
}

impl OffsetSamplerAsync for AffineSampler {
    async fn sample(&mut self) -> SensorSample {
        self.reading()
    }

    fn offsets(&self) -> OffsetVector {
        self.offsets
    }

    fn set_offsets(&mut self, offsets: OffsetVector) {
        self.offsets = offsets;
    }
}
