//! Offset-corrected sampling
//!
//! Calibration only needs two things from the hardware side: a way to read a
//! corrected sample and a way to change the offsets applied to the following
//! samples. [`OffsetSampler`] captures exactly that. [`BiasedSampler`] implements it
//! in software on top of any [`SensorPort`]; a driver that applies offsets in the
//! device's own registers can implement the trait directly.

use crate::{
    port::{SensorPort, SensorPortAsync},
    sample::{OffsetVector, SensorSample},
};

/// A sample source whose readings are shifted by a settable offset vector.
pub trait OffsetSampler {
    /// Read one corrected sample
    fn sample(&mut self) -> SensorSample;

    /// Offsets currently applied
    fn offsets(&self) -> OffsetVector;

    /// Change the offsets applied to subsequent samples
    fn set_offsets(&mut self, offsets: OffsetVector);
}

/// Async twin of [`OffsetSampler`].
#[allow(async_fn_in_trait)]
pub trait OffsetSamplerAsync {
    /// Read one corrected sample
    async fn sample(&mut self) -> SensorSample;

    /// Offsets currently applied
    fn offsets(&self) -> OffsetVector;

    /// Change the offsets applied to subsequent samples
    fn set_offsets(&mut self, offsets: OffsetVector);
}

/// Adds an [`OffsetVector`] to every raw reading of the wrapped port.
pub struct BiasedSampler<S> {
    port: S,
    offsets: OffsetVector,
}

impl<S> BiasedSampler<S> {
    /// Wrap a port with zero offsets
    pub fn new(port: S) -> Self {
        Self::with_offsets(port, OffsetVector::zero())
    }

    /// Wrap a port with known offsets (e.g. the result of a previous calibration)
    pub fn with_offsets(port: S, offsets: OffsetVector) -> Self {
        Self { port, offsets }
    }

    pub fn port(&self) -> &S {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }

    /// Returns the underlying port, consuming this sampler.
    pub fn release(self) -> S {
        self.port
    }
}

impl<S> OffsetSampler for BiasedSampler<S>
where
    S: SensorPort,
{
    fn sample(&mut self) -> SensorSample {
        let accel = self.port.read_acceleration();
        let gyro = self.port.read_rotation();
        SensorSample::from_triples(accel, gyro).with_offsets(&self.offsets)
    }

    fn offsets(&self) -> OffsetVector {
        self.offsets
    }

    fn set_offsets(&mut self, offsets: OffsetVector) {
        self.offsets = offsets;
    }
}

impl<S> OffsetSamplerAsync for BiasedSampler<S>
where
    S: SensorPortAsync,
{
    async fn sample(&mut self) -> SensorSample {
        let accel = self.port.read_acceleration().await;
        let gyro = self.port.read_rotation().await;
        SensorSample::from_triples(accel, gyro).with_offsets(&self.offsets)
    }

    fn offsets(&self) -> OffsetVector {
        self.offsets
    }

    fn set_offsets(&mut self, offsets: OffsetVector) {
        self.offsets = offsets;
    }
}
