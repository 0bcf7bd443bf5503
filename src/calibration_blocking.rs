//! Blocking Calibration Implementation
//!
//! This module provides synchronous (blocking) versions of the calibration routines:
//! - Collecting windowed means of corrected readings
//! - Computing calibration offsets
//! - Driving the correction loop until every channel is inside its dead zone
//!
//! The loop is bounded by [`CalibrationParameters::max_iterations`]; a sensor that
//! cannot be brought into its dead zones yields [`CalibrationError::NotConverged`].

use crate::{
    calibration::{
        CalibrationObserver, CalibrationParameters, CalibrationProgress, CalibrationState,
        MeanAccumulator, NoopObserver,
    },
    error::CalibrationError,
    port::SensorPort,
    sample::{OffsetVector, SensorSample},
    sampler::{BiasedSampler, OffsetSampler},
};
use embedded_hal::delay::DelayNs;

/// Compute the mean of a window of corrected readings.
///
/// The first `parameters.discard` samples are read and thrown away so the bus and
/// the sensor can settle; the next `parameters.window` samples are averaged.
pub fn collect_mean_values<S>(
    sampler: &mut S,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
) -> Result<SensorSample, CalibrationError>
where
    S: OffsetSampler,
{
    let mut accumulator = MeanAccumulator::new(parameters.window)?;

    for _ in 0..parameters.discard {
        _ = sampler.sample();
        delay.delay_ms(parameters.sample_delay_ms);
    }

    for _ in 0..parameters.window {
        let sample = sampler.sample();
        accumulator.add(&sample);
        delay.delay_ms(parameters.sample_delay_ms);
    }

    Ok(accumulator.means())
}

/// A single, full-fledged calibration iteration: commit the tentative offsets,
/// measure, and prepare the next guess.
pub fn calibration_loop<S>(
    sampler: &mut S,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
    state: &mut CalibrationState,
) -> Result<CalibrationProgress, CalibrationError>
where
    S: OffsetSampler,
{
    sampler.set_offsets(state.commit());
    let mean = collect_mean_values(sampler, delay, parameters)?;
    Ok(state.evaluate(parameters, mean))
}

/// Repeatedly perform calibration iterations until the means are within the dead zones,
/// reporting every iteration to `observer`.
///
/// On success the sampler is left with the returned offsets applied. On
/// [`CalibrationError::NotConverged`] it keeps the offsets of the last iteration.
pub fn calibrate_with<S, O>(
    sampler: &mut S,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
    observer: &mut O,
) -> Result<OffsetVector, CalibrationError>
where
    S: OffsetSampler,
    O: CalibrationObserver + ?Sized,
{
    parameters.validate()?;

    sampler.set_offsets(parameters.initial_offsets);
    let mean = collect_mean_values(sampler, delay, parameters)?;
    let mut state = CalibrationState::start(parameters, parameters.initial_offsets, mean);
    observer.on_progress(&state.progress());
    log_debug!(
        "initial mean: {} {} {} {} {} {}",
        mean.ax(),
        mean.ay(),
        mean.az(),
        mean.gx(),
        mean.gy(),
        mean.gz()
    );

    while !state.is_done() {
        if state.iterations() >= parameters.max_iterations {
            log_warn!(
                "calibration did not converge after {} iterations",
                state.iterations()
            );
            return Err(state.not_converged());
        }

        let progress = calibration_loop(sampler, delay, parameters, &mut state)?;
        log_debug!(
            "iteration {}: {} of 6 channels ready",
            progress.iteration,
            progress.ready_count()
        );
        observer.on_progress(&progress);
    }

    let offsets = state.offsets();
    log_info!(
        "calibrated after {} iterations, offsets: {} {} {} {} {} {}",
        state.iterations(),
        offsets.ax(),
        offsets.ay(),
        offsets.az(),
        offsets.gx(),
        offsets.gy(),
        offsets.gz()
    );
    Ok(offsets)
}

/// Calibrate a sensor port and return the offsets that bring its readings to rest values.
///
/// Pass `&mut port` to keep using the port afterwards, e.g. wrapped again in a
/// [`BiasedSampler`] with the returned offsets.
pub fn calibrate<P>(
    port: P,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
) -> Result<OffsetVector, CalibrationError>
where
    P: SensorPort,
{
    let mut sampler = BiasedSampler::new(port);
    calibrate_with(&mut sampler, delay, parameters, &mut NoopObserver)
}
