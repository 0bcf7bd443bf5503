use crate::{
    calibration::{
        CalibrationObserver, CalibrationParameters, CalibrationProgress, CalibrationState,
        MeanAccumulator, NoopObserver,
    },
    error::CalibrationError,
    port::SensorPortAsync,
    sample::{OffsetVector, SensorSample},
    sampler::{BiasedSampler, OffsetSamplerAsync},
};
use embedded_hal_async::delay::DelayNs;

/// Compute the mean of a window of corrected readings, after discarding the settle samples
pub async fn collect_mean_values<S>(
    sampler: &mut S,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
) -> Result<SensorSample, CalibrationError>
where
    S: OffsetSamplerAsync,
{
    let mut accumulator = MeanAccumulator::new(parameters.window)?;

    for _ in 0..parameters.discard {
        _ = sampler.sample().await;
        delay.delay_ms(parameters.sample_delay_ms).await;
    }

    for _ in 0..parameters.window {
        let sample = sampler.sample().await;
        accumulator.add(&sample);
        delay.delay_ms(parameters.sample_delay_ms).await;
    }

    Ok(accumulator.means())
}

/// A single, full-fledged calibration iteration (it also alters the sampler offsets)
pub async fn calibration_loop<S>(
    sampler: &mut S,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
    state: &mut CalibrationState,
) -> Result<CalibrationProgress, CalibrationError>
where
    S: OffsetSamplerAsync,
{
    sampler.set_offsets(state.commit());
    let mean = collect_mean_values(sampler, delay, parameters).await?;
    Ok(state.evaluate(parameters, mean))
}

/// Repeatedly perform calibration iterations until the means are within the dead zones
pub async fn calibrate_with<S, O>(
    sampler: &mut S,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
    observer: &mut O,
) -> Result<OffsetVector, CalibrationError>
where
    S: OffsetSamplerAsync,
    O: CalibrationObserver + ?Sized,
{
    parameters.validate()?;

    sampler.set_offsets(parameters.initial_offsets);
    let mean = collect_mean_values(sampler, delay, parameters).await?;
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

        let progress = calibration_loop(sampler, delay, parameters, &mut state).await?;
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

/// Calibrate an async sensor port and return the resulting offsets
pub async fn calibrate<P>(
    port: P,
    delay: &mut impl DelayNs,
    parameters: &CalibrationParameters,
) -> Result<OffsetVector, CalibrationError>
where
    P: SensorPortAsync,
{
    let mut sampler = BiasedSampler::new(port);
    calibrate_with(&mut sampler, delay, parameters, &mut NoopObserver).await
}
