//! Calibration error types.

use crate::sample::{OffsetVector, SensorSample};
use core::fmt::{Debug, Display, Formatter};

/// Error for calibration operations.
///
/// Sensor read failures never reach this type: they are handled by the
/// [`crate::port::SensorPort`] implementation before data is handed out.
#[derive(Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CalibrationError {
    /// The iteration cap was reached before all six channels were inside their dead zones
    NotConverged {
        /// Number of correction iterations performed
        iterations: usize,
        /// Mean readings observed in the last iteration
        mean: SensorSample,
        /// Offsets applied during the last iteration
        offsets: OffsetVector,
    },
    /// The averaging window is empty (no samples to compute a mean from)
    EmptyWindow,
    /// A proportional correction divisor is zero
    InvalidDivisor,
}

impl Debug for CalibrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConverged {
                iterations,
                mean,
                offsets,
            } => f
                .debug_struct("NotConverged")
                .field("iterations", iterations)
                .field("mean", mean)
                .field("offsets", offsets)
                .finish(),
            Self::EmptyWindow => f.write_str("EmptyWindow"),
            Self::InvalidDivisor => f.write_str("InvalidDivisor"),
        }
    }
}

impl Display for CalibrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConverged { iterations, .. } => write!(
                f,
                "calibration did not converge within {} iterations",
                iterations
            ),
            Self::EmptyWindow => f.write_str("averaging window must contain at least one sample"),
            Self::InvalidDivisor => f.write_str("correction divisor must be non-zero"),
        }
    }
}
