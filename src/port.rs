//! Sensor port abstraction
//!
//! The port is the collaborator that owns the bus and the device driver. It hands
//! out raw accelerometer and gyro triples in fixed-point units (see [`crate::units`]).
//! Reads are infallible from the point of view of this crate: bus setup, presence
//! checks and read retries are the port's job.

/// Blocking source of raw six-axis readings.
pub trait SensorPort {
    /// Raw acceleration `(x, y, z)` in micro-g
    fn read_acceleration(&mut self) -> (i32, i32, i32);

    /// Raw rotation `(x, y, z)` in micro-degrees per second
    fn read_rotation(&mut self) -> (i32, i32, i32);
}

impl<T> SensorPort for &mut T
where
    T: SensorPort + ?Sized,
{
    fn read_acceleration(&mut self) -> (i32, i32, i32) {
        T::read_acceleration(self)
    }

    fn read_rotation(&mut self) -> (i32, i32, i32) {
        T::read_rotation(self)
    }
}

/// Async source of raw six-axis readings.
#[allow(async_fn_in_trait)]
pub trait SensorPortAsync {
    /// Raw acceleration `(x, y, z)` in micro-g
    async fn read_acceleration(&mut self) -> (i32, i32, i32);

    /// Raw rotation `(x, y, z)` in micro-degrees per second
    async fn read_rotation(&mut self) -> (i32, i32, i32);
}

impl<T> SensorPortAsync for &mut T
where
    T: SensorPortAsync + ?Sized,
{
    async fn read_acceleration(&mut self) -> (i32, i32, i32) {
        T::read_acceleration(self).await
    }

    async fn read_rotation(&mut self) -> (i32, i32, i32) {
        T::read_rotation(self).await
    }
}
