//! Finding the floor sensor at startup.

use core::future::Future;

use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::{InputPin, OutputPin},
};

use crate::{
    ds18b20::{Ds18b20, Resolution},
    onewire::{Error, OneWire},
    retry::RetryPolicy,
    thermometer::select_sensor,
};

/// Why a search came up without a sensor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Miss<E> {
    /// The bus answered, but nothing on it is a DS18B20
    NoSensor,
    /// The search itself failed
    Bus(Error<E>),
}

/// Searches the bus until a DS18B20 answers, then sets its resolution.
///
/// After every failed attempt `on_retry` gets the attempt number and the reason, then `wait` is
/// awaited before searching again. Returns [`Error::NotFound`] once `policy` is exhausted; with
/// [`RetryPolicy::Forever`] this only returns once a sensor is found.
pub async fn discover<P, E, D, W>(
    wire: &mut OneWire<P>,
    delay: &mut D,
    resolution: Resolution,
    policy: RetryPolicy,
    mut wait: impl FnMut() -> W,
    mut on_retry: impl FnMut(u32, Miss<E>),
) -> Result<Ds18b20, Error<E>>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayUs<u32>,
    W: Future<Output = ()>,
{
    let mut attempt = 0;

    let addr = loop {
        let miss = match select_sensor(wire.devices(delay)) {
            Ok(Some(addr)) => break addr,
            Ok(None) => Miss::NoSensor,
            Err(e) => Miss::Bus(e),
        };

        attempt += 1;
        if !policy.allows(attempt) {
            return Err(Error::NotFound);
        }
        on_retry(attempt, miss);

        wait().await;
    };

    let mut sensor = Ds18b20::try_new(addr)?;
    sensor.set_resolution(wire, delay, resolution)?;

    Ok(sensor)
}
