use defmt::*;
use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::{InputPin, OutputPin},
};
use rtic_monotonics::stm32::{Tim2 as Mono, *};

use crate::{
    config::DISCOVERY_RETRY_DELAY,
    ds18b20::{Ds18b20, Resolution},
    onewire::{Error, OneWire},
    retry::RetryPolicy,
    thermometer::{
        discovery::{discover, Miss},
        Reading, Temperature, TemperatureSource,
    },
};

/// The floor sensor: a single DS18B20 on its own bus.
pub struct Ds18b20Thermometer<P, D> {
    wire: OneWire<P>,
    sensor: Ds18b20,
    resolution: Resolution,
    delay: D,
}

impl<P, E, D> Ds18b20Thermometer<P, D>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayUs<u32>,
{
    /// Waits for the sensor to show up, see [`discover`].
    ///
    /// Attempts are spaced [`DISCOVERY_RETRY_DELAY`](crate::config::DISCOVERY_RETRY_DELAY)
    /// apart. `on_retry` runs after every failed one.
    pub async fn initialize(
        mut wire: OneWire<P>,
        mut delay: D,
        resolution: Resolution,
        policy: RetryPolicy,
        mut on_retry: impl FnMut(u32),
    ) -> Result<Self, Error<E>> {
        let sensor = discover(
            &mut wire,
            &mut delay,
            resolution,
            policy,
            || Mono::delay(DISCOVERY_RETRY_DELAY.ticks().millis()),
            |attempt, miss| {
                match miss {
                    Miss::NoSensor => debug!("No DS18B20 on the bus"),
                    Miss::Bus(e) => warn!("Bus error during search: {=str}", e.as_str()),
                }
                on_retry(attempt);
            },
        )
        .await?;

        info!("Found sensor: {}", sensor.address());

        Ok(Self {
            wire,
            sensor,
            resolution,
            delay,
        })
    }

    pub fn sensor(&self) -> Ds18b20 {
        self.sensor
    }

    async fn measure(&mut self) -> Result<Temperature, Error<E>> {
        self.sensor
            .start_measurement(&mut self.wire, &mut self.delay)?;

        // Wait for conversion to complete
        let delay = self.resolution.conversion_time();
        Mono::delay(u64::from(delay).millis()).await;

        self.sensor.read_data(&mut self.wire, &mut self.delay)
    }
}

impl<P, E, D> TemperatureSource for Ds18b20Thermometer<P, D>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayUs<u32>,
{
    async fn request_reading(&mut self) -> Reading {
        match self.measure().await {
            Ok(temp) => {
                let reading = Reading::from_celsius(temp);
                if reading.is_disconnected() {
                    warn!("Implausible temperature: {=f32}", temp.to_num::<f32>());
                }
                reading
            }
            Err(e) => {
                warn!("Sensor read failed: {=str}", e.as_str());
                Reading::Disconnected
            }
        }
    }
}
