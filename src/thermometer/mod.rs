//! Temperature sensor interface

#[cfg(feature = "hardware")]
pub mod ds18b20;
pub mod discovery;

use fixed::types::I28F4;

use crate::{config, ds18b20::FAMILY_CODE, onewire::Address};

/// I28F4 is a fixed point number with 4 fractional bits and 28 integer bits.
/// This gives us a precision of 0.0625 degrees Celsius & a range of (-2^27, 2^27 - 0.0625).
pub type Temperature = I28F4;

/// One conversion result, valid for a single control cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Reading {
    Celsius(Temperature),
    /// The sensor didn't answer, or answered with an implausible value
    Disconnected,
}

impl Reading {
    /// Classifies a raw value, treating anything at or below
    /// [`config::IMPLAUSIBLE_BELOW_C`] as a lost sensor.
    pub fn from_celsius(temp: Temperature) -> Self {
        if temp <= config::IMPLAUSIBLE_BELOW_C {
            Self::Disconnected
        } else {
            Self::Celsius(temp)
        }
    }

    /// The value fed to the controller.
    ///
    /// A disconnected sensor reads as [`config::DISCONNECTED_C`], the same sentinel the Dallas
    /// drivers report.
    pub fn celsius(self) -> Temperature {
        match self {
            Self::Celsius(temp) => temp,
            Self::Disconnected => config::DISCONNECTED_C,
        }
    }

    pub fn is_disconnected(self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Reading {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::Celsius(temp) => defmt::write!(f, "{=f32}", temp.to_num::<f32>()),
            Self::Disconnected => defmt::write!(f, "disconnected"),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait TemperatureSource {
    /// Triggers a conversion and returns its result.
    ///
    /// Never fails: a sensor that doesn't respond yields [`Reading::Disconnected`].
    async fn request_reading(&mut self) -> Reading;
}

/// Picks the first DS18B20 out of a bus search.
///
/// Other device families are skipped. Bus errors abort the search.
pub fn select_sensor<E>(
    mut devices: impl Iterator<Item = Result<Address, E>>,
) -> Result<Option<Address>, E> {
    devices
        .find_map(|device| match device {
            Ok(addr) if addr.family_code() == FAMILY_CODE => Some(Ok(addr)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .transpose()
}

/// Fake thermometer for testing
#[cfg(any(test, feature = "fake"))]
pub mod fake {
    use heapless::Deque;

    use crate::thermometer::{Reading, Temperature, TemperatureSource};

    /// A fake thermometer that replays queued readings, then repeats the last one
    pub struct FakeThermometer {
        queue: Deque<Reading, 16>,
        last: Reading,
        requests: usize,
    }

    impl FakeThermometer {
        pub fn new(temp: impl Into<Temperature>) -> Self {
            Self {
                queue: Deque::new(),
                last: Reading::from_celsius(temp.into()),
                requests: 0,
            }
        }

        /// Queue readings to be returned in order.
        ///
        /// # Panics
        /// If more than 16 readings are pending.
        pub fn with_readings(mut self, readings: impl IntoIterator<Item = Reading>) -> Self {
            for reading in readings {
                assert!(self.queue.push_back(reading).is_ok(), "too many queued readings");
            }
            self
        }

        /// Number of conversions requested so far
        pub fn requests(&self) -> usize {
            self.requests
        }
    }

    impl TemperatureSource for FakeThermometer {
        async fn request_reading(&mut self) -> Reading {
            self.requests += 1;
            if let Some(reading) = self.queue.pop_front() {
                self.last = reading;
            }
            self.last
        }
    }
}
