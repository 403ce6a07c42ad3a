//! Compile-time configuration.
//!
//! There is no runtime configuration, these constants are the whole tunable surface.

use fugit::MillisDurationU64;
use static_assertions::const_assert;

use crate::{ds18b20::Resolution, retry::RetryPolicy, thermometer::Temperature};

/// Floor temperature above which heating is forced off
pub const ENABLE_COOLDOWN_TEMP: Temperature = Temperature::const_from_int(31);
/// Floor temperature below which the thermostat gets control back
pub const DISABLE_COOLDOWN_TEMP: Temperature = Temperature::const_from_int(29);

// Without a gap between the two thresholds the relay would chatter every cycle.
const_assert!(ENABLE_COOLDOWN_TEMP.to_bits() > DISABLE_COOLDOWN_TEMP.to_bits());

/// Value reported by the Dallas drivers for a sensor that didn't respond
pub const DISCONNECTED_C: Temperature = Temperature::const_from_int(-127);
/// Anything at or below this can't be a floor temperature
pub const IMPLAUSIBLE_BELOW_C: Temperature = Temperature::const_from_int(-100);

pub const SENSOR_RESOLUTION: Resolution = Resolution::Bits12;

/// Raw 10-bit ADC count on the cooldown line above which the thermostat's relay is considered on.
///
/// The line sits behind a 2 kOhm series resistor, so "on" is far from full scale.
pub const READBACK_THRESHOLD: u16 = 10;

pub const DISCOVERY_RETRY_DELAY: MillisDurationU64 = MillisDurationU64::from_ticks(1000);
pub const DISCOVERY_POLICY: RetryPolicy = RetryPolicy::Forever;

pub const SERIAL_BAUD: u32 = 115_200;
