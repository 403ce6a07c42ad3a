//! Human readable status lines for the serial console.

use core::fmt;

use crate::{config::READBACK_THRESHOLD, controller::Mode, thermometer::Reading};

pub const STARTING_UP: &str = "Starting up...";
pub const LOCATING_SENSOR: &str = "Locating the sensor...";
pub const STARTED_UP: &str = "Started up.";

/// What the heating is actually doing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EffectiveState {
    /// Overridden off by us
    Cooldown,
    /// Thermostat has its relay closed
    On,
    /// Thermostat has its relay open
    Off,
}

impl EffectiveState {
    /// Combines the controller mode with the sampled line level.
    ///
    /// `level` is only meaningful while the line is released, it is ignored in cooldown.
    pub fn resolve(mode: Mode, level: u16) -> Self {
        match mode {
            Mode::ForcedCooldown => Self::Cooldown,
            Mode::HeatingAllowed if level > READBACK_THRESHOLD => Self::On,
            Mode::HeatingAllowed => Self::Off,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cooldown => "COOLDOWN",
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for EffectiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line per control cycle, `"<uptime> ms | <temp> °C | <state>"`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub uptime_ms: u64,
    pub reading: Reading,
    pub state: EffectiveState,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Disconnected sensors print the sentinel, the same value the controller compared against.
        // Formatted as fixed point, f32 formatting would pull float printing into the image.
        write!(
            f,
            "{} ms | {:.1} °C | {}",
            self.uptime_ms,
            self.reading.celsius(),
            self.state
        )
    }
}

/// Write `line` to the console followed by CRLF.
pub fn report(out: &mut impl fmt::Write, line: &StatusLine) -> fmt::Result {
    write!(out, "{line}\r\n")
}

/// Write a bare message followed by CRLF.
pub fn announce(out: &mut impl fmt::Write, msg: &str) -> fmt::Result {
    out.write_str(msg)?;
    out.write_str("\r\n")
}
