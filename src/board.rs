//! STM32F042K6 wiring.
//!
//! | Pin  | Use                                                           |
//! |------|---------------------------------------------------------------|
//! | PA0  | Cooldown line: transistor base, read back through 2 kOhm      |
//! | PA2  | USART2 TX, status console                                     |
//! | PA8  | DS18B20 VCC                                                   |
//! | PA11 | Internal pull-up for the one-wire line (no external resistor) |
//! | PA12 | One-wire data                                                 |

use core::mem;

use cortex_m::interrupt::{self, CriticalSection};
use embedded_hal::{adc::OneShot, digital::v2::OutputPin};
use stm32f0xx_hal::{
    adc::{Adc, AdcPrecision},
    gpio::{
        gpioa::{PA0, PA11, PA12, PA8},
        Analog, Input, OpenDrain, Output, Pin, PullUp, PushPull,
    },
};

use crate::{
    cooler::{CooldownActuator, LineMonitor},
    onewire::OneWire,
};

/// One-wire data line
pub type BusPin = Pin<Output<OpenDrain>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub enum Error {
    /// ADC conversion failed
    Adc,
    /// The line can't be sampled while we drive it
    LineDriven,
    /// The pin is mid-reconfiguration
    Switching,
}

enum Line {
    /// Analog mode: high impedance and readable by the ADC
    Released(PA0<Analog>),
    Engaged(PA0<Output<PushPull>>),
    Switching,
}

/// The cooldown transistor line, shared with the thermostat's sense circuit.
pub struct SenseLine {
    line: Line,
    adc: Adc,
}

impl SenseLine {
    /// Takes the pin in its released state. The ADC is switched to 10-bit samples.
    pub fn new(pin: PA0<Analog>, mut adc: Adc) -> Self {
        adc.set_precision(AdcPrecision::B_10);
        Self {
            line: Line::Released(pin),
            adc,
        }
    }
}

impl CooldownActuator for SenseLine {
    type Error = Error;

    fn engage(&mut self) -> Result<(), Self::Error> {
        self.line = match mem::replace(&mut self.line, Line::Switching) {
            Line::Released(pin) => {
                let mut pin = interrupt::free(|cs| pin.into_push_pull_output(cs));
                pin.set_low().unwrap_or_else(|e| match e {});
                Line::Engaged(pin)
            }
            engaged @ Line::Engaged(_) => engaged,
            Line::Switching => return Err(Error::Switching),
        };
        Ok(())
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.line = match mem::replace(&mut self.line, Line::Switching) {
            Line::Engaged(pin) => Line::Released(interrupt::free(|cs| pin.into_analog(cs))),
            released @ Line::Released(_) => released,
            Line::Switching => return Err(Error::Switching),
        };
        Ok(())
    }

    fn is_engaged(&self) -> bool {
        matches!(self.line, Line::Engaged(_))
    }
}

impl LineMonitor for SenseLine {
    fn level(&mut self) -> Result<u16, Self::Error> {
        match &mut self.line {
            Line::Released(pin) => nb::block!(self.adc.read(pin)).map_err(|()| Error::Adc),
            Line::Engaged(_) => Err(Error::LineDriven),
            Line::Switching => Err(Error::Switching),
        }
    }
}

/// Keeps the sensor's supply and pull-up pins configured for as long as it lives.
pub struct SensorPower {
    _vcc: PA8<Output<PushPull>>,
    _pull_up: PA11<Input<PullUp>>,
}

/// Powers the DS18B20 and returns the bus it sits on.
pub fn sensor_bus<VCC, PU, DQ>(
    vcc: PA8<VCC>,
    pull_up: PA11<PU>,
    data: PA12<DQ>,
    cs: &CriticalSection,
) -> (SensorPower, OneWire<BusPin>) {
    let pull_up = pull_up.into_pull_up_input(cs);

    let mut vcc = vcc.into_push_pull_output(cs);
    vcc.set_high().unwrap_or_else(|e| match e {});

    let mut data = data.into_open_drain_output(cs);
    data.set_high().unwrap_or_else(|e| match e {});

    (
        SensorPower {
            _vcc: vcc,
            _pull_up: pull_up,
        },
        OneWire::new(data.downgrade()),
    )
}
