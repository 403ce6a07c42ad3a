//! Bit-banged one-wire bus master.
//!
//! The bus is a single open-drain line: releasing the pin (`set_high`) lets the pull-up take the
//! line high, `set_low` drives it low. Timings are the standard-speed values from Maxim
//! application note 126.

mod address;
pub mod commands;
pub mod crc;
mod error;

use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::{InputPin, OutputPin},
};

pub use self::{address::Address, error::*};

/// Slot timings in microseconds.
mod timing {
    pub const RESET_LOW: u32 = 480;
    pub const PRESENCE_SAMPLE: u32 = 70;
    pub const PRESENCE_TAIL: u32 = 410;

    pub const WRITE_ONE_LOW: u32 = 10;
    pub const WRITE_ONE_RECOVERY: u32 = 55;
    pub const WRITE_ZERO_LOW: u32 = 65;
    pub const WRITE_ZERO_RECOVERY: u32 = 5;

    pub const READ_LOW: u32 = 1;
    pub const READ_SAMPLE: u32 = 1;
    pub const READ_RECOVERY: u32 = 53;

    /// How long to wait for the pull-up before a reset, in 2us polls
    pub const IDLE_POLLS: u32 = 125;
    pub const IDLE_POLL: u32 = 2;
}

pub struct OneWire<P> {
    pin: P,
}

impl<P, E> OneWire<P>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
{
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Reset pulse followed by presence detection.
    ///
    /// Fails with [`Error::UnexpectedResponse`] if no device pulls the line low afterwards, and
    /// with [`Error::BusNotHigh`] if the line never idles high to begin with.
    pub fn reset(&mut self, delay: &mut impl DelayUs<u32>) -> Result<(), E> {
        let mut polls = 0;
        while self.pin.is_low()? {
            if polls == timing::IDLE_POLLS {
                return Err(Error::BusNotHigh);
            }
            polls += 1;
            delay.delay_us(timing::IDLE_POLL);
        }

        self.pulse(timing::RESET_LOW, timing::PRESENCE_SAMPLE, delay)?;
        let present = self.pin.is_low()?;
        delay.delay_us(timing::PRESENCE_TAIL);

        if present {
            Ok(())
        } else {
            Err(Error::UnexpectedResponse)
        }
    }

    /// Drive the line low for `low` us, then let it float for `high` us.
    fn pulse(&mut self, low: u32, high: u32, delay: &mut impl DelayUs<u32>) -> Result<(), E> {
        self.pin.set_low()?;
        delay.delay_us(low);
        self.pin.set_high()?;
        delay.delay_us(high);
        Ok(())
    }

    pub fn write_bit(&mut self, bit: bool, delay: &mut impl DelayUs<u32>) -> Result<(), E> {
        if bit {
            self.pulse(timing::WRITE_ONE_LOW, timing::WRITE_ONE_RECOVERY, delay)
        } else {
            self.pulse(timing::WRITE_ZERO_LOW, timing::WRITE_ZERO_RECOVERY, delay)
        }
    }

    pub fn read_bit(&mut self, delay: &mut impl DelayUs<u32>) -> Result<bool, E> {
        // The sample has to land within 15us of the falling edge
        let bit = critical_section::with(|_| {
            self.pulse(timing::READ_LOW, timing::READ_SAMPLE, delay)?;
            Ok::<_, Error<E>>(self.pin.is_high()?)
        })?;

        delay.delay_us(timing::READ_RECOVERY);
        Ok(bit)
    }

    /// Write a byte, LSB first
    pub fn write_byte(&mut self, byte: u8, delay: &mut impl DelayUs<u32>) -> Result<(), E> {
        (0..8).try_for_each(|i| self.write_bit(byte & (1 << i) != 0, delay))
    }

    pub fn write_bytes(&mut self, bytes: &[u8], delay: &mut impl DelayUs<u32>) -> Result<(), E> {
        bytes
            .iter()
            .try_for_each(|byte| self.write_byte(*byte, delay))
    }

    /// Read a byte, LSB first
    pub fn read_byte(&mut self, delay: &mut impl DelayUs<u32>) -> Result<u8, E> {
        (0..8).try_fold(0u8, |acc, i| {
            Ok(if self.read_bit(delay)? { acc | (1 << i) } else { acc })
        })
    }

    pub fn read_bytes(&mut self, bytes: &mut [u8], delay: &mut impl DelayUs<u32>) -> Result<(), E> {
        for byte in bytes {
            *byte = self.read_byte(delay)?;
        }
        Ok(())
    }

    /// Address a single device (MATCH ROM)
    pub fn select_address(
        &mut self,
        device: &Address,
        delay: &mut impl DelayUs<u32>,
    ) -> Result<(), E> {
        self.write_byte(commands::MATCH_ROM, delay)?;
        self.write_bytes(&device.to_bytes(), delay)
    }

    /// Address every device at once (SKIP ROM)
    pub fn skip_address(&mut self, delay: &mut impl DelayUs<u32>) -> Result<(), E> {
        self.write_byte(commands::SKIP_ROM, delay)
    }

    /// Iterate over the ROM codes of all devices on the bus
    pub fn devices<'a, 'd, D: DelayUs<u32>>(
        &'a mut self,
        delay: &'d mut D,
    ) -> DeviceSearch<'a, 'd, P, D> {
        DeviceSearch {
            wire: self,
            delay,
            rom: [0; 8],
            last_discrepancy: 0,
            done: false,
        }
    }

    /// Reset, address `address` (or everyone if `None`), then send `command`.
    pub fn send_command(
        &mut self,
        address: Option<&Address>,
        command: u8,
        delay: &mut impl DelayUs<u32>,
    ) -> Result<(), E> {
        self.reset(delay)?;
        match address {
            Some(address) => self.select_address(address, delay)?,
            None => self.skip_address(delay)?,
        }
        self.write_byte(command, delay)
    }
}

/// ROM search, Maxim application note 187.
///
/// Each pass walks the 64 ROM bits. Where devices disagree (a discrepancy) the pass takes the 0
/// branch unless it is the branch point left over from the previous pass, which takes the 1
/// branch. The deepest untaken 0 branch becomes the next pass's branch point.
pub struct DeviceSearch<'a, 'd, P, D> {
    wire: &'a mut OneWire<P>,
    delay: &'d mut D,
    rom: [u8; 8],
    /// 1-based bit index of the branch point, 0 once there are none left
    last_discrepancy: u8,
    done: bool,
}

impl<P, E, D> DeviceSearch<'_, '_, P, D>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayUs<u32>,
{
    fn rom_bit(&self, n: u8) -> bool {
        self.rom[usize::from(n / 8)] & (1 << (n % 8)) != 0
    }

    fn set_rom_bit(&mut self, n: u8, value: bool) {
        let mask = 1 << (n % 8);
        let byte = &mut self.rom[usize::from(n / 8)];
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Run one search pass, `Ok(None)` once every device has been reported.
    pub fn search(&mut self) -> Result<Option<Address>, E> {
        if self.done {
            return Ok(None);
        }

        // An empty bus answers the reset without a presence pulse
        match self.wire.reset(self.delay) {
            Ok(()) => {}
            Err(Error::UnexpectedResponse) => {
                self.done = true;
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        self.wire.write_byte(commands::SEARCH_NORMAL, self.delay)?;

        let mut last_zero = 0u8;
        for n in 0..64u8 {
            let id_bit = self.wire.read_bit(self.delay)?;
            let cmp_bit = self.wire.read_bit(self.delay)?;

            let direction = match (id_bit, cmp_bit) {
                // Nobody answered, the bus changed under us
                (true, true) => {
                    self.done = true;
                    return Err(Error::UnexpectedResponse);
                }
                // Every remaining device agrees
                (bit, cmp) if bit != cmp => bit,
                _ => {
                    let position = n + 1;
                    let direction = if position < self.last_discrepancy {
                        self.rom_bit(n)
                    } else {
                        position == self.last_discrepancy
                    };
                    if !direction {
                        last_zero = position;
                    }
                    direction
                }
            };

            self.set_rom_bit(n, direction);
            self.wire.write_bit(direction, self.delay)?;
        }

        self.last_discrepancy = last_zero;
        self.done = last_zero == 0;

        let address = Address(u64::from_le_bytes(self.rom));
        if address.is_valid() {
            Ok(Some(address))
        } else {
            self.done = true;
            Err(Error::CrcMismatch)
        }
    }
}

impl<P, E, D> Iterator for DeviceSearch<'_, '_, P, D>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayUs<u32>,
{
    type Item = Result<Address, E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.search().transpose()
    }
}
