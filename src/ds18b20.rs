//! Implementation for the DS18B20 temperature sensor.

use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::{InputPin, OutputPin},
};

use crate::{
    onewire::{crc::check_crc8, Address, Error, OneWire},
    thermometer::Temperature,
};

pub const FAMILY_CODE: u8 = 0x28;

pub const CONVERT_T: u8 = 0x44;
pub const READ_SCRATCHPAD: u8 = 0xBE;
pub const WRITE_SCRATCHPAD: u8 = 0x4E;

pub type Scratchpad = [u8; 9];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ds18b20 {
    addr: Address,
}

impl Ds18b20 {
    /// Wrap an address without checking its family code.
    #[inline]
    pub const fn new(addr: Address) -> Self {
        Self { addr }
    }

    /// Wrap an address, rejecting devices that aren't a DS18B20.
    pub fn try_new<E>(addr: Address) -> Result<Self, Error<E>> {
        if addr.family_code() == FAMILY_CODE {
            Ok(Self::new(addr))
        } else {
            Err(Error::FamilyCodeMismatch)
        }
    }

    #[inline]
    pub const fn address(&self) -> Address {
        self.addr
    }

    /// Reads and validates the 9 byte scratchpad.
    ///
    /// A sensor that dropped off the bus reads back as all ones (CRC mismatch) or, with the line
    /// shorted, all zeros. Both are treated as a failed read.
    pub fn read_scratchpad<P, E>(
        &self,
        wire: &mut OneWire<P>,
        delay: &mut impl DelayUs<u32>,
    ) -> Result<Scratchpad, Error<E>>
    where
        P: InputPin<Error = E> + OutputPin<Error = E>,
    {
        wire.send_command(Some(&self.addr), READ_SCRATCHPAD, delay)?;

        let mut buf = [0u8; 9];
        wire.read_bytes(&mut buf, delay)?;

        if buf.iter().all(|b| *b == 0) {
            return Err(Error::UnexpectedResponse);
        }
        if !check_crc8(&buf) {
            return Err(Error::CrcMismatch);
        }

        Ok(buf)
    }

    fn write_scratchpad<P, E>(
        &mut self,
        wire: &mut OneWire<P>,
        delay: &mut impl DelayUs<u32>,
        data: [u8; 3],
    ) -> Result<(), Error<E>>
    where
        P: InputPin<Error = E> + OutputPin<Error = E>,
    {
        wire.send_command(Some(&self.addr), WRITE_SCRATCHPAD, delay)?;
        wire.write_bytes(&data, delay)?;
        wire.reset(delay)?;
        Ok(())
    }

    /// Retrieves the resolution of the sensor
    pub fn resolution<P, E>(
        &self,
        wire: &mut OneWire<P>,
        delay: &mut impl DelayUs<u32>,
    ) -> Result<Resolution, Error<E>>
    where
        P: InputPin<Error = E> + OutputPin<Error = E>,
    {
        let buf = self.read_scratchpad(wire, delay)?;
        Resolution::from_config_register(buf[4]).ok_or(Error::UnexpectedResponse)
    }

    /// Sets the resolution of the sensor
    ///
    /// Only the scratchpad is written, the EEPROM copy is left alone.
    pub fn set_resolution<P, E>(
        &mut self,
        wire: &mut OneWire<P>,
        delay: &mut impl DelayUs<u32>,
        res: Resolution,
    ) -> Result<(), Error<E>>
    where
        P: InputPin<Error = E> + OutputPin<Error = E>,
    {
        let mut buf = self.read_scratchpad(wire, delay)?;
        buf[4] = res.to_config_register();
        self.write_scratchpad(wire, delay, [buf[2], buf[3], buf[4]])?;
        Ok(())
    }

    /// Starts a temperature conversion
    ///
    /// This will take some time, depending on the resolution of the sensor.
    ///
    /// Call [`Ds18b20::read_data`] to read the result after the conversion is done.
    pub fn start_measurement<P, E>(
        &mut self,
        wire: &mut OneWire<P>,
        delay: &mut impl DelayUs<u32>,
    ) -> Result<(), Error<E>>
    where
        P: InputPin<Error = E> + OutputPin<Error = E>,
    {
        wire.send_command(Some(&self.addr), CONVERT_T, delay)
    }

    /// Reads the temperature data from the sensor
    pub fn read_data<P, E>(
        &self,
        wire: &mut OneWire<P>,
        delay: &mut impl DelayUs<u32>,
    ) -> Result<Temperature, Error<E>>
    where
        P: InputPin<Error = E> + OutputPin<Error = E>,
    {
        let buf = self.read_scratchpad(wire, delay)?;
        decode_temperature(&buf).ok_or(Error::UnexpectedResponse)
    }
}

/// Converts a validated scratchpad into degrees Celsius.
///
/// Returns `None` if the configuration register holds an unknown resolution.
pub fn decode_temperature(buf: &Scratchpad) -> Option<Temperature> {
    let resolution = Resolution::from_config_register(buf[4])?;
    let lsb = buf[0] & !resolution.undefined_bits();

    let value = i16::from_le_bytes([lsb, buf[1]]);
    Some(Temperature::from_bits(i32::from(value)))
}

/// Conversion resolution, stored as the value of the configuration register.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Resolution {
    Bits9 = 0b0001_1111,
    Bits10 = 0b0011_1111,
    Bits11 = 0b0101_1111,
    Bits12 = 0b0111_1111,
}

impl Resolution {
    pub const ALL: [Self; 4] = [Self::Bits9, Self::Bits10, Self::Bits11, Self::Bits12];

    pub fn from_config_register(reg: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|res| res.to_config_register() == reg)
    }

    pub const fn to_config_register(self) -> u8 {
        self as u8
    }

    pub const fn bits(self) -> u8 {
        // R1:R0 live in bits 6:5 of the register
        9 + (((self as u8) >> 5) & 0b11)
    }

    /// Low bits of the temperature LSB that hold garbage at this resolution
    pub const fn undefined_bits(self) -> u8 {
        (1 << (12 - self.bits())) - 1
    }

    /// Maximum conversion time in milliseconds, halving with every bit dropped
    pub const fn conversion_time(self) -> u16 {
        match self {
            Self::Bits9 => 94,
            Self::Bits10 => 188,
            Self::Bits11 => 375,
            Self::Bits12 => 750,
        }
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::*;
    use crate::onewire::crc::crc8;

    fn scratchpad(lsb: u8, msb: u8, config: u8) -> Scratchpad {
        let mut buf = [lsb, msb, 0x4B, 0x46, config, 0xFF, 0x0C, 0x10, 0];
        buf[8] = crc8(&buf[..8]);
        buf
    }

    #[test]
    fn decodes_datasheet_values() {
        // Table 1 of the DS18B20 datasheet
        let cases: [(u8, u8, f32); 5] = [
            (0xD0, 0x07, 125.0),
            (0x91, 0x01, 25.0625),
            (0xA2, 0x00, 10.125),
            (0x5E, 0xFF, -10.125),
            (0x90, 0xFC, -55.0),
        ];
        for (lsb, msb, expected) in cases {
            let temp = decode_temperature(&scratchpad(lsb, msb, 0x7F)).unwrap();
            assert_eq!(temp.to_num::<f32>(), expected);
        }
    }

    #[test]
    fn masks_undefined_bits_at_low_resolution() {
        // 25.0625 at 9 bits has its three lowest bits undefined
        let temp = decode_temperature(&scratchpad(0x91, 0x01, 0x1F)).unwrap();
        assert_eq!(temp, Temperature::from_num(25));
    }

    #[test]
    fn rejects_unknown_config_register() {
        assert_eq!(decode_temperature(&scratchpad(0x91, 0x01, 0x00)), None);
    }

    #[test]
    fn resolution_bits() {
        let bits = Resolution::ALL.map(Resolution::bits);
        assert_eq!(bits, [9, 10, 11, 12]);
        assert_eq!(Resolution::Bits9.undefined_bits(), 0b111);
        assert_eq!(Resolution::Bits12.undefined_bits(), 0);
        assert_eq!(Resolution::from_config_register(0x7F), Some(Resolution::Bits12));
        assert_eq!(Resolution::Bits12.conversion_time(), 750);
    }

    #[test]
    fn family_code_is_checked() {
        let ok = Ds18b20::try_new::<Infallible>(Address(0x05_00_00_0F_83_FB_60_28));
        assert!(ok.is_ok());

        let ds18s20 = Ds18b20::try_new::<Infallible>(Address(0x05_00_00_0F_83_FB_60_10));
        assert_eq!(ds18s20, Err(Error::FamilyCodeMismatch));
    }
}
