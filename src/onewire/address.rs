/// A 64-bit ROM code identifying a single device on the bus.
///
/// Byte 0 is the family code, bytes 1..=6 the serial number and byte 7 the CRC of the first seven.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Address(pub u64);

impl Address {
    pub const fn family_code(self) -> u8 {
        self.0.to_le_bytes()[0]
    }

    /// ROM bytes in the order they are sent on the wire
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Whether the trailing CRC byte matches the rest of the ROM code.
    ///
    /// An all-zero ROM has a matching CRC but is what a shorted bus reads as, so it is rejected.
    pub fn is_valid(self) -> bool {
        self.0 != 0 && super::crc::crc8(&self.to_bytes()) == 0
    }
}

impl core::fmt::Debug for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        write!(f, "{:016X?}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Address {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{=u64:016X}", self.0);
    }
}

static_assertions::assert_eq_size!(Address, u64);
