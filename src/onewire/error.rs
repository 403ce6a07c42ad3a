pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Bus and device errors, `E` being the pin's own error type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The line stayed low before a reset; the pull-up is missing or something is shorting it
    BusNotHigh,

    Pin(E),

    /// No presence pulse, or a device stopped answering mid-transaction
    UnexpectedResponse,

    /// The addressed device isn't the expected kind
    FamilyCodeMismatch,
    CrcMismatch,

    /// No matching device answered the ROM search
    NotFound,
}

impl<E> Error<E> {
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::BusNotHigh => "Bus not high",
            Error::Pin(_) => "Pin error",
            Error::UnexpectedResponse => "Unexpected response",
            Error::FamilyCodeMismatch => "Family code mismatch",
            Error::CrcMismatch => "CRC mismatch",
            Error::NotFound => "Device not found",
        }
    }
}

impl<E> From<E> for Error<E> {
    fn from(value: E) -> Self {
        Self::Pin(value)
    }
}
