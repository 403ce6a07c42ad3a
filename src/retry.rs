//! How long to keep looking for the sensor at startup.

use core::num::NonZeroU32;

/// Retry policy for sensor discovery.
///
/// [`RetryPolicy::Forever`] blocks startup until a sensor shows up. A bounded policy gives up
/// after the given number of attempts, which changes the boot behavior: the firmware halts
/// instead of waiting for the hardware.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetryPolicy {
    Forever,
    Attempts(NonZeroU32),
}

impl RetryPolicy {
    /// Bounded policy, `None` for zero attempts.
    pub const fn attempts(n: u32) -> Option<Self> {
        match NonZeroU32::new(n) {
            Some(n) => Some(Self::Attempts(n)),
            None => None,
        }
    }

    /// Whether another attempt may follow `attempt` failed attempts.
    pub const fn allows(self, attempt: u32) -> bool {
        match self {
            Self::Forever => true,
            Self::Attempts(max) => attempt < max.get(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Forever
    }
}
