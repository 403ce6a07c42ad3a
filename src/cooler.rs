//! Cooldown actuator: the transistor that overrides the thermostat's relay.

/// Forces the heating relay open, or hands control back to the thermostat.
pub trait CooldownActuator {
    type Error;

    /// Drive the control line low, opening the relay regardless of the thermostat
    fn engage(&mut self) -> Result<(), Self::Error>;

    /// Leave the control line floating so the thermostat decides
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Whether the line is currently being driven, as last commanded
    fn is_engaged(&self) -> bool;
}

/// Read-back of the control line while it is released.
pub trait LineMonitor: CooldownActuator {
    /// Raw 10-bit sample of the line voltage
    fn level(&mut self) -> Result<u16, Self::Error>;
}

/// Fake cooler for testing
#[cfg(any(test, feature = "fake"))]
pub mod fake {
    use core::convert::Infallible;

    use super::{CooldownActuator, LineMonitor};

    /// Counts actuator calls and reports a settable line level
    #[derive(Debug, Default)]
    pub struct FakeCooler {
        engaged: bool,
        level: u16,
        engages: usize,
        releases: usize,
    }

    impl FakeCooler {
        /// A cooler that was left engaged, as if power came back mid-cooldown
        pub fn engaged() -> Self {
            Self {
                engaged: true,
                ..Self::default()
            }
        }

        pub fn engages(&self) -> usize {
            self.engages
        }
        pub fn releases(&self) -> usize {
            self.releases
        }

        /// Set the level the thermostat puts on the line
        pub fn set_level(&mut self, level: u16) {
            self.level = level;
        }
    }

    impl CooldownActuator for FakeCooler {
        type Error = Infallible;

        fn engage(&mut self) -> Result<(), Self::Error> {
            self.engaged = true;
            self.engages += 1;
            Ok(())
        }

        fn release(&mut self) -> Result<(), Self::Error> {
            self.engaged = false;
            self.releases += 1;
            Ok(())
        }

        fn is_engaged(&self) -> bool {
            self.engaged
        }
    }

    impl LineMonitor for FakeCooler {
        fn level(&mut self) -> Result<u16, Self::Error> {
            // A driven line reads as ground
            Ok(if self.engaged { 0 } else { self.level })
        }
    }
}
