//! The control cycle: read, regulate, report.

use core::fmt;

use crate::{
    controller::{hysteresis::HysteresisController, Controller, Mode, Thresholds, Transition},
    cooler::{CooldownActuator, LineMonitor},
    status::{self, EffectiveState, StatusLine},
    thermometer::{Reading, TemperatureSource},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleError<E> {
    /// The actuator or its read-back failed
    Actuator(E),
    /// The status line couldn't be written
    Report,
}

impl<E> CycleError<E> {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleError::Actuator(_) => "Actuator error",
            CycleError::Report => "Report error",
        }
    }
}

impl<E> From<fmt::Error> for CycleError<E> {
    fn from(_: fmt::Error) -> Self {
        Self::Report
    }
}

/// Outcome of one control cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub reading: Reading,
    pub transition: Option<Transition>,
    pub state: EffectiveState,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Cycle {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(
            f,
            "Temperature: {}, Transition: {}, State: {}",
            self.reading,
            self.transition,
            self.state
        );
    }
}

/// Owns the controller and the actuator it drives.
pub struct FloorGuard<A> {
    controller: HysteresisController,
    actuator: A,
}

impl<A: CooldownActuator> FloorGuard<A> {
    /// Releases the actuator before anything else, so the thermostat is in charge until the first
    /// reading says otherwise.
    pub fn new(mut actuator: A, thresholds: Thresholds) -> Result<Self, A::Error> {
        actuator.release()?;
        Ok(Self {
            controller: HysteresisController::new(thresholds),
            actuator,
        })
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn thresholds(&self) -> Thresholds {
        self.controller.thresholds()
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// Applies one reading.
    ///
    /// The actuator is only touched on a transition edge. Disconnected readings are compared as
    /// the sentinel value, which releases an active cooldown and never starts one.
    ///
    /// The mode only changes once the actuator call succeeded, so a failed edge is retried on the
    /// next reading.
    #[cfg_attr(feature = "sizing", inline(never))]
    pub fn regulate(&mut self, reading: Reading) -> Result<Option<Transition>, A::Error> {
        let Some(transition) = self.controller.decide(reading.celsius()) else {
            return Ok(None);
        };

        match transition {
            Transition::Engage => self.actuator.engage()?,
            Transition::Release => self.actuator.release()?,
        }
        self.controller.apply(transition);

        Ok(Some(transition))
    }
}

impl<A: LineMonitor> FloorGuard<A> {
    /// The state shown on the console. Samples the line only while it's released.
    pub fn effective_state(&mut self) -> Result<EffectiveState, A::Error> {
        let level = match self.mode() {
            Mode::ForcedCooldown => 0,
            Mode::HeatingAllowed => self.actuator.level()?,
        };
        Ok(EffectiveState::resolve(self.mode(), level))
    }

    /// Runs a full cycle: request a reading, regulate, write the status line to `out`.
    pub async fn cycle<S: TemperatureSource>(
        &mut self,
        source: &mut S,
        out: &mut impl fmt::Write,
        uptime_ms: impl FnOnce() -> u64,
    ) -> Result<Cycle, CycleError<A::Error>> {
        let reading = source.request_reading().await;

        let transition = self.regulate(reading).map_err(CycleError::Actuator)?;
        let state = self.effective_state().map_err(CycleError::Actuator)?;

        let line = StatusLine {
            uptime_ms: uptime_ms(),
            reading,
            state,
        };
        status::report(out, &line)?;

        Ok(Cycle {
            reading,
            transition,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use heapless::String;

    use super::*;
    use crate::{
        cooler::fake::FakeCooler,
        thermometer::{fake::FakeThermometer, Temperature},
    };

    fn reading(v: f32) -> Reading {
        Reading::Celsius(Temperature::from_num(v))
    }

    #[test]
    fn new_releases_a_stuck_actuator() {
        let guard = FloorGuard::new(FakeCooler::engaged(), Thresholds::DEFAULT).unwrap();
        assert!(!guard.actuator().is_engaged());
        assert_eq!(guard.actuator().releases(), 1);
        assert_eq!(guard.mode(), Mode::HeatingAllowed);
    }

    #[test]
    fn actuator_follows_edges_only() {
        let mut guard = FloorGuard::new(FakeCooler::default(), Thresholds::DEFAULT).unwrap();

        assert_eq!(guard.regulate(reading(35.0)), Ok(Some(Transition::Engage)));
        assert_eq!(guard.regulate(reading(35.0)), Ok(None));
        assert_eq!(guard.actuator().engages(), 1);
        assert!(guard.actuator().is_engaged());
    }

    /// Refuses the first `engage`, then behaves
    #[derive(Default)]
    struct StuckRelay {
        engaged: bool,
        refused: bool,
    }

    impl CooldownActuator for StuckRelay {
        type Error = ();

        fn engage(&mut self) -> Result<(), Self::Error> {
            if !self.refused {
                self.refused = true;
                return Err(());
            }
            self.engaged = true;
            Ok(())
        }

        fn release(&mut self) -> Result<(), Self::Error> {
            self.engaged = false;
            Ok(())
        }

        fn is_engaged(&self) -> bool {
            self.engaged
        }
    }

    #[test]
    fn failed_engage_is_retried() {
        let mut guard = FloorGuard::new(StuckRelay::default(), Thresholds::DEFAULT).unwrap();

        assert_eq!(guard.regulate(reading(32.0)), Err(()));
        assert_eq!(guard.mode(), Mode::HeatingAllowed);
        assert!(!guard.actuator().is_engaged());

        assert_eq!(guard.regulate(reading(32.0)), Ok(Some(Transition::Engage)));
        assert_eq!(guard.mode(), Mode::ForcedCooldown);
        assert!(guard.actuator().is_engaged());
    }

    #[test]
    fn disconnected_sensor_releases_cooldown() {
        let mut guard = FloorGuard::new(FakeCooler::default(), Thresholds::DEFAULT).unwrap();
        guard.regulate(reading(32.0)).unwrap();

        assert_eq!(guard.regulate(Reading::Disconnected), Ok(Some(Transition::Release)));
        assert_eq!(guard.mode(), Mode::HeatingAllowed);
        assert_eq!(guard.regulate(Reading::Disconnected), Ok(None));
    }

    #[test]
    fn effective_state_reads_line_when_released() {
        let mut cooler = FakeCooler::default();
        cooler.set_level(400);
        let mut guard = FloorGuard::new(cooler, Thresholds::DEFAULT).unwrap();
        assert_eq!(guard.effective_state(), Ok(EffectiveState::On));

        guard.actuator_mut().set_level(3);
        assert_eq!(guard.effective_state(), Ok(EffectiveState::Off));

        guard.regulate(reading(31.5)).unwrap();
        assert_eq!(guard.effective_state(), Ok(EffectiveState::Cooldown));
    }

    #[test]
    fn cycle_reports_one_line() {
        let mut guard = FloorGuard::new(FakeCooler::default(), Thresholds::DEFAULT).unwrap();
        let mut source = FakeThermometer::new(Temperature::from_num(31.5));
        let mut out = String::<64>::new();

        let cycle = block_on(guard.cycle(&mut source, &mut out, || 812)).unwrap();

        assert_eq!(cycle.transition, Some(Transition::Engage));
        assert_eq!(cycle.state, EffectiveState::Cooldown);
        assert_eq!(out.as_str(), "812 ms | 31.5 °C | COOLDOWN\r\n");
    }

    #[test]
    fn cycle_fails_when_console_is_full() {
        let mut guard = FloorGuard::new(FakeCooler::default(), Thresholds::DEFAULT).unwrap();
        let mut source = FakeThermometer::new(Temperature::from_num(20));
        let mut out = String::<8>::new();

        let res = block_on(guard.cycle(&mut source, &mut out, || 0));
        assert_eq!(res, Err(CycleError::Report));
    }
}
