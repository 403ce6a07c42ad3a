//! Controller deciding when the [`CooldownActuator`](crate::cooler::CooldownActuator) overrides
//! the thermostat.

use crate::{config, thermometer::Temperature};

pub mod hysteresis;

/// Whether the thermostat is currently being overridden.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// The thermostat runs its relay unmodified
    #[default]
    HeatingAllowed,
    /// The relay is held open until the floor cools down
    ForcedCooldown,
}

/// A mode change and the actuator call that goes with it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// `HeatingAllowed -> ForcedCooldown`
    Engage,
    /// `ForcedCooldown -> HeatingAllowed`
    Release,
}

impl Transition {
    /// The mode entered by this transition
    pub const fn target(self) -> Mode {
        match self {
            Self::Engage => Mode::ForcedCooldown,
            Self::Release => Mode::HeatingAllowed,
        }
    }
}

/// The two switching points. `enable_cooldown` is always strictly above `disable_cooldown`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Thresholds {
    enable_cooldown: Temperature,
    disable_cooldown: Temperature,
}

impl Thresholds {
    pub const DEFAULT: Self = Self {
        enable_cooldown: config::ENABLE_COOLDOWN_TEMP,
        disable_cooldown: config::DISABLE_COOLDOWN_TEMP,
    };

    /// Returns `None` unless `enable_cooldown > disable_cooldown`.
    pub fn new(enable_cooldown: Temperature, disable_cooldown: Temperature) -> Option<Self> {
        (enable_cooldown > disable_cooldown).then_some(Self {
            enable_cooldown,
            disable_cooldown,
        })
    }

    pub const fn enable_cooldown(&self) -> Temperature {
        self.enable_cooldown
    }

    pub const fn disable_cooldown(&self) -> Temperature {
        self.disable_cooldown
    }

    /// Decides the transition for one reading.
    ///
    /// Both comparisons are strict, so a reading exactly on a threshold holds the current mode,
    /// as does anything inside `[disable_cooldown, enable_cooldown]`.
    pub fn evaluate(&self, mode: Mode, temp: Temperature) -> Option<Transition> {
        match mode {
            Mode::HeatingAllowed if temp > self.enable_cooldown => Some(Transition::Engage),
            Mode::ForcedCooldown if temp < self.disable_cooldown => Some(Transition::Release),
            _ => None,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Thresholds {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(
            f,
            "cooldown above {=f32}, release below {=f32}",
            self.enable_cooldown.to_num::<f32>(),
            self.disable_cooldown.to_num::<f32>()
        );
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub trait Controller {
    /// Current mode
    fn mode(&self) -> Mode;

    /// The transition a reading calls for, without changing the mode
    fn decide(&self, temp: Temperature) -> Option<Transition>;

    /// Enter the target mode of `transition`
    fn apply(&mut self, transition: Transition);

    /// Run the controller for a single reading
    ///
    /// Returns the transition taken, if any. The mode is already updated when this returns.
    fn update(&mut self, temp: Temperature) -> Option<Transition> {
        let transition = self.decide(temp)?;
        self.apply(transition);
        Some(transition)
    }
}
