use crate::{
    controller::{Controller, Mode, Thresholds, Transition},
    thermometer::Temperature,
};

/// Two-point (bang-bang) controller.
#[derive(Debug, Clone)]
pub struct HysteresisController {
    thresholds: Thresholds,
    mode: Mode,
}

impl HysteresisController {
    /// Starts in [`Mode::HeatingAllowed`]
    pub const fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            mode: Mode::HeatingAllowed,
        }
    }

    pub const fn thresholds(&self) -> Thresholds {
        self.thresholds
    }
}

impl Default for HysteresisController {
    fn default() -> Self {
        Self::new(Thresholds::DEFAULT)
    }
}

impl Controller for HysteresisController {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn decide(&self, temp: Temperature) -> Option<Transition> {
        self.thresholds.evaluate(self.mode, temp)
    }

    fn apply(&mut self, transition: Transition) {
        self.mode = transition.target();
    }
}
