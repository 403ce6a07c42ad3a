//! A simulated DS18B20 on a bit-banged bus.
//!
//! The pin and delay share one clock. Slot types are told apart by how long the master holds the
//! line low, the same way a real device does.

#![allow(dead_code)]

use std::{cell::RefCell, collections::VecDeque, convert::Infallible, rc::Rc};

use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::{InputPin, OutputPin},
};
use floor_guard::onewire::{crc::crc8, Address};

pub const ROM_SERIAL: [u8; 7] = [0x28, 0x60, 0xFB, 0x83, 0x0F, 0x00, 0x00];

enum Phase {
    /// Waiting for a reset
    Idle,
    RomCommand,
    Search { bit: usize },
    MatchRom,
    Function,
    WriteScratchpad,
    /// Draining `tx`, reads past the end float high
    Sending,
}

pub struct Device {
    pub rom: [u8; 8],
    pub scratchpad: [u8; 9],
    /// Raw value latched on CONVERT T, 1/16 °C
    pub temperature: i16,
    pub conversions: usize,
}

impl Device {
    pub fn new() -> Self {
        let mut rom = [0; 8];
        rom[..7].copy_from_slice(&ROM_SERIAL);
        rom[7] = crc8(&ROM_SERIAL);

        let mut device = Self {
            rom,
            // Power-on value: 85 °C, 9 bit resolution
            scratchpad: [0x50, 0x05, 0x4B, 0x46, 0x1F, 0xFF, 0x0C, 0x10, 0],
            temperature: 0,
            conversions: 0,
        };
        device.seal();
        device
    }

    pub fn address(&self) -> Address {
        Address(u64::from_le_bytes(self.rom))
    }

    fn seal(&mut self) {
        self.scratchpad[8] = crc8(&self.scratchpad[..8]);
    }

    fn rom_bit(&self, n: usize) -> bool {
        self.rom[n / 8] >> (n % 8) & 1 == 1
    }
}

struct State {
    now: u64,
    driven_low: bool,
    fell_at: u64,
    released_at: u64,
    presence_from: Option<u64>,
    hold_until: u64,
    device: Option<Device>,
    phase: Phase,
    rx: Vec<bool>,
    tx: VecDeque<bool>,
}

impl State {
    fn presence(&self) -> bool {
        self.device.is_some()
            && self
                .presence_from
                .is_some_and(|t| self.now >= t + 15 && self.now < t + 255)
    }

    fn line_high(&self) -> bool {
        !(self.driven_low || self.presence() || self.now < self.hold_until)
    }

    fn send_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            for i in 0..8 {
                self.tx.push_back(byte >> i & 1 == 1);
            }
        }
    }

    fn rx_bytes(&self) -> Vec<u8> {
        self.rx
            .chunks(8)
            .map(|bits| {
                bits.iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, b)| acc | (u8::from(*b) << i))
            })
            .collect()
    }

    fn push_search_pair(&mut self, bit: usize) {
        let own = self.device.as_ref().is_some_and(|d| d.rom_bit(bit));
        self.tx.push_back(own);
        self.tx.push_back(!own);
    }

    fn slot(&mut self) {
        let low_for = self.released_at - self.fell_at;

        if low_for >= 480 {
            self.presence_from = Some(self.released_at);
            self.phase = Phase::RomCommand;
            self.rx.clear();
            self.tx.clear();
            return;
        }
        if self.device.is_none() {
            return;
        }

        if low_for < 15 {
            if let Some(bit) = self.tx.pop_front() {
                // Read slot: a 0 is answered by holding the line low
                if !bit {
                    self.hold_until = self.fell_at + 30;
                }
            } else if !matches!(self.phase, Phase::Sending | Phase::Idle) {
                self.receive(true);
            }
        } else if low_for >= 60 {
            self.receive(false);
        }
    }

    fn receive(&mut self, bit: bool) {
        self.rx.push(bit);

        match self.phase {
            Phase::Idle | Phase::Sending => self.rx.clear(),
            Phase::RomCommand if self.rx.len() == 8 => {
                let cmd = self.rx_bytes()[0];
                self.rx.clear();
                self.phase = match cmd {
                    0xF0 => {
                        self.push_search_pair(0);
                        Phase::Search { bit: 0 }
                    }
                    0x55 => Phase::MatchRom,
                    0xCC => Phase::Function,
                    0x33 => {
                        let rom = self.device.as_ref().map(|d| d.rom).unwrap_or_default();
                        self.send_bytes(&rom);
                        Phase::Sending
                    }
                    _ => Phase::Idle,
                };
            }
            Phase::Search { bit: n } => {
                self.rx.clear();
                let own = self.device.as_ref().is_some_and(|d| d.rom_bit(n));
                self.phase = if own != bit || n == 63 {
                    Phase::Idle
                } else {
                    self.push_search_pair(n + 1);
                    Phase::Search { bit: n + 1 }
                };
            }
            Phase::MatchRom if self.rx.len() == 64 => {
                let selected = self.device.as_ref().is_some_and(|d| d.rom[..] == self.rx_bytes()[..]);
                self.rx.clear();
                self.phase = if selected { Phase::Function } else { Phase::Idle };
            }
            Phase::Function if self.rx.len() == 8 => {
                let cmd = self.rx_bytes()[0];
                self.rx.clear();
                let device = self.device.as_mut().expect("device present");
                self.phase = match cmd {
                    0x44 => {
                        let [lsb, msb] = device.temperature.to_le_bytes();
                        device.scratchpad[0] = lsb;
                        device.scratchpad[1] = msb;
                        device.seal();
                        device.conversions += 1;
                        Phase::Idle
                    }
                    0xBE => {
                        let scratchpad = device.scratchpad;
                        self.send_bytes(&scratchpad);
                        Phase::Sending
                    }
                    0x4E => Phase::WriteScratchpad,
                    _ => Phase::Idle,
                };
            }
            Phase::WriteScratchpad if self.rx.len() == 24 => {
                let data = self.rx_bytes();
                self.rx.clear();
                let device = self.device.as_mut().expect("device present");
                device.scratchpad[2..5].copy_from_slice(&data);
                device.seal();
                self.phase = Phase::Idle;
            }
            _ => {}
        }
    }
}

/// Handle to the simulated bus, cloned into the pin and the delay.
#[derive(Clone)]
pub struct Bus(Rc<RefCell<State>>);

impl Bus {
    pub fn with_device(device: Option<Device>) -> Self {
        Self(Rc::new(RefCell::new(State {
            now: 0,
            driven_low: false,
            fell_at: 0,
            released_at: 0,
            presence_from: None,
            hold_until: 0,
            device,
            phase: Phase::Idle,
            rx: Vec::new(),
            tx: VecDeque::new(),
        })))
    }

    pub fn new() -> Self {
        Self::with_device(Some(Device::new()))
    }

    pub fn empty() -> Self {
        Self::with_device(None)
    }

    pub fn pin(&self) -> SimPin {
        SimPin(self.clone())
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay(self.clone())
    }

    pub fn device<R>(&self, f: impl FnOnce(&mut Device) -> R) -> R {
        f(self.0.borrow_mut().device.as_mut().expect("device present"))
    }

    /// Connect a sensor to the bus
    pub fn plug(&self, device: Device) {
        self.0.borrow_mut().device = Some(device);
    }

    /// Pull the sensor off the bus
    pub fn unplug(&self) {
        self.0.borrow_mut().device = None;
    }
}

pub struct SimPin(Bus);

impl OutputPin for SimPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0 .0.borrow_mut();
        if !state.driven_low {
            state.driven_low = true;
            state.fell_at = state.now;
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0 .0.borrow_mut();
        if state.driven_low {
            state.driven_low = false;
            state.released_at = state.now;
            state.slot();
        }
        Ok(())
    }
}

impl InputPin for SimPin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.0 .0.borrow().line_high())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.0 .0.borrow().line_high())
    }
}

pub struct SimDelay(Bus);

impl DelayUs<u32> for SimDelay {
    fn delay_us(&mut self, us: u32) {
        self.0 .0.borrow_mut().now += u64::from(us);
    }
}
