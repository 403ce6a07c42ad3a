//! Underfloor heating guard.
//!
//! Watches the floor temperature through a DS18B20 and overrides the thermostat's heating relay
//! while the floor is too hot. Everything except the `board` adapters is hardware independent
//! and builds on the host.

#![cfg_attr(not(test), no_std)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::wildcard_imports)]

#[cfg(feature = "hardware")]
pub mod board;
pub mod config;
pub mod controller;
pub mod cooler;
pub mod ds18b20;
pub mod onewire;
pub mod retry;
pub mod status;
pub mod temp_controller;
pub mod thermometer;
