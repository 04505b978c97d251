//! diykb keyboard core
//!
//! Everything between the switch matrix and the HID transport of a
//! keyboard controller: matrix scanning with per-key time based debounce,
//! tracking of the keycode each key was pressed with, and composition of
//! the 6-key boot protocol report.
//!
//! All of the state is owned by explicit structures and every operation
//! takes the current time from the caller, so the whole pipeline can be
//! driven from a cooperative main loop (or from a test).

#![cfg_attr(not(any(feature = "std", test)), no_std)]
// #![deny(missing_docs)]

pub use usbd_human_interface_device::page::Keyboard;

pub mod config;
pub mod controller;
pub mod debounce;
pub mod host;
pub mod keymap;
pub mod matrix;
pub mod report;
pub mod tracker;

#[cfg(test)]
mod testlog;

pub use host::{HidReportType, HostReports, IndicatorHooks, Indicators};
pub use controller::Controller;
pub use keymap::Keymap;
pub use matrix::{Matrix, MatrixConfig, MatrixHooks};
pub use report::{BootReport, Composer, Modifiers, Transport};
pub use tracker::{ActionEvent, Actions, KeyTracker, Layers};

/// A point in time, in microseconds, as supplied by the caller's monotonic
/// timer.
pub type Instant = fugit::TimerInstantU64<1_000_000>;

/// A span of time in microseconds.
pub type Duration = fugit::MicrosDurationU64;
