//! # Longlapse Library
//!
//! Internal library for the longlapse binary: a sunrise-to-sunset timelapse
//! recorder that captures one frame per cadence tick, archives the day's batch
//! to a remote host over SSH and deletes it locally once every file arrived.
//!
//! ## Architecture
//!
//! - **Entry Point**: [`Longlapse`] acquires process-wide resources and runs one day
//! - **Core Logic**: `core` holds the capture session state machine and run report
//! - **Geographic**: `geo` computes sunrise, sunset and the day schedule
//! - **Devices**: `camera` drives the still camera, `remote` the archive host
//! - **Configuration**: `config` for TOML settings with validation
//! - **Infrastructure**: `time` clocks and timers, `io` signals, lock and
//!   filesystem helpers, `common` logging and utilities

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod common;

pub mod args;
pub mod camera;
pub mod commands;
pub mod config;
pub mod core;
pub mod geo;
pub mod io;
pub mod remote;
pub mod time;

mod longlapse;

pub use longlapse::Longlapse;
