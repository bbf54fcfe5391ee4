//! # Triphase - Phase Switching Supervisor for AC EV Chargers
//!
//! A real-time supervisory controller that dynamically selects between one-,
//! two- and three-phase charging by actuating external line contactors,
//! coordinated with the underlying EVSE controller and an energy meter.
//!
//! ## Features
//!
//! - **Safe phase switching**: stop, pause, restart; contactors only switch
//!   de-energized, with configurable dwell and pause times
//! - **Dynamic phase selection**: static and dynamic operating modes with
//!   hysteresis against oscillation
//! - **Contactor supervision**: commanded-vs-observed feedback audit with a
//!   latching fault and forced safe state
//! - **Hardware watchdog**: relay channels driven as refreshed monoflops so
//!   a stalled controller de-energizes within one pulse width
//! - **Quick charging**: operator-forced three-phase charging at maximum
//!   current, from API or button
//! - **Web Interface**: REST API with wire-stable endpoint names and 12 h
//!   telemetry history
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of
//! concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `evse`: EVSE facade (charger lifecycle reads, command surface)
//! - `hardware`: relay and digital-in capability traits
//! - `meter`: energy meter facade
//! - `selector`: pure phase selection and current derivation
//! - `history`: fixed-capacity telemetry sample rings
//! - `switcher`: the sequencer state machine and its companion loops
//! - `sim`: loopback collaborator implementations for development and tests
//! - `web`: HTTP server and REST API

pub mod config;
pub mod error;
pub mod evse;
pub mod hardware;
pub mod history;
pub mod logging;
pub mod meter;
pub mod selector;
pub mod sim;
pub mod switcher;
pub mod web;

#[cfg(test)]
mod config_tests;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, TriphaseError};
pub use switcher::PhaseSwitcher;
