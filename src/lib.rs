//! # gcode-motion
//!
//! Event-driven motion planning for multi-axis stepper-motor machines
//! (3D printers, CNC mills, plotters).
//!
//! The engine consumes a stream of parsed G-code events carrying target
//! positions in millimetres and emits trapezoidal motor segments
//! (accelerate / cruise / decelerate) in integer motor steps and
//! step-frequencies, honouring per-axis feedrate and acceleration limits.
//!
//! ## Features
//!
//! - **Configuration-driven**: machine geometry and limits come from a
//!   validated [`MachineConfig`] (TOML with the `std` feature)
//! - **One-segment lookahead**: junction speeds between consecutive moves
//!   avoid needless full stops on collinear paths
//! - **embedded-hal 1.0**: `DelayNs` for dwell and blink timing; GPIO and
//!   PWM go through the injected [`MachineIo`] trait
//! - **no_std compatible**: the planner core works without the standard
//!   library
//! - **Homing and probing**: endstop-seeking loops share the segment
//!   primitive with regular moves
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gcode_motion::{GcodeEvents, MachineConfig, Planner};
//!
//! // Load and validate machine configuration from TOML
//! let config: MachineConfig = gcode_motion::load_config("machine.toml")?;
//!
//! // Wire the planner to the motor back-end and board peripherals
//! let mut planner = Planner::new(&config, motor_ops, io, delay)?;
//!
//! // Feed it parsed G-code events
//! planner.coordinated_move(50.0, &target);
//! planner.gcode_finished();
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): file I/O, TOML parsing, stderr diagnostics
//! - `alloc`: heap allocation for no_std with allocator
//! - `defmt`: defmt logging for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod axes;
pub mod config;
pub mod error;
pub mod events;
pub mod hal;
pub mod planner;

// Re-exports for ergonomic API
pub use axes::{AxesRegister, Axis, AxisBitmap, NUM_AXES, NUM_MOTORS};
pub use config::{validate_config, MachineConfig, MachineLimits};
pub use error::{Error, Result};
pub use events::GcodeEvents;
pub use hal::{Line, MachineIo, MotorOps, MotorSegment};
pub use planner::{HomingState, Planner};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::load_config;
