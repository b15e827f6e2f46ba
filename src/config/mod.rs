//! Configuration module for gcode-motion.
//!
//! Construction is two-phase: a [`MachineConfig`] is deserialized (TOML
//! with the `std` feature) or built in code, then validated and turned
//! into the immutable derived [`MachineLimits`] the planner runs on.

mod limits;
mod machine;
mod mapping;
mod validation;
#[cfg(feature = "std")]
mod loader;

pub use limits::MachineLimits;
pub use machine::MachineConfig;
pub use mapping::EndstopConfig;
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};
