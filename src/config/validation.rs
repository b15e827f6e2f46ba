//! Configuration validation.

use crate::error::Result;

use super::{MachineConfig, MachineLimits};

/// Validate a machine configuration.
///
/// Checks:
/// - feedrates and accelerations are non-negative
/// - mapping strings use legal characters and fit their connector counts
/// - max-side endstops have a known travel range
/// - at most one homing origin per axis
/// - every motor-mapped axis has usable steps/mm and feedrate
///
/// This is the same pass [`MachineLimits::derive`] runs; use it when only
/// a yes/no answer is needed.
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    MachineLimits::derive(config).map(|_| ())
}
