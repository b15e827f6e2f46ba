//! Configuration loading from files (std only).

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Error, Result};

use super::{validate_config, MachineConfig};

/// Load and validate a machine configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the TOML is invalid, or
/// validation fails.
///
/// # Example
///
/// ```rust,ignore
/// use gcode_motion::load_config;
///
/// let config = load_config("machine.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MachineConfig> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        let msg = heapless::String::try_from(e.to_string().as_str()).unwrap_or_default();
        Error::Config(ConfigError::IoError(msg))
    })?;

    parse_config(&content)
}

/// Parse and validate a machine configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<MachineConfig> {
    let config: MachineConfig = toml::from_str(content).map_err(|e| {
        let msg = heapless::String::try_from(e.message()).unwrap_or_default();
        Error::Config(ConfigError::ParseError(msg))
    })?;

    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
steps_per_mm = [80.0, 80.0, 400.0]
max_feedrate_mm_per_sec = [300.0, 300.0, 5.0]
acceleration_mm_per_sec2 = [1500.0, 1500.0, 100.0]
axis_mapping = "XYZ"
"#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.steps_per_mm[2], 400.0);
        assert_eq!(config.axis_mapping.as_str(), "XYZ");
    }

    #[test]
    fn test_parse_with_endstops() {
        let toml = r#"
axis_mapping = "XYZE"
min_endswitch = "XY_Z"
endswitch_polarity = "HH_H"
home_order = "ZXY"
require_homing = true
"#;

        let config = parse_config(toml).unwrap();
        assert!(config.require_homing);
        assert_eq!(config.min_endswitch.as_str(), "XY_Z");
    }

    #[test]
    fn test_parse_rejects_bad_mapping() {
        let toml = r#"
axis_mapping = "XYQ"
"#;
        assert!(parse_config(toml).is_err());
    }
}
