//! Error types for gcode-motion.
//!
//! Construction-time configuration problems are the only recoverable error
//! domain: runtime move rejections are reported on the message stream and
//! returned as `false` to the parser, and invariant violations are bugs
//! (debug assertions).

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all gcode-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error.
    Config(ConfigError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration.
    ParseError(heapless::String<128>),
    /// Negative maximum feedrate configured for an axis.
    NegativeFeedrate {
        /// Axis letter.
        axis: char,
        /// Offending value in mm/s.
        value: f32,
    },
    /// Negative acceleration configured for an axis.
    NegativeAcceleration {
        /// Axis letter.
        axis: char,
        /// Offending value in mm/s².
        value: f32,
    },
    /// Axis-mapping string has more entries than motor connectors.
    MappingTooLong(usize),
    /// Character in the axis-mapping string is not an axis letter or `_`.
    InvalidAxisMapping(char),
    /// Character in a min/max endswitch string is not an axis letter or `_`.
    InvalidEndswitchMapping(char),
    /// Character in the endswitch-polarity string is not one of `01-+LH_`.
    InvalidEndswitchPolarity(char),
    /// Character in the home-order string is not an axis letter.
    InvalidHomeOrder(char),
    /// A max-side endstop was configured for an axis with no move range,
    /// so its trigger position is unknown.
    MaxEndstopWithoutRange(char),
    /// Both the min and max endstop of one axis are marked for homing.
    ConflictingHomeEndstops(char),
    /// An axis is mapped to a motor connector but has a non-positive
    /// steps/mm or max feedrate.
    UnusableAxis(char),
    /// File I/O error (std only).
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::NegativeFeedrate { axis, value } => {
                write!(f, "Invalid negative feedrate {:.1} for axis {}", value, axis)
            }
            ConfigError::NegativeAcceleration { axis, value } => {
                write!(
                    f,
                    "Invalid negative acceleration {:.1} for axis {}",
                    value, axis
                )
            }
            ConfigError::MappingTooLong(n) => {
                write!(
                    f,
                    "Axis mapping string has more elements than the {} available connectors",
                    n
                )
            }
            ConfigError::InvalidAxisMapping(c) => {
                write!(
                    f,
                    "Illegal axis->connector mapping character '{}' (only a valid axis letter or '_' to skip a connector)",
                    c
                )
            }
            ConfigError::InvalidEndswitchMapping(c) => {
                write!(
                    f,
                    "Illegal axis->endswitch mapping character '{}' (only a valid axis letter or '_' to skip a connector)",
                    c
                )
            }
            ConfigError::InvalidEndswitchPolarity(c) => {
                write!(f, "Illegal endswitch polarity character '{}'", c)
            }
            ConfigError::InvalidHomeOrder(c) => {
                write!(f, "Illegal axis letter '{}' in home order", c)
            }
            ConfigError::MaxEndstopWithoutRange(axis) => {
                write!(
                    f,
                    "Endstop for axis {} at max-endswitch implies a known position, yet no move range was given for that axis",
                    axis
                )
            }
            ConfigError::ConflictingHomeEndstops(axis) => {
                write!(
                    f,
                    "There can only be one home-origin for axis {}, but both min and max are set for homing",
                    axis
                )
            }
            ConfigError::UnusableAxis(axis) => {
                write!(
                    f,
                    "Axis {} is mapped to a motor but has an invalid feedrate or steps/mm",
                    axis
                )
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}
