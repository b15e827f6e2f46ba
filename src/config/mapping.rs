//! Connector-mapping string grammars.
//!
//! Motors, endstops and the homing order are all configured as short
//! strings indexed by connector position. This module parses them into
//! the derived tables used at runtime.

use heapless::Vec;

use crate::axes::{Axis, NUM_AXES, NUM_MOTORS};
use crate::error::ConfigError;
use crate::hal::{lines, DriverBitmap, Line, NUM_ENDSTOPS};

/// One endstop switch assignment for an axis side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndstopConfig {
    /// Switch-connector index, if an endstop is wired for this side.
    pub connector: Option<u8>,
    /// Level read when the switch is triggered.
    pub trigger_level: bool,
    /// Whether this switch is the homing origin for the axis.
    pub homing_use: bool,
}

impl EndstopConfig {
    /// The GPIO line of the mapped switch connector.
    pub fn line(&self) -> Option<Line> {
        self.connector.map(|c| lines::ENDSTOP[c as usize])
    }
}

/// Parse the axis→motor-connector mapping string.
///
/// Returns the per-axis driver bitmap and per-connector direction flip.
/// Lowercase letters reverse the individual connector; `_` leaves it
/// unconnected.
pub(super) fn parse_axis_mapping(
    mapping: &str,
) -> Result<([DriverBitmap; NUM_AXES], [i32; NUM_MOTORS]), ConfigError> {
    let mut axis_to_driver = [0 as DriverBitmap; NUM_AXES];
    let mut driver_flip = [1; NUM_MOTORS];

    for (connector, c) in mapping.chars().enumerate() {
        if connector >= NUM_MOTORS {
            return Err(ConfigError::MappingTooLong(NUM_MOTORS));
        }
        if c == '_' {
            continue;
        }
        let axis = Axis::from_letter(c).ok_or(ConfigError::InvalidAxisMapping(c))?;
        driver_flip[connector] = if c.is_ascii_lowercase() { -1 } else { 1 };
        axis_to_driver[axis.index()] |= 1 << connector;
    }
    Ok((axis_to_driver, driver_flip))
}

/// Parse the endswitch polarity string into per-connector trigger levels.
pub(super) fn parse_polarity(polarity: &str) -> Result<[bool; NUM_ENDSTOPS], ConfigError> {
    let mut trigger = [false; NUM_ENDSTOPS];
    for (connector, c) in polarity.chars().enumerate() {
        if connector >= NUM_ENDSTOPS {
            return Err(ConfigError::MappingTooLong(NUM_ENDSTOPS));
        }
        trigger[connector] = match c {
            '_' | '0' | '-' | 'L' => false,
            '1' | '+' | 'H' => true,
            other => return Err(ConfigError::InvalidEndswitchPolarity(other)),
        };
    }
    Ok(trigger)
}

/// Parse one min/max endswitch mapping string.
///
/// String position is the switch-connector index; an uppercase axis
/// letter additionally marks the switch for homing use.
pub(super) fn parse_endswitch(
    mapping: &str,
    trigger: &[bool; NUM_ENDSTOPS],
) -> Result<[EndstopConfig; NUM_AXES], ConfigError> {
    let mut endstops = [EndstopConfig::default(); NUM_AXES];
    for (connector, c) in mapping.chars().enumerate() {
        if connector >= NUM_ENDSTOPS {
            return Err(ConfigError::MappingTooLong(NUM_ENDSTOPS));
        }
        if c == '_' {
            continue;
        }
        let axis = Axis::from_letter(c).ok_or(ConfigError::InvalidEndswitchMapping(c))?;
        endstops[axis.index()] = EndstopConfig {
            connector: Some(connector as u8),
            trigger_level: trigger[connector],
            homing_use: c.is_ascii_uppercase(),
        };
    }
    Ok(endstops)
}

/// Parse the home-order string into an axis sequence.
pub(super) fn parse_home_order(order: &str) -> Result<Vec<Axis, NUM_AXES>, ConfigError> {
    let mut axes = Vec::new();
    for c in order.chars() {
        let axis = Axis::from_letter(c).ok_or(ConfigError::InvalidHomeOrder(c))?;
        axes.push(axis).map_err(|_| ConfigError::InvalidHomeOrder(c))?;
    }
    Ok(axes)
}
