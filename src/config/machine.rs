//! Machine configuration as written by the user.

use heapless::String;
use serde::{Deserialize, Deserializer};

use crate::axes::{NUM_AXES, NUM_MOTORS};
use crate::hal::NUM_ENDSTOPS;

/// Complete machine configuration.
///
/// Per-axis arrays are in axis order `XYZEABCUVW`; TOML may give fewer
/// entries, the rest default to 0 (axis unused). String fields follow the
/// connector-mapping grammars described on each field.
///
/// A `MachineConfig` is only a bag of settings; nothing is checked until
/// it is turned into [`super::MachineLimits`] (or passed through
/// [`super::validate_config`]).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Steps per millimetre per axis. A negative value flips the axis
    /// direction; the magnitude is used for conversions.
    #[serde(deserialize_with = "axis_array")]
    pub steps_per_mm: [f32; NUM_AXES],

    /// Maximum feedrate per axis in mm/s. 0 marks the axis unused.
    #[serde(rename = "max_feedrate_mm_per_sec", deserialize_with = "axis_array")]
    pub max_feedrate: [f32; NUM_AXES],

    /// Maximum acceleration per axis in mm/s².
    #[serde(rename = "acceleration_mm_per_sec2", deserialize_with = "axis_array")]
    pub acceleration: [f32; NUM_AXES],

    /// Travel range per axis in mm; a value ≤ 0 means unbounded/unknown.
    #[serde(deserialize_with = "axis_array")]
    pub move_range_mm: [f32; NUM_AXES],

    /// Axis letter per motor connector, left to right. Uppercase drives
    /// the connector forward, lowercase reversed, `_` skips it
    /// (e.g. `"XYz_E"`). One axis may appear on several connectors
    /// (mirroring).
    pub axis_mapping: String<NUM_MOTORS>,

    /// Axis letter per endstop connector for the min side of the axis.
    /// Uppercase marks the switch as the homing origin.
    pub min_endswitch: String<NUM_ENDSTOPS>,

    /// Axis letter per endstop connector for the max side of the axis.
    /// Uppercase marks the switch as the homing origin; requires a
    /// configured `move_range_mm` for that axis.
    pub max_endswitch: String<NUM_ENDSTOPS>,

    /// Trigger polarity per endstop connector: `1`, `+` or `H` for
    /// high-triggered; `0`, `-`, `L` or `_` for low-triggered.
    pub endswitch_polarity: String<NUM_ENDSTOPS>,

    /// Axis letters in the order they are homed by G28.
    pub home_order: String<NUM_AXES>,

    /// Global feedrate scale applied to every commanded feed.
    pub speed_factor: f32,

    /// Junction angle in degrees below which two moves are treated as
    /// collinear and no deceleration is planned between them.
    pub threshold_angle: f32,

    /// Drain the motor queue before every enqueue (step-by-step mode).
    pub synchronous: bool,

    /// Reject moves until the machine has been homed.
    pub require_homing: bool,

    /// Reject moves outside `[0, move_range_mm]` per axis.
    pub range_check: bool,

    /// Dump the derived per-axis configuration to stderr at construction
    /// (std only).
    pub debug_print: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            steps_per_mm: pad([160.0, 160.0, 160.0, 40.0, 1.0]),
            max_feedrate: pad([200.0, 200.0, 90.0, 10.0, 1.0]),
            acceleration: pad([4000.0, 4000.0, 1000.0, 10000.0, 1.0]),
            move_range_mm: [0.0; NUM_AXES],
            axis_mapping: String::try_from("XYZEA").unwrap_or_default(),
            min_endswitch: String::new(),
            max_endswitch: String::new(),
            endswitch_polarity: String::new(),
            home_order: String::try_from("ZXY").unwrap_or_default(),
            speed_factor: 1.0,
            threshold_angle: 10.0,
            synchronous: false,
            require_homing: false,
            range_check: true,
            debug_print: false,
        }
    }
}

/// Extend a prefix of axis values with zeros for the unused axes.
const fn pad<const N: usize>(prefix: [f32; N]) -> [f32; NUM_AXES] {
    let mut out = [0.0; NUM_AXES];
    let mut i = 0;
    while i < N {
        out[i] = prefix[i];
        i += 1;
    }
    out
}

/// Deserialize up to `NUM_AXES` values, padding the tail with zeros.
fn axis_array<'de, D>(deserializer: D) -> Result<[f32; NUM_AXES], D::Error>
where
    D: Deserializer<'de>,
{
    let values: heapless::Vec<f32, NUM_AXES> = Deserialize::deserialize(deserializer)?;
    let mut out = [0.0; NUM_AXES];
    out[..values.len()].copy_from_slice(&values);
    Ok(out)
}
