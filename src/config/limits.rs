//! Derived machine limits.
//!
//! All per-axis conversions (steps/s, steps/s²), connector tables and
//! endstop assignments are computed once from a [`MachineConfig`] and are
//! immutable afterwards. The planner only ever sees this type.

use heapless::Vec;
use libm::fabsf;

use crate::axes::{Axis, NUM_AXES, NUM_MOTORS};
use crate::error::{ConfigError, Result};
use crate::hal::DriverBitmap;

use super::machine::MachineConfig;
use super::mapping::{
    parse_axis_mapping, parse_endswitch, parse_home_order, parse_polarity, EndstopConfig,
};

/// Validated, derived machine parameters.
#[derive(Debug, Clone)]
pub struct MachineLimits {
    /// Steps per millimetre per axis, always positive (direction lives in
    /// [`Self::axis_flip`]).
    pub steps_per_mm: [f32; NUM_AXES],
    /// Per-axis direction flip extracted from the sign of the configured
    /// steps/mm.
    pub axis_flip: [i32; NUM_AXES],
    /// Per-connector direction flip from lowercase mapping letters.
    pub driver_flip: [i32; NUM_MOTORS],
    /// Motor connectors driven by each axis (mirroring allowed).
    pub axis_to_driver: [DriverBitmap; NUM_AXES],
    /// Maximum travel speed per axis in steps/s.
    pub max_axis_speed: [f32; NUM_AXES],
    /// Maximum acceleration per axis in steps/s².
    pub max_axis_accel: [f32; NUM_AXES],
    /// Feedrate used for G0 when none is given: the highest configured
    /// axis feedrate, in mm/s.
    pub g0_feedrate: f32,
    /// Travel range per axis in mm (≤ 0 = unbounded).
    pub move_range_mm: [f32; NUM_AXES],
    /// Min-side endstop per axis.
    pub min_endstop: [EndstopConfig; NUM_AXES],
    /// Max-side endstop per axis.
    pub max_endstop: [EndstopConfig; NUM_AXES],
    /// Axes in homing order.
    pub home_order: Vec<Axis, NUM_AXES>,
    /// Global feedrate scale.
    pub speed_factor: f32,
    /// Collinearity threshold in degrees for junction planning.
    pub threshold_angle: f32,
    /// Drain the motor queue before every enqueue.
    pub synchronous: bool,
    /// Reject moves until homed.
    pub require_homing: bool,
    /// Reject moves outside the machine cube.
    pub range_check: bool,
}

impl MachineLimits {
    /// Validate a configuration and compute the derived limits.
    pub fn derive(config: &MachineConfig) -> Result<Self> {
        let mut steps_per_mm = [0.0; NUM_AXES];
        let mut axis_flip = [1; NUM_AXES];
        let mut max_axis_speed = [0.0; NUM_AXES];
        let mut max_axis_accel = [0.0; NUM_AXES];
        let mut g0_feedrate = 0.0f32;

        for axis in Axis::ALL {
            let i = axis.index();
            axis_flip[i] = if config.steps_per_mm[i] < 0.0 { -1 } else { 1 };
            steps_per_mm[i] = fabsf(config.steps_per_mm[i]);
            if config.max_feedrate[i] < 0.0 {
                return Err(ConfigError::NegativeFeedrate {
                    axis: axis.letter(),
                    value: config.max_feedrate[i],
                }
                .into());
            }
            if config.acceleration[i] < 0.0 {
                return Err(ConfigError::NegativeAcceleration {
                    axis: axis.letter(),
                    value: config.acceleration[i],
                }
                .into());
            }
            if config.max_feedrate[i] > g0_feedrate {
                g0_feedrate = config.max_feedrate[i];
            }
            max_axis_speed[i] = config.max_feedrate[i] * steps_per_mm[i];
            max_axis_accel[i] = config.acceleration[i] * steps_per_mm[i];
        }

        let (axis_to_driver, driver_flip) = parse_axis_mapping(config.axis_mapping.as_str())?;
        let trigger = parse_polarity(config.endswitch_polarity.as_str())?;
        let min_endstop = parse_endswitch(config.min_endswitch.as_str(), &trigger)?;
        let max_endstop = parse_endswitch(config.max_endswitch.as_str(), &trigger)?;
        let home_order = parse_home_order(config.home_order.as_str())?;

        for axis in Axis::ALL {
            let i = axis.index();
            // A max-side switch position is only known with a finite range.
            if max_endstop[i].connector.is_some() && config.move_range_mm[i] <= 0.0 {
                return Err(ConfigError::MaxEndstopWithoutRange(axis.letter()).into());
            }
            // Only one homing origin per axis.
            if min_endstop[i].connector.is_some()
                && max_endstop[i].connector.is_some()
                && min_endstop[i].homing_use
                && max_endstop[i].homing_use
            {
                return Err(ConfigError::ConflictingHomeEndstops(axis.letter()).into());
            }
            // Axes wired to a motor need usable conversion factors.
            if axis_to_driver[i] != 0 && (steps_per_mm[i] <= 0.0 || config.max_feedrate[i] <= 0.0) {
                return Err(ConfigError::UnusableAxis(axis.letter()).into());
            }
        }

        let limits = Self {
            steps_per_mm,
            axis_flip,
            driver_flip,
            axis_to_driver,
            max_axis_speed,
            max_axis_accel,
            g0_feedrate,
            move_range_mm: config.move_range_mm,
            min_endstop,
            max_endstop,
            home_order,
            speed_factor: config.speed_factor,
            threshold_angle: config.threshold_angle,
            synchronous: config.synchronous,
            require_homing: config.require_homing,
            range_check: config.range_check,
        };

        #[cfg(feature = "std")]
        if config.debug_print {
            limits.dump_config();
        }

        Ok(limits)
    }

    /// The endstop used to home an axis, with its seek direction.
    ///
    /// Prefers the min side if it is marked for homing, else the max side;
    /// `None` if the axis has no homing switch.
    pub fn home_endstop(&self, axis: Axis) -> Option<(EndstopConfig, i32)> {
        let i = axis.index();
        if self.min_endstop[i].connector.is_some() && self.min_endstop[i].homing_use {
            return Some((self.min_endstop[i], -1));
        }
        if self.max_endstop[i].connector.is_some() && self.max_endstop[i].homing_use {
            return Some((self.max_endstop[i], 1));
        }
        None
    }

    /// Home position of an axis in mm: 0 on the min side, the end of the
    /// travel range on the max side. 0 for axes without a homing switch.
    pub fn home_position_mm(&self, axis: Axis) -> f32 {
        match self.home_endstop(axis) {
            Some((_, dir)) if dir > 0 => self.move_range_mm[axis.index()],
            _ => 0.0,
        }
    }

    /// Whether any motor connector is driven by this axis.
    #[inline]
    pub fn axis_is_driven(&self, axis: Axis) -> bool {
        self.axis_to_driver[axis.index()] != 0
    }

    #[cfg(feature = "std")]
    fn dump_config(&self) {
        eprintln!("-- Config --");
        for axis in Axis::ALL {
            let i = axis.index();
            if self.axis_to_driver[i] == 0 {
                continue;
            }
            let speed = self.max_axis_speed[i] / self.steps_per_mm[i];
            let accel = self.max_axis_accel[i] / self.steps_per_mm[i];
            eprint!(
                "{} axis: {:5.1}mm/s, {:7.1}mm/s^2, {:9.4} steps/mm{} ",
                axis.letter(),
                speed,
                accel,
                self.steps_per_mm[i],
                if self.axis_flip[i] < 0 {
                    " (reversed)"
                } else {
                    ""
                }
            );
            if self.move_range_mm[i] > 0.0 {
                eprint!("[ limit {:5.1}mm ] ", self.move_range_mm[i]);
            } else {
                eprint!("[ unknown limit ] ");
            }
            for (side, endstop) in [("min", self.min_endstop[i]), ("max", self.max_endstop[i])] {
                if let Some(connector) = endstop.connector {
                    eprint!(
                        "{}-switch {} ({}-trigger){} ",
                        side,
                        connector + 1,
                        if endstop.trigger_level { "hi" } else { "lo" },
                        if endstop.homing_use { " [HOME]" } else { "" }
                    );
                }
            }
            if !self.range_check {
                eprint!("Limit checks disabled!");
            }
            eprintln!();
        }
    }
}
