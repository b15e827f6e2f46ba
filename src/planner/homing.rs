//! Endstop-seeking moves: homing and probing.
//!
//! Both loops share the motor-segment primitive with regular moves: short
//! fixed-size segments are enqueued and drained one by one while polling
//! the endstop GPIO between them.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::axes::{Axis, AxisBitmap};
use crate::hal::{Line, MachineIo, MotorOps, MotorSegment};

use super::{round2int, Planner};

/// Homing confidence.
///
/// If motor power is ever switched off after homing, the position can no
/// longer be trusted fully until the next homing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingState {
    /// The machine has not been homed since power-up.
    NeverHomed,
    /// Homed, but the motors were unpowered at least once since.
    HomedButMotorsUnpowered,
    /// Homed, position trusted.
    Homed,
}

/// Feedrate used for homing seeks, mm/s.
const HOMING_FEEDRATE_MM_PER_SEC: f32 = 15.0;

/// Fallback probing feedrate when the requested one is unusable, mm/s.
const DEFAULT_PROBE_FEEDRATE_MM_PER_SEC: f32 = 20.0;

impl<M, IO, D, W> Planner<M, IO, D, W>
where
    M: MotorOps,
    IO: MachineIo,
    D: DelayNs,
    W: fmt::Write,
{
    /// Seek an axis into its endstop; returns the signed steps moved.
    ///
    /// Enqueues 0.5mm segments toward the switch until it reads the
    /// trigger level, draining the queue between segments. With `backoff`
    /// the axis then retreats in 0.1mm segments until the switch releases.
    fn move_to_endstop(
        &mut self,
        axis: Axis,
        feedrate: f32,
        backoff: bool,
        dir: i32,
        trigger_level: bool,
        line: Line,
    ) -> i32 {
        let mut total_movement = 0;
        let steps_per_mm = self.limits().steps_per_mm[axis.index()];
        let mut target_speed = feedrate * steps_per_mm;
        if target_speed > self.limits().max_axis_speed[axis.index()] {
            target_speed = self.limits().max_axis_speed[axis.index()];
        }

        let mut command = MotorSegment {
            v0: 0.0,
            v1: target_speed,
            ..MotorSegment::default()
        };

        // move axis until endstop is hit
        let mut segment_move_steps = round2int(0.5 * steps_per_mm) * dir;
        self.assign_steps_to_motors(&mut command, axis, segment_move_steps);
        while self.io_mut().read(line) != trigger_level {
            self.motor_ops_mut().enqueue(command);
            self.motor_ops_mut().wait_queue_empty();
            total_movement += segment_move_steps;
            command.v0 = command.v1;
        }

        if backoff {
            // move axis off the switch again
            segment_move_steps = round2int(0.1 * steps_per_mm) * -dir;
            self.assign_steps_to_motors(&mut command, axis, segment_move_steps);
            while self.io_mut().read(line) == trigger_level {
                self.motor_ops_mut().enqueue(command);
                self.motor_ops_mut().wait_queue_empty();
                total_movement += segment_move_steps;
            }
        }

        total_movement
    }

    /// Home one axis against its homing endstop, then pin the planned
    /// position to the switch's known coordinate. No-op without a homing
    /// switch.
    fn home_axis(&mut self, axis: Axis) {
        let Some((endstop, dir)) = self.limits().home_endstop(axis) else {
            return;
        };
        let Some(line) = endstop.line() else {
            return;
        };
        self.move_to_endstop(
            axis,
            HOMING_FEEDRATE_MM_PER_SEC,
            true,
            dir,
            endstop.trigger_level,
            line,
        );
        let home_pos = self.limits().home_position_mm(axis);
        let steps = round2int(home_pos * self.limits().steps_per_mm[axis.index()]);
        self.buffer.back().position_steps[axis.index()] = steps;
    }

    /// G28: halt the path, home the requested axes in the configured
    /// order, and mark the machine as homed.
    pub fn go_home(&mut self, axes: AxisBitmap) {
        self.bring_path_to_halt();
        let order = self.limits().home_order.clone();
        for axis in order {
            if axes & axis.bit() == 0 {
                continue;
            }
            self.home_axis(axis);
        }
        self.homing_state = HomingState::Homed;
    }

    /// G30-style probe: seek the axis into its non-homing endstop and
    /// report the touched position in absolute mm.
    ///
    /// Returns `None` (with a diagnostic) if the machine must be homed
    /// first or the axis has no travel endstop free for probing.
    pub fn probe_axis(&mut self, feedrate: f32, axis: Axis) -> Option<f32> {
        if !self.homing_status_ok() {
            return None;
        }

        self.bring_path_to_halt();

        // Use the switch that is _not_ the homing origin for this axis.
        let i = axis.index();
        let mut dir = 1;
        let mut endstop = self.limits().max_endstop[i];
        if self.limits().min_endstop[i].connector.is_some()
            && !self.limits().min_endstop[i].homing_use
        {
            dir = -1;
            endstop = self.limits().min_endstop[i];
        }
        let line = match endstop.line() {
            Some(line) if !endstop.homing_use => line,
            _ => {
                self.mprint(format_args!(
                    "// gcode-motion: No probe - axis {} does not have a travel endstop\n",
                    axis.letter()
                ));
                return None;
            }
        };

        let feedrate = if feedrate <= 0.0 {
            DEFAULT_PROBE_FEEDRATE_MM_PER_SEC
        } else {
            feedrate
        };
        // A probe that never triggers has no timeout; upstream owns
        // cancellation.
        let total_steps =
            self.move_to_endstop(axis, feedrate, false, dir, endstop.trigger_level, line);
        let steps_per_mm = self.limits().steps_per_mm[i];
        let last = self.buffer.back();
        last.position_steps[i] += total_steps;
        Some(last.position_steps[i] as f32 / steps_per_mm)
    }
}
