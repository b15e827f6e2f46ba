//! The event-receiver contract between G-code parser and planner.
//!
//! A parser drives whatever implements [`GcodeEvents`]; every callback
//! runs to completion before the next is dispatched. The planner provides
//! this capability rather than inheriting from the parser, so alternative
//! receivers (simulators, recorders) plug into the same seam.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::axes::{AxesRegister, Axis, AxisBitmap};
use crate::hal::{MachineIo, MotorOps};
use crate::planner::Planner;

/// Receiver interface for parsed G-code events.
pub trait GcodeEvents {
    /// Start of program. Use for initialization.
    fn gcode_start(&mut self) {}

    /// End of program or stream.
    fn gcode_finished(&mut self);

    /// The coordinate-system origin changed (G92 and friends); affects
    /// position reporting only.
    fn inform_origin_offset(&mut self, origin: &AxesRegister);

    /// A command finished; acknowledge it.
    fn gcode_command_done(&mut self, letter: char, value: f32);

    /// No more input pending right now.
    fn input_idle(&mut self);

    /// M0-style start-button gate.
    fn wait_for_start(&mut self);

    /// G28: home the axes set in the bitmap.
    fn go_home(&mut self, axes: AxisBitmap);

    /// Probe an axis toward its travel endstop; the touched absolute
    /// position in mm on success.
    fn probe_axis(&mut self, feed_mm_per_sec: f32, axis: Axis) -> Option<f32>;

    /// M220: feedrate factor.
    fn set_speed_factor(&mut self, factor: f32);

    /// M106/M107: fan speed 0..=255.
    fn set_fanspeed(&mut self, value: f32);

    /// M104/M109: set temperature in Celsius.
    fn set_temperature(&mut self, degrees_c: f32);

    /// M109/M116: wait for temperature to be reached.
    fn wait_temperature(&mut self);

    /// G4: dwell for milliseconds with a drained queue.
    fn dwell(&mut self, time_ms: f32);

    /// M17/M18/M84: switch motor power.
    fn motors_enable(&mut self, enable: bool);

    /// G1: coordinated move; false if the move was rejected.
    fn coordinated_move(&mut self, feed_mm_per_sec: f32, target: &AxesRegister) -> bool;

    /// G0: rapid move; false if the move was rejected.
    fn rapid_move(&mut self, feed_mm_per_sec: f32, target: &AxesRegister) -> bool;

    /// A word the parser didn't understand, with the rest of its block.
    /// Returns the still-unconsumed tail, or `None` if the whole line was
    /// taken.
    fn unprocessed<'a>(&mut self, letter: char, value: f32, remaining: &'a str) -> Option<&'a str>;
}

/// Scan one `<letter><number>` word off the front of a G-code block
/// remainder.
///
/// Returns the uppercased letter, its value and the tail after the
/// number; `None` if the input doesn't start with a word.
pub fn parse_pair(input: &str) -> Option<(char, f32, &str)> {
    let input = input.trim_start();
    let letter = input.chars().next()?;
    if !letter.is_ascii_alphabetic() {
        return None;
    }
    let rest = input[1..].trim_start();
    let number_len = rest
        .find(|c: char| !matches!(c, '0'..='9' | '+' | '-' | '.'))
        .unwrap_or(rest.len());
    let value: f32 = rest[..number_len].parse().ok()?;
    Some((letter.to_ascii_uppercase(), value, &rest[number_len..]))
}

impl<M, IO, D, W> GcodeEvents for Planner<M, IO, D, W>
where
    M: MotorOps,
    IO: MachineIo,
    D: DelayNs,
    W: fmt::Write,
{
    fn gcode_finished(&mut self) {
        self.bring_path_to_halt();
    }

    fn inform_origin_offset(&mut self, origin: &AxesRegister) {
        Planner::inform_origin_offset(self, origin);
    }

    fn gcode_command_done(&mut self, letter: char, value: f32) {
        Planner::gcode_command_done(self, letter, value);
    }

    fn input_idle(&mut self) {
        self.bring_path_to_halt();
    }

    fn wait_for_start(&mut self) {
        Planner::wait_for_start(self);
    }

    fn go_home(&mut self, axes: AxisBitmap) {
        Planner::go_home(self, axes);
    }

    fn probe_axis(&mut self, feed_mm_per_sec: f32, axis: Axis) -> Option<f32> {
        Planner::probe_axis(self, feed_mm_per_sec, axis)
    }

    fn set_speed_factor(&mut self, factor: f32) {
        Planner::set_speed_factor(self, factor);
    }

    fn set_fanspeed(&mut self, value: f32) {
        Planner::set_fanspeed(self, value);
    }

    fn set_temperature(&mut self, degrees_c: f32) {
        Planner::set_temperature(self, degrees_c);
    }

    fn wait_temperature(&mut self) {
        Planner::wait_temperature(self);
    }

    fn dwell(&mut self, time_ms: f32) {
        Planner::dwell(self, time_ms);
    }

    fn motors_enable(&mut self, enable: bool) {
        Planner::motors_enable(self, enable);
    }

    fn coordinated_move(&mut self, feed_mm_per_sec: f32, target: &AxesRegister) -> bool {
        Planner::coordinated_move(self, feed_mm_per_sec, target)
    }

    fn rapid_move(&mut self, feed_mm_per_sec: f32, target: &AxesRegister) -> bool {
        Planner::rapid_move(self, feed_mm_per_sec, target)
    }

    fn unprocessed<'a>(&mut self, letter: char, value: f32, remaining: &'a str) -> Option<&'a str> {
        self.special_commands(letter, value, remaining)
    }
}
