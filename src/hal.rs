//! Hardware abstraction seams.
//!
//! The planner never touches pins or the motor queue directly: board
//! peripherals are reached through the injected [`MachineIo`] trait and
//! motion is handed to a [`MotorOps`] back-end as [`MotorSegment`] values.
//! This keeps the planner unit-testable against recorded GPIO traces and
//! fake queues.

use crate::axes::NUM_MOTORS;

/// Number of endstop switch connectors on the board.
pub const NUM_ENDSTOPS: usize = 6;

/// Bitmap of motor connectors, one bit per connector index.
pub type DriverBitmap = u8;

/// Number of auxiliary output pins driven by M42/M62..M65.
pub const NUM_AUX_PINS: usize = 16;

/// Logical identifier of one board line (GPIO or PWM-capable output).
///
/// The numbering is the planner's own; a [`MachineIo`] implementation maps
/// it onto real pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Line(pub u8);

/// Well-known board lines.
pub mod lines {
    use super::{Line, NUM_AUX_PINS, NUM_ENDSTOPS};

    /// Emergency-stop switch output (M0 sets, M999 clears).
    pub const ESTOP: Line = Line(0);
    /// Start button input polled by `wait_for_start`.
    pub const START: Line = Line(1);
    /// Status LED, blinked while waiting for start.
    pub const LED: Line = Line(2);
    /// Part-cooling fan, PWM-capable (M106/M107).
    pub const FAN: Line = Line(3);
    /// Machine power relay (M80/M81).
    pub const MACHINE_POWER: Line = Line(4);

    /// Endstop switch inputs, by switch-connector index.
    pub const ENDSTOP: [Line; NUM_ENDSTOPS] = [
        Line(8),
        Line(9),
        Line(10),
        Line(11),
        Line(12),
        Line(13),
    ];

    /// Auxiliary outputs, by aux-bit index (M64/M65 drive these directly).
    pub const AUX: [Line; NUM_AUX_PINS] = [
        Line(16),
        Line(17),
        Line(18),
        Line(19),
        Line(20),
        Line(21),
        Line(22),
        Line(23),
        Line(24),
        Line(25),
        Line(26),
        Line(27),
        Line(28),
        Line(29),
        Line(30),
        Line(31),
    ];
}

/// Board peripheral access: GPIO reads/writes and PWM control.
///
/// All calls happen inside event handlers on the planner thread; there is
/// no interrupt contention to worry about.
pub trait MachineIo {
    /// Drive a line high.
    fn set(&mut self, line: Line);
    /// Drive a line low.
    fn clear(&mut self, line: Line);
    /// Read the current level of a line.
    fn read(&mut self, line: Line) -> bool;
    /// Enable or disable the PWM carrier on a line.
    fn pwm_start(&mut self, line: Line, enabled: bool);
    /// Set the PWM duty cycle (0.0..=1.0) on a line.
    fn pwm_set_duty(&mut self, line: Line, duty: f32);
}

/// One trapezoid piece handed to the motor back-end.
///
/// `v0` and `v1` are the entry and exit step frequencies (Hz) on whichever
/// motors move; step counts are signed per physical motor connector. The
/// sign already includes axis and per-driver direction flips.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorSegment {
    /// Entry step frequency in Hz.
    pub v0: f32,
    /// Exit step frequency in Hz.
    pub v1: f32,
    /// Signed step count per motor connector.
    pub steps: [i32; NUM_MOTORS],
    /// Auxiliary output bitmap active during this segment.
    pub aux_bits: u16,
}

impl MotorSegment {
    /// True if no motor moves in this segment.
    pub fn is_empty(&self) -> bool {
        self.steps.iter().all(|&s| s == 0)
    }
}

/// The motor back-end contract.
///
/// Segments must be executed in enqueue order; `enqueue` is infallible by
/// contract (a full hardware queue blocks, it does not fail).
pub trait MotorOps {
    /// Append one segment to the hardware queue.
    fn enqueue(&mut self, segment: MotorSegment);
    /// Block until the hardware queue has drained.
    fn wait_queue_empty(&mut self);
    /// Energise or de-energise the motor drivers.
    fn motor_enable(&mut self, enable: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_segment() {
        let mut seg = MotorSegment::default();
        assert!(seg.is_empty());
        seg.steps[3] = -1;
        assert!(!seg.is_empty());
    }

    #[test]
    fn test_line_tables_are_distinct() {
        let mut seen = [false; 64];
        let named = [
            lines::ESTOP,
            lines::START,
            lines::LED,
            lines::FAN,
            lines::MACHINE_POWER,
        ];
        for line in named
            .iter()
            .chain(lines::ENDSTOP.iter())
            .chain(lines::AUX.iter())
        {
            assert!(!seen[line.0 as usize], "duplicate line {:?}", line);
            seen[line.0 as usize] = true;
        }
    }
}
