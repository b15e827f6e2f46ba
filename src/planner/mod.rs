//! The motion planner.
//!
//! A [`Planner`] is a state machine driven by parsed G-code events: it
//! buffers target positions in a small lookahead ring, plans junction
//! speeds between neighbours and emits trapezoidal [`MotorSegment`]s to
//! the motor back-end. Homing, probing and the auxiliary M-code surface
//! share the same segment primitive.

mod buffer;
mod homing;
mod kinematics;
mod mcodes;
mod segment;

pub use buffer::{AxisTarget, PlanningBuffer, PLANNING_BUFFER_DEPTH};
pub use homing::HomingState;
pub use mcodes::{
    AUX_BIT_FLOOD, AUX_BIT_MIST, AUX_BIT_SPINDLE_DIR, AUX_BIT_SPINDLE_ON, AUX_BIT_VACUUM,
    MAX_AUX_PIN,
};

use core::fmt;

use embedded_hal::delay::DelayNs;
use libm::{atan2f, fabsf, roundf};

use crate::axes::{AxesRegister, Axis, NUM_AXES};
use crate::config::{MachineConfig, MachineLimits};
use crate::error::Result;
use crate::hal::{lines, MachineIo, MotorOps};

use kinematics::euclid_distance;

/// Step frequency used when a move arrives with zero feedrate, so the
/// machine still creeps instead of stalling.
pub const ZERO_FEEDRATE_OVERRIDE_HZ: f32 = 5.0;

#[inline]
pub(crate) fn round2int(x: f32) -> i32 {
    roundf(x) as i32
}

/// Event-driven machine control.
///
/// Generic over:
/// - `M`: the motor back-end (must implement [`MotorOps`])
/// - `IO`: board GPIO/PWM access (must implement [`MachineIo`])
/// - `D`: delay provider for dwell and blink timing ([`DelayNs`])
/// - `W`: the message stream replies and diagnostics go to
///
/// Constructed from a validated [`MachineConfig`]; all derived limits are
/// immutable afterwards. The planner exclusively owns its lookahead
/// buffer and mutable state; emitted segments are handed to the back-end
/// by value.
pub struct Planner<M, IO, D, W>
where
    M: MotorOps,
    IO: MachineIo,
    D: DelayNs,
    W: fmt::Write,
{
    limits: MachineLimits,
    motor_ops: M,
    io: IO,
    delay: D,
    msg: Option<W>,

    /// Next buffered positions. Written by incoming G-code, read by
    /// outgoing motor movements.
    buffer: PlanningBuffer<PLANNING_BUFFER_DEPTH>,

    coordinate_display_origin: AxesRegister,
    current_feedrate: f32, // mm/s, set via Fxxx and remembered
    prog_speed_factor: f32, // speed factor set by program (M220)
    aux_bits: u16,
    spindle_rpm: u32,
    homing_state: HomingState,
}

impl<M, IO, D, W> Planner<M, IO, D, W>
where
    M: MotorOps,
    IO: MachineIo,
    D: DelayNs,
    W: fmt::Write,
{
    /// Validate the configuration and build a planner wired to the given
    /// back-end and peripherals.
    ///
    /// The initial machine position is the homed position: wherever the
    /// home endswitch is for each axis, origin otherwise.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if validation fails; no planner is
    /// constructed in that case.
    pub fn new(
        config: &MachineConfig,
        motor_ops: M,
        io: IO,
        delay: D,
        msg: Option<W>,
    ) -> Result<Self> {
        let limits = MachineLimits::derive(config)?;

        let mut buffer = PlanningBuffer::new();
        let sentinel = buffer.append();
        *sentinel = AxisTarget::default();
        for axis in Axis::ALL {
            let home_mm = limits.home_position_mm(axis);
            sentinel.position_steps[axis.index()] =
                round2int(home_mm * limits.steps_per_mm[axis.index()]);
        }

        // A conservative feedrate until the program sets one.
        let current_feedrate = config.max_feedrate[Axis::X.index()] / 10.0;

        Ok(Self {
            limits,
            motor_ops,
            io,
            delay,
            msg,
            buffer,
            coordinate_display_origin: AxesRegister::zero(),
            current_feedrate,
            prog_speed_factor: 1.0,
            aux_bits: 0,
            spindle_rpm: 0,
            homing_state: HomingState::NeverHomed,
        })
    }

    /// The derived machine limits this planner runs on.
    pub fn limits(&self) -> &MachineLimits {
        &self.limits
    }

    /// The motor back-end.
    pub fn motor_ops(&self) -> &M {
        &self.motor_ops
    }

    /// Mutable access to the motor back-end.
    pub fn motor_ops_mut(&mut self) -> &mut M {
        &mut self.motor_ops
    }

    /// The board peripherals.
    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    /// Replace the message stream, returning the previous one.
    pub fn set_msg_stream(&mut self, msg: Option<W>) -> Option<W> {
        core::mem::replace(&mut self.msg, msg)
    }

    /// The message stream, if one is attached.
    pub fn msg_stream(&self) -> Option<&W> {
        self.msg.as_ref()
    }

    /// Current homing confidence.
    pub fn homing_state(&self) -> HomingState {
        self.homing_state
    }

    /// The homed position per axis in mm: the endswitch side where one is
    /// configured, origin otherwise.
    pub fn home_position(&self) -> AxesRegister {
        let mut home = AxesRegister::zero();
        for axis in Axis::ALL {
            home[axis] = self.limits.home_position_mm(axis);
        }
        home
    }

    /// The most recently planned absolute position, in steps.
    pub fn last_planned_position_steps(&self) -> [i32; NUM_AXES] {
        self.buffer[self.buffer.len() - 1].position_steps
    }

    /// Machine-printf: only prints if a message stream is attached.
    pub(super) fn mprint(&mut self, args: fmt::Arguments) {
        if let Some(msg) = self.msg.as_mut() {
            let _ = msg.write_fmt(args);
        }
    }

    // -- path planning ------------------------------------------------

    /// If we have enough data in the buffer, issue a motor move.
    fn issue_motor_move_if_possible(&mut self) {
        if self.buffer.len() >= 3 {
            let last_pos = self.buffer[0]; // Current established position.
            let mut target_pos = self.buffer[1]; // Position we want to move to.
            let upcoming = self.buffer[2]; // Next upcoming.
            self.move_machine_steps(&last_pos, &mut target_pos, &upcoming);
            self.buffer[1] = target_pos; // achieved exit speed
            self.buffer.pop_front();
        }
    }

    /// Append a target for the given absolute mm position and plan.
    fn machine_move(&mut self, feedrate: f32, axes: &AxesRegister) {
        // We always have a previous position.
        let previous = *self.buffer.back();
        let mut new_pos = AxisTarget::default();
        let mut max_steps = -1i32;
        let mut defining_axis = Axis::X;

        // Real world -> machine coordinates. Rounded to the next full
        // step, but the error never accumulates: the absolute position is
        // the reference.
        for axis in Axis::ALL {
            let i = axis.index();
            new_pos.position_steps[i] = round2int(axes[i] * self.limits.steps_per_mm[i]);
            new_pos.delta_steps[i] = new_pos.position_steps[i] - previous.position_steps[i];

            // The defining axis is the one that has to travel the most
            // steps; it defines the step frequency. All other axes move
            // at a fraction of it.
            if new_pos.delta_steps[i].abs() > max_steps {
                max_steps = new_pos.delta_steps[i].abs();
                defining_axis = axis;
            }
        }
        new_pos.aux_bits = self.aux_bits;
        new_pos.defining_axis = defining_axis;
        new_pos.angle = previous.angle + 180.0; // default: force a speed change

        if max_steps > 0 {
            let d = defining_axis.index();
            let mut travel_speed = feedrate * self.limits.steps_per_mm[d];

            if defining_axis.is_cartesian() {
                // Choose the step frequency so that the Euclidean speed
                // matches the feedrate: a straight 200mm/s should be the
                // same as a diagonal 200mm/s. Each axis can have its own
                // steps/mm, so go through real-world lengths.
                let mm_of = |axis: Axis| {
                    let steps_per_mm = self.limits.steps_per_mm[axis.index()];
                    if steps_per_mm > 0.0 {
                        new_pos.delta_steps[axis.index()] as f32 / steps_per_mm
                    } else {
                        0.0
                    }
                };
                let x = mm_of(Axis::X);
                let y = mm_of(Axis::Y);
                let z = mm_of(Axis::Z);
                let total_xyz_len_mm = euclid_distance(x, y, z);
                let defining_axis_len_mm = mm_of(defining_axis);
                let euclid_fraction = fabsf(defining_axis_len_mm) / total_xyz_len_mm;
                travel_speed *= euclid_fraction;

                // A true XY vector gets its real heading.
                if z == 0.0 {
                    new_pos.angle = atan2f(y, x) / core::f32::consts::PI * 180.0;
                }
            }
            if travel_speed > self.limits.max_axis_speed[d] {
                travel_speed = self.limits.max_axis_speed[d];
            }
            if travel_speed <= 0.0 {
                let creep = ZERO_FEEDRATE_OVERRIDE_HZ / self.limits.steps_per_mm[d];
                self.mprint(format_args!(
                    "// Ignoring speed of 0, setting to {:.6} mm/s\n",
                    creep
                ));
                travel_speed = ZERO_FEEDRATE_OVERRIDE_HZ;
            }
            new_pos.speed = travel_speed;
        } else {
            new_pos.speed = 0.0;
        }

        *self.buffer.append() = new_pos;
        self.issue_motor_move_if_possible();
    }

    /// Let the in-flight path decelerate to a stop.
    ///
    /// Appends a halt marker at the last seen position with zero speed,
    /// which makes the previous segment plan its deceleration to zero.
    pub fn bring_path_to_halt(&mut self) {
        let previous = *self.buffer.back();
        let new_pos = self.buffer.append();
        new_pos.position_steps = previous.position_steps;
        new_pos.delta_steps = [0; NUM_AXES];
        new_pos.defining_axis = Axis::X;
        new_pos.speed = 0.0;
        new_pos.angle = previous.angle + 180.0;
        new_pos.aux_bits = self.aux_bits;
        self.issue_motor_move_if_possible();
    }

    fn homing_status_ok(&mut self) -> bool {
        if !self.limits.require_homing {
            return true;
        }
        if self.homing_state != HomingState::NeverHomed {
            return true;
        }
        self.mprint(format_args!("// ERROR: please home machine first (G28).\n"));
        false
    }

    fn within_machine_limits(&mut self, axes: &AxesRegister) -> bool {
        if !self.limits.range_check {
            return true;
        }

        for axis in Axis::ALL {
            let i = axis.index();
            // Machine cube is in the positive range.
            if axes[i] < 0.0 {
                if self.coordinate_display_origin[i] != 0.0 {
                    let min_in_system = -self.coordinate_display_origin[i];
                    self.mprint(format_args!(
                        "// ERROR outside machine limit: Axis {} < min allowed {:+.1}mm in current coordinate system. Ignoring move!\n",
                        axis.letter(),
                        min_in_system
                    ));
                } else {
                    self.mprint(format_args!(
                        "// ERROR outside machine limit: Axis {} < 0. Ignoring move!\n",
                        axis.letter()
                    ));
                }
                return false;
            }

            if self.limits.move_range_mm[i] <= 0.0 {
                continue; // max range not configured.
            }
            let max_limit = self.limits.move_range_mm[i];
            if axes[i] > max_limit {
                if self.coordinate_display_origin[i] != 0.0 {
                    let max_in_system = max_limit - self.coordinate_display_origin[i];
                    self.mprint(format_args!(
                        "// ERROR outside machine limit: Axis {} > max allowed {:+.1}mm in current coordinate system (={:.1}mm machine absolute). Ignoring move!\n",
                        axis.letter(),
                        max_in_system,
                        max_limit
                    ));
                } else {
                    self.mprint(format_args!(
                        "// ERROR outside machine limit: Axis {} > {:.1}mm. Ignoring move!\n",
                        axis.letter(),
                        max_limit
                    ));
                }
                return false;
            }
        }
        true
    }

    // -- event semantics ----------------------------------------------

    /// G1: linear move at the programmed feedrate.
    ///
    /// Returns `false` (with a diagnostic on the message stream) if the
    /// machine must be homed first or the target is outside its limits.
    pub fn coordinated_move(&mut self, feed_mm_per_sec: f32, target: &AxesRegister) -> bool {
        if !self.homing_status_ok() {
            return false;
        }
        if !self.within_machine_limits(target) {
            return false;
        }
        if feed_mm_per_sec > 0.0 {
            self.current_feedrate = self.limits.speed_factor * feed_mm_per_sec;
        }
        let feedrate = self.prog_speed_factor * self.current_feedrate;
        self.machine_move(feedrate, target);
        true
    }

    /// G0: rapid move at the machine's travel feedrate unless a usable
    /// feed is given.
    pub fn rapid_move(&mut self, feed_mm_per_sec: f32, target: &AxesRegister) -> bool {
        if !self.homing_status_ok() {
            return false;
        }
        if !self.within_machine_limits(target) {
            return false;
        }
        let rapid_feed = self.limits.g0_feedrate;
        let given = self.limits.speed_factor * self.prog_speed_factor * feed_mm_per_sec;
        self.machine_move(if given > 0.0 { given } else { rapid_feed }, target);
        true
    }

    /// G4: bring the path to a halt, drain the queue, sleep.
    pub fn dwell(&mut self, time_ms: f32) {
        self.bring_path_to_halt();
        self.motor_ops.wait_queue_empty();
        self.delay.delay_us((time_ms * 1000.0) as u32);
    }

    /// M17/M18/M84: energise or de-energise the motors.
    ///
    /// Switching off after homing lowers the homing confidence, since the
    /// machine may drift while unpowered.
    pub fn motors_enable(&mut self, enable: bool) {
        self.bring_path_to_halt();
        self.motor_ops.motor_enable(enable);
        if !enable && self.homing_state == HomingState::Homed {
            self.homing_state = HomingState::HomedButMotorsUnpowered;
        }
    }

    /// M220: set the programmed speed factor. Negative values are deltas
    /// from 100% (−0.10 → 90%); factors below 0.5% are rejected.
    pub fn set_speed_factor(&mut self, factor: f32) {
        let mut value = factor;
        if value < 0.0 {
            value += 1.0; // M220 S-10 interpreted as: 90%
        }
        if value < 0.005 {
            self.mprint(format_args!(
                "// M220: Not accepting speed factors < 0.5% (got {:.1}%)\n",
                100.0 * value
            ));
            return;
        }
        self.prog_speed_factor = value;
    }

    /// M106/M107: fan PWM duty from a 0..=255 value; 0 parks the line low.
    pub fn set_fanspeed(&mut self, value: f32) {
        if !(0.0..=255.0).contains(&value) {
            return;
        }
        let duty_cycle = value / 255.0;
        // The fan can be controlled by a GPIO or PWM signal.
        if duty_cycle == 0.0 {
            self.io.clear(lines::FAN);
            self.io.pwm_start(lines::FAN, false);
        } else {
            self.io.set(lines::FAN);
            self.io.pwm_set_duty(lines::FAN, duty_cycle);
            self.io.pwm_start(lines::FAN, true);
        }
    }

    /// Blink the status LED until the start button is released.
    pub fn wait_for_start(&mut self) {
        const FLASH_MS: u32 = 100;
        while self.io.read(lines::START) {
            self.io.set(lines::LED);
            self.delay.delay_ms(FLASH_MS);
            self.io.clear(lines::LED);
            self.delay.delay_ms(FLASH_MS);
        }
    }

    /// The parser tells us the display origin (G92 and friends); only
    /// used for position reporting.
    pub fn inform_origin_offset(&mut self, origin: &AxesRegister) {
        self.coordinate_display_origin = *origin;
    }

    /// Acknowledge a completed command on the message stream.
    pub fn gcode_command_done(&mut self, _letter: char, _value: f32) {
        self.mprint(format_args!("ok\n"));
    }

    /// M104/M109: temperature control is not wired up.
    pub fn set_temperature(&mut self, degrees_c: f32) {
        self.mprint(format_args!(
            "// gcode-motion: set_temperature({:.1}) not implemented.\n",
            degrees_c
        ));
    }

    /// M109/M116: temperature control is not wired up.
    pub fn wait_temperature(&mut self) {
        self.mprint(format_args!(
            "// gcode-motion: wait_temperature() not implemented.\n"
        ));
    }
}
