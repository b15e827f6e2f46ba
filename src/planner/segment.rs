//! Segment emission: turn one planned target into up to three motor
//! segments (accelerate, cruise, decelerate) with kinematically
//! consistent entry and exit speeds.

use core::fmt;

use embedded_hal::delay::DelayNs;
use libm::fabsf;

use crate::axes::{Axis, NUM_AXES, NUM_MOTORS};
use crate::hal::{MachineIo, MotorOps, MotorSegment};

use super::buffer::AxisTarget;
use super::kinematics::{joining_speed, peak_speed, speed_for_axis, steps_for_speed_change};
use super::Planner;

/// Subtract per-motor steps; true if anything non-zero remains.
fn subtract_steps(value: &mut MotorSegment, subtract: &MotorSegment) -> bool {
    let mut has_nonzero = false;
    for i in 0..NUM_MOTORS {
        value.steps[i] -= subtract.steps[i];
        has_nonzero |= value.steps[i] != 0;
    }
    has_nonzero
}

impl<M, IO, D, W> Planner<M, IO, D, W>
where
    M: MotorOps,
    IO: MachineIo,
    D: DelayNs,
    W: fmt::Write,
{
    /// Assign steps to all the motors responsible for the given axis,
    /// with axis and per-driver direction flips applied.
    pub(super) fn assign_steps_to_motors(
        &self,
        command: &mut MotorSegment,
        axis: Axis,
        steps: i32,
    ) {
        let motormap_for_axis = self.limits().axis_to_driver[axis.index()];
        for motor in 0..NUM_MOTORS {
            if motormap_for_axis & (1 << motor) != 0 {
                command.steps[motor] =
                    self.limits().axis_flip[axis.index()] * self.limits().driver_flip[motor] * steps;
            }
        }
    }

    /// Acceleration used for this move, in steps/s² on the defining axis.
    // TODO: scale down when a non-defining axis of a diagonal move would
    // exceed its own acceleration limit.
    fn acceleration_for_move(&self, _axis_steps: &[i32; NUM_AXES], defining_axis: Axis) -> f32 {
        self.limits().max_axis_accel[defining_axis.index()]
    }

    /// Move the given number of machine steps for each axis.
    ///
    /// Emits up to three segments: accelerating from `last_pos`'s speed
    /// to the target speed, regular travel, and decelerating to a speed
    /// the upcoming segment never has to brake below. Very short ramps
    /// are folded into a single cruise segment so arc-shaped paths don't
    /// rattle through hundreds of tiny speed changes.
    ///
    /// Deceleration is planned here, so `target_pos.speed` is updated to
    /// the speed actually held at the end of the move.
    pub(super) fn move_machine_steps(
        &mut self,
        last_pos: &AxisTarget,
        target_pos: &mut AxisTarget,
        upcoming: &AxisTarget,
    ) {
        if target_pos.delta_steps[target_pos.defining_axis.index()] == 0 {
            // A non-defining axis moving without defining-axis steps is
            // not a state the driver produces.
            debug_assert!(target_pos.delta_steps.iter().all(|&d| d == 0));
            return;
        }
        debug_assert!(target_pos.speed > 0.0); // Speed is always a positive scalar.

        let defining_axis = target_pos.defining_axis;

        // Aux bits are set synchronously with the motion.
        let blank = MotorSegment {
            aux_bits: target_pos.aux_bits,
            ..MotorSegment::default()
        };
        let mut accel_command = blank;
        let mut move_command = blank;
        let mut decel_command = blank;

        move_command.v0 = target_pos.speed;
        move_command.v1 = target_pos.speed;

        // Speed our defining axis had in the previous segment. That one
        // may have had a different defining axis, so take the fraction of
        // its speed that our axis moved at.
        let last_speed = fabsf(speed_for_axis(last_pos, defining_axis));

        // Arrive at a speed the upcoming move does not have to decelerate
        // further (it has a fixed feedrate it must not exceed). Halt
        // markers carry an angle 180 degrees off, so the collinear fast
        // path can never skip the deceleration into a stop.
        let next_speed = joining_speed(
            target_pos,
            upcoming,
            self.limits().threshold_angle,
            fabsf(target_pos.angle - upcoming.angle),
        );

        let axis_steps = target_pos.delta_steps;
        let abs_defining_axis_steps = axis_steps[defining_axis.index()].abs();
        let a = self.acceleration_for_move(&axis_steps, defining_axis);
        let v_peak = peak_speed(abs_defining_axis_steps as f32, last_speed, next_speed, a);
        debug_assert!(v_peak > 0.0);

        if v_peak < target_pos.speed {
            target_pos.speed = v_peak; // Don't manage to accelerate to desired v
        }

        let accel_fraction = if last_speed < target_pos.speed {
            steps_for_speed_change(a, last_speed, &mut target_pos.speed, abs_defining_axis_steps)
                / abs_defining_axis_steps as f32
        } else {
            0.0
        };

        // We only decelerate if the upcoming speed is _slower_.
        let mut clamped_next_speed = next_speed;
        let decel_fraction = if next_speed < target_pos.speed {
            steps_for_speed_change(
                -a,
                target_pos.speed,
                &mut clamped_next_speed,
                abs_defining_axis_steps,
            ) / abs_defining_axis_steps as f32
        } else {
            0.0
        };

        debug_assert!(accel_fraction + decel_fraction <= 1.0 + 1e-4);

        // If the ramps are tiny, don't emit them at all, just cruise;
        // otherwise arc-linearised paths rattle through many little
        // acceleration segments.
        let accel_decel_steps =
            ((accel_fraction + decel_fraction) * abs_defining_axis_steps as f32) as i32;
        let accel_decel_mm =
            accel_decel_steps as f32 / self.limits().steps_per_mm[defining_axis.index()];
        let do_accel = accel_decel_mm > 2.0 || accel_decel_steps > 16;

        let mut has_accel = false;
        let mut has_decel = false;

        if do_accel && accel_fraction * abs_defining_axis_steps as f32 > 0.0 {
            has_accel = true;
            accel_command.v0 = last_speed; // Last speed of defining axis
            accel_command.v1 = target_pos.speed; // New speed of defining axis

            for axis in Axis::ALL {
                let accel_steps =
                    super::round2int(accel_fraction * axis_steps[axis.index()] as f32);
                self.assign_steps_to_motors(&mut accel_command, axis, accel_steps);
            }
        }

        if do_accel && decel_fraction * abs_defining_axis_steps as f32 > 0.0 {
            has_decel = true;
            decel_command.v0 = target_pos.speed;
            decel_command.v1 = next_speed;
            target_pos.speed = next_speed;

            for axis in Axis::ALL {
                let decel_steps =
                    super::round2int(decel_fraction * axis_steps[axis.index()] as f32);
                self.assign_steps_to_motors(&mut decel_command, axis, decel_steps);
            }
        }

        // The cruise segment is everything not covered by the speed
        // changes: start with all steps and subtract both ramps, so the
        // triple always sums to the exact delta.
        for axis in Axis::ALL {
            self.assign_steps_to_motors(&mut move_command, axis, axis_steps[axis.index()]);
        }
        subtract_steps(&mut move_command, &accel_command);
        let has_move = subtract_steps(&mut move_command, &decel_command);

        if self.limits().synchronous {
            self.motor_ops_mut().wait_queue_empty();
        }
        if has_accel {
            self.motor_ops_mut().enqueue(accel_command);
        }
        if has_move {
            self.motor_ops_mut().enqueue(move_command);
        }
        if has_decel {
            self.motor_ops_mut().enqueue(decel_command);
        }
    }
}
