//! Auxiliary outputs and the M-code surface.
//!
//! Aux bits travel with every emitted segment (synchronous with motion);
//! M64/M65 additionally drive the aux GPIO lines immediately.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::axes::Axis;
use crate::events::parse_pair;
use crate::hal::{lines, MachineIo, MotorOps, NUM_AUX_PINS};

use super::{round2int, HomingState, Planner};

/// Aux bit: coolant mist (M7).
pub const AUX_BIT_MIST: u16 = 1 << 0;
/// Aux bit: coolant flood (M8).
pub const AUX_BIT_FLOOD: u16 = 1 << 1;
/// Aux bit: vacuum (M10/M11).
pub const AUX_BIT_VACUUM: u16 = 1 << 2;
/// Aux bit: spindle on (M3/M4, cleared by M5).
pub const AUX_BIT_SPINDLE_ON: u16 = 1 << 3;
/// Aux bit: spindle direction, set for counter-clockwise (M4).
pub const AUX_BIT_SPINDLE_DIR: u16 = 1 << 4;

/// Highest pin index addressable with M42 and M62..M65.
pub const MAX_AUX_PIN: u8 = (NUM_AUX_PINS - 1) as u8;

const VERSION_REPLY: &str = concat!(
    "PROTOCOL_VERSION:0.1 FIRMWARE_NAME:gcode-motion FIRMWARE_VERSION:",
    env!("CARGO_PKG_VERSION")
);

impl<M, IO, D, W> Planner<M, IO, D, W>
where
    M: MotorOps,
    IO: MachineIo,
    D: DelayNs,
    W: fmt::Write,
{
    /// Handle a G-code word the parser has no meaning for.
    ///
    /// Returns the unconsumed tail of the block, or `None` when the rest
    /// of the line was swallowed (M117 messages, unknown codes).
    pub(crate) fn special_commands<'a>(
        &mut self,
        letter: char,
        value: f32,
        mut remaining: &'a str,
    ) -> Option<&'a str> {
        if letter != 'M' {
            return Some(remaining);
        }
        let code = value as i32;

        match code {
            0 => self.io.set(lines::ESTOP),
            3 | 4 => {
                while let Some((l, v, rest)) = parse_pair(remaining) {
                    if l == 'S' {
                        self.spindle_rpm = round2int(v).max(0) as u32;
                    } else {
                        break;
                    }
                    remaining = rest;
                }
                if self.spindle_rpm != 0 {
                    self.aux_bits |= AUX_BIT_SPINDLE_ON;
                    if code == 3 {
                        self.aux_bits &= !AUX_BIT_SPINDLE_DIR;
                    } else {
                        self.aux_bits |= AUX_BIT_SPINDLE_DIR;
                    }
                }
            }
            5 => self.aux_bits &= !(AUX_BIT_SPINDLE_ON | AUX_BIT_SPINDLE_DIR),
            7 => self.aux_bits |= AUX_BIT_MIST,
            8 => self.aux_bits |= AUX_BIT_FLOOD,
            9 => self.aux_bits &= !(AUX_BIT_MIST | AUX_BIT_FLOOD),
            10 => self.aux_bits |= AUX_BIT_VACUUM,
            11 => self.aux_bits &= !AUX_BIT_VACUUM,
            17 => self.motors_enable(true),
            18 | 84 => self.motors_enable(false),
            42 | 62 | 63 | 64 | 65 => remaining = self.aux_pin_command(code, remaining),
            80 => self.io.set(lines::MACHINE_POWER),
            81 => self.io.clear(lines::MACHINE_POWER),
            105 => self.mprint(format_args!("T-300\n")), // no temperature sensing
            114 => self.report_position(),
            115 => self.mprint(format_args!("{}\n", VERSION_REPLY)),
            117 => {
                self.mprint(format_args!("// Msg: {}\n", remaining));
                return None; // consume the full line.
            }
            119 => self.report_endstop_status(),
            220 => {
                let mut factor = None;
                while let Some((l, v, rest)) = parse_pair(remaining) {
                    if l == 'S' {
                        factor = Some(v / 100.0);
                    } else {
                        break;
                    }
                    remaining = rest;
                }
                match factor {
                    Some(f) => self.set_speed_factor(f),
                    None => {
                        let percent = self.prog_speed_factor * 100.0;
                        self.mprint(format_args!("// Speed factor: {:.1}%\n", percent));
                    }
                }
            }
            999 => self.io.clear(lines::ESTOP),
            _ => {
                self.mprint(format_args!(
                    "// gcode-motion: didn't understand ('{}', {}, '{}')\n",
                    letter, code, remaining
                ));
                return None; // discard the remaining block.
            }
        }
        Some(remaining)
    }

    /// M42 (set/read), M62/M63 (synchronous set/clear) and M64/M65
    /// (immediate set/clear) of one aux pin.
    fn aux_pin_command<'a>(&mut self, code: i32, mut remaining: &'a str) -> &'a str {
        let mut pin = -1;
        let mut aux_bit = -1;
        while let Some((l, v, rest)) = parse_pair(remaining) {
            if l == 'P' {
                pin = round2int(v);
            } else if l == 'S' && code == 42 {
                aux_bit = round2int(v);
            } else {
                break;
            }
            remaining = rest;
        }
        if code == 62 || code == 64 {
            aux_bit = 1;
        } else if code == 63 || code == 65 {
            aux_bit = 0;
        }

        if pin >= 0 && pin <= MAX_AUX_PIN as i32 {
            let pin = pin as usize;
            if aux_bit == 0 || aux_bit == 1 {
                if aux_bit == 1 {
                    self.aux_bits |= 1 << pin;
                } else {
                    self.aux_bits &= !(1 << pin);
                }
                if code == 64 || code == 65 {
                    // update the aux pin now, not with the next segment
                    let line = lines::AUX[pin];
                    if aux_bit == 1 {
                        self.io.set(line);
                    } else {
                        self.io.clear(line);
                    }
                }
            } else if code == 42 {
                // Just a read operation.
                let state = (self.aux_bits >> pin) & 1;
                self.mprint(format_args!("{}\n", state));
            }
        }
        remaining
    }

    /// M114: current position, machine cube and homing confidence.
    fn report_position(&mut self) {
        if self.buffer.is_empty() {
            self.mprint(format_args!("// no current pos\n"));
            return;
        }
        let current = self.buffer[0];
        let spm = self.limits.steps_per_mm;
        let x = current.position_steps[Axis::X.index()] as f32 / spm[Axis::X.index()];
        let y = current.position_steps[Axis::Y.index()] as f32 / spm[Axis::Y.index()];
        let z = current.position_steps[Axis::Z.index()] as f32 / spm[Axis::Z.index()];
        let e = current.position_steps[Axis::E.index()] as f32 / spm[Axis::E.index()];
        let origin = self.coordinate_display_origin;
        self.mprint(format_args!(
            "X:{:.3} Y:{:.3} Z:{:.3} E:{:.3}",
            x - origin[Axis::X],
            y - origin[Axis::Y],
            z - origin[Axis::Z],
            e - origin[Axis::E]
        ));
        self.mprint(format_args!(
            " [ABS. MACHINE CUBE X:{:.3} Y:{:.3} Z:{:.3}]",
            x, y, z
        ));
        match self.homing_state {
            HomingState::NeverHomed => {
                self.mprint(format_args!(" (Unsure: machine never homed!)\n"));
            }
            HomingState::HomedButMotorsUnpowered => {
                self.mprint(format_args!(
                    " (Lower confidence: motor power off at least once after homing)\n"
                ));
            }
            HomingState::Homed => {
                self.mprint(format_args!(" (confident: machine was homed)\n"));
            }
        }
    }

    /// M119: endstop levels as the switches read right now.
    fn report_endstop_status(&mut self) {
        let mut any_endstops_found = false;
        for axis in Axis::ALL {
            let i = axis.index();
            let sides = [
                ("min", self.limits.min_endstop[i]),
                ("max", self.limits.max_endstop[i]),
            ];
            for (side, endstop) in sides {
                if let Some(line) = endstop.line() {
                    let value = self.io.read(line);
                    self.mprint(format_args!(
                        "{}_{}:{} ",
                        axis.letter().to_ascii_lowercase(),
                        side,
                        if value == endstop.trigger_level {
                            "TRIGGERED"
                        } else {
                            "open"
                        }
                    ));
                    any_endstops_found = true;
                }
            }
        }
        if any_endstops_found {
            self.mprint(format_args!("\n"));
        } else {
            self.mprint(format_args!(
                "// This machine has no endstops configured.\n"
            ));
        }
    }
}
