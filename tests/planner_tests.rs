//! Integration tests for the motion planner.
//!
//! These drive the full event surface against a recording motor back-end
//! and scripted GPIO, and check the emitted segment streams.

use std::collections::{HashMap, VecDeque};

use embedded_hal::delay::DelayNs;
use gcode_motion::hal::lines;
use gcode_motion::{
    AxesRegister, Axis, GcodeEvents, Line, MachineConfig, MachineIo, MotorOps, MotorSegment,
    Planner,
};

// =============================================================================
// Fakes
// =============================================================================

/// Records every segment and back-end call in order.
#[derive(Default)]
struct RecordingBackend {
    segments: Vec<MotorSegment>,
    enable_calls: Vec<bool>,
    drains: usize,
}

impl MotorOps for RecordingBackend {
    fn enqueue(&mut self, segment: MotorSegment) {
        self.segments.push(segment);
    }

    fn wait_queue_empty(&mut self) {
        self.drains += 1;
    }

    fn motor_enable(&mut self, enable: bool) {
        self.enable_calls.push(enable);
    }
}

/// GPIO/PWM fake: per-line scripted read sequences, plus a write log.
#[derive(Default)]
struct ScriptedIo {
    reads: HashMap<u8, VecDeque<bool>>,
    levels: HashMap<u8, bool>,
    writes: Vec<(u8, bool)>,
    pwm_duty: HashMap<u8, f32>,
    pwm_running: HashMap<u8, bool>,
}

impl ScriptedIo {
    fn script_reads(&mut self, line: Line, values: &[bool]) {
        self.reads.insert(line.0, values.iter().copied().collect());
    }

    fn level(&self, line: Line) -> bool {
        self.levels.get(&line.0).copied().unwrap_or(false)
    }
}

impl MachineIo for ScriptedIo {
    fn set(&mut self, line: Line) {
        self.levels.insert(line.0, true);
        self.writes.push((line.0, true));
    }

    fn clear(&mut self, line: Line) {
        self.levels.insert(line.0, false);
        self.writes.push((line.0, false));
    }

    fn read(&mut self, line: Line) -> bool {
        if let Some(queue) = self.reads.get_mut(&line.0) {
            if let Some(value) = queue.pop_front() {
                return value;
            }
        }
        self.level(line)
    }

    fn pwm_start(&mut self, line: Line, enabled: bool) {
        self.pwm_running.insert(line.0, enabled);
    }

    fn pwm_set_duty(&mut self, line: Line, duty: f32) {
        self.pwm_duty.insert(line.0, duty);
    }
}

/// Timing is irrelevant in tests.
struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

type TestPlanner = Planner<RecordingBackend, ScriptedIo, NoopDelay, String>;

fn planner_with(config: &MachineConfig) -> TestPlanner {
    planner_with_io(config, ScriptedIo::default())
}

fn planner_with_io(config: &MachineConfig, io: ScriptedIo) -> TestPlanner {
    Planner::new(
        config,
        RecordingBackend::default(),
        io,
        NoopDelay,
        Some(String::new()),
    )
    .expect("valid config")
}

/// The reference machine: 160 steps/mm on XYZ, 40 on E, generous limits.
fn reference_planner() -> TestPlanner {
    planner_with(&MachineConfig::default())
}

fn target(coords: &[(Axis, f32)]) -> AxesRegister {
    let mut reg = AxesRegister::zero();
    for &(axis, mm) in coords {
        reg[axis] = mm;
    }
    reg
}

fn messages(planner: &TestPlanner) -> &str {
    planner.msg_stream().map(|s| s.as_str()).unwrap_or("")
}

fn segments(planner: &TestPlanner) -> &[MotorSegment] {
    &planner.motor_ops().segments
}

fn net_steps(planner: &TestPlanner, motor: usize) -> i64 {
    segments(planner)
        .iter()
        .map(|s| s.steps[motor] as i64)
        .sum()
}

// =============================================================================
// Straight moves and trapezoid shape
// =============================================================================

#[test]
fn single_move_emits_accel_cruise_decel() {
    let mut planner = reference_planner();

    // 10mm at 50mm/s: 1600 steps on X at 8000 steps/s.
    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    planner.gcode_finished();

    let segs = segments(&planner);
    assert_eq!(segs.len(), 3);

    let (accel, cruise, decel) = (&segs[0], &segs[1], &segs[2]);
    assert_eq!(accel.v0, 0.0);
    assert!((accel.v1 - 8000.0).abs() < 1.0);
    assert_eq!(cruise.v0, cruise.v1);
    assert!((decel.v0 - 8000.0).abs() < 1.0);
    assert_eq!(decel.v1, 0.0);

    // accel steps: v^2 / 2a = 8000^2 / (2 * 640000) = 50
    assert_eq!(accel.steps[0], 50);
    assert_eq!(decel.steps[0], 50);
    assert_eq!(cruise.steps[0], 1500);
    assert_eq!(net_steps(&planner, 0), 1600);
}

#[test]
fn diagonal_move_scales_to_euclidean_feedrate() {
    let mut planner = reference_planner();

    // 10mm in X and Y at 200mm/s: the defining axis only runs at
    // 200 * 160 / sqrt(2) steps/s so the tool moves 200mm/s in space.
    assert!(planner.coordinated_move(200.0, &target(&[(Axis::X, 10.0), (Axis::Y, 10.0)])));
    planner.gcode_finished();

    let segs = segments(&planner);
    let cruise = &segs[1];
    assert!((cruise.v0 - 22627.4).abs() < 1.0);

    // Both motors carry the same step count throughout.
    for seg in segs {
        assert_eq!(seg.steps[0], seg.steps[1]);
    }
    assert_eq!(net_steps(&planner, 0), 1600);
    assert_eq!(net_steps(&planner, 1), 1600);
}

#[test]
fn rapid_move_without_feed_uses_machine_travel_feedrate() {
    let mut planner = reference_planner();

    // G0 with no usable feed: highest axis feedrate (200mm/s) applies,
    // clamped to the X limit of 32000 steps/s.
    assert!(planner.rapid_move(0.0, &target(&[(Axis::X, 100.0)])));
    planner.gcode_finished();

    let cruise = &segments(&planner)[1];
    assert!((cruise.v0 - 32000.0).abs() < 1.0);
}

#[test]
fn step_positions_do_not_drift_from_rounding() {
    let mut planner = reference_planner();

    // A chain of absolute positions that don't fall on step boundaries.
    for i in 1..=20 {
        let x = i as f32 * 0.30001;
        assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, x)])));
    }
    planner.gcode_finished();

    // The sum of all emitted steps equals the rounded final absolute
    // position, not the sum of rounded deltas.
    let expect = (20.0 * 0.30001 * 160.0_f32).round() as i64;
    assert_eq!(net_steps(&planner, 0), expect);
}

#[test]
fn identical_targets_emit_no_motion() {
    let mut planner = reference_planner();

    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    for _ in 0..3 {
        assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    }
    planner.gcode_finished();

    // Only the one real move produces segments.
    assert_eq!(net_steps(&planner, 0), 1600);
    for seg in segments(&planner) {
        assert!(!seg.is_empty());
    }
}

// =============================================================================
// Junctions
// =============================================================================

#[test]
fn direction_reversal_stops_at_junction() {
    let mut planner = reference_planner();

    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 0.0)])));
    planner.gcode_finished();

    let segs = segments(&planner);
    assert_eq!(segs.len(), 6);

    // First triple fully decelerates, second accelerates from zero.
    assert_eq!(segs[2].v1, 0.0);
    assert_eq!(segs[3].v0, 0.0);

    // Signs are consistent within each triple and the move round-trips.
    assert!(segs[..3].iter().all(|s| s.steps[0] > 0));
    assert!(segs[3..].iter().all(|s| s.steps[0] < 0));
    assert_eq!(net_steps(&planner, 0), 0);
}

#[test]
fn collinear_moves_cruise_through_the_junction() {
    let mut planner = reference_planner();

    assert!(planner.coordinated_move(200.0, &target(&[(Axis::X, 10.0)])));
    assert!(planner.coordinated_move(200.0, &target(&[(Axis::X, 20.0)])));
    planner.gcode_finished();

    let segs = segments(&planner);
    // First move: accel + cruise, no decel. Second: cruise + decel, no
    // accel.
    assert_eq!(segs.len(), 4);
    assert_eq!(segs[0].v0, 0.0);
    assert!((segs[1].v1 - 32000.0).abs() < 1.0);
    assert!((segs[2].v0 - 32000.0).abs() < 1.0);
    assert_eq!(segs[2].v0, segs[1].v1);
    assert_eq!(segs[3].v1, 0.0);
    assert_eq!(net_steps(&planner, 0), 3200);
}

#[test]
fn slower_successor_limits_junction_speed() {
    let mut planner = reference_planner();

    // Z moves don't get the collinear fast path, so the junction speed
    // comes from converting the successor's per-axis speed.
    assert!(planner.coordinated_move(50.0, &target(&[(Axis::Z, 5.0)])));
    assert!(planner.coordinated_move(20.0, &target(&[(Axis::Z, 10.0)])));
    planner.gcode_finished();

    let segs = segments(&planner);
    assert_eq!(segs.len(), 5);

    // First move: accel to 8000, cruise, decel exactly to the
    // successor's 3200 steps/s.
    assert!((segs[2].v1 - 3200.0).abs() < 1.0);
    // Second move enters at that speed (same defining axis).
    assert!((segs[3].v0 - 3200.0).abs() < 1.0);
    assert_eq!(segs[2].v1, segs[3].v0);
    assert_eq!(segs.last().unwrap().v1, 0.0);
}

// =============================================================================
// Boundary behaviours
// =============================================================================

#[test]
fn zero_feedrate_creeps_at_override_frequency() {
    let mut config = MachineConfig::default();
    config.speed_factor = 0.0; // degenerate: every feed collapses to 0
    let mut planner = planner_with(&config);

    assert!(planner.coordinated_move(100.0, &target(&[(Axis::X, 1.0)])));
    planner.gcode_finished();

    let segs = segments(&planner);
    assert_eq!(segs.len(), 1);
    assert_eq!(segs[0].v0, 5.0);
    assert_eq!(segs[0].v1, 5.0);
    assert!(messages(&planner).contains("Ignoring speed of 0"));
}

#[test]
fn tiny_ramps_fold_into_a_single_cruise_segment() {
    let mut planner = reference_planner();

    // 20mm/s on X: ramp lengths are 8 steps each, below the chatter
    // gate, so no separate accel/decel segments are emitted.
    assert!(planner.coordinated_move(20.0, &target(&[(Axis::X, 10.0)])));
    planner.gcode_finished();

    let segs = segments(&planner);
    assert_eq!(segs.len(), 1);
    assert_eq!(segs[0].v0, segs[0].v1);
    assert_eq!(segs[0].steps[0], 1600);
}

#[test]
fn speed_factor_negative_form_and_lower_bound() {
    let mut planner = reference_planner();

    // M220 S-10 comes through as -0.10 and means 90%.
    planner.set_speed_factor(-0.10);
    assert!(planner.coordinated_move(100.0, &target(&[(Axis::X, 10.0)])));
    planner.gcode_finished();
    let cruise = &segments(&planner)[1];
    assert!((cruise.v0 - 0.9 * 100.0 * 160.0).abs() < 1.0);

    // Below 0.5% is rejected and leaves the factor alone.
    planner.set_speed_factor(0.001);
    assert!(messages(&planner).contains("Not accepting speed factors"));
    assert!(planner.coordinated_move(100.0, &target(&[(Axis::X, 20.0)])));
    planner.gcode_finished();
    let decel = segments(&planner).last().unwrap();
    assert!((decel.v0 - 0.9 * 100.0 * 160.0).abs() < 1.0);
}

// =============================================================================
// Move rejection
// =============================================================================

#[test]
fn moves_require_homing_when_configured() {
    let mut config = MachineConfig::default();
    config.require_homing = true;
    config.min_endswitch = heapless::String::try_from("X").unwrap();
    config.endswitch_polarity = heapless::String::try_from("H").unwrap();
    let mut io = ScriptedIo::default();
    io.script_reads(lines::ENDSTOP[0], &[false, true, true]);
    let mut planner = planner_with_io(&config, io);

    assert!(!planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    assert!(messages(&planner).contains("please home machine first"));
    assert!(segments(&planner).is_empty());

    planner.go_home(Axis::X.bit());
    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
}

#[test]
fn range_check_rejects_out_of_cube_moves() {
    let mut config = MachineConfig::default();
    config.move_range_mm[Axis::X.index()] = 100.0;
    let mut planner = planner_with(&config);

    assert!(!planner.coordinated_move(50.0, &target(&[(Axis::X, -5.0)])));
    assert!(!planner.coordinated_move(50.0, &target(&[(Axis::X, 150.0)])));
    assert!(messages(&planner).contains("outside machine limit"));
    assert!(segments(&planner).is_empty());

    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 50.0)])));
}

// =============================================================================
// Homing and probing
// =============================================================================

#[test]
fn homing_seeks_endstop_and_pins_position() {
    let mut config = MachineConfig::default();
    config.min_endswitch = heapless::String::try_from("XY").unwrap();
    config.endswitch_polarity = heapless::String::try_from("HH").unwrap();

    let mut io = ScriptedIo::default();
    // Two seek segments until triggered, one backoff segment.
    io.script_reads(lines::ENDSTOP[0], &[false, false, true, true, false]);
    io.script_reads(lines::ENDSTOP[1], &[false, true, true, false]);
    let mut planner = planner_with_io(&config, io);

    planner.go_home(Axis::X.bit() | Axis::Y.bit());

    let segs = segments(&planner);
    // X: 2 seek + 1 backoff; Y: 1 seek + 1 backoff.
    assert_eq!(segs.len(), 5);

    // Seek segments run toward the min switch at the homing feedrate.
    assert_eq!(segs[0].steps[0], -80); // 0.5mm * 160
    assert!((segs[0].v1 - 15.0 * 160.0).abs() < 1.0);
    // Backoff runs the other way in 0.1mm pieces.
    assert_eq!(segs[2].steps[0], 16);

    // After homing the planned position is the switch coordinate.
    assert_eq!(
        planner.last_planned_position_steps()[Axis::X.index()],
        0
    );
    assert_eq!(planner.homing_state(), gcode_motion::HomingState::Homed);
}

#[test]
fn homing_to_max_side_pins_to_the_travel_range() {
    let mut config = MachineConfig::default();
    config.max_endswitch = heapless::String::try_from("X").unwrap();
    config.move_range_mm[Axis::X.index()] = 100.0;
    config.endswitch_polarity = heapless::String::try_from("H").unwrap();

    let mut io = ScriptedIo::default();
    io.script_reads(lines::ENDSTOP[0], &[false, true, true]);
    let mut planner = planner_with_io(&config, io);

    planner.go_home(Axis::X.bit());

    // Seek runs toward positive travel; position pins to the far end.
    assert_eq!(segments(&planner)[0].steps[0], 80);
    assert_eq!(
        planner.last_planned_position_steps()[Axis::X.index()],
        16000
    );
}

#[test]
fn disabling_motors_lowers_homing_confidence() {
    let mut config = MachineConfig::default();
    config.min_endswitch = heapless::String::try_from("X").unwrap();
    config.endswitch_polarity = heapless::String::try_from("H").unwrap();
    let mut io = ScriptedIo::default();
    io.script_reads(lines::ENDSTOP[0], &[true, true]);
    let mut planner = planner_with_io(&config, io);

    planner.go_home(Axis::X.bit());
    assert_eq!(planner.homing_state(), gcode_motion::HomingState::Homed);

    planner.motors_enable(true);
    assert_eq!(planner.homing_state(), gcode_motion::HomingState::Homed);

    planner.motors_enable(false);
    assert_eq!(
        planner.homing_state(),
        gcode_motion::HomingState::HomedButMotorsUnpowered
    );
    assert_eq!(planner.motor_ops().enable_calls, vec![true, false]);
}

#[test]
fn probe_uses_the_non_homing_endstop() {
    let mut config = MachineConfig::default();
    // Lowercase: wired, but not a homing switch.
    config.min_endswitch = heapless::String::try_from("x").unwrap();
    config.endswitch_polarity = heapless::String::try_from("H").unwrap();

    let mut io = ScriptedIo::default();
    io.script_reads(lines::ENDSTOP[0], &[false, false, true]);
    let mut planner = planner_with_io(&config, io);

    let probed = planner.probe_axis(10.0, Axis::X);
    // Two 0.5mm segments toward the min side from position 0.
    assert_eq!(probed, Some(-1.0));
}

#[test]
fn probe_without_travel_endstop_fails() {
    let mut planner = reference_planner();
    assert_eq!(planner.probe_axis(10.0, Axis::X), None);
    assert!(messages(&planner).contains("does not have a travel endstop"));
}

// =============================================================================
// M-codes and auxiliary state
// =============================================================================

#[test]
fn aux_bits_travel_with_motion() {
    let mut planner = reference_planner();

    assert_eq!(planner.unprocessed('M', 42.0, "P3 S1"), Some(""));
    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    planner.gcode_finished();

    for seg in segments(&planner) {
        assert_eq!(seg.aux_bits & (1 << 3), 1 << 3);
    }
}

#[test]
fn m42_without_value_reads_the_bit_back() {
    let mut planner = reference_planner();
    planner.unprocessed('M', 42.0, "P3 S1");
    planner.unprocessed('M', 42.0, "P3");
    assert!(messages(&planner).ends_with("1\n"));
}

#[test]
fn immediate_aux_codes_drive_the_gpio() {
    let mut planner = reference_planner();

    planner.unprocessed('M', 64.0, "P2");
    assert!(planner.io_mut().level(lines::AUX[2]));
    planner.unprocessed('M', 65.0, "P2");
    assert!(!planner.io_mut().level(lines::AUX[2]));

    // M62 only flags the bit for the next segment.
    planner.unprocessed('M', 62.0, "P5");
    assert!(!planner.io_mut().level(lines::AUX[5]));
}

#[test]
fn spindle_and_coolant_codes_set_their_bits() {
    use gcode_motion::planner::{
        AUX_BIT_FLOOD, AUX_BIT_MIST, AUX_BIT_SPINDLE_DIR, AUX_BIT_SPINDLE_ON,
    };

    let mut planner = reference_planner();

    planner.unprocessed('M', 3.0, "S1200");
    planner.unprocessed('M', 7.0, "");
    planner.unprocessed('M', 8.0, "");
    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    planner.gcode_finished();
    let bits = segments(&planner)[0].aux_bits;
    assert_eq!(bits & AUX_BIT_SPINDLE_ON, AUX_BIT_SPINDLE_ON);
    assert_eq!(bits & AUX_BIT_SPINDLE_DIR, 0); // M3 = clockwise
    assert_eq!(bits & (AUX_BIT_MIST | AUX_BIT_FLOOD), AUX_BIT_MIST | AUX_BIT_FLOOD);

    // M4 with remembered RPM flips direction; M5/M9 clear.
    planner.unprocessed('M', 4.0, "");
    planner.unprocessed('M', 5.0, "");
    planner.unprocessed('M', 9.0, "");
    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 20.0)])));
    planner.gcode_finished();
    let bits = segments(&planner).last().unwrap().aux_bits;
    assert_eq!(bits & (AUX_BIT_SPINDLE_ON | AUX_BIT_MIST | AUX_BIT_FLOOD), 0);
}

#[test]
fn estop_and_machine_power_gpio() {
    let mut planner = reference_planner();

    planner.unprocessed('M', 0.0, "");
    assert!(planner.io_mut().level(lines::ESTOP));
    planner.unprocessed('M', 999.0, "");
    assert!(!planner.io_mut().level(lines::ESTOP));

    planner.unprocessed('M', 80.0, "");
    assert!(planner.io_mut().level(lines::MACHINE_POWER));
    planner.unprocessed('M', 81.0, "");
    assert!(!planner.io_mut().level(lines::MACHINE_POWER));
}

#[test]
fn fan_speed_controls_pwm_duty() {
    let mut planner = reference_planner();

    planner.set_fanspeed(127.5);
    assert!((planner.io_mut().pwm_duty[&lines::FAN.0] - 0.5).abs() < 1e-6);
    assert!(planner.io_mut().pwm_running[&lines::FAN.0]);

    planner.set_fanspeed(0.0);
    assert!(!planner.io_mut().pwm_running[&lines::FAN.0]);
    assert!(!planner.io_mut().level(lines::FAN));
}

#[test]
fn position_report_shows_machine_cube_and_confidence() {
    let mut planner = reference_planner();

    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0), (Axis::Y, 2.5)])));
    planner.gcode_finished();
    planner.unprocessed('M', 114.0, "");

    let msg = messages(&planner);
    assert!(msg.contains("X:10.000 Y:2.500"));
    assert!(msg.contains("ABS. MACHINE CUBE"));
    assert!(msg.contains("never homed"));
}

#[test]
fn origin_offset_shifts_reported_position_only() {
    let mut planner = reference_planner();

    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    planner.gcode_finished();
    planner.inform_origin_offset(&target(&[(Axis::X, 4.0)]));
    planner.unprocessed('M', 114.0, "");

    let msg = messages(&planner);
    assert!(msg.contains("X:6.000"));
    assert!(msg.contains("CUBE X:10.000"));
}

#[test]
fn endstop_status_report() {
    let mut config = MachineConfig::default();
    config.min_endswitch = heapless::String::try_from("X").unwrap();
    config.endswitch_polarity = heapless::String::try_from("H").unwrap();
    let mut planner = planner_with(&config);

    planner.unprocessed('M', 119.0, "");
    assert!(messages(&planner).contains("x_min:open"));

    planner.io_mut().set(lines::ENDSTOP[0]);
    planner.unprocessed('M', 119.0, "");
    assert!(messages(&planner).contains("x_min:TRIGGERED"));
}

#[test]
fn endstop_status_without_endstops() {
    let mut planner = reference_planner();
    planner.unprocessed('M', 119.0, "");
    assert!(messages(&planner).contains("no endstops configured"));
}

#[test]
fn version_and_ack_replies() {
    let mut planner = reference_planner();

    planner.unprocessed('M', 115.0, "");
    assert!(messages(&planner).contains("PROTOCOL_VERSION:0.1"));

    planner.gcode_command_done('G', 1.0);
    assert!(messages(&planner).ends_with("ok\n"));
}

#[test]
fn m117_and_unknown_codes_consume_the_block() {
    let mut planner = reference_planner();

    assert_eq!(planner.unprocessed('M', 117.0, "hello there"), None);
    assert!(messages(&planner).contains("// Msg: hello there"));

    assert_eq!(planner.unprocessed('M', 123.0, "X1 Y2"), None);
    assert!(messages(&planner).contains("didn't understand"));
}

#[test]
fn m220_sets_the_programmed_speed_factor() {
    let mut planner = reference_planner();

    assert_eq!(planner.unprocessed('M', 220.0, "S50"), Some(""));
    assert!(planner.coordinated_move(100.0, &target(&[(Axis::X, 10.0)])));
    planner.gcode_finished();

    let cruise = &segments(&planner)[1];
    assert!((cruise.v0 - 0.5 * 100.0 * 160.0).abs() < 1.0);
}

// =============================================================================
// Event-receiver contract
// =============================================================================

/// A representative event sequence, dispatched through the trait object
/// the way a parser would drive any receiver.
fn drive_events(events: &mut dyn GcodeEvents) {
    events.gcode_start();
    events.set_temperature(60.0);
    events.wait_temperature();
    assert!(events.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    events.dwell(5.0);
    events.go_home(Axis::X.bit());
    events.input_idle();
    events.gcode_finished();
}

#[test]
fn events_dispatch_through_the_trait_object() {
    let mut config = MachineConfig::default();
    config.min_endswitch = heapless::String::try_from("X").unwrap();
    config.endswitch_polarity = heapless::String::try_from("H").unwrap();
    let mut io = ScriptedIo::default();
    io.script_reads(lines::ENDSTOP[0], &[false, true, true]);
    let mut planner = planner_with_io(&config, io);

    drive_events(&mut planner);

    // The move flushed to a stop at the dwell, then homing seeked and
    // backed off; the idle and finish halts add no motion.
    let segs = segments(&planner);
    assert_eq!(segs.len(), 5);
    assert_eq!(segs[2].v1, 0.0);
    assert_eq!(segs[3].steps[0], -80);
    assert_eq!(segs[4].steps[0], 16);
    assert_eq!(net_steps(&planner, 0), 1600 - 80 + 16);
    assert_eq!(planner.homing_state(), gcode_motion::HomingState::Homed);
    assert!(planner.motor_ops().drains >= 1);
}

#[test]
fn gcode_start_is_a_no_op() {
    let mut planner = reference_planner();

    planner.gcode_start();

    assert!(segments(&planner).is_empty());
    assert_eq!(messages(&planner), "");
    assert_eq!(planner.homing_state(), gcode_motion::HomingState::NeverHomed);
}

#[test]
fn input_idle_flushes_the_path_to_a_stop() {
    let mut planner = reference_planner();

    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    planner.input_idle();

    let segs = segments(&planner);
    assert_eq!(segs.len(), 3);
    assert_eq!(segs.last().unwrap().v1, 0.0);
    assert_eq!(net_steps(&planner, 0), 1600);
}

#[test]
fn temperature_stubs_reply_and_return_immediately() {
    let mut planner = reference_planner();

    planner.set_temperature(215.0);
    planner.wait_temperature();

    let msg = messages(&planner);
    assert!(msg.contains("set_temperature(215.0) not implemented"));
    assert!(msg.contains("wait_temperature() not implemented"));

    // Diagnostics only: no motion, no queue waits, no state change.
    assert!(segments(&planner).is_empty());
    assert_eq!(planner.motor_ops().drains, 0);
    assert_eq!(
        planner.last_planned_position_steps(),
        [0; gcode_motion::NUM_AXES]
    );
    assert_eq!(planner.homing_state(), gcode_motion::HomingState::NeverHomed);
}

// =============================================================================
// Synchronous mode and dwell
// =============================================================================

#[test]
fn synchronous_mode_drains_before_each_emission() {
    let mut config = MachineConfig::default();
    config.synchronous = true;
    let mut planner = planner_with(&config);

    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    planner.gcode_finished();

    assert!(planner.motor_ops().drains >= 1);
}

#[test]
fn dwell_halts_and_drains_the_queue() {
    let mut planner = reference_planner();

    assert!(planner.coordinated_move(50.0, &target(&[(Axis::X, 10.0)])));
    planner.dwell(25.0);

    // The pending move was flushed with a final deceleration to zero.
    let segs = segments(&planner);
    assert_eq!(segs.last().unwrap().v1, 0.0);
    assert_eq!(planner.motor_ops().drains, 1);
}
