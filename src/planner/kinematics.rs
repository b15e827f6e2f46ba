//! Trapezoid and junction math.
//!
//! All speeds are step frequencies (Hz) on a target's defining axis;
//! accelerations are steps/s². Deltas stay exact integers, everything
//! else is single-precision.

use libm::sqrtf;

use crate::axes::Axis;

use super::buffer::AxisTarget;

/// Cartesian length of a move in mm.
#[inline]
pub(super) fn euclid_distance(x: f32, y: f32, z: f32) -> f32 {
    sqrtf(x * x + y * y + z * z)
}

/// Number of steps needed to change speed from `v0` to `v1` at
/// acceleration `a` (negative `a` decelerates).
///
/// If the change does not fit into `max_steps`, `v1` is lowered to the
/// speed actually reachable and `max_steps` is returned.
pub(super) fn steps_for_speed_change(a: f32, v0: f32, v1: &mut f32, max_steps: i32) -> f32 {
    // s = v0 * t + a/2 * t^2 ; v1 = v0 + a*t
    let t = (*v1 - v0) / a;
    if t < 0.0 {
        #[cfg(feature = "std")]
        eprintln!(
            "negative ramp time for speed change {:.1} -> {:.1} at {:.1}: insufficient lookahead",
            v0, *v1, a
        );
    }
    let steps = a / 2.0 * t * t + v0 * t;
    if steps <= max_steps as f32 {
        return steps;
    }
    *v1 = sqrtf(v0 * v0 + 2.0 * a * max_steps as f32);
    max_steps as f32
}

/// Peak speed reachable in a segment of `s` steps entering at `v0` and
/// leaving at `v2`, with symmetric acceleration `a`.
///
/// Equates the accelerate-then-decelerate distances: the segment ramps up
/// to the returned speed and straight back down, exactly consuming `s`.
pub(super) fn peak_speed(s: f32, v0: f32, v2: f32, a: f32) -> f32 {
    sqrtf(v2 * v2 + v0 * v0 + 2.0 * a * s) / sqrtf(2.0)
}

/// Fraction of the defining-axis speed that `request_axis` moves at.
fn speed_factor_for_axis(target: &AxisTarget, request_axis: Axis) -> f32 {
    let defining = target.delta_steps[target.defining_axis.index()];
    if defining == 0 {
        return 0.0;
    }
    target.delta_steps[request_axis.index()] as f32 / defining as f32
}

/// Speed of one axis in a target, signed by its travel direction.
pub(super) fn speed_for_axis(target: &AxisTarget, request_axis: Axis) -> f32 {
    target.speed * speed_factor_for_axis(target, request_axis)
}

fn within_acceptable_range(new_val: f32, old_val: f32, fraction: f32) -> bool {
    let max_diff = fraction * old_val;
    new_val >= old_val - max_diff && new_val <= old_val + max_diff
}

/// Exit speed `from` may keep at its junction with `to`, on `from`'s
/// defining axis.
///
/// `angle` is the absolute heading change in degrees; below `threshold`
/// the moves count as collinear and `from.speed` is kept. Any axis that
/// starts, stops or reverses at the junction forces a full stop, as does
/// a successor whose per-axis speeds do not agree once converted into the
/// predecessor's defining-axis frame.
pub(super) fn joining_speed(
    from: &AxisTarget,
    to: &AxisTarget,
    threshold: f32,
    angle: f32,
) -> f32 {
    let mut is_first = true;
    let mut from_defining_speed = from.speed;
    for axis in Axis::ALL {
        let from_delta = from.delta_steps[axis.index()];
        let to_delta = to.delta_steps[axis.index()];

        // Quick integer decisions
        if angle < threshold {
            continue;
        }
        if from_delta == 0 && to_delta == 0 {
            continue; // uninteresting: no move.
        }
        if from_delta == 0 || to_delta == 0 {
            return 0.0; // accel from/to zero
        }
        if (from_delta < 0) != (to_delta < 0) {
            return 0.0; // turning around
        }

        let to_speed = speed_for_axis(to, axis);
        // What would this speed translated to our defining axis be ?
        let speed_conversion =
            from.delta_steps[from.defining_axis.index()] as f32 / from_delta as f32;
        let goal = to_speed * speed_conversion;
        if goal < 0.0 {
            return 0.0;
        }
        if is_first || within_acceptable_range(goal, from_defining_speed, 1e-5) {
            if goal < from_defining_speed {
                from_defining_speed = goal;
            }
            is_first = false;
        } else {
            return 0.0; // Too far off.
        }
    }
    from_defining_speed
}
