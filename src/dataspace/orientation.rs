//! Orientation. Neutral unit: quaternion `[x, y, z, w]`.
//!
//! Euler angles are `[yaw, pitch, roll]` in degrees, applied as
//! `Rz(-yaw) · Rx(pitch) · Ry(roll)`. Axis-angle is `[x, y, z, degrees]`.

use super::{DEG_TO_RAD, Dataspace, RAD_TO_DEG, Repr, Unit, UnitDef, identity};
use crate::model::ValueType;

pub const QUATERNION: Unit = Unit::new(Dataspace::Orientation, 0);
pub const EULER: Unit = Unit::new(Dataspace::Orientation, 1);
pub const AXIS: Unit = Unit::new(Dataspace::Orientation, 2);

/// Below this `sin(angle / 2)` the axis is undefined; the raw
/// quaternion vector part is passed through unscaled.
const POLE_EPSILON: f64 = 0.0005;

fn euler_to(r: Repr) -> Repr {
    let (sy, cy) = (r[0] * DEG_TO_RAD * -0.5).sin_cos();
    let (sp, cp) = (r[1] * DEG_TO_RAD * 0.5).sin_cos();
    let (sr, cr) = (r[2] * DEG_TO_RAD * 0.5).sin_cos();
    [
        cy * sp * cr - sy * cp * sr,
        cy * cp * sr + sy * sp * cr,
        sy * cp * cr + cy * sp * sr,
        cy * cp * cr - sy * sp * sr,
    ]
}

fn euler_from(r: Repr) -> Repr {
    let [x, y, z, w] = r;
    let yaw = (2.0 * (x * y - w * z)).atan2(w * w - x * x + y * y - z * z);
    let pitch = (2.0 * (w * x + y * z)).clamp(-1.0, 1.0).asin();
    let roll = (2.0 * (w * y - x * z)).atan2(w * w - x * x - y * y + z * z);
    [yaw * RAD_TO_DEG, pitch * RAD_TO_DEG, roll * RAD_TO_DEG, 0.0]
}

fn axis_to(r: Repr) -> Repr {
    let (s, c) = (r[3] * DEG_TO_RAD * 0.5).sin_cos();
    let norm = (r[0] * r[0] + r[1] * r[1] + r[2] * r[2]).sqrt();
    let n = if norm > 0.0 { 1.0 / norm } else { norm };
    [r[0] * n * s, r[1] * n * s, r[2] * n * s, c]
}

fn axis_from(r: Repr) -> Repr {
    let w = r[3].clamp(-1.0, 1.0);
    let sin_a = (1.0 - w * w).max(0.0).sqrt();
    let scale = if sin_a.abs() < POLE_EPSILON { 1.0 } else { 1.0 / sin_a };
    let angle = RAD_TO_DEG * 2.0 * sin_a.atan2(w);
    [r[0] * scale, r[1] * scale, r[2] * scale, angle]
}

pub(super) static UNITS: [UnitDef; 3] = [
    UnitDef {
        name: "quaternion",
        aliases: &["quat"],
        value_type: ValueType::Vec4,
        to_neutral: identity,
        from_neutral: identity,
    },
    UnitDef {
        name: "euler",
        aliases: &["ypr"],
        value_type: ValueType::Vec3,
        to_neutral: euler_to,
        from_neutral: euler_from,
    },
    UnitDef {
        name: "axis",
        aliases: &["xyza"],
        value_type: ValueType::Vec4,
        to_neutral: axis_to,
        from_neutral: axis_from,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64], eps: f64) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < eps)
    }

    #[test]
    fn test_euler_round_trip() {
        for ypr in [[30.0, 20.0, 10.0], [-45.0, 30.0, 60.0], [170.0, -80.0, -120.0], [0.0, 0.0, 0.0]] {
            let q = euler_to([ypr[0], ypr[1], ypr[2], 0.0]);
            let back = euler_from(q);
            assert!(close(&back[..3], &ypr, 1e-6), "{ypr:?} -> {back:?}");
        }
    }

    #[test]
    fn test_euler_quaternion_is_unit() {
        let q = euler_to([12.0, 34.0, 56.0, 0.0]);
        let norm: f64 = q.iter().map(|c| c * c).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_axis_round_trip() {
        for axis in [[0.0, 0.0, 1.0, 90.0], [1.0, 0.0, 0.0, 45.0], [0.0, 1.0, 0.0, 180.0]] {
            let back = axis_from(axis_to(axis));
            assert!(close(&back, &axis, 1e-6), "{axis:?} -> {back:?}");
        }
    }

    #[test]
    fn test_axis_normalizes_direction() {
        let back = axis_from(axis_to([0.0, 0.0, 5.0, 90.0]));
        assert!(close(&back, &[0.0, 0.0, 1.0, 90.0], 1e-6));
    }

    #[test]
    fn test_identity_rotation_hits_pole() {
        let back = axis_from(axis_to([0.0, 0.0, 1.0, 0.0]));
        assert!(close(&back, &[0.0, 0.0, 0.0, 0.0], 1e-9));
    }
}
