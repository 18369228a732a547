//! Position. Neutral unit: cartesian 3D `[x, y, z]`.
//!
//! Azimuth and elevation are in degrees; azimuth 0 points along +y.

use super::{DEG_TO_RAD, Dataspace, RAD_TO_DEG, Repr, Unit, UnitDef, identity};
use crate::model::ValueType;

pub const CART3D: Unit = Unit::new(Dataspace::Position, 0);
pub const CART2D: Unit = Unit::new(Dataspace::Position, 1);
pub const SPHERICAL: Unit = Unit::new(Dataspace::Position, 2);
pub const POLAR: Unit = Unit::new(Dataspace::Position, 3);
pub const OPENGL: Unit = Unit::new(Dataspace::Position, 4);
pub const CYLINDRICAL: Unit = Unit::new(Dataspace::Position, 5);

fn cart2d_to(r: Repr) -> Repr {
    [r[0], r[1], 0.0, 0.0]
}

fn cart2d_from(r: Repr) -> Repr {
    [r[0], r[1], 0.0, 0.0]
}

/// `[azimuth, elevation, distance]`
fn spherical_to(r: Repr) -> Repr {
    let a = r[0] * DEG_TO_RAD;
    let e = r[1] * DEG_TO_RAD;
    let d = r[2];
    let t = e.cos() * d;
    [a.sin() * t, a.cos() * t, e.sin() * d, 0.0]
}

fn spherical_from(r: Repr) -> Repr {
    let [x, y, z, _] = r;
    let planar = x.hypot(y);
    [
        x.atan2(y) * RAD_TO_DEG,
        z.atan2(planar) * RAD_TO_DEG,
        (x * x + y * y + z * z).sqrt(),
        0.0,
    ]
}

/// `[azimuth, distance]`
fn polar_to(r: Repr) -> Repr {
    let a = r[0] * DEG_TO_RAD;
    [a.sin() * r[1], a.cos() * r[1], 0.0, 0.0]
}

fn polar_from(r: Repr) -> Repr {
    [r[0].atan2(r[1]) * RAD_TO_DEG, r[0].hypot(r[1]), 0.0, 0.0]
}

/// OpenGL axes: y up, z towards the viewer.
fn opengl_to(r: Repr) -> Repr {
    [r[0], -r[2], r[1], 0.0]
}

fn opengl_from(r: Repr) -> Repr {
    [r[0], r[2], -r[1], 0.0]
}

/// `[distance, azimuth, z]`
fn cylindrical_to(r: Repr) -> Repr {
    let a = r[1] * DEG_TO_RAD;
    [a.sin() * r[0], a.cos() * r[0], r[2], 0.0]
}

fn cylindrical_from(r: Repr) -> Repr {
    [r[0].hypot(r[1]), r[0].atan2(r[1]) * RAD_TO_DEG, r[2], 0.0]
}

pub(super) static UNITS: [UnitDef; 6] = [
    UnitDef {
        name: "cart3D",
        aliases: &["xyz"],
        value_type: ValueType::Vec3,
        to_neutral: identity,
        from_neutral: identity,
    },
    UnitDef {
        name: "cart2D",
        aliases: &["xy"],
        value_type: ValueType::Vec2,
        to_neutral: cart2d_to,
        from_neutral: cart2d_from,
    },
    UnitDef {
        name: "spherical",
        aliases: &["aed"],
        value_type: ValueType::Vec3,
        to_neutral: spherical_to,
        from_neutral: spherical_from,
    },
    UnitDef {
        name: "polar",
        aliases: &["ad"],
        value_type: ValueType::Vec2,
        to_neutral: polar_to,
        from_neutral: polar_from,
    },
    UnitDef {
        name: "openGL",
        aliases: &["gl"],
        value_type: ValueType::Vec3,
        to_neutral: opengl_to,
        from_neutral: opengl_from,
    },
    UnitDef {
        name: "cylindrical",
        aliases: &["daz"],
        value_type: ValueType::Vec3,
        to_neutral: cylindrical_to,
        from_neutral: cylindrical_from,
    },
];
