//! Angle. Neutral unit: radian.

use super::{DEG_TO_RAD, Dataspace, RAD_TO_DEG, Repr, Unit, UnitDef, identity};
use crate::model::ValueType;

pub const RADIAN: Unit = Unit::new(Dataspace::Angle, 0);
pub const DEGREE: Unit = Unit::new(Dataspace::Angle, 1);

fn degree_to(r: Repr) -> Repr {
    [r[0] * DEG_TO_RAD, 0.0, 0.0, 0.0]
}

fn degree_from(r: Repr) -> Repr {
    [r[0] * RAD_TO_DEG, 0.0, 0.0, 0.0]
}

pub(super) static UNITS: [UnitDef; 2] = [
    UnitDef {
        name: "radian",
        aliases: &["rad"],
        value_type: ValueType::Float,
        to_neutral: identity,
        from_neutral: identity,
    },
    UnitDef {
        name: "degree",
        aliases: &["deg"],
        value_type: ValueType::Float,
        to_neutral: degree_to,
        from_neutral: degree_from,
    },
];
