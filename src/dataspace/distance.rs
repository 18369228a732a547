//! Distance. Neutral unit: meter.

use super::{Dataspace, Unit, UnitDef, identity, ratio_from, ratio_to};
use crate::model::ValueType;

pub const METER: Unit = Unit::new(Dataspace::Distance, 0);
pub const KILOMETER: Unit = Unit::new(Dataspace::Distance, 1);
pub const DECIMETER: Unit = Unit::new(Dataspace::Distance, 2);
pub const CENTIMETER: Unit = Unit::new(Dataspace::Distance, 3);
pub const MILLIMETER: Unit = Unit::new(Dataspace::Distance, 4);
pub const MICROMETER: Unit = Unit::new(Dataspace::Distance, 5);
pub const NANOMETER: Unit = Unit::new(Dataspace::Distance, 6);
pub const PICOMETER: Unit = Unit::new(Dataspace::Distance, 7);
pub const INCH: Unit = Unit::new(Dataspace::Distance, 8);
pub const FOOT: Unit = Unit::new(Dataspace::Distance, 9);
pub const MILE: Unit = Unit::new(Dataspace::Distance, 10);

macro_rules! linear {
    ($name:literal, [$($alias:literal),*], $num:literal / $den:literal) => {
        UnitDef {
            name: $name,
            aliases: &[$($alias),*],
            value_type: ValueType::Float,
            to_neutral: ratio_to::<$num, $den>,
            from_neutral: ratio_from::<$num, $den>,
        }
    };
}

pub(super) static UNITS: [UnitDef; 11] = [
    UnitDef {
        name: "meter",
        aliases: &["m"],
        value_type: ValueType::Float,
        to_neutral: identity,
        from_neutral: identity,
    },
    linear!("kilometer", ["km"], 1000 / 1),
    linear!("decimeter", ["dm"], 1 / 10),
    linear!("centimeter", ["cm"], 1 / 100),
    linear!("millimeter", ["mm"], 1 / 1000),
    linear!("micrometer", ["um"], 1 / 1_000_000),
    linear!("nanometer", ["nm"], 1 / 1_000_000_000),
    linear!("picometer", ["pm"], 1 / 1_000_000_000_000),
    linear!("inch", ["in"], 254 / 10_000),
    linear!("foot", ["ft"], 3048 / 10_000),
    linear!("mile", ["mi"], 16_093_440 / 10_000),
];
