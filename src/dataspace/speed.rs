//! Speed. Neutral unit: meter per second.

use super::{Dataspace, Unit, UnitDef, identity, ratio_from, ratio_to};
use crate::model::ValueType;

pub const METER_PER_SECOND: Unit = Unit::new(Dataspace::Speed, 0);
pub const KILOMETER_PER_HOUR: Unit = Unit::new(Dataspace::Speed, 1);
pub const MILE_PER_HOUR: Unit = Unit::new(Dataspace::Speed, 2);
pub const KNOT: Unit = Unit::new(Dataspace::Speed, 3);
pub const FOOT_PER_SECOND: Unit = Unit::new(Dataspace::Speed, 4);
pub const FOOT_PER_HOUR: Unit = Unit::new(Dataspace::Speed, 5);

pub(super) static UNITS: [UnitDef; 6] = [
    UnitDef {
        name: "meter.per.second",
        aliases: &["m/s"],
        value_type: ValueType::Float,
        to_neutral: identity,
        from_neutral: identity,
    },
    UnitDef {
        name: "kilometer.per.hour",
        aliases: &["km/h"],
        value_type: ValueType::Float,
        to_neutral: ratio_to::<1000, 3600>,
        from_neutral: ratio_from::<1000, 3600>,
    },
    UnitDef {
        name: "mile.per.hour",
        aliases: &["mph", "mi/h"],
        value_type: ValueType::Float,
        to_neutral: ratio_to::<1_609_344, 3_600_000>,
        from_neutral: ratio_from::<1_609_344, 3_600_000>,
    },
    UnitDef {
        name: "knot",
        aliases: &["kn"],
        value_type: ValueType::Float,
        to_neutral: ratio_to::<1852, 3600>,
        from_neutral: ratio_from::<1852, 3600>,
    },
    UnitDef {
        name: "foot.per.second",
        aliases: &["ft/s"],
        value_type: ValueType::Float,
        to_neutral: ratio_to::<3048, 10_000>,
        from_neutral: ratio_from::<3048, 10_000>,
    },
    UnitDef {
        name: "foot.per.hour",
        aliases: &["ft/h"],
        value_type: ValueType::Float,
        to_neutral: ratio_to::<3048, 36_000_000>,
        from_neutral: ratio_from::<3048, 36_000_000>,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataspace::{Unit, convert};
    use crate::model::Value;

    #[test]
    fn test_highway_speeds() {
        let ms = convert(&Value::Float(36.0), KILOMETER_PER_HOUR, METER_PER_SECOND).unwrap();
        assert!((ms.to_f32().unwrap() - 10.0).abs() < 1e-4);
        let mph = convert(&Value::Float(100.0), KILOMETER_PER_HOUR, MILE_PER_HOUR).unwrap();
        assert!((mph.to_f32().unwrap() - 62.137_12).abs() < 1e-3);
    }

    #[test]
    fn test_dotted_names_parse() {
        assert_eq!(Unit::parse("speed.meter.per.second"), Some(METER_PER_SECOND));
        assert_eq!(Unit::parse("km/h"), Some(KILOMETER_PER_HOUR));
    }
}
