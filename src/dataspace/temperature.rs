//! Temperature. Neutral unit: kelvin.

use super::{Dataspace, Repr, Unit, UnitDef, identity};
use crate::model::ValueType;

pub const KELVIN: Unit = Unit::new(Dataspace::Temperature, 0);
pub const CELSIUS: Unit = Unit::new(Dataspace::Temperature, 1);
pub const FAHRENHEIT: Unit = Unit::new(Dataspace::Temperature, 2);

const ZERO_CELSIUS: f64 = 273.15;

fn celsius_to(r: Repr) -> Repr {
    [r[0] + ZERO_CELSIUS, 0.0, 0.0, 0.0]
}

fn celsius_from(r: Repr) -> Repr {
    [r[0] - ZERO_CELSIUS, 0.0, 0.0, 0.0]
}

fn fahrenheit_to(r: Repr) -> Repr {
    [(r[0] - 32.0) * 5.0 / 9.0 + ZERO_CELSIUS, 0.0, 0.0, 0.0]
}

fn fahrenheit_from(r: Repr) -> Repr {
    [(r[0] - ZERO_CELSIUS) * 9.0 / 5.0 + 32.0, 0.0, 0.0, 0.0]
}

pub(super) static UNITS: [UnitDef; 3] = [
    UnitDef {
        name: "kelvin",
        aliases: &["K"],
        value_type: ValueType::Float,
        to_neutral: identity,
        from_neutral: identity,
    },
    UnitDef {
        name: "celsius",
        aliases: &["C"],
        value_type: ValueType::Float,
        to_neutral: celsius_to,
        from_neutral: celsius_from,
    },
    UnitDef {
        name: "fahrenheit",
        aliases: &["F"],
        value_type: ValueType::Float,
        to_neutral: fahrenheit_to,
        from_neutral: fahrenheit_from,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataspace::convert;
    use crate::model::Value;

    fn conv(v: f32, from: Unit, to: Unit) -> f32 {
        convert(&Value::Float(v), from, to).unwrap().to_f32().unwrap()
    }

    #[test]
    fn test_fixed_points() {
        assert!((conv(100.0, CELSIUS, FAHRENHEIT) - 212.0).abs() < 1e-3);
        assert!((conv(32.0, FAHRENHEIT, CELSIUS)).abs() < 1e-3);
        assert!((conv(0.0, KELVIN, CELSIUS) + 273.15).abs() < 1e-3);
        assert!((conv(-40.0, CELSIUS, FAHRENHEIT) + 40.0).abs() < 1e-3);
    }
}
