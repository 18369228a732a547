//! Gain. Neutral unit: linear amplitude.

use super::{Dataspace, Repr, Unit, UnitDef, identity};
use crate::model::ValueType;

pub const LINEAR: Unit = Unit::new(Dataspace::Gain, 0);
pub const DECIBEL: Unit = Unit::new(Dataspace::Gain, 1);
pub const DECIBEL_RAW: Unit = Unit::new(Dataspace::Gain, 2);
pub const MIDIGAIN: Unit = Unit::new(Dataspace::Gain, 3);

/// Silence threshold for `decibel`: anything at or below maps to zero.
pub const DB_FLOOR: f64 = -96.0;
/// Smallest linear amplitude `decibel_raw` will take a logarithm of.
const RAW_LINEAR_FLOOR: f64 = 1e-12;

fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

fn linear_to_db(lin: f64) -> f64 {
    20.0 * lin.log10()
}

/// Curve exponent placing midi 100 at unity and 127 at +12 dB.
fn midi_power() -> f64 {
    1.125f64.ln() / 1.27f64.ln()
}

fn midi_to_db(midi: f64) -> f64 {
    if midi <= 0.0 {
        return DB_FLOOR;
    }
    ((midi / 100.0).powf(midi_power()) - 1.0) * -DB_FLOOR
}

fn db_to_midi(db: f64) -> f64 {
    if db <= DB_FLOOR {
        return 0.0;
    }
    100.0 * (db / -DB_FLOOR + 1.0).powf(1.0 / midi_power())
}

fn decibel_to(r: Repr) -> Repr {
    let lin = if r[0] <= DB_FLOOR { 0.0 } else { db_to_linear(r[0]) };
    [lin, 0.0, 0.0, 0.0]
}

fn decibel_from(r: Repr) -> Repr {
    let db = if r[0] <= 0.0 { DB_FLOOR } else { linear_to_db(r[0]).max(DB_FLOOR) };
    [db, 0.0, 0.0, 0.0]
}

fn decibel_raw_to(r: Repr) -> Repr {
    [db_to_linear(r[0]), 0.0, 0.0, 0.0]
}

fn decibel_raw_from(r: Repr) -> Repr {
    [linear_to_db(r[0].max(RAW_LINEAR_FLOOR)), 0.0, 0.0, 0.0]
}

fn midigain_to(r: Repr) -> Repr {
    decibel_to([midi_to_db(r[0]), 0.0, 0.0, 0.0])
}

fn midigain_from(r: Repr) -> Repr {
    [db_to_midi(decibel_from(r)[0]), 0.0, 0.0, 0.0]
}

pub(super) static UNITS: [UnitDef; 4] = [
    UnitDef {
        name: "linear",
        aliases: &["lin"],
        value_type: ValueType::Float,
        to_neutral: identity,
        from_neutral: identity,
    },
    UnitDef {
        name: "decibel",
        aliases: &["dB", "db"],
        value_type: ValueType::Float,
        to_neutral: decibel_to,
        from_neutral: decibel_from,
    },
    UnitDef {
        name: "decibel_raw",
        aliases: &["dB-raw"],
        value_type: ValueType::Float,
        to_neutral: decibel_raw_to,
        from_neutral: decibel_raw_from,
    },
    UnitDef {
        name: "midigain",
        aliases: &["midi"],
        value_type: ValueType::Float,
        to_neutral: midigain_to,
        from_neutral: midigain_from,
    },
];
