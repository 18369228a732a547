//! # Dataspaces and units
//!
//! A dataspace groups the units that measure one physical quantity. Each
//! dataspace has a neutral unit; every other unit converts through it:
//!
//! ```text
//! value(from) ─ to_neutral ─▶ neutral ─ from_neutral ─▶ value(to)
//! ```
//!
//! Conversions run in f64 on a four-slot representation and are stored back
//! into the unit's natural shape (Float, Vec2, Vec3 or Vec4).

pub mod angle;
pub mod color;
pub mod distance;
pub mod gain;
pub mod orientation;
pub mod position;
pub mod speed;
pub mod temperature;
pub mod time;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::{Value, ValueType};
use crate::{Error, Result};

/// Working representation: up to four components, unused slots are zero.
pub type Repr = [f64; 4];

// ============================================================================
// Unit tables
// ============================================================================

/// Static description of one unit.
pub struct UnitDef {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub value_type: ValueType,
    pub to_neutral: fn(Repr) -> Repr,
    pub from_neutral: fn(Repr) -> Repr,
}

impl fmt::Debug for UnitDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitDef")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataspace {
    Distance,
    Angle,
    Orientation,
    Position,
    Speed,
    Color,
    Gain,
    Temperature,
    Time,
}

impl Dataspace {
    pub const ALL: [Dataspace; 9] = [
        Dataspace::Distance,
        Dataspace::Angle,
        Dataspace::Orientation,
        Dataspace::Position,
        Dataspace::Speed,
        Dataspace::Color,
        Dataspace::Gain,
        Dataspace::Temperature,
        Dataspace::Time,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dataspace::Distance => "distance",
            Dataspace::Angle => "angle",
            Dataspace::Orientation => "orientation",
            Dataspace::Position => "position",
            Dataspace::Speed => "speed",
            Dataspace::Color => "color",
            Dataspace::Gain => "gain",
            Dataspace::Temperature => "temperature",
            Dataspace::Time => "time",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name().eq_ignore_ascii_case(name))
    }

    /// Unit table; index 0 is always the neutral unit.
    pub fn units(self) -> &'static [UnitDef] {
        match self {
            Dataspace::Distance => &distance::UNITS,
            Dataspace::Angle => &angle::UNITS,
            Dataspace::Orientation => &orientation::UNITS,
            Dataspace::Position => &position::UNITS,
            Dataspace::Speed => &speed::UNITS,
            Dataspace::Color => &color::UNITS,
            Dataspace::Gain => &gain::UNITS,
            Dataspace::Temperature => &temperature::UNITS,
            Dataspace::Time => &time::UNITS,
        }
    }

    pub fn neutral(self) -> Unit {
        Unit::new(self, 0)
    }

    /// Every unit of this dataspace, neutral first.
    pub fn all_units(self) -> impl Iterator<Item = Unit> {
        (0..self.units().len()).map(move |i| Unit::new(self, i as u8))
    }
}

impl fmt::Display for Dataspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Unit handle
// ============================================================================

/// A unit: a dataspace plus a position in its table.
///
/// Only constructed from the per-dataspace constants and [`Unit::parse`],
/// so the table index is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Unit {
    dataspace: Dataspace,
    index: u8,
}

impl Unit {
    pub(crate) const fn new(dataspace: Dataspace, index: u8) -> Self {
        Self { dataspace, index }
    }

    pub fn dataspace(self) -> Dataspace {
        self.dataspace
    }

    pub fn def(self) -> &'static UnitDef {
        &self.dataspace.units()[usize::from(self.index)]
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    /// Natural value shape of this unit.
    pub fn value_type(self) -> ValueType {
        self.def().value_type
    }

    pub fn is_neutral(self) -> bool {
        self.index == 0
    }

    pub fn convertible_to(self, other: Unit) -> bool {
        self.dataspace == other.dataspace
    }

    /// Parse `"dataspace.unit"`, a bare unit name, or an alias.
    pub fn parse(text: &str) -> Option<Unit> {
        let text = text.trim();
        if let Some((space, unit)) = text.split_once('.') {
            if let Some(ds) = Dataspace::from_name(space) {
                return ds.all_units().find(|u| u.matches(unit));
            }
        }
        Dataspace::ALL
            .into_iter()
            .flat_map(Dataspace::all_units)
            .find(|u| u.matches(text))
    }

    fn matches(self, text: &str) -> bool {
        let def = self.def();
        def.name.eq_ignore_ascii_case(text) || def.aliases.iter().any(|a| *a == text)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataspace.name(), self.name())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Unit::parse(s).ok_or_else(|| Error::Config(format!("unknown unit `{s}`")))
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Unit::parse(&text).ok_or_else(|| serde::de::Error::custom(format!("unknown unit `{text}`")))
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Convert `value`, expressed in `from`, into `to`.
///
/// Units of different dataspaces are rejected. Converting a unit to itself
/// returns the value unchanged.
pub fn convert(value: &Value, from: Unit, to: Unit) -> Result<Value> {
    if !from.convertible_to(to) {
        return Err(Error::UnconvertibleUnit { from: from.to_string(), to: to.to_string() });
    }
    let repr = to_repr(value, from.value_type())?;
    if from == to {
        return Ok(from_repr(repr, to.value_type()));
    }
    let neutral = (from.def().to_neutral)(repr);
    Ok(from_repr((to.def().from_neutral)(neutral), to.value_type()))
}

/// Express `value` (in `unit`) in the neutral unit of its dataspace.
pub fn to_neutral(value: &Value, unit: Unit) -> Result<Value> {
    convert(value, unit, unit.dataspace().neutral())
}

/// Express a neutral-unit `value` in `unit`.
pub fn from_neutral(value: &Value, unit: Unit) -> Result<Value> {
    convert(value, unit.dataspace().neutral(), unit)
}

fn to_repr(value: &Value, ty: ValueType) -> Result<Repr> {
    let mismatch = || Error::TypeMismatch { expected: ty.name().into(), got: value.type_name().into() };
    let mut repr = [0.0; 4];
    match ty.vec_len() {
        None => repr[0] = f64::from(value.to_f32().ok_or_else(mismatch)?),
        Some(n) => {
            let comps: Vec<f32> = match value {
                Value::Tuple(t) => t.iter().map(Value::to_f32).collect::<Option<_>>().ok_or_else(mismatch)?,
                other => other.as_components().ok_or_else(mismatch)?.to_vec(),
            };
            if comps.len() != n {
                return Err(mismatch());
            }
            for (slot, c) in repr.iter_mut().zip(comps) {
                *slot = f64::from(c);
            }
        }
    }
    Ok(repr)
}

fn from_repr(repr: Repr, ty: ValueType) -> Value {
    let r = repr.map(|c| c as f32);
    match ty {
        ValueType::Vec2 => Value::Vec2([r[0], r[1]]),
        ValueType::Vec3 => Value::Vec3([r[0], r[1], r[2]]),
        ValueType::Vec4 => Value::Vec4(r),
        _ => Value::Float(r[0]),
    }
}

// ============================================================================
// Shared conversion helpers
// ============================================================================

pub(crate) fn identity(r: Repr) -> Repr {
    r
}

/// `neutral = value * NUM / DEN`
pub(crate) fn ratio_to<const NUM: i64, const DEN: i64>(r: Repr) -> Repr {
    [r[0] * NUM as f64 / DEN as f64, 0.0, 0.0, 0.0]
}

/// `value = neutral * DEN / NUM`
pub(crate) fn ratio_from<const NUM: i64, const DEN: i64>(r: Repr) -> Repr {
    [r[0] * DEN as f64 / NUM as f64, 0.0, 0.0, 0.0]
}

/// `1 / x`, with zero mapping to zero.
pub(crate) fn reciprocal(x: f64) -> f64 {
    if x.abs() < f64::EPSILON { 0.0 } else { 1.0 / x }
}

pub(crate) const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;
pub(crate) const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
