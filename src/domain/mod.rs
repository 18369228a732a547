//! # Domains and bounding
//!
//! A [`Domain`] describes the admissible values of an address: optional
//! min/max bounds and an optional set of allowed values. [`BoundingMode`]
//! decides what happens to values outside the bounds. A non-empty value set
//! always takes precedence over bounds.

pub mod clamp;
mod apply;
mod conversion;

use serde::{Deserialize, Serialize};

use crate::model::{Value, ValueType};

pub use clamp::Bounded;

/// What to do with a value that falls outside its domain's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundingMode {
    /// Pass through untouched.
    #[default]
    Free,
    /// Clamp to `[min, max]`.
    Clip,
    /// Periodic remap into `[min, max)`.
    Wrap,
    /// Reflect into `[min, max]`.
    Fold,
    /// Enforce `min` only.
    Low,
    /// Enforce `max` only.
    High,
}

impl BoundingMode {
    /// Name used in namespace exports.
    pub fn name(self) -> &'static str {
        match self {
            BoundingMode::Free => "none",
            BoundingMode::Clip => "both",
            BoundingMode::Wrap => "wrap",
            BoundingMode::Fold => "fold",
            BoundingMode::Low => "low",
            BoundingMode::High => "high",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "none" | "free" => BoundingMode::Free,
            "both" | "clip" => BoundingMode::Clip,
            "wrap" => BoundingMode::Wrap,
            "fold" => BoundingMode::Fold,
            "low" => BoundingMode::Low,
            "high" => BoundingMode::High,
            _ => return None,
        })
    }
}

/// Whether a commit equal to the current value is suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepetitionFilter {
    #[default]
    Off,
    On,
}

// ============================================================================
// Domain types
// ============================================================================

/// Bounds and allowed values for one element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct DomainBase<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<T>,
}

impl<T> Default for DomainBase<T> {
    fn default() -> Self {
        Self { min: None, max: None, values: Vec::new() }
    }
}

impl<T> DomainBase<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max, values: Vec::new() }
    }

    pub fn bounded(min: T, max: T) -> Self {
        Self::new(Some(min), Some(max))
    }

    pub fn with_values(values: impl IntoIterator<Item = T>) -> Self {
        Self { min: None, max: None, values: values.into_iter().collect() }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.values.is_empty()
    }
}

/// Admissible values of an address, one variant per value shape.
///
/// `Generic` holds untyped bounds and is used when min and max disagree on
/// their tag. `String` only supports a value set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "domain")]
pub enum Domain {
    Impulse,
    Bool(DomainBase<bool>),
    Int(DomainBase<i32>),
    Float(DomainBase<f32>),
    Char(DomainBase<char>),
    String(Vec<String>),
    Vec2(DomainBase<[f32; 2]>),
    Vec3(DomainBase<[f32; 3]>),
    Vec4(DomainBase<[f32; 4]>),
    Tuple(DomainBase<Vec<Value>>),
    Generic(DomainBase<Value>),
    Destination,
    Behavior,
}

impl Domain {
    pub fn int(min: i32, max: i32) -> Domain {
        Domain::Int(DomainBase::bounded(min, max))
    }

    pub fn float(min: f32, max: f32) -> Domain {
        Domain::Float(DomainBase::bounded(min, max))
    }

    /// Empty domain matching a value shape.
    pub fn for_type(ty: ValueType) -> Domain {
        match ty {
            ValueType::Impulse => Domain::Impulse,
            ValueType::Bool => Domain::Bool(DomainBase::default()),
            ValueType::Int => Domain::Int(DomainBase::default()),
            ValueType::Float => Domain::Float(DomainBase::default()),
            ValueType::Char => Domain::Char(DomainBase::default()),
            ValueType::String => Domain::String(Vec::new()),
            ValueType::Vec2 => Domain::Vec2(DomainBase::default()),
            ValueType::Vec3 => Domain::Vec3(DomainBase::default()),
            ValueType::Vec4 => Domain::Vec4(DomainBase::default()),
            ValueType::Tuple => Domain::Tuple(DomainBase::default()),
            ValueType::Destination => Domain::Destination,
            ValueType::Behavior => Domain::Behavior,
        }
    }

    /// Domain from two bounds. Same-tag bounds give a typed domain,
    /// anything else a generic one.
    pub fn make(min: &Value, max: &Value) -> Domain {
        match (min, max) {
            (Value::Bool(a), Value::Bool(b)) => Domain::Bool(DomainBase::bounded(*a, *b)),
            (Value::Int(a), Value::Int(b)) => Domain::Int(DomainBase::bounded(*a, *b)),
            (Value::Float(a), Value::Float(b)) => Domain::Float(DomainBase::bounded(*a, *b)),
            (Value::Char(a), Value::Char(b)) => Domain::Char(DomainBase::bounded(*a, *b)),
            (Value::Vec2(a), Value::Vec2(b)) => Domain::Vec2(DomainBase::bounded(*a, *b)),
            (Value::Vec3(a), Value::Vec3(b)) => Domain::Vec3(DomainBase::bounded(*a, *b)),
            (Value::Vec4(a), Value::Vec4(b)) => Domain::Vec4(DomainBase::bounded(*a, *b)),
            (Value::Tuple(a), Value::Tuple(b)) => Domain::Tuple(DomainBase::bounded(a.clone(), b.clone())),
            _ => Domain::Generic(DomainBase::bounded(min.clone(), max.clone())),
        }
    }

    /// Domain of type `ty` restricted to `values`. Members that do not
    /// coerce to `ty` are dropped.
    pub fn from_values(ty: ValueType, values: &[Value]) -> Domain {
        let mut domain = Domain::for_type(ty);
        domain.set_values(values);
        domain
    }

    /// Shape this domain applies to; `None` for generic domains.
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            Domain::Impulse => ValueType::Impulse,
            Domain::Bool(_) => ValueType::Bool,
            Domain::Int(_) => ValueType::Int,
            Domain::Float(_) => ValueType::Float,
            Domain::Char(_) => ValueType::Char,
            Domain::String(_) => ValueType::String,
            Domain::Vec2(_) => ValueType::Vec2,
            Domain::Vec3(_) => ValueType::Vec3,
            Domain::Vec4(_) => ValueType::Vec4,
            Domain::Tuple(_) => ValueType::Tuple,
            Domain::Destination => ValueType::Destination,
            Domain::Behavior => ValueType::Behavior,
            Domain::Generic(_) => return None,
        })
    }

    pub fn min(&self) -> Option<Value> {
        match self {
            Domain::Bool(d) => d.min.map(Value::Bool),
            Domain::Int(d) => d.min.map(Value::Int),
            Domain::Float(d) => d.min.map(Value::Float),
            Domain::Char(d) => d.min.map(Value::Char),
            Domain::Vec2(d) => d.min.map(Value::Vec2),
            Domain::Vec3(d) => d.min.map(Value::Vec3),
            Domain::Vec4(d) => d.min.map(Value::Vec4),
            Domain::Tuple(d) => d.min.clone().map(Value::Tuple),
            Domain::Generic(d) => d.min.clone(),
            Domain::Impulse | Domain::String(_) | Domain::Destination | Domain::Behavior => None,
        }
    }

    pub fn max(&self) -> Option<Value> {
        match self {
            Domain::Bool(d) => d.max.map(Value::Bool),
            Domain::Int(d) => d.max.map(Value::Int),
            Domain::Float(d) => d.max.map(Value::Float),
            Domain::Char(d) => d.max.map(Value::Char),
            Domain::Vec2(d) => d.max.map(Value::Vec2),
            Domain::Vec3(d) => d.max.map(Value::Vec3),
            Domain::Vec4(d) => d.max.map(Value::Vec4),
            Domain::Tuple(d) => d.max.clone().map(Value::Tuple),
            Domain::Generic(d) => d.max.clone(),
            Domain::Impulse | Domain::String(_) | Domain::Destination | Domain::Behavior => None,
        }
    }

    pub fn values(&self) -> Vec<Value> {
        match self {
            Domain::Bool(d) => d.values.iter().copied().map(Value::Bool).collect(),
            Domain::Int(d) => d.values.iter().copied().map(Value::Int).collect(),
            Domain::Float(d) => d.values.iter().copied().map(Value::Float).collect(),
            Domain::Char(d) => d.values.iter().copied().map(Value::Char).collect(),
            Domain::String(set) => set.iter().cloned().map(Value::String).collect(),
            Domain::Vec2(d) => d.values.iter().copied().map(Value::Vec2).collect(),
            Domain::Vec3(d) => d.values.iter().copied().map(Value::Vec3).collect(),
            Domain::Vec4(d) => d.values.iter().copied().map(Value::Vec4).collect(),
            Domain::Tuple(d) => d.values.iter().cloned().map(Value::Tuple).collect(),
            Domain::Generic(d) => d.values.clone(),
            Domain::Impulse | Domain::Destination | Domain::Behavior => Vec::new(),
        }
    }

    /// Replace the lower bound. A bound that does not fit the domain's
    /// element type clears it.
    pub fn set_min(&mut self, min: Option<&Value>) {
        match self {
            Domain::Bool(d) => d.min = min.and_then(Value::to_bool),
            Domain::Int(d) => d.min = min.and_then(Value::to_i32),
            Domain::Float(d) => d.min = min.and_then(Value::to_f32),
            Domain::Char(d) => d.min = min.and_then(Value::to_char),
            Domain::Vec2(d) => d.min = min.and_then(as_array),
            Domain::Vec3(d) => d.min = min.and_then(as_array),
            Domain::Vec4(d) => d.min = min.and_then(as_array),
            Domain::Tuple(d) => d.min = min.map(as_tuple),
            Domain::Generic(d) => d.min = min.cloned(),
            Domain::Impulse | Domain::String(_) | Domain::Destination | Domain::Behavior => {}
        }
    }

    pub fn set_max(&mut self, max: Option<&Value>) {
        match self {
            Domain::Bool(d) => d.max = max.and_then(Value::to_bool),
            Domain::Int(d) => d.max = max.and_then(Value::to_i32),
            Domain::Float(d) => d.max = max.and_then(Value::to_f32),
            Domain::Char(d) => d.max = max.and_then(Value::to_char),
            Domain::Vec2(d) => d.max = max.and_then(as_array),
            Domain::Vec3(d) => d.max = max.and_then(as_array),
            Domain::Vec4(d) => d.max = max.and_then(as_array),
            Domain::Tuple(d) => d.max = max.map(as_tuple),
            Domain::Generic(d) => d.max = max.cloned(),
            Domain::Impulse | Domain::String(_) | Domain::Destination | Domain::Behavior => {}
        }
    }

    pub fn set_values(&mut self, values: &[Value]) {
        match self {
            Domain::Bool(d) => d.values = values.iter().filter_map(Value::to_bool).collect(),
            Domain::Int(d) => d.values = values.iter().filter_map(Value::to_i32).collect(),
            Domain::Float(d) => d.values = values.iter().filter_map(Value::to_f32).collect(),
            Domain::Char(d) => d.values = values.iter().filter_map(Value::to_char).collect(),
            Domain::String(set) => {
                *set = values.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect();
            }
            Domain::Vec2(d) => d.values = values.iter().filter_map(as_array).collect(),
            Domain::Vec3(d) => d.values = values.iter().filter_map(as_array).collect(),
            Domain::Vec4(d) => d.values = values.iter().filter_map(as_array).collect(),
            Domain::Tuple(d) => d.values = values.iter().map(as_tuple).collect(),
            Domain::Generic(d) => d.values = values.to_vec(),
            Domain::Impulse | Domain::Destination | Domain::Behavior => {}
        }
    }

    /// Whether this domain neither bounds nor restricts anything.
    pub fn is_empty(&self) -> bool {
        match self {
            Domain::Bool(d) => d.is_empty(),
            Domain::Int(d) => d.is_empty(),
            Domain::Float(d) => d.is_empty(),
            Domain::Char(d) => d.is_empty(),
            Domain::String(set) => set.is_empty(),
            Domain::Vec2(d) => d.is_empty(),
            Domain::Vec3(d) => d.is_empty(),
            Domain::Vec4(d) => d.is_empty(),
            Domain::Tuple(d) => d.is_empty(),
            Domain::Generic(d) => d.is_empty(),
            Domain::Impulse | Domain::Destination | Domain::Behavior => true,
        }
    }

    /// Bound `value` under `mode`. `None` means the value is rejected.
    pub fn apply(&self, mode: BoundingMode, value: &Value) -> Option<Value> {
        apply::apply_domain(self, mode, value)
    }

    /// Re-express this domain for addresses of type `ty`.
    pub fn convert(&self, ty: ValueType) -> Domain {
        conversion::convert_domain(self, ty)
    }

    /// [`Domain::convert`], but only when every bound and set member
    /// survives the conversion.
    pub fn convert_exact(&self, ty: ValueType) -> Option<Domain> {
        let converted = self.convert(ty);
        let kept = converted.min().is_some() == self.min().is_some()
            && converted.max().is_some() == self.max().is_some()
            && converted.values().len() == self.values().len();
        kept.then_some(converted)
    }
}

/// Exactly-sized float array view of a vec or numeric tuple.
fn as_array<const N: usize>(value: &Value) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    match value {
        Value::Tuple(t) if t.len() == N => {
            for (slot, elem) in out.iter_mut().zip(t) {
                *slot = elem.to_f32()?;
            }
        }
        other => {
            let comps = other.as_components()?;
            if comps.len() != N {
                return None;
            }
            out.copy_from_slice(comps);
        }
    }
    Some(out)
}

fn as_tuple(value: &Value) -> Vec<Value> {
    match value {
        Value::Tuple(t) => t.clone(),
        Value::Vec2(_) | Value::Vec3(_) | Value::Vec4(_) => {
            value.as_components().unwrap_or_default().iter().copied().map(Value::Float).collect()
        }
        scalar => vec![scalar.clone()],
    }
}
