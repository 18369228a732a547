//! Bounding engine: pairs a value with a domain.
//!
//! Array values are bounded component-wise. A bound or set entry with one
//! element is broadcast to every component; any other length mismatch
//! rejects the value. Pairs with no meaningful bounding (a string against a
//! numeric domain, an impulse against anything) pass through untouched.

use smallvec::SmallVec;

use super::clamp::{Bounded, bound};
use super::{BoundingMode, Domain, DomainBase};
use crate::model::Value;

type Components = SmallVec<[f32; 4]>;

pub(super) fn apply_domain(domain: &Domain, mode: BoundingMode, value: &Value) -> Option<Value> {
    match value {
        Value::Bool(v) => match domain {
            Domain::Bool(d) => scalar(d, mode, *v).map(Value::Bool),
            Domain::Generic(d) => generic(d, mode, value),
            _ => Some(value.clone()),
        },
        Value::Int(v) => match domain {
            Domain::Int(d) => scalar(d, mode, *v).map(Value::Int),
            Domain::Generic(d) => generic(d, mode, value),
            _ => Some(value.clone()),
        },
        Value::Float(v) => match domain {
            Domain::Float(d) => scalar(d, mode, *v).map(Value::Float),
            Domain::Generic(d) => generic(d, mode, value),
            _ => Some(value.clone()),
        },
        Value::Char(v) => match domain {
            Domain::Char(d) => scalar(d, mode, *v).map(Value::Char),
            Domain::Generic(d) => generic(d, mode, value),
            _ => Some(value.clone()),
        },
        Value::String(s) => match domain {
            Domain::String(set) => (set.is_empty() || set.contains(s)).then(|| value.clone()),
            Domain::Generic(d) if !d.values.is_empty() => d.values.contains(value).then(|| value.clone()),
            _ => Some(value.clone()),
        },
        Value::Vec2(v) => vector(*v, domain, mode).map(Value::Vec2),
        Value::Vec3(v) => vector(*v, domain, mode).map(Value::Vec3),
        Value::Vec4(v) => vector(*v, domain, mode).map(Value::Vec4),
        Value::Tuple(t) => match domain {
            Domain::Tuple(d) => tuple(t, d, mode).map(Value::Tuple),
            Domain::Generic(d) => generic_tuple(t, d, mode).map(Value::Tuple),
            _ => Some(value.clone()),
        },
        Value::Impulse | Value::Destination(_) | Value::Behavior(_) => Some(value.clone()),
    }
}

// ============================================================================
// Scalars
// ============================================================================

fn scalar<T: Bounded>(d: &DomainBase<T>, mode: BoundingMode, v: T) -> Option<T> {
    if !d.values.is_empty() {
        return d.values.contains(&v).then_some(v);
    }
    Some(bound(mode, v, d.min, d.max))
}

/// Bound a single value against untyped bounds, converting each bound to
/// the value's own element type. Nested tuples are ambiguous and rejected.
fn bound_value(mode: BoundingMode, value: &Value, min: Option<&Value>, max: Option<&Value>) -> Option<Value> {
    Some(match value {
        Value::Bool(v) => Value::Bool(bound(mode, *v, min.and_then(Value::to_bool), max.and_then(Value::to_bool))),
        Value::Int(v) => Value::Int(bound(mode, *v, min.and_then(Value::to_i32), max.and_then(Value::to_i32))),
        Value::Float(v) => Value::Float(bound(mode, *v, min.and_then(Value::to_f32), max.and_then(Value::to_f32))),
        Value::Char(v) => Value::Char(bound(mode, *v, min.and_then(Value::to_char), max.and_then(Value::to_char))),
        Value::Vec2(v) => Value::Vec2(bound_components(*v, mode, components(min)?, components(max)?)?),
        Value::Vec3(v) => Value::Vec3(bound_components(*v, mode, components(min)?, components(max)?)?),
        Value::Vec4(v) => Value::Vec4(bound_components(*v, mode, components(min)?, components(max)?)?),
        Value::Tuple(_) => return None,
        Value::Impulse | Value::String(_) | Value::Destination(_) | Value::Behavior(_) => value.clone(),
    })
}

/// Set membership for untyped sets: equal tags, or numeric tags equal after
/// coercion into the candidate's type.
fn generic_contains(set: &[Value], value: &Value) -> bool {
    set.iter().any(|m| {
        m == value || (m.is_numeric() && value.is_numeric() && m.coerce_to(value.shape()).as_ref() == Some(value))
    })
}

fn generic(d: &DomainBase<Value>, mode: BoundingMode, value: &Value) -> Option<Value> {
    if !d.values.is_empty() {
        return generic_contains(&d.values, value).then(|| value.clone());
    }
    bound_value(mode, value, d.min.as_ref(), d.max.as_ref())
}

// ============================================================================
// Vectors
// ============================================================================

/// Per-component view of an untyped bound: `Some(None)` when absent,
/// `None` when the bound cannot be read as numbers.
fn components(bound: Option<&Value>) -> Option<Option<Components>> {
    let Some(bound) = bound else {
        return Some(None);
    };
    let comps = match bound {
        Value::Tuple(t) => t.iter().map(Value::to_f32).collect::<Option<Components>>()?,
        Value::Vec2(_) | Value::Vec3(_) | Value::Vec4(_) => bound.as_components()?.iter().copied().collect(),
        scalar => SmallVec::from_elem(scalar.to_f32()?, 1),
    };
    Some(Some(comps))
}

/// Component `i` of a bound, broadcasting single-element bounds.
fn pick(bound: &Option<Components>, i: usize, n: usize) -> Result<Option<f32>, ()> {
    match bound {
        None => Ok(None),
        Some(b) if b.len() == 1 => Ok(Some(b[0])),
        Some(b) if b.len() == n => Ok(Some(b[i])),
        Some(_) => Err(()),
    }
}

fn bound_components<const N: usize>(
    mut v: [f32; N],
    mode: BoundingMode,
    min: Option<Components>,
    max: Option<Components>,
) -> Option<[f32; N]> {
    for (i, c) in v.iter_mut().enumerate() {
        let lo = pick(&min, i, N).ok()?;
        let hi = pick(&max, i, N).ok()?;
        *c = bound(mode, *c, lo, hi);
    }
    Some(v)
}

fn every_component_in<const N: usize>(v: &[f32; N], set: &[f32]) -> bool {
    v.iter().all(|c| set.contains(c))
}

fn scalar_vector<T: Bounded, const N: usize>(v: [f32; N], d: &DomainBase<T>, mode: BoundingMode) -> Option<[f32; N]> {
    if !d.values.is_empty() {
        let set: Components = d.values.iter().map(|m| m.to_f32()).collect();
        return every_component_in(&v, &set).then_some(v);
    }
    let lo = d.min.map(Bounded::to_f32).map(|m| SmallVec::from_elem(m, 1));
    let hi = d.max.map(Bounded::to_f32).map(|m| SmallVec::from_elem(m, 1));
    bound_components(v, mode, lo, hi)
}

fn array_vector<const M: usize, const N: usize>(
    v: [f32; N],
    d: &DomainBase<[f32; M]>,
    mode: BoundingMode,
) -> Option<[f32; N]> {
    if !d.values.is_empty() {
        return d.values.iter().any(|m| m[..] == v[..]).then_some(v);
    }
    let lo = d.min.map(|m| m.iter().copied().collect());
    let hi = d.max.map(|m| m.iter().copied().collect());
    bound_components(v, mode, lo, hi)
}

fn vector<const N: usize>(v: [f32; N], domain: &Domain, mode: BoundingMode) -> Option<[f32; N]> {
    match domain {
        Domain::Bool(d) => scalar_vector(v, d, mode),
        Domain::Int(d) => scalar_vector(v, d, mode),
        Domain::Float(d) => scalar_vector(v, d, mode),
        Domain::Char(d) => scalar_vector(v, d, mode),
        Domain::Vec2(d) => array_vector(v, d, mode),
        Domain::Vec3(d) => array_vector(v, d, mode),
        Domain::Vec4(d) => array_vector(v, d, mode),
        Domain::Tuple(d) => {
            if !d.values.is_empty() {
                let hit = d.values.iter().any(|m| {
                    m.len() == N && m.iter().zip(&v).all(|(e, c)| e.to_f32() == Some(*c))
                });
                return hit.then_some(v);
            }
            let lo = components(d.min.as_ref().map(|t| Value::Tuple(t.clone())).as_ref())?;
            let hi = components(d.max.as_ref().map(|t| Value::Tuple(t.clone())).as_ref())?;
            bound_components(v, mode, lo, hi)
        }
        Domain::Generic(d) => {
            if !d.values.is_empty() {
                let set: Components = d.values.iter().filter_map(Value::to_f32).collect();
                return every_component_in(&v, &set).then_some(v);
            }
            bound_components(v, mode, components(d.min.as_ref())?, components(d.max.as_ref())?)
        }
        Domain::Impulse | Domain::String(_) | Domain::Destination | Domain::Behavior => Some(v),
    }
}

// ============================================================================
// Tuples
// ============================================================================

fn has_nested(t: &[Value]) -> bool {
    t.iter().any(|e| matches!(e, Value::Tuple(_)))
}

/// Bound element `i` of a tuple bound, broadcasting single-element bounds.
fn pick_value(bound: Option<&Vec<Value>>, i: usize, n: usize) -> Result<Option<&Value>, ()> {
    match bound {
        None => Ok(None),
        Some(b) if b.len() == 1 => Ok(Some(&b[0])),
        Some(b) if b.len() == n => Ok(Some(&b[i])),
        Some(_) => Err(()),
    }
}

fn tuple(t: &[Value], d: &DomainBase<Vec<Value>>, mode: BoundingMode) -> Option<Vec<Value>> {
    if !d.values.is_empty() {
        if has_nested(t) {
            return None;
        }
        return d.values.iter().any(|m| m.as_slice() == t).then(|| t.to_vec());
    }
    if d.min.is_none() && d.max.is_none() {
        return Some(t.to_vec());
    }
    let n = t.len();
    t.iter()
        .enumerate()
        .map(|(i, e)| {
            let lo = pick_value(d.min.as_ref(), i, n).ok()?;
            let hi = pick_value(d.max.as_ref(), i, n).ok()?;
            bound_value(mode, e, lo, hi)
        })
        .collect()
}

fn generic_tuple(t: &[Value], d: &DomainBase<Value>, mode: BoundingMode) -> Option<Vec<Value>> {
    if d.is_empty() {
        return Some(t.to_vec());
    }
    if has_nested(t) {
        return None;
    }
    t.iter().map(|e| generic(d, mode, e)).collect()
}
