//! Re-typing a domain when its address changes value type.
//!
//! Bounds carry over whenever they can be read in the new type: numeric
//! scalars convert between each other, scalars broadcast into vecs and
//! tuples, and tuples of the right length become vec bounds. Everything
//! else starts from an empty domain.

use super::{Domain, DomainBase, as_array, as_tuple};
use crate::model::{Value, ValueType};

pub(super) fn convert_domain(domain: &Domain, ty: ValueType) -> Domain {
    if domain.value_type() == Some(ty) {
        return domain.clone();
    }
    match ty {
        ValueType::Bool => Domain::Bool(retype(domain, Value::to_bool)),
        ValueType::Int => Domain::Int(retype(domain, Value::to_i32)),
        ValueType::Float => Domain::Float(retype(domain, Value::to_f32)),
        ValueType::Char => Domain::Char(retype(domain, Value::to_char)),
        ValueType::String => Domain::String(Vec::new()),
        ValueType::Vec2 => Domain::Vec2(retype_array(domain)),
        ValueType::Vec3 => Domain::Vec3(retype_array(domain)),
        ValueType::Vec4 => Domain::Vec4(retype_array(domain)),
        ValueType::Tuple => Domain::Tuple(retype_tuple(domain)),
        ValueType::Impulse | ValueType::Destination | ValueType::Behavior => Domain::for_type(ty),
    }
}

fn is_scalar(domain: &Domain) -> bool {
    match domain {
        Domain::Bool(_) | Domain::Int(_) | Domain::Float(_) | Domain::Char(_) => true,
        Domain::Generic(d) => [&d.min, &d.max]
            .into_iter()
            .flatten()
            .all(|b| b.is_numeric()),
        _ => false,
    }
}

fn retype<T>(domain: &Domain, extract: impl Fn(&Value) -> Option<T>) -> DomainBase<T> {
    if !is_scalar(domain) {
        return DomainBase::default();
    }
    DomainBase {
        min: domain.min().as_ref().and_then(&extract),
        max: domain.max().as_ref().and_then(&extract),
        values: domain.values().iter().filter_map(&extract).collect(),
    }
}

fn broadcast<const N: usize>(bound: Option<Value>) -> Option<[f32; N]> {
    let bound = bound?;
    match &bound {
        Value::Tuple(t) if t.len() == 1 => t[0].to_f32().map(|f| [f; N]),
        Value::Tuple(_) | Value::Vec2(_) | Value::Vec3(_) | Value::Vec4(_) => as_array(&bound),
        scalar => scalar.to_f32().map(|f| [f; N]),
    }
}

fn retype_array<const N: usize>(domain: &Domain) -> DomainBase<[f32; N]> {
    match domain {
        Domain::Vec2(_) | Domain::Vec3(_) | Domain::Vec4(_) | Domain::Tuple(_) => DomainBase {
            min: broadcast(domain.min()),
            max: broadcast(domain.max()),
            values: domain.values().iter().filter_map(as_array).collect(),
        },
        _ if is_scalar(domain) => DomainBase::new(broadcast(domain.min()), broadcast(domain.max())),
        _ => DomainBase::default(),
    }
}

fn retype_tuple(domain: &Domain) -> DomainBase<Vec<Value>> {
    match domain {
        Domain::Vec2(_) | Domain::Vec3(_) | Domain::Vec4(_) => DomainBase {
            min: domain.min().as_ref().map(as_tuple),
            max: domain.max().as_ref().map(as_tuple),
            values: domain.values().iter().map(as_tuple).collect(),
        },
        _ if is_scalar(domain) => DomainBase::new(
            domain.min().as_ref().map(as_tuple),
            domain.max().as_ref().map(as_tuple),
        ),
        _ => DomainBase::default(),
    }
}
