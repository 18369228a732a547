//! Wire argument codec.
//!
//! Inbound arguments are decoded against the address's current value: the
//! current value decides the target shape and provides the fallback when an
//! argument cannot be read. Outbound values are encoded using only 32-bit
//! ints, 32-bit floats and strings.

use smallvec::SmallVec;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::model::Value;

/// One typed wire argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireArg {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Char(char),
    True,
    False,
    String(String),
    Symbol(String),
    Nil,
}

pub type WireArgs = SmallVec<[WireArg; 4]>;

impl WireArg {
    /// One-letter type tag.
    pub fn tag(&self) -> char {
        match self {
            WireArg::Int32(_) => 'i',
            WireArg::Int64(_) => 'h',
            WireArg::Float32(_) => 'f',
            WireArg::Float64(_) => 'd',
            WireArg::Char(_) => 'c',
            WireArg::True => 'T',
            WireArg::False => 'F',
            WireArg::String(_) => 's',
            WireArg::Symbol(_) => 'S',
            WireArg::Nil => 'N',
        }
    }

    fn text(&self) -> Option<&str> {
        match self {
            WireArg::String(s) | WireArg::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f32(&self, fallback: f32) -> f32 {
        match self {
            WireArg::Int32(i) => *i as f32,
            WireArg::Int64(i) => *i as f32,
            WireArg::Float32(f) => *f,
            WireArg::Float64(f) => *f as f32,
            WireArg::Char(c) => u32::from(*c) as f32,
            WireArg::True => 1.0,
            WireArg::False => 0.0,
            WireArg::String(s) | WireArg::Symbol(s) => s.trim().parse().unwrap_or(fallback),
            WireArg::Nil => fallback,
        }
    }

    pub fn as_i32(&self, fallback: i32) -> i32 {
        match self {
            WireArg::Int32(i) => *i,
            WireArg::Int64(i) => saturate(*i),
            WireArg::Float32(f) => *f as i32,
            WireArg::Float64(f) => *f as i32,
            WireArg::Char(c) => i32::try_from(u32::from(*c)).unwrap_or(fallback),
            WireArg::True => 1,
            WireArg::False => 0,
            WireArg::String(s) | WireArg::Symbol(s) => s.trim().parse().unwrap_or(fallback),
            WireArg::Nil => fallback,
        }
    }

    pub fn as_bool(&self, fallback: bool) -> bool {
        match self {
            WireArg::Int32(i) => *i != 0,
            WireArg::Int64(i) => *i != 0,
            WireArg::Float32(f) => *f != 0.0,
            WireArg::Float64(f) => *f != 0.0,
            WireArg::Char(c) => *c != '\0',
            WireArg::True => true,
            WireArg::False => false,
            WireArg::String(s) | WireArg::Symbol(s) => match s.trim() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => fallback,
            },
            WireArg::Nil => fallback,
        }
    }

    pub fn as_char(&self, fallback: char) -> char {
        let from_code = |code: i64| u32::try_from(code).ok().and_then(char::from_u32).unwrap_or(fallback);
        match self {
            WireArg::Int32(i) => from_code(i64::from(*i)),
            WireArg::Int64(i) => from_code(*i),
            WireArg::Float32(f) => from_code(*f as i64),
            WireArg::Float64(f) => from_code(*f as i64),
            WireArg::Char(c) => *c,
            WireArg::True => 'T',
            WireArg::False => 'F',
            WireArg::String(s) | WireArg::Symbol(s) => s.chars().next().unwrap_or(fallback),
            WireArg::Nil => fallback,
        }
    }

    pub fn as_string(&self, fallback: &str) -> String {
        match self {
            WireArg::Int32(i) => i.to_string(),
            WireArg::Int64(i) => i.to_string(),
            WireArg::Float32(f) => f.to_string(),
            WireArg::Float64(f) => f.to_string(),
            WireArg::Char(c) => c.to_string(),
            WireArg::True => "true".into(),
            WireArg::False => "false".into(),
            WireArg::String(s) | WireArg::Symbol(s) => s.clone(),
            WireArg::Nil => fallback.into(),
        }
    }

    /// Natural value of a lone argument, used to build tuples.
    pub fn to_value(&self) -> Value {
        match self {
            WireArg::Int32(i) => Value::Int(*i),
            WireArg::Int64(i) => Value::Int(saturate(*i)),
            WireArg::Float32(f) => Value::Float(*f),
            WireArg::Float64(f) => Value::Float(*f as f32),
            WireArg::Char(c) => Value::Char(*c),
            WireArg::True => Value::Bool(true),
            WireArg::False => Value::Bool(false),
            WireArg::String(s) | WireArg::Symbol(s) => Value::String(s.clone()),
            WireArg::Nil => Value::Impulse,
        }
    }
}

fn saturate(i: i64) -> i32 {
    i.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Type-tag string of an argument list, e.g. `"ifs"`.
pub fn tags(args: &[WireArg]) -> String {
    args.iter().map(WireArg::tag).collect()
}

pub(crate) fn describe(args: &[WireArg]) -> String {
    format!("{} wire argument(s) `{}`", args.len(), tags(args))
}

// ============================================================================
// Decode
// ============================================================================

/// Decode `args` into the shape of `current`.
///
/// No arguments re-commit `current`. Unreadable arguments fall back to the
/// matching part of `current`. Tuples keep their element types when the
/// argument count lines up with the current elements; otherwise every
/// argument takes its natural type. Returns `None` when the argument count
/// cannot fill a fixed-size vec, or for destination and behavior values.
pub fn decode(current: &Value, args: &[WireArg]) -> Option<Value> {
    let Some(first) = args.first() else {
        return Some(current.clone());
    };
    Some(match current {
        Value::Impulse => Value::Impulse,
        Value::Bool(b) => Value::Bool(first.as_bool(*b)),
        Value::Int(i) => Value::Int(first.as_i32(*i)),
        Value::Float(f) => Value::Float(first.as_f32(*f)),
        Value::Char(c) => Value::Char(first.as_char(*c)),
        Value::String(s) => Value::String(first.as_string(s)),
        Value::Vec2(v) => Value::Vec2(decode_components(v, args)?),
        Value::Vec3(v) => Value::Vec3(decode_components(v, args)?),
        Value::Vec4(v) => Value::Vec4(decode_components(v, args)?),
        Value::Tuple(elems) => Value::Tuple(
            decode_elements(elems, args).unwrap_or_else(|| args.iter().map(WireArg::to_value).collect()),
        ),
        Value::Destination(_) | Value::Behavior(_) => return None,
    })
}

/// Number of wire arguments `value` encodes to.
fn arity(value: &Value) -> usize {
    match value {
        Value::Impulse | Value::Destination(_) | Value::Behavior(_) => 0,
        Value::Vec2(_) => 2,
        Value::Vec3(_) => 3,
        Value::Vec4(_) => 4,
        Value::Tuple(t) => t.iter().map(arity).sum(),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Char(_) | Value::String(_) => 1,
    }
}

/// Decode a tuple element by element, each slice read in the shape of the
/// element it replaces. `None` when the arguments do not line up with the
/// current elements.
fn decode_elements(elems: &[Value], args: &[WireArg]) -> Option<Vec<Value>> {
    if elems.iter().map(arity).sum::<usize>() != args.len() {
        return None;
    }
    let mut rest = args;
    elems
        .iter()
        .map(|elem| {
            let (head, tail) = rest.split_at(arity(elem));
            rest = tail;
            decode(elem, head)
        })
        .collect()
}

fn decode_components<const N: usize>(current: &[f32; N], args: &[WireArg]) -> Option<[f32; N]> {
    if args.len() != N {
        return None;
    }
    let mut out = *current;
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.as_f32(*slot);
    }
    Some(out)
}

// ============================================================================
// Encode
// ============================================================================

/// Encode a value for the wire. Bools and chars travel as ints; impulses,
/// destinations and behaviors carry no arguments.
pub fn encode(value: &Value) -> WireArgs {
    let mut out = WireArgs::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut WireArgs) {
    match value {
        Value::Impulse | Value::Destination(_) | Value::Behavior(_) => {}
        Value::Bool(b) => out.push(WireArg::Int32(i32::from(*b))),
        Value::Int(i) => out.push(WireArg::Int32(*i)),
        Value::Float(f) => out.push(WireArg::Float32(*f)),
        Value::Char(c) => out.push(WireArg::Int32(i32::try_from(u32::from(*c)).unwrap_or(0))),
        Value::String(s) => out.push(WireArg::String(s.clone())),
        Value::Vec2(_) | Value::Vec3(_) | Value::Vec4(_) => {
            out.extend(value.as_components().unwrap_or_default().iter().copied().map(WireArg::Float32));
        }
        Value::Tuple(t) => {
            for elem in t {
                encode_into(elem, out);
            }
        }
    }
}

/// Encode a domain's bounds as `[min, max]`.
///
/// Only domains with both bounds are encoded. Array domains send their first
/// component as a float; string, impulse and reference domains send nothing.
pub fn encode_domain(domain: &Domain) -> SmallVec<[WireArg; 2]> {
    let (Some(min), Some(max)) = (domain.min(), domain.max()) else {
        return SmallVec::new();
    };
    match domain {
        Domain::Bool(_) | Domain::Int(_) | Domain::Float(_) | Domain::Char(_) => {
            encode(&min).into_iter().chain(encode(&max)).collect()
        }
        Domain::Vec2(_) | Domain::Vec3(_) | Domain::Vec4(_) | Domain::Tuple(_) | Domain::Generic(_) => {
            match (min.to_f32(), max.to_f32()) {
                (Some(lo), Some(hi)) => SmallVec::from_buf([WireArg::Float32(lo), WireArg::Float32(hi)]),
                _ => SmallVec::new(),
            }
        }
        Domain::Impulse | Domain::String(_) | Domain::Destination | Domain::Behavior => SmallVec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(&Value::Float(0.0), &[WireArg::Int32(3)]), Some(Value::Float(3.0)));
        assert_eq!(decode(&Value::Int(0), &[WireArg::Float32(2.9)]), Some(Value::Int(2)));
        assert_eq!(decode(&Value::Bool(false), &[WireArg::True]), Some(Value::Bool(true)));
        assert_eq!(decode(&Value::Char('a'), &[WireArg::False]), Some(Value::Char('F')));
        assert_eq!(decode(&Value::String(String::new()), &[WireArg::True]), Some(Value::from("true")));
        assert_eq!(decode(&Value::String(String::new()), &[WireArg::Float32(0.5)]), Some(Value::from("0.5")));
    }

    #[test]
    fn test_decode_unparseable_keeps_current() {
        let cur = Value::Int(7);
        assert_eq!(decode(&cur, &[WireArg::String("nope".into())]), Some(Value::Int(7)));
        assert_eq!(decode(&cur, &[WireArg::String("12".into())]), Some(Value::Int(12)));
    }

    #[test]
    fn test_decode_zero_args_returns_current() {
        let cur = Value::Vec2([1.0, 2.0]);
        assert_eq!(decode(&cur, &[]), Some(cur.clone()));
    }

    #[test]
    fn test_decode_vec_arity() {
        let cur = Value::Vec3([0.0; 3]);
        let args = [WireArg::Float32(1.0), WireArg::Int32(2), WireArg::Float64(3.0)];
        assert_eq!(decode(&cur, &args), Some(Value::Vec3([1.0, 2.0, 3.0])));
        assert_eq!(decode(&cur, &args[..2]), None);
    }

    #[test]
    fn test_decode_tuple_uses_natural_types() {
        let cur = Value::Tuple(vec![]);
        let args = [WireArg::Int32(1), WireArg::Float32(2.5), WireArg::Symbol("x".into()), WireArg::True];
        assert_eq!(
            decode(&cur, &args),
            Some(Value::Tuple(vec![Value::Int(1), Value::Float(2.5), Value::from("x"), Value::Bool(true)]))
        );
    }

    #[test]
    fn test_decode_tuple_follows_current_elements() {
        let cur = Value::Tuple(vec![Value::Bool(false), Value::Char('a'), Value::Vec2([0.0; 2]), Value::from("s")]);
        let v = Value::Tuple(vec![Value::Bool(true), Value::Char('A'), Value::Vec2([2.0, 3.0]), Value::from("t")]);
        assert_eq!(decode(&cur, &encode(&v)), Some(v));

        let nested = Value::Tuple(vec![Value::Int(1), Value::Tuple(vec![Value::Char('x'), Value::Impulse])]);
        assert_eq!(decode(&nested, &encode(&nested)), Some(nested.clone()));

        // one argument short: natural types
        let short = [WireArg::Int32(1), WireArg::Int32(65)];
        assert_eq!(decode(&cur, &short), Some(Value::Tuple(vec![Value::Int(1), Value::Int(65)])));
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(&Value::Bool(true)).as_slice(), &[WireArg::Int32(1)]);
        assert_eq!(encode(&Value::Char('A')).as_slice(), &[WireArg::Int32(65)]);
        assert!(encode(&Value::Impulse).is_empty());
        assert_eq!(
            encode(&Value::Tuple(vec![Value::Int(1), Value::Vec2([2.0, 3.0])])).as_slice(),
            &[WireArg::Int32(1), WireArg::Float32(2.0), WireArg::Float32(3.0)]
        );
        assert_eq!(tags(&encode(&Value::Vec3([0.0; 3]))), "fff");
    }

    #[test]
    fn test_encode_domain() {
        assert_eq!(encode_domain(&Domain::int(0, 10)).as_slice(), &[WireArg::Int32(0), WireArg::Int32(10)]);
        let vec = Domain::make(&Value::Vec2([1.0, 2.0]), &Value::Vec2([3.0, 4.0]));
        assert_eq!(encode_domain(&vec).as_slice(), &[WireArg::Float32(1.0), WireArg::Float32(3.0)]);
        let mut half = Domain::for_type(ValueType::Float);
        half.set_min(Some(&Value::Float(0.0)));
        assert!(encode_domain(&half).is_empty());
        let strings = Domain::from_values(ValueType::String, &[Value::from("a")]);
        assert!(encode_domain(&strings).is_empty());
    }
}
