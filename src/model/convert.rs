//! Shape coercion between value tags.
//!
//! Coercion is total over the valid tag pairs: a failed numeric parse keeps
//! the prior value instead of failing. Only `Destination` and `Behavior` are
//! incompatible with every other tag; those pairs report `None`.

use super::merge;
use super::value::{Value, ValueType};

// ============================================================================
// Scalar views
// ============================================================================

impl Value {
    /// Numeric view as f32. Arrays yield their first element.
    pub fn to_f32(&self) -> Option<f32> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f32),
            Value::Float(f) => Some(*f),
            Value::Char(c) => Some(u32::from(*c) as f32),
            Value::String(s) => s.trim().parse().ok(),
            Value::Vec2(v) => Some(v[0]),
            Value::Vec3(v) => Some(v[0]),
            Value::Vec4(v) => Some(v[0]),
            Value::Tuple(t) => t.first().and_then(Value::to_f32),
            Value::Impulse | Value::Destination(_) | Value::Behavior(_) => None,
        }
    }

    /// Numeric view as i32. Floats truncate toward zero and saturate.
    pub fn to_i32(&self) -> Option<i32> {
        match self {
            Value::Bool(b) => Some(i32::from(*b)),
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i32),
            Value::Char(c) => i32::try_from(u32::from(*c)).ok(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Vec2(v) => Some(v[0] as i32),
            Value::Vec3(v) => Some(v[0] as i32),
            Value::Vec4(v) => Some(v[0] as i32),
            Value::Tuple(t) => t.first().and_then(Value::to_i32),
            Value::Impulse | Value::Destination(_) | Value::Behavior(_) => None,
        }
    }

    /// Truth view. Strings accept `true`, `false`, `1` and `0`.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::Char(c) => Some(*c != '\0'),
            Value::String(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Vec2(v) => Some(v[0] != 0.0),
            Value::Vec3(v) => Some(v[0] != 0.0),
            Value::Vec4(v) => Some(v[0] != 0.0),
            Value::Tuple(t) => t.first().and_then(Value::to_bool),
            Value::Impulse | Value::Destination(_) | Value::Behavior(_) => None,
        }
    }

    /// Character view: numbers are code points, strings give their first char.
    pub fn to_char(&self) -> Option<char> {
        match self {
            Value::Bool(b) => Some(if *b { '\u{1}' } else { '\0' }),
            Value::Int(i) => u32::try_from(*i).ok().and_then(char::from_u32),
            Value::Float(f) if *f >= 0.0 => char::from_u32(*f as u32),
            Value::Float(_) => None,
            Value::Char(c) => Some(*c),
            Value::String(s) => s.chars().next(),
            Value::Vec2(v) => Value::Float(v[0]).to_char(),
            Value::Vec3(v) => Value::Float(v[0]).to_char(),
            Value::Vec4(v) => Value::Float(v[0]).to_char(),
            Value::Tuple(t) => t.first().and_then(Value::to_char),
            Value::Impulse | Value::Destination(_) | Value::Behavior(_) => None,
        }
    }

    /// Textual rendering used when coercing into a `String` slot.
    fn to_text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Char(c) => Some(c.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Vec2(v) => Some(v[0].to_string()),
            Value::Vec3(v) => Some(v[0].to_string()),
            Value::Vec4(v) => Some(v[0].to_string()),
            Value::Tuple(t) => t.first().and_then(Value::to_text),
            Value::Impulse | Value::Destination(_) | Value::Behavior(_) => None,
        }
    }
}

// ============================================================================
// Coercion into a prior value's shape
// ============================================================================

impl Value {
    /// Coerce `self` into the shape of `prior`.
    ///
    /// Slots `self` cannot supply keep `prior`'s content, so an impulse
    /// re-commits the prior value and a short vec updates only its leading
    /// components. Returns `None` for incompatible tags.
    pub fn coerce_into(&self, prior: &Value) -> Option<Value> {
        if matches!(self, Value::Destination(_) | Value::Behavior(_)) {
            return (self.shape() == prior.shape()).then(|| self.clone());
        }
        match prior {
            Value::Impulse => Some(Value::Impulse),
            Value::Bool(_) => self.coerce_scalar(prior, |v| v.to_bool().map(Value::Bool)),
            Value::Int(_) => self.coerce_scalar(prior, |v| v.to_i32().map(Value::Int)),
            Value::Float(_) => self.coerce_scalar(prior, |v| v.to_f32().map(Value::Float)),
            Value::Char(_) => self.coerce_scalar(prior, |v| v.to_char().map(Value::Char)),
            Value::String(_) => self.coerce_scalar(prior, |v| v.to_text().map(Value::String)),
            Value::Vec2(p) => Some(Value::Vec2(self.coerce_components(*p))),
            Value::Vec3(p) => Some(Value::Vec3(self.coerce_components(*p))),
            Value::Vec4(p) => Some(Value::Vec4(self.coerce_components(*p))),
            Value::Tuple(p) => Some(self.coerce_tuple(p)),
            Value::Destination(_) | Value::Behavior(_) => None,
        }
    }

    /// Coerce into the zero value of `ty`.
    pub fn coerce_to(&self, ty: ValueType) -> Option<Value> {
        if self.shape() == ty {
            return Some(self.clone());
        }
        let prior = ty.default_value()?;
        self.coerce_into(&prior)
    }

    fn coerce_scalar(&self, prior: &Value, extract: impl Fn(&Value) -> Option<Value>) -> Option<Value> {
        match self {
            Value::Impulse => Some(prior.clone()),
            Value::Tuple(t) => match t.first() {
                Some(first) => first.coerce_into(prior),
                None => Some(prior.clone()),
            },
            _ => Some(extract(self).unwrap_or_else(|| prior.clone())),
        }
    }

    fn coerce_components<const N: usize>(&self, prior: [f32; N]) -> [f32; N] {
        let mut out = prior;
        match self {
            Value::Vec2(v) => copy_leading(&mut out, v),
            Value::Vec3(v) => copy_leading(&mut out, v),
            Value::Vec4(v) => copy_leading(&mut out, v),
            Value::Tuple(t) => {
                for (slot, elem) in out.iter_mut().zip(t) {
                    if let Some(f) = elem.to_f32() {
                        *slot = f;
                    }
                }
            }
            Value::Impulse => {}
            scalar => {
                if let Some(f) = scalar.to_f32() {
                    out[0] = f;
                }
            }
        }
        out
    }

    fn coerce_tuple(&self, prior: &[Value]) -> Value {
        match self {
            Value::Impulse => Value::Tuple(prior.to_vec()),
            Value::Tuple(t) => Value::Tuple(t.clone()),
            Value::Vec2(v) => Value::Tuple(v.iter().copied().map(Value::Float).collect()),
            Value::Vec3(v) => Value::Tuple(v.iter().copied().map(Value::Float).collect()),
            Value::Vec4(v) => Value::Tuple(v.iter().copied().map(Value::Float).collect()),
            scalar => {
                let mut out = prior.to_vec();
                merge::set_first_value(&mut out, scalar);
                Value::Tuple(out)
            }
        }
    }
}

fn copy_leading(dst: &mut [f32], src: &[f32]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::{Behavior, Destination};
    use crate::net::NodeId;

    #[test]
    fn test_numeric_casts() {
        assert_eq!(Value::Float(3.7).coerce_to(ValueType::Int), Some(Value::Int(3)));
        assert_eq!(Value::Int(2).coerce_to(ValueType::Float), Some(Value::Float(2.0)));
        assert_eq!(Value::Int(0).coerce_to(ValueType::Bool), Some(Value::Bool(false)));
        assert_eq!(Value::Int(65).coerce_to(ValueType::Char), Some(Value::Char('A')));
        assert_eq!(Value::Bool(true).coerce_to(ValueType::Float), Some(Value::Float(1.0)));
    }

    #[test]
    fn test_string_parse_keeps_prior_on_failure() {
        assert_eq!(Value::from("12").coerce_into(&Value::Int(5)), Some(Value::Int(12)));
        assert_eq!(Value::from("abc").coerce_into(&Value::Int(5)), Some(Value::Int(5)));
        assert_eq!(Value::from("true").coerce_into(&Value::Bool(false)), Some(Value::Bool(true)));
        assert_eq!(Value::from(" 2.5 ").coerce_into(&Value::Float(0.0)), Some(Value::Float(2.5)));
    }

    #[test]
    fn test_invalid_code_point_keeps_prior() {
        assert_eq!(Value::Int(-1).coerce_into(&Value::Char('x')), Some(Value::Char('x')));
        assert_eq!(Value::Int(0xD800).coerce_into(&Value::Char('x')), Some(Value::Char('x')));
    }

    #[test]
    fn test_to_string_target() {
        assert_eq!(Value::Int(7).coerce_to(ValueType::String), Some(Value::from("7")));
        assert_eq!(Value::Bool(false).coerce_to(ValueType::String), Some(Value::from("false")));
        assert_eq!(Value::Float(0.5).coerce_to(ValueType::String), Some(Value::from("0.5")));
    }

    #[test]
    fn test_impulse_input_keeps_prior() {
        assert_eq!(Value::Impulse.coerce_into(&Value::Float(2.0)), Some(Value::Float(2.0)));
        assert_eq!(Value::Impulse.coerce_into(&Value::Vec2([1.0, 2.0])), Some(Value::Vec2([1.0, 2.0])));
        assert_eq!(Value::Float(9.0).coerce_into(&Value::Impulse), Some(Value::Impulse));
    }

    #[test]
    fn test_scalar_into_vec_fills_first_component() {
        assert_eq!(
            Value::Float(9.0).coerce_into(&Value::Vec3([1.0, 2.0, 3.0])),
            Some(Value::Vec3([9.0, 2.0, 3.0]))
        );
    }

    #[test]
    fn test_vec_resize_keeps_trailing_prior() {
        assert_eq!(
            Value::Vec2([5.0, 6.0]).coerce_into(&Value::Vec4([1.0, 2.0, 3.0, 4.0])),
            Some(Value::Vec4([5.0, 6.0, 3.0, 4.0]))
        );
        assert_eq!(
            Value::Vec4([5.0, 6.0, 7.0, 8.0]).coerce_into(&Value::Vec2([0.0, 0.0])),
            Some(Value::Vec2([5.0, 6.0]))
        );
    }

    #[test]
    fn test_tuple_into_vec() {
        let t = Value::Tuple(vec![Value::Int(1), Value::from("x"), Value::Float(3.0)]);
        assert_eq!(
            t.coerce_into(&Value::Vec3([0.0, 7.0, 0.0])),
            Some(Value::Vec3([1.0, 7.0, 3.0]))
        );
    }

    #[test]
    fn test_vec_into_tuple_and_back_to_scalar() {
        assert_eq!(
            Value::Vec2([1.0, 2.0]).coerce_to(ValueType::Tuple),
            Some(Value::Tuple(vec![Value::Float(1.0), Value::Float(2.0)]))
        );
        let t = Value::Tuple(vec![Value::Int(4), Value::Int(5)]);
        assert_eq!(t.coerce_to(ValueType::Int), Some(Value::Int(4)));
        assert_eq!(Value::Tuple(vec![]).coerce_into(&Value::Int(3)), Some(Value::Int(3)));
    }

    #[test]
    fn test_scalar_into_tuple_replaces_first() {
        let prior = Value::Tuple(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            Value::Float(9.0).coerce_into(&prior),
            Some(Value::Tuple(vec![Value::Float(9.0), Value::Int(2)]))
        );
    }

    #[test]
    fn test_destination_and_behavior_are_incompatible() {
        let dest = Value::Destination(Destination::new(NodeId(3)));
        assert_eq!(dest.coerce_to(ValueType::Float), None);
        assert_eq!(Value::Float(1.0).coerce_to(ValueType::Destination), None);
        assert_eq!(dest.coerce_into(&dest), Some(dest.clone()));

        #[derive(Debug)]
        struct Flat;
        let b = Value::Behavior(Behavior::new(Flat));
        assert!(b.coerce_to(ValueType::Int).is_none());
        assert!(matches!(b.coerce_to(ValueType::Behavior), Some(Value::Behavior(_))));
    }
}
