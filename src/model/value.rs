//! Universal parameter value: a closed tagged union.
//!
//! Every parameter in a device tree carries exactly one `Value`. Equality and
//! ordering are only defined between values of the same tag; comparing across
//! tags is always `false` / unordered and never fails.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::NodeId;

/// Path of positions into a tuple (or one level into a vec).
pub type DestinationIndex = SmallVec<[usize; 2]>;

/// Runtime parameter value.
///
/// - Trigger: `Impulse`
/// - Scalars: `Bool`, `Int` (i32), `Float` (f32), `Char`, `String`
/// - Fixed arrays: `Vec2`, `Vec3`, `Vec4` (f32 components, no allocation)
/// - Sequence: `Tuple` (heterogeneous, order significant)
/// - References: `Destination` (non-owning), `Behavior` (opaque curve handle)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Impulse,
    Bool(bool),
    Int(i32),
    Float(f32),
    Char(char),
    String(String),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Tuple(Vec<Value>),
    Destination(Destination),
    #[serde(skip)]
    Behavior(Behavior),
}

/// The tag of a [`Value`], used as the declared shape of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Impulse,
    Bool,
    Int,
    Float,
    Char,
    String,
    Vec2,
    Vec3,
    Vec4,
    Tuple,
    Destination,
    Behavior,
}

/// Reference to a node of a device, optionally narrowed to a sub-element.
///
/// The node is named by id, never owned: a destination outliving its node
/// simply fails to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub node: NodeId,
    #[serde(default)]
    pub index: DestinationIndex,
}

impl Destination {
    pub fn new(node: NodeId) -> Self {
        Self { node, index: DestinationIndex::new() }
    }

    pub fn with_index(node: NodeId, index: impl IntoIterator<Item = usize>) -> Self {
        Self { node, index: index.into_iter().collect() }
    }
}

/// Marker for anything that can sit behind a [`Behavior`].
///
/// Curve evaluation lives outside this crate; the handle is only stored,
/// cloned and carried around.
pub trait Curve: fmt::Debug + Send + Sync + 'static {}

impl<T: fmt::Debug + Send + Sync + 'static> Curve for T {}

/// Opaque handle to a time curve. Never equal to anything, itself included.
#[derive(Clone)]
pub struct Behavior(Arc<dyn Curve>);

impl Behavior {
    pub fn new(curve: impl Curve) -> Self {
        Self(Arc::new(curve))
    }

    pub fn curve(&self) -> &dyn Curve {
        self.0.as_ref()
    }

    /// Whether two handles point at the same curve instance.
    pub fn ptr_eq(&self, other: &Behavior) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Behavior({:?})", self.0)
    }
}

// ============================================================================
// Type checking
// ============================================================================

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Impulse => "impulse",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Char => "char",
            ValueType::String => "string",
            ValueType::Vec2 => "vec2f",
            ValueType::Vec3 => "vec3f",
            ValueType::Vec4 => "vec4f",
            ValueType::Tuple => "tuple",
            ValueType::Destination => "destination",
            ValueType::Behavior => "behavior",
        }
    }

    /// The zero value of this tag. Destinations and behaviors have none.
    pub fn default_value(self) -> Option<Value> {
        Some(match self {
            ValueType::Impulse => Value::Impulse,
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Char => Value::Char('\0'),
            ValueType::String => Value::String(String::new()),
            ValueType::Vec2 => Value::Vec2([0.0; 2]),
            ValueType::Vec3 => Value::Vec3([0.0; 3]),
            ValueType::Vec4 => Value::Vec4([0.0; 4]),
            ValueType::Tuple => Value::Tuple(Vec::new()),
            ValueType::Destination | ValueType::Behavior => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Bool | ValueType::Int | ValueType::Float | ValueType::Char)
    }

    pub fn is_array(self) -> bool {
        matches!(self, ValueType::Vec2 | ValueType::Vec3 | ValueType::Vec4 | ValueType::Tuple)
    }

    /// Component count of the fixed-size array tags.
    pub fn vec_len(self) -> Option<usize> {
        match self {
            ValueType::Vec2 => Some(2),
            ValueType::Vec3 => Some(3),
            ValueType::Vec4 => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// The tag of this value.
    pub fn shape(&self) -> ValueType {
        match self {
            Value::Impulse => ValueType::Impulse,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Char(_) => ValueType::Char,
            Value::String(_) => ValueType::String,
            Value::Vec2(_) => ValueType::Vec2,
            Value::Vec3(_) => ValueType::Vec3,
            Value::Vec4(_) => ValueType::Vec4,
            Value::Tuple(_) => ValueType::Tuple,
            Value::Destination(_) => ValueType::Destination,
            Value::Behavior(_) => ValueType::Behavior,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.shape().name()
    }

    pub fn is_impulse(&self) -> bool { matches!(self, Value::Impulse) }
    pub fn is_numeric(&self) -> bool { self.shape().is_numeric() }
    pub fn is_array(&self) -> bool { self.shape().is_array() }

    /// Exact extraction, no coercion.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Float components of a Vec2/3/4.
    pub fn as_components(&self) -> Option<&[f32]> {
        match self {
            Value::Vec2(v) => Some(v),
            Value::Vec3(v) => Some(v),
            Value::Vec4(v) => Some(v),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v) } }
impl From<f32> for Value { fn from(v: f32) -> Self { Value::Float(v) } }
impl From<char> for Value { fn from(v: char) -> Self { Value::Char(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<[f32; 2]> for Value { fn from(v: [f32; 2]) -> Self { Value::Vec2(v) } }
impl From<[f32; 3]> for Value { fn from(v: [f32; 3]) -> Self { Value::Vec3(v) } }
impl From<[f32; 4]> for Value { fn from(v: [f32; 4]) -> Self { Value::Vec4(v) } }
impl From<Destination> for Value { fn from(v: Destination) -> Self { Value::Destination(v) } }
impl From<Behavior> for Value { fn from(v: Behavior) -> Self { Value::Behavior(v) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::Tuple(v.into_iter().map(Into::into).collect()) }
}

// ============================================================================
// Equality & ordering (same tag only)
// ============================================================================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match self {
            Value::Impulse => matches!(other, Value::Impulse),
            Value::Bool(a) => matches!(other, Value::Bool(b) if a == b),
            Value::Int(a) => matches!(other, Value::Int(b) if a == b),
            Value::Float(a) => matches!(other, Value::Float(b) if a == b),
            Value::Char(a) => matches!(other, Value::Char(b) if a == b),
            Value::String(a) => matches!(other, Value::String(b) if a == b),
            Value::Vec2(a) => matches!(other, Value::Vec2(b) if a == b),
            Value::Vec3(a) => matches!(other, Value::Vec3(b) if a == b),
            Value::Vec4(a) => matches!(other, Value::Vec4(b) if a == b),
            Value::Tuple(a) => matches!(other, Value::Tuple(b) if a == b),
            Value::Destination(a) => matches!(other, Value::Destination(b) if a == b),
            Value::Behavior(_) => false,
        }
    }
}

impl Value {
    /// Ordering between two values of the same tag; `None` across tags.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match self {
            Value::Impulse => matches!(other, Value::Impulse).then_some(Ordering::Equal),
            Value::Bool(a) => match other { Value::Bool(b) => a.partial_cmp(b), _ => None },
            Value::Int(a) => match other { Value::Int(b) => a.partial_cmp(b), _ => None },
            Value::Float(a) => match other { Value::Float(b) => a.partial_cmp(b), _ => None },
            Value::Char(a) => match other { Value::Char(b) => a.partial_cmp(b), _ => None },
            Value::String(a) => match other { Value::String(b) => a.partial_cmp(b), _ => None },
            Value::Vec2(a) => match other { Value::Vec2(b) => a.partial_cmp(b), _ => None },
            Value::Vec3(a) => match other { Value::Vec3(b) => a.partial_cmp(b), _ => None },
            Value::Vec4(a) => match other { Value::Vec4(b) => a.partial_cmp(b), _ => None },
            Value::Tuple(a) => match other {
                Value::Tuple(b) => {
                    for (x, y) in a.iter().zip(b) {
                        match x.compare(y)? {
                            Ordering::Equal => continue,
                            ord => return Some(ord),
                        }
                    }
                    Some(a.len().cmp(&b.len()))
                }
                _ => None,
            },
            Value::Destination(a) => match other {
                Value::Destination(b) if a == b => Some(Ordering::Equal),
                _ => None,
            },
            Value::Behavior(_) => None,
        }
    }
}

// ============================================================================
// Display
// ============================================================================

fn write_components(f: &mut fmt::Formatter<'_>, comps: &[f32]) -> fmt::Result {
    write!(f, "[")?;
    for (i, c) in comps.iter().enumerate() {
        if i > 0 { write!(f, ", ")?; }
        write!(f, "{c}")?;
    }
    write!(f, "]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Impulse => write!(f, "impulse"),
            Value::Bool(b) => write!(f, "bool: {b}"),
            Value::Int(i) => write!(f, "int: {i}"),
            Value::Float(v) => write!(f, "float: {v}"),
            Value::Char(c) => write!(f, "char: '{c}'"),
            Value::String(s) => write!(f, "string: \"{}\"", s.replace('"', "\\\"")),
            Value::Vec2(v) => { write!(f, "vec2f: ")?; write_components(f, v) }
            Value::Vec3(v) => { write!(f, "vec3f: ")?; write_components(f, v) }
            Value::Vec4(v) => { write!(f, "vec4f: ")?; write_components(f, v) }
            Value::Tuple(t) => {
                write!(f, "tuple: [")?;
                for (i, v) in t.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Destination(d) => {
                write!(f, "destination: {}", d.node)?;
                if !d.index.is_empty() {
                    write!(f, "{:?}", d.index.as_slice())?;
                }
                Ok(())
            }
            Value::Behavior(_) => write!(f, "behavior"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ramp;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(1.5f32), Value::Float(1.5));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from([1.0f32, 2.0, 3.0]), Value::Vec3([1.0, 2.0, 3.0]));
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::Tuple(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_cross_tag_equality_is_false() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Vec2([1.0, 2.0]), Value::Tuple(vec![Value::Float(1.0), Value::Float(2.0)]));
        assert_eq!(Value::Int(1).compare(&Value::Float(2.0)), None);
    }

    #[test]
    fn test_behavior_never_equal() {
        let b = Behavior::new(Ramp);
        let v = Value::Behavior(b.clone());
        assert_ne!(v, v.clone());
        assert!(b.ptr_eq(&b.clone()));
        assert_eq!(v.compare(&v), None);
    }

    #[test]
    fn test_tuple_ordering() {
        let a = Value::from(vec![1, 2]);
        let b = Value::from(vec![1, 3]);
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(a.compare(&a), Some(Ordering::Equal));
        let mixed = Value::Tuple(vec![Value::Int(1), Value::Float(3.0)]);
        assert_eq!(a.compare(&mixed), None);
    }

    #[test]
    fn test_default_values() {
        assert_eq!(ValueType::Vec3.default_value(), Some(Value::Vec3([0.0; 3])));
        assert_eq!(ValueType::Destination.default_value(), None);
        assert_eq!(ValueType::Behavior.default_value(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(1.5).to_string(), "float: 1.5");
        assert_eq!(Value::Vec2([1.0, 2.5]).to_string(), "vec2f: [1, 2.5]");
        assert_eq!(
            Value::Tuple(vec![Value::Int(1), Value::from("a")]).to_string(),
            "tuple: [int: 1, string: \"a\"]"
        );
    }
}
