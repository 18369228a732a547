//! Piecewise writes into tuples and vecs.
//!
//! `Impulse` doubles as the empty placeholder when a tuple has to grow to
//! reach an index: placeholders are overwritten by the next write, and an
//! impulse written into an occupied slot leaves it untouched.

use super::value::Value;

/// Largest tuple an indexed write may grow.
pub const MAX_TUPLE_LEN: usize = 4096;

/// Merge `src` into `dest` in place.
pub fn merge_value(dest: &mut Value, src: &Value) {
    if matches!(dest, Value::Impulse) {
        *dest = src.clone();
        return;
    }
    match (dest, src) {
        (_, Value::Impulse) => {}
        (Value::Tuple(d), Value::Tuple(s)) => merge_tuple(d, s),
        (Value::Tuple(d), s) => set_first_value(d, s),
        (d, Value::Tuple(s)) => {
            let merged = match s.first() {
                None => Value::Tuple(vec![d.clone()]),
                Some(Value::Impulse) => {
                    let mut t = s.clone();
                    t[0] = d.clone();
                    Value::Tuple(t)
                }
                Some(_) => Value::Tuple(s.clone()),
            };
            *d = merged;
        }
        (d, s) => *d = s.clone(),
    }
}

/// Merge two tuples element by element, growing `dest` as needed.
pub fn merge_tuple(dest: &mut Vec<Value>, src: &[Value]) {
    if dest.len() < src.len() {
        dest.resize(src.len(), Value::Impulse);
    }
    for (d, s) in dest.iter_mut().zip(src) {
        merge_value(d, s);
    }
}

/// Write `value` into the first slot of `tuple`, creating it if empty.
pub fn set_first_value(tuple: &mut Vec<Value>, value: &Value) {
    match tuple.first_mut() {
        Some(first) => merge_value(first, value),
        None => tuple.push(value.clone()),
    }
}

/// Write `value` at the nested position `index`, growing intermediate
/// tuples and promoting scalars on the way to one-element tuples.
///
/// Returns `false` without writing when a position would grow a tuple past
/// [`MAX_TUPLE_LEN`]; intermediate levels may already have grown.
pub fn insert_at(tuple: &mut Vec<Value>, value: &Value, index: &[usize]) -> bool {
    let Some((&pos, rest)) = index.split_first() else {
        return true;
    };
    let Some(len) = pos.checked_add(1).filter(|len| *len <= MAX_TUPLE_LEN) else {
        return false;
    };
    if tuple.len() < len {
        tuple.resize(len, Value::Impulse);
    }
    let slot = &mut tuple[pos];
    if rest.is_empty() {
        merge_value(slot, value);
        return true;
    }
    if !matches!(slot, Value::Tuple(_)) {
        let prev = std::mem::replace(slot, Value::Impulse);
        *slot = Value::Tuple(vec![prev]);
    }
    match slot {
        Value::Tuple(sub) => insert_at(sub, value, rest),
        _ => false,
    }
}

/// Read the element at `index`. An empty index is the whole value.
pub fn get_at(value: &Value, index: &[usize]) -> Option<Value> {
    let Some((&pos, rest)) = index.split_first() else {
        return Some(value.clone());
    };
    match value {
        Value::Tuple(t) => get_at(t.get(pos)?, rest),
        Value::Vec2(_) | Value::Vec3(_) | Value::Vec4(_) if rest.is_empty() => {
            value.as_components()?.get(pos).copied().map(Value::Float)
        }
        _ => None,
    }
}

/// The value that results from writing `value` at `index` of `current`.
///
/// Vecs accept a single numeric component index. Scalars only accept
/// index `[0]`, which replaces them outright.
pub fn write_at(current: &Value, value: &Value, index: &[usize]) -> Option<Value> {
    if index.is_empty() {
        return Some(value.clone());
    }
    match current {
        Value::Tuple(t) => {
            let mut out = t.clone();
            insert_at(&mut out, value, index).then_some(Value::Tuple(out))
        }
        Value::Vec2(v) => set_component(*v, value, index).map(Value::Vec2),
        Value::Vec3(v) => set_component(*v, value, index).map(Value::Vec3),
        Value::Vec4(v) => set_component(*v, value, index).map(Value::Vec4),
        _ if index == [0] => Some(value.clone()),
        _ => None,
    }
}

fn set_component<const N: usize>(mut v: [f32; N], value: &Value, index: &[usize]) -> Option<[f32; N]> {
    let [pos] = index else {
        return None;
    };
    *v.get_mut(*pos)? = value.to_f32()?;
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ints(v: &[i32]) -> Vec<Value> {
        v.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn test_insert_grows_with_placeholders() {
        let mut t = ints(&[1]);
        insert_at(&mut t, &Value::Int(9), &[3]);
        assert_eq!(t, vec![Value::Int(1), Value::Impulse, Value::Impulse, Value::Int(9)]);
    }

    #[test]
    fn test_insert_nested_promotes_scalar() {
        let mut t = ints(&[1, 2]);
        insert_at(&mut t, &Value::from("x"), &[1, 1]);
        assert_eq!(
            t,
            vec![Value::Int(1), Value::Tuple(vec![Value::Int(2), Value::from("x")])]
        );
        assert_eq!(get_at(&Value::Tuple(t), &[1, 1]), Some(Value::from("x")));
    }

    #[test]
    fn test_insert_refuses_oversized_index() {
        let mut t = ints(&[1]);
        assert!(!insert_at(&mut t, &Value::Int(9), &[usize::MAX]));
        assert!(!insert_at(&mut t, &Value::Int(9), &[MAX_TUPLE_LEN]));
        assert_eq!(t, ints(&[1]));
        assert!(insert_at(&mut t, &Value::Int(9), &[MAX_TUPLE_LEN - 1]));
        assert_eq!(t.len(), MAX_TUPLE_LEN);
        assert_eq!(write_at(&Value::Tuple(ints(&[1])), &Value::Int(2), &[0, usize::MAX]), None);
    }

    #[test]
    fn test_merge_tuple_keeps_unwritten_slots() {
        let mut dest = ints(&[1, 2, 3]);
        merge_tuple(&mut dest, &[Value::Impulse, Value::Int(20)]);
        assert_eq!(dest, ints(&[1, 20, 3]));
    }

    #[test]
    fn test_merge_scalar_into_placeholder_tuple() {
        let mut dest = Value::Int(5);
        merge_value(&mut dest, &Value::Tuple(vec![Value::Impulse, Value::Int(6)]));
        assert_eq!(dest, Value::Tuple(ints(&[5, 6])));
    }

    #[test]
    fn test_write_at_vec_component() {
        let cur = Value::Vec3([1.0, 2.0, 3.0]);
        assert_eq!(write_at(&cur, &Value::Int(7), &[2]), Some(Value::Vec3([1.0, 2.0, 7.0])));
        assert_eq!(write_at(&cur, &Value::Int(7), &[3]), None);
        assert_eq!(write_at(&cur, &Value::Int(7), &[0, 1]), None);
    }

    #[test]
    fn test_write_at_scalar() {
        assert_eq!(write_at(&Value::Int(1), &Value::Int(2), &[0]), Some(Value::Int(2)));
        assert_eq!(write_at(&Value::Int(1), &Value::Int(2), &[1]), None);
    }

    #[test]
    fn test_get_at() {
        let v = Value::Vec2([4.0, 5.0]);
        assert_eq!(get_at(&v, &[1]), Some(Value::Float(5.0)));
        assert_eq!(get_at(&v, &[]), Some(v.clone()));
        assert_eq!(get_at(&Value::Int(1), &[0]), None);
    }
}
