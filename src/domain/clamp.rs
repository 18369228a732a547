//! Scalar bounding arithmetic.

use super::BoundingMode;

/// A scalar that can be clipped, wrapped and folded into a range.
pub trait Bounded: Copy + PartialOrd {
    fn to_f32(self) -> f32;

    /// Map into `[min, max)` periodically. A degenerate range yields `min`.
    fn wrap(self, min: Self, max: Self) -> Self;

    /// Reflect back and forth into `[min, max]`. A degenerate range yields `min`.
    fn fold(self, min: Self, max: Self) -> Self;
}

pub fn clamp<T: PartialOrd>(v: T, min: T, max: T) -> T {
    if v < min {
        min
    } else if v > max {
        max
    } else {
        v
    }
}

pub fn clamp_min<T: PartialOrd>(v: T, min: T) -> T {
    if v < min { min } else { v }
}

pub fn clamp_max<T: PartialOrd>(v: T, max: T) -> T {
    if v > max { max } else { v }
}

/// Apply `mode` with whichever bounds are present.
///
/// With a single bound only the clamping modes act; wrap and fold need
/// both ends and leave the value alone.
pub fn bound<T: Bounded>(mode: BoundingMode, v: T, min: Option<T>, max: Option<T>) -> T {
    match (min, max) {
        (Some(lo), Some(hi)) => match mode {
            BoundingMode::Free => v,
            BoundingMode::Clip => clamp(v, lo, hi),
            BoundingMode::Low => clamp_min(v, lo),
            BoundingMode::High => clamp_max(v, hi),
            BoundingMode::Wrap => v.wrap(lo, hi),
            BoundingMode::Fold => v.fold(lo, hi),
        },
        (Some(lo), None) => match mode {
            BoundingMode::Clip | BoundingMode::Low => clamp_min(v, lo),
            _ => v,
        },
        (None, Some(hi)) => match mode {
            BoundingMode::Clip | BoundingMode::High => clamp_max(v, hi),
            _ => v,
        },
        (None, None) => v,
    }
}

// ============================================================================
// Periodic arithmetic
// ============================================================================

fn wrap_f64(v: f64, min: f64, max: f64) -> f64 {
    if !(max > min) {
        return min;
    }
    let range = max - min;
    let off = (v - min).rem_euclid(range);
    if off >= range { min } else { min + off }
}

fn fold_f64(v: f64, min: f64, max: f64) -> f64 {
    if v >= min && v <= max {
        return v;
    }
    if !(max > min) {
        return min;
    }
    let range = max - min;
    let off = (v - min).rem_euclid(2.0 * range);
    let folded = if off <= range { off } else { 2.0 * range - off };
    clamp(min + folded, min, max)
}

fn wrap_i64(v: i64, min: i64, max: i64) -> i64 {
    if max <= min {
        return min;
    }
    min + (v - min).rem_euclid(max - min)
}

fn fold_i64(v: i64, min: i64, max: i64) -> i64 {
    if v >= min && v <= max {
        return v;
    }
    if max <= min {
        return min;
    }
    let range = max - min;
    let off = (v - min).rem_euclid(2 * range);
    min + if off <= range { off } else { 2 * range - off }
}

impl Bounded for f32 {
    fn to_f32(self) -> f32 {
        self
    }

    fn wrap(self, min: f32, max: f32) -> f32 {
        let w = wrap_f64(f64::from(self), f64::from(min), f64::from(max)) as f32;
        // rounding back to f32 can land exactly on the open end
        if w >= max && max > min { min } else { w }
    }

    fn fold(self, min: f32, max: f32) -> f32 {
        clamp(fold_f64(f64::from(self), f64::from(min), f64::from(max)) as f32, min, max)
    }
}

impl Bounded for i32 {
    fn to_f32(self) -> f32 {
        self as f32
    }

    fn wrap(self, min: i32, max: i32) -> i32 {
        wrap_i64(i64::from(self), i64::from(min), i64::from(max)) as i32
    }

    fn fold(self, min: i32, max: i32) -> i32 {
        fold_i64(i64::from(self), i64::from(min), i64::from(max)) as i32
    }
}

impl Bounded for char {
    fn to_f32(self) -> f32 {
        u32::from(self) as f32
    }

    fn wrap(self, min: char, max: char) -> char {
        let w = wrap_i64(i64::from(u32::from(self)), i64::from(u32::from(min)), i64::from(u32::from(max)));
        u32::try_from(w).ok().and_then(char::from_u32).unwrap_or(min)
    }

    fn fold(self, min: char, max: char) -> char {
        let f = fold_i64(i64::from(u32::from(self)), i64::from(u32::from(min)), i64::from(u32::from(max)));
        u32::try_from(f).ok().and_then(char::from_u32).unwrap_or(min)
    }
}

impl Bounded for bool {
    fn to_f32(self) -> f32 {
        if self { 1.0 } else { 0.0 }
    }

    fn wrap(self, min: bool, max: bool) -> bool {
        wrap_i64(i64::from(self), i64::from(min), i64::from(max)) != 0
    }

    fn fold(self, min: bool, max: bool) -> bool {
        fold_i64(i64::from(self), i64::from(min), i64::from(max)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_examples() {
        assert_eq!(12.0f32.wrap(0.0, 10.0), 2.0);
        assert_eq!((-1.0f32).wrap(0.0, 10.0), 9.0);
        assert_eq!(10.0f32.wrap(0.0, 10.0), 0.0);
        assert_eq!(12i32.wrap(0, 10), 2);
        assert_eq!((-1i32).wrap(0, 10), 9);
        assert_eq!(5i32.wrap(3, 3), 3);
    }

    #[test]
    fn test_fold_examples() {
        assert_eq!(12.0f32.fold(0.0, 10.0), 8.0);
        assert_eq!((-3.0f32).fold(0.0, 10.0), 3.0);
        assert_eq!(25.0f32.fold(0.0, 10.0), 5.0);
        assert_eq!(12i32.fold(0, 10), 8);
        assert_eq!(7i32.fold(4, 4), 4);
    }

    #[test]
    fn test_single_bound_modes() {
        assert_eq!(bound(BoundingMode::Clip, 5, Some(8), None), 8);
        assert_eq!(bound(BoundingMode::High, 5, Some(8), None), 5);
        assert_eq!(bound(BoundingMode::Wrap, 50, None, Some(8)), 50);
        assert_eq!(bound(BoundingMode::High, 50, None, Some(8)), 8);
    }

    #[test]
    fn test_low_and_high_only_touch_one_side() {
        assert_eq!(bound(BoundingMode::Low, 50, Some(0), Some(10)), 50);
        assert_eq!(bound(BoundingMode::Low, -5, Some(0), Some(10)), 0);
        assert_eq!(bound(BoundingMode::High, -5, Some(0), Some(10)), -5);
        assert_eq!(bound(BoundingMode::High, 50, Some(0), Some(10)), 10);
    }

    proptest! {
        #[test]
        fn prop_wrap_lands_in_half_open_range(v in -1e6f32..1e6, lo in -1e3f32..1e3, span in 0.01f32..1e3) {
            let hi = lo + span;
            prop_assume!(hi > lo);
            let w = v.wrap(lo, hi);
            prop_assert!(w >= lo && w < hi, "{v} wrapped into [{lo}, {hi}) gave {w}");
        }

        #[test]
        fn prop_fold_lands_in_closed_range(v in -1e6f32..1e6, lo in -1e3f32..1e3, span in 0.01f32..1e3) {
            let hi = lo + span;
            let f = v.fold(lo, hi);
            prop_assert!(f >= lo && f <= hi, "{v} folded into [{lo}, {hi}] gave {f}");
        }

        #[test]
        fn prop_clip_lands_in_closed_range(v in any::<i32>(), lo in -1000i32..1000, span in 0i32..1000) {
            let hi = lo + span;
            let c = bound(BoundingMode::Clip, v, Some(lo), Some(hi));
            prop_assert!(c >= lo && c <= hi);
        }

        #[test]
        fn prop_int_wrap_in_range(v in any::<i32>(), lo in -1000i32..1000, span in 1i32..1000) {
            let hi = lo + span;
            let w = v.wrap(lo, hi);
            prop_assert!(w >= lo && w < hi);
        }
    }
}
