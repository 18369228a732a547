//! Color. Neutral unit: `argb`, every channel in `0..=1`.
//!
//! The `8` variants carry channels in `0..=255`. `hsv` carries hue,
//! saturation and value, all normalised to `0..=1`.

use super::{Dataspace, Repr, Unit, UnitDef, identity};
use crate::model::ValueType;

pub const ARGB: Unit = Unit::new(Dataspace::Color, 0);
pub const RGBA: Unit = Unit::new(Dataspace::Color, 1);
pub const RGB: Unit = Unit::new(Dataspace::Color, 2);
pub const BGR: Unit = Unit::new(Dataspace::Color, 3);
pub const ARGB8: Unit = Unit::new(Dataspace::Color, 4);
pub const RGBA8: Unit = Unit::new(Dataspace::Color, 5);
pub const HSV: Unit = Unit::new(Dataspace::Color, 6);
pub const CMY8: Unit = Unit::new(Dataspace::Color, 7);

const FULL: f64 = 255.0;

fn rgba_to([r, g, b, a]: Repr) -> Repr {
    [a, r, g, b]
}

fn rgba_from([a, r, g, b]: Repr) -> Repr {
    [r, g, b, a]
}

fn rgb_to([r, g, b, _]: Repr) -> Repr {
    [1.0, r, g, b]
}

fn rgb_from([_, r, g, b]: Repr) -> Repr {
    [r, g, b, 0.0]
}

fn bgr_to([b, g, r, _]: Repr) -> Repr {
    [1.0, r, g, b]
}

fn bgr_from([_, r, g, b]: Repr) -> Repr {
    [b, g, r, 0.0]
}

fn argb8_to(c: Repr) -> Repr {
    c.map(|v| v / FULL)
}

fn argb8_from(c: Repr) -> Repr {
    c.map(|v| v * FULL)
}

fn rgba8_to(c: Repr) -> Repr {
    rgba_to(c.map(|v| v / FULL))
}

fn rgba8_from(c: Repr) -> Repr {
    rgba_from(c).map(|v| v * FULL)
}

fn hsv_to([h, s, v, _]: Repr) -> Repr {
    if s <= 0.0 {
        return [1.0, v, v, v];
    }
    let h6 = h.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector as u8 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [1.0, r, g, b]
}

fn hsv_from([_, r, g, b]: Repr) -> Repr {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    let h = if delta <= 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    [h / 6.0, s, max, 0.0]
}

fn cmy8_to([c, m, y, _]: Repr) -> Repr {
    [1.0, 1.0 - c / FULL, 1.0 - m / FULL, 1.0 - y / FULL]
}

fn cmy8_from([_, r, g, b]: Repr) -> Repr {
    [(1.0 - r) * FULL, (1.0 - g) * FULL, (1.0 - b) * FULL, 0.0]
}

pub(super) static UNITS: [UnitDef; 8] = [
    UnitDef {
        name: "argb",
        aliases: &[],
        value_type: ValueType::Vec4,
        to_neutral: identity,
        from_neutral: identity,
    },
    UnitDef {
        name: "rgba",
        aliases: &[],
        value_type: ValueType::Vec4,
        to_neutral: rgba_to,
        from_neutral: rgba_from,
    },
    UnitDef {
        name: "rgb",
        aliases: &[],
        value_type: ValueType::Vec3,
        to_neutral: rgb_to,
        from_neutral: rgb_from,
    },
    UnitDef {
        name: "bgr",
        aliases: &[],
        value_type: ValueType::Vec3,
        to_neutral: bgr_to,
        from_neutral: bgr_from,
    },
    UnitDef {
        name: "argb8",
        aliases: &[],
        value_type: ValueType::Vec4,
        to_neutral: argb8_to,
        from_neutral: argb8_from,
    },
    UnitDef {
        name: "rgba8",
        aliases: &[],
        value_type: ValueType::Vec4,
        to_neutral: rgba8_to,
        from_neutral: rgba8_from,
    },
    UnitDef {
        name: "hsv",
        aliases: &[],
        value_type: ValueType::Vec3,
        to_neutral: hsv_to,
        from_neutral: hsv_from,
    },
    UnitDef {
        name: "cmy8",
        aliases: &[],
        value_type: ValueType::Vec3,
        to_neutral: cmy8_to,
        from_neutral: cmy8_from,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_channel_order() {
        assert_eq!(rgba_to([0.1, 0.2, 0.3, 0.4]), [0.4, 0.1, 0.2, 0.3]);
        assert_eq!(bgr_to([0.1, 0.2, 0.3, 0.0]), [1.0, 0.3, 0.2, 0.1]);
        assert_eq!(rgba8_from([1.0, 1.0, 0.0, 0.0]), [255.0, 0.0, 0.0, 255.0]);
    }

    #[test]
    fn test_hsv_primaries() {
        assert!(close(&hsv_to([0.0, 1.0, 1.0, 0.0]), &[1.0, 1.0, 0.0, 0.0]));
        assert!(close(&hsv_to([1.0 / 3.0, 1.0, 1.0, 0.0]), &[1.0, 0.0, 1.0, 0.0]));
        assert!(close(&hsv_to([2.0 / 3.0, 1.0, 1.0, 0.0]), &[1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_hsv_round_trip() {
        let hsv = [0.75, 0.5, 0.8, 0.0];
        assert!(close(&hsv_from(hsv_to(hsv)), &hsv));
    }

    #[test]
    fn test_cmy8() {
        assert!(close(&cmy8_to([255.0, 0.0, 0.0, 0.0]), &[1.0, 0.0, 1.0, 1.0]));
        assert!(close(&cmy8_from(cmy8_to([10.0, 20.0, 30.0, 0.0])), &[10.0, 20.0, 30.0]));
    }
}
