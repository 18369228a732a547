//! Time. Neutral unit: second.
//!
//! Frequency-like units (hertz, bpm, pitch, mel) describe a period; a zero
//! period or frequency converts to zero rather than infinity.

use super::{Dataspace, Repr, Unit, UnitDef, identity, ratio_from, ratio_to, reciprocal};
use crate::model::ValueType;

pub const SECOND: Unit = Unit::new(Dataspace::Time, 0);
pub const MILLISECOND: Unit = Unit::new(Dataspace::Time, 1);
pub const HERTZ: Unit = Unit::new(Dataspace::Time, 2);
pub const BPM: Unit = Unit::new(Dataspace::Time, 3);
pub const MIDI_PITCH: Unit = Unit::new(Dataspace::Time, 4);
pub const CENT: Unit = Unit::new(Dataspace::Time, 5);
pub const MEL: Unit = Unit::new(Dataspace::Time, 6);

const A4_HZ: f64 = 440.0;
const A4_MIDI: f64 = 69.0;

fn scalar(v: f64) -> Repr {
    [v, 0.0, 0.0, 0.0]
}

fn hertz_to(r: Repr) -> Repr {
    scalar(reciprocal(r[0]))
}

fn hertz_from(r: Repr) -> Repr {
    scalar(reciprocal(r[0]))
}

fn bpm_to(r: Repr) -> Repr {
    scalar(60.0 * reciprocal(r[0]))
}

fn bpm_from(r: Repr) -> Repr {
    scalar(60.0 * reciprocal(r[0]))
}

fn midi_to_hz(midi: f64) -> f64 {
    A4_HZ * 2f64.powf((midi - A4_MIDI) / 12.0)
}

fn hz_to_midi(hz: f64) -> f64 {
    if hz <= 0.0 { 0.0 } else { A4_MIDI + 12.0 * (hz / A4_HZ).log2() }
}

fn midi_pitch_to(r: Repr) -> Repr {
    scalar(reciprocal(midi_to_hz(r[0])))
}

fn midi_pitch_from(r: Repr) -> Repr {
    scalar(hz_to_midi(reciprocal(r[0])))
}

fn cent_to(r: Repr) -> Repr {
    midi_pitch_to(scalar(r[0] / 100.0))
}

fn cent_from(r: Repr) -> Repr {
    scalar(midi_pitch_from(r)[0] * 100.0)
}

fn mel_to(r: Repr) -> Repr {
    let hz = 700.0 * (10f64.powf(r[0] / 2595.0) - 1.0);
    scalar(reciprocal(hz))
}

fn mel_from(r: Repr) -> Repr {
    let hz = reciprocal(r[0]);
    scalar(2595.0 * (1.0 + hz / 700.0).log10())
}

pub(super) static UNITS: [UnitDef; 7] = [
    UnitDef {
        name: "second",
        aliases: &["s"],
        value_type: ValueType::Float,
        to_neutral: identity,
        from_neutral: identity,
    },
    UnitDef {
        name: "millisecond",
        aliases: &["ms"],
        value_type: ValueType::Float,
        to_neutral: ratio_to::<1, 1000>,
        from_neutral: ratio_from::<1, 1000>,
    },
    UnitDef {
        name: "hertz",
        aliases: &["Hz", "hz"],
        value_type: ValueType::Float,
        to_neutral: hertz_to,
        from_neutral: hertz_from,
    },
    UnitDef {
        name: "bpm",
        aliases: &[],
        value_type: ValueType::Float,
        to_neutral: bpm_to,
        from_neutral: bpm_from,
    },
    UnitDef {
        name: "midi_pitch",
        aliases: &["midinote"],
        value_type: ValueType::Float,
        to_neutral: midi_pitch_to,
        from_neutral: midi_pitch_from,
    },
    UnitDef {
        name: "cent",
        aliases: &[],
        value_type: ValueType::Float,
        to_neutral: cent_to,
        from_neutral: cent_from,
    },
    UnitDef {
        name: "mel",
        aliases: &[],
        value_type: ValueType::Float,
        to_neutral: mel_to,
        from_neutral: mel_from,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_period() {
        assert_eq!(hertz_to(scalar(4.0))[0], 0.25);
        assert_eq!(hertz_to(scalar(0.0))[0], 0.0);
        assert_eq!(bpm_to(scalar(120.0))[0], 0.5);
        assert_eq!(bpm_from(scalar(0.5))[0], 120.0);
    }

    #[test]
    fn test_midi_pitch() {
        let period = midi_pitch_to(scalar(69.0))[0];
        assert!((period - 1.0 / 440.0).abs() < 1e-12);
        assert!((midi_pitch_from(scalar(period))[0] - 69.0).abs() < 1e-9);
        assert!((cent_from(midi_pitch_to(scalar(60.0)))[0] - 6000.0).abs() < 1e-6);
    }

    #[test]
    fn test_mel_round_trip() {
        let mel = 1000.0;
        assert!((mel_from(mel_to(scalar(mel)))[0] - mel).abs() < 1e-6);
    }
}
