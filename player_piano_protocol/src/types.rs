// Core value types carried by the event stream.
//
// `Note` and `Pedal` are the two payload atoms every `MidiEvent` is built
// from. `Scale` and `Tonic` describe the musical context an event was
// generated in; the engine crate owns the interval tables, this crate only
// owns the names so that both sides of the wire agree on spelling.
// `WeatherReading` is what clients push to the relay and the engine consumes.
//
// Field names follow the browser client's camelCase convention
// (`midiNumber`, `weatherCode`), so the JSON produced here can be consumed
// without a translation layer.
//
// Constructors on `Note` and `Pedal` are the supported way to build values:
// they clamp into the legal ranges so that no consumer ever sees a velocity
// above 127, a zero duration, or a pedal value outside [0, 1].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sharp-spelled pitch-class names, indexed by pitch class (0 = C).
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Highest octave a `Note` may sit in. Octave 8 keeps every pitch class at
/// or below MIDI 119.
pub const MAX_OCTAVE: u8 = 8;

/// Lowest and highest MIDI numbers a note can carry: C0 and B8.
pub const MIDI_FLOOR: u8 = 12;
pub const MIDI_CEILING: u8 = 119;

/// Relay-assigned listener ID (one per TCP connection).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u32);

/// A single sounding note. Immutable once built; owned by the event that
/// carries it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Pitch-class name, e.g. `"C#"`.
    pub name: String,
    pub octave: u8,
    pub midi_number: u8,
    /// 0–127.
    pub velocity: u8,
    /// Milliseconds, always >= 1.
    pub duration: u32,
}

impl Note {
    /// Build a note from a pitch class and octave: `midi = pc + octave*12 + 12`.
    ///
    /// The pitch class is reduced mod 12, the octave is capped at
    /// [`MAX_OCTAVE`], velocity at 127 and duration is floored at 1 ms.
    pub fn from_pitch_class(pitch_class: u8, octave: u8, velocity: u8, duration_ms: u32) -> Self {
        let pc = pitch_class % 12;
        let octave = octave.min(MAX_OCTAVE);
        Self {
            name: PITCH_CLASS_NAMES[pc as usize].to_string(),
            octave,
            midi_number: pc + octave * 12 + 12,
            velocity: velocity.min(127),
            duration: duration_ms.max(1),
        }
    }

    /// Build a note from a raw MIDI number, deriving name and octave.
    /// MIDI numbers are clamped to C0..=B8, keeping the octave within
    /// [`MAX_OCTAVE`].
    pub fn from_midi(midi: u8, velocity: u8, duration_ms: u32) -> Self {
        let midi = midi.clamp(MIDI_FLOOR, MIDI_CEILING);
        Self {
            name: PITCH_CLASS_NAMES[(midi % 12) as usize].to_string(),
            octave: midi / 12 - 1,
            midi_number: midi,
            velocity: velocity.min(127),
            duration: duration_ms.max(1),
        }
    }

    pub fn pitch_class(&self) -> u8 {
        self.midi_number % 12
    }
}

/// Which pedal a `Pedal` event moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PedalKind {
    Sustain,
    Sostenuto,
    Soft,
}

impl PedalKind {
    pub const ALL: [PedalKind; 3] = [PedalKind::Sustain, PedalKind::Sostenuto, PedalKind::Soft];
}

/// A pedal position change. The receiver integrates these into a running
/// position per pedal kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pedal {
    #[serde(rename = "type")]
    pub kind: PedalKind,
    /// Depth in [0, 1]; 0 releases the pedal.
    pub value: f64,
}

impl Pedal {
    /// Clamp `value` into [0, 1]; NaN becomes 0 (release).
    pub fn new(kind: PedalKind, value: f64) -> Self {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        Self { kind, value }
    }

    pub fn release(kind: PedalKind) -> Self {
        Self { kind, value: 0.0 }
    }

    pub fn is_release(&self) -> bool {
        self.value == 0.0
    }
}

/// Scale names understood on the wire. The interval tables live in the
/// engine's `scale` module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scale {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    PentatonicMajor,
    PentatonicMinor,
    WholeTone,
    Chromatic,
    Diminished,
    Augmented,
    HarmonicMinor,
    DoubleHarmonic,
    Hungarian,
    Byzantine,
    Oriental,
}

impl Scale {
    pub const ALL: [Scale; 18] = [
        Scale::Major,
        Scale::Minor,
        Scale::Dorian,
        Scale::Phrygian,
        Scale::Lydian,
        Scale::Mixolydian,
        Scale::Locrian,
        Scale::PentatonicMajor,
        Scale::PentatonicMinor,
        Scale::WholeTone,
        Scale::Chromatic,
        Scale::Diminished,
        Scale::Augmented,
        Scale::HarmonicMinor,
        Scale::DoubleHarmonic,
        Scale::Hungarian,
        Scale::Byzantine,
        Scale::Oriental,
    ];

    /// Wire name, e.g. `"pentatonicMajor"`.
    pub fn name(self) -> &'static str {
        match self {
            Scale::Major => "major",
            Scale::Minor => "minor",
            Scale::Dorian => "dorian",
            Scale::Phrygian => "phrygian",
            Scale::Lydian => "lydian",
            Scale::Mixolydian => "mixolydian",
            Scale::Locrian => "locrian",
            Scale::PentatonicMajor => "pentatonicMajor",
            Scale::PentatonicMinor => "pentatonicMinor",
            Scale::WholeTone => "wholeTone",
            Scale::Chromatic => "chromatic",
            Scale::Diminished => "diminished",
            Scale::Augmented => "augmented",
            Scale::HarmonicMinor => "harmonicMinor",
            Scale::DoubleHarmonic => "doubleHarmonic",
            Scale::Hungarian => "hungarian",
            Scale::Byzantine => "byzantine",
            Scale::Oriental => "oriental",
        }
    }

    /// Look up a scale by wire name (case-insensitive). Unknown names give
    /// `None`; callers treat that as a no-op.
    pub fn from_name(name: &str) -> Option<Scale> {
        Scale::ALL
            .iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The key an event was generated in: a pitch class, or `atonal` for styles
/// that deliberately ignore tonality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Tonic {
    Pitch(PitchClass),
    Atonal,
}

/// A pitch class in `0..12`. Only constructible through [`Tonic::pitch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PitchClass(u8);

impl PitchClass {
    pub fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized key name '{0}'")]
pub struct ParseTonicError(pub String);

impl Tonic {
    /// A pitch-class tonic, reduced mod 12.
    pub fn pitch(pc: u8) -> Self {
        Tonic::Pitch(PitchClass(pc % 12))
    }

    /// The pitch class, or `None` when atonal.
    pub fn pitch_class(self) -> Option<u8> {
        match self {
            Tonic::Pitch(pc) => Some(pc.get()),
            Tonic::Atonal => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tonic::Pitch(pc) => PITCH_CLASS_NAMES[pc.get() as usize],
            Tonic::Atonal => "atonal",
        }
    }
}

impl From<Tonic> for String {
    fn from(tonic: Tonic) -> Self {
        tonic.name().to_string()
    }
}

impl TryFrom<String> for Tonic {
    type Error = ParseTonicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "atonal" {
            return Ok(Tonic::Atonal);
        }
        PITCH_CLASS_NAMES
            .iter()
            .position(|n| *n == value)
            .map(|pc| Tonic::pitch(pc as u8))
            .ok_or(ParseTonicError(value))
    }
}

impl fmt::Display for Tonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One weather observation, pushed by a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    /// Degrees Celsius.
    pub temperature: f64,
    /// WMO weather-condition code (0 = clear sky, 95 = thunderstorm, ...).
    pub weather_code: i32,
    #[serde(default, alias = "weatherDescription")]
    pub description: String,
}

impl WeatherReading {
    pub fn new(temperature: f64, weather_code: i32, description: impl Into<String>) -> Self {
        Self {
            temperature,
            weather_code,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_from_pitch_class_computes_midi() {
        // A4 = pitch class 9, octave 4 → 9 + 48 + 12 = 69.
        let n = Note::from_pitch_class(9, 4, 80, 500);
        assert_eq!(n.midi_number, 69);
        assert_eq!(n.name, "A");
        assert_eq!(n.octave, 4);
    }

    #[test]
    fn note_from_pitch_class_clamps() {
        let n = Note::from_pitch_class(23, 12, 200, 0);
        assert_eq!(n.name, "B");
        assert_eq!(n.octave, MAX_OCTAVE);
        assert_eq!(n.midi_number, 11 + 96 + 12);
        assert_eq!(n.velocity, 127);
        assert_eq!(n.duration, 1);
    }

    #[test]
    fn note_from_midi_derives_octave() {
        let n = Note::from_midi(60, 64, 100);
        assert_eq!(n.name, "C");
        assert_eq!(n.octave, 4);
        let low = Note::from_midi(3, 64, 100);
        assert_eq!(low.midi_number, 12);
        assert_eq!(low.octave, 0);
    }

    #[test]
    fn note_from_midi_stays_under_the_octave_cap() {
        for midi in 120..=127 {
            let n = Note::from_midi(midi, 64, 100);
            assert_eq!(n.midi_number, 119, "{midi}");
            assert_eq!(n.octave, MAX_OCTAVE);
            assert_eq!(n.name, "B");
        }
        assert_eq!(Note::from_midi(119, 64, 100), Note::from_pitch_class(11, 8, 64, 100));
    }

    #[test]
    fn pedal_value_is_clamped() {
        assert_eq!(Pedal::new(PedalKind::Soft, 1.7).value, 1.0);
        assert_eq!(Pedal::new(PedalKind::Soft, -0.2).value, 0.0);
        assert_eq!(Pedal::new(PedalKind::Soft, f64::NAN).value, 0.0);
        assert!(Pedal::release(PedalKind::Sustain).is_release());
    }

    #[test]
    fn scale_names_roundtrip() {
        for scale in Scale::ALL {
            assert_eq!(Scale::from_name(scale.name()), Some(scale));
            let json = serde_json::to_string(&scale).unwrap();
            assert_eq!(json, format!("\"{}\"", scale.name()));
        }
        assert_eq!(Scale::from_name("WHOLETONE"), Some(Scale::WholeTone));
        assert_eq!(Scale::from_name("bebop"), None);
    }

    #[test]
    fn tonic_serializes_as_name() {
        assert_eq!(serde_json::to_string(&Tonic::pitch(13)).unwrap(), "\"C#\"");
        assert_eq!(serde_json::to_string(&Tonic::Atonal).unwrap(), "\"atonal\"");
        let t: Tonic = serde_json::from_str("\"G\"").unwrap();
        assert_eq!(t, Tonic::pitch(7));
        assert!(serde_json::from_str::<Tonic>("\"H\"").is_err());
    }

    #[test]
    fn tonic_pitch_is_always_reduced() {
        assert_eq!(Tonic::pitch(13), Tonic::pitch(1));
        assert_eq!(Tonic::pitch(13).pitch_class(), Some(1));
        assert_eq!(Tonic::Atonal.pitch_class(), None);
        let json = serde_json::to_string(&Tonic::pitch(25)).unwrap();
        assert_eq!(serde_json::from_str::<Tonic>(&json).unwrap(), Tonic::pitch(25));
    }

    #[test]
    fn weather_accepts_browser_field_names() {
        let json = r#"{"temperature":-5.5,"weatherCode":71,"weatherDescription":"Snow"}"#;
        let w: WeatherReading = serde_json::from_str(json).unwrap();
        assert_eq!(w, WeatherReading::new(-5.5, 71, "Snow"));

        let bare: WeatherReading =
            serde_json::from_str(r#"{"temperature":20,"weatherCode":0}"#).unwrap();
        assert_eq!(bare.description, "");
    }
}
