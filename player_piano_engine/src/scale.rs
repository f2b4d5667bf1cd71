// Scale and key model.
//
// Scales are named on the wire by `player_piano_protocol::Scale`; this module
// owns what those names mean: the semitone intervals of each scale above its
// tonic, and the pitch arithmetic built on them.
//
// This module provides:
// - `intervals()`: the interval table for each of the 18 scales
// - `KeyContext`: a tonic pitch class plus a scale, with membership tests,
//   degree <-> pitch mapping, and snapping to the nearest in-scale pitch
// - Named scale pools used by the mode machine when rotating scales
//
// MIDI numbering throughout follows C0 = 12, so
// `midi = pitch_class + octave * 12 + 12`.
//
// Used by the synthesizers for pitch selection and by the mode machine for
// rotation candidates.

use player_piano_protocol::{Note, PITCH_CLASS_NAMES, Scale};

/// Scales entered by the chaotic mood and rotated among while it lasts.
pub const CHAOTIC_SCALES: [Scale; 8] = [
    Scale::Chromatic,
    Scale::Diminished,
    Scale::Augmented,
    Scale::HarmonicMinor,
    Scale::DoubleHarmonic,
    Scale::Hungarian,
    Scale::Byzantine,
    Scale::Oriental,
];

/// Rotation pool for the chaotic mood when changing scale alone.
pub const CHAOTIC_ROTATION: [Scale; 10] = [
    Scale::Chromatic,
    Scale::Diminished,
    Scale::Augmented,
    Scale::HarmonicMinor,
    Scale::DoubleHarmonic,
    Scale::Hungarian,
    Scale::Byzantine,
    Scale::Oriental,
    Scale::Minor,
    Scale::WholeTone,
];

/// Colouristic, functionally vague scales.
pub const IMPRESSIONIST_SCALES: [Scale; 5] = [
    Scale::WholeTone,
    Scale::Lydian,
    Scale::Dorian,
    Scale::Mixolydian,
    Scale::PentatonicMajor,
];

/// Semitone intervals above the tonic for each scale degree, ascending.
pub fn intervals(scale: Scale) -> &'static [u8] {
    match scale {
        Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
        Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
        Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
        Scale::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
        Scale::Lydian => &[0, 2, 4, 6, 7, 9, 11],
        Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
        Scale::Locrian => &[0, 1, 3, 5, 6, 8, 10],
        Scale::PentatonicMajor => &[0, 2, 4, 7, 9],
        Scale::PentatonicMinor => &[0, 3, 5, 7, 10],
        Scale::WholeTone => &[0, 2, 4, 6, 8, 10],
        Scale::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        Scale::Diminished => &[0, 2, 3, 5, 6, 8, 9, 11],
        Scale::Augmented => &[0, 3, 4, 7, 8, 11],
        Scale::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
        Scale::DoubleHarmonic => &[0, 1, 4, 5, 7, 8, 11],
        Scale::Hungarian => &[0, 2, 3, 6, 7, 8, 11],
        Scale::Byzantine => &[0, 1, 4, 5, 7, 8, 11],
        Scale::Oriental => &[0, 1, 4, 5, 6, 9, 10],
    }
}

/// Sharp-spelled name of a pitch class (reduced mod 12).
pub fn pitch_class_name(pc: u8) -> &'static str {
    PITCH_CLASS_NAMES[(pc % 12) as usize]
}

/// A scale rooted on a specific tonic pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyContext {
    /// Pitch class of the tonic (0 = C, 2 = D, ...).
    pub tonic: u8,
    pub scale: Scale,
}

impl KeyContext {
    pub fn new(tonic: u8, scale: Scale) -> Self {
        KeyContext {
            tonic: tonic % 12,
            scale,
        }
    }

    /// Number of distinct degrees per octave.
    pub fn degree_count(&self) -> usize {
        intervals(self.scale).len()
    }

    /// The in-scale pitch classes, in degree order starting at the tonic.
    pub fn pitch_classes(&self) -> Vec<u8> {
        intervals(self.scale)
            .iter()
            .map(|&iv| (self.tonic + iv) % 12)
            .collect()
    }

    /// Whether a MIDI pitch (or bare pitch class) is in the scale.
    pub fn contains(&self, pitch: u8) -> bool {
        self.scale_degree(pitch).is_some()
    }

    /// Scale degree (0-based) of a pitch, or `None` if it is out of scale.
    pub fn scale_degree(&self, pitch: u8) -> Option<usize> {
        let pc = (pitch % 12 + 12 - self.tonic) % 12;
        intervals(self.scale).iter().position(|&iv| iv == pc)
    }

    /// Pitch class of a degree plus how many octaves the degree wrapped past
    /// the top of the scale. Degree 9 of a 7-note scale is degree 2, one
    /// octave up.
    pub fn degree_pitch_class(&self, degree: usize) -> (u8, u8) {
        let ivs = intervals(self.scale);
        let step = ivs[degree % ivs.len()];
        let wraps = degree / ivs.len();
        // A degree that crosses B -> C also lands in the next octave.
        let crossed = u8::from(self.tonic + step >= 12);
        let wraps = u8::try_from(wraps).unwrap_or(u8::MAX);
        ((self.tonic + step) % 12, wraps.saturating_add(crossed))
    }

    /// MIDI pitch of a degree, counting octaves from the tonic's octave.
    pub fn degree_to_pitch(&self, degree: usize, octave: u8) -> u8 {
        let (pc, carry) = self.degree_pitch_class(degree);
        let octave = octave.saturating_add(carry);
        pc.saturating_add(octave.saturating_mul(12)).saturating_add(12).min(127)
    }

    /// A note on the given degree; octave carries are capped at `max_octave`.
    pub fn note(
        &self,
        degree: usize,
        octave: u8,
        max_octave: u8,
        velocity: u8,
        duration_ms: u32,
    ) -> Note {
        let (pc, carry) = self.degree_pitch_class(degree);
        let octave = octave.saturating_add(carry).min(max_octave);
        Note::from_pitch_class(pc, octave, velocity, duration_ms)
    }

    /// All in-scale MIDI pitches between `low` and `high` inclusive.
    pub fn pitches_in_range(&self, low: u8, high: u8) -> Vec<u8> {
        (low..=high).filter(|&p| self.contains(p)).collect()
    }

    /// Nearest in-scale pitch, preferring the lower neighbour on ties.
    pub fn snap(&self, pitch: u8) -> u8 {
        if self.contains(pitch) {
            return pitch;
        }
        for offset in 1u8..=6 {
            if pitch >= offset && self.contains(pitch - offset) {
                return pitch - offset;
            }
            if pitch <= 127 - offset && self.contains(pitch + offset) {
                return pitch + offset;
            }
        }
        pitch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scale_starts_on_tonic_and_ascends() {
        for scale in Scale::ALL {
            let ivs = intervals(scale);
            assert_eq!(ivs[0], 0, "{scale}");
            assert!(ivs.windows(2).all(|w| w[0] < w[1]), "{scale}");
            assert!(ivs.iter().all(|&iv| iv < 12), "{scale}");
        }
        assert_eq!(intervals(Scale::Chromatic).len(), 12);
    }

    #[test]
    fn d_dorian_membership() {
        let key = KeyContext::new(2, Scale::Dorian);
        for pitch in [62, 64, 65, 67, 69, 71, 72] {
            assert!(key.contains(pitch), "{pitch}");
        }
        assert!(!key.contains(63));
        assert!(!key.contains(66));
        assert_eq!(key.pitch_classes(), vec![2, 4, 5, 7, 9, 11, 0]);
    }

    #[test]
    fn scale_degree_lookup() {
        let key = KeyContext::new(2, Scale::Dorian);
        assert_eq!(key.scale_degree(62), Some(0));
        assert_eq!(key.scale_degree(69), Some(4));
        assert_eq!(key.scale_degree(63), None);
    }

    #[test]
    fn degree_to_pitch_carries_octaves() {
        let c_major = KeyContext::new(0, Scale::Major);
        assert_eq!(c_major.degree_to_pitch(0, 4), 60);
        assert_eq!(c_major.degree_to_pitch(7, 4), 72);
        assert_eq!(c_major.degree_to_pitch(9, 4), 76);

        // A major: degree 2 is C#, which sits above the B->C boundary.
        let a_major = KeyContext::new(9, Scale::Major);
        assert_eq!(a_major.degree_to_pitch(0, 4), 69);
        assert_eq!(a_major.degree_to_pitch(2, 4), 73);
    }

    #[test]
    fn snapping() {
        let key = KeyContext::new(2, Scale::Dorian);
        assert_eq!(key.snap(62), 62);
        assert_eq!(key.snap(63), 62);
        assert_eq!(key.snap(66), 65);
    }

    #[test]
    fn phrygian_half_step() {
        let key = KeyContext::new(4, Scale::Phrygian);
        assert_eq!(key.scale_degree(64), Some(0));
        assert_eq!(key.scale_degree(65), Some(1));
    }

    #[test]
    fn note_caps_octave() {
        let key = KeyContext::new(11, Scale::Major);
        // Degree 1 of B major (C#) wraps past C into the next octave.
        let note = key.note(1, 6, 6, 70, 300);
        assert_eq!(note.name, "C#");
        assert_eq!(note.octave, 6);
    }
}
