// Event synthesizers.
//
// A synthesizer turns the tick's `ParameterBundle` and key context into
// notes. The basic set (`basic.rs`) serves every style: single notes, chords
// and clusters, counterpoint, arpeggios, parallel motion and insect bursts.
// The remaining modules hold the style-specific generators together with
// whatever state ("sub-physics") they advance between ticks:
//
// - `animals.rs`:   jungle call-and-response schedule and call shapes
// - `traffic.rs`:   cars passing the listener, Doppler-bent engine tones
// - `furniture.rs`: the haunted apartment's furniture and its conversations
// - `marbles.rs`:   falling marbles integrated under gravity; bounces sound
// - `tone_row.rs`:  12-tone row stepping through P/R/I/RI forms
//
// Every generator builds notes through `Note::from_pitch_class` or
// `Note::from_midi`, so the note format contract (velocity <= 127,
// duration >= 1 ms, octave <= 8) holds no matter what band a style asks for.

pub mod animals;
pub mod basic;
pub mod furniture;
pub mod marbles;
pub mod tone_row;
pub mod traffic;

use player_piano_protocol::{MidiEvent, Scale, Tonic};
use rand::Rng;

use crate::mode::ModeMachine;
use crate::mood::Mood;
use crate::params::ParameterBundle;
use crate::scale::KeyContext;

/// Which generator a style picked for this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Synthesizer {
    Note,
    Chord { size: usize },
    Counterpoint { voices: usize },
    Arpeggio,
    ParallelMotion,
    InsectBurst,
    /// The active style's own generator.
    Signature,
}

/// Everything a synthesizer may read during one tick.
#[derive(Clone, Copy, Debug)]
pub struct TickContext<'a> {
    pub now_ms: u64,
    pub bundle: &'a ParameterBundle,
    pub key: KeyContext,
    pub tonic: Tonic,
    pub scale: Scale,
    pub chaotic: bool,
    pub insect_burst: bool,
}

impl<'a> TickContext<'a> {
    pub fn new(now_ms: u64, bundle: &'a ParameterBundle, mode: &ModeMachine) -> Self {
        Self {
            now_ms,
            bundle,
            key: mode.key_context(),
            tonic: mode.tonic(),
            scale: mode.scale(),
            chaotic: mode.moods().is_active(Mood::Chaotic),
            insect_burst: mode.moods().is_active(Mood::InsectBurst),
        }
    }

    /// A rest drawn from the bundle's silence band.
    pub fn silence<R: Rng + ?Sized>(&self, rng: &mut R) -> MidiEvent {
        MidiEvent::Silence {
            duration: self.bundle.silence.sample(rng),
        }
    }
}
