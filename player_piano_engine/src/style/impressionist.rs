// Impressionist: whole-tone washes, parallel motion, lots of pedal.
//
// The scale wanders among whole-tone, lydian, dorian, mixolydian and major
// pentatonic. Texture favours arpeggios and parallel thirds/sixths over
// block chords; durations are long and dynamics soft.

use player_piano_protocol::Scale;
use rand::{Rng, RngCore};

use super::{Style, StyleProfile};
use crate::mode::ScalePolicy;
use crate::params::{Envelope, ParameterBundle, PedalPalette, Span};
use crate::scale::IMPRESSIONIST_SCALES;
use crate::synth::{Synthesizer, TickContext};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImpressionistProfile;

impl StyleProfile for ImpressionistProfile {
    fn style(&self) -> Style {
        Style::Impressionist
    }

    fn scale_policy(&self) -> ScalePolicy {
        ScalePolicy::drifting(Scale::WholeTone, &IMPRESSIONIST_SCALES)
    }

    fn base_parameters(&self) -> ParameterBundle {
        ParameterBundle {
            tempo: 80,
            density: 0.7,
            octaves: Span::new(2, 7),
            velocity: Span::new(35, 85),
            duration: Span::new(800, 3500),
            sustain_probability: 0.12,
            silence: Span::new(150, 900),
            pedals: PedalPalette::ALL,
        }
    }

    fn envelope(&self) -> Envelope {
        Envelope {
            velocity: Span::new(25, 95),
            octaves: Span::new(1, 7),
            ..Envelope::open()
        }
    }

    fn choose_synthesizer(&self, _ctx: &TickContext<'_>, rng: &mut dyn RngCore) -> Synthesizer {
        let r: f64 = rng.random();
        if r < 0.3 {
            Synthesizer::Arpeggio
        } else if r < 0.6 {
            Synthesizer::ParallelMotion
        } else if r < 0.85 {
            Synthesizer::Chord {
                size: rng.random_range(3..=5),
            }
        } else {
            Synthesizer::Note
        }
    }
}
