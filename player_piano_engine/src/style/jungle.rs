// Jungle: a pentatonic canopy full of animals.
//
// Animals call on their own schedules (see `synth::animals`) and a due call
// takes the tick ahead of everything else. Between calls the texture is
// light: notes, small chords, parallel lines and the odd arpeggio. Insect
// bursts and the chaotic mood may layer on.

use player_piano_protocol::{MidiEvent, Scale};
use rand::{Rng, RngCore};

use super::{Style, StyleProfile, core_choice};
use crate::mode::ScalePolicy;
use crate::mood::Mood;
use crate::params::{ParameterBundle, PedalPalette, Span};
use crate::synth::animals::{self, Canopy};
use crate::synth::{Synthesizer, TickContext};

const JUNGLE_SCALES: [Scale; 4] = [
    Scale::PentatonicMinor,
    Scale::PentatonicMajor,
    Scale::Dorian,
    Scale::Mixolydian,
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JungleProfile {
    canopy: Canopy,
}

impl JungleProfile {
    pub fn new<R: Rng + ?Sized>(now_ms: u64, rng: &mut R) -> Self {
        Self {
            canopy: Canopy::new(now_ms, rng),
        }
    }
}

impl StyleProfile for JungleProfile {
    fn style(&self) -> Style {
        Style::Jungle
    }

    fn scale_policy(&self) -> ScalePolicy {
        ScalePolicy::drifting(Scale::PentatonicMinor, &JUNGLE_SCALES)
    }

    fn moods(&self) -> &'static [Mood] {
        &[Mood::Chaotic, Mood::InsectBurst]
    }

    fn base_parameters(&self) -> ParameterBundle {
        ParameterBundle {
            tempo: 110,
            density: 0.75,
            octaves: Span::new(2, 6),
            velocity: Span::new(50, 100),
            duration: Span::new(200, 1500),
            sustain_probability: 0.04,
            silence: Span::new(100, 500),
            pedals: PedalPalette::SUSTAIN_AND_SOFT,
        }
    }

    fn preempt(&mut self, ctx: &TickContext<'_>, rng: &mut dyn RngCore) -> Option<MidiEvent> {
        let animal = self.canopy.due(ctx.now_ms, rng)?;
        Some(MidiEvent::AnimalCall {
            animal,
            notes: animals::call(animal, rng),
            current_key: ctx.tonic,
            current_scale: ctx.scale,
        })
    }

    fn choose_synthesizer(&self, ctx: &TickContext<'_>, rng: &mut dyn RngCore) -> Synthesizer {
        if ctx.chaotic {
            return core_choice(ctx, rng);
        }
        let r: f64 = rng.random();
        if r < 0.4 {
            Synthesizer::Note
        } else if r < 0.6 {
            Synthesizer::Chord {
                size: rng.random_range(3..=4),
            }
        } else if r < 0.85 {
            Synthesizer::ParallelMotion
        } else {
            Synthesizer::Arpeggio
        }
    }
}
