// Marbles: bouncing glass on the keys.
//
// Marble physics (see `synth::marbles`) runs between ticks; any queued
// bounce takes the tick, one bounce per tick in impact order. Around them
// the piano plays sparse, bright material in a high register.

use player_piano_protocol::{MidiEvent, Scale};
use rand::{Rng, RngCore};

use super::{Style, StyleProfile, core_choice};
use crate::mode::ScalePolicy;
use crate::mood::Mood;
use crate::params::{ParameterBundle, PedalPalette, Span};
use crate::synth::marbles::MarbleRun;
use crate::synth::{Synthesizer, TickContext};

const MARBLE_SCALES: [Scale; 4] = [
    Scale::PentatonicMajor,
    Scale::Major,
    Scale::Lydian,
    Scale::WholeTone,
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarblesProfile {
    run: MarbleRun,
}

impl StyleProfile for MarblesProfile {
    fn style(&self) -> Style {
        Style::Marbles
    }

    fn scale_policy(&self) -> ScalePolicy {
        ScalePolicy::drifting(Scale::PentatonicMajor, &MARBLE_SCALES)
    }

    fn moods(&self) -> &'static [Mood] {
        &[Mood::Chaotic]
    }

    fn base_parameters(&self) -> ParameterBundle {
        ParameterBundle {
            tempo: 90,
            density: 0.5,
            octaves: Span::new(4, 7),
            velocity: Span::new(40, 90),
            duration: Span::new(150, 1200),
            sustain_probability: 0.06,
            silence: Span::new(150, 700),
            pedals: PedalPalette::ALL,
        }
    }

    fn advance(&mut self, now_ms: u64, rng: &mut dyn RngCore) {
        self.run.advance(now_ms, rng);
    }

    fn preempt(&mut self, ctx: &TickContext<'_>, _rng: &mut dyn RngCore) -> Option<MidiEvent> {
        let bounce = self.run.next_bounce()?;
        Some(MidiEvent::MarbleBounce {
            note: bounce.note(&ctx.key, ctx.bundle.octaves),
            current_key: ctx.tonic,
            current_scale: ctx.scale,
        })
    }

    fn choose_synthesizer(&self, ctx: &TickContext<'_>, rng: &mut dyn RngCore) -> Synthesizer {
        if ctx.chaotic {
            return core_choice(ctx, rng);
        }
        let r: f64 = rng.random();
        if r < 0.5 {
            Synthesizer::Note
        } else if r < 0.75 {
            Synthesizer::Arpeggio
        } else {
            Synthesizer::Chord { size: 3 }
        }
    }
}
