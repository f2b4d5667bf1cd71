// Street: a gritty groove with traffic going by.
//
// While cars are on the road (see `synth::traffic`), there is a 35 % chance
// per tick that the tick is given to their Doppler-bent engine tones. Only
// the hardcore mood may layer on.

use player_piano_protocol::{MidiEvent, Scale};
use rand::RngCore;

use super::{Style, StyleProfile};
use crate::mode::ScalePolicy;
use crate::mood::Mood;
use crate::params::{ParameterBundle, PedalPalette, Span, chance};
use crate::synth::TickContext;
use crate::synth::traffic::Street;

const STREET_SCALES: [Scale; 4] = [
    Scale::Mixolydian,
    Scale::Dorian,
    Scale::Minor,
    Scale::PentatonicMinor,
];

const CAR_PREEMPT_CHANCE: f64 = 0.35;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreetProfile {
    street: Street,
}

impl StyleProfile for StreetProfile {
    fn style(&self) -> Style {
        Style::Street
    }

    fn scale_policy(&self) -> ScalePolicy {
        ScalePolicy::drifting(Scale::Mixolydian, &STREET_SCALES)
    }

    fn moods(&self) -> &'static [Mood] {
        &[Mood::Hardcore]
    }

    fn base_parameters(&self) -> ParameterBundle {
        ParameterBundle {
            tempo: 120,
            density: 0.65,
            octaves: Span::new(2, 6),
            velocity: Span::new(65, 110),
            duration: Span::new(150, 1200),
            sustain_probability: 0.04,
            silence: Span::new(100, 500),
            pedals: PedalPalette::SUSTAIN_AND_SOFT,
        }
    }

    fn advance(&mut self, now_ms: u64, rng: &mut dyn RngCore) {
        self.street.advance(now_ms, rng);
    }

    fn preempt(&mut self, ctx: &TickContext<'_>, rng: &mut dyn RngCore) -> Option<MidiEvent> {
        if self.street.is_empty() || !chance(rng, CAR_PREEMPT_CHANCE) {
            return None;
        }
        Some(MidiEvent::CarPass {
            notes: self.street.pass_by(ctx.now_ms, rng),
            current_key: ctx.tonic,
            current_scale: ctx.scale,
        })
    }
}
