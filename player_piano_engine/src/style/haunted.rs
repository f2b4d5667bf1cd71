// Haunted: the furniture is talking.
//
// Atonal and pinned to chromatic, with no moods and no ordinary pedalling:
// the apartment (see `synth::furniture`) owns the sustain pedal as fog.
// Enforced quiet, window slams and the fog pedal preempt everything else;
// otherwise every sounding tick is a piece of furniture speaking, or a short
// rest when nobody does.

use player_piano_protocol::{FurnitureObject, FurniturePattern, MidiEvent, Scale};
use rand::{Rng, RngCore};

use super::{Style, StyleProfile};
use crate::mode::ScalePolicy;
use crate::params::{ParameterBundle, PedalPalette, Span};
use crate::synth::furniture::{Apartment, Interruption};
use crate::synth::{Synthesizer, TickContext};

const HAUNTED: ScalePolicy = ScalePolicy {
    start: Scale::Chromatic,
    pool: &[],
    drift: false,
    atonal: true,
};

#[derive(Clone, Debug, PartialEq)]
pub struct HauntedProfile {
    apartment: Apartment,
}

impl HauntedProfile {
    pub fn new<R: Rng + ?Sized>(now_ms: u64, rng: &mut R) -> Self {
        Self {
            apartment: Apartment::new(now_ms, rng),
        }
    }
}

impl StyleProfile for HauntedProfile {
    fn style(&self) -> Style {
        Style::Haunted
    }

    fn scale_policy(&self) -> ScalePolicy {
        HAUNTED
    }

    fn base_parameters(&self) -> ParameterBundle {
        ParameterBundle {
            tempo: 60,
            density: 0.6,
            octaves: Span::new(1, 7),
            velocity: Span::new(20, 90),
            duration: Span::new(80, 2000),
            sustain_probability: 0.0,
            silence: Span::new(100, 900),
            pedals: PedalPalette::NONE,
        }
    }

    fn advance(&mut self, now_ms: u64, rng: &mut dyn RngCore) {
        self.apartment.advance(now_ms, rng);
    }

    fn preempt(&mut self, ctx: &TickContext<'_>, rng: &mut dyn RngCore) -> Option<MidiEvent> {
        let event = match self.apartment.interrupt(ctx.now_ms, rng)? {
            Interruption::Quiet(duration) => MidiEvent::Silence { duration },
            Interruption::Slam(notes) => MidiEvent::Furniture {
                object: FurnitureObject::Window,
                pattern: FurniturePattern::Slam,
                notes,
                current_key: ctx.tonic,
                current_scale: ctx.scale,
            },
            Interruption::Pedal(pedal) => MidiEvent::Pedal { pedal },
        };
        Some(event)
    }

    fn choose_synthesizer(&self, _ctx: &TickContext<'_>, _rng: &mut dyn RngCore) -> Synthesizer {
        Synthesizer::Signature
    }

    fn synthesize(
        &mut self,
        _choice: Synthesizer,
        ctx: &TickContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<MidiEvent> {
        let Some(utterance) = self.apartment.speak(rng) else {
            return Some(MidiEvent::Silence {
                duration: rng.random_range(200..=500),
            });
        };
        Some(MidiEvent::Furniture {
            object: utterance.object,
            pattern: utterance.pattern,
            notes: utterance.notes,
            current_key: ctx.tonic,
            current_scale: ctx.scale,
        })
    }
}
