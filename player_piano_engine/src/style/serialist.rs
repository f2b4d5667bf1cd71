// Serialist: twelve-tone rows.
//
// The scale is pinned to chromatic and no mood may layer on. The key is kept
// as the row's transposition, so key rotation transposes the row. Each tick
// either sounds the next 1–4 row members as a melodic fragment or stacks the
// next 3–4 as a chord.

use player_piano_protocol::{MidiEvent, Note, Scale};
use rand::{Rng, RngCore};

use super::{Style, StyleProfile};
use crate::mode::ScalePolicy;
use crate::params::{ParameterBundle, PedalPalette, Span};
use crate::synth::tone_row::ToneRow;
use crate::synth::{Synthesizer, TickContext};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerialistProfile {
    row: ToneRow,
}

impl SerialistProfile {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            row: ToneRow::random(rng),
        }
    }

    fn voice<R: Rng + ?Sized>(ctx: &TickContext<'_>, pcs: Vec<u8>, rng: &mut R) -> Vec<Note> {
        let bundle = ctx.bundle;
        pcs.into_iter()
            .map(|pc| {
                Note::from_pitch_class(
                    pc,
                    bundle.octaves.sample(rng),
                    bundle.velocity.sample(rng),
                    bundle.duration.sample(rng),
                )
            })
            .collect()
    }
}

impl StyleProfile for SerialistProfile {
    fn style(&self) -> Style {
        Style::Serialist
    }

    fn scale_policy(&self) -> ScalePolicy {
        ScalePolicy::pinned(Scale::Chromatic)
    }

    fn base_parameters(&self) -> ParameterBundle {
        ParameterBundle {
            tempo: 80,
            density: 0.65,
            octaves: Span::new(2, 6),
            velocity: Span::new(40, 100),
            duration: Span::new(300, 2000),
            sustain_probability: 0.05,
            silence: Span::new(200, 1000),
            pedals: PedalPalette {
                sustain: false,
                sostenuto: true,
                soft: true,
            },
        }
    }

    fn choose_synthesizer(&self, _ctx: &TickContext<'_>, rng: &mut dyn RngCore) -> Synthesizer {
        if rng.random::<f64>() < 0.75 {
            Synthesizer::Signature
        } else {
            Synthesizer::Chord {
                size: rng.random_range(3..=4),
            }
        }
    }

    fn synthesize(
        &mut self,
        choice: Synthesizer,
        ctx: &TickContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<MidiEvent> {
        match choice {
            Synthesizer::Chord { size } => {
                let count = u8::try_from(size).unwrap_or(4);
                let (_, pcs) = self.row.take(count, ctx.key.tonic, rng);
                Some(MidiEvent::Chord {
                    notes: Self::voice(ctx, pcs, rng),
                    current_key: ctx.tonic,
                    current_scale: ctx.scale,
                    cluster: false,
                })
            }
            _ => {
                let count = rng.random_range(1..=4);
                let (row_position, pcs) = self.row.take(count, ctx.key.tonic, rng);
                Some(MidiEvent::ToneRow {
                    notes: Self::voice(ctx, pcs, rng),
                    current_key: ctx.tonic,
                    current_scale: ctx.scale,
                    row_position,
                })
            }
        }
    }
}
