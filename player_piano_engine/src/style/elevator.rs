// Elevator music.
//
// Pinned to major, no moods, gentle dynamics in a middle register: octaves
// 3–6, velocity 30–90, long notes (0.8–3.2 s) and short rests. Only the
// sustain and soft pedals are used. Weather still shades the bundle, but the
// envelope keeps it inside those limits.

use player_piano_protocol::Scale;
use rand::{Rng, RngCore};

use super::{Style, StyleProfile};
use crate::mode::ScalePolicy;
use crate::params::{Envelope, ParameterBundle, PedalPalette, Span};
use crate::synth::{Synthesizer, TickContext};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ElevatorProfile;

impl StyleProfile for ElevatorProfile {
    fn style(&self) -> Style {
        Style::Elevator
    }

    fn scale_policy(&self) -> ScalePolicy {
        ScalePolicy::pinned(Scale::Major)
    }

    fn base_parameters(&self) -> ParameterBundle {
        ParameterBundle {
            tempo: 72,
            density: 0.75,
            octaves: Span::new(3, 6),
            velocity: Span::new(40, 75),
            duration: Span::new(800, 3200),
            sustain_probability: 0.08,
            silence: Span::new(200, 800),
            pedals: PedalPalette::SUSTAIN_AND_SOFT,
        }
    }

    fn envelope(&self) -> Envelope {
        Envelope {
            tempo: Span::new(60, 90),
            density: Span::new(0.5, 0.9),
            octaves: Span::new(3, 6),
            velocity: Span::new(30, 90),
            duration: Span::new(800, 3200),
            silence: Span::new(200, 800),
        }
    }

    fn choose_synthesizer(&self, _ctx: &TickContext<'_>, rng: &mut dyn RngCore) -> Synthesizer {
        let r: f64 = rng.random();
        if r < 0.5 {
            Synthesizer::Note
        } else if r < 0.85 {
            Synthesizer::Chord {
                size: rng.random_range(3..=4),
            }
        } else {
            Synthesizer::Arpeggio
        }
    }
}
