// Style profiles.
//
// A style is a complete personality for the engine: its base parameters,
// the envelope that clamps them, which moods may layer on top, how the
// scale may move, which synthesizer to run each tick, and any per-style
// state it advances between ticks (animal schedules, cars, furniture,
// marbles, a tone row). Each style is one `StyleProfile` implementation, and
// selecting a style swaps the whole boxed profile, so nothing from the old
// style leaks into the next tick.
//
// Parameter precedence, shared by every style through the default
// `compute_parameters`:
//
//     style base bundle -> weather -> active moods -> style envelope
//
// Weather may also suggest a scale; the mode machine only honours that when
// the style's `ScalePolicy` lets the scale drift.
//
// Styles: `standard.rs` (the default), `elevator.rs`, `jungle.rs`,
// `serialist.rs`, `impressionist.rs`, `street.rs`, `haunted.rs`,
// `marbles.rs`.

mod elevator;
mod haunted;
mod impressionist;
mod jungle;
mod marbles;
mod serialist;
mod standard;
mod street;

use std::fmt;
use std::str::FromStr;

use player_piano_protocol::{MidiEvent, WeatherReading};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::mode::{ModeMachine, ScalePolicy};
use crate::mood::Mood;
use crate::params::{Envelope, ParameterBundle};
use crate::synth::{Synthesizer, TickContext, basic};
use crate::weather::{self, WeatherMapping};

pub use elevator::ElevatorProfile;
pub use haunted::HauntedProfile;
pub use impressionist::ImpressionistProfile;
pub use jungle::JungleProfile;
pub use marbles::MarblesProfile;
pub use serialist::SerialistProfile;
pub use standard::StandardProfile;
pub use street::StreetProfile;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Default,
    Elevator,
    Jungle,
    Serialist,
    Impressionist,
    Street,
    Haunted,
    Marbles,
}

impl Style {
    pub const ALL: [Style; 8] = [
        Style::Default,
        Style::Elevator,
        Style::Jungle,
        Style::Serialist,
        Style::Impressionist,
        Style::Street,
        Style::Haunted,
        Style::Marbles,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Style::Default => "default",
            Style::Elevator => "elevator",
            Style::Jungle => "jungle",
            Style::Serialist => "serialist",
            Style::Impressionist => "impressionist",
            Style::Street => "street",
            Style::Haunted => "haunted",
            Style::Marbles => "marbles",
        }
    }

    /// A fresh profile for this style, with its per-style state initialised
    /// at `now_ms`.
    pub fn profile(self, now_ms: u64, rng: &mut dyn RngCore) -> Box<dyn StyleProfile> {
        match self {
            Style::Default => Box::new(StandardProfile),
            Style::Elevator => Box::new(ElevatorProfile),
            Style::Jungle => Box::new(JungleProfile::new(now_ms, rng)),
            Style::Serialist => Box::new(SerialistProfile::new(rng)),
            Style::Impressionist => Box::new(ImpressionistProfile),
            Style::Street => Box::new(StreetProfile::default()),
            Style::Haunted => Box::new(HauntedProfile::new(now_ms, rng)),
            Style::Marbles => Box::new(MarblesProfile::default()),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown style '{0}'")]
pub struct UnknownStyle(pub String);

impl FromStr for Style {
    type Err = UnknownStyle;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Style::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStyle(s.to_string()))
    }
}

/// One style's behaviour. Implementations own their per-style state.
pub trait StyleProfile: Send {
    fn style(&self) -> Style;

    fn scale_policy(&self) -> ScalePolicy;

    /// Moods that may switch on while this style is active.
    fn moods(&self) -> &'static [Mood] {
        &[]
    }

    /// The bundle before weather and moods.
    fn base_parameters(&self) -> ParameterBundle;

    /// Hard limits on the final bundle.
    fn envelope(&self) -> Envelope {
        Envelope::open()
    }

    /// This tick's bundle plus any scale the weather suggests.
    fn compute_parameters(
        &self,
        weather: Option<&WeatherReading>,
        mode: &ModeMachine,
        rng: &mut dyn RngCore,
    ) -> WeatherMapping {
        let WeatherMapping { bundle, scale_nudge } =
            weather::apply(self.base_parameters(), weather, mode.scale(), rng);
        let bundle = self.envelope().apply(mode.moods().apply(bundle));
        WeatherMapping { bundle, scale_nudge }
    }

    /// Move per-style state forward to `now_ms`.
    fn advance(&mut self, _now_ms: u64, _rng: &mut dyn RngCore) {}

    /// A style event that takes this tick before the density gate.
    fn preempt(&mut self, _ctx: &TickContext<'_>, _rng: &mut dyn RngCore) -> Option<MidiEvent> {
        None
    }

    fn choose_synthesizer(&self, ctx: &TickContext<'_>, rng: &mut dyn RngCore) -> Synthesizer {
        core_choice(ctx, rng)
    }

    /// Run the chosen synthesizer. `None` turns the tick into a silence.
    fn synthesize(
        &mut self,
        choice: Synthesizer,
        ctx: &TickContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<MidiEvent> {
        basic::render(choice, ctx, rng)
    }
}

/// Note, chord or counterpoint, with thresholds and sizes that widen under
/// the chaotic mood.
pub fn core_choice<R: Rng + ?Sized>(ctx: &TickContext<'_>, rng: &mut R) -> Synthesizer {
    let r: f64 = rng.random();
    let (note_below, chord_below, chord_size, voices) = if ctx.chaotic {
        (0.3, 0.6, 3..=6, 3..=6)
    } else {
        (0.5, 0.8, 3..=5, 2..=4)
    };
    if r < note_below {
        Synthesizer::Note
    } else if r < chord_below {
        Synthesizer::Chord {
            size: rng.random_range(chord_size),
        }
    } else {
        Synthesizer::Counterpoint {
            voices: rng.random_range(voices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::KeyContext;
    use player_piano_protocol::{Scale, Tonic};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn style_names_parse_case_insensitively() {
        for style in Style::ALL {
            assert_eq!(style.name().parse::<Style>(), Ok(style));
            assert_eq!(style.name().to_uppercase().parse::<Style>(), Ok(style));
            assert_eq!(style.to_string(), style.name());
        }
        assert_eq!(" Jungle ".parse::<Style>(), Ok(Style::Jungle));
        assert_eq!("disco".parse::<Style>(), Err(UnknownStyle("disco".to_string())));
        assert_eq!(UnknownStyle("disco".into()).to_string(), "unknown style 'disco'");
    }

    #[test]
    fn style_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Style::Impressionist).unwrap(), "\"impressionist\"");
        let s: Style = serde_json::from_str("\"marbles\"").unwrap();
        assert_eq!(s, Style::Marbles);
    }

    #[test]
    fn profiles_report_their_style() {
        let mut rng = StdRng::seed_from_u64(1);
        for style in Style::ALL {
            let profile = style.profile(0, &mut rng);
            assert_eq!(profile.style(), style);
            let policy = profile.scale_policy();
            assert!(!policy.drift || policy.pool.contains(&policy.start), "{style}");
        }
    }

    #[test]
    fn base_bundles_sit_inside_their_envelopes() {
        let mut rng = StdRng::seed_from_u64(2);
        for style in Style::ALL {
            let profile = style.profile(0, &mut rng);
            let base = profile.base_parameters();
            assert_eq!(profile.envelope().apply(base.clone()), base, "{style}");
        }
    }

    #[test]
    fn core_choice_sizes_follow_mood() {
        let bundle = ParameterBundle::default();
        let mut ctx = TickContext {
            now_ms: 0,
            bundle: &bundle,
            key: KeyContext::new(0, Scale::Major),
            tonic: Tonic::pitch(0),
            scale: Scale::Major,
            chaotic: false,
            insect_burst: false,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut notes = 0;
        for _ in 0..1_000 {
            match core_choice(&ctx, &mut rng) {
                Synthesizer::Note => notes += 1,
                Synthesizer::Chord { size } => assert!((3..=5).contains(&size)),
                Synthesizer::Counterpoint { voices } => assert!((2..=4).contains(&voices)),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!((420..=580).contains(&notes), "{notes}");

        ctx.chaotic = true;
        let mut notes = 0;
        for _ in 0..1_000 {
            match core_choice(&ctx, &mut rng) {
                Synthesizer::Note => notes += 1,
                Synthesizer::Chord { size } => assert!((3..=6).contains(&size)),
                Synthesizer::Counterpoint { voices } => assert!((3..=6).contains(&voices)),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!((230..=370).contains(&notes), "{notes}");
    }
}
