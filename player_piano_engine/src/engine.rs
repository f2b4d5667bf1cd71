// The tick driver.
//
// `Engine` owns everything one stream needs: configuration, a clock, a
// seedable RNG, the active style profile and the mode/pedal state. Each call
// to `generate_event` is one tick and returns exactly one `MidiEvent`:
//
//  1. advance the mode machine (moods, key/scale rotation)
//  2. advance the style's own state (cars, marbles, furniture, ...)
//  3. compute the bundle: style base -> weather -> moods -> envelope; apply
//     any weather scale nudge the style allows
//  4. an active insect-burst mood takes the tick with p = 0.6
//  5. the style may take the tick (animal call, car pass, slam, bounce)
//  6. density gate: a draw above `density` rests for a silence-band duration
//  7. the pedal controller may emit a pedal change
//  8. otherwise the style chooses a synthesizer and runs it; a synthesizer
//     that declines turns the tick into a rest
//
// The engine is `Send` and never blocks. It knows nothing about sockets or
// cadence: the relay calls it once per tick.

use player_piano_protocol::{MidiEvent, Scale, Tonic, WeatherReading};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::mode::ModeMachine;
use crate::mood::Mood;
use crate::params::{ParameterBundle, Span, chance};
use crate::pedal::PedalController;
use crate::style::{Style, StyleProfile};
use crate::synth::{TickContext, basic};
use crate::weather::WeatherMapping;

/// Per-stream state that outlives a tick. Style-specific state lives in the
/// active profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineState {
    pub mode: ModeMachine,
    pub pedal: PedalController,
    pub ticks: u64,
}

pub struct Engine<C = SystemClock, R = StdRng> {
    config: EngineConfig,
    clock: C,
    rng: R,
    profile: Box<dyn StyleProfile>,
    state: EngineState,
    last_parameters: Option<ParameterBundle>,
}

impl Engine<SystemClock, StdRng> {
    /// Wall clock, OS-seeded RNG, default style.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_parts(config, SystemClock::new(), StdRng::from_os_rng())
    }

    /// Wall clock with a fixed seed.
    pub fn seeded(config: EngineConfig, seed: u64) -> Self {
        Self::with_parts(config, SystemClock::new(), StdRng::seed_from_u64(seed))
    }
}

impl<C: Clock, R: RngCore + Send> Engine<C, R> {
    pub fn with_parts(config: EngineConfig, clock: C, mut rng: R) -> Self {
        let now = clock.now_ms();
        let profile = Style::Default.profile(now, &mut rng);
        let mode = ModeMachine::new(&profile.scale_policy(), now, &mut rng);
        Self {
            config,
            clock,
            rng,
            profile,
            state: EngineState {
                mode,
                pedal: PedalController::default(),
                ticks: 0,
            },
            last_parameters: None,
        }
    }

    /// Builder form of `enable_style`.
    pub fn with_style(mut self, style: Style) -> Self {
        self.enable_style(style);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn key(&self) -> Tonic {
        self.state.mode.tonic()
    }

    pub fn scale(&self) -> Scale {
        self.state.mode.scale()
    }

    pub fn active_moods(&self) -> Vec<Mood> {
        self.state.mode.moods().active()
    }

    /// The bundle computed on the most recent tick.
    pub fn parameters(&self) -> Option<&ParameterBundle> {
        self.last_parameters.as_ref()
    }

    pub fn style(&self) -> Style {
        self.profile.style()
    }

    pub fn style_name(&self) -> &'static str {
        self.style().name()
    }

    pub fn is_style_active(&self, style: Style) -> bool {
        self.style() == style
    }

    /// Switch to `style` by name. Unknown names leave the engine untouched
    /// and return `false`.
    pub fn set_style(&mut self, name: &str) -> bool {
        match name.parse::<Style>() {
            Ok(style) => {
                self.enable_style(style);
                true
            }
            Err(err) => {
                debug!(%err, "style change ignored");
                false
            }
        }
    }

    /// Replace the active profile. Takes effect from the next tick.
    pub fn enable_style(&mut self, style: Style) {
        let now = self.clock.now_ms();
        self.profile = style.profile(now, &mut self.rng);
        self.state
            .mode
            .enter_style(&self.profile.scale_policy(), self.profile.moods(), now);
        debug!(style = style.name(), scale = %self.state.mode.scale(), "style enabled");
    }

    /// Back to the default style.
    pub fn disable_style(&mut self) {
        self.enable_style(Style::Default);
    }

    /// The event a client should receive when the stream stops.
    pub fn all_notes_off(&self) -> MidiEvent {
        MidiEvent::AllNotesOff
    }

    /// Run one tick.
    pub fn generate_event(&mut self, weather: Option<&WeatherReading>) -> MidiEvent {
        let event = self.tick(weather);
        trace!(tick = self.state.ticks, kind = event.kind(), "event");
        event
    }

    fn tick(&mut self, weather: Option<&WeatherReading>) -> MidiEvent {
        let now = self.clock.now_ms();
        self.state.ticks += 1;

        let policy = self.profile.scale_policy();
        self.state
            .mode
            .advance(now, &policy, self.profile.moods(), &self.config, &mut self.rng);
        self.profile.advance(now, &mut self.rng);

        let WeatherMapping {
            mut bundle,
            scale_nudge,
        } = self
            .profile
            .compute_parameters(weather, &self.state.mode, &mut self.rng);
        self.state.mode.apply_nudge(scale_nudge, &policy);
        if let Some(silence) = self.config.silence_ms {
            bundle.silence = silence.within(&Span::new(1, u32::MAX));
        }

        let ctx = TickContext::new(now, &bundle, &self.state.mode);
        let event = self.sound(&ctx);
        self.last_parameters = Some(bundle);
        event
    }

    fn sound(&mut self, ctx: &TickContext<'_>) -> MidiEvent {
        if ctx.insect_burst && chance(&mut self.rng, self.config.insect_preempt_chance) {
            return MidiEvent::InsectBurst {
                notes: basic::insect_burst(ctx, &mut self.rng),
                current_key: ctx.tonic,
                current_scale: ctx.scale,
            };
        }

        if let Some(event) = self.profile.preempt(ctx, &mut self.rng) {
            return event;
        }

        if self.rng.random::<f64>() > ctx.bundle.density {
            return ctx.silence(&mut self.rng);
        }

        if let Some(pedal) = self
            .state
            .pedal
            .decide(ctx.now_ms, ctx.bundle, &self.config.pedal, &mut self.rng)
        {
            return MidiEvent::Pedal { pedal };
        }

        let choice = self.profile.choose_synthesizer(ctx, &mut self.rng);
        match self.profile.synthesize(choice, ctx, &mut self.rng) {
            Some(event) => event,
            None => {
                debug!(?choice, "synthesizer produced nothing; resting");
                ctx.silence(&mut self.rng)
            }
        }
    }

    /// Swap in an arbitrary profile.
    #[cfg(test)]
    pub(crate) fn install_profile(&mut self, profile: Box<dyn StyleProfile>) {
        let now = self.clock.now_ms();
        self.state
            .mode
            .enter_style(&profile.scale_policy(), profile.moods(), now);
        self.profile = profile;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::mode::ScalePolicy;
    use crate::params::PedalPalette;
    use crate::scale::KeyContext;
    use pretty_assertions::assert_eq;

    const TICK_MS: u64 = 120;

    fn manual(config: EngineConfig, seed: u64) -> (Engine<ManualClock, StdRng>, ManualClock) {
        let clock = ManualClock::new(0);
        let engine = Engine::with_parts(config, clock.clone(), StdRng::seed_from_u64(seed));
        (engine, clock)
    }

    fn run(
        engine: &mut Engine<ManualClock, StdRng>,
        clock: &ManualClock,
        ticks: usize,
        weather: Option<&WeatherReading>,
    ) -> Vec<MidiEvent> {
        (0..ticks)
            .map(|_| {
                clock.advance(TICK_MS);
                engine.generate_event(weather)
            })
            .collect()
    }

    #[test]
    fn same_seed_same_stream() {
        let (mut a, clock_a) = manual(EngineConfig::default(), 42);
        let (mut b, clock_b) = manual(EngineConfig::default(), 42);
        let rain = WeatherReading::new(12.0, 61, "rain");
        for style in [Style::Default, Style::Jungle, Style::Haunted, Style::Marbles] {
            a.enable_style(style);
            b.enable_style(style);
            let left = run(&mut a, &clock_a, 500, Some(&rain));
            let right = run(&mut b, &clock_b, 500, Some(&rain));
            assert_eq!(left, right);
        }
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn elevator_stays_major_and_gentle() {
        let (mut engine, clock) = manual(EngineConfig::default(), 7);
        engine = engine.with_style(Style::Elevator);
        let weathers = [
            None,
            Some(WeatherReading::new(-8.0, 71, "snow")),
            Some(WeatherReading::new(35.0, 95, "thunderstorm")),
        ];
        let mut sounded = 0;
        for weather in &weathers {
            for event in run(&mut engine, &clock, 1_500, weather.as_ref()) {
                if let Some((_, scale)) = event.context() {
                    assert_eq!(scale, Scale::Major, "{event:?}");
                }
                for n in event.notes() {
                    sounded += 1;
                    assert!((3..=6).contains(&n.octave), "{n:?}");
                    assert!((30..=90).contains(&n.velocity), "{n:?}");
                }
                if let MidiEvent::Pedal { pedal } = &event {
                    assert_ne!(pedal.kind, player_piano_protocol::PedalKind::Sostenuto);
                }
            }
        }
        assert!(sounded > 1_000);
        assert!(engine.active_moods().is_empty());
    }

    #[derive(Debug)]
    struct FixedDensity(f64);

    impl StyleProfile for FixedDensity {
        fn style(&self) -> Style {
            Style::Default
        }

        fn scale_policy(&self) -> ScalePolicy {
            ScalePolicy::pinned(Scale::Major)
        }

        fn base_parameters(&self) -> ParameterBundle {
            ParameterBundle {
                density: self.0,
                sustain_probability: 0.0,
                pedals: PedalPalette::NONE,
                ..ParameterBundle::default()
            }
        }
    }

    fn silence_fraction(density: f64) -> f64 {
        let (mut engine, clock) = manual(EngineConfig::calm(), 99);
        engine.install_profile(Box::new(FixedDensity(density)));
        let events = run(&mut engine, &clock, 4_000, None);
        let rests = events
            .iter()
            .filter(|e| matches!(e, MidiEvent::Silence { .. }))
            .count();
        rests as f64 / events.len() as f64
    }

    #[test]
    fn denser_bundles_rest_less() {
        let dense = silence_fraction(0.9);
        let sparse = silence_fraction(0.3);
        assert!(dense < sparse, "{dense} vs {sparse}");
        assert!((0.05..0.15).contains(&dense), "{dense}");
        assert!((0.65..0.75).contains(&sparse), "{sparse}");
    }

    #[test]
    fn freezing_clear_weather_leans_minor() {
        let freezing = WeatherReading::new(-5.0, 0, "clear");
        let mut minor = 0;
        for seed in 0..200 {
            let (mut engine, clock) = manual(EngineConfig::calm(), seed);
            clock.advance(TICK_MS);
            engine.generate_event(Some(&freezing));
            let bundle = engine.parameters().unwrap();
            assert!(bundle.tempo <= 70);
            assert!(bundle.octaves.min() <= 1);
            if engine.scale() == Scale::Minor {
                minor += 1;
            }
        }
        // p = 0.6 from major.
        assert!((90..=150).contains(&minor), "{minor}");
    }

    #[test]
    fn unknown_style_is_ignored() {
        let (mut engine, _clock) = manual(EngineConfig::default(), 1);
        assert!(!engine.set_style("polka"));
        assert_eq!(engine.style(), Style::Default);
        assert!(engine.set_style("Serialist"));
        assert!(engine.is_style_active(Style::Serialist));
        assert_eq!(engine.scale(), Scale::Chromatic);
        engine.disable_style();
        assert_eq!(engine.style_name(), "default");
        assert_eq!(engine.all_notes_off(), MidiEvent::AllNotesOff);
    }

    #[test]
    fn haunted_reports_atonal() {
        let (mut engine, clock) = manual(EngineConfig::default(), 3);
        assert!(engine.set_style("haunted"));
        assert_eq!(engine.key(), Tonic::Atonal);
        let mut furniture = 0;
        for event in run(&mut engine, &clock, 2_000, None) {
            if let Some((key, scale)) = event.context() {
                assert_eq!((key, scale), (Tonic::Atonal, Scale::Chromatic));
            }
            if matches!(event, MidiEvent::Furniture { .. }) {
                furniture += 1;
            }
        }
        assert!(furniture > 100);
    }

    #[test]
    fn every_style_keeps_the_note_contract() {
        for style in Style::ALL {
            let (mut engine, clock) = manual(EngineConfig::default(), 11);
            engine.enable_style(style);
            let hot = WeatherReading::new(31.0, 3, "overcast");
            for (i, event) in run(&mut engine, &clock, 3_000, Some(&hot)).into_iter().enumerate() {
                for n in event.notes() {
                    assert!(
                        n.velocity <= 127 && n.duration > 0 && n.midi_number > 0,
                        "{style}: {n:?}"
                    );
                    assert!(n.octave <= 8);
                }
                if event.is_chromatic_exception() {
                    continue;
                }
                let Some((tonic, scale)) = event.context() else {
                    continue;
                };
                if let Some(key) = tonic.pitch_class() {
                    let ctx = KeyContext::new(key, scale);
                    for n in event.notes() {
                        assert!(ctx.contains(n.midi_number), "{style} tick {i}: {event:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn insect_burst_mood_preempts() {
        let mut config = EngineConfig::calm();
        config.insect_burst.chance = 1.0;
        config.insect_preempt_chance = 1.0;
        let (mut engine, clock) = manual(config, 5);
        let events = run(&mut engine, &clock, 20, None);
        assert!(engine.active_moods().contains(&Mood::InsectBurst));
        assert!(events.iter().all(|e| matches!(e, MidiEvent::InsectBurst { .. })));
    }

    #[test]
    fn silence_band_override() {
        let mut config = EngineConfig::calm();
        config.silence_ms = Some(Span::new(1_000, 1_000));
        let (mut engine, clock) = manual(config, 8);
        for event in run(&mut engine, &clock, 500, None) {
            if let MidiEvent::Silence { duration } = event {
                assert_eq!(duration, 1_000);
            }
        }
    }
}
