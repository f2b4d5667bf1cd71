// The mode state machine: key, scale and moods.
//
// `ModeMachine` holds the musical context that persists between ticks:
//
// - the current key (a pitch class, or atonal for styles that ignore
//   tonality),
// - the current scale,
// - the active mood set (see `mood.rs`),
// - when the key or scale last rotated.
//
// What the machine may do with the scale is governed by the active style's
// `ScalePolicy`. Styles that pin their scale (elevator, serialist, haunted)
// reject weather nudges, chaotic-mood scale swaps and scale rotation; styles
// that drift rotate among their preferred pool, or among the chaotic pools
// while the chaotic mood is active.
//
// Rotation: once the gate has elapsed since the last change (3 minutes, or
// 30 s while chaotic), a per-tick trial (1 %, or 5 % while chaotic) picks
// one of three equally likely changes: new key, new scale, or both.

use player_piano_protocol::{Scale, Tonic};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::config::EngineConfig;
use crate::mood::{Mood, MoodSet};
use crate::params::chance;
use crate::scale::{CHAOTIC_ROTATION, CHAOTIC_SCALES, KeyContext};

/// How a style constrains key and scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePolicy {
    /// Scale adopted when the style is entered.
    pub start: Scale,
    /// Candidates for scale rotation.
    pub pool: &'static [Scale],
    /// Whether anything may move the scale away from `start`.
    pub drift: bool,
    /// Report the key as atonal and never rotate it.
    pub atonal: bool,
}

impl ScalePolicy {
    /// A style that stays on one scale.
    pub const fn pinned(scale: Scale) -> Self {
        Self {
            start: scale,
            pool: &[],
            drift: false,
            atonal: false,
        }
    }

    /// A style that wanders among `pool`, starting on `start`.
    pub const fn drifting(start: Scale, pool: &'static [Scale]) -> Self {
        Self {
            start,
            pool,
            drift: true,
            atonal: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeMachine {
    key: u8,
    scale: Scale,
    atonal: bool,
    moods: MoodSet,
    last_change_ms: u64,
}

impl ModeMachine {
    /// Start in a uniformly random key on the policy's start scale.
    pub fn new<R: Rng + ?Sized>(policy: &ScalePolicy, now_ms: u64, rng: &mut R) -> Self {
        Self {
            key: rng.random_range(0..12),
            scale: policy.start,
            atonal: policy.atonal,
            moods: MoodSet::default(),
            last_change_ms: now_ms,
        }
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// The key as reported on events.
    pub fn tonic(&self) -> Tonic {
        if self.atonal {
            Tonic::Atonal
        } else {
            Tonic::pitch(self.key)
        }
    }

    /// The key context synthesizers draw pitches from. Atonal styles use the
    /// full chromatic set.
    pub fn key_context(&self) -> KeyContext {
        if self.atonal {
            KeyContext::new(0, Scale::Chromatic)
        } else {
            KeyContext::new(self.key, self.scale)
        }
    }

    pub fn moods(&self) -> &MoodSet {
        &self.moods
    }

    pub fn moods_mut(&mut self) -> &mut MoodSet {
        &mut self.moods
    }

    pub fn is_chaotic(&self) -> bool {
        self.moods.is_active(Mood::Chaotic)
    }

    /// Re-seat the machine for a newly selected style. The key survives; the
    /// scale resets unless the new style drifts and already contains it.
    pub fn enter_style(&mut self, policy: &ScalePolicy, permitted: &[Mood], now_ms: u64) {
        self.atonal = policy.atonal;
        if !policy.drift || !policy.pool.contains(&self.scale) {
            self.scale = policy.start;
        }
        for mood in Mood::ALL {
            if !permitted.contains(&mood) {
                self.moods.deactivate(mood);
            }
        }
        self.last_change_ms = now_ms;
    }

    /// One tick of mood and rotation logic.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        now_ms: u64,
        policy: &ScalePolicy,
        permitted: &[Mood],
        config: &EngineConfig,
        rng: &mut R,
    ) {
        let entered = self.moods.advance(now_ms, permitted, config, rng);
        if entered.contains(&Mood::Chaotic) && policy.drift {
            let scale = CHAOTIC_SCALES[rng.random_range(0..CHAOTIC_SCALES.len())];
            self.set_scale(scale, "chaotic mood");
        }
        self.maybe_rotate(now_ms, policy, config, rng);
    }

    fn maybe_rotate<R: Rng + ?Sized>(
        &mut self,
        now_ms: u64,
        policy: &ScalePolicy,
        config: &EngineConfig,
        rng: &mut R,
    ) {
        let chaotic = self.is_chaotic();
        let (gate_ms, p) = if chaotic {
            (config.rotation.chaotic_interval_ms, config.rotation.chaotic_chance)
        } else {
            (config.rotation.interval_ms, config.rotation.chance)
        };
        if now_ms.saturating_sub(self.last_change_ms) <= gate_ms || !chance(rng, p) {
            return;
        }

        let rotate_key = !policy.atonal;
        match rng.random_range(0..3) {
            0 => {
                if rotate_key {
                    self.set_key(rng.random_range(0..12));
                }
            }
            1 => {
                let pool: &[Scale] = if chaotic && policy.drift {
                    &CHAOTIC_ROTATION
                } else {
                    policy.pool
                };
                self.rotate_scale(pool, policy, rng);
            }
            _ => {
                if rotate_key {
                    self.set_key(rng.random_range(0..12));
                }
                let pool: &[Scale] = if chaotic && policy.drift {
                    &CHAOTIC_SCALES
                } else {
                    policy.pool
                };
                self.rotate_scale(pool, policy, rng);
            }
        }
        self.last_change_ms = now_ms;
    }

    fn rotate_scale<R: Rng + ?Sized>(&mut self, pool: &[Scale], policy: &ScalePolicy, rng: &mut R) {
        if !policy.drift {
            return;
        }
        if let Some(&scale) = pool.choose(rng) {
            self.set_scale(scale, "rotation");
        }
    }

    /// Apply a weather suggestion if the style lets the scale drift.
    pub fn apply_nudge(&mut self, nudge: Option<Scale>, policy: &ScalePolicy) {
        if let Some(scale) = nudge.filter(|_| policy.drift) {
            self.set_scale(scale, "weather");
        }
    }

    fn set_key(&mut self, key: u8) {
        if key != self.key {
            debug!(from = self.key, to = key, "key change");
        }
        self.key = key % 12;
    }

    fn set_scale(&mut self, scale: Scale, cause: &'static str) {
        if scale != self.scale {
            debug!(from = %self.scale, to = %scale, cause, "scale change");
        }
        self.scale = scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Span;
    use crate::scale::IMPRESSIONIST_SCALES;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const IMPRESSIONIST: ScalePolicy =
        ScalePolicy::drifting(Scale::WholeTone, &IMPRESSIONIST_SCALES);
    const ELEVATOR: ScalePolicy = ScalePolicy::pinned(Scale::Major);

    fn eager_rotation() -> EngineConfig {
        let mut config = EngineConfig::calm();
        config.rotation.interval_ms = 0;
        config.rotation.chance = 1.0;
        config
    }

    #[test]
    fn initial_key_is_random_and_scale_is_start() {
        let mut keys = std::collections::BTreeSet::new();
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let m = ModeMachine::new(&IMPRESSIONIST, 0, &mut rng);
            assert_eq!(m.scale(), Scale::WholeTone);
            assert!(m.key() < 12);
            keys.insert(m.key());
        }
        assert!(keys.len() > 6);
    }

    #[test]
    fn rotation_waits_for_the_gate() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut config = EngineConfig::calm();
        config.rotation.chance = 1.0;
        let mut m = ModeMachine::new(&IMPRESSIONIST, 0, &mut rng);
        let before = (m.key(), m.scale());
        for t in (0..=180_000).step_by(1_000) {
            m.advance(t, &IMPRESSIONIST, &[], &config, &mut rng);
        }
        assert_eq!((m.key(), m.scale()), before);
    }

    #[test]
    fn rotation_fires_once_the_gate_opens() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut config = EngineConfig::calm();
        config.rotation.chance = 1.0;
        let mut m = ModeMachine::new(&IMPRESSIONIST, 0, &mut rng);
        for t in (0..=180_000).step_by(1_000) {
            m.advance(t, &IMPRESSIONIST, &[], &config, &mut rng);
            assert_eq!(m.last_change_ms, 0, "rotated at {t}");
        }
        m.advance(180_001, &IMPRESSIONIST, &[], &config, &mut rng);
        assert_eq!(m.last_change_ms, 180_001);

        // The gate restarts from the change.
        m.advance(200_000, &IMPRESSIONIST, &[], &config, &mut rng);
        assert_eq!(m.last_change_ms, 180_001);
    }

    #[test]
    fn chaotic_mood_shortens_the_gate() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut config = EngineConfig::calm();
        config.rotation.chance = 0.0;
        config.rotation.chaotic_chance = 1.0;
        config.chaotic.duration_ms = Span::new(600_000, 600_000);
        let mut m = ModeMachine::new(&IMPRESSIONIST, 0, &mut rng);
        m.moods_mut().activate(Mood::Chaotic, 0, &config, &mut rng);

        for t in (0..=30_000).step_by(1_000) {
            m.advance(t, &IMPRESSIONIST, &[Mood::Chaotic], &config, &mut rng);
            assert_eq!(m.last_change_ms, 0, "rotated at {t}");
        }
        m.advance(30_001, &IMPRESSIONIST, &[Mood::Chaotic], &config, &mut rng);
        assert!(m.is_chaotic());
        assert_eq!(m.last_change_ms, 30_001);
    }

    #[test]
    fn rotation_stays_in_pool() {
        let mut rng = StdRng::seed_from_u64(2);
        let config = eager_rotation();
        let mut m = ModeMachine::new(&IMPRESSIONIST, 0, &mut rng);
        for t in 1..500 {
            m.advance(t, &IMPRESSIONIST, &[], &config, &mut rng);
            assert!(IMPRESSIONIST_SCALES.contains(&m.scale()), "{}", m.scale());
        }
    }

    #[test]
    fn pinned_scale_never_moves() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut config = eager_rotation();
        config.chaotic.chance = 1.0;
        let mut m = ModeMachine::new(&ELEVATOR, 0, &mut rng);
        for t in 1..300 {
            m.advance(t, &ELEVATOR, &[Mood::Chaotic], &config, &mut rng);
            m.apply_nudge(Some(Scale::Minor), &ELEVATOR);
            assert_eq!(m.scale(), Scale::Major);
        }
    }

    #[test]
    fn chaotic_entry_swaps_to_a_chaotic_scale() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut config = EngineConfig::calm();
        config.chaotic.chance = 1.0;
        let policy = ScalePolicy::drifting(Scale::Major, &Scale::ALL);
        let mut m = ModeMachine::new(&policy, 0, &mut rng);
        m.advance(1, &policy, &Mood::ALL, &config, &mut rng);
        assert!(m.is_chaotic());
        assert!(CHAOTIC_SCALES.contains(&m.scale()));
    }

    #[test]
    fn atonal_policy_reports_atonal_and_uses_chromatic() {
        let policy = ScalePolicy {
            atonal: true,
            ..ScalePolicy::pinned(Scale::Chromatic)
        };
        let mut rng = StdRng::seed_from_u64(5);
        let m = ModeMachine::new(&policy, 0, &mut rng);
        assert_eq!(m.tonic(), Tonic::Atonal);
        assert_eq!(m.key_context().pitch_classes().len(), 12);
    }

    #[test]
    fn entering_a_pinned_style_resets_scale_and_moods() {
        let mut rng = StdRng::seed_from_u64(6);
        let config = EngineConfig::default();
        let policy = ScalePolicy::drifting(Scale::Minor, &Scale::ALL);
        let mut m = ModeMachine::new(&policy, 0, &mut rng);
        m.moods_mut().activate(Mood::Hardcore, 0, &config, &mut rng);
        m.enter_style(&ELEVATOR, &[], 10);
        assert_eq!(m.scale(), Scale::Major);
        assert!(m.moods().active().is_empty());
    }
}
