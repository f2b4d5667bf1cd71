// Pedal decisions.
//
// Three pedals, one controller. Sustain has hysteresis: while enabled, a
// small per-tick chance disables it, which emits an explicit sustain release
// and starts a cooldown (drawn once, 15–30 s by default). Sustain-on is never
// emitted during the cooldown; once it has elapsed the pedal re-enables on
// the next tick.
//
// Pedal choice uses three disjoint bands of a single uniform draw `r`,
// scaled by the bundle's `sustain_probability` p:
//
//     [0, p)    sustain 0.5–1.0 (only while enabled)
//     [p, 2p)   sostenuto 1.0
//     [2p, 3p)  soft 0.3–1.0
//
// Anything else (or a band whose pedal the style's palette forbids) means no
// pedal event this tick.

use player_piano_protocol::{Pedal, PedalKind};
use rand::Rng;
use tracing::debug;

use crate::config::PedalConfig;
use crate::params::{ParameterBundle, chance};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PedalController {
    sustain_enabled: bool,
    last_off_ms: u64,
    cooldown_ms: u64,
}

impl Default for PedalController {
    fn default() -> Self {
        Self {
            sustain_enabled: true,
            last_off_ms: 0,
            cooldown_ms: 0,
        }
    }
}

impl PedalController {
    pub fn sustain_enabled(&self) -> bool {
        self.sustain_enabled
    }

    /// Time at which sustain was last disabled.
    pub fn last_off_ms(&self) -> u64 {
        self.last_off_ms
    }

    /// Decide this tick's pedal event, if any.
    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        now_ms: u64,
        bundle: &ParameterBundle,
        config: &PedalConfig,
        rng: &mut R,
    ) -> Option<Pedal> {
        if !self.sustain_enabled {
            if now_ms.saturating_sub(self.last_off_ms) > self.cooldown_ms {
                self.sustain_enabled = true;
                debug!(after_ms = now_ms - self.last_off_ms, "sustain re-enabled");
            }
        } else if chance(rng, config.disable_chance) {
            self.sustain_enabled = false;
            self.last_off_ms = now_ms;
            self.cooldown_ms = config.cooldown_ms.sample(rng);
            debug!(cooldown_ms = self.cooldown_ms, "sustain disabled");
            if bundle.pedals.allows(PedalKind::Sustain) {
                return Some(Pedal::release(PedalKind::Sustain));
            }
            return None;
        }

        let p = bundle.sustain_probability;
        let r: f64 = rng.random();
        let kind = if r < p {
            PedalKind::Sustain
        } else if r < 2.0 * p {
            PedalKind::Sostenuto
        } else if r < 3.0 * p {
            PedalKind::Soft
        } else {
            return None;
        };
        if !bundle.pedals.allows(kind) {
            return None;
        }
        match kind {
            PedalKind::Sustain if self.sustain_enabled => {
                Some(Pedal::new(kind, rng.random_range(0.5..=1.0)))
            }
            PedalKind::Sustain => None,
            PedalKind::Sostenuto => Some(Pedal::new(kind, 1.0)),
            PedalKind::Soft => Some(Pedal::new(kind, rng.random_range(0.3..=1.0))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::params::PedalPalette;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pedal_heavy() -> ParameterBundle {
        ParameterBundle {
            sustain_probability: 0.33,
            ..ParameterBundle::default()
        }
    }

    #[test]
    fn no_sustain_on_during_cooldown() {
        let clock = ManualClock::new(10_000);
        let mut rng = StdRng::seed_from_u64(11);
        let mut pedal = PedalController::default();
        let bundle = pedal_heavy();

        let disable_now = PedalConfig {
            disable_chance: 1.0,
            ..PedalConfig::default()
        };
        let off = pedal.decide(clock.now_ms(), &bundle, &disable_now, &mut rng);
        assert_eq!(off, Some(Pedal::release(PedalKind::Sustain)));
        let off_at = clock.now_ms();

        let never_disable = PedalConfig {
            disable_chance: 0.0,
            ..PedalConfig::default()
        };
        let mut other_pedals = 0;
        while clock.now_ms() - off_at < 15_000 {
            if let Some(p) = pedal.decide(clock.now_ms(), &bundle, &never_disable, &mut rng) {
                assert_ne!(p.kind, PedalKind::Sustain, "sustain at +{}ms", clock.now_ms() - off_at);
                other_pedals += 1;
            }
            clock.advance(100);
        }
        assert!(other_pedals > 0);

        // Past the longest cooldown sustain comes back.
        clock.set(off_at + 30_001);
        let mut sustain_on = 0;
        for _ in 0..200 {
            if let Some(p) = pedal.decide(clock.now_ms(), &bundle, &never_disable, &mut rng) {
                if p.kind == PedalKind::Sustain {
                    assert!(p.value >= 0.5);
                    sustain_on += 1;
                }
            }
        }
        assert!(pedal.sustain_enabled());
        assert!(sustain_on > 0);
    }

    #[test]
    fn palette_filters_pedals() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut pedal = PedalController::default();
        let bundle = ParameterBundle {
            pedals: PedalPalette::SUSTAIN_AND_SOFT,
            ..pedal_heavy()
        };
        let config = PedalConfig::default();
        for t in 0..2_000 {
            if let Some(p) = pedal.decide(t * 120, &bundle, &config, &mut rng) {
                assert_ne!(p.kind, PedalKind::Sostenuto);
            }
        }
    }

    #[test]
    fn zero_probability_means_no_pedals() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut pedal = PedalController::default();
        let bundle = ParameterBundle {
            sustain_probability: 0.0,
            ..ParameterBundle::default()
        };
        let config = PedalConfig {
            disable_chance: 0.0,
            ..PedalConfig::default()
        };
        for t in 0..1_000 {
            assert_eq!(pedal.decide(t, &bundle, &config, &mut rng), None);
        }
    }

    #[test]
    fn values_in_documented_bands() {
        let mut rng = StdRng::seed_from_u64(14);
        let mut pedal = PedalController::default();
        let config = PedalConfig {
            disable_chance: 0.0,
            ..PedalConfig::default()
        };
        for t in 0..2_000 {
            if let Some(p) = pedal.decide(t, &pedal_heavy(), &config, &mut rng) {
                match p.kind {
                    PedalKind::Sustain => assert!((0.5..=1.0).contains(&p.value)),
                    PedalKind::Sostenuto => assert_eq!(p.value, 1.0),
                    PedalKind::Soft => assert!((0.3..=1.0).contains(&p.value)),
                }
            }
        }
    }
}
