// Layered moods.
//
// Moods sit on top of the active style and are independent of each other:
// any subset may be active at once. Each tick, every mood the style permits
// and that is currently off gets a Bernoulli trial to switch on; on
// activation it draws its lifetime once, and it switches off when that much
// time has elapsed.
//
// While active, a mood overrides parameter fields after weather has been
// applied (chaotic first, then insect burst, then hardcore, so later moods
// win where they overlap). The chaotic mood also swaps the scale on entry
// and speeds up key/scale rotation; that part lives in `mode.rs`.

use std::fmt;

use rand::Rng;
use tracing::debug;

use crate::config::{EngineConfig, MoodTiming};
use crate::params::{ParameterBundle, Span, chance};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mood {
    Chaotic,
    InsectBurst,
    Hardcore,
}

impl Mood {
    pub const ALL: [Mood; 3] = [Mood::Chaotic, Mood::InsectBurst, Mood::Hardcore];

    pub fn name(self) -> &'static str {
        match self {
            Mood::Chaotic => "chaotic",
            Mood::InsectBurst => "insectBurst",
            Mood::Hardcore => "hardcore",
        }
    }

    /// Case-insensitive lookup; unknown names give `None`.
    pub fn from_name(name: &str) -> Option<Mood> {
        Mood::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name.trim()))
    }

    fn index(self) -> usize {
        self as usize
    }

    fn timing(self, config: &EngineConfig) -> &MoodTiming {
        match self {
            Mood::Chaotic => &config.chaotic,
            Mood::InsectBurst => &config.insect_burst,
            Mood::Hardcore => &config.hardcore,
        }
    }

    /// Apply this mood's parameter overrides.
    pub fn apply(self, bundle: &mut ParameterBundle) {
        match self {
            Mood::Chaotic => {
                bundle.velocity = Span::new(20, 127);
                bundle.duration = Span::new(50, 4000);
                bundle.density = 0.9;
                bundle.sustain_probability = 0.2;
            }
            Mood::InsectBurst => {
                bundle.duration = Span::new(50, 200);
                bundle.density = 0.95;
                bundle.velocity = Span::new(60, 110);
            }
            Mood::Hardcore => {
                bundle.tempo = 160;
                bundle.velocity = Span::new(90, 127);
                bundle.duration = Span::new(100, 800);
                bundle.density = 0.85;
            }
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Activation {
    since_ms: u64,
    lasts_ms: u64,
}

/// Which moods are on, and since when.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoodSet {
    slots: [Option<Activation>; 3],
}

impl MoodSet {
    pub fn is_active(&self, mood: Mood) -> bool {
        self.slots[mood.index()].is_some()
    }

    /// Active moods in declaration order.
    pub fn active(&self) -> Vec<Mood> {
        Mood::ALL.into_iter().filter(|&m| self.is_active(m)).collect()
    }

    /// Switch a mood on now, drawing its lifetime from the config. Already
    /// active moods keep their original activation.
    pub fn activate<R: Rng + ?Sized>(
        &mut self,
        mood: Mood,
        now_ms: u64,
        config: &EngineConfig,
        rng: &mut R,
    ) {
        let slot = &mut self.slots[mood.index()];
        if slot.is_none() {
            let lasts_ms = mood.timing(config).duration_ms.sample(rng);
            debug!(mood = mood.name(), lasts_ms, "mood on");
            *slot = Some(Activation {
                since_ms: now_ms,
                lasts_ms,
            });
        }
    }

    pub fn deactivate(&mut self, mood: Mood) {
        if self.slots[mood.index()].take().is_some() {
            debug!(mood = mood.name(), "mood off");
        }
    }

    /// Expire finished moods, then run the onset trial for every permitted
    /// mood that is off. Moods not in `permitted` are switched off. Returns
    /// the moods that switched on this tick.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        now_ms: u64,
        permitted: &[Mood],
        config: &EngineConfig,
        rng: &mut R,
    ) -> Vec<Mood> {
        let mut entered = Vec::new();
        for mood in Mood::ALL {
            if !permitted.contains(&mood) {
                self.deactivate(mood);
                continue;
            }
            let slot = self.slots[mood.index()];
            match slot {
                Some(a) if now_ms.saturating_sub(a.since_ms) > a.lasts_ms => self.deactivate(mood),
                Some(_) => {}
                None => {
                    if chance(rng, mood.timing(config).chance) {
                        self.activate(mood, now_ms, config, rng);
                        entered.push(mood);
                    }
                }
            }
        }
        entered
    }

    /// Layer the overrides of every active mood onto `bundle`.
    pub fn apply(&self, mut bundle: ParameterBundle) -> ParameterBundle {
        for mood in self.active() {
            mood.apply(&mut bundle);
        }
        bundle
    }
}
