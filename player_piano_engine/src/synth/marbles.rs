// Marbles dropped onto the piano.
//
// Each marble falls under gravity from 0.3–1.5 m and bounces off the keys,
// losing energy on every impact (coefficient of restitution 0.55–0.85).
// Between ticks the run integrates every marble in fixed substeps of at most
// 1 ms; each impact queues a `Bounce`. A marble is removed once its rebound
// speed drops below 0.3 m/s.
//
// Bounces sound one scale degree higher each time, and the weaker the
// impact the higher the octave, the softer the velocity and the shorter
// the note, so a marble's run reads as a quickening, rising, fading figure.

use std::collections::VecDeque;

use player_piano_protocol::Note;
use rand::Rng;
use tracing::debug;

use crate::params::{Span, chance};
use crate::scale::KeyContext;

pub const GRAVITY: f64 = 9.81;

const SUBSTEP_S: f64 = 0.001;
/// Longest gap integrated in one go; a stalled clock does not replay minutes
/// of physics.
const MAX_STEP_S: f64 = 2.0;
const REST_SPEED: f64 = 0.3;
/// Impact speed that maps to full force; a 1.5 m drop lands at ~5.4 m/s.
const FULL_IMPACT: f64 = 5.5;

const SPAWN_CHANCE: f64 = 0.03;
const MAX_MARBLES: usize = 4;
const MAX_PENDING: usize = 8;

#[derive(Clone, Debug, PartialEq)]
struct Marble {
    height_m: f64,
    velocity_mps: f64,
    restitution: f64,
    degree: usize,
    bounces: usize,
}

/// One impact waiting to be played.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounce {
    pub degree: usize,
    pub impact_mps: f64,
}

impl Bounce {
    /// Impact strength in `[0, 1]`.
    pub fn energy(&self) -> f64 {
        (self.impact_mps / FULL_IMPACT).clamp(0.0, 1.0)
    }

    /// The bounce as a note in `key`, within `octaves`.
    pub fn note(&self, key: &KeyContext, octaves: Span<u8>) -> Note {
        let energy = self.energy();
        let spread = f64::from(octaves.max() - octaves.min());
        let octave = octaves.min() + ((1.0 - energy) * spread).round() as u8;
        let velocity = (25.0 + energy * 95.0).round() as u8;
        let duration = (80.0 + energy * 520.0).round() as u32;
        key.note(self.degree, octave, octaves.max(), velocity, duration)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarbleRun {
    marbles: Vec<Marble>,
    pending: VecDeque<Bounce>,
    last_ms: Option<u64>,
}

impl MarbleRun {
    pub fn in_flight(&self) -> usize {
        self.marbles.len()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop a marble now.
    pub fn drop_marble<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let height_m = rng.random_range(0.3..=1.5);
        debug!(height_m, "marble dropped");
        self.marbles.push(Marble {
            height_m,
            velocity_mps: 0.0,
            restitution: rng.random_range(0.55..=0.85),
            degree: rng.random_range(0..7),
            bounces: 0,
        });
    }

    /// Integrate up to `now_ms`, then maybe drop a new marble.
    pub fn advance<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) {
        let elapsed_s = match self.last_ms {
            Some(last) => (now_ms.saturating_sub(last) as f64 / 1000.0).min(MAX_STEP_S),
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        self.integrate(elapsed_s);

        if self.marbles.len() < MAX_MARBLES && chance(rng, SPAWN_CHANCE) {
            self.drop_marble(rng);
        }
    }

    fn integrate(&mut self, seconds: f64) {
        let mut remaining = seconds;
        while remaining > 0.0 {
            let dt = remaining.min(SUBSTEP_S);
            self.step(dt);
            remaining -= dt;
        }
    }

    fn step(&mut self, dt: f64) {
        let pending = &mut self.pending;
        self.marbles.retain_mut(|m| {
            m.velocity_mps -= GRAVITY * dt;
            m.height_m += m.velocity_mps * dt;
            if m.height_m > 0.0 || m.velocity_mps >= 0.0 {
                return true;
            }
            let impact = -m.velocity_mps;
            if pending.len() < MAX_PENDING {
                pending.push_back(Bounce {
                    degree: m.degree + m.bounces,
                    impact_mps: impact,
                });
            }
            m.bounces += 1;
            m.height_m = 0.0;
            m.velocity_mps = impact * m.restitution;
            m.velocity_mps >= REST_SPEED
        });
    }

    /// The oldest queued bounce.
    pub fn next_bounce(&mut self) -> Option<Bounce> {
        self.pending.pop_front()
    }
}
