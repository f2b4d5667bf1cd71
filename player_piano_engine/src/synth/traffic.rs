// Street traffic: cars passing the listener.
//
// The listener stands at the origin. A car drives along a straight road
// offset `lateral_m` to the side, from `-approach_m` to `+approach_m`, at a
// constant speed. Its engine tone is heard Doppler-shifted by the radial
// component of its velocity:
//
//     shift (semitones) = 12 * log2(c / (c - v_r))
//
// with `v_r` positive while the car approaches, so pitch sits sharp on the
// way in, crosses zero at closest approach and falls flat on the way out.
// Loudness falls off with distance, relative to the closest approach.

use player_piano_protocol::Note;
use rand::Rng;
use tracing::debug;

use crate::params::{Span, chance};

/// Speed of sound in air, m/s.
pub const SPEED_OF_SOUND: f64 = 343.0;

const SPAWN_CHANCE: f64 = 0.02;
const MAX_CARS: usize = 3;

/// Offset between the two samples taken of each car per event.
pub const SAMPLE_GAP_MS: u64 = 150;

#[derive(Clone, Debug, PartialEq)]
pub struct Car {
    spawned_ms: u64,
    speed_mps: f64,
    lateral_m: f64,
    approach_m: f64,
    /// Engine tone at rest, as a fractional MIDI number.
    base_pitch: f64,
    /// Velocity at closest approach.
    loudness: u8,
}

impl Car {
    pub fn spawn<R: Rng + ?Sized>(now_ms: u64, rng: &mut R) -> Self {
        Self {
            spawned_ms: now_ms,
            speed_mps: rng.random_range(8.0..=25.0),
            lateral_m: rng.random_range(4.0..=10.0),
            approach_m: rng.random_range(60.0..=120.0),
            base_pitch: f64::from(rng.random_range(40u8..=55)),
            loudness: rng.random_range(70..=115),
        }
    }

    /// Position along the road; negative before the car reaches the
    /// listener.
    pub fn position_m(&self, now_ms: u64) -> f64 {
        let t = now_ms.saturating_sub(self.spawned_ms) as f64 / 1000.0;
        -self.approach_m + self.speed_mps * t
    }

    fn distance_m(&self, x: f64) -> f64 {
        x.hypot(self.lateral_m)
    }

    /// Velocity component toward the listener.
    pub fn radial_velocity(&self, now_ms: u64) -> f64 {
        let x = self.position_m(now_ms);
        -self.speed_mps * x / self.distance_m(x)
    }

    pub fn doppler_semitones(&self, now_ms: u64) -> f64 {
        doppler_semitones(self.radial_velocity(now_ms))
    }

    pub fn has_passed(&self, now_ms: u64) -> bool {
        self.position_m(now_ms) > self.approach_m
    }

    /// The car's engine note as heard at `now_ms`.
    pub fn sound(&self, now_ms: u64, duration_ms: u32) -> Note {
        let pitch = (self.base_pitch + self.doppler_semitones(now_ms))
            .round()
            .clamp(12.0, 119.0) as u8;
        let x = self.position_m(now_ms);
        let falloff = self.lateral_m / self.distance_m(x);
        let velocity = (f64::from(self.loudness) * falloff).round().clamp(10.0, 127.0) as u8;
        Note::from_midi(pitch, velocity, duration_ms)
    }
}

/// Semitone shift heard for a source closing at `radial_mps`.
pub fn doppler_semitones(radial_mps: f64) -> f64 {
    12.0 * (SPEED_OF_SOUND / (SPEED_OF_SOUND - radial_mps)).log2()
}

/// The cars currently on the road.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Street {
    cars: Vec<Car>,
}

impl Street {
    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    /// Retire cars that have driven out of earshot and maybe spawn one.
    pub fn advance<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) {
        let before = self.cars.len();
        self.cars.retain(|car| !car.has_passed(now_ms));
        if self.cars.len() < before {
            debug!(remaining = self.cars.len(), "car gone");
        }
        if self.cars.len() < MAX_CARS && chance(rng, SPAWN_CHANCE) {
            let car = Car::spawn(now_ms, rng);
            debug!(speed_mps = car.speed_mps, lateral_m = car.lateral_m, "car spawned");
            self.cars.push(car);
        }
    }

    /// Two samples of every car's engine tone, one now and one a moment
    /// later, so a fast pass audibly bends.
    pub fn pass_by<R: Rng + ?Sized>(&self, now_ms: u64, rng: &mut R) -> Vec<Note> {
        let duration = Span::new(150u32, 300);
        self.cars
            .iter()
            .flat_map(|car| [now_ms, now_ms + SAMPLE_GAP_MS].map(|t| (car, t)))
            .map(|(car, t)| car.sound(t, duration.sample(rng)))
            .collect()
    }
}
