// Jungle animal calls.
//
// Each animal keeps its own call schedule: after calling, its next call is
// drawn from its interval band. When one animal calls there is a chance a
// different animal answers shortly after (its next call is pulled forward to
// 0.3–0.9 s away), which is what gives the canopy its call-and-response feel.
//
// Call shapes are fixed per animal and are chromatic (raw MIDI numbers, not
// scale degrees), which is why `AnimalCall` events are exempt from key
// membership checks.

use player_piano_protocol::{Animal, Note};
use rand::Rng;
use tracing::trace;

use crate::params::{Span, chance};

/// Chance that a call prompts an answer from another animal.
const ANSWER_CHANCE: f64 = 0.4;
/// How soon an answer follows the call.
const ANSWER_DELAY_MS: (u64, u64) = (300, 900);

struct Voice {
    register: Span<u8>,
    notes: Span<usize>,
    duration: Span<u32>,
    velocity: Span<u8>,
    interval_ms: Span<u64>,
}

fn voice(animal: Animal) -> Voice {
    match animal {
        Animal::Parrot => Voice {
            register: Span::new(72, 96),
            notes: Span::new(2, 4),
            duration: Span::new(60, 150),
            velocity: Span::new(70, 110),
            interval_ms: Span::new(4_000, 12_000),
        },
        Animal::Monkey => Voice {
            register: Span::new(60, 84),
            notes: Span::new(4, 8),
            duration: Span::new(80, 160),
            velocity: Span::new(80, 120),
            interval_ms: Span::new(6_000, 20_000),
        },
        Animal::Frog => Voice {
            register: Span::new(36, 52),
            notes: Span::new(1, 3),
            duration: Span::new(150, 400),
            velocity: Span::new(50, 80),
            interval_ms: Span::new(3_000, 9_000),
        },
        Animal::Toucan => Voice {
            register: Span::new(70, 85),
            notes: Span::new(2, 3),
            duration: Span::new(200, 350),
            velocity: Span::new(60, 90),
            interval_ms: Span::new(8_000, 25_000),
        },
        Animal::Cricket => Voice {
            register: Span::new(96, 108),
            notes: Span::new(6, 12),
            duration: Span::new(30, 60),
            velocity: Span::new(40, 70),
            interval_ms: Span::new(2_000, 6_000),
        },
    }
}

/// The notes of one call.
pub fn call<R: Rng + ?Sized>(animal: Animal, rng: &mut R) -> Vec<Note> {
    let v = voice(animal);
    let count = v.notes.sample(rng);
    let note = |midi: u8, rng: &mut R| {
        Note::from_midi(midi, v.velocity.sample(rng), v.duration.sample(rng))
    };
    match animal {
        // Squawks leaping anywhere in the register.
        Animal::Parrot => (0..count).map(|_| note(v.register.sample(rng), rng)).collect(),
        // Two pitches a few semitones apart, alternating.
        Animal::Monkey => {
            let low = v.register.sample(rng);
            let high = v.register.clamp(low.saturating_add(rng.random_range(2..=5)));
            (0..count)
                .map(|i| note(if i % 2 == 0 { low } else { high }, rng))
                .collect()
        }
        // One pitch repeated: a croak or a chirp.
        Animal::Frog | Animal::Cricket => {
            let pitch = v.register.sample(rng);
            (0..count).map(|_| note(pitch, rng)).collect()
        }
        // Falling by thirds and fourths.
        Animal::Toucan => {
            let mut pitch = v.register.sample(rng);
            let mut notes = Vec::with_capacity(count);
            for _ in 0..count {
                notes.push(note(pitch, rng));
                pitch = pitch.saturating_sub(rng.random_range(3..=5));
            }
            notes
        }
    }
}

/// Per-animal call schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canopy {
    next_call_ms: [u64; 5],
}

impl Canopy {
    pub fn new<R: Rng + ?Sized>(now_ms: u64, rng: &mut R) -> Self {
        let mut next_call_ms = [0; 5];
        for (slot, animal) in next_call_ms.iter_mut().zip(Animal::ALL) {
            *slot = now_ms + voice(animal).interval_ms.sample(rng);
        }
        Self { next_call_ms }
    }

    pub fn next_call_ms(&self, animal: Animal) -> u64 {
        self.next_call_ms[animal as usize]
    }

    /// The most overdue animal, if any call is due. Its next call is
    /// rescheduled and another animal may be lined up to answer.
    pub fn due<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) -> Option<Animal> {
        let (index, _) = self
            .next_call_ms
            .iter()
            .enumerate()
            .filter(|&(_, &at)| at <= now_ms)
            .min_by_key(|&(_, &at)| at)?;
        let animal = Animal::ALL[index];
        self.next_call_ms[index] = now_ms + voice(animal).interval_ms.sample(rng);

        if chance(rng, ANSWER_CHANCE) {
            let other = (index + rng.random_range(1..Animal::ALL.len())) % Animal::ALL.len();
            let answer_at = now_ms + rng.random_range(ANSWER_DELAY_MS.0..=ANSWER_DELAY_MS.1);
            if answer_at < self.next_call_ms[other] {
                self.next_call_ms[other] = answer_at;
                trace!(caller = ?animal, answer = ?Animal::ALL[other], "answer lined up");
            }
        }
        Some(animal)
    }
}
