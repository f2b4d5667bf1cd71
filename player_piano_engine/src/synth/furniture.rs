// The haunted apartment.
//
// Furniture "speaks" in chromatic fragments, each piece with its own voice
// (pattern, pitch band, tempo, loudness, activity). Pieces strike up
// conversations in pairs that last 30 s; a conversation either harmonizes
// (both speak in consonant intervals: minor/major third, fifth) or argues
// (tritone, minor seventh, major seventh). The ghost spoon is dormant and
// only occasionally wakes.
//
// Three things override ordinary speech, checked in order each tick:
//
// 1. Enforced quiet after a window slam: nothing but silence until it ends.
// 2. The window slam itself, every 10–15 s: a loud, low, very short burst.
// 3. The fog pedal: sometimes the sustain pedal goes down (0.7–1.0) and is
//    released 5–15 s later. The apartment owns this pedal outright.

use player_piano_protocol::{FurnitureObject, FurniturePattern, Note, Pedal, PedalKind};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::params::{Span, chance};

const CONVERSATION_MS: u64 = 30_000;
const CONVERSATION_CHANCE: f64 = 0.05;
const MAX_CONVERSATIONS: usize = 2;
const HARMONIZING_CHANCE: f64 = 0.7;
const HARMONIZING_INTERVALS: [u8; 3] = [3, 4, 7];
const ARGUING_INTERVALS: [u8; 3] = [6, 10, 11];

const SPOON_WAKE_CHANCE: f64 = 0.01;
const SPOON_AWAKE_MS: u64 = 20_000;

const FOG_CHANCE: f64 = 0.02;

/// Broken melodic shapes, in semitones from the starting pitch.
const FRAGMENTS: [[i8; 5]; 4] = [
    [0, 2, 4, 2, 0],
    [0, -2, 1, -1, 0],
    [0, 5, 4, 2, 0],
    [0, 3, 1, 4, 0],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relationship {
    Harmonizing,
    Arguing,
}

#[derive(Clone, Debug, PartialEq)]
struct Piece {
    object: FurnitureObject,
    pattern: FurniturePattern,
    pitch: Span<u8>,
    tempo: f64,
    volume: Span<u8>,
    activity: f64,
    dormant: bool,
}

fn furnish() -> Vec<Piece> {
    use FurnitureObject as O;
    use FurniturePattern as P;
    let piece = |object, pattern, pitch: (u8, u8), tempo, volume: (u8, u8), activity, dormant| {
        Piece {
            object,
            pattern,
            pitch: Span::new(pitch.0, pitch.1),
            tempo,
            volume: Span::new(volume.0, volume.1),
            activity,
            dormant,
        }
    };
    vec![
        piece(O::Chair, P::Morse, (48, 72), 1.2, (60, 90), 0.7, false),
        piece(O::Lamp, P::Morse, (60, 84), 0.8, (40, 70), 0.5, false),
        piece(O::Bookshelf, P::Glissando, (36, 60), 0.3, (30, 80), 0.4, false),
        piece(O::Cabinet, P::Harmony, (40, 70), 0.6, (50, 85), 0.6, false),
        piece(O::Radiator, P::Harmony, (30, 55), 0.4, (45, 75), 0.5, false),
        piece(O::GhostSpoon, P::Melody, (72, 96), 0.7, (20, 50), 0.2, true),
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conversation {
    pub a: FurnitureObject,
    pub b: FurnitureObject,
    pub relationship: Relationship,
    started_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Fog {
    since_ms: u64,
    lasts_ms: u64,
}

/// What the apartment does instead of letting furniture speak.
#[derive(Clone, Debug, PartialEq)]
pub enum Interruption {
    Quiet(u32),
    Slam(Vec<Note>),
    Pedal(Pedal),
}

/// One piece of furniture speaking.
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub object: FurnitureObject,
    pub pattern: FurniturePattern,
    pub notes: Vec<Note>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Apartment {
    pieces: Vec<Piece>,
    conversations: Vec<Conversation>,
    last_slam_ms: u64,
    slam_gap_ms: u64,
    quiet_until_ms: u64,
    fog: Option<Fog>,
    spoon_awake_until_ms: Option<u64>,
}

impl Apartment {
    pub fn new<R: Rng + ?Sized>(now_ms: u64, rng: &mut R) -> Self {
        Self {
            pieces: furnish(),
            conversations: Vec::new(),
            last_slam_ms: now_ms,
            slam_gap_ms: rng.random_range(10_000..=15_000),
            quiet_until_ms: 0,
            fog: None,
            spoon_awake_until_ms: None,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn is_quiet(&self, now_ms: u64) -> bool {
        now_ms < self.quiet_until_ms
    }

    fn piece(&self, object: FurnitureObject) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.object == object)
    }

    fn is_dormant(&self, piece: &Piece) -> bool {
        piece.dormant && self.spoon_awake_until_ms.is_none()
    }

    /// Expire and start conversations; wake or settle the ghost spoon.
    pub fn advance<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) {
        self.conversations
            .retain(|c| now_ms.saturating_sub(c.started_ms) < CONVERSATION_MS);

        match self.spoon_awake_until_ms {
            Some(until) if now_ms >= until => {
                self.spoon_awake_until_ms = None;
                debug!("ghost spoon settles");
            }
            None if chance(rng, SPOON_WAKE_CHANCE) => {
                self.spoon_awake_until_ms = Some(now_ms + SPOON_AWAKE_MS);
                debug!("ghost spoon wakes");
            }
            _ => {}
        }

        if self.conversations.len() < MAX_CONVERSATIONS && chance(rng, CONVERSATION_CHANCE) {
            let free: Vec<FurnitureObject> = self
                .pieces
                .iter()
                .filter(|p| !self.is_dormant(p) && self.partner_of(p.object).is_none())
                .map(|p| p.object)
                .collect();
            if free.len() >= 2 {
                let pair: Vec<_> = free.choose_multiple(rng, 2).copied().collect();
                let relationship = if chance(rng, HARMONIZING_CHANCE) {
                    Relationship::Harmonizing
                } else {
                    Relationship::Arguing
                };
                debug!(a = ?pair[0], b = ?pair[1], ?relationship, "conversation starts");
                self.conversations.push(Conversation {
                    a: pair[0],
                    b: pair[1],
                    relationship,
                    started_ms: now_ms,
                });
            }
        }
    }

    fn partner_of(&self, object: FurnitureObject) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.a == object || c.b == object)
    }

    /// Quiet, slam or fog pedal, if one of them owns this tick.
    pub fn interrupt<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) -> Option<Interruption> {
        if self.is_quiet(now_ms) {
            let left = self.quiet_until_ms - now_ms;
            return Some(Interruption::Quiet(u32::try_from(left).unwrap_or(u32::MAX)));
        }

        if now_ms.saturating_sub(self.last_slam_ms) >= self.slam_gap_ms {
            self.last_slam_ms = now_ms;
            self.slam_gap_ms = rng.random_range(10_000..=15_000);
            self.quiet_until_ms = now_ms + rng.random_range(500..=1_500);
            debug!(quiet_until_ms = self.quiet_until_ms, "window slam");
            return Some(Interruption::Slam(slam(rng)));
        }

        match self.fog {
            Some(fog) if now_ms.saturating_sub(fog.since_ms) > fog.lasts_ms => {
                self.fog = None;
                Some(Interruption::Pedal(Pedal::release(PedalKind::Sustain)))
            }
            Some(_) => None,
            None if chance(rng, FOG_CHANCE) => {
                self.fog = Some(Fog {
                    since_ms: now_ms,
                    lasts_ms: rng.random_range(5_000..=15_000),
                });
                let depth = rng.random_range(0.7..=1.0);
                Some(Interruption::Pedal(Pedal::new(PedalKind::Sustain, depth)))
            }
            None => None,
        }
    }

    /// Let one awake piece speak. `None` when nobody feels like it.
    pub fn speak<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Utterance> {
        let eager: Vec<&Piece> = self
            .pieces
            .iter()
            .filter(|p| !self.is_dormant(p))
            .filter(|p| chance(rng, p.activity * p.tempo))
            .collect();
        let piece = *eager.choose(rng)?;
        let relationship = self.partner_of(piece.object).map(|c| c.relationship);
        let notes = match piece.pattern {
            FurniturePattern::Morse => morse(piece, rng),
            FurniturePattern::Glissando => glissando(piece, rng),
            FurniturePattern::Melody => melody(piece, rng),
            FurniturePattern::Harmony | FurniturePattern::Slam => harmony(piece, relationship, rng),
        };
        Some(Utterance {
            object: piece.object,
            pattern: piece.pattern,
            notes,
        })
    }

    /// Voice of a named piece, for inspection.
    pub fn pattern_of(&self, object: FurnitureObject) -> Option<FurniturePattern> {
        self.piece(object).map(|p| p.pattern)
    }
}

fn slam<R: Rng + ?Sized>(rng: &mut R) -> Vec<Note> {
    let count = rng.random_range(8..=14);
    (0..count)
        .map(|_| {
            Note::from_midi(
                rng.random_range(24..=47),
                rng.random_range(80..=126),
                rng.random_range(50..=150),
            )
        })
        .collect()
}

fn offset(pitch: u8, semitones: i32) -> u8 {
    u8::try_from((i32::from(pitch) + semitones).clamp(0, 127)).unwrap_or(127)
}

fn morse<R: Rng + ?Sized>(piece: &Piece, rng: &mut R) -> Vec<Note> {
    let base = piece.pitch.sample(rng);
    if rng.random_bool(0.5) {
        let count = rng.random_range(3..=5);
        (0..count)
            .map(|_| {
                let wobble = if chance(rng, 0.3) { rng.random_range(-1..=1) } else { 0 };
                let duration = rng.random_range(80..=200);
                Note::from_midi(offset(base, wobble), piece.volume.sample(rng), duration)
            })
            .collect()
    } else {
        vec![Note::from_midi(base, piece.volume.sample(rng), rng.random_range(300..=700))]
    }
}

fn glissando<R: Rng + ?Sized>(piece: &Piece, rng: &mut R) -> Vec<Note> {
    let start = piece.pitch.sample(rng);
    let direction = if rng.random_bool(0.5) { 1 } else { -1 };
    let steps: i32 = rng.random_range(4..=11);
    (0..steps)
        .map(|i| {
            let duration = rng.random_range(200..=500);
            Note::from_midi(offset(start, direction * i), piece.volume.sample(rng), duration)
        })
        .collect()
}

fn melody<R: Rng + ?Sized>(piece: &Piece, rng: &mut R) -> Vec<Note> {
    let start = piece.pitch.sample(rng);
    let shape = FRAGMENTS[rng.random_range(0..FRAGMENTS.len())];
    let mut notes = Vec::with_capacity(shape.len());
    for step in shape {
        if chance(rng, 0.8) {
            let pitch = offset(start, i32::from(step));
            let duration = rng.random_range(400..=1_000);
            notes.push(Note::from_midi(pitch, piece.volume.sample(rng), duration));
        }
    }
    if notes.is_empty() {
        notes.push(Note::from_midi(start, piece.volume.sample(rng), rng.random_range(400..=1_000)));
    }
    notes
}

fn harmony<R: Rng + ?Sized>(
    piece: &Piece,
    relationship: Option<Relationship>,
    rng: &mut R,
) -> Vec<Note> {
    let root = piece.pitch.sample(rng);
    let intervals = match relationship {
        Some(Relationship::Arguing) => &ARGUING_INTERVALS,
        _ => &HARMONIZING_INTERVALS,
    };
    let interval = intervals[rng.random_range(0..intervals.len())];
    let duration = rng.random_range(800..=2_000);
    vec![
        Note::from_midi(root, piece.volume.sample(rng), duration),
        Note::from_midi(root.saturating_add(interval), piece.volume.sample(rng), duration),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn slam_then_enforced_quiet() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut flat = Apartment::new(0, &mut rng);
        let mut slammed_at = None;
        for t in (0..16_000).step_by(100) {
            if let Some(Interruption::Slam(notes)) = flat.interrupt(t, &mut rng) {
                assert!((8..=14).contains(&notes.len()));
                for n in &notes {
                    assert!((24..=47).contains(&n.midi_number));
                    assert!((80..=126).contains(&n.velocity));
                    assert!((50..=150).contains(&n.duration));
                }
                slammed_at = Some(t);
                break;
            }
        }
        let t = slammed_at.unwrap();
        assert!((10_000..=15_100).contains(&t), "{t}");
        match flat.interrupt(t + 100, &mut rng) {
            Some(Interruption::Quiet(left)) => assert!(left <= 1_400),
            other => panic!("expected quiet, got {other:?}"),
        }
        assert!(!flat.is_quiet(t + 1_501));
    }

    #[test]
    fn fog_pedal_goes_down_and_comes_up() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut flat = Apartment::new(0, &mut rng);
        let mut pressed = None;
        for t in (0..200_000).step_by(100) {
            if let Some(Interruption::Pedal(p)) = flat.interrupt(t, &mut rng) {
                match pressed {
                    None => {
                        assert!((0.7..=1.0).contains(&p.value));
                        pressed = Some(t);
                    }
                    Some(down) => {
                        assert!(p.is_release());
                        let held = t - down;
                        // A slam's enforced quiet can delay the release.
                        assert!((5_000..=16_700).contains(&held), "{held}");
                        return;
                    }
                }
            }
        }
        panic!("fog never lifted");
    }

    #[test]
    fn conversations_pair_awake_furniture() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut flat = Apartment::new(0, &mut rng);
        let mut seen = 0;
        for t in (0..300_000).step_by(100) {
            flat.advance(t, &mut rng);
            assert!(flat.conversations().len() <= MAX_CONVERSATIONS);
            for c in flat.conversations() {
                assert_ne!(c.a, c.b);
                assert!(t - c.started_ms < CONVERSATION_MS);
                seen += 1;
            }
        }
        assert!(seen > 0);
    }

    #[test]
    fn utterances_follow_their_voice() {
        let mut rng = StdRng::seed_from_u64(4);
        let flat = Apartment::new(0, &mut rng);
        let mut spoke = 0;
        for _ in 0..500 {
            let Some(u) = flat.speak(&mut rng) else { continue };
            spoke += 1;
            assert_ne!(u.object, FurnitureObject::GhostSpoon, "spoon is dormant");
            assert_eq!(flat.pattern_of(u.object), Some(u.pattern));
            assert!(!u.notes.is_empty());
            match u.pattern {
                FurniturePattern::Glissando => {
                    assert!((4..=11).contains(&u.notes.len()));
                    for pair in u.notes.windows(2) {
                        assert_eq!(pair[0].midi_number.abs_diff(pair[1].midi_number), 1);
                    }
                }
                FurniturePattern::Harmony => {
                    let gap = u.notes[1].midi_number - u.notes[0].midi_number;
                    assert!(HARMONIZING_INTERVALS.contains(&gap), "{gap}");
                }
                _ => {}
            }
        }
        assert!(spoke > 100);
    }
}
