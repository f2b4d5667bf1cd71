// Basic synthesizers shared by every style.
//
// Pitch selection: legal pitch classes are `(key + interval) mod 12` for the
// current scale. An octave is drawn uniformly from the active octave range
// (or a caller's override), and velocity and duration are drawn
// independently per note from the bundle's bands.
//
// Multi-note shapes that climb through the scale (chords, arpeggios,
// parallel motion) start one octave below the top of the range where the
// range allows, and any octave carry past the top is capped there, so every
// note stays inside the bundle's octave range.

use player_piano_protocol::{MidiEvent, Note};
use rand::Rng;

use super::{Synthesizer, TickContext};
use crate::params::{Span, chance};

/// Chance that a chord under the chaotic mood becomes a semitone cluster.
const CLUSTER_CHANCE: f64 = 0.4;

/// Octave band used for insect bursts.
const INSECT_OCTAVES: (u8, u8) = (5, 7);

/// Octave range with one octave of headroom for upward carries.
fn root_octaves(octaves: Span<u8>) -> Span<u8> {
    if octaves.max() > octaves.min() {
        Span::new(octaves.min(), octaves.max() - 1)
    } else {
        octaves
    }
}

fn random_degree<R: Rng + ?Sized>(ctx: &TickContext<'_>, rng: &mut R) -> usize {
    rng.random_range(0..ctx.key.degree_count())
}

/// One in-scale note anywhere in the bundle's octave range.
pub fn note<R: Rng + ?Sized>(ctx: &TickContext<'_>, rng: &mut R) -> Note {
    note_in(ctx, ctx.bundle.octaves, rng)
}

/// One in-scale note inside `octaves`.
pub fn note_in<R: Rng + ?Sized>(ctx: &TickContext<'_>, octaves: Span<u8>, rng: &mut R) -> Note {
    let degree = random_degree(ctx, rng);
    let octave = octaves.sample(rng);
    let velocity = ctx.bundle.velocity.sample(rng);
    let duration = ctx.bundle.duration.sample(rng);
    ctx.key.note(degree, octave, octaves.max(), velocity, duration)
}

/// A chord of `size` notes stacked in scale thirds from a random root. Under
/// the chaotic mood it is sometimes replaced by a cluster of 3–6 adjacent
/// semitones; the returned flag reports that.
pub fn chord<R: Rng + ?Sized>(
    ctx: &TickContext<'_>,
    size: usize,
    rng: &mut R,
) -> (Vec<Note>, bool) {
    let bundle = ctx.bundle;
    let top = bundle.octaves.max();
    let root_degree = random_degree(ctx, rng);
    let root_octave = root_octaves(bundle.octaves).sample(rng);
    let root_duration = bundle.duration.sample(rng);
    let root = ctx.key.note(
        root_degree,
        root_octave,
        top,
        bundle.velocity.sample(rng),
        root_duration,
    );

    if ctx.chaotic && chance(rng, CLUSTER_CHANCE) {
        let cluster_size = rng.random_range(3..=6);
        let root_pc = root.pitch_class();
        let root_oct = root.octave;
        let mut notes = vec![root];
        for i in 1..cluster_size {
            let raw = root_pc + i;
            let octave = (root_oct + raw / 12).min(top);
            let stretch = rng.random_range(0.7..1.3);
            notes.push(Note::from_pitch_class(
                raw % 12,
                octave,
                bundle.velocity.sample(rng),
                scaled(root_duration, stretch),
            ));
        }
        return (notes, true);
    }

    let mut notes = vec![root];
    for k in 1..size {
        let stretch = rng.random_range(0.8..1.2);
        notes.push(ctx.key.note(
            root_degree + 2 * k,
            root_octave,
            top,
            bundle.velocity.sample(rng),
            bundle.duration.clamp(scaled(root_duration, stretch)),
        ));
    }
    (notes, false)
}

fn scaled(ms: u32, factor: f64) -> u32 {
    let v = (f64::from(ms) * factor).round();
    if v >= f64::from(u32::MAX) { u32::MAX } else { (v as u32).max(1) }
}

/// Split `octaves` into `voices` contiguous, non-overlapping segments, lowest
/// first. With fewer octaves than voices the segments collapse onto single
/// octaves and neighbouring voices share them.
pub fn voice_segments(octaves: Span<u8>, voices: usize) -> Vec<Span<u8>> {
    let voices = voices.max(1);
    let count = usize::from(octaves.max() - octaves.min()) + 1;
    (0..voices)
        .map(|i| {
            let lo = i * count / voices;
            let hi = ((i + 1) * count / voices).saturating_sub(1).max(lo);
            let base = usize::from(octaves.min());
            Span::new(to_octave(base + lo), to_octave(base + hi))
        })
        .collect()
}

fn to_octave(v: usize) -> u8 {
    u8::try_from(v).unwrap_or(u8::MAX)
}

/// One note per voice, each from its own register segment, ordered low to
/// high.
pub fn counterpoint<R: Rng + ?Sized>(
    ctx: &TickContext<'_>,
    voices: usize,
    rng: &mut R,
) -> Vec<Note> {
    let mut notes: Vec<Note> = voice_segments(ctx.bundle.octaves, voices)
        .into_iter()
        .map(|segment| note_in(ctx, segment, rng))
        .collect();
    notes.sort_by_key(|n| n.midi_number);
    notes
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Contour {
    Up,
    Down,
    UpDown,
}

/// 4–8 scale notes rising, falling, or rising then falling, all with the
/// bundle's shortest duration.
pub fn arpeggio<R: Rng + ?Sized>(ctx: &TickContext<'_>, rng: &mut R) -> Vec<Note> {
    let bundle = ctx.bundle;
    let count: usize = rng.random_range(4..=8);
    let contour = match rng.random_range(0..3) {
        0 => Contour::Up,
        1 => Contour::Down,
        _ => Contour::UpDown,
    };
    let root_degree = random_degree(ctx, rng);
    let octave = root_octaves(bundle.octaves).sample(rng);
    let step_ms = bundle.duration.min();
    let peak = count / 2;
    (0..count)
        .map(|i| {
            let offset = match contour {
                Contour::Up => i,
                Contour::Down => count - 1 - i,
                Contour::UpDown if i <= peak => i,
                Contour::UpDown => 2 * peak - i,
            };
            ctx.key.note(
                root_degree + offset,
                octave,
                bundle.octaves.max(),
                bundle.velocity.sample(rng),
                step_ms,
            )
        })
        .collect()
}

/// A 3–5 step scale line doubled a diatonic third or sixth above. Notes come
/// in (lower, upper) pairs.
pub fn parallel_motion<R: Rng + ?Sized>(ctx: &TickContext<'_>, rng: &mut R) -> Vec<Note> {
    let bundle = ctx.bundle;
    let steps: usize = rng.random_range(3..=5);
    let interval = if rng.random_bool(0.5) { 2 } else { 5 };
    let ascending = rng.random_bool(0.5);
    let root_degree = random_degree(ctx, rng);
    let octave = root_octaves(bundle.octaves).sample(rng);
    let top = bundle.octaves.max();
    let mut notes = Vec::with_capacity(steps * 2);
    for i in 0..steps {
        let degree = root_degree + if ascending { i } else { steps - 1 - i };
        let velocity = bundle.velocity.sample(rng);
        let duration = bundle.duration.sample(rng);
        notes.push(ctx.key.note(degree, octave, top, velocity, duration));
        notes.push(ctx.key.note(degree + interval, octave, top, velocity, duration));
    }
    notes
}

/// 3–10 short, bright notes from octaves 5–7.
pub fn insect_burst<R: Rng + ?Sized>(ctx: &TickContext<'_>, rng: &mut R) -> Vec<Note> {
    let octaves = Span::new(INSECT_OCTAVES.0, INSECT_OCTAVES.1);
    let count = rng.random_range(3..=10);
    (0..count)
        .map(|_| {
            let degree = random_degree(ctx, rng);
            let octave = octaves.sample(rng);
            let velocity = rng.random_range(60..=99);
            let duration = rng.random_range(50..=150);
            ctx.key.note(degree, octave, octaves.max(), velocity, duration)
        })
        .collect()
}

/// Run one of the basic synthesizers and wrap the result in its event.
/// Returns `None` for `Signature`, which only a style can serve.
pub fn render<R: Rng + ?Sized>(
    choice: Synthesizer,
    ctx: &TickContext<'_>,
    rng: &mut R,
) -> Option<MidiEvent> {
    let current_key = ctx.tonic;
    let current_scale = ctx.scale;
    let event = match choice {
        Synthesizer::Note => MidiEvent::Note {
            note: note(ctx, rng),
            current_key,
            current_scale,
        },
        Synthesizer::Chord { size } => {
            let (notes, cluster) = chord(ctx, size, rng);
            MidiEvent::Chord {
                notes,
                current_key,
                current_scale,
                cluster,
            }
        }
        Synthesizer::Counterpoint { voices } => MidiEvent::Counterpoint {
            notes: counterpoint(ctx, voices, rng),
            current_key,
            current_scale,
        },
        Synthesizer::Arpeggio => MidiEvent::Arpeggio {
            notes: arpeggio(ctx, rng),
            current_key,
            current_scale,
        },
        Synthesizer::ParallelMotion => MidiEvent::ParallelMotion {
            notes: parallel_motion(ctx, rng),
            current_key,
            current_scale,
        },
        Synthesizer::InsectBurst => MidiEvent::InsectBurst {
            notes: insect_burst(ctx, rng),
            current_key,
            current_scale,
        },
        Synthesizer::Signature => return None,
    };
    Some(event)
}
