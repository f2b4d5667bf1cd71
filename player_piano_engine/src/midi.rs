// MIDI output from recorded event streams.
//
// Converts a list of `(at_ms, MidiEvent)` pairs into a Standard MIDI File so
// an offline render can be auditioned in any player. Output is SMF Format 1
// with a tempo track and one piano track on channel 0. The tempo is fixed at
// 120 BPM (500 000 µs per quarter) with 480 ticks per quarter, so one tick is
// 25/24 ms and event times map exactly onto the wall-clock times they were
// generated at.
//
// Chords, counterpoint and furniture harmonies sound together; figures
// (arpeggios, insect bursts, animal calls, tone rows, morse and glissandi)
// are laid end to end; parallel motion plays its pairs in sequence; a car
// pass plays each car's two samples 150 ms apart. Pedals become CC 64
// (sustain), 66 (sostenuto) and 67 (soft); `allNotesOff` becomes CC 123 plus
// a sustain release.
//
// Uses the `midly` crate for MIDI writing.

use std::path::Path;

use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use player_piano_protocol::{FurniturePattern, MidiEvent, Note, PedalKind};

use crate::synth::traffic::SAMPLE_GAP_MS;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Microseconds per quarter note (120 BPM).
const TEMPO_US: u32 = 500_000;

const CHANNEL: u8 = 0;
const ACOUSTIC_GRAND: u8 = 0;

/// Milliseconds to MIDI ticks at the fixed tempo.
pub fn ms_to_ticks(ms: u64) -> u32 {
    let ticks = ms * u64::from(TICKS_PER_QUARTER) * 1000 / u64::from(TEMPO_US);
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

/// Render events and write them to `path`.
pub fn write_midi(events: &[(u64, MidiEvent)], path: &Path) -> std::io::Result<()> {
    events_to_smf(events).save(path)
}

/// When each note of an event starts, relative to the event.
fn onsets(event: &MidiEvent) -> Vec<u64> {
    let notes = event.notes();
    let stacked = || vec![0; notes.len()];
    let in_sequence = |notes: &[Note]| {
        let mut at = 0;
        notes
            .iter()
            .map(|n| {
                let start = at;
                at += u64::from(n.duration);
                start
            })
            .collect()
    };
    match event {
        MidiEvent::Note { .. }
        | MidiEvent::Chord { .. }
        | MidiEvent::Counterpoint { .. }
        | MidiEvent::MarbleBounce { .. } => stacked(),
        MidiEvent::Furniture { pattern, .. }
            if matches!(pattern, FurniturePattern::Harmony | FurniturePattern::Slam) =>
        {
            stacked()
        }
        MidiEvent::CarPass { .. } => (0..notes.len())
            .map(|i| if i % 2 == 0 { 0 } else { SAMPLE_GAP_MS })
            .collect(),
        MidiEvent::ParallelMotion { .. } => {
            let mut at = 0;
            notes
                .chunks(2)
                .flat_map(|pair| {
                    let start = at;
                    at += u64::from(pair[0].duration);
                    std::iter::repeat_n(start, pair.len())
                })
                .collect()
        }
        _ => in_sequence(notes),
    }
}

/// A channel message at an absolute tick. `rank` orders messages that share
/// a tick: releases first, then controllers, then note-ons.
struct Timed {
    tick: u32,
    rank: u8,
    message: MidiMessage,
}

fn controller(tick: u32, number: u8, value: u8) -> Timed {
    Timed {
        tick,
        rank: 1,
        message: MidiMessage::Controller {
            controller: u7::new(number),
            value: u7::new(value.min(127)),
        },
    }
}

fn pedal_controller(kind: PedalKind) -> u8 {
    match kind {
        PedalKind::Sustain => 64,
        PedalKind::Sostenuto => 66,
        PedalKind::Soft => 67,
    }
}

fn timeline(events: &[(u64, MidiEvent)]) -> Vec<Timed> {
    let mut out = Vec::new();
    for (at_ms, event) in events {
        match event {
            MidiEvent::Pedal { pedal } => {
                let value = (pedal.value * 127.0).round() as u8;
                out.push(controller(ms_to_ticks(*at_ms), pedal_controller(pedal.kind), value));
            }
            MidiEvent::AllNotesOff => {
                let tick = ms_to_ticks(*at_ms);
                out.push(controller(tick, 64, 0));
                out.push(controller(tick, 123, 0));
            }
            MidiEvent::Silence { .. } => {}
            _ => {
                for (note, offset) in event.notes().iter().zip(onsets(event)) {
                    let start = at_ms + offset;
                    let key = u7::new(note.midi_number.min(127));
                    out.push(Timed {
                        tick: ms_to_ticks(start),
                        rank: 2,
                        message: MidiMessage::NoteOn {
                            key,
                            vel: u7::new(note.velocity.clamp(1, 127)),
                        },
                    });
                    out.push(Timed {
                        tick: ms_to_ticks(start + u64::from(note.duration)),
                        rank: 0,
                        message: MidiMessage::NoteOff { key, vel: u7::new(0) },
                    });
                }
            }
        }
    }
    out.sort_by_key(|t| (t.tick, t.rank));
    out
}

/// Convert recorded events to an in-memory SMF.
pub fn events_to_smf(events: &[(u64, MidiEvent)]) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let tempo_track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(TEMPO_US))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ];
    smf.tracks.push(tempo_track);

    let channel = u4::new(CHANNEL);
    let mut track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(b"Player Piano")),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(ACOUSTIC_GRAND),
                },
            },
        },
    ];

    let mut last_tick = 0;
    for timed in timeline(events) {
        track.push(TrackEvent {
            delta: u28::new(timed.tick - last_tick),
            kind: TrackEventKind::Midi {
                channel,
                message: timed.message,
            },
        });
        last_tick = timed.tick;
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);

    smf
}
