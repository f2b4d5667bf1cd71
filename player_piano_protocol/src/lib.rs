// player_piano_protocol — wire vocabulary for the Player Piano event stream.
//
// This crate defines the values the generation engine emits (`Note`,
// `Pedal`, `MidiEvent`), the inputs it consumes (`WeatherReading`), the
// control messages exchanged between the relay (`player_piano_relay`) and its
// listeners, and the framing used to move them over TCP. It has no
// dependency on the engine, so browser-facing tooling can depend on it alone.
//
// Module overview:
// - `types.rs`:    `Note`, `Pedal`/`PedalKind`, `Scale` names, `Tonic`,
//                  `WeatherReading`, `ListenerId`.
// - `event.rs`:    The closed `MidiEvent` tagged union plus the `Animal` and
//                  furniture enums that style-specific events carry.
// - `message.rs`:  `ClientMessage` / `ServerMessage` control vocabulary.
// - `framing.rs`:  4-byte big-endian length prefix + JSON payload, raw and
//                  typed (`write_frame` / `read_frame`).
//
// Design decisions:
// - **JSON serialization.** The browser client already speaks camelCase
//   JSON with a `"type"` tag; the Rust types serialize to exactly that shape.
// - **Styles as strings on the wire.** Unknown style names must reach the
//   engine so it can refuse them politely.
// - **No async runtime.** Framing uses `std::io::Read`/`Write` and works with
//   blocking TCP streams and buffered wrappers alike.

pub mod event;
pub mod framing;
pub mod message;
pub mod types;

pub use event::{Animal, FurnitureObject, FurniturePattern, MidiEvent};
pub use framing::{
    MAX_MESSAGE_SIZE, ProtocolError, read_frame, read_message, write_frame, write_message,
};
pub use message::{ClientMessage, PROTOCOL_VERSION, ServerMessage};
pub use types::{
    ListenerId, MAX_OCTAVE, Note, PITCH_CLASS_NAMES, ParseTonicError, Pedal, PedalKind, PitchClass,
    Scale, Tonic, WeatherReading,
};

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    /// Frame a ClientMessage, read it back, and compare.
    fn client_roundtrip(msg: &ClientMessage) {
        let mut wire = Vec::new();
        write_frame(&mut wire, msg).unwrap();
        let recovered: ClientMessage = read_frame(&mut Cursor::new(&wire)).unwrap();
        assert_eq!(&recovered, msg);
    }

    /// Frame a ServerMessage, read it back, and compare.
    fn server_roundtrip(msg: &ServerMessage) {
        let mut wire = Vec::new();
        write_frame(&mut wire, msg).unwrap();
        let recovered: ServerMessage = read_frame(&mut Cursor::new(&wire)).unwrap();
        assert_eq!(&recovered, msg);
    }

    fn notes(midis: &[u8]) -> Vec<Note> {
        midis
            .iter()
            .enumerate()
            .map(|(i, &m)| Note::from_midi(m, 40 + i as u8 * 7, 120 + i as u32 * 33))
            .collect()
    }

    /// One of every `MidiEvent` variant, with awkward values where possible
    /// (fractional pedal depth, atonal key, empty and long note lists).
    fn every_event() -> Vec<MidiEvent> {
        let key = Tonic::pitch(6);
        vec![
            MidiEvent::Note {
                note: Note::from_pitch_class(11, 8, 127, 1),
                current_key: key,
                current_scale: Scale::Locrian,
            },
            MidiEvent::Chord {
                notes: notes(&[48, 52, 55, 59]),
                current_key: key,
                current_scale: Scale::Major,
                cluster: false,
            },
            MidiEvent::Chord {
                notes: notes(&[60, 61, 62, 63, 64, 65]),
                current_key: key,
                current_scale: Scale::HarmonicMinor,
                cluster: true,
            },
            MidiEvent::Counterpoint {
                notes: notes(&[26, 50, 74, 98]),
                current_key: key,
                current_scale: Scale::Dorian,
            },
            MidiEvent::Arpeggio {
                notes: notes(&[60, 64, 67, 72, 67, 64]),
                current_key: key,
                current_scale: Scale::Lydian,
            },
            MidiEvent::ParallelMotion {
                notes: notes(&[60, 64, 62, 65, 64, 67]),
                current_key: key,
                current_scale: Scale::Mixolydian,
            },
            MidiEvent::InsectBurst {
                notes: notes(&[84, 86, 88, 91, 93, 96, 98, 100, 103, 105]),
                current_key: key,
                current_scale: Scale::PentatonicMinor,
            },
            MidiEvent::AnimalCall {
                animal: Animal::Toucan,
                notes: notes(&[79, 77]),
                current_key: key,
                current_scale: Scale::PentatonicMajor,
            },
            MidiEvent::CarPass {
                notes: notes(&[57, 58, 56, 54]),
                current_key: key,
                current_scale: Scale::Minor,
            },
            MidiEvent::Furniture {
                object: FurnitureObject::GhostSpoon,
                pattern: FurniturePattern::Melody,
                notes: notes(&[84, 86, 88]),
                current_key: Tonic::Atonal,
                current_scale: Scale::Chromatic,
            },
            MidiEvent::MarbleBounce {
                note: Note::from_midi(91, 33, 95),
                current_key: key,
                current_scale: Scale::WholeTone,
            },
            MidiEvent::ToneRow {
                notes: notes(&[]),
                current_key: Tonic::Atonal,
                current_scale: Scale::Chromatic,
                row_position: 11,
            },
            MidiEvent::Pedal {
                pedal: Pedal::new(PedalKind::Soft, 0.333_333_333_333_333_3),
            },
            MidiEvent::Pedal {
                pedal: Pedal::release(PedalKind::Sustain),
            },
            MidiEvent::Silence { duration: 487 },
            MidiEvent::AllNotesOff,
        ]
    }

    #[test]
    fn roundtrip_every_event_through_json() {
        for event in every_event() {
            let json = serde_json::to_string(&event).unwrap();
            let recovered: MidiEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(recovered, event);
        }
    }

    #[test]
    fn roundtrip_every_event_through_frames() {
        for event in every_event() {
            server_roundtrip(&ServerMessage::Midi { event });
        }
    }

    #[test]
    fn roundtrip_client_messages() {
        client_roundtrip(&ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            listener_name: "lobby".into(),
            seed: Some(0xDEAD_BEEF),
        });
        client_roundtrip(&ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            listener_name: "kiosk".into(),
            seed: None,
        });
        client_roundtrip(&ClientMessage::Start);
        client_roundtrip(&ClientMessage::Stop);
        client_roundtrip(&ClientMessage::Weather {
            reading: WeatherReading::new(-3.25, 73, "Moderate snow fall"),
        });
        client_roundtrip(&ClientMessage::SetStyle {
            style: "impressionist".into(),
        });
        client_roundtrip(&ClientMessage::QueryStyle);
        client_roundtrip(&ClientMessage::Goodbye);
    }

    #[test]
    fn roundtrip_server_messages() {
        server_roundtrip(&ServerMessage::Welcome {
            listener_id: ListenerId(3),
            tick_interval_ms: 120,
            style: "default".into(),
        });
        server_roundtrip(&ServerMessage::Rejected {
            reason: "relay full".into(),
        });
        server_roundtrip(&ServerMessage::StyleChanged {
            style: "default".into(),
            accepted: false,
        });
        server_roundtrip(&ServerMessage::CurrentStyle {
            style: "haunted".into(),
        });
        server_roundtrip(&ServerMessage::WeatherAck {
            reading: WeatherReading::new(31.5, 95, "Thunderstorm"),
        });
    }
}
