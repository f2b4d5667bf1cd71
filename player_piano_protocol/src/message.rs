// Control messages between listeners and the relay.
//
// - `ClientMessage`: sent by a listener to the relay (handshake, transport
//   control, weather pushes, style changes).
// - `ServerMessage`: sent by the relay to a listener (handshake replies, the
//   event stream itself, acknowledgements).
//
// Styles travel as plain strings so that an unknown name reaches the engine
// and is answered with `StyleChanged { accepted: false }` instead of failing
// to decode.

use serde::{Deserialize, Serialize};

use crate::event::MidiEvent;
use crate::types::{ListenerId, WeatherReading};

/// Current protocol version. The relay rejects a `Hello` carrying any other.
pub const PROTOCOL_VERSION: u32 = 1;

/// Messages sent by a listener to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join (handshake). `seed` pins the engine's randomness for
    /// reproducible streams.
    Hello {
        protocol_version: u32,
        listener_name: String,
        seed: Option<u64>,
    },
    /// Begin (or resume) the event stream.
    Start,
    /// Halt the event stream; the relay answers with `allNotesOff`.
    Stop,
    /// Latest weather observation for this listener's engine.
    Weather { reading: WeatherReading },
    /// Switch style by name.
    SetStyle { style: String },
    /// Ask which style is active.
    QueryStyle,
    /// Listener is leaving gracefully.
    Goodbye,
}

/// Messages sent by the relay to a listener.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted.
    Welcome {
        listener_id: ListenerId,
        tick_interval_ms: u64,
        style: String,
    },
    /// Handshake rejected.
    Rejected { reason: String },
    /// One generated event.
    Midi { event: MidiEvent },
    /// Reply to `SetStyle`. `style` is the style now active.
    StyleChanged { style: String, accepted: bool },
    /// Reply to `QueryStyle`.
    CurrentStyle { style: String },
    /// The relay stored this reading for the listener's engine.
    WeatherAck { reading: WeatherReading },
}
