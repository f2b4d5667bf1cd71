// Integration smoke test for the relay server.
//
// Starts a relay on localhost and talks to it over plain TCP sockets using
// only the protocol crate's framing and message types: handshake, version
// and capacity rejection, the start/stop lifecycle, and graceful goodbye.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use player_piano_engine::EngineConfig;
use player_piano_protocol::{
    ClientMessage, ListenerId, MidiEvent, PROTOCOL_VERSION, ServerMessage, read_frame, write_frame,
};
use player_piano_relay::{RelayConfig, start_relay};
use pretty_assertions::assert_eq;

fn send(writer: &mut BufWriter<TcpStream>, msg: &ClientMessage) {
    write_frame(writer, msg).unwrap();
}

fn recv(reader: &mut BufReader<TcpStream>) -> ServerMessage {
    read_frame(reader).unwrap()
}

fn relay_config(max_listeners: u32) -> RelayConfig {
    RelayConfig {
        port: 0,
        tick_interval_ms: 20,
        max_listeners,
        engine: EngineConfig::calm(),
        ..RelayConfig::default()
    }
}

/// Connect and say Hello with `version`; returns the socket halves and the
/// first reply.
fn hello(
    addr: SocketAddr,
    name: &str,
    version: u32,
) -> (BufReader<TcpStream>, BufWriter<TcpStream>, ServerMessage) {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut writer = BufWriter::new(stream);
    send(
        &mut writer,
        &ClientMessage::Hello {
            protocol_version: version,
            listener_name: name.into(),
            seed: Some(11),
        },
    );
    let reply = recv(&mut reader);
    (reader, writer, reply)
}

#[test]
fn stream_lifecycle() {
    let (handle, addr) = start_relay(relay_config(4)).unwrap();

    let (mut reader, mut writer, welcome) = hello(addr, "smoke", PROTOCOL_VERSION);
    assert_eq!(
        welcome,
        ServerMessage::Welcome {
            listener_id: ListenerId(0),
            tick_interval_ms: 20,
            style: "default".into(),
        }
    );

    send(&mut writer, &ClientMessage::Start);
    for _ in 0..10 {
        match recv(&mut reader) {
            ServerMessage::Midi { event } => assert_ne!(event, MidiEvent::AllNotesOff),
            other => panic!("expected Midi, got {other:?}"),
        }
    }

    send(&mut writer, &ClientMessage::Stop);
    // Ticks already in flight may land before the stop is processed.
    let mut saw_off = false;
    for _ in 0..20 {
        if matches!(
            recv(&mut reader),
            ServerMessage::Midi {
                event: MidiEvent::AllNotesOff
            }
        ) {
            saw_off = true;
            break;
        }
    }
    assert!(saw_off);

    // Stopped: the next reply is the answer to our query, not a tick.
    std::thread::sleep(Duration::from_millis(100));
    send(&mut writer, &ClientMessage::QueryStyle);
    assert_eq!(
        recv(&mut reader),
        ServerMessage::CurrentStyle {
            style: "default".into()
        }
    );

    send(&mut writer, &ClientMessage::Goodbye);
    handle.stop();
}

#[test]
fn wrong_protocol_version_is_rejected() {
    let (handle, addr) = start_relay(relay_config(4)).unwrap();
    let (_reader, _writer, reply) = hello(addr, "old", PROTOCOL_VERSION + 1);
    assert!(
        matches!(
            reply,
            ServerMessage::Rejected { ref reason } if reason.contains("protocol version")
        ),
        "{reply:?}"
    );
    handle.stop();
}

#[test]
fn full_relay_turns_listeners_away() {
    let (handle, addr) = start_relay(relay_config(1)).unwrap();
    let (_r1, _w1, first) = hello(addr, "first", PROTOCOL_VERSION);
    assert!(matches!(first, ServerMessage::Welcome { .. }));
    let (_r2, _w2, second) = hello(addr, "second", PROTOCOL_VERSION);
    assert_eq!(
        second,
        ServerMessage::Rejected {
            reason: "relay is full".into()
        }
    );
    handle.stop();
}

#[test]
fn zero_tick_interval_is_refused() {
    let config = RelayConfig {
        tick_interval_ms: 0,
        ..relay_config(1)
    };
    assert!(start_relay(config).is_err());
}
