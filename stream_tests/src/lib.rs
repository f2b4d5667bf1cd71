// Test-only listener for end-to-end relay tests.
//
// Wraps the real `StreamClient` (from `player_piano_relay::client`) with
// blocking helpers: wait for a particular message, collect the next N
// events. All networking uses the same code paths a Rust consumer would;
// the only test-specific code is the polling with a deadline.
//
// See `tests/relay_streams.rs` for the scenarios.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use player_piano_engine::{EngineConfig, Style};
use player_piano_protocol::{ListenerId, MidiEvent, ServerMessage, WeatherReading};
use player_piano_relay::{RelayConfig, RelayHandle, StreamClient, start_relay};

/// Default timeout for blocking waits.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Cadence used by test relays. Short for fast tests, long enough that a
/// control message lands between ticks.
pub const TEST_TICK_MS: u64 = 15;

/// Start a relay on a free port with mood-free engines.
pub fn start_test_relay(max_listeners: u32) -> (RelayHandle, SocketAddr) {
    let config = RelayConfig {
        port: 0,
        tick_interval_ms: TEST_TICK_MS,
        max_listeners,
        default_style: Style::Default,
        engine: EngineConfig::calm(),
    };
    start_relay(config).expect("start_relay failed")
}

pub struct TestListener {
    client: StreamClient,
    pub id: ListenerId,
    pub style: String,
}

impl TestListener {
    pub fn connect(addr: SocketAddr, name: &str, seed: Option<u64>) -> Self {
        let (client, welcome) =
            StreamClient::connect(addr, name, seed).expect("TestListener::connect failed");
        Self {
            client,
            id: welcome.listener_id,
            style: welcome.style,
        }
    }

    pub fn start(&mut self) {
        self.client.start().expect("send Start failed");
    }

    pub fn stop(&mut self) {
        self.client.stop().expect("send Stop failed");
    }

    pub fn set_style(&mut self, style: &str) {
        self.client.set_style(style).expect("send SetStyle failed");
    }

    pub fn query_style(&mut self) {
        self.client.query_style().expect("send QueryStyle failed");
    }

    pub fn send_weather(&mut self, reading: WeatherReading) {
        self.client.send_weather(reading).expect("send Weather failed");
    }

    /// Block until a message matching `pred` arrives, returning it together
    /// with every `Midi` event skipped on the way.
    pub fn wait_for(
        &mut self,
        what: &str,
        pred: impl Fn(&ServerMessage) -> bool,
    ) -> (ServerMessage, Vec<MidiEvent>) {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        let mut skipped = Vec::new();
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            assert!(!left.is_zero(), "timed out waiting for {what}");
            let Some(msg) = self.client.recv_timeout(left) else {
                panic!("connection closed or timed out waiting for {what}");
            };
            if pred(&msg) {
                return (msg, skipped);
            }
            if let ServerMessage::Midi { event } = msg {
                skipped.push(event);
            }
        }
    }

    /// The next `count` stream events, ignoring other messages.
    pub fn next_events(&mut self, count: usize) -> Vec<MidiEvent> {
        let mut events = Vec::with_capacity(count);
        while events.len() < count {
            let (msg, _) =
                self.wait_for("a stream event", |m| matches!(m, ServerMessage::Midi { .. }));
            if let ServerMessage::Midi { event } = msg {
                events.push(event);
            }
        }
        events
    }

    /// Everything that arrives within `window`.
    pub fn collect_for(&self, window: Duration) -> Vec<ServerMessage> {
        let deadline = Instant::now() + window;
        let mut out = Vec::new();
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return out;
            }
            if let Some(msg) = self.client.recv_timeout(left) {
                out.push(msg);
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }
}
