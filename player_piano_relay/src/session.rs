// Listener roster for the relay.
//
// `Session` is the data structure `server.rs` drives. It owns one `Listener`
// per connected client, and each listener owns its own `Engine`, its latest
// weather reading and its play/stop flag. Nothing musical is shared between
// listeners: two clients on the same relay hear independent streams. All
// mutation happens from the server's single-threaded main loop, so there is
// no internal locking.
//
// Responsibilities:
// - Roster: add/remove listeners, assign IDs, enforce `max_listeners`.
// - Transport: `start`/`stop` per listener; stopping sends `allNotesOff`.
// - Control: style changes and queries, weather pushes (acknowledged).
// - Cadence: `tick` generates and sends one event per playing listener.
//
// Writing to client streams: each listener holds a cloned `TcpStream` write
// half in a `BufWriter` with a `WRITE_TIMEOUT`. A listener whose writes time
// out has stopped reading; it is dropped from the roster and its socket shut
// down so its reader thread exits. Other write errors are logged and
// otherwise ignored; the reader thread sees the broken pipe and reports the
// disconnect.

use std::collections::BTreeMap;
use std::io::{self, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use player_piano_engine::{Engine, EngineConfig, Style};
use player_piano_protocol::{
    ListenerId, ProtocolError, ServerMessage, WeatherReading, write_frame,
};
use tracing::{debug, info, warn};

/// How long a write to one listener may block the main loop.
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Roster settings the session needs from `RelayConfig`.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub tick_interval_ms: u64,
    pub max_listeners: u32,
    pub default_style: Style,
    pub engine: EngineConfig,
}

/// Relay-side state for every connected listener.
pub struct Session {
    config: SessionConfig,
    listeners: BTreeMap<ListenerId, Listener>,
    next_listener_id: u32,
}

struct Listener {
    name: String,
    engine: Engine,
    weather: Option<WeatherReading>,
    playing: bool,
    writer: BufWriter<TcpStream>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            listeners: BTreeMap::new(),
            next_listener_id: 0,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn playing_count(&self) -> usize {
        self.listeners.values().filter(|l| l.playing).count()
    }

    pub fn is_playing(&self, id: ListenerId) -> bool {
        self.listeners.get(&id).is_some_and(|l| l.playing)
    }

    /// Add a listener and send it `Welcome`. Returns the assigned ID, or the
    /// reason the relay turned it away.
    ///
    /// The new listener starts stopped; its stream begins on `Start`.
    pub fn add_listener(
        &mut self,
        name: String,
        seed: Option<u64>,
        stream: TcpStream,
    ) -> Result<ListenerId, String> {
        if self.listeners.len() >= self.config.max_listeners as usize {
            return Err("relay is full".into());
        }

        if let Err(e) = stream.set_write_timeout(Some(WRITE_TIMEOUT)) {
            warn!(error = %e, "could not set write timeout");
        }

        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;

        let engine = match seed {
            Some(seed) => Engine::seeded(self.config.engine.clone(), seed),
            None => Engine::new(self.config.engine.clone()),
        }
        .with_style(self.config.default_style);

        let style = engine.style_name().to_string();
        info!(listener = id.0, %name, ?seed, %style, "listener joined");
        self.listeners.insert(
            id,
            Listener {
                name,
                engine,
                weather: None,
                playing: false,
                writer: BufWriter::new(stream),
            },
        );

        let welcome = ServerMessage::Welcome {
            listener_id: id,
            tick_interval_ms: self.config.tick_interval_ms,
            style,
        };
        self.send_to(id, &welcome);

        Ok(id)
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        if let Some(listener) = self.listeners.remove(&id) {
            info!(listener = id.0, name = %listener.name, "listener left");
        }
    }

    /// Begin or resume the listener's stream.
    pub fn start(&mut self, id: ListenerId) {
        if let Some(listener) = self.listeners.get_mut(&id) {
            if !listener.playing {
                info!(listener = id.0, "stream started");
            }
            listener.playing = true;
        }
    }

    /// Halt the listener's stream and silence anything still sounding.
    pub fn stop(&mut self, id: ListenerId) {
        let Some(listener) = self.listeners.get_mut(&id) else {
            return;
        };
        let was_playing = listener.playing;
        listener.playing = false;
        let event = listener.engine.all_notes_off();
        if was_playing {
            info!(listener = id.0, "stream stopped");
        }
        self.send_to(id, &ServerMessage::Midi { event });
    }

    /// Switch the listener's style by name and report the outcome.
    pub fn set_style(&mut self, id: ListenerId, name: &str) {
        let Some(listener) = self.listeners.get_mut(&id) else {
            return;
        };
        let accepted = listener.engine.set_style(name);
        let style = listener.engine.style_name().to_string();
        if accepted {
            debug!(listener = id.0, %style, "style changed");
        } else {
            debug!(listener = id.0, requested = name, %style, "style rejected");
        }
        self.send_to(id, &ServerMessage::StyleChanged { style, accepted });
    }

    pub fn query_style(&mut self, id: ListenerId) {
        let Some(listener) = self.listeners.get(&id) else {
            return;
        };
        let style = listener.engine.style_name().to_string();
        self.send_to(id, &ServerMessage::CurrentStyle { style });
    }

    /// Store the listener's latest weather and acknowledge it.
    pub fn update_weather(&mut self, id: ListenerId, reading: WeatherReading) {
        let Some(listener) = self.listeners.get_mut(&id) else {
            return;
        };
        debug!(
            listener = id.0,
            temperature = reading.temperature,
            code = reading.weather_code,
            "weather updated"
        );
        listener.weather = Some(reading.clone());
        self.send_to(id, &ServerMessage::WeatherAck { reading });
    }

    /// One cadence tick: every playing listener gets exactly one event.
    pub fn tick(&mut self) {
        let mut stalled = Vec::new();
        for (id, listener) in &mut self.listeners {
            if !listener.playing {
                continue;
            }
            let event = listener.engine.generate_event(listener.weather.as_ref());
            if let Err(e) = write_frame(&mut listener.writer, &ServerMessage::Midi { event }) {
                if is_stall(&e) {
                    stalled.push(*id);
                } else {
                    log_send_error(*id, &e);
                }
            }
        }
        for id in stalled {
            self.drop_stalled(id);
        }
    }

    fn send_to(&mut self, id: ListenerId, msg: &ServerMessage) {
        let Some(listener) = self.listeners.get_mut(&id) else {
            return;
        };
        if let Err(e) = write_frame(&mut listener.writer, msg) {
            if is_stall(&e) {
                self.drop_stalled(id);
            } else {
                log_send_error(id, &e);
            }
        }
    }

    fn drop_stalled(&mut self, id: ListenerId) {
        let Some(listener) = self.listeners.remove(&id) else {
            return;
        };
        warn!(listener = id.0, name = %listener.name, "listener stopped reading; dropping");
        let _ = listener.writer.get_ref().shutdown(Shutdown::Both);
    }
}

/// A write that timed out: the peer is connected but not draining its socket.
fn is_stall(e: &ProtocolError) -> bool {
    match e {
        ProtocolError::Io(e) => matches!(
            e.kind(),
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
        ),
        ProtocolError::Json(_) => false,
    }
}

fn log_send_error(id: ListenerId, e: &ProtocolError) {
    if e.is_disconnect() {
        debug!(listener = id.0, "write to departed listener");
    } else {
        warn!(listener = id.0, error = %e, "write failed");
    }
}
