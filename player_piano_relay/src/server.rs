// TCP server and main event loop for the relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and hands each one to a short-lived handshake thread.
// - **Handshake threads** (one per pending connection): read `Hello` under
//   `HANDSHAKE_TIMEOUT`, turn away wrong protocol versions, and send
//   `InternalEvent::Joined` to the main thread. A client that connects and
//   never speaks only ties up its own handshake thread.
// - **Reader threads** (one per listener): read framed `ClientMessage`s in a
//   loop and send `InternalEvent::MessageFrom` to the main thread. On error,
//   EOF or `Goodbye`, send `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Session` and with it every listener's engine.
//   It waits on the channel with `recv_timeout` until the next cadence
//   deadline, and when the deadline passes it ticks the session, which sends
//   one event to each playing listener. Deadlines advance by a fixed interval
//   from an `Instant`, so a busy control channel does not stretch the cadence.
//
// The main thread is the only writer to listener streams; reader threads only
// read. Shutdown: `RelayHandle::stop` clears `keep_running` and joins the
// main thread.

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use player_piano_engine::{EngineConfig, Style};
use player_piano_protocol::{
    ClientMessage, ListenerId, PROTOCOL_VERSION, ServerMessage, read_frame, write_frame,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::session::{Session, SessionConfig};

/// How long a new connection has to send `Hello`.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    Joined {
        listener_name: String,
        seed: Option<u64>,
        stream: TcpStream,
        reader: BufReader<TcpStream>,
    },
    MessageFrom { listener_id: ListenerId, message: ClientMessage },
    Disconnected { listener_id: ListenerId },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a relay server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// 0 lets the OS pick a free port.
    pub port: u16,
    pub tick_interval_ms: u64,
    pub max_listeners: u32,
    /// Style every new listener starts in.
    pub default_style: Style,
    pub engine: EngineConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 7979,
            tick_interval_ms: 120,
            max_listeners: 16,
            default_style: Style::Default,
            engine: EngineConfig::default(),
        }
    }
}

/// Start the relay on a background thread. Returns a handle for stopping it
/// and the bound address.
pub fn start_relay(config: RelayConfig) -> std::io::Result<(RelayHandle, SocketAddr)> {
    if config.tick_interval_ms == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "tick interval must be positive",
        ));
    }
    let listener = TcpListener::bind(("127.0.0.1", config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    info!(%addr, tick_ms = config.tick_interval_ms, "relay listening");
    let thread = thread::spawn(move || {
        run_relay(listener, config, keep_running_clone);
    });

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main relay loop. Runs until `keep_running` is set to false.
fn run_relay(listener: TcpListener, config: RelayConfig, keep_running: Arc<AtomicBool>) {
    let interval = Duration::from_millis(config.tick_interval_ms);
    let mut session = Session::new(SessionConfig {
        tick_interval_ms: config.tick_interval_ms,
        max_listeners: config.max_listeners,
        default_style: config.default_style,
        engine: config.engine,
    });

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Non-blocking so the accept thread can check keep_running periodically.
    if let Err(e) = listener.set_nonblocking(true) {
        warn!(error = %e, "could not make listener non-blocking");
    }

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "connection accepted");
                    stream.set_nonblocking(false).ok();
                    let tx_handshake = tx_listener.clone();
                    thread::spawn(move || handshake(stream, tx_handshake));
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed; no longer accepting");
                    break;
                }
            }
        }
    });

    let mut next_tick = Instant::now() + interval;
    while keep_running.load(Ordering::SeqCst) {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(event) => {
                handle_event(&mut session, event, &tx, &keep_running);
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut session, event, &tx, &keep_running);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        if now >= next_tick {
            session.tick();
            next_tick += interval;
            // Fell more than a tick behind: resync rather than burst.
            if next_tick < now {
                next_tick = now + interval;
            }
        }
    }
    info!("relay stopped");
}

fn handle_event(
    session: &mut Session,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::Joined {
            listener_name,
            seed,
            stream,
            reader,
        } => {
            handle_join(session, listener_name, seed, stream, reader, tx, keep_running);
        }
        InternalEvent::MessageFrom { listener_id, message } => {
            handle_message(session, listener_id, message);
        }
        InternalEvent::Disconnected { listener_id } => {
            session.remove_listener(listener_id);
        }
    }
}

/// Read the `Hello` handshake for one connection. Runs in its own thread.
fn handshake(stream: TcpStream, tx: Sender<InternalEvent>) {
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).ok();

    let mut reader = match stream.try_clone() {
        Ok(s) => BufReader::new(s),
        Err(e) => {
            warn!(error = %e, "could not clone connection");
            return;
        }
    };

    let hello: ClientMessage = match read_frame(&mut reader) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "handshake failed");
            return;
        }
    };

    let ClientMessage::Hello {
        protocol_version,
        listener_name,
        seed,
    } = hello
    else {
        warn!("first message was not Hello; dropping connection");
        return;
    };

    if protocol_version != PROTOCOL_VERSION {
        warn!(
            protocol_version,
            expected = PROTOCOL_VERSION,
            "protocol version mismatch"
        );
        reject(
            stream,
            format!("protocol version {protocol_version} not supported (want {PROTOCOL_VERSION})"),
        );
        return;
    }

    stream.set_read_timeout(None).ok();
    let _ = tx.send(InternalEvent::Joined {
        listener_name,
        seed,
        stream,
        reader,
    });
}

/// Add a handshaken connection to the session and spawn its reader thread.
fn handle_join(
    session: &mut Session,
    listener_name: String,
    seed: Option<u64>,
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    let write_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "could not clone connection");
            return;
        }
    };

    match session.add_listener(listener_name, seed, write_stream) {
        Ok(listener_id) => {
            let tx_reader = tx.clone();
            let keep_running_reader = keep_running.clone();
            thread::spawn(move || {
                reader_loop(reader, listener_id, tx_reader, keep_running_reader);
            });
        }
        Err(reason) => {
            warn!(%reason, "listener rejected");
            reject(stream, reason);
        }
    }
}

fn reject(stream: TcpStream, reason: String) {
    let mut writer = std::io::BufWriter::new(stream);
    let _ = write_frame(&mut writer, &ServerMessage::Rejected { reason });
}

/// Reader loop for a single listener. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    listener_id: ListenerId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_frame::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::Goodbye) => break,
            Ok(message) => {
                if tx.send(InternalEvent::MessageFrom { listener_id, message }).is_err() {
                    return;
                }
            }
            Err(e) => {
                if !e.is_disconnect() {
                    warn!(listener = listener_id.0, error = %e, "bad frame; disconnecting");
                }
                break;
            }
        }
    }
    let _ = tx.send(InternalEvent::Disconnected { listener_id });
}

/// Dispatch a message from an established listener.
fn handle_message(session: &mut Session, listener_id: ListenerId, message: ClientMessage) {
    match message {
        ClientMessage::Start => session.start(listener_id),
        ClientMessage::Stop => session.stop(listener_id),
        ClientMessage::Weather { reading } => session.update_weather(listener_id, reading),
        ClientMessage::SetStyle { style } => session.set_style(listener_id, &style),
        ClientMessage::QueryStyle => session.query_style(listener_id),
        ClientMessage::Hello { .. } => {
            debug!(listener = listener_id.0, "ignoring repeated Hello");
        }
        // Handled in the reader loop.
        ClientMessage::Goodbye => {}
    }
}
