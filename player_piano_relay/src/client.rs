// TCP client for listening to a relay stream.
//
// - `connect()` performs TCP connect + `Hello` handshake on the calling
//   thread, then spawns a background reader thread.
// - The reader thread reads framed `ServerMessage`s in a loop and pushes them
//   into an `mpsc` channel.
// - The caller holds a `BufWriter<TcpStream>` for sending control messages.
// - `poll()` drains the inbox without blocking; `recv_timeout()` waits for
//   the next message.
//
// Used by the integration tests and by anything that wants to consume a
// stream from Rust without a browser.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use player_piano_protocol::{
    ClientMessage, ListenerId, PROTOCOL_VERSION, ProtocolError, ServerMessage, WeatherReading,
    read_frame, write_frame,
};
use thiserror::Error;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("rejected by relay: {0}")]
    Rejected(String),
    #[error("unexpected handshake reply: {0:?}")]
    UnexpectedReply(Box<ServerMessage>),
}

/// What the relay said in `Welcome`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WelcomeInfo {
    pub listener_id: ListenerId,
    pub tick_interval_ms: u64,
    pub style: String,
}

pub struct StreamClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: JoinHandle<()>,
}

impl StreamClient {
    /// Connect, say `Hello`, and wait for `Welcome`. A `seed` makes this
    /// listener's stream reproducible.
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        listener_name: &str,
        seed: Option<u64>,
    ) -> Result<(Self, WelcomeInfo), ClientError> {
        Self::connect_with_version(addr, listener_name, seed, PROTOCOL_VERSION)
    }

    /// `connect` with an explicit protocol version, for exercising the
    /// relay's version check.
    pub fn connect_with_version<A: ToSocketAddrs>(
        addr: A,
        listener_name: &str,
        seed: Option<u64>,
        protocol_version: u32,
    ) -> Result<(Self, WelcomeInfo), ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).ok();

        let reader_stream = stream.try_clone().map_err(ClientError::Connect)?;
        let mut writer = BufWriter::new(stream);

        write_frame(
            &mut writer,
            &ClientMessage::Hello {
                protocol_version,
                listener_name: listener_name.into(),
                seed,
            },
        )?;

        let mut reader = BufReader::new(reader_stream);
        let welcome = match read_frame(&mut reader)? {
            ServerMessage::Welcome {
                listener_id,
                tick_interval_ms,
                style,
            } => WelcomeInfo {
                listener_id,
                tick_interval_ms,
                style,
            },
            ServerMessage::Rejected { reason } => return Err(ClientError::Rejected(reason)),
            other => return Err(ClientError::UnexpectedReply(Box::new(other))),
        };

        reader.get_ref().set_read_timeout(None).ok();

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || reader_loop(reader, tx));

        Ok((
            Self {
                writer,
                inbox: rx,
                _reader_thread: reader_thread,
            },
            welcome,
        ))
    }

    pub fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        write_frame(&mut self.writer, msg)?;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::Start)
    }

    pub fn stop(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::Stop)
    }

    pub fn set_style(&mut self, style: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::SetStyle {
            style: style.into(),
        })
    }

    pub fn query_style(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::QueryStyle)
    }

    pub fn send_weather(&mut self, reading: WeatherReading) -> Result<(), ClientError> {
        self.send(&ClientMessage::Weather { reading })
    }

    /// Send `Goodbye`. The relay closes the stream afterwards.
    pub fn disconnect(&mut self) {
        let _ = self.send(&ClientMessage::Goodbye);
    }

    /// Drain all queued server messages without blocking.
    pub fn poll(&self) -> Vec<ServerMessage> {
        self.inbox.try_iter().collect()
    }

    /// Wait up to `timeout` for the next server message. `None` on timeout or
    /// once the connection has closed and the inbox is empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
        match self.inbox.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(msg) = read_frame::<_, ServerMessage>(&mut reader) {
        if tx.send(msg).is_err() {
            break;
        }
    }
}
