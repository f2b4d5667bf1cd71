// player_piano_relay — streams Player Piano events to connected listeners.
//
// The relay accepts TCP connections, gives every listener its own
// generation engine, and pushes one `MidiEvent` per playing listener on
// every cadence tick (120 ms by default). Listeners control their own
// stream: start/stop, style changes and weather pushes all act on that
// listener's engine only.
//
// Module overview:
// - `session.rs`:  Listener roster. Each `Listener` owns an `Engine`, its
//                  latest weather and a play flag; `tick()` sends one event
//                  to every playing listener.
// - `server.rs`:   TCP listener, reader threads (one per listener), and the
//                  main event loop. Uses `std::net` with a thread-per-reader
//                  architecture and an `mpsc` channel funnelling events into
//                  the single-threaded `Session`.
// - `client.rs`:   `StreamClient`, a blocking-reader client for tests and
//                  Rust consumers.
//
// The relay runs as a standalone binary (`main.rs`) or embedded via
// `start_relay`.

pub mod client;
pub mod server;
pub mod session;

pub use client::{ClientError, StreamClient, WelcomeInfo};
pub use server::{RelayConfig, RelayHandle, start_relay};
