// Player Piano generation engine
//
// Produces an endless, non-repeating stream of piano events, one per tick.
// Every event is shaped by the active style, the current weather, any moods
// that have switched on, and a key/scale that slowly rotates underneath. The
// engine is pure computation: it owns a clock and an RNG but no sockets,
// threads or timers, so the relay can run one engine per listener and tests
// can drive it with a manual clock and a fixed seed.
//
// Architecture:
// - clock.rs:   `Clock` trait; wall-clock and manual (test/offline) clocks
// - config.rs:  `EngineConfig` (mood odds and durations, rotation, pedal,
//               silence band) loaded from JSON
// - params.rs:  `ParameterBundle`, `Span`, `Envelope`, pedal palettes
// - scale.rs:   interval tables, `KeyContext`, degree -> pitch helpers
// - weather.rs: weather reading -> bundle adjustments and scale nudges
// - mood.rs:    chaotic / insect-burst / hardcore mood timers
// - mode.rs:    `ModeMachine`: key and scale rotation plus moods
// - pedal.rs:   `PedalController`: when to press and release pedals
// - synth/:     the synthesizers (notes, chords, counterpoint, arpeggios,
//               parallel motion, insect bursts) and the per-style models
//               (animal calls, traffic, furniture, marbles, tone rows)
// - style/:     one `StyleProfile` per style
// - engine.rs:  `Engine`, the tick driver
// - midi.rs:    Standard MIDI File export of recorded streams
//
// Given the same config, seed and clock readings, the engine produces the
// same stream.

pub mod clock;
pub mod config;
pub mod engine;
pub mod midi;
pub mod mode;
pub mod mood;
pub mod params;
pub mod pedal;
pub mod scale;
pub mod style;
pub mod synth;
pub mod weather;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, EngineState};
pub use mood::Mood;
pub use params::{ParameterBundle, Span};
pub use style::{Style, StyleProfile, UnknownStyle};
