// The `MidiEvent` output contract.
//
// One `MidiEvent` is produced per engine tick and forwarded unchanged to the
// listener. It is a closed tagged union: the JSON form carries a `"type"`
// discriminator (`note`, `chord`, `parallelMotion`, ...) and camelCase
// fields, which is what the browser client switches on.
//
// Every variant that carries notes also carries the `currentKey` and
// `currentScale` that were active when it was generated. `pedal`, `silence`
// and `allNotesOff` carry no musical context.
//
// Style-specific variants name their source (`animal`, `object`/`pattern`)
// so clients can animate the right thing without inspecting pitches.

use serde::{Deserialize, Serialize};

use crate::types::{Note, Pedal, Scale, Tonic};

/// Jungle voices. Each has its own register and call shape in the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Animal {
    Parrot,
    Monkey,
    Frog,
    Toucan,
    Cricket,
}

impl Animal {
    pub const ALL: [Animal; 5] = [
        Animal::Parrot,
        Animal::Monkey,
        Animal::Frog,
        Animal::Toucan,
        Animal::Cricket,
    ];
}

/// Haunted-apartment objects that "speak".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FurnitureObject {
    Chair,
    Lamp,
    Bookshelf,
    Cabinet,
    Radiator,
    GhostSpoon,
    Window,
}

/// How a piece of furniture speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FurniturePattern {
    /// Staccato bursts around one pitch.
    Morse,
    /// A semitone slide up or down.
    Glissando,
    /// A broken, childlike fragment.
    Melody,
    /// A root plus one interval; consonant when harmonizing, dissonant when arguing.
    Harmony,
    /// The window: a low percussive cluster followed by enforced quiet.
    Slam,
}

/// One tick's worth of output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MidiEvent {
    Note {
        note: Note,
        current_key: Tonic,
        current_scale: Scale,
    },
    Chord {
        notes: Vec<Note>,
        current_key: Tonic,
        current_scale: Scale,
        /// Adjacent-semitone cluster rather than a stacked-thirds chord.
        #[serde(default)]
        cluster: bool,
    },
    Counterpoint {
        notes: Vec<Note>,
        current_key: Tonic,
        current_scale: Scale,
    },
    Arpeggio {
        notes: Vec<Note>,
        current_key: Tonic,
        current_scale: Scale,
    },
    ParallelMotion {
        notes: Vec<Note>,
        current_key: Tonic,
        current_scale: Scale,
    },
    InsectBurst {
        notes: Vec<Note>,
        current_key: Tonic,
        current_scale: Scale,
    },
    AnimalCall {
        animal: Animal,
        notes: Vec<Note>,
        current_key: Tonic,
        current_scale: Scale,
    },
    CarPass {
        notes: Vec<Note>,
        current_key: Tonic,
        current_scale: Scale,
    },
    Furniture {
        object: FurnitureObject,
        pattern: FurniturePattern,
        notes: Vec<Note>,
        current_key: Tonic,
        current_scale: Scale,
    },
    MarbleBounce {
        note: Note,
        current_key: Tonic,
        current_scale: Scale,
    },
    ToneRow {
        notes: Vec<Note>,
        current_key: Tonic,
        current_scale: Scale,
        /// Index (0–11) of the first row member in `notes`.
        row_position: u8,
    },
    Pedal {
        pedal: Pedal,
    },
    Silence {
        /// Milliseconds.
        duration: u32,
    },
    AllNotesOff,
}

impl MidiEvent {
    /// The notes this event sounds; empty for `pedal`, `silence` and
    /// `allNotesOff`.
    pub fn notes(&self) -> &[Note] {
        match self {
            MidiEvent::Note { note, .. } | MidiEvent::MarbleBounce { note, .. } => {
                std::slice::from_ref(note)
            }
            MidiEvent::Chord { notes, .. }
            | MidiEvent::Counterpoint { notes, .. }
            | MidiEvent::Arpeggio { notes, .. }
            | MidiEvent::ParallelMotion { notes, .. }
            | MidiEvent::InsectBurst { notes, .. }
            | MidiEvent::AnimalCall { notes, .. }
            | MidiEvent::CarPass { notes, .. }
            | MidiEvent::Furniture { notes, .. }
            | MidiEvent::ToneRow { notes, .. } => notes,
            MidiEvent::Pedal { .. } | MidiEvent::Silence { .. } | MidiEvent::AllNotesOff => &[],
        }
    }

    /// The key and scale the event was generated in, if it carries notes.
    pub fn context(&self) -> Option<(Tonic, Scale)> {
        match self {
            MidiEvent::Note { current_key, current_scale, .. }
            | MidiEvent::Chord { current_key, current_scale, .. }
            | MidiEvent::Counterpoint { current_key, current_scale, .. }
            | MidiEvent::Arpeggio { current_key, current_scale, .. }
            | MidiEvent::ParallelMotion { current_key, current_scale, .. }
            | MidiEvent::InsectBurst { current_key, current_scale, .. }
            | MidiEvent::AnimalCall { current_key, current_scale, .. }
            | MidiEvent::CarPass { current_key, current_scale, .. }
            | MidiEvent::Furniture { current_key, current_scale, .. }
            | MidiEvent::MarbleBounce { current_key, current_scale, .. }
            | MidiEvent::ToneRow { current_key, current_scale, .. } => {
                Some((*current_key, *current_scale))
            }
            MidiEvent::Pedal { .. } | MidiEvent::Silence { .. } | MidiEvent::AllNotesOff => None,
        }
    }

    /// True for events whose pitches are not drawn from the current scale:
    /// cluster chords, Doppler-bent car passes, animal calls and haunted
    /// furniture.
    pub fn is_chromatic_exception(&self) -> bool {
        matches!(
            self,
            MidiEvent::Chord { cluster: true, .. }
                | MidiEvent::CarPass { .. }
                | MidiEvent::AnimalCall { .. }
                | MidiEvent::Furniture { .. }
        )
    }

    /// The wire tag, e.g. `"parallelMotion"`.
    pub fn kind(&self) -> &'static str {
        match self {
            MidiEvent::Note { .. } => "note",
            MidiEvent::Chord { .. } => "chord",
            MidiEvent::Counterpoint { .. } => "counterpoint",
            MidiEvent::Arpeggio { .. } => "arpeggio",
            MidiEvent::ParallelMotion { .. } => "parallelMotion",
            MidiEvent::InsectBurst { .. } => "insectBurst",
            MidiEvent::AnimalCall { .. } => "animalCall",
            MidiEvent::CarPass { .. } => "carPass",
            MidiEvent::Furniture { .. } => "furniture",
            MidiEvent::MarbleBounce { .. } => "marbleBounce",
            MidiEvent::ToneRow { .. } => "toneRow",
            MidiEvent::Pedal { .. } => "pedal",
            MidiEvent::Silence { .. } => "silence",
            MidiEvent::AllNotesOff => "allNotesOff",
        }
    }
}
