// Note model module
// Shared note value type and the fixed musical vocabularies

pub mod tables;
pub mod types;

pub use tables::{
    Dynamic, BEATS_PER_BAR, DRUM_BASS, DRUM_CLOSED_HIHAT, DRUM_SNARE, EIGHTH_NOTE, HALF_NOTE,
    PITCH_TABLE, QUARTER_NOTE, SIXTEENTH_NOTE, STANDARD_DURATIONS, WHOLE_NOTE,
};
pub use types::{Letter, NoteEvent, NoteName};
