// Arranger - Density-driven accompaniment for a quantized melody
// Phrase parts, drum templates, instrumentation levels and MIDI export

pub mod director;
pub mod drums;
pub mod levels;
pub mod midi;
pub mod phrase;

// Re-export main types
pub use director::{ArrangementConfig, ArrangementSummary, Director, NoteSink, PhraseDecision};
pub use drums::{drum_bars, DrumVoice};
pub use levels::{ArrangementLevelMap, InstrumentTag, LEVEL_COUNT};
pub use midi::{channel_for, export_midi, Channel, MidiExportOptions, ScheduledNote, TrackMap};
pub use phrase::{arpeggio_sequence, chunk_phrases, ArpeggioStyle, Phrase};
