// Harmony module
// Diatonic chord tables, per-bar chord inference and chord voicing

pub mod chords;
pub mod inference;

pub use chords::{chord_candidates, chord_pitches, degree_members, in_chord_letters, interval_gaps};
pub use inference::{infer_chords, ChordAssignment, ChordSelector};
