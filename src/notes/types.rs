// Note Model - Shared value types for every pitched event
// Letters, note names and the NoteEvent passed between all stages

use serde::{Deserialize, Serialize};
use std::fmt;

use super::tables::PITCH_TABLE;

/// Diatonic letter of the C-major scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    /// All letters in scale order
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Scale position (C = 1 ... B = 7)
    pub fn position(&self) -> u8 {
        *self as u8 + 1
    }

    /// Letter at a scale position (1-indexed)
    pub fn from_position(position: u8) -> Option<Letter> {
        match position {
            1..=7 => Some(Letter::ALL[(position - 1) as usize]),
            _ => None,
        }
    }

    /// Parse a single letter, case-insensitive
    pub fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    /// G, A and B voice one octave lower so chords stay under the melody
    pub fn is_upper_third(&self) -> bool {
        matches!(self, Letter::G | Letter::A | Letter::B)
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        };
        write!(f, "{}", c)
    }
}

/// Diatonic letter plus octave, e.g. C4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteName {
    pub letter: Letter,
    pub octave: i8,
}

impl NoteName {
    pub fn new(letter: Letter, octave: i8) -> Self {
        NoteName { letter, octave }
    }

    /// MIDI pitch of this name, if it is part of the pitch table
    pub fn pitch(&self) -> Option<u8> {
        if self.octave < 0 {
            return None;
        }
        let index = self.octave as usize * 7 + (self.letter.position() - 1) as usize;
        PITCH_TABLE.get(index).copied()
    }

    /// Look up the name of a table pitch; non-diatonic or out-of-range pitches have none
    pub fn from_pitch(pitch: u8) -> Option<NoteName> {
        let index = PITCH_TABLE.binary_search(&pitch).ok()?;
        let letter = Letter::ALL[index % 7];
        Some(NoteName::new(letter, (index / 7) as i8))
    }

    /// Same letter in another octave
    pub fn with_octave(&self, octave: i8) -> NoteName {
        NoteName::new(self.letter, octave)
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.octave)
    }
}

/// A pitched event ready for a sink: `add_note(pitch, time, duration, volume)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI pitch (0-127)
    pub pitch: u8,

    /// Start time in beats
    pub time: f64,

    /// Duration in beats
    pub duration: f64,

    /// MIDI velocity (0-127)
    pub volume: u8,

    /// Diatonic name, `None` when the pitch is outside the table
    pub note_name: Option<NoteName>,
}

impl NoteEvent {
    /// Create a note, deriving its name from the pitch table
    pub fn new(pitch: u8, time: f64, duration: f64, volume: u8) -> Self {
        let pitch = pitch.min(127);
        NoteEvent {
            pitch,
            time,
            duration,
            volume: volume.min(127),
            note_name: NoteName::from_pitch(pitch),
        }
    }

    /// Copy of this note moved to another start time
    pub fn at_time(&self, time: f64) -> Self {
        NoteEvent {
            time,
            ..self.clone()
        }
    }

    /// Copy of this note re-pitched to a named note
    ///
    /// Returns `None` if the name falls outside the pitch table.
    pub fn renamed(&self, name: NoteName) -> Option<Self> {
        let pitch = name.pitch()?;
        Some(NoteEvent {
            pitch,
            note_name: Some(name),
            ..self.clone()
        })
    }

    /// Diatonic letter, if named
    pub fn letter(&self) -> Option<Letter> {
        self.note_name.map(|n| n.letter)
    }

    /// Beat at which this note stops sounding
    pub fn end_time(&self) -> f64 {
        self.time + self.duration
    }
}
