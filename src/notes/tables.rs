// Note Tables - Fixed vocabularies the quantizer snaps onto
// Diatonic pitch table, dynamics, standard durations and GM drum keys

use serde::{Deserialize, Serialize};

/// Every C-major pitch from C0 (12) to C8 (108), ascending
///
/// Index `i` maps to letter `i % 7` (C first) in octave `i / 7`.
pub const PITCH_TABLE: [u8; 57] = [
    12, 14, 16, 17, 19, 21, 23, // octave 0
    24, 26, 28, 29, 31, 33, 35, // octave 1
    36, 38, 40, 41, 43, 45, 47, // octave 2
    48, 50, 52, 53, 55, 57, 59, // octave 3
    60, 62, 64, 65, 67, 69, 71, // octave 4
    72, 74, 76, 77, 79, 81, 83, // octave 5
    84, 86, 88, 89, 91, 93, 95, // octave 6
    96, 98, 100, 101, 103, 105, 107, // octave 7
    108, // C8
];

/// Standard note durations in beats, ascending
pub const STANDARD_DURATIONS: [f64; 5] = [
    SIXTEENTH_NOTE,
    EIGHTH_NOTE,
    QUARTER_NOTE,
    HALF_NOTE,
    WHOLE_NOTE,
];

pub const SIXTEENTH_NOTE: f64 = 0.25;
pub const EIGHTH_NOTE: f64 = 0.5;
pub const QUARTER_NOTE: f64 = 1.0;
pub const HALF_NOTE: f64 = 2.0;
pub const WHOLE_NOTE: f64 = 4.0;

/// Beats in one 4/4 bar
pub const BEATS_PER_BAR: f64 = 4.0;

/// General MIDI percussion keys (channel 10)
pub const DRUM_BASS: u8 = 36; // C1
pub const DRUM_SNARE: u8 = 38; // D1
pub const DRUM_CLOSED_HIHAT: u8 = 42; // F#1

/// Dynamic markings mapped to MIDI velocities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dynamic {
    Ppp,
    Pp,
    P,
    Mp,
    Mf,
    F,
    Ff,
    Fff,
}

impl Dynamic {
    /// All dynamics from softest to loudest
    pub const ALL: [Dynamic; 8] = [
        Dynamic::Ppp,
        Dynamic::Pp,
        Dynamic::P,
        Dynamic::Mp,
        Dynamic::Mf,
        Dynamic::F,
        Dynamic::Ff,
        Dynamic::Fff,
    ];

    /// MIDI velocity for this dynamic
    pub fn velocity(&self) -> u8 {
        match self {
            Dynamic::Ppp => 16,
            Dynamic::Pp => 33,
            Dynamic::P => 49,
            Dynamic::Mp => 64,
            Dynamic::Mf => 80,
            Dynamic::F => 96,
            Dynamic::Ff => 112,
            Dynamic::Fff => 127,
        }
    }

    pub fn to_string(&self) -> &'static str {
        match self {
            Dynamic::Ppp => "ppp",
            Dynamic::Pp => "pp",
            Dynamic::P => "p",
            Dynamic::Mp => "mp",
            Dynamic::Mf => "mf",
            Dynamic::F => "f",
            Dynamic::Ff => "ff",
            Dynamic::Fff => "fff",
        }
    }
}

/// Velocities of all dynamics, ascending
pub fn dynamic_levels() -> [f64; 8] {
    Dynamic::ALL.map(|d| d.velocity() as f64)
}
