// Phrase Builder - Derives accompaniment parts from bars and their chords
// Octave convergence for the melody plus chord, arpeggio, root and drum parts

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::drums::drum_bars;
use crate::error::ArrangementError;
use crate::groove::{Bar, Melody};
use crate::harmony::chord_pitches;
use crate::notes::{Letter, NoteEvent, NoteName, BEATS_PER_BAR, EIGHTH_NOTE, HALF_NOTE, QUARTER_NOTE};

/// Strum rhythm of one guitar bar, in beats
pub const GUITAR_STRUM_PATTERN: [f64; 7] = [1.0, 0.5, 0.5, 1.0, 0.5, 0.25, 0.25];

/// Slots filled by one arpeggio
pub const ARPEGGIO_NOTE_COUNT: usize = 4;

/// Each arpeggio note rings this much longer than its slot
pub const ARPEGGIO_SUSTAIN: f64 = 1.5;

/// Arpeggio subdivision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArpeggioStyle {
    /// One chord tone per quarter note
    Quarter,

    /// One chord tone per eighth note
    Eighth,
}

impl ArpeggioStyle {
    /// Slot length in beats
    pub fn note_duration(&self) -> f64 {
        match self {
            ArpeggioStyle::Quarter => QUARTER_NOTE,
            ArpeggioStyle::Eighth => EIGHTH_NOTE,
        }
    }
}

/// A window of consecutive bars with the chord chosen for each bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    /// Phrase number (0-indexed)
    pub index: usize,

    /// Bars of melody notes
    pub bars: Vec<Bar>,

    /// Chord root per bar
    pub chords: Vec<Letter>,

    /// Start time in beats
    pub start_time: f64,
}

impl Phrase {
    /// Create a phrase; every bar needs exactly one chord
    pub fn new(
        index: usize,
        bars: Vec<Bar>,
        chords: Vec<Letter>,
        start_time: f64,
    ) -> Result<Self, ArrangementError> {
        if bars.len() != chords.len() {
            return Err(ArrangementError::musical(format!(
                "phrase {} has {} bars but {} chords",
                index,
                bars.len(),
                chords.len()
            )));
        }

        Ok(Phrase {
            index,
            bars,
            chords,
            start_time,
        })
    }

    /// Length of this phrase in bars
    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    /// Melody notes of the whole phrase, in order
    pub fn notes(&self) -> impl Iterator<Item = &NoteEvent> {
        self.bars.iter().flat_map(|b| b.notes.iter())
    }

    /// Collapse the melody into two adjacent octaves
    ///
    /// Distinct octaves are sorted and split at half their count, rounded
    /// half to even (1 -> 0, 3 -> 2, 5 -> 2); the lower part moves to
    /// `reference_octave`, the rest to `reference_octave + 1`. A phrase sung
    /// in one octave therefore lands on `reference_octave + 1`. Notes
    /// without a diatonic name pass through untouched.
    pub fn standardize(&self, reference_octave: i8) -> Result<Vec<Bar>, ArrangementError> {
        let octaves: Vec<i8> = self
            .notes()
            .filter_map(|n| n.note_name.map(|name| name.octave))
            .collect::<BTreeSet<i8>>()
            .into_iter()
            .collect();

        let split = (octaves.len() as f64 / 2.0).round_ties_even() as usize;
        let lower = &octaves[..split];

        self.bars
            .iter()
            .map(|bar| -> Result<Bar, ArrangementError> {
                let notes = bar
                    .notes
                    .iter()
                    .map(|note| match note.note_name {
                        Some(name) => {
                            let target = if lower.contains(&name.octave) {
                                reference_octave
                            } else {
                                reference_octave + 1
                            };
                            let renamed = name.with_octave(target);
                            note.renamed(renamed).ok_or_else(|| {
                                ArrangementError::musical(format!("unable to find {} note", renamed))
                            })
                        }
                        None => Ok(note.clone()),
                    })
                    .collect::<Result<Vec<NoteEvent>, ArrangementError>>()?;
                Ok(Bar {
                    index: bar.index,
                    notes,
                })
            })
            .collect()
    }

    /// One whole-bar block chord per bar
    pub fn build_chords(&self, octave: i8, volume: u8) -> Result<Vec<NoteEvent>, ArrangementError> {
        self.build_blocks(octave, volume, &[BEATS_PER_BAR])
    }

    /// Two half-bar block chords per bar
    pub fn build_double_chord(&self, octave: i8, volume: u8) -> Result<Vec<NoteEvent>, ArrangementError> {
        self.build_blocks(octave, volume, &[HALF_NOTE, HALF_NOTE])
    }

    /// Seven strums per bar, each voicing the chord with its root doubled an octave up
    pub fn build_guitar_chord(&self, octave: i8, volume: u8) -> Result<Vec<NoteEvent>, ArrangementError> {
        let mut notes = Vec::new();

        for (bar_time, &root) in self.bar_times().zip(&self.chords) {
            let mut pitches = chord_pitches(root, voicing_octave(root, octave))?;
            let doubled = pitches[0].saturating_add(12).min(127);
            pitches.push(doubled);

            let mut time = bar_time;
            for duration in GUITAR_STRUM_PATTERN {
                notes.extend(pitches.iter().map(|&p| NoteEvent::new(p, time, duration, volume)));
                time += duration;
            }
        }

        Ok(notes)
    }

    /// Chord tones played one after another from each bar start
    ///
    /// Each note sounds 1.5x its slot. Chords with fewer than four tones
    /// are padded by walking back down the tones, skipping the top one.
    pub fn build_arpeggios(
        &self,
        octave: i8,
        volume: u8,
        style: ArpeggioStyle,
    ) -> Result<Vec<NoteEvent>, ArrangementError> {
        let slot = style.note_duration();
        let mut notes = Vec::new();

        for (bar_time, &root) in self.bar_times().zip(&self.chords) {
            let pitches = chord_pitches(root, voicing_octave(root, octave))?;
            let sequence = arpeggio_sequence(&pitches, ARPEGGIO_NOTE_COUNT);

            notes.extend(sequence.iter().enumerate().map(|(i, &p)| {
                NoteEvent::new(p, bar_time + i as f64 * slot, slot * ARPEGGIO_SUSTAIN, volume)
            }));
        }

        Ok(notes)
    }

    /// One whole-bar chord root per bar
    pub fn build_root_note(&self, octave: i8, volume: u8) -> Result<Vec<NoteEvent>, ArrangementError> {
        self.build_roots(octave, volume, &[BEATS_PER_BAR])
    }

    /// Two half-bar chord roots per bar
    pub fn build_double_root_note(&self, octave: i8, volume: u8) -> Result<Vec<NoteEvent>, ArrangementError> {
        self.build_roots(octave, volume, &[HALF_NOTE, HALF_NOTE])
    }

    /// Root, fifth and octave held for the whole bar
    pub fn build_power_chord(&self, octave: i8, volume: u8) -> Result<Vec<NoteEvent>, ArrangementError> {
        let mut notes = Vec::new();

        for (bar_time, &root) in self.bar_times().zip(&self.chords) {
            let root_pitch = root_pitch(root, voicing_octave(root, octave))?;
            for interval in [0u8, 7, 12] {
                let pitch = root_pitch.saturating_add(interval).min(127);
                notes.push(NoteEvent::new(pitch, bar_time, BEATS_PER_BAR, volume));
            }
        }

        Ok(notes)
    }

    /// Fixed drum template covering every bar of the phrase
    pub fn build_drums(&self, volume: u8) -> Vec<NoteEvent> {
        drum_bars(self.start_time, self.bar_count(), volume)
            .into_iter()
            .flatten()
            .collect()
    }

    /// Start time of each bar in the phrase
    fn bar_times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.bar_count()).map(move |i| self.start_time + i as f64 * BEATS_PER_BAR)
    }

    /// Block chords filling each bar with the given rhythm
    fn build_blocks(&self, octave: i8, volume: u8, rhythm: &[f64]) -> Result<Vec<NoteEvent>, ArrangementError> {
        let mut notes = Vec::new();

        for (bar_time, &root) in self.bar_times().zip(&self.chords) {
            let pitches = chord_pitches(root, voicing_octave(root, octave))?;
            let mut time = bar_time;
            for &duration in rhythm {
                notes.extend(pitches.iter().map(|&p| NoteEvent::new(p, time, duration, volume)));
                time += duration;
            }
        }

        Ok(notes)
    }

    /// Chord roots filling each bar with the given rhythm
    fn build_roots(&self, octave: i8, volume: u8, rhythm: &[f64]) -> Result<Vec<NoteEvent>, ArrangementError> {
        let mut notes = Vec::new();

        for (bar_time, &root) in self.bar_times().zip(&self.chords) {
            let pitch = root_pitch(root, voicing_octave(root, octave))?;
            let mut time = bar_time;
            for &duration in rhythm {
                notes.push(NoteEvent::new(pitch, time, duration, volume));
                time += duration;
            }
        }

        Ok(notes)
    }
}

/// Split a melody into phrases of `phrase_bars` bars, pairing each bar with its chord
pub fn chunk_phrases(
    melody: &Melody,
    chords: &[Letter],
    phrase_bars: usize,
) -> Result<Vec<Phrase>, ArrangementError> {
    if phrase_bars == 0 {
        return Err(ArrangementError::config("phrase size must be at least one bar"));
    }
    if chords.len() != melody.bar_count() {
        return Err(ArrangementError::musical(format!(
            "{} chords for {} bars",
            chords.len(),
            melody.bar_count()
        )));
    }

    melody
        .bars
        .chunks(phrase_bars)
        .zip(chords.chunks(phrase_bars))
        .enumerate()
        .map(|(index, (bars, chords))| {
            let start_time = bars[0].start_time();
            Phrase::new(index, bars.to_vec(), chords.to_vec(), start_time)
        })
        .collect()
}

/// Chord tones in playing order, folded back down to fill `note_count` slots
pub fn arpeggio_sequence(pitches: &[u8], note_count: usize) -> Vec<u8> {
    let mut sequence = pitches.to_vec();

    if sequence.len() < note_count && pitches.len() > 1 {
        for &pitch in pitches[..pitches.len() - 1].iter().rev() {
            sequence.push(pitch);
            if sequence.len() == note_count {
                break;
            }
        }
    }

    sequence
}

/// Upper-third letters (G, A, B) voice one octave lower
fn voicing_octave(root: Letter, octave: i8) -> i8 {
    if root.is_upper_third() {
        octave - 1
    } else {
        octave
    }
}

fn root_pitch(root: Letter, octave: i8) -> Result<u8, ArrangementError> {
    let name = NoteName::new(root, octave);
    name.pitch()
        .ok_or_else(|| ArrangementError::musical(format!("unable to find {} note", name)))
}
