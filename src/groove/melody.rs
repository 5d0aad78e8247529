// Melody Segmentation - Packs quantized notes into 4/4 bars
// Greedy bar filling followed by absolute start-time assignment

use serde::{Deserialize, Serialize};

use super::quantize::{QuantizeSettings, RawNote};
use crate::notes::{Letter, NoteEvent, BEATS_PER_BAR};

/// One 4/4 bar of melody notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar number (0-indexed)
    pub index: usize,

    /// Notes in playing order, times absolute in beats
    pub notes: Vec<NoteEvent>,
}

impl Bar {
    /// Beat at which this bar starts
    pub fn start_time(&self) -> f64 {
        self.index as f64 * BEATS_PER_BAR
    }

    /// Sum of note durations in beats
    pub fn total_duration(&self) -> f64 {
        self.notes.iter().map(|n| n.duration).sum()
    }

    /// Note letters in playing order (unnamed pitches skipped)
    pub fn letters(&self) -> Vec<Letter> {
        self.notes.iter().filter_map(|n| n.letter()).collect()
    }
}

/// A quantized melody split into bars
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Melody {
    pub bars: Vec<Bar>,
}

impl Melody {
    /// Quantize raw detector notes and segment them into bars
    pub fn from_raw_notes(raw_notes: &[RawNote], settings: &QuantizeSettings) -> Self {
        let quantized: Vec<NoteEvent> = raw_notes.iter().map(|n| settings.quantize_note(n)).collect();
        Melody::from_quantized(quantized)
    }

    /// Segment already-quantized notes into bars and assign their start times
    ///
    /// A note that would overflow the current bar closes it and opens the
    /// next one. Notes are never split: a note longer than a bar sits alone.
    pub fn from_quantized(notes: Vec<NoteEvent>) -> Self {
        let mut groups: Vec<Vec<NoteEvent>> = Vec::new();
        let mut current: Vec<NoteEvent> = Vec::new();
        let mut running = 0.0;

        for note in notes {
            if running + note.duration > BEATS_PER_BAR && !current.is_empty() {
                groups.push(std::mem::take(&mut current));
                running = 0.0;
            }
            running += note.duration;
            current.push(note);
        }

        if !current.is_empty() {
            groups.push(current);
        }

        let bars = groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| {
                let mut time = index as f64 * BEATS_PER_BAR;
                let notes = group
                    .into_iter()
                    .map(|note| {
                        let placed = note.at_time(time);
                        time += note.duration;
                        placed
                    })
                    .collect();
                Bar { index, notes }
            })
            .collect();

        Melody { bars }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Total length in beats (whole bars)
    pub fn total_beats(&self) -> f64 {
        self.bars.len() as f64 * BEATS_PER_BAR
    }

    /// Letters of every bar, in bar order
    pub fn bar_letters(&self) -> Vec<Vec<Letter>> {
        self.bars.iter().map(|b| b.letters()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(pitch: u8, duration: f64) -> NoteEvent {
        NoteEvent::new(pitch, 0.0, duration, 80)
    }

    #[test]
    fn test_fills_bars_greedily() {
        let melody = Melody::from_quantized(vec![
            note(60, 1.0),
            note(62, 1.0),
            note(64, 2.0),
            note(65, 2.0),
            note(67, 1.0),
        ]);

        assert_eq!(melody.bar_count(), 2);
        assert_eq!(melody.bars[0].notes.len(), 3);
        assert_eq!(melody.bars[1].notes.len(), 2);
        assert_eq!(melody.bars[0].total_duration(), 4.0);
    }

    #[test]
    fn test_overflow_closes_bar_under_capacity() {
        // 2 + 1 = 3, the next half note would make 5
        let melody = Melody::from_quantized(vec![note(60, 2.0), note(62, 1.0), note(64, 2.0)]);

        assert_eq!(melody.bar_count(), 2);
        assert_eq!(melody.bars[0].total_duration(), 3.0);
        assert_eq!(melody.bars[1].notes[0].pitch, 64);
    }

    #[test]
    fn test_assigns_absolute_times() {
        let melody = Melody::from_quantized(vec![
            note(60, 1.0),
            note(62, 0.5),
            note(64, 2.0),
            note(65, 4.0),
            note(67, 0.25),
        ]);

        let times: Vec<f64> = melody.bars.iter().flat_map(|b| b.notes.iter().map(|n| n.time)).collect();
        assert_eq!(times, vec![0.0, 1.0, 1.5, 4.0, 8.0]);
        assert_eq!(melody.bars[2].start_time(), 8.0);
    }

    #[test]
    fn test_overlong_note_sits_alone() {
        let melody = Melody::from_quantized(vec![note(60, 1.0), note(62, 6.0), note(64, 1.0)]);

        assert_eq!(melody.bar_count(), 3);
        assert_eq!(melody.bars[1].notes.len(), 1);
        assert_eq!(melody.bars[1].total_duration(), 6.0);
        assert_eq!(melody.bars[2].notes[0].time, 8.0);
    }

    #[test]
    fn test_bar_capacity_invariant() {
        let durations = [0.25, 1.0, 2.0, 0.5, 4.0, 1.0, 1.0, 2.0, 0.25, 0.25, 4.0, 0.5];
        let notes: Vec<NoteEvent> = durations.iter().map(|&d| note(60, d)).collect();
        let melody = Melody::from_quantized(notes);

        for bar in &melody.bars {
            assert!(bar.total_duration() <= BEATS_PER_BAR || bar.notes.len() == 1);
        }
        let total: usize = melody.bars.iter().map(|b| b.notes.len()).sum();
        assert_eq!(total, durations.len());
    }

    #[test]
    fn test_from_raw_notes_quantizes() {
        let raw = vec![
            RawNote { time: 0.0, pitch: 60.2, duration: 1.1, volume: 70.0 },
            RawNote { time: 0.4, pitch: 63.6, duration: 2.2, volume: 100.0 },
        ];
        let melody = Melody::from_raw_notes(&raw, &QuantizeSettings::beats());

        let notes = &melody.bars[0].notes;
        assert_eq!(notes[0].pitch, 60);
        assert_eq!(notes[0].duration, 1.0);
        assert_eq!(notes[0].volume, 64);
        assert_eq!(notes[1].pitch, 64);
        assert_eq!(notes[1].duration, 2.0);
        assert_eq!(notes[1].time, 1.0);
    }

    #[test]
    fn test_empty_melody() {
        let melody = Melody::from_quantized(Vec::new());
        assert!(melody.is_empty());
        assert_eq!(melody.total_beats(), 0.0);
    }
}
