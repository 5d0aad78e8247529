// Drum Patterns - Fixed one- and two-bar templates tiled across N bars
// Deterministic: the same bar count always yields the same hits

use serde::{Deserialize, Serialize};

use crate::notes::{NoteEvent, BEATS_PER_BAR, DRUM_BASS, DRUM_CLOSED_HIHAT, DRUM_SNARE, QUARTER_NOTE};

/// Drum voices used by the templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrumVoice {
    Bass,
    Snare,
    ClosedHihat,
}

impl DrumVoice {
    /// General MIDI percussion key
    pub fn midi_note(&self) -> u8 {
        match self {
            DrumVoice::Bass => DRUM_BASS,
            DrumVoice::Snare => DRUM_SNARE,
            DrumVoice::ClosedHihat => DRUM_CLOSED_HIHAT,
        }
    }
}

/// Beat offset within the bar and the voice struck there
type Hit = (f64, DrumVoice);

/// Basic backbeat: hat on every beat, bass on 1, snare on 3
const SINGLE_BAR: [Hit; 6] = [
    (0.0, DrumVoice::Bass),
    (0.0, DrumVoice::ClosedHihat),
    (1.0, DrumVoice::ClosedHihat),
    (2.0, DrumVoice::ClosedHihat),
    (2.0, DrumVoice::Snare),
    (3.0, DrumVoice::ClosedHihat),
];

/// Second bar of the two-bar template, with an extra bass hit on beat 2
const SECOND_BAR: [Hit; 7] = [
    (0.0, DrumVoice::Bass),
    (0.0, DrumVoice::ClosedHihat),
    (1.0, DrumVoice::Bass),
    (1.0, DrumVoice::ClosedHihat),
    (2.0, DrumVoice::ClosedHihat),
    (2.0, DrumVoice::Snare),
    (3.0, DrumVoice::ClosedHihat),
];

/// Drum hits for `bar_count` bars starting at `start_time`, one Vec per bar
///
/// One bar uses the single-bar template. Otherwise the two-bar template is
/// tiled over the even part and an odd bar count ends with a single bar.
pub fn drum_bars(start_time: f64, bar_count: usize, volume: u8) -> Vec<Vec<NoteEvent>> {
    let templates = bar_templates(bar_count);

    templates
        .iter()
        .enumerate()
        .map(|(i, template)| {
            let bar_time = start_time + i as f64 * BEATS_PER_BAR;
            template
                .iter()
                .map(|&(beat, voice)| NoteEvent::new(voice.midi_note(), bar_time + beat, QUARTER_NOTE, volume))
                .collect()
        })
        .collect()
}

/// Template used for each bar
fn bar_templates(bar_count: usize) -> Vec<&'static [Hit]> {
    let mut templates: Vec<&'static [Hit]> = Vec::with_capacity(bar_count);

    for _ in 0..bar_count / 2 {
        templates.push(&SINGLE_BAR);
        templates.push(&SECOND_BAR);
    }
    if bar_count % 2 == 1 {
        templates.push(&SINGLE_BAR);
    }

    templates
}
