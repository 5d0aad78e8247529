// Arrangement Director - Per-phrase instrumentation decisions
// Chunks the melody into phrases, looks up each phrase's density level
// and dispatches the generated parts to a note sink

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use super::levels::{ArrangementLevelMap, InstrumentTag};
use super::phrase::{chunk_phrases, ArpeggioStyle, Phrase};
use crate::density::{DensityCurve, DensitySettings};
use crate::error::ArrangementError;
use crate::groove::{Melody, QuantizeSettings};
use crate::harmony::{in_chord_letters, infer_chords};
use crate::notes::{Dynamic, Letter, NoteEvent};

/// Receiver of generated notes, one stream per instrument tag
pub trait NoteSink {
    fn add_note(&mut self, tag: InstrumentTag, note: &NoteEvent);
}

/// Plain per-tag collection, handy for inspection
impl NoteSink for BTreeMap<InstrumentTag, Vec<NoteEvent>> {
    fn add_note(&mut self, tag: InstrumentTag, note: &NoteEvent) {
        self.entry(tag).or_default().push(note.clone());
    }
}

/// Melody octaves whose every voicing stays inside the C0-C8 pitch table
pub const MELODY_OCTAVES: RangeInclusive<i8> = 4..=6;

/// Arrangement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrangementConfig {
    /// Bars per phrase
    pub phrase_bars: usize,

    /// Octave the melody converges to
    pub melody_octave: i8,

    /// Quantizer settings for raw detector notes
    pub quantize: QuantizeSettings,

    /// Density and emphasis analysis settings
    pub density: DensitySettings,

    /// Custom level table (tags introduced per level), default table if absent
    pub levels: Option<Vec<Vec<InstrumentTag>>>,
}

impl Default for ArrangementConfig {
    fn default() -> Self {
        ArrangementConfig {
            phrase_bars: 2,
            melody_octave: 4,
            quantize: QuantizeSettings::default(),
            density: DensitySettings::default(),
            levels: None,
        }
    }
}

impl ArrangementConfig {
    /// Check the settings and build the level map they describe
    pub fn validate(&self) -> Result<ArrangementLevelMap, ArrangementError> {
        if self.phrase_bars == 0 {
            return Err(ArrangementError::config("phrase_bars must be at least 1"));
        }
        // Bass G/A/B roots sit four octaves under the melody, lead and organ reach one above
        if !MELODY_OCTAVES.contains(&self.melody_octave) {
            return Err(ArrangementError::config(format!(
                "melody_octave {} outside {}-{}",
                self.melody_octave,
                MELODY_OCTAVES.start(),
                MELODY_OCTAVES.end()
            )));
        }
        if !(self.quantize.duration_scale > 0.0) {
            return Err(ArrangementError::config("quantize.duration_scale must be positive"));
        }

        match &self.levels {
            Some(levels) => ArrangementLevelMap::from_levels(levels.clone()),
            None => Ok(ArrangementLevelMap::default()),
        }
    }
}

/// What the director decided for one phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseDecision {
    pub index: usize,

    /// Phrase start in beats
    pub start_beat: f64,

    /// Start relative to the whole melody [0, 1]
    pub relative_position: f64,

    /// Density level read from the curve
    pub level: u8,

    /// Instruments active at that level
    pub active: Vec<InstrumentTag>,

    /// Chord root per bar
    pub chords: Vec<Letter>,

    /// Letters of each bar that belong to its chord
    pub in_chord: Vec<Vec<Letter>>,

    /// Notes sent to each tag
    pub notes_emitted: BTreeMap<InstrumentTag, usize>,
}

/// Result of one arrangement pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrangementSummary {
    pub bar_count: usize,
    pub total_beats: f64,

    /// Chord root per bar over the whole melody
    pub chords: Vec<Letter>,

    pub phrases: Vec<PhraseDecision>,
}

impl ArrangementSummary {
    /// Notes emitted per tag across all phrases
    pub fn notes_per_tag(&self) -> BTreeMap<InstrumentTag, usize> {
        let mut totals = BTreeMap::new();
        for phrase in &self.phrases {
            for (&tag, &count) in &phrase.notes_emitted {
                *totals.entry(tag).or_insert(0) += count;
            }
        }
        totals
    }

    pub fn total_notes(&self) -> usize {
        self.phrases
            .iter()
            .flat_map(|p| p.notes_emitted.values())
            .sum()
    }
}

/// Top-level arrangement state machine
#[derive(Debug, Clone)]
pub struct Director {
    phrase_bars: usize,
    melody_octave: i8,
    level_map: ArrangementLevelMap,
}

impl Director {
    pub fn new(config: &ArrangementConfig) -> Result<Self, ArrangementError> {
        let level_map = config.validate()?;
        Ok(Director {
            phrase_bars: config.phrase_bars,
            melody_octave: config.melody_octave,
            level_map,
        })
    }

    pub fn level_map(&self) -> &ArrangementLevelMap {
        &self.level_map
    }

    /// Arrange a segmented melody into the sink
    ///
    /// Chords are inferred once over the whole melody. Each phrase emits its
    /// standardized melody as the lead, then every part active at its level.
    pub fn arrange(
        &self,
        melody: &Melody,
        curve: &DensityCurve,
        sink: &mut impl NoteSink,
    ) -> Result<ArrangementSummary, ArrangementError> {
        let assignment = infer_chords(&melody.bar_letters());
        let phrases = chunk_phrases(melody, &assignment.chords, self.phrase_bars)?;
        let total_beats = melody.total_beats();

        log::info!(
            "Arranging {} bars in {} phrases, chords used: {:?}",
            melody.bar_count(),
            phrases.len(),
            assignment.used
        );

        let mut decisions = Vec::with_capacity(phrases.len());

        for phrase in &phrases {
            let relative_position = if total_beats > 0.0 {
                phrase.start_time / total_beats
            } else {
                0.0
            };
            let level = curve.level_at(relative_position);
            let active = self.level_map.active(level)?;

            let mut notes_emitted = BTreeMap::new();

            let lead: Vec<NoteEvent> = phrase
                .standardize(self.melody_octave)?
                .into_iter()
                .flat_map(|bar| bar.notes)
                .collect();
            emit(sink, InstrumentTag::Lead, &lead, &mut notes_emitted);

            for &tag in active {
                let notes = self.build_part(phrase, tag)?;
                emit(sink, tag, &notes, &mut notes_emitted);
            }

            log::debug!(
                "Phrase {} at beat {} (relative {:.3}): level {}, chords {:?}, {} tags",
                phrase.index,
                phrase.start_time,
                relative_position,
                level,
                phrase.chords,
                active.len()
            );

            decisions.push(PhraseDecision {
                index: phrase.index,
                start_beat: phrase.start_time,
                relative_position,
                level,
                active: active.iter().copied().collect(),
                chords: phrase.chords.clone(),
                in_chord: phrase
                    .bars
                    .iter()
                    .zip(&phrase.chords)
                    .map(|(bar, &root)| in_chord_letters(root, &bar.letters()))
                    .collect(),
                notes_emitted,
            });
        }

        Ok(ArrangementSummary {
            bar_count: melody.bar_count(),
            total_beats,
            chords: assignment.chords,
            phrases: decisions,
        })
    }

    /// Notes of one part for one phrase
    fn build_part(&self, phrase: &Phrase, tag: InstrumentTag) -> Result<Vec<NoteEvent>, ArrangementError> {
        let octave = self.melody_octave;

        match tag {
            // The melody itself is the lead part
            InstrumentTag::Lead => Ok(Vec::new()),
            InstrumentTag::PianoChord => phrase.build_double_chord(octave - 1, Dynamic::P.velocity()),
            InstrumentTag::StringChord => phrase.build_chords(octave - 1, Dynamic::Pp.velocity()),
            InstrumentTag::GuitarChord => phrase.build_guitar_chord(octave - 1, Dynamic::Ppp.velocity()),
            InstrumentTag::StringArpeggio => {
                phrase.build_arpeggios(octave, Dynamic::Ppp.velocity(), ArpeggioStyle::Quarter)
            }
            InstrumentTag::Bass => phrase.build_double_root_note(octave - 3, Dynamic::Mf.velocity()),
            InstrumentTag::DrumLight => Ok(phrase.build_drums(Dynamic::P.velocity())),
            InstrumentTag::PianoArpeggio => {
                phrase.build_arpeggios(octave, Dynamic::P.velocity(), ArpeggioStyle::Eighth)
            }
            InstrumentTag::DrumHeavy => Ok(phrase.build_drums(Dynamic::Mf.velocity())),
            InstrumentTag::Organ => phrase.build_root_note(octave + 1, Dynamic::Ppp.velocity()),
            InstrumentTag::GuitarPowerChord => phrase.build_power_chord(octave - 2, Dynamic::P.velocity()),
        }
    }
}

fn emit(
    sink: &mut impl NoteSink,
    tag: InstrumentTag,
    notes: &[NoteEvent],
    counts: &mut BTreeMap<InstrumentTag, usize>,
) {
    if notes.is_empty() {
        return;
    }
    for note in notes {
        sink.add_note(tag, note);
    }
    *counts.entry(tag).or_insert(0) += notes.len();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::DensityBreakpoint;
    use crate::notes::Letter::*;

    type Parts = BTreeMap<InstrumentTag, Vec<NoteEvent>>;

    /// One bar per pitch group, each note a quarter
    fn melody(bars: &[&[u8]]) -> Melody {
        let notes = bars
            .iter()
            .flat_map(|pitches| {
                let mut bar: Vec<NoteEvent> = pitches.iter().map(|&p| NoteEvent::new(p, 0.0, 1.0, 80)).collect();
                // Pad to a full bar so every group lands in its own bar
                while bar.len() < 4 {
                    bar.push(NoteEvent::new(pitches[0], 0.0, 1.0, 80));
                }
                bar
            })
            .collect();
        Melody::from_quantized(notes)
    }

    fn curve(points: &[(f64, u8)]) -> DensityCurve {
        DensityCurve::new(
            points
                .iter()
                .map(|&(position, level)| DensityBreakpoint { position, level })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(ArrangementConfig::default().validate().is_ok());

        let zero_bars = ArrangementConfig {
            phrase_bars: 0,
            ..Default::default()
        };
        assert!(matches!(zero_bars.validate(), Err(ArrangementError::InvalidConfiguration(_))));

        let bad_levels = ArrangementConfig {
            levels: Some(vec![vec![InstrumentTag::Lead]]),
            ..Default::default()
        };
        assert!(Director::new(&bad_levels).is_err());

        for melody_octave in [1, 3, 7] {
            let config = ArrangementConfig {
                melody_octave,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ArrangementError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn test_every_part_fits_at_octave_bounds() {
        let config = |melody_octave| ArrangementConfig {
            melody_octave,
            levels: Some({
                let mut levels = vec![Vec::new(); 10];
                levels[0] = InstrumentTag::ALL.to_vec();
                levels
            }),
            ..Default::default()
        };
        // B bars give E, G, B and A bars give D, F, A; every bar spans octaves 4 and 5
        let melody = melody(&[&[71, 83], &[83, 71], &[71], &[69, 81], &[81], &[69]]);

        let mut low = Parts::new();
        let summary = Director::new(&config(4))
            .unwrap()
            .arrange(&melody, &DensityCurve::uniform(), &mut low)
            .unwrap();
        assert_eq!(summary.chords, vec![E, G, B, D, F, A]);
        // G0 bass under the G chord
        let lowest_bass = low[&InstrumentTag::Bass].iter().map(|n| n.pitch).min();
        assert_eq!(lowest_bass, Some(19));

        let mut high = Parts::new();
        Director::new(&config(6))
            .unwrap()
            .arrange(&melody, &DensityCurve::uniform(), &mut high)
            .unwrap();
        // B5 converges to B7
        let highest_lead = high[&InstrumentTag::Lead].iter().map(|n| n.pitch).max();
        assert_eq!(highest_lead, Some(107));
        assert!(high.contains_key(&InstrumentTag::Organ));
        assert!(high.contains_key(&InstrumentTag::GuitarPowerChord));
    }

    #[test]
    fn test_uniform_curve_uses_level_five() {
        let director = Director::new(&ArrangementConfig::default()).unwrap();
        let melody = melody(&[&[60, 64, 67], &[65, 69, 72]]);
        let mut parts = Parts::new();

        let summary = director.arrange(&melody, &DensityCurve::uniform(), &mut parts).unwrap();

        assert_eq!(summary.phrases.len(), 1);
        let decision = &summary.phrases[0];
        assert_eq!(decision.level, 5);
        assert!(decision.active.contains(&InstrumentTag::DrumLight));
        assert!(!decision.active.contains(&InstrumentTag::DrumHeavy));

        // Lead: the 8 melody notes, standardized into octave 4/5
        assert_eq!(parts[&InstrumentTag::Lead].len(), 8);
        // Bass: double root, C1 and D1
        let bass: Vec<u8> = parts[&InstrumentTag::Bass].iter().map(|n| n.pitch).collect();
        assert_eq!(bass, vec![24, 24, 26, 26]);
        assert!(parts[&InstrumentTag::Bass].iter().all(|n| n.volume == 80));
        // Light drums over two bars
        assert_eq!(parts[&InstrumentTag::DrumLight].len(), 13);
        assert!(!parts.contains_key(&InstrumentTag::Organ));
        // F ties with D on {F, A}; D is unused so it wins
        assert_eq!(summary.chords, vec![C, D]);
        assert_eq!(decision.in_chord, vec![vec![C, E, G], vec![F, A]]);
    }

    #[test]
    fn test_lead_is_always_emitted() {
        let config = ArrangementConfig::default();
        let director = Director::new(&config).unwrap();
        let melody = melody(&[&[62, 65, 69]]);
        let mut parts = Parts::new();

        // Level 0 from position 0 onward
        let summary = director
            .arrange(&melody, &curve(&[(0.0, 0), (1.0, 0)]), &mut parts)
            .unwrap();

        assert_eq!(summary.phrases[0].level, 0);
        assert_eq!(parts.keys().copied().collect::<Vec<_>>(), vec![InstrumentTag::Lead]);
        assert_eq!(parts[&InstrumentTag::Lead].len(), 4);
    }

    #[test]
    fn test_level_follows_curve_per_phrase() {
        let director = Director::new(&ArrangementConfig::default()).unwrap();
        // 4 bars -> 2 phrases at relative 0.0 and 0.5
        let melody = melody(&[&[60], &[62], &[64], &[65]]);
        let curve = curve(&[(0.0, 1), (0.4, 2), (1.0, 9)]);
        let mut parts = Parts::new();

        let summary = director.arrange(&melody, &curve, &mut parts).unwrap();

        let levels: Vec<u8> = summary.phrases.iter().map(|p| p.level).collect();
        assert_eq!(levels, vec![2, 9]);
        assert_eq!(summary.phrases[1].relative_position, 0.5);
        assert_eq!(summary.phrases[1].start_beat, 8.0);

        // Heavy drums only in the second phrase, never light drums there
        let heavy = &parts[&InstrumentTag::DrumHeavy];
        assert!(heavy.iter().all(|n| n.time >= 8.0));
        assert_eq!(heavy.len(), 13);
        assert!(!parts.contains_key(&InstrumentTag::DrumLight));
        assert!(summary.phrases[0].notes_emitted.contains_key(&InstrumentTag::StringChord));
    }

    #[test]
    fn test_custom_level_map_dispatch() {
        let mut levels = vec![Vec::new(); 10];
        levels[0] = vec![InstrumentTag::Organ, InstrumentTag::GuitarPowerChord];
        let config = ArrangementConfig {
            levels: Some(levels),
            ..Default::default()
        };
        let director = Director::new(&config).unwrap();
        // E then G (E already used)
        let melody = melody(&[&[64, 67, 71], &[67, 71]]);
        let mut parts = Parts::new();

        let summary = director.arrange(&melody, &DensityCurve::uniform(), &mut parts).unwrap();
        assert_eq!(summary.chords, vec![E, G]);

        // Organ at octave 5: E5, then G dropped to G4
        let organ: Vec<u8> = parts[&InstrumentTag::Organ].iter().map(|n| n.pitch).collect();
        assert_eq!(organ, vec![76, 67]);
        assert_eq!(parts[&InstrumentTag::Organ][0].volume, 16);
        // Power chords at octave 2: E2, then G1
        let power: Vec<u8> = parts[&InstrumentTag::GuitarPowerChord].iter().map(|n| n.pitch).collect();
        assert_eq!(power, vec![40, 47, 52, 31, 38, 43]);
    }

    #[test]
    fn test_summary_counts_match_sink() {
        let director = Director::new(&ArrangementConfig::default()).unwrap();
        let melody = melody(&[&[60, 64, 67], &[62, 65, 69], &[64, 67, 71]]);
        let mut parts = Parts::new();

        let summary = director
            .arrange(&melody, &curve(&[(0.0, 0), (0.5, 8), (1.0, 8)]), &mut parts)
            .unwrap();

        let totals = summary.notes_per_tag();
        for (tag, notes) in &parts {
            assert_eq!(totals[tag], notes.len());
        }
        assert_eq!(summary.total_notes(), parts.values().map(Vec::len).sum::<usize>());
        assert_eq!(summary.bar_count, 3);
        assert_eq!(summary.total_beats, 12.0);
    }

    #[test]
    fn test_empty_melody() {
        let director = Director::new(&ArrangementConfig::default()).unwrap();
        let mut parts = Parts::new();

        let summary = director
            .arrange(&Melody::default(), &DensityCurve::uniform(), &mut parts)
            .unwrap();

        assert!(summary.phrases.is_empty());
        assert!(parts.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let director = Director::new(&ArrangementConfig::default()).unwrap();
        let melody = melody(&[&[60, 64], &[62, 65], &[69, 72]]);

        let mut first = Parts::new();
        let mut second = Parts::new();
        let a = director.arrange(&melody, &DensityCurve::uniform(), &mut first).unwrap();
        let b = director.arrange(&melody, &DensityCurve::uniform(), &mut second).unwrap();

        assert_eq!(a, b);
        assert_eq!(first, second);
    }
}
