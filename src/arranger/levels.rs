// Arrangement Levels - Instrument tags and the density-level instrumentation table
// Level L activates every tag attached to levels 0..=L

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::density::MAX_LEVEL;
use crate::error::ArrangementError;

/// Number of density levels in a level map
pub const LEVEL_COUNT: usize = MAX_LEVEL as usize + 1;

/// Output part identifiers, each bound to one playback channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentTag {
    Lead,
    PianoChord,
    StringChord,
    GuitarChord,
    StringArpeggio,
    Bass,
    DrumLight,
    PianoArpeggio,
    DrumHeavy,
    Organ,
    GuitarPowerChord,
}

impl InstrumentTag {
    pub const ALL: [InstrumentTag; 11] = [
        InstrumentTag::Lead,
        InstrumentTag::PianoChord,
        InstrumentTag::StringChord,
        InstrumentTag::GuitarChord,
        InstrumentTag::StringArpeggio,
        InstrumentTag::Bass,
        InstrumentTag::DrumLight,
        InstrumentTag::PianoArpeggio,
        InstrumentTag::DrumHeavy,
        InstrumentTag::Organ,
        InstrumentTag::GuitarPowerChord,
    ];

    /// Convert from string representation
    pub fn from_string(s: &str) -> Option<Self> {
        InstrumentTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.to_string() == s.to_lowercase())
    }

    /// Convert to string representation
    pub fn to_string(&self) -> &'static str {
        match self {
            InstrumentTag::Lead => "lead",
            InstrumentTag::PianoChord => "piano_chord",
            InstrumentTag::StringChord => "string_chord",
            InstrumentTag::GuitarChord => "guitar_chord",
            InstrumentTag::StringArpeggio => "string_arpeggio",
            InstrumentTag::Bass => "bass",
            InstrumentTag::DrumLight => "drum_light",
            InstrumentTag::PianoArpeggio => "piano_arpeggio",
            InstrumentTag::DrumHeavy => "drum_heavy",
            InstrumentTag::Organ => "organ",
            InstrumentTag::GuitarPowerChord => "guitar_power_chord",
        }
    }
}

/// Static table from density level to active instruments
///
/// Built once; the accumulated sets are precomputed so lookups are free.
/// Serialized as the per-level tag lists and rebuilt through `from_levels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<InstrumentTag>>", into = "Vec<Vec<InstrumentTag>>")]
pub struct ArrangementLevelMap {
    /// Tags introduced at each level
    levels: Vec<Vec<InstrumentTag>>,

    /// Accumulated active set per level
    active: Vec<BTreeSet<InstrumentTag>>,
}

impl Default for ArrangementLevelMap {
    fn default() -> Self {
        use InstrumentTag::*;

        let levels = vec![
            vec![Lead],
            vec![PianoChord],
            vec![StringChord],
            vec![],
            vec![GuitarChord, PianoArpeggio],
            vec![StringArpeggio, Bass, DrumLight],
            vec![],
            vec![],
            vec![DrumHeavy],
            vec![],
        ];
        let active = accumulate(&levels);

        ArrangementLevelMap { levels, active }
    }
}

impl ArrangementLevelMap {
    /// Build a map from the tags introduced at each of the 10 levels
    pub fn from_levels(levels: Vec<Vec<InstrumentTag>>) -> Result<Self, ArrangementError> {
        if levels.len() != LEVEL_COUNT {
            return Err(ArrangementError::config(format!(
                "level map needs {} levels, got {}",
                LEVEL_COUNT,
                levels.len()
            )));
        }

        let active = accumulate(&levels);
        Ok(ArrangementLevelMap { levels, active })
    }

    /// Build a map from string tags, e.g. loaded from a settings file
    pub fn from_names(levels: &[Vec<String>]) -> Result<Self, ArrangementError> {
        let parsed = levels
            .iter()
            .map(|names| {
                names
                    .iter()
                    .map(|name| {
                        InstrumentTag::from_string(name).ok_or_else(|| {
                            ArrangementError::config(format!("unknown instrument tag '{}'", name))
                        })
                    })
                    .collect::<Result<Vec<InstrumentTag>, ArrangementError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        ArrangementLevelMap::from_levels(parsed)
    }

    /// Tags introduced at exactly `level`
    pub fn introduced_at(&self, level: u8) -> &[InstrumentTag] {
        self.levels.get(level as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Active instruments at `level`
    pub fn active(&self, level: u8) -> Result<&BTreeSet<InstrumentTag>, ArrangementError> {
        self.active.get(level as usize).ok_or_else(|| {
            ArrangementError::config(format!("density level {} outside 0-{}", level, MAX_LEVEL))
        })
    }
}

impl TryFrom<Vec<Vec<InstrumentTag>>> for ArrangementLevelMap {
    type Error = ArrangementError;

    fn try_from(levels: Vec<Vec<InstrumentTag>>) -> Result<Self, Self::Error> {
        ArrangementLevelMap::from_levels(levels)
    }
}

impl From<ArrangementLevelMap> for Vec<Vec<InstrumentTag>> {
    fn from(map: ArrangementLevelMap) -> Self {
        map.levels
    }
}

/// Union of levels 0..=L for every L, with heavy drums replacing light drums
fn accumulate(levels: &[Vec<InstrumentTag>]) -> Vec<BTreeSet<InstrumentTag>> {
    let mut running = BTreeSet::new();

    levels
        .iter()
        .map(|tags| {
            running.extend(tags.iter().copied());
            let mut active = running.clone();
            if active.contains(&InstrumentTag::DrumHeavy) {
                active.remove(&InstrumentTag::DrumLight);
            }
            active
        })
        .collect()
}
