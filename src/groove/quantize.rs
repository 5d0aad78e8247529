// Quantization - Snaps raw note attributes onto the standard vocabularies
// Bracketing-nearest search over durations, diatonic pitches and dynamics

use serde::{Deserialize, Serialize};

use crate::notes::tables::{dynamic_levels, PITCH_TABLE, QUARTER_NOTE, STANDARD_DURATIONS};
use crate::notes::{Dynamic, NoteEvent};

/// A note as reported by the upstream detector, before quantization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawNote {
    /// Onset in seconds (informational; bar placement recomputes timing)
    pub time: f64,

    /// MIDI-ish pitch, possibly fractional
    pub pitch: f64,

    /// Duration in detector units (see `QuantizeSettings::duration_scale`)
    pub duration: f64,

    /// Loudness, roughly MIDI velocity scale
    pub volume: f64,
}

/// Settings for quantization behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantizeSettings {
    /// Multiplier turning raw detector durations into beats
    /// The note detector reports hundredths, hence 0.01
    pub duration_scale: f64,

    /// Duration used when a raw duration has no bracketing standard value
    pub fallback_duration: f64,

    /// Velocity used when a raw volume has no bracketing dynamic
    pub fallback_volume: u8,
}

impl Default for QuantizeSettings {
    fn default() -> Self {
        QuantizeSettings {
            duration_scale: 0.01,
            fallback_duration: QUARTER_NOTE,
            fallback_volume: Dynamic::Mf.velocity(),
        }
    }
}

impl QuantizeSettings {
    /// Settings for input whose durations are already expressed in beats
    pub fn beats() -> Self {
        QuantizeSettings {
            duration_scale: 1.0,
            ..Default::default()
        }
    }

    /// Snap a duration in beats to {1/4, 1/2, 1, 2, 4}
    pub fn snap_duration(&self, raw: f64) -> f64 {
        let largest = STANDARD_DURATIONS[STANDARD_DURATIONS.len() - 1];
        if raw > largest {
            return largest;
        }
        nearest_in_table(raw, &STANDARD_DURATIONS).unwrap_or(self.fallback_duration)
    }

    /// Snap a velocity to the nearest dynamic level
    pub fn snap_volume(&self, raw: f64) -> u8 {
        nearest_in_table(raw, &dynamic_levels())
            .map(|v| v as u8)
            .unwrap_or(self.fallback_volume)
    }

    /// Quantize one raw note; its start time is assigned later by bar placement
    pub fn quantize_note(&self, raw: &RawNote) -> NoteEvent {
        NoteEvent::new(
            snap_pitch(raw.pitch),
            0.0,
            self.snap_duration(raw.duration * self.duration_scale),
            self.snap_volume(raw.volume),
        )
    }
}

/// Snap a duration with the default quarter-note fallback
pub fn snap_duration(raw: f64) -> f64 {
    QuantizeSettings::default().snap_duration(raw)
}

/// Snap a velocity with the default `mf` fallback
pub fn snap_volume(raw: f64) -> u8 {
    QuantizeSettings::default().snap_volume(raw)
}

/// Snap a pitch to the nearest C-major table pitch
///
/// Outside the table there is no bracketing pair; the raw value is kept,
/// rounded and clamped to the MIDI range.
pub fn snap_pitch(raw: f64) -> u8 {
    let table = PITCH_TABLE.map(|p| p as f64);
    match nearest_in_table(raw, &table) {
        Some(pitch) => pitch as u8,
        None => raw.round().clamp(0.0, 127.0) as u8,
    }
}

/// Find the bracketing pair `lo <= raw <= hi` in an ascending table and
/// return the closer one, ties going to `lo`
fn nearest_in_table(raw: f64, table: &[f64]) -> Option<f64> {
    if raw.is_nan() {
        return None;
    }

    let lo = table.iter().rev().find(|&&v| v <= raw).copied()?;
    let hi = table.iter().find(|&&v| v >= raw).copied()?;

    if raw - lo <= hi - raw {
        Some(lo)
    } else {
        Some(hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_in_table_tie_favors_lower() {
        let table = [1.0, 2.0, 4.0];
        assert_eq!(nearest_in_table(1.5, &table), Some(1.0));
        assert_eq!(nearest_in_table(3.5, &table), Some(4.0));
        assert_eq!(nearest_in_table(2.0, &table), Some(2.0));
        assert_eq!(nearest_in_table(0.5, &table), None);
        assert_eq!(nearest_in_table(5.0, &table), None);
        assert_eq!(nearest_in_table(f64::NAN, &table), None);
    }

    #[test]
    fn test_snap_duration_vocabulary_and_idempotence() {
        let samples = [-1.0, 0.0, 0.1, 0.25, 0.3, 0.4, 0.75, 1.2, 1.5, 2.9, 3.0, 3.1, 4.0, 7.5, 100.0];
        for raw in samples {
            let snapped = snap_duration(raw);
            assert!(
                STANDARD_DURATIONS.contains(&snapped),
                "{} snapped to non-standard {}",
                raw,
                snapped
            );
            assert_eq!(snap_duration(snapped), snapped);
        }
    }

    #[test]
    fn test_snap_duration_edges() {
        // Above the largest value clamps to a whole note
        assert_eq!(snap_duration(9.0), 4.0);
        // Below the smallest value has no bracket: quarter-note fallback
        assert_eq!(snap_duration(0.1), 1.0);
        // Ties favor the shorter value
        assert_eq!(snap_duration(3.0), 2.0);
        assert_eq!(snap_duration(0.375), 0.25);
        assert_eq!(snap_duration(0.9), 1.0);
    }

    #[test]
    fn test_snap_volume_tie_favors_lower() {
        // 70 sits between mp (64) and mf (80): 6 vs 10 away
        assert_eq!(snap_volume(70.0), 64);
        // Exact midpoint between 64 and 80
        assert_eq!(snap_volume(72.0), 64);
        assert_eq!(snap_volume(127.0), 127);
    }

    #[test]
    fn test_snap_volume_fallback() {
        assert_eq!(snap_volume(5.0), 80);
        assert_eq!(snap_volume(200.0), 80);

        let settings = QuantizeSettings {
            fallback_volume: 49,
            ..Default::default()
        };
        assert_eq!(settings.snap_volume(3.0), 49);
    }

    #[test]
    fn test_snap_pitch() {
        // C#4 (61) is equidistant from C4 and D4, lower wins
        assert_eq!(snap_pitch(61.0), 60);
        assert_eq!(snap_pitch(63.4), 64);
        assert_eq!(snap_pitch(65.8), 65);
        // Outside the table the rounded raw value is kept
        assert_eq!(snap_pitch(4.6), 5);
        assert_eq!(snap_pitch(115.2), 115);
        assert_eq!(snap_pitch(300.0), 127);
    }

    #[test]
    fn test_quantize_note_applies_scale() {
        let settings = QuantizeSettings::default();
        let raw = RawNote {
            time: 1.3,
            pitch: 64.3,
            duration: 190.0,
            volume: 90.0,
        };
        let note = settings.quantize_note(&raw);

        assert_eq!(note.pitch, 64);
        assert_eq!(note.duration, 2.0);
        assert_eq!(note.volume, 96);
        assert_eq!(note.time, 0.0);
    }
}
