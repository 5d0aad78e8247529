// Density Analysis - Voiced-run grouping of a pitch track
// Produces the intensity curve and the emphasis windows for arrangement

use serde::{Deserialize, Serialize};

use super::curve::{DensityBreakpoint, DensityCurve, DEFAULT_LEVEL, MAX_LEVEL};

/// One frame of the upstream pitch tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchSample {
    /// Frame time in seconds
    pub time: f64,

    /// Detected MIDI pitch, 0 when unvoiced
    pub pitch: f64,

    /// Tracker confidence for this frame
    pub confidence: f64,
}

/// Configuration for density and emphasis analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensitySettings {
    /// Minimum score for a group to be an emphasis window
    pub emphasis_threshold: f64,

    /// A group must also reach this fraction of the best score
    pub emphasis_coefficient: f64,

    /// Frames below this confidence count as unvoiced
    pub min_confidence: f64,

    /// Level returned by curve lookups outside every interval
    pub default_level: u8,
}

impl Default for DensitySettings {
    fn default() -> Self {
        DensitySettings {
            emphasis_threshold: 1.0,
            emphasis_coefficient: 0.8,
            min_confidence: 0.0,
            default_level: DEFAULT_LEVEL,
        }
    }
}

/// A run of frames opened by a voiced frame following silence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityGroup {
    /// Time of the first frame (seconds)
    pub first_time: f64,

    /// Time of the last frame (seconds)
    pub last_time: f64,

    /// Number of frames in the group
    pub sample_count: usize,

    /// log10(sample_count)
    pub score: f64,

    /// Binned level [0, 9]
    pub level: u8,
}

/// A relative time span with unusually dense pitch activity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmphasisWindow {
    pub start: f64,
    pub end: f64,
}

impl EmphasisWindow {
    pub fn contains(&self, position: f64) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Complete density analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityAnalysis {
    pub groups: Vec<DensityGroup>,
    pub curve: DensityCurve,
    pub emphasis_windows: Vec<EmphasisWindow>,
}

impl DensityAnalysis {
    /// Check whether a relative position falls into any emphasis window
    pub fn is_emphasized(&self, position: f64) -> bool {
        self.emphasis_windows.iter().any(|w| w.contains(position))
    }
}

/// Analyze a time-ordered pitch track
///
/// Algorithm:
/// 1. Split frames into groups, opening a group whenever a voiced frame
///    follows an unvoiced one
/// 2. Score each group as log10 of its frame count
/// 3. Bin scores linearly into levels 0-9 (all 5 if every score is equal)
/// 4. Place one breakpoint per group at its relative start time
/// 5. Flag groups scoring above both the absolute and relative thresholds
pub fn analyze_density(samples: &[PitchSample], settings: &DensitySettings) -> DensityAnalysis {
    let curve_default = settings.default_level.min(MAX_LEVEL);

    if samples.is_empty() {
        return DensityAnalysis {
            groups: Vec::new(),
            curve: DensityCurve::uniform().with_default_level(curve_default),
            emphasis_windows: Vec::new(),
        };
    }

    let runs = identify_voiced_runs(samples, settings.min_confidence);
    let scores: Vec<f64> = runs.iter().map(|run| (run.len() as f64).log10()).collect();

    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let groups: Vec<DensityGroup> = runs
        .iter()
        .zip(&scores)
        .map(|(run, &score)| DensityGroup {
            first_time: run[0].time,
            last_time: run[run.len() - 1].time,
            sample_count: run.len(),
            score,
            level: bin_level(score, min, max),
        })
        .collect();

    let total_length = samples[samples.len() - 1].time;
    let relative = |t: f64| {
        if total_length > 0.0 {
            (t / total_length).clamp(0.0, 1.0)
        } else {
            0.0
        }
    };

    let breakpoints: Vec<DensityBreakpoint> = groups
        .iter()
        .map(|g| DensityBreakpoint {
            position: relative(g.first_time),
            level: g.level,
        })
        .collect();

    let curve = match DensityCurve::new(breakpoints) {
        Ok(curve) => curve.with_default_level(curve_default),
        Err(e) => {
            // Only reachable with a pitch track that is not time-ordered
            log::warn!("Density curve rejected ({}), using uniform level", e);
            DensityCurve::uniform().with_default_level(curve_default)
        }
    };

    let emphasis_windows = groups
        .iter()
        .filter(|g| g.score >= settings.emphasis_threshold && g.score >= settings.emphasis_coefficient * max)
        .map(|g| EmphasisWindow {
            start: relative(g.first_time),
            end: relative(g.last_time),
        })
        .collect();

    log::debug!(
        "Density analysis: {} samples, {} groups, score range [{:.3}, {:.3}]",
        samples.len(),
        groups.len(),
        min,
        max
    );

    DensityAnalysis {
        groups,
        curve,
        emphasis_windows,
    }
}

/// Split frames into runs; a voiced frame right after an unvoiced one opens a new run
fn identify_voiced_runs(samples: &[PitchSample], min_confidence: f64) -> Vec<&[PitchSample]> {
    let voiced = |s: &PitchSample| s.pitch.round() > 0.0 && s.confidence >= min_confidence;

    let mut runs = Vec::new();
    let mut start = 0;

    for i in 1..samples.len() {
        if voiced(&samples[i]) && !voiced(&samples[i - 1]) {
            runs.push(&samples[start..i]);
            start = i;
        }
    }
    runs.push(&samples[start..]);

    runs
}

/// Map a score linearly onto levels 0-9
fn bin_level(score: f64, min: f64, max: f64) -> u8 {
    if max == min {
        return DEFAULT_LEVEL;
    }
    let step = (max - min) / MAX_LEVEL as f64;
    ((score - min) / step).round().clamp(0.0, MAX_LEVEL as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build frames 1s apart from a voiced/unvoiced pattern
    fn track(pattern: &str) -> Vec<PitchSample> {
        pattern
            .chars()
            .enumerate()
            .map(|(i, c)| PitchSample {
                time: i as f64,
                pitch: if c == 'x' { 60.0 } else { 0.0 },
                confidence: 0.9,
            })
            .collect()
    }

    #[test]
    fn test_grouping_on_silence_to_voice() {
        let samples = track("xxx..xx.x");
        let runs = identify_voiced_runs(&samples, 0.0);

        let lengths: Vec<usize> = runs.iter().map(|r| r.len()).collect();
        assert_eq!(lengths, vec![5, 3, 1]);
    }

    #[test]
    fn test_leading_silence_forms_its_own_group() {
        let samples = track("..xx");
        let runs = identify_voiced_runs(&samples, 0.0);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 2);
    }

    #[test]
    fn test_low_confidence_counts_as_unvoiced() {
        let mut samples = track("xxxx");
        samples[1].confidence = 0.1;

        let runs = identify_voiced_runs(&samples, 0.5);
        let lengths: Vec<usize> = runs.iter().map(|r| r.len()).collect();
        assert_eq!(lengths, vec![2, 2]);
    }

    #[test]
    fn test_bin_level() {
        assert_eq!(bin_level(0.0, 0.0, 1.0), 0);
        assert_eq!(bin_level(1.0, 0.0, 1.0), 9);
        assert_eq!(bin_level(0.5, 0.0, 1.0), 5); // 4.5 rounds up
        assert_eq!(bin_level(0.3, 0.3, 0.3), 5);
    }

    #[test]
    fn test_degenerate_scores_give_level_five() {
        let analysis = analyze_density(&track("x.x.x."), &DensitySettings::default());
        assert_eq!(analysis.groups.len(), 3);
        assert!(analysis.groups.iter().all(|g| g.level == 5));

        let single = analyze_density(&track("xxxx"), &DensitySettings::default());
        assert_eq!(single.groups.len(), 1);
        assert_eq!(single.groups[0].level, 5);
    }

    #[test]
    fn test_levels_span_full_range() {
        // Runs of 100, 10 and 1 frames: scores 2, 1 and 0
        let pattern = format!("{}.{}.x", "x".repeat(99), "x".repeat(9));
        let analysis = analyze_density(&track(&pattern), &DensitySettings::default());

        let counts: Vec<usize> = analysis.groups.iter().map(|g| g.sample_count).collect();
        assert_eq!(counts, vec![100, 10, 1]);
        assert_eq!(analysis.groups[0].level, 9);
        assert_eq!(analysis.groups[2].level, 0);
    }

    #[test]
    fn test_breakpoints_use_relative_start() {
        let analysis = analyze_density(&track("xxxx.xxxx."), &DensitySettings::default());

        let positions: Vec<f64> = analysis.curve.breakpoints().iter().map(|b| b.position).collect();
        assert_eq!(positions, vec![0.0, 5.0 / 9.0]);
    }

    #[test]
    fn test_emphasis_windows() {
        // Runs: 20 frames (score 1.30), 3 frames (0.48), 15 frames (1.18)
        let pattern = format!("{}.{}{}", "x".repeat(19), "xx.", "x".repeat(15));
        let samples = track(&pattern);
        let analysis = analyze_density(&samples, &DensitySettings::default());

        assert_eq!(analysis.groups.len(), 3);
        assert_eq!(analysis.emphasis_windows.len(), 2);

        let total = samples.last().unwrap().time;
        let first = analysis.emphasis_windows[0];
        assert_eq!(first.start, 0.0);
        assert!((first.end - 19.0 / total).abs() < 1e-9);
        assert!(analysis.is_emphasized(0.1));
    }

    #[test]
    fn test_emphasis_requires_absolute_threshold() {
        // Best score is log10(6) < 1, nothing qualifies
        let analysis = analyze_density(&track("xxxxx.xx"), &DensitySettings::default());
        assert!(analysis.emphasis_windows.is_empty());
    }

    #[test]
    fn test_empty_track() {
        let analysis = analyze_density(&[], &DensitySettings::default());
        assert!(analysis.groups.is_empty());
        assert_eq!(analysis.curve.level_at(0.3), 5);
    }
}
