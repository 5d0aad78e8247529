// Pipeline execution and monitoring module
// Runs the full arrangement pass from detector output to MIDI bytes

pub mod trace;

pub use trace::{read_trace_file, TraceBuilder, TraceEntry, TraceError, TraceLog, TraceWriter};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::arranger::{export_midi, ArrangementConfig, ArrangementSummary, Director, MidiExportOptions, TrackMap};
use crate::density::{analyze_density, DensityAnalysis, PitchSample};
use crate::error::ArrangementError;
use crate::groove::{Melody, RawNote};
use trace::{STAGE_ARRANGEMENT, STAGE_DENSITY, STAGE_EXPORT, STAGE_PHRASE, STAGE_QUANTIZATION};

/// Slowest tempo accepted as-is
pub const MIN_NATURAL_TEMPO: f64 = 50.0;

/// Fastest tempo accepted as-is
pub const MAX_NATURAL_TEMPO: f64 = 120.0;

/// Errors that can occur while running the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Arrangement(#[from] ArrangementError),

    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MIDI export failed: {0}")]
    Export(String),
}

/// Detector output for one recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrangementInput {
    /// Detected tempo in BPM
    pub tempo: f64,

    /// Raw notes in time order
    pub notes: Vec<RawNote>,

    /// Pitch track for density analysis; empty means uniform density
    #[serde(default)]
    pub pitch_samples: Vec<PitchSample>,
}

impl ArrangementInput {
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Pipeline options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub config: ArrangementConfig,
    pub midi: MidiExportOptions,

    /// Pull implausible detected tempos back into a playable range
    pub normalize_tempo: bool,

    /// Append trace entries to this JSONL file
    pub trace_path: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            config: ArrangementConfig::default(),
            midi: MidiExportOptions::default(),
            normalize_tempo: true,
            trace_path: None,
        }
    }
}

/// Everything one run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub run_id: Uuid,

    /// Tempo the arrangement was rendered at
    pub tempo: f64,

    /// Standard MIDI file bytes
    #[serde(skip)]
    pub midi: Vec<u8>,

    pub summary: ArrangementSummary,
    pub density: DensityAnalysis,

    /// Bass drum hits in milliseconds, for syncing auxiliary audio
    pub bass_drum_onsets_ms: Vec<f64>,

    pub trace: Vec<TraceEntry>,
}

/// Map a detected tempo into the playable range
///
/// Detectors tend to halve or double tempos; below 50 BPM becomes 60,
/// above 120 becomes 90.
pub fn normalize_tempo(bpm: f64) -> f64 {
    if bpm < MIN_NATURAL_TEMPO {
        60.0
    } else if bpm > MAX_NATURAL_TEMPO {
        90.0
    } else {
        bpm
    }
}

/// Run quantization, density analysis, arrangement and MIDI export
pub fn run_pipeline(input: &ArrangementInput, options: &PipelineOptions) -> Result<PipelineOutput, PipelineError> {
    let director = Director::new(&options.config)?;

    if !(input.tempo > 0.0) || !input.tempo.is_finite() {
        return Err(ArrangementError::config(format!("tempo must be positive, got {}", input.tempo)).into());
    }
    let tempo = if options.normalize_tempo {
        normalize_tempo(input.tempo)
    } else {
        input.tempo
    };
    if tempo != input.tempo {
        log::info!("Tempo {} BPM normalized to {} BPM", input.tempo, tempo);
    }

    let mut trace = TraceLog::new(Uuid::new_v4(), options.trace_path.clone());
    log::info!(
        "Pipeline run {} started: {} notes, {} pitch samples",
        trace.run_id(),
        input.notes.len(),
        input.pitch_samples.len()
    );

    // Quantization and bar segmentation
    let melody = Melody::from_raw_notes(&input.notes, &options.config.quantize);
    let entry = trace
        .stage(STAGE_QUANTIZATION)
        .complete(format!("{} notes in {} bars", input.notes.len(), melody.bar_count()));
    trace.record(entry)?;

    // Density curve and emphasis windows
    let density = analyze_density(&input.pitch_samples, &options.config.density);
    let entry = trace
        .stage(STAGE_DENSITY)
        .complete(format!(
            "{} groups, {} emphasis windows",
            density.groups.len(),
            density.emphasis_windows.len()
        ))
        .with_data(serde_json::to_value(&density.curve)?);
    trace.record(entry)?;

    // Arrangement
    let mut track_map = TrackMap::new(tempo)?;
    let summary = director.arrange(&melody, &density.curve, &mut track_map)?;

    let phrase_count = summary.phrases.len().max(1) as f32;
    for decision in &summary.phrases {
        let entry = trace
            .stage(STAGE_PHRASE)
            .progress(
                (decision.index + 1) as f32 / phrase_count,
                format!("Phrase {} at level {}", decision.index, decision.level),
            )
            .with_data(serde_json::to_value(decision)?);
        trace.record(entry)?;
    }
    let entry = trace.stage(STAGE_ARRANGEMENT).complete(format!(
        "{} phrases, {} notes on {} channels",
        summary.phrases.len(),
        track_map.note_count(),
        track_map.channels().count()
    ));
    trace.record(entry)?;

    // Export
    let midi = export_midi(&track_map, &options.midi).map_err(PipelineError::Export)?;
    let entry = trace.stage(STAGE_EXPORT).complete(format!("{} bytes of MIDI", midi.len()));
    trace.record(entry)?;

    log::info!("Pipeline run {} complete", trace.run_id());

    Ok(PipelineOutput {
        run_id: trace.run_id(),
        tempo,
        midi,
        summary,
        bass_drum_onsets_ms: track_map.bass_drum_onsets_ms(),
        density,
        trace: trace.into_entries(),
    })
}
