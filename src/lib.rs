// Melodist - Accompaniment arranger for hummed or sung melodies
// Module declarations

pub mod arranger;
pub mod density;
pub mod error;
pub mod groove;
pub mod harmony;
pub mod notes;
pub mod pipeline;

pub use arranger::{ArrangementConfig, ArrangementSummary, Director, InstrumentTag, NoteSink, TrackMap};
pub use density::{analyze_density, DensityCurve, PitchSample};
pub use error::ArrangementError;
pub use groove::{Melody, QuantizeSettings, RawNote};
pub use notes::NoteEvent;
pub use pipeline::{run_pipeline, ArrangementInput, PipelineError, PipelineOptions, PipelineOutput};
