// Groove Engine - Quantization and bar segmentation
// Turns raw detector notes into a bar-structured melody

pub mod melody;
pub mod quantize;

pub use melody::{Bar, Melody};
pub use quantize::{snap_duration, snap_pitch, snap_volume, QuantizeSettings, RawNote};
