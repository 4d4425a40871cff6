//! Fretwave DSP library: Karplus-Strong plucked-string guitar synthesis.
//!
//! Pure DSP math with no audio I/O. `pluck` renders one note with the
//! default voicing; `Voice` and `Sequence` expose the full pipeline.

pub mod config;
pub mod error;
pub mod random;
pub mod tables;

// String model
pub mod delay_line;
pub mod excitation;
pub mod filters;
pub mod modulation;
pub mod waveguide;

// Post-loop stages
pub mod di;
pub mod enrichment;
pub mod normalize;

// Assembly
pub mod buffer;
pub mod sequence;
pub mod voice;

pub use buffer::AudioBuffer;
pub use config::PluckConfig;
pub use error::PluckError;
pub use sequence::Sequence;
pub use voice::{Diagnostic, PluckRequest, RenderedNote, Voice, pluck};
