//! Parameter errors for a single pluck.
//!
//! Every variant is raised before the first sample is computed. Numeric
//! trouble during rendering is reported as a `Diagnostic` instead
//! (see `voice::RenderedNote`).

use std::fmt;

/// Shortest delay line the string filter can run on: `current` and `next`
/// must be different cells.
pub const MIN_DELAY_LENGTH: usize = 2;

/// Longest delay line a pluck may allocate (about 0.04 Hz at 44.1 kHz).
pub const MAX_DELAY_LENGTH: usize = 1 << 20;

/// Longest single render, in samples (about 100 minutes at 44.1 kHz).
pub const MAX_RENDER_SAMPLES: usize = 1 << 28;

#[derive(Debug, Clone, PartialEq)]
pub enum PluckError {
    /// Frequency is zero, negative, or not finite.
    InvalidFrequency { frequency_hz: f64 },

    /// Duration is zero, negative, or not finite.
    InvalidDuration { duration_secs: f64 },

    /// Velocity is negative or not finite.
    InvalidVelocity { velocity: f64 },

    /// Sample rate of zero.
    InvalidSampleRate { sample_rate: u32 },

    /// Fundamental at or above Nyquist cannot be represented by the loop.
    AboveNyquist { frequency_hz: f64, nyquist_hz: f64 },

    /// `round(sample_rate / frequency)` fell below `MIN_DELAY_LENGTH`.
    DelayLineTooShort { length: usize, minimum: usize },

    /// `round(sample_rate / frequency)` exceeds `MAX_DELAY_LENGTH`.
    DelayLineTooLong { frequency_hz: f64, maximum: usize },

    /// Duration rounds to zero output samples.
    EmptyRender { duration_secs: f64 },

    /// Duration needs more than `MAX_RENDER_SAMPLES` output samples.
    RenderTooLong { duration_secs: f64, maximum: usize },

    /// A configuration value is outside its usable range.
    InvalidConfig { field: &'static str, reason: String },
}

impl fmt::Display for PluckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluckError::InvalidFrequency { frequency_hz } => {
                write!(f, "fundamental frequency must be positive and finite, got {frequency_hz} Hz")
            }
            PluckError::InvalidDuration { duration_secs } => {
                write!(f, "duration must be positive and finite, got {duration_secs} s")
            }
            PluckError::InvalidVelocity { velocity } => {
                write!(f, "velocity must be non-negative and finite, got {velocity}")
            }
            PluckError::InvalidSampleRate { sample_rate } => {
                write!(f, "sample rate must be positive, got {sample_rate} Hz")
            }
            PluckError::AboveNyquist { frequency_hz, nyquist_hz } => {
                write!(f, "fundamental {frequency_hz} Hz is not below Nyquist ({nyquist_hz} Hz)")
            }
            PluckError::DelayLineTooShort { length, minimum } => {
                write!(f, "delay line of {length} samples is shorter than the minimum of {minimum}")
            }
            PluckError::DelayLineTooLong { frequency_hz, maximum } => {
                write!(f, "fundamental {frequency_hz} Hz needs a delay line longer than {maximum} samples")
            }
            PluckError::EmptyRender { duration_secs } => {
                write!(f, "duration {duration_secs} s rounds to zero samples")
            }
            PluckError::RenderTooLong { duration_secs, maximum } => {
                write!(f, "duration {duration_secs} s exceeds the {maximum}-sample render limit")
            }
            PluckError::InvalidConfig { field, reason } => {
                write!(f, "invalid configuration for `{field}`: {reason}")
            }
        }
    }
}

impl std::error::Error for PluckError {}
