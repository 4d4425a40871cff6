/// One plucked note, end to end.
///
/// Signal flow:
///   excitation -> delay line + modulation (string loop) -> enrichment -> DI -> normalize
///
/// A `Voice` holds a validated configuration and sample rate and can render
/// any number of notes; every note gets a fresh delay line and filter state.
/// All randomness comes from the caller's generator, drawn in pipeline order.

use tracing::{debug, warn};

use crate::buffer::AudioBuffer;
use crate::config::PluckConfig;
use crate::delay_line::{self, DelayLine};
use crate::di::DiStage;
use crate::enrichment;
use crate::error::{MAX_RENDER_SAMPLES, PluckError};
use crate::excitation;
use crate::modulation::Modulation;
use crate::normalize;
use crate::random::{self, NoiseRng};
use crate::waveguide;

/// Parameters for one note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PluckRequest {
    pub frequency_hz: f64,
    pub duration_secs: f64,
    /// Normalized pick strength, typically 0-1.
    pub velocity: f64,
    pub palm_mute: bool,
}

impl PluckRequest {
    pub fn new(frequency_hz: f64, duration_secs: f64, velocity: f64, palm_mute: bool) -> Self {
        Self { frequency_hz, duration_secs, velocity, palm_mute }
    }

    pub fn validate(&self) -> Result<(), PluckError> {
        if !(self.frequency_hz.is_finite() && self.frequency_hz > 0.0) {
            return Err(PluckError::InvalidFrequency { frequency_hz: self.frequency_hz });
        }
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(PluckError::InvalidDuration { duration_secs: self.duration_secs });
        }
        if !(self.velocity.is_finite() && self.velocity >= 0.0) {
            return Err(PluckError::InvalidVelocity { velocity: self.velocity });
        }
        Ok(())
    }

    /// `round(duration_secs * sample_rate)`, between 1 and `MAX_RENDER_SAMPLES`.
    pub fn total_samples(&self, sample_rate: u32) -> Result<usize, PluckError> {
        let exact = (self.duration_secs * sample_rate as f64).round();
        if exact < 1.0 {
            return Err(PluckError::EmptyRender { duration_secs: self.duration_secs });
        }
        if exact > MAX_RENDER_SAMPLES as f64 {
            return Err(PluckError::RenderTooLong { duration_secs: self.duration_secs, maximum: MAX_RENDER_SAMPLES });
        }
        Ok(exact as usize)
    }
}

/// Something worth knowing about a render that still produced output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// The modulated loop gain left [0, 1] and was clamped on this many samples.
    DampingClamped { samples: usize },
    /// Non-finite string samples, replaced with zero.
    NonFinite { samples: usize },
    /// The note rendered to silence; nothing was scaled.
    DegenerateOutput,
}

#[derive(Debug, Clone)]
pub struct RenderedNote {
    pub buffer: AudioBuffer,
    pub diagnostics: Vec<Diagnostic>,
}

impl RenderedNote {
    pub fn is_degenerate(&self) -> bool {
        self.diagnostics.contains(&Diagnostic::DegenerateOutput)
    }
}

#[derive(Debug, Clone)]
pub struct Voice {
    config: PluckConfig,
    sample_rate: u32,
}

impl Voice {
    pub fn new(config: PluckConfig, sample_rate: u32) -> Result<Self, PluckError> {
        if sample_rate == 0 {
            return Err(PluckError::InvalidSampleRate { sample_rate });
        }
        config.validate()?;

        let nyquist = sample_rate as f64 / 2.0;
        if let Some(hp) = &config.di.highpass {
            if hp.cutoff_hz >= nyquist {
                return Err(PluckError::InvalidConfig {
                    field: "di.highpass.cutoff_hz",
                    reason: format!("{} Hz is not below Nyquist ({nyquist} Hz)", hp.cutoff_hz),
                });
            }
        }
        Ok(Self { config, sample_rate })
    }

    pub fn config(&self) -> &PluckConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render one note.
    pub fn render(&self, req: &PluckRequest, rng: &mut NoiseRng) -> Result<RenderedNote, PluckError> {
        req.validate()?;
        let sr = self.sample_rate as f64;
        let nyquist = sr / 2.0;
        if req.frequency_hz >= nyquist {
            return Err(PluckError::AboveNyquist { frequency_hz: req.frequency_hz, nyquist_hz: nyquist });
        }
        let total = req.total_samples(self.sample_rate)?;
        let len = delay_line::checked_delay_length(sr, req.frequency_hz)?;

        let cfg = &self.config;
        let burst = excitation::generate(&cfg.excitation, len, req.velocity, sr, rng);
        let mut line = DelayLine::with_excitation(len, &burst)?;
        let mut modulation = Modulation::new(cfg, req.frequency_hz, req.velocity, req.palm_mute, sr, rng);

        debug!(
            frequency_hz = req.frequency_hz,
            delay_length = len,
            total_samples = total,
            palm_mute = req.palm_mute,
            "rendering pluck"
        );

        let mut samples = waveguide::render(&mut line, &mut modulation, total, rng);
        let mut diagnostics = Vec::new();

        let clamped = modulation.clamped_samples();
        if clamped > 0 {
            warn!(samples = clamped, "loop gain clamped to [0, 1]");
            diagnostics.push(Diagnostic::DampingClamped { samples: clamped });
        }

        let mut non_finite = 0usize;
        for s in samples.iter_mut().filter(|s| !s.is_finite()) {
            *s = 0.0;
            non_finite += 1;
        }
        if non_finite > 0 {
            warn!(samples = non_finite, "non-finite string output replaced with silence");
            diagnostics.push(Diagnostic::NonFinite { samples: non_finite });
        }

        if samples.iter().all(|&s| s == 0.0) {
            debug!("string is silent, skipping enrichment and output stage");
            diagnostics.push(Diagnostic::DegenerateOutput);
            return Ok(RenderedNote { buffer: AudioBuffer::new(samples, self.sample_rate), diagnostics });
        }

        enrichment::apply(&cfg.enrichment, &mut samples, req.frequency_hz, req.palm_mute, sr, rng);
        DiStage::new(&cfg.di, sr, rng).process_buffer(&mut samples, rng);

        if normalize::normalize(&cfg.normalize, &mut samples).is_none() {
            warn!("conditioned output has no finite peak, left unscaled");
            diagnostics.push(Diagnostic::DegenerateOutput);
        }

        Ok(RenderedNote { buffer: AudioBuffer::new(samples, self.sample_rate), diagnostics })
    }
}

/// Render one note with the default (classic) configuration.
///
/// `seed` fixes the random source; `None` draws one from system entropy.
pub fn pluck(
    frequency_hz: f64,
    duration_secs: f64,
    velocity: f64,
    palm_mute: bool,
    sample_rate: u32,
    seed: Option<u64>,
) -> Result<Vec<f64>, PluckError> {
    let voice = Voice::new(PluckConfig::default(), sample_rate)?;
    let mut rng = match seed {
        Some(s) => random::seeded(s),
        None => random::from_entropy(),
    };
    let req = PluckRequest::new(frequency_hz, duration_secs, velocity, palm_mute);
    Ok(voice.render(&req, &mut rng)?.buffer.into_samples())
}
