//! Configuration for the unified pluck pipeline.
//!
//! One `PluckConfig` selects the excitation mode, damping schedule,
//! enrichment tables and output stage. The presets cover the four voicings
//! the pipeline grew out of:
//!
//!   basic   : textbook Karplus-Strong, nothing layered on top
//!   classic : randomized noise pluck with drift, vibrato and a DI box (default)
//!   bright  : sharp pick impulse, two-stage decay, body filter bank
//!   natural : chaotic pick transient, spectral formants, asymmetric ceiling
//!
//! Randomized quantities are `Spread`s, drawn once per pluck.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PluckError;
use crate::filters::FilterOrder;
use crate::random::{self, NoiseRng};
use crate::tables;

/// Uniform range a per-pluck value is drawn from. `min == max` is a constant.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub min: f64,
    pub max: f64,
}

impl Spread {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub const fn fixed(value: f64) -> Self {
        Self { min: value, max: value }
    }

    /// Draw a value. Constant spreads do not advance the generator.
    pub fn sample(&self, rng: &mut NoiseRng) -> f64 {
        random::uniform(rng, self.min, self.max)
    }

    fn check(&self, field: &'static str) -> Result<(), PluckError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(invalid(field, format!("non-finite range {}..{}", self.min, self.max)));
        }
        if self.min > self.max {
            return Err(invalid(field, format!("inverted range {}..{}", self.min, self.max)));
        }
        Ok(())
    }
}

// ─── Excitation ─────────────────────────────────────────────────────────────

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub enum ExcitationConfig {
    FilteredNoise(FilteredNoise),
    Impulse(ImpulseExcitation),
}

/// Velocity-scaled uniform noise, optionally low-passed and enveloped.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredNoise {
    /// Burst length floor in samples; the burst is never shorter than the delay line.
    pub min_length: usize,
    /// Pick hardness: low-pass cutoff drawn per pluck. `None` leaves the noise white.
    pub lowpass: Option<NoiseLowpass>,
    /// Exponential decay constant as a fraction of the burst length. `None` = flat.
    pub decay_fraction: Option<Spread>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseLowpass {
    pub cutoff_hz: Spread,
    pub order: FilterOrder,
}

/// Short pick transient: chaotic lead-in, a sharp peak, then settling noise.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseExcitation {
    pub length_secs: f64,
    pub min_length: usize,
    /// Position of the spike. Zero puts it on the first sample.
    pub peak_offset_secs: f64,
    pub peak_gain: f64,
    /// Noise before the peak, ramped in linearly.
    pub pre_chaos_gain: f64,
    /// Noise after the peak, decaying by `exp(-post_chaos_decay * n)`.
    pub post_chaos_gain: f64,
    pub post_chaos_decay: f64,
    /// High-pass the transient at this fraction of Nyquist (second order).
    pub attack_highpass: Option<f64>,
    pub pick_scrape: Option<PickScrape>,
}

/// High-passed noise summed onto the transient.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PickScrape {
    pub gain: f64,
    pub highpass_ratio: f64,
    pub order: FilterOrder,
}

// ─── Waveguide loop ─────────────────────────────────────────────────────────

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DampingConfig {
    /// Loop gain for an open string.
    pub open: f64,
    /// Loop gain under palm mute.
    pub palm_mute: f64,
    /// Multiplier drawn per pluck.
    pub jitter: Spread,
    pub lfo: Option<DampingLfo>,
    pub schedule: Option<DecaySchedule>,
    pub frequency_tracking: Option<FrequencyTracking>,
}

/// Sub-Hz drift added to the loop gain.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DampingLfo {
    pub depth: f64,
    pub rate_hz: f64,
}

/// Two-stage decay: `initial` until `transition_secs`, then `sustain`.
/// Multiplies the base loop gain.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecaySchedule {
    pub transition_secs: f64,
    pub open: StageRates,
    pub palm_mute: StageRates,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageRates {
    pub initial: f64,
    pub sustain: f64,
}

/// Higher fundamentals lose more per pass.
///
/// With `ff = f0 / reference_hz`, the base gain becomes
/// `base - ff * above_slope` above `split_hz` and `base + ff * below_slope` at or below it.
/// With no `below_slope`, open strings at or below the split run on the decay
/// schedule alone (base gain 1.0); palm-muted plucks keep their mode base.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyTracking {
    pub reference_hz: f64,
    pub split_hz: f64,
    pub above_slope: f64,
    pub below_slope: Option<f64>,
}

/// One-pole smoothing coefficient inside the loop, chosen by register.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessConfig {
    pub split_hz: f64,
    /// Coefficient for fundamentals above `split_hz`.
    pub high: f64,
    /// Coefficient at or below `split_hz`.
    pub low: f64,
    pub jitter: Spread,
}

/// Coarse pitch vibrato by skipping or repeating delay-line reads.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VibratoConfig {
    /// Peak pitch deviation as a fraction (0.001 = 0.1%).
    pub depth: f64,
    pub rate_hz: f64,
}

/// Rare finger/string noise impulses.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseBurstConfig {
    /// Chance per output sample.
    pub probability: f64,
    /// Bursts are uniform in [-amplitude, amplitude).
    pub amplitude: f64,
    pub scale_with_velocity: bool,
    /// Also write the burst into the loop so it rings with the string.
    pub feed_back: bool,
}

// ─── Enrichment ─────────────────────────────────────────────────────────────

/// Additive layers summed onto the string output. Amplitudes are relative
/// to the string's peak level.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentConfig {
    pub overtones: Option<OvertoneConfig>,
    pub body_modes: Vec<BodyMode>,
    pub body_filters: Option<BodyFilterBank>,
    pub formants: Option<FormantConfig>,
    /// Minimum decay rate (1/s) of every additive partial when palm muted.
    pub palm_mute_decay_floor: f64,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct OvertoneConfig {
    pub partials: Vec<Partial>,
    /// Stretch per index: f = f0 * n * (1 + inharmonicity * (n - 1)).
    pub inharmonicity: f64,
    /// Decay rate (1/s) is `decay + decay_per_index * n`.
    pub decay: Spread,
    pub decay_per_index: f64,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    pub index: u32,
    pub amplitude: Spread,
}

/// Decaying sine at a body resonance.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMode {
    pub frequency_hz: Spread,
    pub amplitude: Spread,
    pub decay: Spread,
}

/// Band-passed copies of the string summed back in, weighted by
/// `exp(-|f0 - center| / proximity_hz)`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BodyFilterBank {
    pub centers_hz: Vec<f64>,
    /// Bandwidth as a fraction of the center frequency.
    pub bandwidth: f64,
    pub gain: f64,
    pub proximity_hz: f64,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FormantConfig {
    pub formants: Vec<Formant>,
    /// Decay rate (1/s) is `decay + decay_per_khz * f / 1000`.
    pub decay: f64,
    pub decay_per_khz: f64,
    pub weighting: FormantWeighting,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Formant {
    pub frequency_hz: f64,
    pub amplitude: f64,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormantWeighting {
    Flat,
    /// `exp(-|f0 - f| / scale_hz)`.
    Proximity { scale_hz: f64 },
    /// `boost` when within `tolerance_hz` of any of the first `harmonics` harmonics.
    HarmonicBoost { tolerance_hz: f64, boost: f64, harmonics: u32 },
}

// ─── Output stage ───────────────────────────────────────────────────────────

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiConfig {
    pub highpass: Option<DiHighpass>,
    pub saturation: Option<Saturation>,
    pub hum: Option<Hum>,
    pub hiss: Option<Hiss>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiHighpass {
    pub cutoff_hz: f64,
    pub order: FilterOrder,
}

/// `tanh(x * drive) * output_scale`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Saturation {
    pub drive: Spread,
    pub output_scale: f64,
}

/// Mains hum; the frequency is picked per pluck from `mains_hz`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Hum {
    pub amplitude: f64,
    pub mains_hz: Vec<f64>,
}

/// Cable/electronics noise, high-passed at a fraction of Nyquist.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hiss {
    pub level: f64,
    pub highpass_ratio: f64,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeConfig {
    /// Peak level after scaling.
    pub target_peak: f64,
    /// Gain applied to positive samples after scaling (1.0 = symmetric).
    pub positive_asymmetry: f64,
    /// Hard ceiling applied last.
    pub clip: Option<f64>,
}

impl NormalizeConfig {
    /// Largest absolute value normalization can produce.
    pub fn ceiling(&self) -> f64 {
        let peak = self.target_peak * self.positive_asymmetry.max(1.0);
        match self.clip {
            Some(c) => peak.min(c),
            None => peak,
        }
    }
}

// ─── Top level ──────────────────────────────────────────────────────────────

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PluckConfig {
    pub excitation: ExcitationConfig,
    pub damping: DampingConfig,
    pub brightness: BrightnessConfig,
    pub vibrato: Option<VibratoConfig>,
    pub noise_burst: Option<NoiseBurstConfig>,
    pub enrichment: EnrichmentConfig,
    pub di: DiConfig,
    pub normalize: NormalizeConfig,
}

impl Default for PluckConfig {
    fn default() -> Self {
        Self::classic()
    }
}

impl PluckConfig {
    /// Preset by name: `basic`, `classic`, `bright` or `natural`.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "basic" => Some(Self::basic()),
            "classic" => Some(Self::classic()),
            "bright" => Some(Self::bright()),
            "natural" => Some(Self::natural()),
            _ => None,
        }
    }

    pub const PRESET_NAMES: [&'static str; 4] = ["basic", "classic", "bright", "natural"];

    /// Plain Karplus-Strong: white noise into an averaging loop at 0.996.
    pub fn basic() -> Self {
        Self {
            excitation: ExcitationConfig::FilteredNoise(FilteredNoise {
                min_length: 0,
                lowpass: None,
                decay_fraction: None,
            }),
            damping: DampingConfig {
                open: 0.996,
                palm_mute: 0.1,
                jitter: Spread::fixed(1.0),
                lfo: None,
                schedule: None,
                frequency_tracking: None,
            },
            brightness: BrightnessConfig {
                split_hz: 200.0,
                high: 1.0,
                low: 1.0,
                jitter: Spread::fixed(1.0),
            },
            vibrato: None,
            noise_burst: None,
            enrichment: EnrichmentConfig::none(),
            di: DiConfig::default(),
            normalize: NormalizeConfig {
                target_peak: 1.0,
                positive_asymmetry: 1.0,
                clip: None,
            },
        }
    }

    /// Randomized filtered-noise pluck through a DI box.
    pub fn classic() -> Self {
        Self {
            excitation: ExcitationConfig::FilteredNoise(FilteredNoise {
                min_length: 100,
                lowpass: Some(NoiseLowpass {
                    cutoff_hz: Spread::new(4000.0, 8000.0),
                    order: FilterOrder::Second,
                }),
                decay_fraction: Some(Spread::new(0.07, 0.13)),
            }),
            damping: DampingConfig {
                open: 0.9985,
                palm_mute: 0.1,
                jitter: Spread::new(0.995, 1.005),
                lfo: Some(DampingLfo {
                    depth: 0.0002,
                    rate_hz: 0.1,
                }),
                schedule: None,
                frequency_tracking: None,
            },
            brightness: BrightnessConfig {
                split_hz: 200.0,
                high: 0.5,
                low: 0.5,
                jitter: Spread::new(0.95, 1.05),
            },
            vibrato: Some(VibratoConfig {
                depth: 0.0015,
                rate_hz: 5.0,
            }),
            noise_burst: Some(NoiseBurstConfig {
                probability: 0.00005,
                amplitude: 0.1,
                scale_with_velocity: false,
                feed_back: false,
            }),
            enrichment: EnrichmentConfig {
                overtones: Some(OvertoneConfig {
                    partials: [2u32, 3, 4]
                        .iter()
                        .map(|&n| Partial {
                            index: n,
                            amplitude: Spread::new(0.005 / n as f64, 0.012 / n as f64),
                        })
                        .collect(),
                    inharmonicity: 0.0,
                    decay: Spread::new(0.3, 0.6),
                    decay_per_index: 0.0,
                }),
                body_modes: vec![BodyMode {
                    frequency_hz: Spread::new(140.0, 160.0),
                    amplitude: Spread::new(0.03, 0.06),
                    decay: Spread::new(1.5, 2.5),
                }],
                body_filters: None,
                formants: None,
                palm_mute_decay_floor: 60.0,
            },
            di: DiConfig {
                highpass: Some(DiHighpass {
                    cutoff_hz: 40.0,
                    order: FilterOrder::Second,
                }),
                saturation: Some(Saturation {
                    drive: Spread::new(1.001, 1.003),
                    output_scale: 0.9,
                }),
                hum: Some(Hum {
                    amplitude: 0.0001,
                    mains_hz: vec![50.0, 60.0],
                }),
                hiss: None,
            },
            normalize: NormalizeConfig {
                target_peak: 0.8,
                positive_asymmetry: 1.0,
                clip: None,
            },
        }
    }

    /// Sharp pick impulse, register-dependent decay, body filter bank.
    pub fn bright() -> Self {
        Self {
            excitation: ExcitationConfig::Impulse(ImpulseExcitation {
                length_secs: 0.001,
                min_length: 10,
                peak_offset_secs: 0.0,
                peak_gain: 5.0,
                pre_chaos_gain: 0.0,
                post_chaos_gain: 0.8,
                post_chaos_decay: 0.02,
                attack_highpass: Some(0.8),
                pick_scrape: None,
            }),
            damping: DampingConfig {
                open: 0.9995,
                palm_mute: 0.15,
                jitter: Spread::fixed(1.0),
                lfo: None,
                schedule: Some(DecaySchedule {
                    transition_secs: 0.05,
                    open: StageRates {
                        initial: 0.9998,
                        sustain: 0.99995,
                    },
                    palm_mute: StageRates {
                        initial: 0.9992,
                        sustain: 0.9999,
                    },
                }),
                frequency_tracking: Some(FrequencyTracking {
                    reference_hz: 100.0,
                    split_hz: 150.0,
                    above_slope: 0.0001,
                    below_slope: Some(0.00005),
                }),
            },
            brightness: BrightnessConfig {
                split_hz: 200.0,
                high: 0.6,
                low: 0.8,
                jitter: Spread::fixed(1.0),
            },
            vibrato: None,
            noise_burst: Some(NoiseBurstConfig {
                probability: 0.0001,
                amplitude: 0.05,
                scale_with_velocity: true,
                feed_back: true,
            }),
            enrichment: EnrichmentConfig {
                overtones: Some(OvertoneConfig {
                    partials: tables::BRIGHT_OVERTONE_INDICES
                        .iter()
                        .map(|&n| Partial {
                            index: n,
                            amplitude: Spread::fixed(0.035 / (n as f64).powf(1.2)),
                        })
                        .collect(),
                    inharmonicity: 0.0002,
                    decay: Spread::fixed(0.8),
                    decay_per_index: 0.1,
                }),
                body_modes: Vec::new(),
                body_filters: Some(BodyFilterBank {
                    centers_hz: tables::BODY_RESONANCES_HZ.to_vec(),
                    bandwidth: 0.2,
                    gain: 0.15,
                    proximity_hz: 50.0,
                }),
                formants: Some(FormantConfig {
                    formants: tables::LOW_FORMANTS
                        .iter()
                        .map(|&(frequency_hz, amplitude)| Formant { frequency_hz, amplitude })
                        .collect(),
                    decay: 1.2,
                    decay_per_khz: 0.0,
                    weighting: FormantWeighting::Proximity { scale_hz: 80.0 },
                }),
                palm_mute_decay_floor: 60.0,
            },
            di: DiConfig {
                highpass: Some(DiHighpass {
                    cutoff_hz: 30.0,
                    order: FilterOrder::First,
                }),
                saturation: Some(Saturation {
                    drive: Spread::fixed(1.002),
                    output_scale: 0.98,
                }),
                hum: Some(Hum {
                    amplitude: 0.00008,
                    mains_hz: vec![60.0],
                }),
                hiss: Some(Hiss {
                    level: 0.00005,
                    highpass_ratio: 0.8,
                }),
            },
            normalize: NormalizeConfig {
                target_peak: 0.95,
                positive_asymmetry: 1.0,
                clip: None,
            },
        }
    }

    /// Chaotic pick transient with a delayed peak, spectral formants,
    /// asymmetric ceiling. No DI stage.
    pub fn natural() -> Self {
        Self {
            excitation: ExcitationConfig::Impulse(ImpulseExcitation {
                length_secs: 0.003,
                min_length: 15,
                peak_offset_secs: 0.0006,
                peak_gain: 3.2,
                pre_chaos_gain: 0.3,
                post_chaos_gain: 0.8,
                post_chaos_decay: 0.1,
                attack_highpass: None,
                pick_scrape: Some(PickScrape {
                    gain: 0.4,
                    highpass_ratio: 0.7,
                    order: FilterOrder::Third,
                }),
            }),
            damping: DampingConfig {
                open: 0.9995,
                palm_mute: 0.15,
                jitter: Spread::fixed(1.0),
                lfo: None,
                schedule: Some(DecaySchedule {
                    transition_secs: 0.02,
                    open: StageRates {
                        initial: 0.9985,
                        sustain: 0.99985,
                    },
                    palm_mute: StageRates {
                        initial: 0.994,
                        sustain: 0.9996,
                    },
                }),
                frequency_tracking: Some(FrequencyTracking {
                    reference_hz: 100.0,
                    split_hz: 150.0,
                    above_slope: 0.00008,
                    below_slope: None,
                }),
            },
            brightness: BrightnessConfig {
                split_hz: 200.0,
                high: 0.3,
                low: 0.7,
                jitter: Spread::fixed(1.0),
            },
            vibrato: None,
            noise_burst: Some(NoiseBurstConfig {
                probability: 0.0005,
                amplitude: 0.08,
                scale_with_velocity: true,
                feed_back: true,
            }),
            enrichment: EnrichmentConfig {
                overtones: Some(OvertoneConfig {
                    partials: tables::NATURAL_OVERTONES
                        .iter()
                        .map(|&(index, amp)| Partial {
                            index,
                            amplitude: Spread::fixed(amp),
                        })
                        .collect(),
                    inharmonicity: 0.0003,
                    decay: Spread::fixed(1.2),
                    decay_per_index: 0.15,
                }),
                body_modes: Vec::new(),
                body_filters: None,
                formants: Some(FormantConfig {
                    formants: tables::SPECTRAL_FORMANTS
                        .iter()
                        .map(|&(frequency_hz, amplitude)| Formant { frequency_hz, amplitude })
                        .collect(),
                    decay: 1.5,
                    decay_per_khz: 0.5,
                    weighting: FormantWeighting::HarmonicBoost {
                        tolerance_hz: 50.0,
                        boost: 2.0,
                        harmonics: 7,
                    },
                }),
                palm_mute_decay_floor: 60.0,
            },
            di: DiConfig::default(),
            normalize: NormalizeConfig {
                target_peak: 1.45,
                positive_asymmetry: 1.02,
                clip: Some(0.95),
            },
        }
    }

    /// Check ranges that do not depend on the sample rate.
    pub fn validate(&self) -> Result<(), PluckError> {
        match &self.excitation {
            ExcitationConfig::FilteredNoise(noise) => {
                if let Some(lp) = &noise.lowpass {
                    lp.cutoff_hz.check("excitation.lowpass.cutoff_hz")?;
                    positive("excitation.lowpass.cutoff_hz", lp.cutoff_hz.min)?;
                }
                if let Some(decay) = &noise.decay_fraction {
                    decay.check("excitation.decay_fraction")?;
                    positive("excitation.decay_fraction", decay.min)?;
                }
            }
            ExcitationConfig::Impulse(imp) => {
                non_negative("excitation.length_secs", imp.length_secs)?;
                non_negative("excitation.peak_offset_secs", imp.peak_offset_secs)?;
                non_negative("excitation.post_chaos_decay", imp.post_chaos_decay)?;
                if let Some(ratio) = imp.attack_highpass {
                    unit_open("excitation.attack_highpass", ratio)?;
                }
                if let Some(scrape) = &imp.pick_scrape {
                    unit_open("excitation.pick_scrape.highpass_ratio", scrape.highpass_ratio)?;
                }
            }
        }

        let d = &self.damping;
        finite("damping.open", d.open)?;
        finite("damping.palm_mute", d.palm_mute)?;
        d.jitter.check("damping.jitter")?;
        if let Some(lfo) = &d.lfo {
            finite("damping.lfo.depth", lfo.depth)?;
            non_negative("damping.lfo.rate_hz", lfo.rate_hz)?;
        }
        if let Some(s) = &d.schedule {
            non_negative("damping.schedule.transition_secs", s.transition_secs)?;
        }
        if let Some(t) = &d.frequency_tracking {
            positive("damping.frequency_tracking.reference_hz", t.reference_hz)?;
            if t.below_slope.is_none() && d.schedule.is_none() {
                return Err(invalid(
                    "damping.frequency_tracking.below_slope",
                    "an unset slope needs a decay schedule".into(),
                ));
            }
        }

        let b = &self.brightness;
        unit_closed("brightness.high", b.high)?;
        unit_closed("brightness.low", b.low)?;
        b.jitter.check("brightness.jitter")?;

        if let Some(v) = &self.vibrato {
            non_negative("vibrato.depth", v.depth)?;
            non_negative("vibrato.rate_hz", v.rate_hz)?;
        }
        if let Some(n) = &self.noise_burst {
            unit_closed("noise_burst.probability", n.probability)?;
            non_negative("noise_burst.amplitude", n.amplitude)?;
        }

        let e = &self.enrichment;
        non_negative("enrichment.palm_mute_decay_floor", e.palm_mute_decay_floor)?;
        if let Some(o) = &e.overtones {
            o.decay.check("enrichment.overtones.decay")?;
            for p in &o.partials {
                if p.index == 0 {
                    return Err(invalid("enrichment.overtones.partials", "harmonic index 0".into()));
                }
                p.amplitude.check("enrichment.overtones.partials.amplitude")?;
            }
        }
        for m in &e.body_modes {
            m.frequency_hz.check("enrichment.body_modes.frequency_hz")?;
            positive("enrichment.body_modes.frequency_hz", m.frequency_hz.min)?;
            m.amplitude.check("enrichment.body_modes.amplitude")?;
            m.decay.check("enrichment.body_modes.decay")?;
        }
        if let Some(bank) = &e.body_filters {
            positive("enrichment.body_filters.bandwidth", bank.bandwidth)?;
            positive("enrichment.body_filters.proximity_hz", bank.proximity_hz)?;
            for &c in &bank.centers_hz {
                positive("enrichment.body_filters.centers_hz", c)?;
            }
        }
        if let Some(f) = &e.formants {
            if let FormantWeighting::Proximity { scale_hz } = f.weighting {
                positive("enrichment.formants.weighting.scale_hz", scale_hz)?;
            }
        }

        if let Some(hp) = &self.di.highpass {
            positive("di.highpass.cutoff_hz", hp.cutoff_hz)?;
        }
        if let Some(sat) = &self.di.saturation {
            sat.drive.check("di.saturation.drive")?;
            positive("di.saturation.drive", sat.drive.min)?;
        }
        if let Some(hum) = &self.di.hum {
            if hum.mains_hz.is_empty() {
                return Err(invalid("di.hum.mains_hz", "no mains frequency given".into()));
            }
        }
        if let Some(hiss) = &self.di.hiss {
            unit_open("di.hiss.highpass_ratio", hiss.highpass_ratio)?;
        }

        let n = &self.normalize;
        positive("normalize.target_peak", n.target_peak)?;
        positive("normalize.positive_asymmetry", n.positive_asymmetry)?;
        if let Some(c) = n.clip {
            positive("normalize.clip", c)?;
        }
        Ok(())
    }
}

impl EnrichmentConfig {
    /// No additive layers.
    pub fn none() -> Self {
        Self {
            overtones: None,
            body_modes: Vec::new(),
            body_filters: None,
            formants: None,
            palm_mute_decay_floor: 0.0,
        }
    }
}

fn invalid(field: &'static str, reason: String) -> PluckError {
    PluckError::InvalidConfig { field, reason }
}

fn finite(field: &'static str, v: f64) -> Result<(), PluckError> {
    if v.is_finite() { Ok(()) } else { Err(invalid(field, format!("{v} is not finite"))) }
}

fn positive(field: &'static str, v: f64) -> Result<(), PluckError> {
    if v.is_finite() && v > 0.0 { Ok(()) } else { Err(invalid(field, format!("{v} must be > 0"))) }
}

fn non_negative(field: &'static str, v: f64) -> Result<(), PluckError> {
    if v.is_finite() && v >= 0.0 { Ok(()) } else { Err(invalid(field, format!("{v} must be >= 0"))) }
}

fn unit_closed(field: &'static str, v: f64) -> Result<(), PluckError> {
    if (0.0..=1.0).contains(&v) { Ok(()) } else { Err(invalid(field, format!("{v} outside [0, 1]"))) }
}

fn unit_open(field: &'static str, v: f64) -> Result<(), PluckError> {
    if v > 0.0 && v < 1.0 { Ok(()) } else { Err(invalid(field, format!("{v} outside (0, 1)"))) }
}
