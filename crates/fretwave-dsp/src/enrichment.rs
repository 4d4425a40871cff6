//! Resonance and harmonic enrichment, summed onto the finished string output.
//!
//! Four additive layers, each optional:
//!   - band-passed copies of the string at body resonances, weighted by how
//!     close the fundamental sits to each resonance
//!   - stretched overtones: f0 * n * (1 + B * (n - 1)), amplitude ~ 1/n^p,
//!     each decaying faster than the fundamental
//!   - decaying sines at body-mode frequencies
//!   - spectral formants, weighted by proximity to f0 or to its harmonics
//!
//! Layer amplitudes are relative to the string's peak, so a silent string
//! stays silent. Samples are only ever added to; the buffer length never
//! changes.

use std::f64::consts::PI;

use tracing::debug;

use crate::config::{EnrichmentConfig, FormantConfig, FormantWeighting};
use crate::filters::{Biquad, Filter};
use crate::random::NoiseRng;

/// Sum every configured layer onto `buffer`.
///
/// Draws from `rng` in order: overtone amplitude/decay per partial, then
/// frequency/amplitude/decay per body mode.
pub fn apply(
    config: &EnrichmentConfig,
    buffer: &mut [f64],
    fundamental_hz: f64,
    palm_mute: bool,
    sample_rate: f64,
    rng: &mut NoiseRng,
) {
    let level = buffer.iter().map(|x| x.abs()).fold(0.0f64, f64::max);
    let nyquist = sample_rate / 2.0;
    let decay_for = |rate: f64| {
        if palm_mute { rate.max(config.palm_mute_decay_floor) } else { rate }
    };
    let mut layers = 0usize;

    if let Some(bank) = &config.body_filters {
        let dry = buffer.to_vec();
        for &center in bank.centers_hz.iter().filter(|&&c| c < nyquist) {
            let proximity = (-(fundamental_hz - center).abs() / bank.proximity_hz).exp();
            let weight = bank.gain * proximity;
            let mut bpf = Biquad::bandpass(center, 1.0 / bank.bandwidth, sample_rate);
            for (out, &x) in buffer.iter_mut().zip(&dry) {
                *out += weight * bpf.process(x);
            }
            layers += 1;
        }
    }

    if let Some(ot) = &config.overtones {
        for p in &ot.partials {
            let n = p.index as f64;
            let amp = p.amplitude.sample(rng);
            let decay = ot.decay.sample(rng) + ot.decay_per_index * n;
            let freq = fundamental_hz * n * (1.0 + ot.inharmonicity * (n - 1.0));
            if freq >= nyquist {
                continue;
            }
            add_decaying_sine(buffer, freq, amp * level, decay_for(decay), sample_rate);
            layers += 1;
        }
    }

    for mode in &config.body_modes {
        let freq = mode.frequency_hz.sample(rng);
        let amp = mode.amplitude.sample(rng);
        let decay = mode.decay.sample(rng);
        if freq >= nyquist {
            continue;
        }
        add_decaying_sine(buffer, freq, amp * level, decay_for(decay), sample_rate);
        layers += 1;
    }

    if let Some(fc) = &config.formants {
        for f in fc.formants.iter().filter(|f| f.frequency_hz < nyquist) {
            let amp = f.amplitude * formant_weight(fc, f.frequency_hz, fundamental_hz);
            let decay = fc.decay + fc.decay_per_khz * f.frequency_hz / 1000.0;
            add_decaying_sine(buffer, f.frequency_hz, amp * level, decay_for(decay), sample_rate);
            layers += 1;
        }
    }

    debug!(layers, level, "enrichment applied");
}

/// Amplitude multiplier for a formant at `freq` given the fundamental.
pub fn formant_weight(config: &FormantConfig, freq: f64, fundamental_hz: f64) -> f64 {
    match config.weighting {
        FormantWeighting::Flat => 1.0,
        FormantWeighting::Proximity { scale_hz } => (-(fundamental_hz - freq).abs() / scale_hz).exp(),
        FormantWeighting::HarmonicBoost { tolerance_hz, boost, harmonics } => {
            let near = (1..=harmonics).any(|h| (freq - fundamental_hz * h as f64).abs() < tolerance_hz);
            if near { boost } else { 1.0 }
        }
    }
}

/// buffer[n] += amp * sin(2 pi f t) * exp(-decay * t)
pub fn add_decaying_sine(buffer: &mut [f64], freq: f64, amp: f64, decay: f64, sample_rate: f64) {
    if amp == 0.0 {
        return;
    }
    let phase_inc = 2.0 * PI * freq / sample_rate;
    let env_step = (-decay / sample_rate).exp();
    let mut env = amp;
    for (n, s) in buffer.iter_mut().enumerate() {
        *s += env * (phase_inc * n as f64).sin();
        env *= env_step;
    }
}
