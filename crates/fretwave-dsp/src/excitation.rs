/// Pluck excitation: the initial disturbance loaded into the delay line.
///
/// Two shapes share one contract: the returned burst is at least as long as
/// the delay line (and at least the mode's minimum length). Anything past
/// the delay-line length is dropped when the line is loaded.
///
/// Filtered noise models a soft pick: velocity-scaled white noise, low-passed
/// at a per-pluck cutoff (pick hardness) under an exponential envelope.
///
/// The impulse models a hard pick: a chaotic lead-in, a sharp spike at a
/// fixed offset (~0.6 ms), then settling noise, optionally brightened by a
/// high-pass and summed with high-passed scrape noise.

use crate::config::{ExcitationConfig, FilteredNoise, ImpulseExcitation};
use crate::filters::{self, Filter, FilterOrder};
use crate::random::{self, NoiseRng};

/// Keep designed cutoffs safely under Nyquist.
const MAX_CUTOFF_RATIO: f64 = 0.45;

/// Render the excitation burst for one pluck.
///
/// - `delay_length`: delay-line length in samples (>= 1)
/// - `velocity`: 0.0 (silent) upward; scales every component
pub fn generate(
    config: &ExcitationConfig,
    delay_length: usize,
    velocity: f64,
    sample_rate: f64,
    rng: &mut NoiseRng,
) -> Vec<f64> {
    match config {
        ExcitationConfig::FilteredNoise(noise) => {
            filtered_noise(noise, delay_length, velocity, sample_rate, rng)
        }
        ExcitationConfig::Impulse(imp) => impulse(imp, delay_length, velocity, sample_rate, rng),
    }
}

/// Length of the burst `generate` will return.
pub fn burst_length(config: &ExcitationConfig, delay_length: usize, sample_rate: f64) -> usize {
    match config {
        ExcitationConfig::FilteredNoise(noise) => delay_length.max(noise.min_length),
        ExcitationConfig::Impulse(imp) => delay_length.max(impulse_length(imp, sample_rate)),
    }
}

fn impulse_length(imp: &ImpulseExcitation, sample_rate: f64) -> usize {
    ((imp.length_secs * sample_rate).round() as usize).max(imp.min_length).max(1)
}

fn filtered_noise(
    cfg: &FilteredNoise,
    delay_length: usize,
    velocity: f64,
    sample_rate: f64,
    rng: &mut NoiseRng,
) -> Vec<f64> {
    let len = delay_length.max(cfg.min_length);

    let mut lpf = cfg.lowpass.as_ref().map(|lp| {
        let cutoff = lp.cutoff_hz.sample(rng).min(MAX_CUTOFF_RATIO * sample_rate);
        filters::butterworth_lowpass(lp.order, cutoff, sample_rate)
    });

    let mut burst: Vec<f64> = (0..len).map(|_| random::bipolar(rng) * velocity).collect();
    if let Some(f) = lpf.as_mut() {
        f.process_buffer(&mut burst);
    }

    if let Some(fraction) = &cfg.decay_fraction {
        let decay_samples = fraction.sample(rng) * len as f64;
        for (n, s) in burst.iter_mut().enumerate() {
            *s *= (-(n as f64) / decay_samples).exp();
        }
    }
    burst
}

fn impulse(
    cfg: &ImpulseExcitation,
    delay_length: usize,
    velocity: f64,
    sample_rate: f64,
    rng: &mut NoiseRng,
) -> Vec<f64> {
    let len = impulse_length(cfg, sample_rate);
    let peak = ((cfg.peak_offset_secs * sample_rate).round() as usize).min(len - 1);

    let mut transient = vec![0.0f64; len];

    // Pick scraping along the string before the spike.
    for i in 0..peak {
        let ramp = i as f64 / peak as f64;
        transient[i] = random::bipolar(rng) * velocity * cfg.pre_chaos_gain * ramp;
    }

    transient[peak] = velocity * cfg.peak_gain;

    // String settling after release.
    for i in (peak + 1)..len {
        let decay = (-((i - peak) as f64) * cfg.post_chaos_decay).exp();
        transient[i] = random::bipolar(rng) * velocity * cfg.post_chaos_gain * decay;
    }

    if let Some(ratio) = cfg.attack_highpass {
        let cutoff = filters::normalized_cutoff(ratio, sample_rate);
        filters::butterworth_highpass(FilterOrder::Second, cutoff, sample_rate)
            .process_buffer(&mut transient);
    }

    if let Some(scrape) = &cfg.pick_scrape {
        let cutoff = filters::normalized_cutoff(scrape.highpass_ratio, sample_rate);
        let mut hpf = filters::butterworth_highpass(scrape.order, cutoff, sample_rate);
        for s in transient.iter_mut() {
            let noise = random::bipolar(rng) * velocity * scrape.gain;
            *s += hpf.process(noise);
        }
    }

    transient.resize(delay_length.max(len), 0.0);
    transient
}
