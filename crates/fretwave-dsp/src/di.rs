//! DI output stage: what the signal picks up between the pickup and the desk.
//!
//! Signal flow:
//!   input -> DC-blocking high-pass -> tanh soft-clip -> + mains hum -> + hiss
//!
//! Drive sits just above unity, so the soft-clip is close to transparent at
//! normal levels and only rounds the loudest peaks. Hum and hiss sit far
//! below the string (around -80 dB) and are only audible in the tail.

use std::f64::consts::PI;

use rand::Rng;
use tracing::debug;

use crate::config::DiConfig;
use crate::filters::{self, Filter, FilterChain, FilterOrder};
use crate::random::{self, NoiseRng};

pub struct DiStage {
    highpass: Option<FilterChain>,
    /// (drive, output scale)
    saturation: Option<(f64, f64)>,
    /// (amplitude, radians per sample)
    hum: Option<(f64, f64)>,
    hiss: Option<(f64, FilterChain)>,
}

impl DiStage {
    /// Build the stage for one pluck.
    ///
    /// Draws from `rng` in order: saturation drive, then the mains frequency.
    pub fn new(config: &DiConfig, sample_rate: f64, rng: &mut NoiseRng) -> Self {
        let highpass = config
            .highpass
            .map(|hp| filters::butterworth_highpass(hp.order, hp.cutoff_hz, sample_rate));

        let saturation = config.saturation.map(|s| (s.drive.sample(rng), s.output_scale));

        let hum = config.hum.as_ref().and_then(|h| {
            let mains = match h.mains_hz.len() {
                0 => return None,
                1 => h.mains_hz[0],
                n => h.mains_hz[rng.random_range(0..n)],
            };
            Some((h.amplitude, 2.0 * PI * mains / sample_rate))
        });

        let hiss = config.hiss.map(|h| {
            let cutoff = filters::normalized_cutoff(h.highpass_ratio, sample_rate);
            (h.level, filters::butterworth_highpass(FilterOrder::First, cutoff, sample_rate))
        });

        debug!(
            drive = saturation.map(|(d, _)| d),
            hum_hz = hum.map(|(_, inc)| inc * sample_rate / (2.0 * PI)),
            "DI stage ready"
        );

        Self { highpass, saturation, hum, hiss }
    }

    /// Process the whole note in place. Hiss draws one value per sample.
    pub fn process_buffer(&mut self, buffer: &mut [f64], rng: &mut NoiseRng) {
        for (n, s) in buffer.iter_mut().enumerate() {
            let mut x = *s;
            if let Some(hp) = self.highpass.as_mut() {
                x = hp.process(x);
            }
            if let Some((drive, scale)) = self.saturation {
                x = (x * drive).tanh() * scale;
            }
            if let Some((amp, inc)) = self.hum {
                x += amp * (inc * n as f64).sin();
            }
            if let Some((level, hp)) = self.hiss.as_mut() {
                x += hp.process(random::bipolar(rng) * *level);
            }
            *s = x;
        }
    }
}
