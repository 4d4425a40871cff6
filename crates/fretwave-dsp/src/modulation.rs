/// Time-varying perturbations applied inside the string loop.
///
/// Per-pluck scalars (loop gain, smoothing coefficient) are drawn once in
/// `Modulation::new`. Per-sample terms (damping LFO, two-stage decay,
/// vibrato read skips, noise bursts) are evaluated from the sample index.
///
/// The loop gain is clamped to [0, 1] after every modulation term; a gain
/// above unity makes the recurrence diverge.

use std::f64::consts::PI;

use rand::Rng;
use tracing::debug;

use crate::config::{NoiseBurstConfig, PluckConfig, StageRates};
use crate::random::{self, NoiseRng};

pub struct Modulation {
    /// Loop gain after mode selection, jitter and frequency tracking.
    base_damping: f64,
    stages: Option<(StageRates, usize)>,
    /// (depth, radians per sample)
    lfo: Option<(f64, f64)>,
    lp_coeff: f64,
    vibrato: Option<Vibrato>,
    noise: Option<NoiseBurstConfig>,
    velocity: f64,
    clamped: usize,
}

/// Fractional read drift accumulated from the vibrato sine. Each time it
/// crosses a whole sample the cursor skips (advance 2) or holds (advance 0).
struct Vibrato {
    depth: f64,
    phase_inc: f64,
    drift: f64,
}

impl Modulation {
    /// Derive the per-pluck modulation parameters.
    ///
    /// Draws from `rng` in a fixed order: damping jitter, then brightness jitter.
    pub fn new(
        config: &PluckConfig,
        fundamental_hz: f64,
        velocity: f64,
        palm_mute: bool,
        sample_rate: f64,
        rng: &mut NoiseRng,
    ) -> Self {
        let d = &config.damping;
        let mode_base = if palm_mute { d.palm_mute } else { d.open };
        let mut base_damping = mode_base * d.jitter.sample(rng);

        // Higher strings lose more per round trip.
        if let Some(t) = &d.frequency_tracking {
            let ff = fundamental_hz / t.reference_hz;
            if fundamental_hz > t.split_hz {
                base_damping -= ff * t.above_slope;
            } else {
                match t.below_slope {
                    Some(slope) => base_damping += ff * slope,
                    None if !palm_mute => base_damping = 1.0,
                    None => {}
                }
            }
        }

        let stages = d.schedule.map(|s| {
            let rates = if palm_mute { s.palm_mute } else { s.open };
            (rates, (s.transition_secs * sample_rate).round() as usize)
        });

        let lfo = d.lfo.map(|l| (l.depth, 2.0 * PI * l.rate_hz / sample_rate));

        let b = &config.brightness;
        let register = if fundamental_hz > b.split_hz { b.high } else { b.low };
        let lp_coeff = (register * b.jitter.sample(rng)).clamp(0.0, 1.0);

        let vibrato = config.vibrato.map(|v| Vibrato {
            depth: v.depth,
            phase_inc: 2.0 * PI * v.rate_hz / sample_rate,
            drift: 0.0,
        });

        debug!(
            fundamental_hz,
            base_damping,
            lp_coeff,
            palm_mute,
            "derived loop modulation"
        );

        Self {
            base_damping,
            stages,
            lfo,
            lp_coeff,
            vibrato,
            noise: config.noise_burst,
            velocity,
            clamped: 0,
        }
    }

    /// Loop gain at sample `n`, clamped to [0, 1].
    pub fn damping_at(&mut self, n: usize) -> f64 {
        let stage = match self.stages {
            Some((rates, transition)) if n < transition => rates.initial,
            Some((rates, _)) => rates.sustain,
            None => 1.0,
        };
        let lfo = match self.lfo {
            Some((depth, inc)) => depth * (inc * n as f64).sin(),
            None => 0.0,
        };

        let raw = stage * self.base_damping + lfo;
        let clamped = raw.clamp(0.0, 1.0);
        if clamped != raw {
            self.clamped += 1;
        }
        clamped
    }

    /// One-pole smoothing coefficient for this pluck.
    pub fn lowpass_coefficient(&self) -> f64 {
        self.lp_coeff
    }

    pub fn base_damping(&self) -> f64 {
        self.base_damping
    }

    /// Cursor step after sample `n`: normally 1, 2 or 0 when vibrato drift
    /// crosses a whole sample.
    pub fn advance_at(&mut self, n: usize) -> usize {
        let Some(v) = self.vibrato.as_mut() else {
            return 1;
        };
        v.drift += v.depth * (v.phase_inc * n as f64).sin();
        if v.drift >= 1.0 {
            v.drift -= 1.0;
            2
        } else if v.drift <= -1.0 {
            v.drift += 1.0;
            0
        } else {
            1
        }
    }

    /// Finger-noise impulse for this sample, usually zero.
    pub fn noise_burst(&self, rng: &mut NoiseRng) -> f64 {
        let Some(cfg) = &self.noise else {
            return 0.0;
        };
        if cfg.probability <= 0.0 || !rng.random_bool(cfg.probability) {
            return 0.0;
        }
        let scale = if cfg.scale_with_velocity { self.velocity } else { 1.0 };
        random::bipolar(rng) * cfg.amplitude * scale
    }

    /// Whether bursts are written back into the loop.
    pub fn bursts_feed_back(&self) -> bool {
        self.noise.is_some_and(|n| n.feed_back)
    }

    /// Samples at which the loop gain had to be clamped.
    pub fn clamped_samples(&self) -> usize {
        self.clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DampingLfo, Spread};
    use crate::random::seeded;

    const SR: f64 = 44100.0;

    #[test]
    fn test_palm_mute_damps_harder() {
        let cfg = PluckConfig::classic();
        let mut open = Modulation::new(&cfg, 110.0, 0.8, false, SR, &mut seeded(1));
        let mut muted = Modulation::new(&cfg, 110.0, 0.8, true, SR, &mut seeded(1));
        assert!(open.damping_at(0) > 0.99);
        assert!(muted.damping_at(0) < 0.2);
    }

    #[test]
    fn test_damping_never_leaves_unit_range() {
        let mut cfg = PluckConfig::classic();
        cfg.damping.open = 1.2;
        cfg.damping.lfo = Some(DampingLfo { depth: 0.5, rate_hz: 3.0 });
        let mut m = Modulation::new(&cfg, 110.0, 0.8, false, SR, &mut seeded(2));
        for n in 0..44100 {
            let d = m.damping_at(n);
            assert!((0.0..=1.0).contains(&d), "damping {d} at {n}");
        }
        assert!(m.clamped_samples() > 0);

        cfg.damping.open = -0.5;
        let mut m = Modulation::new(&cfg, 110.0, 0.8, false, SR, &mut seeded(2));
        assert_eq!(m.damping_at(0), 0.0);
    }

    #[test]
    fn test_two_stage_schedule() {
        let cfg = PluckConfig::bright();
        let mut m = Modulation::new(&cfg, 100.0, 1.0, false, SR, &mut seeded(3));
        let early = m.damping_at(0);
        let late = m.damping_at(44100 / 2);
        assert!(late > early, "sustain stage ({late}) should lose less than initial ({early})");
        // Transition at 50 ms.
        assert_eq!(m.damping_at(2204), early);
        assert_eq!(m.damping_at(2205), late);
    }

    #[test]
    fn test_frequency_tracking_shortens_high_notes() {
        let cfg = PluckConfig::bright();
        let low = Modulation::new(&cfg, 82.41, 1.0, false, SR, &mut seeded(4));
        let high = Modulation::new(&cfg, 329.63, 1.0, false, SR, &mut seeded(4));
        assert!(high.base_damping() < low.base_damping());
    }

    #[test]
    fn test_low_open_strings_follow_schedule_only() {
        let cfg = PluckConfig::natural();
        let mut low = Modulation::new(&cfg, 110.0, 1.0, false, SR, &mut seeded(13));
        assert_eq!(low.base_damping(), 1.0);
        assert_eq!(low.damping_at(0), 0.9985);
        assert_eq!(low.damping_at(44100), 0.99985);

        let high = Modulation::new(&cfg, 196.0, 1.0, false, SR, &mut seeded(13));
        assert!((high.base_damping() - (0.9995 - 1.96 * 0.00008)).abs() < 1e-12);

        let muted = Modulation::new(&cfg, 110.0, 1.0, true, SR, &mut seeded(13));
        assert_eq!(muted.base_damping(), 0.15);
    }

    #[test]
    fn test_brightness_by_register() {
        let cfg = PluckConfig::natural();
        let low = Modulation::new(&cfg, 110.0, 1.0, false, SR, &mut seeded(5));
        let high = Modulation::new(&cfg, 330.0, 1.0, false, SR, &mut seeded(5));
        assert_eq!(low.lowpass_coefficient(), 0.7);
        assert_eq!(high.lowpass_coefficient(), 0.3);
    }

    #[test]
    fn test_brightness_jitter_stays_in_range() {
        let mut cfg = PluckConfig::classic();
        cfg.brightness.low = 1.0;
        cfg.brightness.jitter = Spread::new(1.0, 1.5);
        let m = Modulation::new(&cfg, 110.0, 1.0, false, SR, &mut seeded(6));
        assert_eq!(m.lowpass_coefficient(), 1.0);
    }

    #[test]
    fn test_vibrato_steps_balance() {
        let cfg = PluckConfig::classic();
        let mut m = Modulation::new(&cfg, 110.0, 1.0, false, SR, &mut seeded(7));
        let (mut skips, mut holds) = (0usize, 0usize);
        // One full 5 Hz cycle.
        for n in 0..8820 {
            match m.advance_at(n) {
                2 => skips += 1,
                0 => holds += 1,
                1 => {}
                other => panic!("unexpected step {other}"),
            }
        }
        assert!(skips > 0 && holds > 0, "skips {skips}, holds {holds}");
        assert!(skips.abs_diff(holds) <= 1, "a full cycle should net out: {skips} vs {holds}");
    }

    #[test]
    fn test_no_vibrato_always_steps_one() {
        let cfg = PluckConfig::bright();
        let mut m = Modulation::new(&cfg, 110.0, 1.0, false, SR, &mut seeded(8));
        assert!((0..10_000).all(|n| m.advance_at(n) == 1));
    }

    #[test]
    fn test_noise_bursts_rare_and_bounded() {
        let mut cfg = PluckConfig::classic();
        cfg.noise_burst.as_mut().unwrap().probability = 0.01;
        let m = Modulation::new(&cfg, 110.0, 1.0, false, SR, &mut seeded(9));
        let mut rng = seeded(10);
        let bursts: Vec<f64> = (0..100_000).map(|_| m.noise_burst(&mut rng)).filter(|&b| b != 0.0).collect();
        assert!(bursts.len() > 700 && bursts.len() < 1300, "count {}", bursts.len());
        assert!(bursts.iter().all(|b| b.abs() <= 0.1));
    }

    #[test]
    fn test_velocity_scaled_bursts() {
        let cfg = PluckConfig::natural();
        let m = Modulation::new(&cfg, 110.0, 0.0, false, SR, &mut seeded(11));
        let mut rng = seeded(12);
        assert!((0..100_000).all(|_| m.noise_burst(&mut rng) == 0.0));
        assert!(m.bursts_feed_back());
    }
}
