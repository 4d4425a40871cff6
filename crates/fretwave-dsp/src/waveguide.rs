/// Karplus-Strong string loop.
///
/// Per output sample:
///   1. read `current` and `next` from the delay line
///   2. emit `current` (plus a rare noise burst)
///   3. average the pair (two-point moving average)
///   4. one-pole smoothing: y = c * avg + (1 - c) * y_prev
///   5. scale by the modulated loop gain and write back under the cursor
///   6. advance the cursor (1, or 0/2 under vibrato)
///
/// The average is the string filter proper: higher partials lose more per
/// round trip. The smoothing pole adds stiffness.

use crate::delay_line::DelayLine;
use crate::filters::{Filter, OnePoleLpf};
use crate::modulation::Modulation;
use crate::random::NoiseRng;

/// Loop state carried across samples, fresh for every pluck.
pub struct FilterState {
    smoothing: OnePoleLpf,
}

impl FilterState {
    pub fn new(lp_coeff: f64) -> Self {
        Self {
            smoothing: OnePoleLpf::with_coefficient(lp_coeff),
        }
    }
}

/// Run the loop for `total_samples` steps and return the emitted samples.
pub fn render(
    line: &mut DelayLine,
    modulation: &mut Modulation,
    total_samples: usize,
    rng: &mut NoiseRng,
) -> Vec<f64> {
    let mut state = FilterState::new(modulation.lowpass_coefficient());
    let feed_back = modulation.bursts_feed_back();
    let mut output = Vec::with_capacity(total_samples);

    for n in 0..total_samples {
        let mut current = line.current();
        let burst = modulation.noise_burst(rng);
        if feed_back {
            current += burst;
            output.push(current);
        } else {
            output.push(current + burst);
        }

        let next = line.next();
        let averaged = 0.5 * (current + next);
        let filtered = state.smoothing.process(averaged);
        let damped = modulation.damping_at(n) * filtered;

        line.write(damped);
        line.advance(modulation.advance_at(n));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluckConfig;
    use crate::random::{self, seeded};

    const SR: f64 = 44100.0;

    /// Lossless loop: unity gain, no smoothing, no vibrato or bursts.
    fn lossless() -> PluckConfig {
        let mut cfg = PluckConfig::basic();
        cfg.damping.open = 1.0;
        cfg
    }

    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = seeded(seed);
        (0..len).map(|_| random::bipolar(&mut rng)).collect()
    }

    fn run(cfg: &PluckConfig, excitation: &[f64], palm_mute: bool, total: usize) -> (DelayLine, Vec<f64>) {
        let mut rng = seeded(0);
        let len = excitation.len();
        let mut line = DelayLine::with_excitation(len, excitation).unwrap();
        let mut m = Modulation::new(cfg, SR / len as f64, 1.0, palm_mute, SR, &mut rng);
        let out = render(&mut line, &mut m, total, &mut rng);
        (line, out)
    }

    fn peak(xs: &[f64]) -> f64 {
        xs.iter().map(|x| x.abs()).fold(0.0f64, f64::max)
    }

    #[test]
    fn test_first_cycle_is_excitation() {
        let exc = noise(100, 1);
        let (_, out) = run(&PluckConfig::basic(), &exc, false, 300);
        assert_eq!(out.len(), 300);
        assert_eq!(&out[..100], &exc[..]);
    }

    #[test]
    fn test_lossless_pass_is_pairwise_average() {
        let exc = noise(64, 2);
        let (line, _) = run(&lossless(), &exc, false, 64);

        let cells = line.cells();
        for i in 0..63 {
            assert_eq!(cells[i], 0.5 * (exc[i] + exc[i + 1]), "cell {i}");
        }
        assert_eq!(cells[63], 0.5 * (exc[63] + cells[0]));
    }

    #[test]
    fn test_lossless_dc_is_conserved_exactly() {
        let exc = vec![0.25; 50];
        let (line, out) = run(&lossless(), &exc, false, 5000);
        assert!(out.iter().all(|&s| s == 0.25));
        assert_eq!(line.energy(), 50.0 * 0.0625);
    }

    #[test]
    fn test_lossless_peak_never_grows() {
        let exc = noise(80, 3);
        let cfg = lossless();
        let mut rng = seeded(0);
        let mut line = DelayLine::with_excitation(80, &exc).unwrap();
        let mut m = Modulation::new(&cfg, SR / 80.0, 1.0, false, SR, &mut rng);
        let mut prev = peak(line.cells());
        for _ in 0..20 {
            render(&mut line, &mut m, 80, &mut rng);
            let p = peak(line.cells());
            assert!(p <= prev, "peak grew: {prev} -> {p}");
            prev = p;
        }
        assert!(line.energy() < exc.iter().map(|x| x * x).sum::<f64>());
    }

    #[test]
    fn test_heavy_damping_silences_within_a_few_cycles() {
        // Loop gain 0.1: log(0.01) / log(0.1) = 2 cycles to -40 dB.
        let exc = noise(200, 4);
        let (_, out) = run(&PluckConfig::basic(), &exc, true, 200 * 6);
        let cycle_peaks: Vec<f64> = out.chunks(200).map(peak).collect();

        for w in cycle_peaks.windows(2) {
            assert!(w[1] <= w[0], "envelope should not rise: {cycle_peaks:?}");
        }
        assert!(
            cycle_peaks[3] < 0.01 * cycle_peaks[0],
            "below 1% by the fourth cycle: {cycle_peaks:?}"
        );
    }

    #[test]
    fn test_open_string_sustains() {
        let exc = noise(401, 5);
        let (_, out) = run(&PluckConfig::basic(), &exc, false, 44100);
        let first = peak(&out[..401]);
        let last = peak(&out[44100 - 401..]);
        assert!(last > 0.01 * first, "open string died too fast: {first} -> {last}");
        assert!(last < first);
    }

    #[test]
    fn test_feedback_burst_recirculates() {
        let mut cfg = lossless();
        cfg.noise_burst = Some(crate::config::NoiseBurstConfig {
            probability: 1.0,
            amplitude: 0.5,
            scale_with_velocity: false,
            feed_back: true,
        });
        let exc = vec![0.0; 10];
        let (line, out) = run(&cfg, &exc, false, 10);
        assert!(out.iter().any(|&s| s != 0.0));
        assert!(line.energy() > 0.0, "fed-back bursts should stay in the loop");
    }
}
