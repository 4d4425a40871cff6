/// Shared filter primitives for the pluck pipeline.
///
/// All filters: `new(freq, sample_rate)`, `process(sample) -> sample`, `reset()`.
/// Stages compose `Filter` instances instead of designing coefficients inline.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A mono IIR filter with internal state.
pub trait Filter {
    fn process(&mut self, x: f64) -> f64;

    fn reset(&mut self);

    /// Filter a whole buffer in place.
    fn process_buffer(&mut self, buf: &mut [f64]) {
        for s in buf.iter_mut() {
            *s = self.process(*s);
        }
    }
}

/// Butterworth order for the cascade helpers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOrder {
    First,
    Second,
    Third,
}

/// Cutoff in Hz for a fraction of Nyquist.
pub fn normalized_cutoff(ratio_of_nyquist: f64, sample_rate: f64) -> f64 {
    ratio_of_nyquist * sample_rate / 2.0
}

/// 1-pole high-pass filter: y[n] = alpha * (y[n-1] + x[n] - x[n-1])
pub struct OnePoleHpf {
    alpha: f64,
    prev_x: f64,
    prev_y: f64,
}

impl OnePoleHpf {
    pub fn new(cutoff_hz: f64, sample_rate: f64) -> Self {
        let rc = 1.0 / (2.0 * PI * cutoff_hz);
        let dt = 1.0 / sample_rate;
        let alpha = rc / (rc + dt);
        Self {
            alpha,
            prev_x: 0.0,
            prev_y: 0.0,
        }
    }
}

impl Filter for OnePoleHpf {
    fn process(&mut self, x: f64) -> f64 {
        let y = self.alpha * (self.prev_y + x - self.prev_x);
        self.prev_x = x;
        self.prev_y = y;
        y
    }

    fn reset(&mut self) {
        self.prev_x = 0.0;
        self.prev_y = 0.0;
    }
}

/// 1-pole low-pass filter: y[n] = alpha * x[n] + (1 - alpha) * y[n-1]
pub struct OnePoleLpf {
    alpha: f64,
    prev_y: f64,
}

impl OnePoleLpf {
    pub fn new(cutoff_hz: f64, sample_rate: f64) -> Self {
        let rc = 1.0 / (2.0 * PI * cutoff_hz);
        let dt = 1.0 / sample_rate;
        Self::with_coefficient(dt / (rc + dt))
    }

    /// Smoothing filter from a raw mixing coefficient in [0, 1].
    /// 1.0 passes the input through unchanged.
    pub fn with_coefficient(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            prev_y: 0.0,
        }
    }
}

impl Filter for OnePoleLpf {
    fn process(&mut self, x: f64) -> f64 {
        let y = self.alpha * x + (1.0 - self.alpha) * self.prev_y;
        self.prev_y = y;
        y
    }

    fn reset(&mut self) {
        self.prev_y = 0.0;
    }
}

/// Biquad filter, Direct Form II Transposed.
///
/// General-purpose second-order IIR filter. Coefficients set via
/// constructor methods for specific filter types.
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    s1: f64,
    s2: f64,
}

impl Biquad {
    fn from_raw(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            s1: 0.0,
            s2: 0.0,
        }
    }

    /// Bandpass filter (constant 0 dB peak gain, Audio EQ Cookbook).
    pub fn bandpass(center_hz: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * center_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        Self::from_raw(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }

    /// Low-pass filter (Audio EQ Cookbook).
    pub fn lowpass(cutoff_hz: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let b1 = 1.0 - cos_w0;
        let b0 = b1 / 2.0;
        Self::from_raw(b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }

    /// High-pass filter (Audio EQ Cookbook).
    pub fn highpass(cutoff_hz: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let b1 = -(1.0 + cos_w0);
        let b0 = -b1 / 2.0;
        Self::from_raw(b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }
}

impl Filter for Biquad {
    /// Process one sample (Direct Form II Transposed).
    fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.s1;
        self.s1 = self.b1 * x - self.a1 * y + self.s2;
        self.s2 = self.b2 * x - self.a2 * y;
        y
    }

    fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }
}

/// Series cascade of filters.
#[derive(Default)]
pub struct FilterChain {
    stages: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: impl Filter + 'static) {
        self.stages.push(Box::new(stage));
    }

    pub fn with(mut self, stage: impl Filter + 'static) -> Self {
        self.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Filter for FilterChain {
    fn process(&mut self, x: f64) -> f64 {
        self.stages.iter_mut().fold(x, |acc, stage| stage.process(acc))
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}

/// Butterworth high-pass as a cascade: 1-pole, biquad (Q=1/sqrt 2), or
/// 1-pole + biquad (Q=1) for third order.
pub fn butterworth_highpass(order: FilterOrder, cutoff_hz: f64, sample_rate: f64) -> FilterChain {
    match order {
        FilterOrder::First => FilterChain::new().with(OnePoleHpf::new(cutoff_hz, sample_rate)),
        FilterOrder::Second => {
            FilterChain::new().with(Biquad::highpass(cutoff_hz, FRAC_1_SQRT_2, sample_rate))
        }
        FilterOrder::Third => FilterChain::new()
            .with(OnePoleHpf::new(cutoff_hz, sample_rate))
            .with(Biquad::highpass(cutoff_hz, 1.0, sample_rate)),
    }
}

/// Butterworth low-pass, same cascade layout as `butterworth_highpass`.
pub fn butterworth_lowpass(order: FilterOrder, cutoff_hz: f64, sample_rate: f64) -> FilterChain {
    match order {
        FilterOrder::First => FilterChain::new().with(OnePoleLpf::new(cutoff_hz, sample_rate)),
        FilterOrder::Second => {
            FilterChain::new().with(Biquad::lowpass(cutoff_hz, FRAC_1_SQRT_2, sample_rate))
        }
        FilterOrder::Third => FilterChain::new()
            .with(OnePoleLpf::new(cutoff_hz, sample_rate))
            .with(Biquad::lowpass(cutoff_hz, 1.0, sample_rate)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady_peak(filter: &mut dyn Filter, freq: f64, sr: f64) -> f64 {
        filter.reset();
        let n = (sr * 0.1) as usize;
        let mut peak = 0.0f64;
        for i in 0..n {
            let x = (2.0 * PI * freq * i as f64 / sr).sin();
            let y = filter.process(x);
            if i > n / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn test_hpf_passes_high_freq() {
        let sr = 44100.0;
        let mut hpf = OnePoleHpf::new(1000.0, sr);
        let peak = steady_peak(&mut hpf, 5000.0, sr);
        assert!(peak > 0.9, "HPF attenuated 5kHz too much: {peak}");
    }

    #[test]
    fn test_hpf_attenuates_low_freq() {
        let sr = 44100.0;
        let mut hpf = OnePoleHpf::new(2000.0, sr);
        let peak = steady_peak(&mut hpf, 200.0, sr);
        assert!(peak < 0.15, "HPF didn't attenuate 200Hz enough: {peak}");
    }

    #[test]
    fn test_lpf_attenuates_high_freq() {
        let sr = 44100.0;
        let mut lpf = OnePoleLpf::new(500.0, sr);
        let peak = steady_peak(&mut lpf, 10000.0, sr);
        assert!(peak < 0.1, "LPF didn't attenuate 10kHz enough: {peak}");
    }

    #[test]
    fn test_unity_coefficient_is_transparent() {
        let mut lpf = OnePoleLpf::with_coefficient(1.0);
        for x in [0.3, -0.7, 0.1, 0.0, 1.0] {
            assert_eq!(lpf.process(x), x);
        }
    }

    #[test]
    fn test_biquad_bandpass() {
        let sr = 44100.0;
        let mut bpf = Biquad::bandpass(1000.0, 1.0, sr);
        let peak_center = steady_peak(&mut bpf, 1000.0, sr);
        let peak_low = steady_peak(&mut bpf, 100.0, sr);

        assert!((peak_center - 1.0).abs() < 0.05, "0 dB peak expected, got {peak_center}");
        assert!(
            peak_center > peak_low * 3.0,
            "BPF center ({peak_center}) should be much louder than off-center ({peak_low})"
        );
    }

    #[test]
    fn test_butterworth_highpass_removes_dc() {
        let sr = 44100.0;
        for order in [FilterOrder::First, FilterOrder::Second, FilterOrder::Third] {
            let mut hpf = butterworth_highpass(order, 40.0, sr);
            let mut last = 0.0;
            for _ in 0..(sr as usize) {
                last = hpf.process(1.0);
            }
            assert!(last.abs() < 0.01, "{order:?} HPF left DC: {last}");
        }
    }

    #[test]
    fn test_steeper_order_cuts_more() {
        let sr = 44100.0;
        let cutoff = normalized_cutoff(0.5, sr);
        let mut first = butterworth_highpass(FilterOrder::First, cutoff, sr);
        let mut third = butterworth_highpass(FilterOrder::Third, cutoff, sr);
        let p1 = steady_peak(&mut first, 1000.0, sr);
        let p3 = steady_peak(&mut third, 1000.0, sr);
        assert!(p3 < p1, "third order ({p3}) should cut 1kHz more than first ({p1})");
    }

    #[test]
    fn test_lowpass_chain_passes_low_freq() {
        let sr = 44100.0;
        let mut lpf = butterworth_lowpass(FilterOrder::Second, 6000.0, sr);
        let peak = steady_peak(&mut lpf, 200.0, sr);
        assert!(peak > 0.95, "LPF attenuated 200Hz: {peak}");
    }

    #[test]
    fn test_chain_process_buffer_matches_per_sample() {
        let sr = 44100.0;
        let input: Vec<f64> = (0..256).map(|i| ((i * 37) % 17) as f64 / 17.0 - 0.5).collect();

        let mut a = butterworth_highpass(FilterOrder::Third, 3000.0, sr);
        let mut buf = input.clone();
        a.process_buffer(&mut buf);

        let mut b = butterworth_highpass(FilterOrder::Third, 3000.0, sr);
        let expected: Vec<f64> = input.iter().map(|&x| b.process(x)).collect();
        assert_eq!(buf, expected);
    }
}
