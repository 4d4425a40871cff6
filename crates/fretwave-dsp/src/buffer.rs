//! Rendered audio at a fixed sample rate.

use crate::error::PluckError;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// `round(duration_secs * sample_rate)` zeros.
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let len = (duration_secs.max(0.0) * sample_rate as f64).round() as usize;
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f64 {
        self.samples.iter().map(|x| x.abs()).fold(0.0f64, f64::max)
    }

    pub fn rms(&self) -> f64 {
        rms(&self.samples)
    }

    /// RMS over `len` samples from `start`, truncated at the end of the
    /// buffer. Empty windows read as 0.
    pub fn window_rms(&self, start: usize, len: usize) -> f64 {
        let start = start.min(self.samples.len());
        let end = start.saturating_add(len).min(self.samples.len());
        rms(&self.samples[start..end])
    }

    /// Append another buffer recorded at the same rate.
    pub fn append(&mut self, other: &AudioBuffer) -> Result<(), PluckError> {
        if other.sample_rate != self.sample_rate {
            return Err(PluckError::InvalidSampleRate { sample_rate: other.sample_rate });
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }
}

fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|x| x * x).sum::<f64>() / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_length() {
        let s = AudioBuffer::silence(0.2, 44100);
        assert_eq!(s.len(), 8820);
        assert_eq!(s.peak(), 0.0);
        assert!((s.duration_secs() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_levels() {
        let buf = AudioBuffer::new(vec![1.0, -1.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0], 8);
        assert_eq!(buf.peak(), 1.0);
        assert!((buf.rms() - 0.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(buf.window_rms(0, 4), 1.0);
        assert_eq!(buf.window_rms(4, 100), 0.0);
        assert_eq!(buf.window_rms(100, 4), 0.0);
    }

    #[test]
    fn test_append_checks_rate() {
        let mut a = AudioBuffer::new(vec![0.5; 3], 44100);
        a.append(&AudioBuffer::silence(0.001, 44100)).unwrap();
        assert_eq!(a.len(), 3 + 44);
        assert!(matches!(
            a.append(&AudioBuffer::silence(0.001, 48000)),
            Err(PluckError::InvalidSampleRate { sample_rate: 48000 })
        ));
        assert_eq!(a.into_samples()[..3], [0.5, 0.5, 0.5]);
    }
}
