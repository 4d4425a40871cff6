//! Fixed-length circular buffer for the string loop.
//!
//! The buffer is sized once from `round(sample_rate / f0)` and never resized.
//! A single cursor marks the read/write position; every index is taken
//! modulo the length, so the only bounds check is at construction.

use crate::error::{MAX_DELAY_LENGTH, MIN_DELAY_LENGTH, PluckError};

/// Delay-line length for a fundamental: `round(sample_rate / frequency_hz)`.
pub fn delay_length(sample_rate: f64, frequency_hz: f64) -> usize {
    (sample_rate / frequency_hz).round() as usize
}

/// `delay_length`, bounded by `MAX_DELAY_LENGTH` before the cast.
pub fn checked_delay_length(sample_rate: f64, frequency_hz: f64) -> Result<usize, PluckError> {
    let exact = (sample_rate / frequency_hz).round();
    if exact > MAX_DELAY_LENGTH as f64 {
        return Err(PluckError::DelayLineTooLong { frequency_hz, maximum: MAX_DELAY_LENGTH });
    }
    Ok(exact as usize)
}

#[derive(Debug, Clone)]
pub struct DelayLine {
    cells: Box<[f64]>,
    cursor: usize,
}

impl DelayLine {
    /// Zeroed line of `length` cells.
    pub fn new(length: usize) -> Result<Self, PluckError> {
        if length < MIN_DELAY_LENGTH {
            return Err(PluckError::DelayLineTooShort { length, minimum: MIN_DELAY_LENGTH });
        }
        Ok(Self {
            cells: vec![0.0; length].into_boxed_slice(),
            cursor: 0,
        })
    }

    /// Line loaded with an excitation burst. Samples past `length` are
    /// dropped; cells the burst does not reach stay zero.
    pub fn with_excitation(length: usize, excitation: &[f64]) -> Result<Self, PluckError> {
        let mut line = Self::new(length)?;
        let n = excitation.len().min(length);
        line.cells[..n].copy_from_slice(&excitation[..n]);
        Ok(line)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Sample under the cursor.
    #[inline]
    pub fn current(&self) -> f64 {
        self.cells[self.cursor]
    }

    /// Sample one slot ahead of the cursor.
    #[inline]
    pub fn next(&self) -> f64 {
        self.cells[(self.cursor + 1) % self.cells.len()]
    }

    /// Overwrite the sample under the cursor.
    #[inline]
    pub fn write(&mut self, value: f64) {
        self.cells[self.cursor] = value;
    }

    /// Move the cursor `step` slots forward (0 holds it in place).
    #[inline]
    pub fn advance(&mut self, step: usize) {
        self.cursor = (self.cursor + step) % self.cells.len();
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// Sum of squares over the whole line.
    pub fn energy(&self) -> f64 {
        self.cells.iter().map(|x| x * x).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_rounds() {
        assert_eq!(delay_length(44100.0, 110.0), 401);
        assert_eq!(delay_length(44100.0, 82.41), 535);
        assert_eq!(delay_length(44100.0, 440.0), 100);
        assert_eq!(delay_length(48000.0, 58.27), 824);
    }

    #[test]
    fn test_checked_length_bounds_tiny_fundamentals() {
        assert_eq!(checked_delay_length(44100.0, 110.0), Ok(401));
        assert_eq!(checked_delay_length(44100.0, 44100.0 / MAX_DELAY_LENGTH as f64), Ok(MAX_DELAY_LENGTH));
        for f in [1e-3, 1e-300, f64::MIN_POSITIVE] {
            assert!(
                matches!(checked_delay_length(44100.0, f), Err(PluckError::DelayLineTooLong { .. })),
                "{f} Hz"
            );
        }
    }

    #[test]
    fn test_rejects_short_lines() {
        assert!(matches!(
            DelayLine::new(1),
            Err(PluckError::DelayLineTooShort { length: 1, minimum: 2 })
        ));
        assert!(DelayLine::new(0).is_err());
        assert!(DelayLine::new(2).is_ok());
    }

    #[test]
    fn test_excitation_truncated_and_padded() {
        let line = DelayLine::with_excitation(4, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(line.cells(), &[1.0, 2.0, 3.0, 4.0]);

        let line = DelayLine::with_excitation(5, &[1.0, 2.0]).unwrap();
        assert_eq!(line.cells(), &[1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cursor_wraps() {
        let mut line = DelayLine::with_excitation(3, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!((line.current(), line.next()), (1.0, 2.0));
        line.advance(2);
        assert_eq!((line.current(), line.next()), (3.0, 1.0));
        line.advance(1);
        assert_eq!(line.cursor(), 0);
        line.advance(0);
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn test_write_then_read() {
        let mut line = DelayLine::new(4).unwrap();
        line.write(0.5);
        line.advance(4);
        assert_eq!(line.current(), 0.5);
        assert_eq!(line.energy(), 0.25);
    }
}
