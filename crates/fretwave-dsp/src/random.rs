//! Explicit random source threaded through every stage of a pluck.
//!
//! A single generator is passed excitation -> modulation -> enrichment -> DI,
//! so a fixed seed reproduces a note bit for bit. Separate notes take
//! separate PCG streams so they can render on separate threads.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

pub type NoiseRng = Pcg32;

/// Generator for a fixed seed.
pub fn seeded(seed: u64) -> NoiseRng {
    Pcg32::seed_from_u64(seed)
}

/// Independent stream `stream` derived from `seed`.
///
/// Streams of the same seed never overlap, which lets a sequence give each
/// note its own generator without the notes depending on render order.
pub fn seeded_stream(seed: u64, stream: u64) -> NoiseRng {
    let state = seeded(seed).random::<u64>();
    Pcg32::new(state, stream)
}

/// Generator seeded from the thread-local entropy source.
pub fn from_entropy() -> NoiseRng {
    Pcg32::from_rng(&mut rand::rng())
}

/// Fresh seed from the thread-local entropy source, for callers that want
/// to log or reuse the seed they rendered with.
pub fn entropy_seed() -> u64 {
    rand::random()
}

/// Uniform sample in [-1, 1).
#[inline]
pub fn bipolar(rng: &mut NoiseRng) -> f64 {
    rng.random::<f64>() * 2.0 - 1.0
}

/// Uniform sample in [lo, hi). Returns `lo` when the range is empty.
#[inline]
pub fn uniform(rng: &mut NoiseRng, lo: f64, hi: f64) -> f64 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}
