//! Final level stage: scale to a target peak, lift positive half-waves,
//! then hard-clip.

use crate::config::NormalizeConfig;

/// Normalize `buffer` in place. Returns the gain applied, or `None` when the
/// buffer is silent (or holds no finite peak) and was left untouched.
pub fn normalize(config: &NormalizeConfig, buffer: &mut [f64]) -> Option<f64> {
    let peak = buffer.iter().map(|x| x.abs()).fold(0.0f64, f64::max);
    if peak == 0.0 || !peak.is_finite() {
        return None;
    }

    let gain = config.target_peak / peak;
    for s in buffer.iter_mut() {
        let mut x = *s * gain;
        if x > 0.0 {
            x *= config.positive_asymmetry;
        }
        if let Some(c) = config.clip {
            x = x.clamp(-c, c);
        }
        *s = x;
    }
    Some(gain)
}
