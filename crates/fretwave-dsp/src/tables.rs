/// Default enrichment tables and pitch helpers.
///
/// The amplitudes and frequencies here were tuned by ear against recordings
/// of a DI'd electric guitar. They seed the presets in `config` and are not
/// physical constants; every value can be overridden through `PluckConfig`.

/// Standard tuning, low to high (E2 A2 D3 G3 B3 E4).
pub const STANDARD_TUNING_HZ: [f64; 6] = [82.41, 110.0, 146.83, 196.0, 246.94, 329.63];

/// Overtone table for the `natural` preset: (harmonic index, amplitude).
/// Even harmonics 2 and 4 are prominent in the measured spectrum.
pub const NATURAL_OVERTONES: [(u32, f64); 7] = [
    (2, 0.08),
    (3, 0.04),
    (4, 0.06),
    (5, 0.03),
    (6, 0.02),
    (8, 0.015),
    (12, 0.01),
];

/// Harmonic indices used by the `bright` preset (amplitude 0.035 / n^1.2).
pub const BRIGHT_OVERTONE_INDICES: [u32; 4] = [2, 3, 4, 5];

/// Guitar body resonances (Hz) for the band-pass filter bank.
pub const BODY_RESONANCES_HZ: [f64; 4] = [85.0, 150.0, 200.0, 250.0];

/// Low formants (Hz) added as decaying sines, weighted by distance to the fundamental.
pub const LOW_FORMANTS: [(f64, f64); 4] = [(100.0, 0.05), (160.0, 0.05), (250.0, 0.05), (350.0, 0.05)];

/// Spectral peaks (Hz, amplitude) observed in the reference recording that a
/// bare waveguide does not produce.
pub const SPECTRAL_FORMANTS: [(f64, f64); 10] = [
    (689.0, 0.02),
    (861.0, 0.015),
    (1034.0, 0.012),
    (1378.0, 0.008),
    (2068.0, 0.006),
    (2584.0, 0.008),
    (2928.0, 0.010),
    (3617.0, 0.012),
    (4134.0, 0.015),
    (4306.0, 0.018),
];

/// MIDI note number to fundamental frequency (Hz), A440 tuning.
pub fn midi_to_freq(midi: u8) -> f64 {
    440.0 * f64::powf(2.0, (midi as f64 - 69.0) / 12.0)
}

/// Parse a note name such as `E2`, `Bb1`, `F#3` or `Cs4` to a MIDI number.
pub fn note_to_midi(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars().peekable();
    let letter = chars.next()?.to_ascii_uppercase();
    let mut pc: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    match chars.peek() {
        Some('#') | Some('s') => {
            pc += 1;
            chars.next();
        }
        Some('b') => {
            pc -= 1;
            chars.next();
        }
        _ => {}
    }
    let octave: i32 = chars.collect::<String>().parse().ok()?;
    let midi = (octave + 1) * 12 + pc;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

/// Note name with `s` for sharps (file-name friendly), e.g. `As1`.
pub fn midi_note_name(midi: u8) -> String {
    let names = ["C", "Cs", "D", "Ds", "E", "F", "Fs", "G", "Gs", "A", "As", "B"];
    let octave = (midi / 12) as i32 - 1;
    let note = (midi % 12) as usize;
    format!("{}{}", names[note], octave)
}
