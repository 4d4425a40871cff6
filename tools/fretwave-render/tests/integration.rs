//! Runs the built renderer and inspects the WAV files it writes.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const BIN: &str = env!("CARGO_BIN_EXE_fretwave-render");

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fretwave-render-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn run(args: &[&str]) -> Output {
    let out = Command::new(BIN).args(args).output().expect("failed to launch renderer");
    assert!(
        out.status.success(),
        "renderer failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    out
}

/// (spec, samples scaled to [-1, 1])
fn read_wav(path: &Path) -> (hound::WavSpec, Vec<f64>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let scale = (1 << 23) as f64 - 1.0;
    let samples = reader.samples::<i32>().map(|s| s.unwrap() as f64 / scale).collect();
    (spec, samples)
}

#[test]
fn test_single_note_is_mono_24_bit() {
    let dir = scratch_dir("single");
    let path = dir.join("a2.wav");
    run(&["-f", "110", "-d", "0.5", "--seed", "1", "-q", "-o", path.to_str().unwrap()]);

    let (spec, samples) = read_wav(&path);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 24);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(samples.len(), 22050);
    let peak = samples.iter().map(|x| x.abs()).fold(0.0f64, f64::max);
    assert!(peak > 0.79 && peak <= 0.8 + 1e-6, "classic preset peaks at 0.8, got {peak}");
}

#[test]
fn test_note_names_batch_into_output_dir() {
    let dir = scratch_dir("batch");
    run(&[
        "-n", "E2,A2", "-v", "0.5,1.0", "-d", "0.2", "--seed", "2", "-q",
        "--output-dir", dir.to_str().unwrap(),
    ]);
    for name in ["pluck_E2_v050.wav", "pluck_E2_v100.wav", "pluck_A2_v050.wav", "pluck_A2_v100.wav"] {
        let (_, samples) = read_wav(&dir.join(name));
        assert_eq!(samples.len(), 8820, "{name}");
    }
}

#[test]
fn test_seed_makes_renders_repeatable() {
    let dir = scratch_dir("seed");
    let a = dir.join("a.wav");
    let b = dir.join("b.wav");
    for path in [&a, &b] {
        run(&["-n", "D3", "-d", "0.3", "--preset", "natural", "--seed", "77", "-q", "-o", path.to_str().unwrap()]);
    }
    assert_eq!(read_wav(&a).1, read_wav(&b).1);
}

#[test]
fn test_dumped_config_renders_like_its_preset() {
    let dir = scratch_dir("config");
    let dump = run(&["--preset", "bright", "--dump-config"]);
    let json_path = dir.join("bright.json");
    std::fs::write(&json_path, &dump.stdout).unwrap();

    let from_preset = dir.join("preset.wav");
    let from_file = dir.join("file.wav");
    run(&["-f", "196", "-d", "0.3", "--seed", "5", "-q", "--preset", "bright", "-o", from_preset.to_str().unwrap()]);
    run(&[
        "-f", "196", "-d", "0.3", "--seed", "5", "-q",
        "--config", json_path.to_str().unwrap(),
        "-o", from_file.to_str().unwrap(),
    ]);
    assert_eq!(read_wav(&from_preset).1, read_wav(&from_file).1);
}

#[test]
fn test_demo_sequence_length() {
    let dir = scratch_dir("sequence");
    let path = dir.join("demo.wav");
    run(&["--sequence", "--seed", "3", "-q", "-o", path.to_str().unwrap()]);
    let (_, samples) = read_wav(&path);
    // 4.9 s of notes and three 0.2 s gaps.
    assert_eq!(samples.len(), 216090 + 3 * 8820);
}

#[test]
fn test_midi_file_renders_in_order() {
    use midly::{Format, Header, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

    let ev = |delta: u32, key: u8, vel: u8| TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Midi { channel: 0.into(), message: MidiMessage::NoteOn { key: key.into(), vel: vel.into() } },
    };
    let mut smf = Smf::new(Header::new(Format::SingleTrack, Timing::Metrical(480.into())));
    // Two quarter notes at 120 BPM: 0.5 s each.
    smf.tracks.push(vec![ev(0, 40, 100), ev(480, 40, 0), ev(0, 45, 80), ev(480, 45, 0)]);

    let dir = scratch_dir("midi");
    let mid = dir.join("riff.mid");
    smf.save(&mid).unwrap();

    run(&["--midi", mid.to_str().unwrap(), "--gap", "0.1", "--seed", "4", "-q", "--output-dir", dir.to_str().unwrap()]);
    let (_, samples) = read_wav(&dir.join("riff.wav"));
    assert_eq!(samples.len(), 2 * 22050 + 4410);
}

#[test]
fn test_rejects_unknown_preset_and_bad_note() {
    let out = Command::new(BIN).args(["--preset", "banjo", "-q"]).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("banjo"));

    let out = Command::new(BIN).args(["-n", "H2", "-q"]).output().unwrap();
    assert!(!out.status.success());
}

#[test]
fn test_rejects_frequency_above_nyquist() {
    let dir = scratch_dir("nyquist");
    let out = Command::new(BIN)
        .args(["-f", "30000", "-q", "-o", dir.join("x.wav").to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Nyquist"));
}
