//! Fretwave Render: plucked-guitar synthesis to WAV.
//!
//! Renders single notes (by frequency or name), the built-in demo phrase,
//! or a monophonic MIDI file, with any preset or a JSON voicing file.

mod midi;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use fretwave_dsp::random;
use fretwave_dsp::sequence::demo_sequence;
use fretwave_dsp::tables;
use fretwave_dsp::{AudioBuffer, PluckConfig, PluckRequest, Sequence, Voice};
use tracing::{Level, info, warn};

#[derive(Parser, Debug)]
#[command(name = "fretwave-render")]
#[command(about = "Render Karplus-Strong guitar plucks to WAV")]
#[command(version)]
struct Cli {
    /// Fundamental frequency in Hz (comma-separated for a batch)
    #[arg(short = 'f', long, value_delimiter = ',')]
    frequency: Vec<f64>,

    /// Note name such as E2, Bb1 or F#3 (comma-separated for a batch)
    #[arg(short = 'n', long, value_delimiter = ',')]
    note: Vec<String>,

    /// Pick velocity, 0-1 (comma-separated for a batch)
    #[arg(short = 'v', long, value_delimiter = ',', default_value = "0.8")]
    velocity: Vec<f64>,

    /// Note duration in seconds
    #[arg(short = 'd', long, default_value_t = 2.0)]
    duration: f64,

    /// Palm-muted plucks
    #[arg(long)]
    palm_mute: bool,

    /// Random seed; drawn from system entropy when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Voicing preset: basic, classic, bright, natural
    #[arg(long, default_value = "classic")]
    preset: String,

    /// JSON voicing file (overrides --preset)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the selected voicing as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Output sample rate in Hz
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Output WAV file (single note, sequence or MIDI render)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output directory for batch renders
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Render the built-in demo phrase
    #[arg(long, conflicts_with_all = ["frequency", "note", "midi"])]
    sequence: bool,

    /// Render the notes of a Standard MIDI File in order
    #[arg(long, conflicts_with_all = ["frequency", "note"])]
    midi: Option<PathBuf>,

    /// Silence between MIDI notes, in seconds
    #[arg(long, default_value_t = 0.2)]
    gap: f64,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log per-stage render details
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::WARN
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = load_config(&cli)?;
    if cli.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let voice = Voice::new(config, cli.sample_rate)?;
    let seed = cli.seed.unwrap_or_else(random::entropy_seed);
    info!(seed, sample_rate = cli.sample_rate, "voice ready");

    if cli.sequence {
        let path = single_output(&cli, "demo_sequence.wav");
        return render_sequence(&voice, &demo_sequence(), seed, &path);
    }
    if let Some(midi_path) = &cli.midi {
        let seq = midi::load_sequence(midi_path, cli.gap, cli.palm_mute)?;
        let stem = midi_path.file_stem().and_then(|s| s.to_str()).unwrap_or("midi");
        let path = single_output(&cli, &format!("{stem}.wav"));
        return render_sequence(&voice, &seq, seed, &path);
    }

    render_notes(&cli, &voice, seed)
}

fn load_config(cli: &Cli) -> Result<PluckConfig> {
    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => match PluckConfig::preset(&cli.preset) {
            Some(c) => c,
            None => bail!(
                "unknown preset `{}` (expected one of: {})",
                cli.preset,
                PluckConfig::PRESET_NAMES.join(", ")
            ),
        },
    };
    Ok(config)
}

/// (label, frequency) for every requested note; A2 when none were given.
fn requested_notes(cli: &Cli) -> Result<Vec<(String, f64)>> {
    let mut notes: Vec<(String, f64)> = cli.frequency.iter().map(|&f| (format!("{f}Hz"), f)).collect();
    for name in &cli.note {
        let Some(midi) = tables::note_to_midi(name) else {
            bail!("cannot parse note name `{name}`");
        };
        notes.push((tables::midi_note_name(midi), tables::midi_to_freq(midi)));
    }
    if notes.is_empty() {
        notes.push(("A2".to_string(), 110.0));
    }
    Ok(notes)
}

fn render_notes(cli: &Cli, voice: &Voice, seed: u64) -> Result<()> {
    let notes = requested_notes(cli)?;
    let batch = notes.len() * cli.velocity.len() > 1;

    for (label, freq) in &notes {
        for &vel in &cli.velocity {
            let mute = if cli.palm_mute { "_pm" } else { "" };
            let default_name = format!("pluck_{label}_v{:03}{mute}.wav", (vel * 100.0).round() as i64);
            let path = match (&cli.output, batch) {
                (Some(p), false) => p.clone(),
                _ => cli.output_dir.join(default_name),
            };

            info!(note = %label, frequency_hz = freq, velocity = vel, duration = cli.duration, "rendering");
            let req = PluckRequest::new(*freq, cli.duration, vel, cli.palm_mute);
            let note = voice.render(&req, &mut random::seeded(seed))?;
            if note.is_degenerate() {
                warn!(note = %label, "rendered silence");
            }

            log_level(&note.buffer);
            write_wav(&path, &note.buffer)?;
            info!(path = %path.display(), "written");
        }
    }
    Ok(())
}

fn render_sequence(voice: &Voice, seq: &Sequence, seed: u64, path: &Path) -> Result<()> {
    info!(notes = seq.len(), gap_secs = seq.gap_secs(), "rendering sequence");
    let buffer = seq.render_parallel(voice, seed)?;
    log_level(&buffer);
    write_wav(path, &buffer)?;
    info!(path = %path.display(), duration_secs = buffer.duration_secs(), "written");
    Ok(())
}

fn single_output(cli: &Cli, default_name: &str) -> PathBuf {
    cli.output.clone().unwrap_or_else(|| cli.output_dir.join(default_name))
}

fn log_level(buffer: &AudioBuffer) {
    let peak = buffer.peak();
    info!("peak amplitude {peak:.6} ({:.1} dBFS)", 20.0 * peak.log10());
}

/// Mono 24-bit PCM, clamped to [-1, 1].
fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 24,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    let scale = (1 << 23) as f64 - 1.0;
    for &s in buffer.samples() {
        writer.write_sample((s.clamp(-1.0, 1.0) * scale) as i32)?;
    }
    writer.finalize()?;
    Ok(())
}
