//! Standard MIDI File input: every note becomes one pluck, played in start
//! order. Overlapping notes are not mixed; each renders to its full length.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use fretwave_dsp::tables;
use fretwave_dsp::{PluckRequest, Sequence};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::{debug, info};

/// Default tempo of a MIDI file with no tempo event (120 BPM).
const DEFAULT_TEMPO_US: u32 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiNote {
    pub key: u8,
    pub velocity: u8,
    pub start_secs: f64,
    pub duration_secs: f64,
}

impl MidiNote {
    pub fn to_request(self, palm_mute: bool) -> PluckRequest {
        PluckRequest::new(
            tables::midi_to_freq(self.key),
            self.duration_secs,
            self.velocity as f64 / 127.0,
            palm_mute,
        )
    }
}

pub fn load_sequence(path: &Path, gap_secs: f64, palm_mute: bool) -> Result<Sequence> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let smf = Smf::parse(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    let notes = extract_notes(&smf);
    if notes.is_empty() {
        bail!("{} contains no notes", path.display());
    }
    info!(notes = notes.len(), file = %path.display(), "loaded MIDI notes");

    let mut seq = Sequence::new(gap_secs);
    for note in notes {
        seq.push(note.to_request(palm_mute));
    }
    Ok(seq)
}

/// Notes from every track, sorted by start time. Notes still held at the
/// end of the file are dropped.
pub fn extract_notes(smf: &Smf) -> Vec<MidiNote> {
    // (absolute tick, kind) across all tracks, in file order within a tick.
    let mut events: Vec<(u64, TrackEventKind)> = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u64;
        for ev in track {
            tick += ev.delta.as_int() as u64;
            events.push((tick, ev.kind));
        }
    }
    events.sort_by_key(|(tick, _)| *tick);

    let mut tempo_us = DEFAULT_TEMPO_US;
    let mut last_tick = 0u64;
    let mut now = 0.0f64;
    let mut held: HashMap<u8, (f64, u8)> = HashMap::new();
    let mut notes = Vec::new();

    for (tick, kind) in events {
        now += (tick - last_tick) as f64 * seconds_per_tick(smf.header.timing, tempo_us);
        last_tick = tick;

        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(t)) => tempo_us = t.as_int(),
            TrackEventKind::Midi { message, .. } => match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    let key = key.as_int();
                    // Retrigger closes the previous note on the same key.
                    if let Some((start, velocity)) = held.insert(key, (now, vel.as_int())) {
                        push_note(&mut notes, key, velocity, start, now);
                    }
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    let key = key.as_int();
                    if let Some((start, velocity)) = held.remove(&key) {
                        push_note(&mut notes, key, velocity, start, now);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    if !held.is_empty() {
        debug!(held = held.len(), "notes without note-off dropped");
    }
    notes.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));
    notes
}

fn push_note(notes: &mut Vec<MidiNote>, key: u8, velocity: u8, start: f64, end: f64) {
    if end > start {
        notes.push(MidiNote { key, velocity, start_secs: start, duration_secs: end - start });
    }
}

fn seconds_per_tick(timing: Timing, tempo_us: u32) -> f64 {
    match timing {
        Timing::Metrical(ppq) => tempo_us as f64 / 1e6 / ppq.as_int().max(1) as f64,
        Timing::Timecode(fps, subframe) => 1.0 / (fps.as_f32() as f64 * subframe.max(1) as f64),
    }
}
