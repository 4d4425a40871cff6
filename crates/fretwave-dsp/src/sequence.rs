//! Notes rendered one after another with silence between them.
//!
//! Note `i` always draws from `seeded_stream(seed, i)`, so a note's samples
//! do not depend on which thread rendered it or in what order.

use std::thread;

use tracing::debug;

use crate::buffer::AudioBuffer;
use crate::error::PluckError;
use crate::random;
use crate::voice::{PluckRequest, RenderedNote, Voice};

#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    notes: Vec<PluckRequest>,
    gap_secs: f64,
}

impl Sequence {
    pub fn new(gap_secs: f64) -> Self {
        Self { notes: Vec::new(), gap_secs }
    }

    pub fn push(&mut self, note: PluckRequest) {
        self.notes.push(note);
    }

    pub fn with(mut self, note: PluckRequest) -> Self {
        self.push(note);
        self
    }

    pub fn gap_secs(&self) -> f64 {
        self.gap_secs
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Render every note on the calling thread.
    pub fn render(&self, voice: &Voice, seed: u64) -> Result<AudioBuffer, PluckError> {
        let rendered = self
            .notes
            .iter()
            .enumerate()
            .map(|(i, note)| render_note(voice, note, seed, i))
            .collect::<Result<Vec<_>, _>>()?;
        self.assemble(voice.sample_rate(), rendered)
    }

    /// Render notes on scoped worker threads. Same output as `render`.
    pub fn render_parallel(&self, voice: &Voice, seed: u64) -> Result<AudioBuffer, PluckError> {
        let workers = thread::available_parallelism().map_or(1, |n| n.get()).min(self.notes.len()).max(1);
        let chunk = self.notes.len().div_ceil(workers).max(1);
        debug!(notes = self.notes.len(), workers, "rendering sequence in parallel");

        let per_chunk: Vec<Result<Vec<RenderedNote>, PluckError>> = thread::scope(|s| {
            let handles: Vec<_> = self
                .notes
                .chunks(chunk)
                .enumerate()
                .map(|(c, notes)| {
                    s.spawn(move || {
                        notes
                            .iter()
                            .enumerate()
                            .map(|(j, note)| render_note(voice, note, seed, c * chunk + j))
                            .collect::<Result<Vec<_>, _>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        let mut rendered = Vec::with_capacity(self.notes.len());
        for notes in per_chunk {
            rendered.extend(notes?);
        }
        self.assemble(voice.sample_rate(), rendered)
    }

    fn assemble(&self, sample_rate: u32, rendered: Vec<RenderedNote>) -> Result<AudioBuffer, PluckError> {
        let gap = AudioBuffer::silence(self.gap_secs, sample_rate);
        let mut out = AudioBuffer::new(Vec::new(), sample_rate);
        for (i, note) in rendered.iter().enumerate() {
            if i > 0 {
                out.append(&gap)?;
            }
            out.append(&note.buffer)?;
        }
        Ok(out)
    }
}

fn render_note(voice: &Voice, note: &PluckRequest, seed: u64, index: usize) -> Result<RenderedNote, PluckError> {
    let mut rng = random::seeded_stream(seed, index as u64);
    voice.render(note, &mut rng)
}

/// Short phrase on the low strings: a soft and a hard E2, a palm-muted A2
/// and a quiet, long D3.
pub fn demo_sequence() -> Sequence {
    Sequence::new(0.2)
        .with(PluckRequest::new(82.41, 0.4, 0.3, false))
        .with(PluckRequest::new(82.41, 1.0, 0.8, false))
        .with(PluckRequest::new(110.0, 1.5, 0.6, true))
        .with(PluckRequest::new(146.83, 2.0, 0.1, false))
}
