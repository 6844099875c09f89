//! Source analysis: tempo, register and a base chord progression.
//!
//! Works on `SourceEvents`, the decoded form produced by [`crate::midi`].
//! The source timeline is cut into one window per 4/4 bar (measured in source
//! ticks) and each window is matched against every chord quality.

use std::cmp::Reverse;
use std::fmt;

use log::{debug, info, warn};

use crate::config::{EngineConfig, LoopOptions, BEATS_PER_BAR};
use crate::error::AnalysisError;
use crate::progression::ChordProgression;
use crate::theory::{Chord, Pitch, Quality, Register};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceNote {
    pub pitch: Pitch,
    pub start: u32,
    pub end: u32,
    pub velocity: u8,
    pub channel: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoEvent {
    pub tick: u32,
    pub micros_per_beat: u32,
}

/// Decoded source file: every note with absolute tick bounds, plus tempo events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceEvents {
    pub ticks_per_beat: u16,
    pub notes: Vec<SourceNote>,
    pub tempos: Vec<TempoEvent>,
}

impl SourceEvents {
    pub fn new(ticks_per_beat: u16) -> Self {
        SourceEvents {
            ticks_per_beat,
            ..SourceEvents::default()
        }
    }

    pub fn end_tick(&self) -> u32 {
        self.notes.iter().map(|n| n.end).max().unwrap_or(0)
    }

    /// The last tempo event in time, in BPM.
    pub fn last_tempo(&self) -> Option<f64> {
        let mut tempos: Vec<&TempoEvent> =
            self.tempos.iter().filter(|t| t.micros_per_beat > 0).collect();
        tempos.sort_by_key(|t| t.tick);
        tempos
            .last()
            .map(|t| 60_000_000.0 / t.micros_per_beat as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoSpec {
    pub bpm: f64,
    pub ticks_per_beat: u16,
}

impl TempoSpec {
    pub fn new(bpm: f64, ticks_per_beat: u16) -> Self {
        TempoSpec { bpm, ticks_per_beat }
    }

    pub fn ticks_per_bar(&self) -> u32 {
        self.ticks_per_beat as u32 * BEATS_PER_BAR
    }

    /// MIDI set-tempo value, clamped to what 24 bits can hold.
    pub fn micros_per_beat(&self) -> u32 {
        let micros = (60_000_000.0 / self.bpm.max(f64::MIN_POSITIVE)).round();
        micros.clamp(1.0, 0xFF_FFFF as f64) as u32
    }
}

/// Where the loop tempo came from. Shown in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoSource {
    Source,
    Default,
    Override,
}

impl fmt::Display for TempoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TempoSource::Source => "from source",
            TempoSource::Default => "default",
            TempoSource::Override => "override",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub tempo: TempoSpec,
    pub tempo_source: TempoSource,
    pub register: Register,
    pub base: ChordProgression,
    pub source_bars: u32,
    /// Sounding ticks per pitch class over the whole source.
    pub pitch_weights: [u64; 12],
}

pub fn analyze(
    source: &SourceEvents,
    options: &LoopOptions,
    config: &EngineConfig,
) -> Result<Analysis, AnalysisError> {
    if source.notes.is_empty() {
        return Err(AnalysisError::NoNotes);
    }
    let source_bar_ticks = source.ticks_per_beat as u32 * BEATS_PER_BAR;
    let end = source.end_tick();
    if end == 0 || source_bar_ticks == 0 {
        return Err(AnalysisError::ZeroLength);
    }

    let (bpm, tempo_source) = resolve_tempo(source, options, config)?;
    let tempo = TempoSpec::new(bpm, config.ticks_per_beat);
    let register = estimate_register(&source.notes, options, config);

    let source_bars = end.div_ceil(source_bar_ticks);
    let mut matched: Vec<Option<Chord>> = Vec::with_capacity(source_bars as usize);
    for bar in 0..source_bars {
        let start = bar * source_bar_ticks;
        let window = Window::collect(&source.notes, start, start + source_bar_ticks);
        let chord = window.best_chord(&register);
        if let Some(chord) = chord {
            debug!("source bar {}: {}", bar + 1, chord);
        }
        matched.push(chord);
    }
    let bars = fill_gaps(&matched);
    let base = ChordProgression::from_bars(&bars).ok_or(AnalysisError::NoNotes)?;

    let whole = Window::collect(&source.notes, 0, end);
    info!(
        "analyzed {} source bars at {:.2} BPM ({}), register floor {}: {}",
        source_bars,
        bpm,
        tempo_source,
        register.floor(),
        base.symbols().join(" - ")
    );

    Ok(Analysis {
        tempo,
        tempo_source,
        register,
        base,
        source_bars,
        pitch_weights: whole.weights,
    })
}

fn resolve_tempo(
    source: &SourceEvents,
    options: &LoopOptions,
    config: &EngineConfig,
) -> Result<(f64, TempoSource), AnalysisError> {
    if let Some(bpm) = options.tempo {
        return Ok((bpm, TempoSource::Override));
    }
    if let Some(bpm) = source.last_tempo() {
        return Ok((bpm, TempoSource::Source));
    }
    match config.default_tempo {
        Some(bpm) => {
            warn!("source has no tempo event, using default {bpm:.2} BPM");
            Ok((bpm, TempoSource::Default))
        }
        None => Err(AnalysisError::NoTempo),
    }
}

fn estimate_register(notes: &[SourceNote], options: &LoopOptions, config: &EngineConfig) -> Register {
    let mut pitches: Vec<Pitch> = notes.iter().map(|n| n.pitch).collect();
    pitches.sort_unstable();
    let lowest = pitches[0];
    let highest = pitches[pitches.len() - 1];
    let median = pitches[pitches.len() / 2];
    let floor = config.clamp_floor(options.register.unwrap_or(median));
    Register::new(floor, lowest, highest)
}

/// Empty windows repeat the chord before them; leading empty windows take the first match.
fn fill_gaps(matched: &[Option<Chord>]) -> Vec<Chord> {
    let Some(first) = matched.iter().flatten().next().copied() else {
        return Vec::new();
    };
    let mut previous = first;
    matched
        .iter()
        .map(|chord| {
            if let Some(chord) = chord {
                previous = *chord;
            }
            previous
        })
        .collect()
}

struct Window {
    weights: [u64; 12],
    bass: Option<u8>,
}

impl Window {
    fn collect(notes: &[SourceNote], start: u32, end: u32) -> Self {
        let mut weights = [0u64; 12];
        let mut lowest: Option<Pitch> = None;
        for note in notes {
            let overlap_start = note.start.max(start);
            let overlap_end = note.end.min(end);
            if overlap_end <= overlap_start {
                continue;
            }
            weights[note.pitch.class() as usize] += (overlap_end - overlap_start) as u64;
            if lowest.map_or(true, |low| note.pitch < low) {
                lowest = Some(note.pitch);
            }
        }
        Window {
            weights,
            bass: lowest.map(Pitch::class),
        }
    }

    fn present(&self) -> Vec<u8> {
        (0..12u8).filter(|&pc| self.weights[pc as usize] > 0).collect()
    }

    fn heaviest(&self) -> Option<u8> {
        (0..12u8)
            .filter(|&pc| self.weights[pc as usize] > 0)
            .max_by_key(|&pc| (self.weights[pc as usize], Reverse(pc)))
    }

    /// Highest-scoring (root, quality); ties go to the simpler quality, then the lower root.
    fn best_chord(&self, register: &Register) -> Option<Chord> {
        let present = self.present();
        let heaviest = self.heaviest();
        let mut best: Option<((i32, Reverse<usize>, Reverse<u8>), Chord)> = None;

        for &root in &present {
            for quality in Quality::ALL {
                let template: Vec<u8> = quality.classes().iter().map(|iv| (root + iv) % 12).collect();
                let matched = template.iter().filter(|pc| present.contains(pc)).count() as i32;
                let missing = template.len() as i32 - matched;
                let extra = present.len() as i32 - matched;
                let mut score = 3 * matched - 2 * missing - extra;
                if self.bass == Some(root) {
                    score += 1;
                }
                if heaviest == Some(root) {
                    score += 1;
                }

                let key = (score, Reverse(quality.rank()), Reverse(root));
                if best.as_ref().map_or(true, |(best_key, _)| key > *best_key) {
                    best = Some((key, Chord::in_register(root, quality, register)));
                }
            }
        }
        best.map(|(_, chord)| chord)
    }
}
