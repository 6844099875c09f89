//! Turns a progression into three synchronized layers on a 4/4 tick grid.
//!
//! - pads hold each chord for its whole span, always on the grid;
//! - stabs hit the off-beat eighth of every beat, delayed by the swing amount;
//! - plucks arpeggiate the chord on straight sixteenths.
//!
//! Every note is clipped to the end of the chord it belongs to.

use crate::analyzer::TempoSpec;
use crate::config::{tempo_in_range, BEATS_PER_BAR};
use crate::error::ArrangementError;
use crate::progression::ChordProgression;
use crate::theory::{Chord, Pitch, Register};

pub const MAX_SWING: f64 = 0.4;

const STAB_VELOCITY: u8 = 96;
const STAB_ACCENT_VELOCITY: u8 = 108;
const PLUCK_VELOCITY: u8 = 70;
const PLUCK_ACCENT_VELOCITY: u8 = 84;
const PAD_VELOCITY: u8 = 64;

/// Sixteenth steps per beat for the pluck arpeggio.
const PLUCK_STEPS_PER_BEAT: u32 = 4;

/// Fraction of an eighth note by which off-beats are delayed, in `[0.0, 0.4]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SwingAmount(f64);

impl SwingAmount {
    pub fn new(amount: f64) -> Result<Self, ArrangementError> {
        if (0.0..=MAX_SWING).contains(&amount) {
            Ok(SwingAmount(amount))
        } else {
            Err(ArrangementError::SwingOutOfRange { swing: amount })
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Delay in ticks for a subdivision of `subdivision` ticks.
    pub fn delay(self, subdivision: u32) -> u32 {
        (self.0 * subdivision as f64).round() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Stab,
    Pluck,
    Pad,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Stab, LayerKind::Pluck, LayerKind::Pad];

    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Stab => "House Stabs",
            LayerKind::Pluck => "Pluck Arp",
            LayerKind::Pad => "Airy Pad",
        }
    }

    /// General MIDI program.
    pub fn program(self) -> u8 {
        match self {
            LayerKind::Stab => 62,  // SynthBrass 1
            LayerKind::Pluck => 80, // Lead 1 (square)
            LayerKind::Pad => 89,   // Pad 2 (warm)
        }
    }

    pub fn channel(self) -> u8 {
        match self {
            LayerKind::Stab => 0,
            LayerKind::Pluck => 1,
            LayerKind::Pad => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub pitch: Pitch,
    pub start: u32,
    pub duration: u32,
    pub velocity: u8,
}

impl Note {
    pub fn end(&self) -> u32 {
        self.start + self.duration
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentLayer {
    pub kind: LayerKind,
    pub notes: Vec<Note>,
}

impl InstrumentLayer {
    fn new(kind: LayerKind) -> Self {
        InstrumentLayer {
            kind,
            notes: Vec::new(),
        }
    }

    /// Adds a note clipped to `limit`; drops it if nothing is left.
    fn push_clipped(&mut self, pitch: Pitch, start: u32, duration: u32, velocity: u8, limit: u32) {
        if start >= limit {
            return;
        }
        let duration = duration.min(limit - start);
        if duration > 0 {
            self.notes.push(Note {
                pitch,
                start,
                duration,
                velocity,
            });
        }
    }

    pub fn end_tick(&self) -> u32 {
        self.notes.iter().map(Note::end).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrangement {
    pub stab: InstrumentLayer,
    pub pluck: InstrumentLayer,
    pub pad: InstrumentLayer,
}

impl Arrangement {
    pub fn layers(&self) -> [&InstrumentLayer; 3] {
        [&self.stab, &self.pluck, &self.pad]
    }

    pub fn end_tick(&self) -> u32 {
        self.layers().iter().map(|l| l.end_tick()).max().unwrap_or(0)
    }
}

/// Tick lengths derived from one tempo resolution.
#[derive(Debug, Clone, Copy)]
struct Grid {
    beat: u32,
    bar: u32,
}

impl Grid {
    fn eighth(&self) -> u32 {
        (self.beat / 2).max(1)
    }

    /// Start of sixteenth `step` within a bar, without rounding drift.
    fn sixteenth_offset(&self, step: u32) -> u32 {
        step * self.beat / PLUCK_STEPS_PER_BEAT
    }
}

pub fn arrange(
    progression: &ChordProgression,
    tempo: &TempoSpec,
    swing: f64,
    bars: u32,
    register: &Register,
) -> Result<Arrangement, ArrangementError> {
    let swing = SwingAmount::new(swing)?;
    if tempo.ticks_per_beat == 0 {
        return Err(ArrangementError::InvalidResolution);
    }
    if !tempo_in_range(tempo.bpm) {
        return Err(ArrangementError::InvalidTempo { bpm: tempo.bpm });
    }
    if progression.total_bars() != bars {
        return Err(ArrangementError::BarMismatch {
            progression: progression.total_bars(),
            bars,
        });
    }

    let grid = Grid {
        beat: tempo.ticks_per_beat as u32,
        bar: tempo.ticks_per_bar(),
    };
    let mut arrangement = Arrangement {
        stab: InstrumentLayer::new(LayerKind::Stab),
        pluck: InstrumentLayer::new(LayerKind::Pluck),
        pad: InstrumentLayer::new(LayerKind::Pad),
    };

    for (chord, first_bar, length) in progression.spans() {
        let start = first_bar * grid.bar;
        let end = start + length * grid.bar;
        let voicing = chord.voicing(register);

        render_pad(&mut arrangement.pad, &voicing, start, end);
        for bar in 0..length {
            let bar_start = start + bar * grid.bar;
            render_stabs(&mut arrangement.stab, &voicing, bar_start, end, grid, swing);
            render_plucks(&mut arrangement.pluck, &chord, register, bar_start, end, grid);
        }
    }

    Ok(arrangement)
}

fn render_pad(layer: &mut InstrumentLayer, voicing: &[Pitch], start: u32, end: u32) {
    for &pitch in voicing {
        layer.push_clipped(pitch, start, end - start, PAD_VELOCITY, end);
    }
}

fn render_stabs(
    layer: &mut InstrumentLayer,
    voicing: &[Pitch],
    bar_start: u32,
    end: u32,
    grid: Grid,
    swing: SwingAmount,
) {
    let eighth = grid.eighth();
    let length = (eighth / 2).max(1);
    for beat in 0..BEATS_PER_BAR {
        let nominal = bar_start + beat * grid.beat + eighth;
        let start = nominal + swing.delay(eighth);
        // Backbeat "and"s (beats 2 and 4) push harder.
        let velocity = if beat % 2 == 1 {
            STAB_ACCENT_VELOCITY
        } else {
            STAB_VELOCITY
        };
        for &pitch in voicing {
            let pitch = pitch.transpose(12).unwrap_or(pitch);
            layer.push_clipped(pitch, start, length, velocity, end);
        }
    }
}

/// Root, chord tones upward, then the root an octave up, one octave above the pad.
fn arpeggio(chord: &Chord, register: &Register) -> Vec<Pitch> {
    let root = chord.with_inversion(0);
    let mut tones = root.voicing(register);
    if let Some(octave) = root.root().transpose(12) {
        if !tones.contains(&octave) {
            tones.push(octave);
        }
    }
    tones
        .into_iter()
        .map(|p| p.transpose(12).unwrap_or(p))
        .collect()
}

fn render_plucks(
    layer: &mut InstrumentLayer,
    chord: &Chord,
    register: &Register,
    bar_start: u32,
    end: u32,
    grid: Grid,
) {
    let tones = arpeggio(chord, register);
    if tones.is_empty() {
        return;
    }
    let steps = BEATS_PER_BAR * PLUCK_STEPS_PER_BEAT;
    for step in 0..steps {
        let start = bar_start + grid.sixteenth_offset(step);
        let next = bar_start + grid.sixteenth_offset(step + 1);
        let length = ((next - start) * 3 / 4).max(1);
        let velocity = if step % PLUCK_STEPS_PER_BEAT == 0 {
            PLUCK_ACCENT_VELOCITY
        } else {
            PLUCK_VELOCITY
        };
        let pitch = tones[step as usize % tones.len()];
        layer.push_clipped(pitch, start, length, velocity, end);
    }
}
