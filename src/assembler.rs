//! Final assembly of the loop and its operator-facing summary.

use std::fmt;

use crate::analyzer::{TempoSource, TempoSpec};
use crate::arrangement::{Arrangement, InstrumentLayer};
use crate::mode::Mode;
use crate::progression::ChordProgression;

/// The finished loop. Owns its progression and layers; the only thing handed to the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseLoop {
    tempo: TempoSpec,
    tempo_source: TempoSource,
    mode: Mode,
    progression: ChordProgression,
    bars: u32,
    arrangement: Arrangement,
    seed: u64,
}

pub fn assemble(
    tempo: TempoSpec,
    tempo_source: TempoSource,
    mode: Mode,
    progression: ChordProgression,
    bars: u32,
    arrangement: Arrangement,
    seed: u64,
) -> HouseLoop {
    HouseLoop {
        tempo,
        tempo_source,
        mode,
        progression,
        bars,
        arrangement,
        seed,
    }
}

impl HouseLoop {
    pub fn tempo(&self) -> TempoSpec {
        self.tempo
    }

    pub fn tempo_source(&self) -> TempoSource {
        self.tempo_source
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn progression(&self) -> &ChordProgression {
        &self.progression
    }

    pub fn bars(&self) -> u32 {
        self.bars
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Stab, pluck and pad, in that order.
    pub fn layers(&self) -> [&InstrumentLayer; 3] {
        self.arrangement.layers()
    }

    pub fn total_ticks(&self) -> u32 {
        self.bars * self.tempo.ticks_per_bar()
    }

    pub fn summary(&self) -> LoopSummary {
        LoopSummary {
            bpm: self.tempo.bpm,
            tempo_source: self.tempo_source,
            mode: self.mode,
            bars: self.bars,
            seed: self.seed,
            chords: self.progression.symbols(),
        }
    }
}

/// Operator-facing description of a loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSummary {
    pub bpm: f64,
    pub tempo_source: TempoSource,
    pub mode: Mode,
    pub bars: u32,
    pub seed: u64,
    pub chords: Vec<String>,
}

impl fmt::Display for LoopSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Generated loop info:")?;
        writeln!(f, "  Tempo: {:.2} BPM ({})", self.bpm, self.tempo_source)?;
        writeln!(f, "  Mode: {}", self.mode)?;
        writeln!(f, "  Bars: {}", self.bars)?;
        writeln!(f, "  Seed: {}", self.seed)?;
        write!(f, "  Progression: {}", self.chords.join(" - "))
    }
}
