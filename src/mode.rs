//! Harmonic moods.
//!
//! `ModeChoice` is what the operator asks for; `Mode` is what the engine runs
//! with. `auto` is resolved once, right after analysis, so nothing past the
//! analyzer ever has to handle it.

use std::fmt;

use clap::ValueEnum;

use crate::analyzer::Analysis;
use crate::theory::Quality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModeChoice {
    /// Detect the mood from the source material
    #[default]
    Auto,
    /// Bright major, dominant and suspended colours
    Euphoric,
    /// Dark minor, minor-seventh and open-fifth colours
    #[value(name = "minor_fifth")]
    MinorFifth,
}

impl ModeChoice {
    pub fn resolve(self, analysis: &Analysis) -> Mode {
        match self {
            ModeChoice::Euphoric => Mode::Euphoric,
            ModeChoice::MinorFifth => Mode::MinorFifth,
            ModeChoice::Auto => detect_mode(analysis),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Euphoric,
    MinorFifth,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Euphoric => "euphoric",
            Mode::MinorFifth => "minor_fifth",
        }
    }

    /// Qualities a generated chord may use.
    pub fn palette(self) -> &'static [Quality] {
        match self {
            Mode::Euphoric => &[
                Quality::Major,
                Quality::Dominant7,
                Quality::Sus2,
                Quality::Sus4,
            ],
            Mode::MinorFifth => &[Quality::Minor, Quality::Minor7, Quality::Fifth],
        }
    }

    pub fn allows(self, quality: Quality) -> bool {
        self.palette().contains(&quality)
    }

    /// Reinterpret `quality` on the same root so it belongs to the palette.
    pub fn conform(self, quality: Quality) -> Quality {
        if self.allows(quality) {
            return quality;
        }
        match (self, quality) {
            (Mode::Euphoric, Quality::Minor) => Quality::Sus2,
            (Mode::Euphoric, Quality::Minor7) => Quality::Sus4,
            (Mode::Euphoric, _) => Quality::Major,
            (Mode::MinorFifth, Quality::Dominant7) => Quality::Minor7,
            (Mode::MinorFifth, Quality::Sus2) => Quality::Minor,
            (Mode::MinorFifth, _) => Quality::Fifth,
        }
    }

    /// Root motions (semitones) that count as a diatonic neighbour.
    pub fn adjacent_steps(self) -> &'static [i32] {
        match self {
            Mode::Euphoric => &[2, -2],
            Mode::MinorFifth => &[-2, 1],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn detect_mode(analysis: &Analysis) -> Mode {
    let mut minor_bars = 0u32;
    let mut major_bars = 0u32;
    for entry in analysis.base.entries() {
        let quality = entry.chord.quality();
        if quality.is_minor_family() {
            minor_bars += entry.bars;
        } else if quality.is_major_family() {
            major_bars += entry.bars;
        }
    }
    if minor_bars != major_bars {
        return if minor_bars > major_bars {
            Mode::MinorFifth
        } else {
            Mode::Euphoric
        };
    }

    // Tie: fall back to the thirds present in the whole source.
    let present: Vec<u8> = (0..12u8)
        .filter(|&pc| analysis.pitch_weights[pc as usize] > 0)
        .collect();
    let has = |pc: u8| present.contains(&(pc % 12));
    let major_thirds = present.iter().filter(|&&pc| has(pc + 4)).count();
    let minor_thirds = present.iter().filter(|&&pc| has(pc + 3)).count();
    if minor_thirds > major_thirds {
        Mode::MinorFifth
    } else {
        Mode::Euphoric
    }
}
