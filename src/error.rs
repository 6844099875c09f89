//! Error taxonomy for the loop engine.
//!
//! Each pipeline stage owns its error enum; `LoopError` wraps them together
//! with the codec and I/O failures and maps every kind to an exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LoopError>;

/// The source material cannot be analyzed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("source contains no note events")]
    NoNotes,

    #[error("source has zero length; cannot infer its bar count")]
    ZeroLength,

    #[error("source has no tempo event and no default tempo is configured")]
    NoTempo,
}

/// A progression cannot be generated from the given inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("bar count must be positive, got {bars}")]
    InvalidBars { bars: u32 },

    #[error("base progression is empty")]
    EmptyBase,
}

/// The progression cannot be arranged into layers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrangementError {
    #[error("swing {swing} is outside [0.0, 0.4]")]
    SwingOutOfRange { swing: f64 },

    #[error("tempo resolution must be positive ticks per beat")]
    InvalidResolution,

    #[error("tempo {bpm} BPM cannot be stored in a MIDI tempo event")]
    InvalidTempo { bpm: f64 },

    #[error("progression spans {progression} bars but the loop has {bars}")]
    BarMismatch { progression: u32, bars: u32 },
}

/// Invalid option values or combinations, caught before the engine runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("tempo override {bpm} BPM cannot be stored in a MIDI tempo event")]
    InvalidTempoOverride { bpm: f64 },

    #[error("default tempo {bpm} BPM cannot be stored in a MIDI tempo event")]
    InvalidDefaultTempo { bpm: f64 },

    #[error("variation probability {value} is outside [0.0, 1.0]")]
    InvalidVariation { value: f64 },

    #[error("ticks per beat {ticks} must be a multiple of 4 and at most 32767")]
    InvalidResolution { ticks: u16 },

    #[error("{bars} bars of {ticks_per_bar} ticks exceed the longest loop a MIDI track can hold")]
    LoopTooLong { bars: u32, ticks_per_bar: u32 },

    #[error("register bounds {min}..={max} must be C pitches (multiples of 12) with min <= max")]
    InvalidRegisterBounds { min: u8, max: u8 },

    #[error("register {pitch} is outside the allowed range {min}..={max}")]
    RegisterOutOfBounds { pitch: u8, min: u8, max: u8 },
}

/// A note name such as `C#4` could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePitchError {
    #[error("empty note name")]
    Empty,

    #[error("bad note letter '{0}'")]
    Letter(char),

    #[error("missing octave in '{0}', expected something like C#4")]
    MissingOctave(String),

    #[error("bad octave '{0}'")]
    Octave(String),

    #[error("note {0} is outside the MIDI range 0..=127")]
    OutOfRange(i32),
}

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("arrangement failed: {0}")]
    Arrangement(#[from] ArrangementError),

    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("MIDI error: {reason}")]
    Midi { reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoopError {
    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoopError::Configuration(_) => 2,
            LoopError::Analysis(_) => 3,
            LoopError::Generation(_) => 4,
            LoopError::Arrangement(_) => 5,
            LoopError::Midi { .. } => 6,
            LoopError::Io { .. } => 7,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoopError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<midly::Error> for LoopError {
    fn from(err: midly::Error) -> Self {
        LoopError::Midi {
            reason: err.to_string(),
        }
    }
}
