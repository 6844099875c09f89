//! Run options and engine constants.
//!
//! `LoopOptions` is what the operator chooses per run. `EngineConfig` holds the
//! numbers the engine would otherwise hard-code: default tempo, output
//! resolution, variation probability and register bounds.

use crate::error::ConfigurationError;
use crate::mode::ModeChoice;
use crate::theory::Pitch;

pub const DEFAULT_TEMPO_BPM: f64 = 124.0;
pub const DEFAULT_TICKS_PER_BEAT: u16 = 480;
pub const DEFAULT_VARIATION: f64 = 0.35;
pub const DEFAULT_SWING: f64 = 0.12;
pub const DEFAULT_BARS: u32 = 8;

/// 4/4 only.
pub const BEATS_PER_BAR: u32 = 4;

/// Largest division a MIDI header can carry (15 bits).
const MAX_TICKS_PER_BEAT: u16 = 0x7FFF;

/// Longest loop whose note spans still fit a track delta (28 bits).
pub const MAX_LOOP_TICKS: u64 = 0x0FFF_FFFF;

/// Slowest tempo a set-tempo event can carry (24-bit microseconds per beat).
pub const MIN_TEMPO_BPM: f64 = 60_000_000.0 / 0xFF_FFFF as f64;

/// Fastest tempo a set-tempo event can carry (one microsecond per beat).
pub const MAX_TEMPO_BPM: f64 = 60_000_000.0;

/// Whether `bpm` survives a round trip through a MIDI tempo event.
pub fn tempo_in_range(bpm: f64) -> bool {
    (MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&bpm)
}

/// Highest register floor that still leaves room for the stab octave.
const MAX_REGISTER_FLOOR: u8 = 84;

#[derive(Debug, Clone, PartialEq)]
pub struct LoopOptions {
    pub mode: ModeChoice,
    /// Fraction of an eighth note that off-beat stabs are delayed by.
    pub swing: f64,
    /// Drawn at random when absent; the drawn value is reported in the summary.
    pub seed: Option<u64>,
    /// Replaces the source tempo.
    pub tempo: Option<f64>,
    pub bars: u32,
    /// Replaces the analyzed register floor.
    pub register: Option<Pitch>,
}

impl Default for LoopOptions {
    fn default() -> Self {
        LoopOptions {
            mode: ModeChoice::Auto,
            swing: DEFAULT_SWING,
            seed: None,
            tempo: None,
            bars: DEFAULT_BARS,
            register: None,
        }
    }
}

impl LoopOptions {
    pub fn validate(&self, config: &EngineConfig) -> Result<(), ConfigurationError> {
        if let Some(bpm) = self.tempo {
            if !tempo_in_range(bpm) {
                return Err(ConfigurationError::InvalidTempoOverride { bpm });
            }
        }
        let ticks_per_bar = config.ticks_per_beat as u32 * BEATS_PER_BAR;
        if self.bars as u64 * ticks_per_bar as u64 > MAX_LOOP_TICKS {
            return Err(ConfigurationError::LoopTooLong {
                bars: self.bars,
                ticks_per_bar,
            });
        }
        if let Some(pitch) = self.register {
            let floor = pitch.octave_floor().value();
            if floor < config.register_floor_min || floor > config.register_floor_max {
                return Err(ConfigurationError::RegisterOutOfBounds {
                    pitch: pitch.value(),
                    min: config.register_floor_min,
                    max: config.register_floor_max,
                });
            }
        }
        Ok(())
    }

    pub fn seed_or_random(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Used when the source carries no tempo event. `None` makes that an error.
    pub default_tempo: Option<f64>,
    /// Output resolution.
    pub ticks_per_beat: u16,
    /// Per-chord probability of a substitution during generation.
    pub variation: f64,
    pub register_floor_min: u8,
    pub register_floor_max: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_tempo: Some(DEFAULT_TEMPO_BPM),
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            variation: DEFAULT_VARIATION,
            register_floor_min: 36,
            register_floor_max: 60,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(bpm) = self.default_tempo {
            if !tempo_in_range(bpm) {
                return Err(ConfigurationError::InvalidDefaultTempo { bpm });
            }
        }
        if !(0.0..=1.0).contains(&self.variation) {
            return Err(ConfigurationError::InvalidVariation {
                value: self.variation,
            });
        }
        // Zero is left to the arrangement stage; anything else must split into sixteenths.
        if self.ticks_per_beat > MAX_TICKS_PER_BEAT || self.ticks_per_beat % 4 != 0 {
            return Err(ConfigurationError::InvalidResolution {
                ticks: self.ticks_per_beat,
            });
        }
        let (min, max) = (self.register_floor_min, self.register_floor_max);
        if min % 12 != 0 || max % 12 != 0 || min > max || max > MAX_REGISTER_FLOOR {
            return Err(ConfigurationError::InvalidRegisterBounds { min, max });
        }
        Ok(())
    }

    /// Snap `pitch` to its C and clamp it into the configured floor bounds.
    pub fn clamp_floor(&self, pitch: Pitch) -> Pitch {
        let floor = pitch
            .octave_floor()
            .value()
            .clamp(self.register_floor_min, self.register_floor_max);
        Pitch::clamped(floor as i32)
    }
}
