//! Turns a short MIDI excerpt into a swung house loop.
//!
//! The pipeline runs strictly forward:
//! [`analyzer`] → mode resolution → [`generator`] → [`arrangement`] → [`assembler`].
//! [`midi`] decodes the source before the engine runs and encodes the finished
//! [`HouseLoop`] afterwards.

pub mod analyzer;
pub mod arrangement;
pub mod assembler;
pub mod config;
pub mod error;
pub mod generator;
pub mod midi;
pub mod mode;
pub mod progression;
pub mod theory;

use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use analyzer::{Analysis, SourceEvents, TempoSource, TempoSpec};
pub use arrangement::{Arrangement, InstrumentLayer, LayerKind, Note, SwingAmount};
pub use assembler::{HouseLoop, LoopSummary};
pub use config::{EngineConfig, LoopOptions};
pub use error::{LoopError, ParsePitchError, Result};
pub use mode::{Mode, ModeChoice};
pub use progression::{ChordProgression, ProgressionEntry};
pub use theory::{Chord, Pitch, Quality, Register};

/// Run the whole engine on decoded source events.
///
/// Options and configuration are validated first; nothing is returned unless
/// every stage succeeded. With a fixed seed the result is fully reproducible.
pub fn generate_loop(
    source: &SourceEvents,
    options: &LoopOptions,
    config: &EngineConfig,
) -> Result<HouseLoop> {
    config.validate()?;
    options.validate(config)?;

    let seed = options.seed_or_random();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let analysis = analyzer::analyze(source, options, config)?;
    let mode = options.mode.resolve(&analysis);
    info!("mode {:?} resolved to {}", options.mode, mode);

    let progression = generator::generate_progression(
        &analysis.base,
        &analysis.register,
        mode,
        options.bars,
        config.variation,
        &mut rng,
    )?;
    let arrangement = arrangement::arrange(
        &progression,
        &analysis.tempo,
        options.swing,
        options.bars,
        &analysis.register,
    )?;

    Ok(assembler::assemble(
        analysis.tempo,
        analysis.tempo_source,
        mode,
        progression,
        options.bars,
        arrangement,
        seed,
    ))
}
