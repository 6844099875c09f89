use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::debug;

use house_loop_gen::config::{DEFAULT_BARS, DEFAULT_SWING, DEFAULT_VARIATION};
use house_loop_gen::{generate_loop, midi, EngineConfig, LoopError, LoopOptions, ModeChoice, Pitch};

#[cfg(feature = "gui")]
mod gui;

#[derive(Debug, Parser)]
#[command(
    name = "house-loop-gen",
    version,
    about = "Turn a short MIDI excerpt into a swung house loop (stabs, plucks, pads)"
)]
struct Cli {
    /// Source .mid file
    input: PathBuf,

    /// Output .mid path (if omitted, a timestamped name is generated)
    output: Option<PathBuf>,

    /// Chord flavour; `auto` picks one from the source
    #[arg(long, value_enum, default_value_t = ModeChoice::Auto)]
    mode: ModeChoice,

    /// Off-beat stab delay as a fraction of an eighth note (0.0 to 0.4)
    #[arg(long, default_value_t = DEFAULT_SWING)]
    swing: f64,

    /// Tempo in BPM, replacing the one found in the source
    #[arg(long)]
    tempo: Option<f64>,

    /// RNG seed (same seed and input => same loop)
    #[arg(long)]
    seed: Option<u64>,

    /// Bars to generate (assumes 4/4)
    #[arg(long, default_value_t = DEFAULT_BARS)]
    bars: u32,

    /// Chance that each chord is swapped for a related one (0.0 to 1.0)
    #[arg(long, default_value_t = DEFAULT_VARIATION)]
    variation: f64,

    /// Lowest note of the chord register in scientific pitch notation (e.g. C3)
    #[arg(long)]
    register: Option<Pitch>,

    /// Open the piano-roll preview after writing the file
    #[cfg(feature = "gui")]
    #[arg(long, default_value_t = false)]
    gui: bool,
}

impl Cli {
    fn options(&self, seed: u64) -> LoopOptions {
        LoopOptions {
            mode: self.mode,
            swing: self.swing,
            seed: Some(seed),
            tempo: self.tempo,
            bars: self.bars,
            register: self.register,
        }
    }

    fn config(&self) -> EngineConfig {
        EngineConfig {
            variation: self.variation,
            ..EngineConfig::default()
        }
    }
}

fn default_out_path(seed: u64) -> PathBuf {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    PathBuf::from(format!("out/house_loop_{ts}_{seed}.mid"))
}

fn run(cli: Cli) -> Result<(), LoopError> {
    // The seed is fixed up front so the default file name carries the one actually used.
    let seed = cli.seed.unwrap_or_else(rand::random);
    let options = cli.options(seed);
    let config = cli.config();
    config.validate()?;
    options.validate(&config)?;

    let out_path = cli.output.clone().unwrap_or_else(|| default_out_path(seed));
    debug!("input {}, output {}", cli.input.display(), out_path.display());

    let source = midi::read_source(&cli.input)?;
    let house_loop = generate_loop(&source, &options, &config)?;
    midi::write_loop(&house_loop, &out_path)?;

    println!("{}", house_loop.summary());
    println!("  Output: {}", out_path.display());

    #[cfg(feature = "gui")]
    if cli.gui {
        gui::launch(source, options, config, out_path, house_loop);
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
