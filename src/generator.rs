//! Progression regeneration.
//!
//! The base progression is tiled across the requested bar count, conformed to
//! the mode's palette, then each chord is replaced by a related one with
//! probability `variation`. All randomness comes from the caller's RNG.

use log::{debug, info};
use rand::Rng;

use crate::error::GenerationError;
use crate::mode::Mode;
use crate::progression::{ChordProgression, ProgressionEntry};
use crate::theory::{Chord, Register};

pub fn generate_progression<R: Rng>(
    base: &ChordProgression,
    register: &Register,
    mode: Mode,
    bars: u32,
    variation: f64,
    rng: &mut R,
) -> Result<ChordProgression, GenerationError> {
    if bars == 0 {
        return Err(GenerationError::InvalidBars { bars });
    }
    if base.entries().is_empty() {
        return Err(GenerationError::EmptyBase);
    }

    let variation = if variation.is_finite() { variation.clamp(0.0, 1.0) } else { 0.0 };
    let mut entries = tile(base, bars, mode);

    let mut varied = false;
    for (index, entry) in entries.iter_mut().enumerate() {
        if rng.gen_bool(variation) {
            let replacement = substitute(&entry.chord, register, mode, rng);
            debug!("bar group {}: {} -> {}", index + 1, entry.chord, replacement);
            entry.chord = replacement;
            varied = true;
        }
    }

    // Guarantee audible variation once the expected number of substitutions reaches one.
    if !varied && bars as f64 * variation >= 1.0 && base.distinct_chords() > 1 {
        let index = rng.gen_range(0..entries.len());
        let replacement = substitute(&entries[index].chord, register, mode, rng);
        debug!("forced variation at entry {}: {}", index + 1, replacement);
        entries[index].chord = replacement;
    }

    let progression = ChordProgression::new(entries).ok_or(GenerationError::EmptyBase)?;
    info!(
        "generated {} bars in {} mode: {}",
        bars,
        mode,
        progression.symbols().join(" - ")
    );
    Ok(progression)
}

/// Cycle through the base entries until `bars` are filled, truncating the last one.
fn tile(base: &ChordProgression, bars: u32, mode: Mode) -> Vec<ProgressionEntry> {
    let mut entries = Vec::new();
    let mut filled = 0;
    for entry in base.entries().iter().cycle() {
        if filled >= bars {
            break;
        }
        let length = entry.bars.min(bars - filled);
        let chord = entry.chord.with_quality(mode.conform(entry.chord.quality()));
        entries.push(ProgressionEntry::new(chord, length));
        filled += length;
    }
    entries
}

/// Every chord the generator may swap `chord` for. Never contains `chord` itself.
pub fn substitutes(chord: &Chord, register: &Register, mode: Mode) -> Vec<Chord> {
    let mut candidates: Vec<Chord> = mode
        .palette()
        .iter()
        .filter(|&&quality| quality != chord.quality())
        .map(|&quality| chord.with_quality(quality))
        .collect();
    candidates.extend(
        mode.adjacent_steps()
            .iter()
            .map(|&step| chord.transpose(step, register)),
    );
    let tones = chord.quality().classes().len() as u8;
    if tones > 1 {
        candidates.push(chord.with_inversion(chord.inversion() + 1));
    }
    candidates.retain(|candidate| candidate != chord);
    candidates
}

fn substitute<R: Rng>(chord: &Chord, register: &Register, mode: Mode, rng: &mut R) -> Chord {
    let candidates = substitutes(chord, register, mode);
    if candidates.is_empty() {
        return *chord;
    }
    candidates[rng.gen_range(0..candidates.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::{Pitch, Quality};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn reg() -> Register {
        Register::with_floor(Pitch::new(48).unwrap())
    }

    fn base(chords: &[(u8, Quality, u32)]) -> ChordProgression {
        let entries = chords
            .iter()
            .map(|&(pc, q, bars)| ProgressionEntry::new(Chord::in_register(pc, q, &reg()), bars))
            .collect();
        ChordProgression::new(entries).unwrap()
    }

    fn generate(base: &ChordProgression, mode: Mode, bars: u32, variation: f64, seed: u64) -> ChordProgression {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        generate_progression(base, &reg(), mode, bars, variation, &mut rng).unwrap()
    }

    #[test]
    fn zero_variation_is_an_exact_tiling() {
        let two = base(&[(0, Quality::Major, 1), (7, Quality::Sus2, 1)]);
        let out = generate(&two, Mode::Euphoric, 8, 0.0, 1);
        let expected: Vec<String> = ["C", "Gsus2"].repeat(4).iter().map(|s| s.to_string()).collect();
        assert_eq!(out.symbols(), expected);
        assert_eq!(out.total_bars(), 8);
    }

    #[test]
    fn tiling_truncates_the_last_cycle() {
        let three = base(&[(9, Quality::Minor, 2), (5, Quality::Minor7, 1)]);
        let out = generate(&three, Mode::MinorFifth, 4, 0.0, 1);
        let lengths: Vec<u32> = out.entries().iter().map(|e| e.bars).collect();
        assert_eq!(lengths, vec![2, 1, 1]);
        assert_eq!(out.total_bars(), 4);
    }

    #[test]
    fn same_seed_same_progression() {
        let b = base(&[(0, Quality::Major, 1), (9, Quality::Minor, 1), (5, Quality::Major, 2)]);
        for seed in [0, 7, 42, u64::MAX] {
            assert_eq!(
                generate(&b, Mode::Euphoric, 8, 0.35, seed),
                generate(&b, Mode::Euphoric, 8, 0.35, seed)
            );
        }
    }

    #[test]
    fn output_stays_in_the_mode_palette() {
        let b = base(&[(0, Quality::Major, 1), (9, Quality::Minor, 1), (7, Quality::Dominant7, 1)]);
        for mode in [Mode::Euphoric, Mode::MinorFifth] {
            for seed in 0..32 {
                let out = generate(&b, mode, 8, 0.8, seed);
                for entry in out.entries() {
                    assert!(mode.allows(entry.chord.quality()), "{mode}: {}", entry.chord);
                    assert!(reg().contains(entry.chord.root()));
                }
            }
        }
    }

    #[test]
    fn variation_always_changes_something_when_expected() {
        let b = base(&[(0, Quality::Major, 1), (9, Quality::Sus2, 1)]);
        let tiled = generate(&b, Mode::Euphoric, 8, 0.0, 0);
        for seed in 0..64 {
            let out = generate(&b, Mode::Euphoric, 8, 0.125, seed);
            assert_ne!(out.chord_per_bar(), tiled.chord_per_bar(), "seed {seed}");
        }
    }

    #[test]
    fn substitutes_keep_root_or_move_to_a_neighbour() {
        let c = Chord::in_register(0, Quality::Major, &reg());
        let options = substitutes(&c, &reg(), Mode::Euphoric);
        assert!(!options.contains(&c));
        for option in &options {
            let motion = option.root_class() as i32;
            assert!([0, 2, 10].contains(&motion), "{option}");
        }
        assert!(options.iter().any(|o| o.inversion() == 1));
    }

    #[test]
    fn invalid_inputs_fail() {
        let b = base(&[(0, Quality::Major, 1)]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            generate_progression(&b, &reg(), Mode::Euphoric, 0, 0.3, &mut rng),
            Err(GenerationError::InvalidBars { bars: 0 })
        );
    }
}
