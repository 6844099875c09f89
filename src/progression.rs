//! Chord sequences measured in bars.

use crate::theory::Chord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionEntry {
    pub chord: Chord,
    pub bars: u32,
}

impl ProgressionEntry {
    pub fn new(chord: Chord, bars: u32) -> Self {
        ProgressionEntry { chord, bars }
    }
}

/// Ordered chords with their lengths in bars. Never empty, no zero-length entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordProgression {
    entries: Vec<ProgressionEntry>,
}

impl ChordProgression {
    /// `None` when `entries` is empty or any entry lasts zero bars.
    pub fn new(entries: Vec<ProgressionEntry>) -> Option<Self> {
        if entries.is_empty() || entries.iter().any(|e| e.bars == 0) {
            return None;
        }
        Some(ChordProgression { entries })
    }

    /// Builds from one chord per bar, merging consecutive repeats.
    pub fn from_bars(bars: &[Chord]) -> Option<Self> {
        let mut entries: Vec<ProgressionEntry> = Vec::new();
        for &chord in bars {
            match entries.last_mut() {
                Some(last) if last.chord == chord => last.bars += 1,
                _ => entries.push(ProgressionEntry::new(chord, 1)),
            }
        }
        ChordProgression::new(entries)
    }

    pub fn entries(&self) -> &[ProgressionEntry] {
        &self.entries
    }

    pub fn total_bars(&self) -> u32 {
        self.entries.iter().map(|e| e.bars).sum()
    }

    /// `(chord, first bar, length in bars)` for each entry.
    pub fn spans(&self) -> impl Iterator<Item = (Chord, u32, u32)> + '_ {
        self.entries.iter().scan(0u32, |start, entry| {
            let span = (entry.chord, *start, entry.bars);
            *start += entry.bars;
            Some(span)
        })
    }

    /// The chord sounding in each bar.
    pub fn chord_per_bar(&self) -> Vec<Chord> {
        self.entries
            .iter()
            .flat_map(|e| std::iter::repeat(e.chord).take(e.bars as usize))
            .collect()
    }

    pub fn distinct_chords(&self) -> usize {
        let mut seen: Vec<Chord> = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.chord) {
                seen.push(entry.chord);
            }
        }
        seen.len()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.chord.symbol()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::{Pitch, Quality, Register};

    fn reg() -> Register {
        Register::with_floor(Pitch::new(48).unwrap())
    }

    #[test]
    fn rejects_empty_and_zero_length() {
        assert!(ChordProgression::new(vec![]).is_none());
        let c = Chord::in_register(0, Quality::Major, &reg());
        assert!(ChordProgression::new(vec![ProgressionEntry::new(c, 0)]).is_none());
        assert!(ChordProgression::from_bars(&[]).is_none());
    }

    #[test]
    fn merges_repeated_bars_and_reports_spans() {
        let c = Chord::in_register(0, Quality::Major, &reg());
        let am = Chord::in_register(9, Quality::Minor, &reg());
        let prog = ChordProgression::from_bars(&[c, c, am, c]).unwrap();
        assert_eq!(prog.entries().len(), 3);
        assert_eq!(prog.total_bars(), 4);
        assert_eq!(prog.distinct_chords(), 2);
        let spans: Vec<_> = prog.spans().map(|(ch, start, bars)| (ch.symbol(), start, bars)).collect();
        assert_eq!(
            spans,
            vec![("C".to_string(), 0, 2), ("Am".to_string(), 2, 1), ("C".to_string(), 3, 1)]
        );
        assert_eq!(prog.chord_per_bar(), vec![c, c, am, c]);
    }
}
