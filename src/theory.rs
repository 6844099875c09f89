//! Notes, chord qualities, voicings and registers.
//!
//! Everything here is a plain value; nothing fails except parsing and
//! range-checked pitch construction.

use std::fmt;

use crate::error::ParsePitchError;

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Name of a pitch class, sharps only.
pub fn note_name(pitch_class: u8) -> &'static str {
    NOTE_NAMES[(pitch_class % 12) as usize]
}

/// A MIDI pitch in 0..=127.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pitch(u8);

impl Pitch {
    pub const MAX: u8 = 127;

    pub fn new(value: i32) -> Option<Self> {
        if (0..=Self::MAX as i32).contains(&value) {
            Some(Pitch(value as u8))
        } else {
            None
        }
    }

    /// Clamp into the MIDI range. Used where callers already keep values in bounds.
    pub(crate) fn clamped(value: i32) -> Self {
        Pitch(value.clamp(0, Self::MAX as i32) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn class(self) -> u8 {
        self.0 % 12
    }

    /// Octave in scientific pitch notation (C4 = 60).
    pub fn octave(self) -> i32 {
        (self.0 / 12) as i32 - 1
    }

    pub fn transpose(self, semitones: i32) -> Option<Self> {
        Pitch::new(self.0 as i32 + semitones)
    }

    /// The C at or below this pitch.
    pub fn octave_floor(self) -> Self {
        Pitch(self.0 - self.0 % 12)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", note_name(self.class()), self.octave())
    }
}

impl std::str::FromStr for Pitch {
    type Err = ParsePitchError;

    /// Scientific pitch notation: letter, optional `#`/`b` (or `♯`/`♭`), octave.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut chars = input.trim().chars();
        let letter = chars.next().ok_or(ParsePitchError::Empty)?;
        let natural = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            other => return Err(ParsePitchError::Letter(other)),
        };

        let rest = chars.as_str();
        let (accidental, octave) = match rest.chars().next() {
            Some(c @ ('#' | '♯')) => (1, &rest[c.len_utf8()..]),
            Some(c @ ('b' | '♭')) => (-1, &rest[c.len_utf8()..]),
            _ => (0, rest),
        };

        let octave = octave.trim();
        if octave.is_empty() {
            return Err(ParsePitchError::MissingOctave(input.trim().to_string()));
        }
        let octave: i32 = octave
            .parse()
            .map_err(|_| ParsePitchError::Octave(octave.to_string()))?;

        let midi = (octave + 1) * 12 + natural + accidental;
        Pitch::new(midi).ok_or(ParsePitchError::OutOfRange(midi))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    Major,
    Minor,
    /// Power chord: root, fifth and octave.
    Fifth,
    Sus2,
    Sus4,
    Dominant7,
    Minor7,
}

impl Quality {
    /// Every quality, simplest first. Chord matching breaks ties in this order.
    pub const ALL: [Quality; 7] = [
        Quality::Major,
        Quality::Minor,
        Quality::Fifth,
        Quality::Sus2,
        Quality::Sus4,
        Quality::Dominant7,
        Quality::Minor7,
    ];

    /// Semitone offsets of the root-position voicing.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            Quality::Major => &[0, 4, 7],
            Quality::Minor => &[0, 3, 7],
            Quality::Fifth => &[0, 7, 12],
            Quality::Sus2 => &[0, 2, 7],
            Quality::Sus4 => &[0, 5, 7],
            Quality::Dominant7 => &[0, 4, 7, 10],
            Quality::Minor7 => &[0, 3, 7, 10],
        }
    }

    /// Distinct pitch classes relative to the root.
    pub fn classes(self) -> &'static [u8] {
        match self {
            Quality::Fifth => &[0, 7],
            other => other.intervals(),
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Quality::Major => "",
            Quality::Minor => "m",
            Quality::Fifth => "5",
            Quality::Sus2 => "sus2",
            Quality::Sus4 => "sus4",
            Quality::Dominant7 => "7",
            Quality::Minor7 => "m7",
        }
    }

    pub fn is_minor_family(self) -> bool {
        matches!(self, Quality::Minor | Quality::Minor7)
    }

    pub fn is_major_family(self) -> bool {
        matches!(self, Quality::Major | Quality::Dominant7)
    }

    /// Simplicity rank, 0 = simplest.
    pub fn rank(self) -> usize {
        Quality::ALL.iter().position(|&q| q == self).unwrap_or(Quality::ALL.len())
    }
}

/// The octave band generated material is kept in: `[floor, floor + SPAN)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    floor: Pitch,
    lowest: Pitch,
    highest: Pitch,
}

impl Register {
    pub const SPAN: u8 = 24;

    /// `floor` is snapped down to its C. `lowest`/`highest` record the source's pitch bounds.
    pub fn new(floor: Pitch, lowest: Pitch, highest: Pitch) -> Self {
        Register {
            floor: floor.octave_floor(),
            lowest,
            highest,
        }
    }

    /// A register with no source bounds, e.g. from an explicit override.
    pub fn with_floor(floor: Pitch) -> Self {
        let floor = floor.octave_floor();
        let top = Pitch::clamped(floor.value() as i32 + Self::SPAN as i32 - 1);
        Register::new(floor, floor, top)
    }

    pub fn floor(&self) -> Pitch {
        self.floor
    }

    /// Exclusive upper bound of the band.
    pub fn ceiling(&self) -> i32 {
        self.floor.value() as i32 + Self::SPAN as i32
    }

    pub fn lowest(&self) -> Pitch {
        self.lowest
    }

    pub fn highest(&self) -> Pitch {
        self.highest
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        pitch >= self.floor && (pitch.value() as i32) < self.ceiling()
    }

    /// The pitch of `pitch_class` in the lower octave of the band.
    pub fn place(&self, pitch_class: u8) -> Pitch {
        Pitch::clamped(self.floor.value() as i32 + (pitch_class % 12) as i32)
    }

    fn fold(&self, tone: i32) -> i32 {
        let floor = self.floor.value() as i32;
        let mut tone = tone;
        while tone < floor {
            tone += 12;
        }
        while tone >= self.ceiling() {
            tone -= 12;
        }
        tone
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chord {
    root: Pitch,
    quality: Quality,
    inversion: u8,
}

impl Chord {
    pub fn new(root: Pitch, quality: Quality) -> Self {
        Chord {
            root,
            quality,
            inversion: 0,
        }
    }

    /// Root placed in the lower octave of `register`.
    pub fn in_register(pitch_class: u8, quality: Quality, register: &Register) -> Self {
        Chord::new(register.place(pitch_class), quality)
    }

    pub fn root(&self) -> Pitch {
        self.root
    }

    pub fn root_class(&self) -> u8 {
        self.root.class()
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn inversion(&self) -> u8 {
        self.inversion
    }

    /// Same root, different quality. The inversion wraps to the new tone count.
    pub fn with_quality(&self, quality: Quality) -> Self {
        Chord {
            root: self.root,
            quality,
            inversion: self.inversion % quality.classes().len() as u8,
        }
    }

    pub fn with_inversion(&self, inversion: u8) -> Self {
        Chord {
            inversion: inversion % self.quality.classes().len() as u8,
            ..*self
        }
    }

    /// Move the root by `semitones` and re-place it in `register`.
    pub fn transpose(&self, semitones: i32, register: &Register) -> Self {
        let class = (self.root_class() as i32 + semitones).rem_euclid(12) as u8;
        Chord {
            root: register.place(class),
            ..*self
        }
    }

    pub fn pitch_classes(&self) -> Vec<u8> {
        self.quality
            .classes()
            .iter()
            .map(|&iv| (self.root_class() + iv) % 12)
            .collect()
    }

    pub fn bass_class(&self) -> u8 {
        let classes = self.quality.classes();
        (self.root_class() + classes[self.inversion as usize % classes.len()]) % 12
    }

    /// Sorted pitches realizing the chord inside `register`.
    ///
    /// The lowest `inversion` tones are raised an octave; when that pushes the
    /// top past the band the whole voicing drops an octave if it fits.
    pub fn voicing(&self, register: &Register) -> Vec<Pitch> {
        let root = self.root.value() as i32;
        let mut tones: Vec<i32> = self
            .quality
            .intervals()
            .iter()
            .enumerate()
            .map(|(i, &iv)| {
                let tone = root + iv as i32;
                if i < self.inversion as usize {
                    tone + 12
                } else {
                    tone
                }
            })
            .collect();

        let floor = register.floor().value() as i32;
        let top = tones.iter().copied().max().unwrap_or(root);
        let bottom = tones.iter().copied().min().unwrap_or(root);
        if top >= register.ceiling() && bottom - 12 >= floor {
            for tone in &mut tones {
                *tone -= 12;
            }
        }

        let mut pitches: Vec<Pitch> = tones
            .into_iter()
            .map(|tone| Pitch::clamped(register.fold(tone)))
            .collect();
        pitches.sort_unstable();
        pitches.dedup();
        pitches
    }

    pub fn symbol(&self) -> String {
        let mut symbol = format!("{}{}", note_name(self.root_class()), self.quality.suffix());
        if self.inversion > 0 {
            symbol.push('/');
            symbol.push_str(note_name(self.bass_class()));
        }
        symbol
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol())
    }
}
