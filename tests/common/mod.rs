#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

pub const SOURCE_TPB: u16 = 480;
pub const SOURCE_BAR: u32 = SOURCE_TPB as u32 * 4;

/// One block chord per bar: C, Dm, G, Am.
pub const POP_CHORDS: [&[u8]; 4] = [&[60, 64, 67], &[62, 65, 69], &[55, 59, 62], &[57, 60, 64]];

/// Am, Dm, Em, Am.
pub const MINOR_CHORDS: [&[u8]; 4] = [&[57, 60, 64], &[62, 65, 69], &[52, 55, 59], &[57, 60, 64]];

fn midi(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message,
        },
    }
}

/// SMF bytes with one whole-bar block chord per entry. `micros_per_beat` adds a tempo event.
pub fn block_chords(chords: &[&[u8]], micros_per_beat: Option<u32>) -> Vec<u8> {
    let mut track = Vec::new();
    if let Some(micros) = micros_per_beat {
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros))),
        });
    }
    for chord in chords {
        for &key in chord.iter() {
            track.push(midi(
                0,
                MidiMessage::NoteOn {
                    key: u7::new(key),
                    vel: u7::new(90),
                },
            ));
        }
        for (i, &key) in chord.iter().enumerate() {
            let delta = if i == 0 { SOURCE_BAR } else { 0 };
            track.push(midi(
                delta,
                MidiMessage::NoteOff {
                    key: u7::new(key),
                    vel: u7::new(0),
                },
            ));
        }
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header::new(Format::SingleTrack, Timing::Metrical(u15::new(SOURCE_TPB))),
        tracks: vec![track],
    };
    let mut buf = Vec::new();
    smf.write_std(&mut buf).unwrap();
    buf
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}
