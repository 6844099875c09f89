//! Standard MIDI File input and output.
//!
//! Decoding merges every track of the source into one `SourceEvents` list with
//! absolute ticks. Encoding writes SMF format 1: a conductor track (name, 4/4,
//! tempo) followed by one track per layer. Uses the `midly` crate.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::info;
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::analyzer::{SourceEvents, SourceNote, TempoEvent};
use crate::arrangement::InstrumentLayer;
use crate::assembler::HouseLoop;
use crate::error::{LoopError, Result};
use crate::theory::Pitch;

const CONDUCTOR_NAME: &str = "House Loop";

pub fn read_source(path: &Path) -> Result<SourceEvents> {
    let bytes = fs::read(path).map_err(|e| LoopError::io(path, e))?;
    parse_source(&bytes)
}

pub fn parse_source(bytes: &[u8]) -> Result<SourceEvents> {
    let smf = Smf::parse(bytes)?;
    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int(),
        Timing::Timecode(..) => {
            return Err(LoopError::Midi {
                reason: "SMPTE timecode division is not supported".into(),
            })
        }
    };

    let mut source = SourceEvents::new(ticks_per_beat);
    for track in &smf.tracks {
        collect_track(track, &mut source);
    }
    source
        .notes
        .sort_by_key(|n| (n.start, n.pitch, n.channel, n.end));
    Ok(source)
}

fn collect_track(track: &[TrackEvent], source: &mut SourceEvents) {
    let mut tick: u32 = 0;
    // (channel, key) -> stack of (start tick, velocity)
    let mut open: BTreeMap<(u8, u8), Vec<(u32, u8)>> = BTreeMap::new();

    for event in track {
        tick = tick.saturating_add(event.delta.as_int());
        match event.kind {
            TrackEventKind::Midi { channel, message } => match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    open.entry((channel.as_int(), key.as_int()))
                        .or_default()
                        .push((tick, vel.as_int()));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    let slot = (channel.as_int(), key.as_int());
                    if let Some((start, velocity)) = open.get_mut(&slot).and_then(Vec::pop) {
                        push_note(source, slot, start, tick, velocity);
                    }
                }
                _ => {}
            },
            TrackEventKind::Meta(MetaMessage::Tempo(micros)) => source.tempos.push(TempoEvent {
                tick,
                micros_per_beat: micros.as_int(),
            }),
            _ => {}
        }
    }

    // Notes never released close at the end of their track.
    for (slot, starts) in open {
        for (start, velocity) in starts {
            push_note(source, slot, start, tick, velocity);
        }
    }
}

fn push_note(source: &mut SourceEvents, (channel, key): (u8, u8), start: u32, end: u32, velocity: u8) {
    if end <= start {
        return;
    }
    source.notes.push(SourceNote {
        pitch: Pitch::clamped(key as i32),
        start,
        end,
        velocity,
        channel,
    });
}

/// A single note-on or note-off of the flattened loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub tick: u32,
    pub channel: u8,
    pub key: u8,
    pub velocity: u8,
    pub on: bool,
}

impl NoteEvent {
    /// Raw status/data bytes for a live MIDI port.
    pub fn bytes(&self) -> [u8; 3] {
        if self.on {
            [0x90 | (self.channel & 0x0F), self.key, self.velocity]
        } else {
            [0x80 | (self.channel & 0x0F), self.key, 0]
        }
    }
}

fn layer_events(layer: &InstrumentLayer) -> Vec<NoteEvent> {
    let channel = layer.kind.channel();
    let mut events = Vec::with_capacity(layer.notes.len() * 2);
    for note in &layer.notes {
        let key = note.pitch.value();
        events.push(NoteEvent {
            tick: note.start,
            channel,
            key,
            velocity: note.velocity.min(127),
            on: true,
        });
        events.push(NoteEvent {
            tick: note.end(),
            channel,
            key,
            velocity: 0,
            on: false,
        });
    }
    events.sort_by_key(|e| (e.tick, e.on));
    events
}

/// Every layer's notes merged in time order; at equal ticks note-offs come first.
pub fn note_events(house_loop: &HouseLoop) -> Vec<NoteEvent> {
    let mut events: Vec<NoteEvent> = house_loop
        .layers()
        .iter()
        .flat_map(|layer| layer_events(layer))
        .collect();
    events.sort_by_key(|e| (e.tick, e.on));
    events
}

fn event_order_key(kind: &TrackEventKind) -> u8 {
    match kind {
        TrackEventKind::Meta(_) => 0,
        TrackEventKind::Midi { message, .. } => match message {
            MidiMessage::NoteOff { .. } => 2,
            MidiMessage::NoteOn { .. } => 3,
            _ => 1,
        },
        TrackEventKind::SysEx(_) | TrackEventKind::Escape(_) => 4,
    }
}

/// Sort absolute events and convert them to a delta-timed track ending in End-of-Track.
fn into_track(mut abs_events: Vec<(u32, TrackEventKind<'static>)>) -> Vec<TrackEvent<'static>> {
    abs_events.sort_by(|(ta, ea), (tb, eb)| {
        ta.cmp(tb)
            .then_with(|| event_order_key(ea).cmp(&event_order_key(eb)))
    });

    let mut track: Vec<TrackEvent<'static>> = Vec::with_capacity(abs_events.len() + 1);
    let mut last_tick: u32 = 0;
    for (tick, kind) in abs_events {
        let delta = tick.saturating_sub(last_tick);
        last_tick = tick;
        track.push(TrackEvent {
            delta: delta.into(),
            kind,
        });
    }

    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

fn conductor_track(house_loop: &HouseLoop) -> Vec<TrackEvent<'static>> {
    let micros = house_loop.tempo().micros_per_beat();
    into_track(vec![
        (
            0,
            TrackEventKind::Meta(MetaMessage::TrackName(CONDUCTOR_NAME.as_bytes())),
        ),
        (0, TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8))),
        (0, TrackEventKind::Meta(MetaMessage::Tempo(micros.into()))),
    ])
}

fn layer_track(layer: &InstrumentLayer) -> Vec<TrackEvent<'static>> {
    let channel = layer.kind.channel();
    let mut abs_events: Vec<(u32, TrackEventKind<'static>)> = vec![
        (
            0,
            TrackEventKind::Meta(MetaMessage::TrackName(layer.kind.name().as_bytes())),
        ),
        (
            0,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::ProgramChange {
                    program: layer.kind.program().into(),
                },
            },
        ),
    ];

    for event in layer_events(layer) {
        let message = if event.on {
            MidiMessage::NoteOn {
                key: event.key.into(),
                vel: event.velocity.into(),
            }
        } else {
            MidiMessage::NoteOff {
                key: event.key.into(),
                vel: 0.into(),
            }
        };
        abs_events.push((
            event.tick,
            TrackEventKind::Midi {
                channel: channel.into(),
                message,
            },
        ));
    }

    into_track(abs_events)
}

/// Encode the loop as SMF bytes. Pure: equal loops give identical bytes.
pub fn encode_loop(house_loop: &HouseLoop) -> Result<Vec<u8>> {
    let mut tracks = vec![conductor_track(house_loop)];
    tracks.extend(house_loop.layers().iter().map(|layer| layer_track(layer)));

    let header = Header::new(
        Format::Parallel,
        Timing::Metrical(house_loop.tempo().ticks_per_beat.into()),
    );
    let smf = Smf { header, tracks };

    let mut buf = Vec::new();
    smf.write_std(&mut buf).map_err(|e| LoopError::Midi {
        reason: e.to_string(),
    })?;
    Ok(buf)
}

pub fn write_loop(house_loop: &HouseLoop, path: &Path) -> Result<()> {
    let bytes = encode_loop(house_loop)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| LoopError::io(parent, e))?;
        }
    }
    fs::write(path, bytes).map_err(|e| LoopError::io(path, e))?;
    info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::num::{u15, u24, u28, u4, u7};

    fn note(delta: u32, on: bool, key: u8, vel: u8) -> TrackEvent<'static> {
        let message = if on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message,
            },
        }
    }

    fn to_bytes(tracks: Vec<Vec<TrackEvent<'static>>>, timing: Timing) -> Vec<u8> {
        let smf = Smf {
            header: Header::new(Format::Parallel, timing),
            tracks,
        };
        let mut buf = Vec::new();
        smf.write_std(&mut buf).unwrap();
        buf
    }

    #[test]
    fn pairs_notes_and_treats_zero_velocity_as_off() {
        let track = vec![
            note(0, true, 60, 90),
            note(0, true, 64, 80),
            note(480, false, 60, 0),
            note(0, true, 64, 0),
            note(0, true, 67, 70),
        ];
        let bytes = to_bytes(vec![track], Timing::Metrical(u15::new(96)));
        let source = parse_source(&bytes).unwrap();
        assert_eq!(source.ticks_per_beat, 96);
        let spans: Vec<(u8, u32, u32)> = source
            .notes
            .iter()
            .map(|n| (n.pitch.value(), n.start, n.end))
            .collect();
        // 67 never ends and is dropped: it would close at its own start tick.
        assert_eq!(spans, vec![(60, 0, 480), (64, 0, 480)]);
    }

    #[test]
    fn collects_tempo_from_any_track() {
        let conductor = vec![TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(508_474))),
        }];
        let notes = vec![note(0, true, 60, 90), note(960, false, 60, 0)];
        let bytes = to_bytes(vec![conductor, notes], Timing::Metrical(u15::new(480)));
        let source = parse_source(&bytes).unwrap();
        assert_eq!(source.tempos.len(), 1);
        assert_eq!(source.tempos[0].micros_per_beat, 508_474);
        assert_eq!(source.notes.len(), 1);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_source(b"definitely not a midi file"),
            Err(LoopError::Midi { .. })
        ));
    }

    #[test]
    fn raw_bytes_for_live_output() {
        let on = NoteEvent {
            tick: 0,
            channel: 2,
            key: 60,
            velocity: 100,
            on: true,
        };
        assert_eq!(on.bytes(), [0x92, 60, 100]);
        assert_eq!(NoteEvent { on: false, ..on }.bytes(), [0x82, 60, 0]);
    }
}
