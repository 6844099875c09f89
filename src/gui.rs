//! Piano-roll preview with live playback.
//!
//! Drawing happens on the macroquad main loop; playback runs on its own thread
//! and sends raw note bytes to the first MIDI output port found by midir. The
//! two share a `PlaybackState` behind a mutex. Regenerating swaps in a new loop
//! drawn with a fresh seed; SAVE writes the loop on screen to the output path.

use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{info, warn};
use macroquad::prelude::*;
use midir::{MidiOutput, MidiOutputConnection};

use house_loop_gen::midi::{self, NoteEvent};
use house_loop_gen::{generate_loop, EngineConfig, HouseLoop, LayerKind, LoopOptions, Pitch, SourceEvents};

const PANEL_HEIGHT: f32 = 110.0;
const CHORD_LANE: f32 = 24.0;
const KEY_WIDTH: f32 = 60.0;
const BTN_W: f32 = 110.0;
const BTN_H: f32 = 25.0;
const BTN_Y: f32 = 75.0;

struct PlaybackState {
    playing: bool,
    current_tick: u32,
    events: Vec<NoteEvent>,
    total_ticks: u32,
    micros_per_tick: f64,
}

impl PlaybackState {
    fn load(&mut self, house_loop: &HouseLoop) {
        let tempo = house_loop.tempo();
        self.events = midi::note_events(house_loop);
        self.total_ticks = house_loop.total_ticks();
        self.micros_per_tick = tempo.micros_per_beat() as f64 / tempo.ticks_per_beat.max(1) as f64;
        self.playing = false;
        self.current_tick = 0;
    }
}

fn lock(state: &Mutex<PlaybackState>) -> MutexGuard<'_, PlaybackState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn setup_midi_output() -> Result<MidiOutputConnection, Box<dyn Error>> {
    let midi_out = MidiOutput::new("House Loop Gen")?;
    let out_ports = midi_out.ports();
    let out_port = out_ports.first().ok_or("no MIDI output ports available")?;
    let port_name = midi_out
        .port_name(out_port)
        .unwrap_or_else(|_| "unknown".to_string());
    info!("connected to MIDI output {port_name}");
    Ok(midi_out.connect(out_port, "house-loop-output")?)
}

/// Silence every layer channel (CC 123, all notes off).
fn all_notes_off(conn: &mut MidiOutputConnection) {
    for kind in LayerKind::ALL {
        conn.send(&[0xB0 | kind.channel(), 123, 0]).ok();
    }
}

fn spawn_playback_thread(state: Arc<Mutex<PlaybackState>>) {
    thread::spawn(move || {
        let mut midi_out = match setup_midi_output() {
            Ok(conn) => conn,
            Err(e) => {
                warn!("playback disabled: {e}");
                return;
            }
        };

        let mut was_playing = false;
        loop {
            let (due, micros_per_tick) = {
                let mut s = lock(&state);
                if !s.playing {
                    (None, s.micros_per_tick)
                } else {
                    let tick = s.current_tick;
                    let first = s.events.partition_point(|e| e.tick < tick);
                    let due: Vec<NoteEvent> = s.events[first..]
                        .iter()
                        .take_while(|e| e.tick == tick)
                        .copied()
                        .collect();
                    // Offs landing exactly on the loop end still fire before wrapping.
                    s.current_tick = if tick >= s.total_ticks { 0 } else { tick + 1 };
                    (Some(due), s.micros_per_tick)
                }
            };

            match due {
                None => {
                    if was_playing {
                        all_notes_off(&mut midi_out);
                        was_playing = false;
                    }
                    thread::sleep(Duration::from_millis(50));
                }
                Some(events) => {
                    was_playing = true;
                    for event in events {
                        midi_out.send(&event.bytes()).ok();
                    }
                    thread::sleep(Duration::from_micros(micros_per_tick.max(1.0) as u64));
                }
            }
        }
    });
}

fn layer_colors(kind: LayerKind) -> (Color, Color) {
    match kind {
        LayerKind::Stab => (Color::from_rgba(255, 150, 40, 255), Color::from_rgba(255, 200, 120, 220)),
        LayerKind::Pluck => (Color::from_rgba(0, 180, 255, 255), Color::from_rgba(100, 210, 255, 220)),
        LayerKind::Pad => (Color::from_rgba(150, 90, 230, 255), Color::from_rgba(190, 150, 255, 160)),
    }
}

fn button(x: f32, label: &str, color: Color) -> bool {
    draw_rectangle(x, BTN_Y, BTN_W, BTN_H, color);
    draw_text(label, x + 12.0, BTN_Y + 18.0, 20.0, BLACK);

    if is_mouse_button_pressed(MouseButton::Left) {
        let (mx, my) = mouse_position();
        return mx >= x && mx <= x + BTN_W && my >= BTN_Y && my <= BTN_Y + BTN_H;
    }
    false
}

fn draw_header(house_loop: &HouseLoop, status: &str) {
    draw_rectangle(0.0, 0.0, screen_width(), PANEL_HEIGHT, Color::from_rgba(25, 25, 30, 255));

    let summary = house_loop.summary();
    draw_text(
        &format!("HOUSE LOOP - {} - Seed: {}", summary.mode, summary.seed),
        20.0,
        30.0,
        24.0,
        WHITE,
    );
    draw_text(
        &format!(
            "{:.2} BPM ({}) | {} bars | {}",
            summary.bpm,
            summary.tempo_source,
            summary.bars,
            summary.chords.join(" - ")
        ),
        20.0,
        55.0,
        18.0,
        LIGHTGRAY,
    );
    draw_text(status, 4.0 * (BTN_W + 10.0) + 20.0, BTN_Y + 18.0, 18.0, LIGHTGRAY);
}

fn draw_piano_roll(house_loop: &HouseLoop, playhead: Option<u32>) {
    let top = PANEL_HEIGHT + CHORD_LANE;
    let height = screen_height() - top;
    let total_ticks = house_loop.total_ticks().max(1);
    let time_scale = (screen_width() - KEY_WIDTH) / total_ticks as f32;

    draw_rectangle(0.0, PANEL_HEIGHT, screen_width(), screen_height() - PANEL_HEIGHT, Color::from_rgba(20, 20, 25, 255));

    let layers = house_loop.layers();
    let pitches = layers.iter().flat_map(|l| l.notes.iter().map(|n| n.pitch.value()));
    let min_pitch = pitches.clone().min().unwrap_or(48).saturating_sub(2);
    let max_pitch = pitches.max().unwrap_or(84).saturating_add(2).min(127);
    let pitch_range = (max_pitch - min_pitch + 1) as f32;
    let row_height = height / pitch_range;

    for pitch in min_pitch..=max_pitch {
        let y = top + (max_pitch - pitch) as f32 * row_height;
        let is_black = matches!(pitch % 12, 1 | 3 | 6 | 8 | 10);
        let key_color = if is_black {
            Color::from_rgba(30, 30, 35, 255)
        } else {
            Color::from_rgba(45, 45, 50, 255)
        };
        draw_rectangle(0.0, y, KEY_WIDTH, row_height, key_color);
        draw_line(0.0, y, screen_width(), y, 1.0, Color::from_rgba(40, 40, 45, 255));
        if pitch % 12 == 0 {
            let label = Pitch::new(pitch as i32).map(|p| p.to_string()).unwrap_or_default();
            draw_text(&label, 8.0, y + row_height / 2.0 + 5.0, 16.0, LIGHTGRAY);
        }
    }

    // Beat lines, brighter on the bar.
    let tempo = house_loop.tempo();
    let beat = tempo.ticks_per_beat.max(1) as u32;
    for b in 0..=total_ticks / beat {
        let x = KEY_WIDTH + (b * beat) as f32 * time_scale;
        let color = if b % 4 == 0 {
            Color::from_rgba(80, 80, 90, 255)
        } else {
            Color::from_rgba(50, 50, 55, 255)
        };
        draw_line(x, PANEL_HEIGHT, x, screen_height(), 1.0, color);
    }

    let bar = tempo.ticks_per_bar();
    for (chord, first_bar, bars) in house_loop.progression().spans() {
        let x = KEY_WIDTH + (first_bar * bar) as f32 * time_scale;
        let w = (bars * bar) as f32 * time_scale;
        draw_rectangle_lines(x, PANEL_HEIGHT + 2.0, w, CHORD_LANE - 4.0, 1.0, GRAY);
        draw_text(&chord.symbol(), x + 6.0, PANEL_HEIGHT + CHORD_LANE - 7.0, 18.0, WHITE);
    }

    // Pads first so the shorter layers sit on top.
    for layer in layers.iter().rev() {
        let (fill, outline) = layer_colors(layer.kind);
        for note in &layer.notes {
            let y = top + (max_pitch - note.pitch.value()) as f32 * row_height;
            let x = KEY_WIDTH + note.start as f32 * time_scale;
            let w = (note.duration as f32 * time_scale).max(2.0);
            let alpha = note.velocity as f32 / 127.0 * 0.6 + 0.4;
            draw_rectangle(x, y + 1.0, w, row_height - 2.0, Color { a: alpha, ..fill });
            draw_rectangle_lines(x, y + 1.0, w, row_height - 2.0, 1.0, outline);
        }
    }

    if let Some(tick) = playhead {
        let x = KEY_WIDTH + tick as f32 * time_scale;
        draw_line(x, PANEL_HEIGHT, x, screen_height(), 2.0, Color::from_rgba(255, 60, 60, 255));
    }
}

async fn run_gui(
    source: SourceEvents,
    mut options: LoopOptions,
    config: EngineConfig,
    out_path: PathBuf,
    mut house_loop: HouseLoop,
) {
    let state = Arc::new(Mutex::new(PlaybackState {
        playing: false,
        current_tick: 0,
        events: Vec::new(),
        total_ticks: 0,
        micros_per_tick: 1000.0,
    }));
    lock(&state).load(&house_loop);
    spawn_playback_thread(Arc::clone(&state));

    let mut status = format!("wrote {}", out_path.display());

    loop {
        clear_background(Color::from_rgba(15, 15, 20, 255));

        let (playing, current_tick) = {
            let s = lock(&state);
            (s.playing, s.current_tick)
        };

        draw_header(&house_loop, &status);

        let play_color = if playing {
            Color::from_rgba(255, 60, 60, 255)
        } else {
            Color::from_rgba(0, 255, 128, 255)
        };
        let mut x = 20.0;
        if button(x, if playing { "STOP" } else { "PLAY" }, play_color) {
            let mut s = lock(&state);
            s.playing = !s.playing;
            s.current_tick = 0;
        }

        x += BTN_W + 10.0;
        if button(x, "REGENERATE", Color::from_rgba(60, 150, 255, 255)) {
            options.seed = Some(::rand::random());
            match generate_loop(&source, &options, &config) {
                Ok(fresh) => {
                    house_loop = fresh;
                    lock(&state).load(&house_loop);
                    status = format!("seed {} (unsaved)", house_loop.seed());
                }
                Err(e) => status = format!("error: {e}"),
            }
        }

        x += BTN_W + 10.0;
        if button(x, "SAVE", Color::from_rgba(230, 200, 60, 255)) {
            status = match midi::write_loop(&house_loop, &out_path) {
                Ok(()) => format!("wrote {}", out_path.display()),
                Err(e) => format!("error: {e}"),
            };
        }

        draw_piano_roll(&house_loop, playing.then_some(current_tick));

        next_frame().await
    }
}

/// Open the preview window. Blocks until the window is closed.
pub fn launch(
    source: SourceEvents,
    options: LoopOptions,
    config: EngineConfig,
    out_path: PathBuf,
    house_loop: HouseLoop,
) {
    let window_conf = Conf {
        window_title: "House Loop Gen - Piano Roll".to_owned(),
        window_width: 1400,
        window_height: 700,
        ..Default::default()
    };

    macroquad::Window::from_config(window_conf, async move {
        run_gui(source, options, config, out_path, house_loop).await;
    });
}
