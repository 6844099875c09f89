mod common;

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use common::{block_chords, write_file, POP_CHORDS};
use house_loop_gen::midi::read_source;

fn house_loop_gen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_house-loop-gen"))
        .args(args)
        .output()
        .unwrap()
}

fn house_loop_gen_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_house-loop-gen"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn writes_loop_and_prints_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "in.mid", &block_chords(&POP_CHORDS, Some(500_000)));
    let output = dir.path().join("loop.mid");

    let run = house_loop_gen(&[
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "--mode",
        "euphoric",
        "--seed",
        "42",
        "--swing",
        "0.2",
    ]);

    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    let stdout = String::from_utf8_lossy(&run.stdout);
    assert!(stdout.contains("Generated loop info:"));
    assert!(stdout.contains("Tempo: 120.00 BPM (from source)"));
    assert!(stdout.contains("Mode: euphoric"));
    assert!(stdout.contains("Seed: 42"));
    assert!(stdout.contains("Output:"));
    assert!(output.exists());
}

#[test]
fn same_seed_same_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "in.mid", &block_chords(&POP_CHORDS, Some(500_000)));
    let a = dir.path().join("a.mid");
    let b = dir.path().join("b.mid");

    for out in [&a, &b] {
        let run = house_loop_gen(&[
            input.to_str().unwrap(),
            out.to_str().unwrap(),
            "--seed",
            "1234",
            "--mode",
            "minor_fifth",
        ]);
        assert!(run.status.success());
    }
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn failures_map_to_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "in.mid", &block_chords(&POP_CHORDS, Some(500_000)));
    let empty = write_file(dir.path(), "empty.mid", &block_chords(&[], Some(500_000)));
    let junk = write_file(dir.path(), "junk.mid", b"not midi at all");
    let out = dir.path().join("out.mid");
    let (input, empty, junk, out) = (
        input.to_str().unwrap(),
        empty.to_str().unwrap(),
        junk.to_str().unwrap(),
        out.to_str().unwrap(),
    );

    let cases: [(&[&str], i32); 9] = [
        (&[input, out, "--tempo=-1"], 2),
        (&[input, out, "--tempo", "1"], 2),
        (&[input, out, "--variation", "1.5"], 2),
        (&[input, out, "--register", "C6"], 2),
        (&[empty, out], 3),
        (&[input, out, "--bars", "0"], 4),
        (&[input, out, "--swing", "0.5"], 5),
        (&[junk, out], 6),
        (&["does/not/exist.mid", out], 7),
    ];
    for (args, code) in cases {
        let run = house_loop_gen(args);
        assert_eq!(run.status.code(), Some(code), "args {args:?}");
        assert!(String::from_utf8_lossy(&run.stderr).contains("error:"));
    }
}

#[test]
fn register_flag_moves_the_pads() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "in.mid", &block_chords(&POP_CHORDS, Some(500_000)));
    let output = dir.path().join("low.mid");

    let run = house_loop_gen(&[
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "--seed",
        "5",
        "--register",
        "C3",
    ]);
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));

    let written = read_source(&output).unwrap();
    let pads: Vec<u8> = written
        .notes
        .iter()
        .filter(|n| n.channel == 2)
        .map(|n| n.pitch.value())
        .collect();
    assert!(!pads.is_empty());
    assert!(pads.iter().all(|p| (48..72).contains(p)), "pads {pads:?}");
}

#[test]
fn zero_variation_flag_repeats_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "in.mid", &block_chords(&POP_CHORDS, Some(500_000)));
    let output = dir.path().join("still.mid");

    let run = house_loop_gen(&[
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "--mode",
        "euphoric",
        "--seed",
        "9",
        "--variation",
        "0",
    ]);
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    let stdout = String::from_utf8_lossy(&run.stdout);
    assert!(
        stdout.contains("Progression: C - Dsus2 - G - Asus2 - C - Dsus2 - G - Asus2"),
        "{stdout}"
    );
}

#[test]
fn missing_output_gets_a_timestamped_name() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "in.mid", &block_chords(&POP_CHORDS, Some(500_000)));

    let run = house_loop_gen_in(dir.path(), &[input.to_str().unwrap(), "--seed", "77"]);
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    assert!(String::from_utf8_lossy(&run.stdout).contains("Output: out/house_loop_"));

    let names: Vec<String> = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    let name = &names[0];
    assert!(name.starts_with("house_loop_") && name.ends_with("_77.mid"), "{name}");
    // house_loop_YYYYmmdd_HHMMSS_77.mid
    let stamp = &name["house_loop_".len()..name.len() - "_77.mid".len()];
    assert_eq!(stamp.len(), 15);
    assert!(stamp.chars().all(|c| c.is_ascii_digit() || c == '_'));
}
