//! End-to-end runs of the `numduel` binary: host and peer as real processes.

use std::process::{Command, Output};

fn numduel(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_numduel"))
        .args(args)
        .env_remove("NUMDUEL_ROUNDS")
        .env_remove("NUMDUEL_TRANSPORT")
        .env_remove("NUMDUEL_FIFO_DIR")
        .env_remove("RUST_LOG")
        .env("NUMDUEL_LOG", "warn")
        .output()
        .expect("failed to run numduel")
}

/// Lines of the summary table that describe a round.
fn round_lines(stdout: &str) -> Vec<&str> {
    stdout
        .lines()
        .filter(|line| line.contains("thinker") || line.contains("guesser"))
        .collect()
}

#[test]
fn missing_bound_is_a_usage_error() {
    let out = numduel(&[]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("MAX_NUMBER"), "stderr: {stderr}");
}

#[test]
fn bound_of_one_is_rejected() {
    let out = numduel(&["1"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
}

#[test]
fn non_numeric_bound_is_rejected() {
    let out = numduel(&["lots"]);
    assert!(!out.status.success());
}

#[test]
fn fifo_game_plays_every_round_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let dir_arg = dir.path().to_str().unwrap();

    let out = numduel(&[
        "20",
        "--rounds",
        "4",
        "--transport",
        "fifo",
        "--fifo-dir",
        dir_arg,
        "--seed",
        "11",
    ]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let rounds = round_lines(&stdout);
    assert_eq!(rounds.len(), 4, "stdout: {stdout}");
    assert!(rounds[0].contains("thinker"));
    assert!(rounds[1].contains("guesser"));
    assert!(stdout.contains("4 rounds"));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn seeded_games_repeat() {
    let run = || {
        let dir = tempfile::tempdir().unwrap();
        let out = numduel(&[
            "50",
            "--rounds",
            "3",
            "--transport",
            "fifo",
            "--fifo-dir",
            dir.path().to_str().unwrap(),
            "--seed",
            "5",
        ]);
        assert!(out.status.success());
        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        // Timings differ between runs; secrets and attempts must not.
        stdout
            .split_whitespace()
            .filter(|token| {
                let seconds = token.strip_suffix('s').map(str::parse::<f64>);
                !matches!(seconds, Some(Ok(_)))
            })
            .map(str::to_string)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[cfg(target_os = "linux")]
#[test]
fn signal_game_plays_every_round() {
    let out = numduel(&["8", "--rounds", "3", "--transport", "signal", "--seed", "2"]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert_eq!(round_lines(&stdout).len(), 3, "stdout: {stdout}");
}
