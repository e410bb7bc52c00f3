//! Command-line interface

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn dissatisfied(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dissatisfied").expect("binary not built");
    cmd.arg("--data-dir").arg(dir.path());
    cmd
}

#[test]
fn test_classify_urls() {
    let dir = TempDir::new().unwrap();
    let cases = [
        ("https://www.youtube.com/watch?v=abc", "youtube\n"),
        ("https://youtu.be/abc", "youtube\n"),
        ("https://www.youtube.com/shorts/abc", "none\n"),
        ("https://x.com/home", "twitter\n"),
        ("not a url", "none\n"),
    ];
    for (url, expected) in cases {
        dissatisfied(&dir)
            .args(["classify", url])
            .assert()
            .success()
            .stdout(expected);
    }
}

#[test]
fn test_settings_set_clamps_and_persists() {
    let dir = TempDir::new().unwrap();
    dissatisfied(&dir)
        .args(["settings", "set", "twitter_width", "200"])
        .assert()
        .success()
        .stdout("twitter_width = 100\n");

    dissatisfied(&dir)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("twitter_width = 100"))
        .stdout(predicate::str::contains("youtube_persistence_mode = \"tab\""));
}

#[test]
fn test_settings_set_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    dissatisfied(&dir)
        .args(["settings", "set", "volume", "11"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting: volume"));
}

#[test]
fn test_settings_set_rejects_malformed_value() {
    let dir = TempDir::new().unwrap();
    dissatisfied(&dir)
        .args(["settings", "set", "twitter_width", "60"])
        .assert()
        .success();

    dissatisfied(&dir)
        .args(["settings", "set", "twitter_width", "\"wide\""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value for twitter_width"));

    dissatisfied(&dir)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("twitter_width = 60"));
}

#[test]
fn test_simulate_global_mode() {
    let dir = TempDir::new().unwrap();
    dissatisfied(&dir)
        .args(["simulate", "--site", "twitter", "--mode", "global"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"badge\": \"ON\""))
        .stdout(predicate::str::contains("\"badge\": \"OFF\"").not());
}
