//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `vocadeck` command rooted in `dir`, isolated from any user config.
fn vocadeck(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("vocadeck").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("VOCADECK_STORE")
        .env_remove("VOCADECK_CORPUS")
        .env_remove("RUST_LOG");
    cmd
}

fn write_corpus(dir: &Path, content: &str) {
    let corpus = dir.join("flashcards");
    std::fs::create_dir_all(&corpus).unwrap();
    std::fs::write(corpus.join("n5.md"), content).unwrap();
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    vocadeck(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created vocadeck.toml"))
        .stdout(predicate::str::contains("example.md"));

    assert!(dir.path().join("vocadeck.toml").exists());
    assert!(dir.path().join("flashcards/example.md").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    vocadeck(dir.path()).arg("init").assert().success();

    vocadeck(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn init_then_scan_reads_the_example() {
    let dir = TempDir::new().unwrap();
    vocadeck(dir.path()).arg("init").assert().success();

    vocadeck(dir.path())
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("5 imported"));
    assert!(dir.path().join("flashcard_data.json").exists());
}

#[test]
fn scan_reports_malformed_lines() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path(), "- 猫: cat [neko] [ねこ]\n- broken line\n- 犬: dog\n");

    vocadeck(dir.path())
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 imported"))
        .stdout(predicate::str::contains("n5.md:2: - broken line"))
        .stdout(predicate::str::contains("n5.md:3: - 犬: dog"));
}

#[test]
fn scan_json_output() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path(), "- 猫: cat [neko] [ねこ]\n- 犬: dog [inu] [いぬ]\n");

    let output = vocadeck(dir.path())
        .args(["scan", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["imported"], 2);
    assert_eq!(report["total"], 2);
}

#[test]
fn explicit_paths_override_defaults() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("words");
    std::fs::create_dir_all(&corpus).unwrap();
    std::fs::write(corpus.join("list.txt"), "- 水: water [mizu] [みず]\n").unwrap();
    let store = dir.path().join("data").join("store.json");

    vocadeck(dir.path())
        .arg("scan")
        .arg("--corpus")
        .arg(&corpus)
        .arg("--store")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 imported"));
    assert!(store.exists());
    assert!(!dir.path().join("flashcard_data.json").exists());
}

#[test]
fn env_overrides_store_path() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path(), "- 水: water [mizu] [みず]\n");

    vocadeck(dir.path())
        .env("VOCADECK_STORE", dir.path().join("env.json"))
        .arg("scan")
        .assert()
        .success();
    assert!(dir.path().join("env.json").exists());
}

#[test]
fn new_day_on_empty_store_points_at_scan() {
    let dir = TempDir::new().unwrap();

    vocadeck(dir.path())
        .arg("new-day")
        .assert()
        .success()
        .stdout(predicate::str::contains("vocadeck scan"));
}

#[test]
fn new_day_on_empty_store_syncs_the_corpus() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path(), "# Animals\n- 猫: cat [neko] [ねこ]\n- 犬: dog\n");

    vocadeck(dir.path())
        .arg("new-day")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 imported"))
        .stdout(predicate::str::contains("n5.md:3: - 犬: dog"))
        .stdout(predicate::str::contains("1 new"));

    let store = std::fs::read(dir.path().join("flashcard_data.json")).unwrap();
    let store: serde_json::Value = serde_json::from_slice(&store).unwrap();
    assert_eq!(store["study_deck"], serde_json::json!(["猫"]));
}

#[test]
fn study_on_empty_store_with_empty_corpus_stops() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path(), "Just notes, no entries yet.\n");

    vocadeck(dir.path())
        .arg("study")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 imported"))
        .stdout(predicate::str::contains("No entries found"))
        .stdout(predicate::str::contains("Study session complete!").not());
}

#[test]
fn full_session() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path(), "# Animals\n- 猫: cat [neko] [ねこ]\n");

    vocadeck(dir.path()).arg("scan").assert().success();
    vocadeck(dir.path())
        .arg("new-day")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 new"));

    vocadeck(dir.path())
        .args(["study", "--seed", "42"])
        .write_stdin("\nF\n\nf\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[neko] [ねこ]"))
        .stdout(predicate::str::contains("Mastered! 猫 moved to review."))
        .stdout(predicate::str::contains("Study session complete!"));

    vocadeck(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Review"))
        .stdout(predicate::str::contains("Last session: "));
}

#[test]
fn study_with_invalid_symbol_keeps_state() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path(), "- 猫: cat [neko] [ねこ]\n");
    vocadeck(dir.path()).arg("scan").assert().success();
    vocadeck(dir.path()).arg("new-day").assert().success();
    let before = std::fs::read_to_string(dir.path().join("flashcard_data.json")).unwrap();

    vocadeck(dir.path())
        .arg("study")
        .write_stdin("\nz\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown rating \"z\""))
        .stdout(predicate::str::contains("Stopped."));

    let after = std::fs::read_to_string(dir.path().join("flashcard_data.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn status_on_fresh_directory() {
    let dir = TempDir::new().unwrap();

    vocadeck(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No Deck"))
        .stdout(predicate::str::contains("Last session: never"));
}

#[test]
fn migrate_converts_legacy_store() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("flashcard_data.json"),
        r#"{"cards": {
            "n5.md|Animals|猫|cat|J2E": {"back": "cat [neko] [ねこ]", "ratings": ["D"], "deck": "study"},
            "n5.md|Animals|猫|cat|E2J": {"back": "猫 [neko] [ねこ]", "ratings": ["A"], "deck": "study"}
        }, "study_deck": ["n5.md|Animals|猫|cat|J2E"]}"#,
    )
    .unwrap();

    vocadeck(dir.path())
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted 2 legacy record(s) into 1 card(s)"));
    assert!(dir.path().join("flashcard_data.json.bak").exists());

    vocadeck(dir.path())
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to do"));
}

#[test]
fn migrate_missing_store_fails() {
    let dir = TempDir::new().unwrap();

    vocadeck(dir.path())
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();

    vocadeck(dir.path())
        .args(["status", "--config", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn config_file_sets_quotas() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path(), "- 一: one [ichi] [いち]\n- 二: two [ni] [に]\n- 三: three [san] [さん]\n");
    std::fs::write(dir.path().join("vocadeck.toml"), "[session]\nnew_cards = 2\n").unwrap();

    vocadeck(dir.path()).arg("scan").assert().success();
    vocadeck(dir.path())
        .arg("new-day")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 new"));
}

#[test]
fn help_output() {
    let dir = TempDir::new().unwrap();
    vocadeck(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Two-way vocabulary flashcard deck"));
}

#[test]
fn version_output() {
    let dir = TempDir::new().unwrap();
    vocadeck(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vocadeck"));
}
