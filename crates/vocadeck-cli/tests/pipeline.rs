//! Library pipeline tests: corpus sync → new day → drill → resync → migrate.

use std::path::Path;

use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use vocadeck_core::config::SessionConfig;
use vocadeck_core::migration::{repair_file, RepairOutcome};
use vocadeck_core::model::{Deck, Rating};
use vocadeck_core::persist::StoreFile;
use vocadeck_core::scheduler::Presentation;
use vocadeck_core::session::{FixedClock, StudySession};

fn open(path: &Path, seed: u64) -> StudySession<StdRng, FixedClock> {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
    StudySession::open_with(path, StdRng::seed_from_u64(seed), clock).unwrap()
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn learn_resync_and_review() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("flashcards");
    let store_path = dir.path().join("flashcard_data.json");
    write(
        &corpus.join("01-animals.md"),
        "# Animals\n- 猫: cat [neko] [ねこ]\n- 犬: dog [inu] [いぬ]\n",
    );
    write(&corpus.join("02-food.md"), "# Food\n- 米: rice [kome] [こめ]\n- 水: water [mizu] [みず]\n");

    let mut session = open(&store_path, 11);
    assert_eq!(session.sync(&corpus).unwrap().imported, 4);

    let config = SessionConfig {
        new_cards: 3,
        review_cards: 10,
        ..Default::default()
    };
    let summary = session.assemble_session(&config).unwrap();
    assert_eq!(summary.new_cards, vec!["猫", "犬", "米"]);

    // struggle on the first presentation, breeze through everything else
    let mut first = true;
    loop {
        match session.pick_presentation().unwrap().presentation {
            Presentation::SessionOver => break,
            Presentation::Card { id, direction } => {
                let rating = if first { Rating::A } else { Rating::F };
                first = false;
                session.apply_rating(&id, direction, rating).unwrap();
            }
        }
    }
    drop(session);

    let counts = StoreFile::new(&store_path).load().unwrap().store.counts();
    assert_eq!((counts.study, counts.review, counts.no_deck), (0, 3, 1));

    // editing the corpus keeps progress, removing an entry drops the card
    write(
        &corpus.join("01-animals.md"),
        "# Pets\n- 猫: kitty [neko] [ねこ]\n",
    );
    let mut session = open(&store_path, 12);
    let report = session.sync(&corpus).unwrap();
    assert_eq!(report.removed, 1);
    let cat = session.store().cards.get("猫").unwrap();
    assert_eq!(cat.term_target, "kitty");
    assert_eq!(cat.category.as_deref(), Some("Pets"));
    assert_eq!(cat.deck, Deck::Review);

    // the next day pulls the last unseen card and the review cards back in
    let summary = session.assemble_session(&config).unwrap();
    assert_eq!(summary.new_cards, vec!["水"]);
    assert_eq!(summary.review_cards.len(), 2);
    assert_eq!(session.store().study_deck.len(), 3);
    assert!(session.store().invariant_violations().is_empty());
}

#[test]
fn legacy_store_upgrades_then_studies() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("flashcard_data.json");
    write(
        &store_path,
        r#"{
    "cards": {
        "n5.md|Animals|猫|cat|J2E": {"back": "cat [neko] [ねこ]", "ratings": ["F"], "struggle": 0, "deck": "study", "last_study": 1700000000.0},
        "n5.md|Animals|猫|cat|E2J": {"back": "猫 [neko] [ねこ]", "ratings": ["D"], "struggle": 1, "deck": "study", "last_study": 1700000500.0},
        "n5.md|Animals|犬|dog|J2E": {"back": "dog [inu] [いぬ]", "ratings": [], "deck": "review"}
    },
    "study_deck": ["n5.md|Animals|猫|cat|J2E", "n5.md|Animals|猫|cat|E2J"],
    "last_session": "2023-11-14"
}"#,
    );

    let mut session = open(&store_path, 5);
    let report = session.upgraded().cloned().expect("legacy store should upgrade");
    assert_eq!(report.cards, 2);
    assert_eq!(session.store().study_deck, vec!["猫"]);

    // only the E2J direction is still below mastery
    let pick = session.pick_presentation().unwrap();
    match pick.presentation {
        Presentation::Card { id, direction } => {
            assert_eq!(id, "猫");
            assert_eq!(direction.to_string(), "E2J");
            let outcome = session.apply_rating(&id, direction, Rating::F).unwrap();
            assert!(outcome.promoted);
        }
        Presentation::SessionOver => panic!("study deck should not be empty"),
    }

    // the upgraded file is already current, so the repair tool refuses
    assert_eq!(repair_file(&store_path).unwrap(), RepairOutcome::AlreadyCurrent);
    assert!(!dir.path().join("flashcard_data.json.bak").exists());
}

#[test]
fn converted_store_survives_a_resync() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("flashcards");
    let store_path = dir.path().join("flashcard_data.json");
    write(&corpus.join("n5.md"), "# Animals\n- 猫: cat [neko] [ねこ]\n");
    write(
        &store_path,
        r#"{
    "cards": {
        "猫|cat": {
            "jp": "猫", "en": "cat", "deck": "study",
            "ratings": {"J2E": ["D"], "E2J": ["A", "S"]},
            "struggle": {"J2E": 0, "E2J": 4},
            "last_study": {"J2E": 10.0, "E2J": 20.0}
        }
    },
    "study_deck": ["猫|cat"],
    "last_session": null
}"#,
    );

    let mut session = open(&store_path, 3);
    assert!(session.upgraded().is_some());
    let report = session.sync(&corpus).unwrap();
    assert_eq!((report.imported, report.removed), (0, 0));
    assert!(report.dropped.is_empty());
    drop(session);

    let store = StoreFile::new(&store_path).load().unwrap().store;
    assert_eq!(store.cards.len(), 1);
    let cat = store.cards.get("猫").unwrap();
    assert_eq!(cat.deck, Deck::Study);
    assert_eq!(cat.ratings.j2e, vec![Rating::D]);
    assert_eq!(cat.ratings.e2j, vec![Rating::A, Rating::S]);
    assert_eq!((cat.struggle.j2e, cat.struggle.e2j), (0, 4));
    assert_eq!(cat.last_study.j2e, Some(10.0));
    assert_eq!(cat.last_study.e2j, Some(20.0));
    assert_eq!(cat.category.as_deref(), Some("Animals"));
    assert_eq!(store.study_deck, vec!["猫"]);
}
