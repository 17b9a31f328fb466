//! Store format migration.
//!
//! Current store documents carry `"version": 2`. Anything without a version
//! is a V1 document written by an older release, in one of two shapes:
//!
//! - one record per direction, keyed by a composite id
//!   `<file>|<category>|<source>|<target>|<direction>`, with flat `ratings`,
//!   `skill`, `struggle` and `last_study` fields and sometimes only a `back`
//!   text like `cat [neko] [ねこ]` instead of explicit terms;
//! - one record per pair with per-direction maps and `jp`/`en`/`pron`/`hira`
//!   display fields.
//!
//! [`upgrade`] turns either into a current [`Store`] without losing rating
//! history. It runs transparently at load time (see [`crate::persist`]) and
//! as the one-shot [`repair_file`] tool.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

use crate::corpus::IdAllocator;
use crate::model::{Card, Deck, Direction, PerDirection, Rating};
use crate::persist::to_pretty_json;
use crate::store::{deserialize_ordered, Store, CURRENT_VERSION};

/// Joins the segments of a V1 composite id.
pub const LEGACY_DELIMITER: char = '|';

/// Suffix appended to the original file by [`repair_file`].
pub const BACKUP_SUFFIX: &str = ".bak";

/// A V1 field that is either a single value for the card's recorded
/// direction or already split per direction.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub enum LegacyField<T> {
    // tried first: a derived struct would also accept `[]` as a sequence
    Flat(T),
    Split(PerDirection<T>),
}

/// A card as written by a V1 release. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyCard {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub jp: Option<String>,
    #[serde(default)]
    pub en: Option<String>,
    #[serde(default)]
    pub pron: Option<String>,
    #[serde(default)]
    pub hira: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub deck: Option<Deck>,
    #[serde(default)]
    pub ratings: Option<LegacyField<Vec<Rating>>>,
    #[serde(default)]
    pub skill: Option<LegacyField<i32>>,
    #[serde(default)]
    pub struggle: Option<LegacyField<u32>>,
    #[serde(default)]
    pub last_study: Option<LegacyField<Option<f64>>>,
}

/// A V1 store document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyStore {
    #[serde(default, deserialize_with = "deserialize_ordered")]
    pub cards: Vec<(String, LegacyCard)>,
    #[serde(default)]
    pub study_deck: Vec<String>,
    #[serde(default)]
    pub last_session: Option<String>,
}

/// A store document of either version.
#[derive(Debug, Clone)]
pub enum StoreDocument {
    V1(LegacyStore),
    V2(Store),
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<u32>,
}

/// Parse a store document, dispatching on its version field.
pub fn read_document(content: &str) -> Result<StoreDocument> {
    let probe: VersionProbe =
        serde_json::from_str(content).context("store is not a JSON object")?;
    match probe.version {
        None => Ok(StoreDocument::V1(
            serde_json::from_str(content).context("failed to parse legacy store")?,
        )),
        Some(CURRENT_VERSION) => Ok(StoreDocument::V2(
            serde_json::from_str(content).context("failed to parse store")?,
        )),
        Some(other) => anyhow::bail!(
            "unsupported store version {other} (this build reads up to {CURRENT_VERSION})"
        ),
    }
}

/// `true` if a V1 card already has per-direction history and a plain id.
pub fn is_current_shape(id: &str, card: &LegacyCard) -> bool {
    matches!(card.ratings, Some(LegacyField::Split(_))) && !id.contains(LEGACY_DELIMITER)
}

/// What an upgrade did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReport {
    /// Records in the V1 document.
    pub legacy_cards: usize,
    /// Cards in the upgraded store.
    pub cards: usize,
    /// Records that were not already in the current shape.
    pub rewritten: usize,
}

/// Segments of a composite id.
struct CompositeId<'a> {
    category: &'a str,
    source: &'a str,
    target: &'a str,
    direction: Option<Direction>,
}

fn split_composite(id: &str) -> Option<CompositeId<'_>> {
    let parts: Vec<&str> = id.split(LEGACY_DELIMITER).collect();
    if parts.len() < 5 {
        return None;
    }
    Some(CompositeId {
        category: parts[1],
        source: parts[2],
        target: parts[3],
        direction: parts[4].parse().ok(),
    })
}

/// `term [pronunciation] [aid]` as stored in a V1 `back` field.
fn parse_back(back: &str) -> Option<(String, String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(.+?)\s*\[(.+?)\]\s*\[(.+?)\]").expect("back pattern is valid")
    });
    let caps = re.captures(back.trim())?;
    Some((
        caps[1].trim().to_string(),
        caps[2].to_string(),
        caps[3].to_string(),
    ))
}

/// Spread a V1 field into per-direction values.
///
/// Flat values belong to `direction`. Split values are kept whole unless
/// `own_slot_only` is set, in which case only the `direction` slot survives.
fn spread<T: Default>(
    field: Option<LegacyField<T>>,
    direction: Direction,
    own_slot_only: bool,
) -> PerDirection<T> {
    match field {
        None => PerDirection::default(),
        Some(LegacyField::Flat(value)) => PerDirection::only(direction, value),
        Some(LegacyField::Split(mut split)) if own_slot_only => {
            PerDirection::only(direction, std::mem::take(&mut split[direction]))
        }
        Some(LegacyField::Split(split)) => split,
    }
}

/// How a recovered V1 record enters the upgraded store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Plain id, kept as is.
    Keep,
    /// Whole card under a delimited id; gets a fresh id.
    Rename,
    /// History of one recorded direction, merged with its sibling record.
    Slot(Direction),
}

/// A V1 record with everything recoverable pulled out.
struct Recovered {
    old_id: String,
    placement: Placement,
    card: Card,
}

fn recover(key: String, legacy: LegacyCard) -> Recovered {
    let delimited = key.contains(LEGACY_DELIMITER);
    let segments = split_composite(&key);
    let recorded = legacy
        .direction
        .or_else(|| segments.as_ref().and_then(|s| s.direction));
    let direction = recorded.unwrap_or(Direction::J2E);
    let placement = match (delimited, recorded) {
        (false, _) => Placement::Keep,
        (true, Some(d)) => Placement::Slot(d),
        (true, None) => Placement::Rename,
    };
    let own_slot_only = matches!(placement, Placement::Slot(_));

    let mut jp = legacy.jp;
    let mut en = legacy.en;
    let mut pron = legacy.pron;
    let mut hira = legacy.hira;

    if jp.is_none() || en.is_none() {
        if let Some(seg) = &segments {
            let mut derived_jp = seg.source.to_string();
            let mut derived_en = seg.target.to_string();
            if let Some((term, p, h)) = legacy.back.as_deref().and_then(parse_back) {
                match direction {
                    Direction::J2E => derived_en = term,
                    Direction::E2J => derived_jp = term,
                }
                pron.get_or_insert(p);
                hira.get_or_insert(h);
            }
            jp.get_or_insert(derived_jp);
            en.get_or_insert(derived_en);
        } else if delimited {
            let mut parts = key.split(LEGACY_DELIMITER).map(str::trim);
            if let Some(source) = parts.next().filter(|p| !p.is_empty()) {
                jp.get_or_insert_with(|| source.to_string());
            }
            if let Some(target) = parts.next().filter(|p| !p.is_empty()) {
                en.get_or_insert_with(|| target.to_string());
            }
        }
    }

    let term_source = jp.unwrap_or_else(|| {
        tracing::warn!("legacy card {key:?} has no recoverable source term, using its id");
        key.clone()
    });
    let term_target = en.unwrap_or_else(|| {
        tracing::warn!("legacy card {key:?} has no recoverable target term");
        String::new()
    });
    let category = legacy.category.or_else(|| {
        segments
            .as_ref()
            .map(|s| s.category.to_string())
            .filter(|c| !c.is_empty())
    });

    let mut card = Card::new(key.clone(), term_source, term_target);
    card.pronunciation = pron;
    card.orthographic_aid = hira;
    card.category = category;
    card.deck = legacy.deck.unwrap_or_default();
    card.ratings = spread(legacy.ratings, direction, own_slot_only);
    card.struggle = spread(legacy.struggle, direction, own_slot_only);
    card.last_study = spread(legacy.last_study, direction, own_slot_only);
    // stored skill is ignored, it is rederived from the window
    card.rederive_skill();

    Recovered {
        old_id: key,
        placement,
        card,
    }
}

/// Convert a V1 document into a current store.
///
/// Per-direction records of the same pair are merged into one card with a
/// fresh id derived from the source term. Whole cards under a delimited id
/// with no recorded direction keep both directions and get a fresh id the
/// same way. Study-deck ids are remapped and the structural invariants
/// re-established.
pub fn upgrade(legacy: LegacyStore) -> (Store, UpgradeReport) {
    let legacy_cards = legacy.cards.len();
    let rewritten = legacy
        .cards
        .iter()
        .filter(|(id, card)| !is_current_shape(id, card))
        .count();

    let recovered: Vec<Recovered> = legacy
        .cards
        .into_iter()
        .map(|(key, card)| recover(key, card))
        .collect();

    let mut ids = IdAllocator::new();
    for r in recovered.iter().filter(|r| r.placement == Placement::Keep) {
        ids.reserve(&r.old_id);
    }

    let mut cards: Vec<Card> = Vec::with_capacity(recovered.len());
    let mut filled: Vec<PerDirection<bool>> = Vec::with_capacity(recovered.len());
    let mut pairs: HashMap<(String, String), Vec<usize>> = HashMap::new();
    let mut id_map: HashMap<String, String> = HashMap::new();

    for r in recovered {
        let Recovered {
            old_id,
            placement,
            card: mut part,
        } = r;
        let direction = match placement {
            Placement::Keep => {
                id_map.insert(old_id, part.id.clone());
                cards.push(part);
                filled.push(PerDirection::new(true, true));
                continue;
            }
            Placement::Rename => {
                part.id = ids.assign(&part.term_source);
                id_map.insert(old_id, part.id.clone());
                cards.push(part);
                filled.push(PerDirection::new(true, true));
                continue;
            }
            Placement::Slot(direction) => direction,
        };

        let group = pairs
            .entry((part.term_source.clone(), part.term_target.clone()))
            .or_default();
        let slot = group.iter().copied().find(|&i| !filled[i][direction]);
        let idx = match slot {
            Some(i) => i,
            None => {
                let mut merged = Card::new(
                    ids.assign(&part.term_source),
                    part.term_source.clone(),
                    part.term_target.clone(),
                );
                merged.category = part.category.take();
                cards.push(merged);
                filled.push(PerDirection::default());
                group.push(cards.len() - 1);
                cards.len() - 1
            }
        };

        let target = &mut cards[idx];
        target.ratings[direction] = std::mem::take(&mut part.ratings[direction]);
        target.struggle[direction] = part.struggle[direction];
        target.last_study[direction] = part.last_study[direction];
        target.rederive_skill();
        if part.deck != Deck::NoDeck {
            target.deck = part.deck;
        }
        if target.pronunciation.is_none() {
            target.pronunciation = part.pronunciation.take();
        }
        if target.orthographic_aid.is_none() {
            target.orthographic_aid = part.orthographic_aid.take();
        }
        filled[idx][direction] = true;
        id_map.insert(old_id, target.id.clone());
    }

    let mut store = Store::new();
    store.cards = cards.into_iter().collect();
    for old in &legacy.study_deck {
        match id_map.get(old) {
            Some(new) if !store.study_deck.contains(new) => store.study_deck.push(new.clone()),
            Some(_) => {}
            None => tracing::warn!("study deck lists unknown legacy id {old:?}, dropping it"),
        }
    }
    store.last_session = legacy.last_session.as_deref().and_then(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| tracing::warn!("ignoring unreadable last_session {s:?}: {e}"))
            .ok()
    });
    store.normalize();

    let report = UpgradeReport {
        legacy_cards,
        cards: store.cards.len(),
        rewritten,
    };
    tracing::info!(
        "upgraded legacy store: {} record(s) -> {} card(s), {} rewritten",
        report.legacy_cards,
        report.cards,
        report.rewritten
    );
    (store, report)
}

/// Outcome of [`repair_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Nothing to do; the file was left alone.
    AlreadyCurrent,
    /// The file was rewritten and the original kept at `backup`.
    Converted {
        report: UpgradeReport,
        backup: PathBuf,
    },
}

/// Path the original store is moved to by [`repair_file`].
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// One-shot repair of a standalone store file.
///
/// Refuses (returns [`RepairOutcome::AlreadyCurrent`]) when the document is
/// V2 or every V1 card is already in the current shape. Otherwise the
/// upgraded store is written to a temporary file next to `path`, the original
/// is renamed to `<path>.bak`, and the temporary file takes its place.
pub fn repair_file(path: &Path) -> Result<RepairOutcome> {
    if !path.exists() {
        anyhow::bail!("store file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read store: {}", path.display()))?;

    let legacy = match read_document(&content)
        .with_context(|| format!("failed to parse store: {}", path.display()))?
    {
        StoreDocument::V2(_) => return Ok(RepairOutcome::AlreadyCurrent),
        StoreDocument::V1(legacy)
            if legacy
                .cards
                .iter()
                .all(|(id, card)| is_current_shape(id, card)) =>
        {
            return Ok(RepairOutcome::AlreadyCurrent)
        }
        StoreDocument::V1(legacy) => legacy,
    };

    let (store, report) = upgrade(legacy);
    let json = to_pretty_json(&store)?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;

    let backup = backup_path(path);
    std::fs::rename(path, &backup)
        .with_context(|| format!("failed to back up store to {}", backup.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to write store: {}", path.display()))?;

    Ok(RepairOutcome::Converted { report, backup })
}
