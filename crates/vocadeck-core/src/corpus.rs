//! Plain-text corpus parser.
//!
//! A corpus is a directory of `.md` / `.txt` files. Each entry line has the
//! shape
//!
//! ```text
//! - <source term>: <target term> [<pronunciation>] [<orthographic aid>]
//! ```
//!
//! and `#` lines are headings that set the category of the entries below
//! them. Both bracket groups are required; any other `-` line is reported as
//! malformed. Everything else is prose and is ignored.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::model::Card;

/// Appended to a derived id until it no longer collides.
pub const DUPLICATE_MARKER: char = '*';

/// File extensions read from a corpus directory.
const CORPUS_EXTENSIONS: &[&str] = &["md", "txt"];

fn entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^-\s*(.+?):\s*(.+?)\s*\[(.+?)\]\s*\[(.+?)\]").expect("entry pattern is valid")
    })
}

/// One `- source: target [pron] [aid]` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub term_source: String,
    pub term_target: String,
    pub pronunciation: String,
    pub orthographic_aid: String,
}

/// An entry-looking line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEntry {
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    pub text: String,
}

/// Result of one parse pass over a corpus.
#[derive(Debug, Clone, Default)]
pub struct ParsedCorpus {
    /// Candidate cards in corpus order, ids unique within the pass.
    pub cards: Vec<Card>,
    pub malformed: Vec<MalformedEntry>,
}

/// Hands out ids derived from a term, disambiguated against every id it has
/// seen so far.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    taken: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an id as used without deriving it.
    pub fn reserve(&mut self, id: &str) -> bool {
        self.taken.insert(id.to_string())
    }

    /// Derive a unique id from `term`, appending [`DUPLICATE_MARKER`] as
    /// often as needed.
    pub fn assign(&mut self, term: &str) -> String {
        let mut id = term.trim().to_string();
        while self.taken.contains(&id) {
            id.push(DUPLICATE_MARKER);
        }
        self.taken.insert(id.clone());
        id
    }
}

/// Parse a single entry line. Returns `None` if the line is not a well-formed entry.
pub fn parse_entry_line(line: &str) -> Option<CorpusEntry> {
    let caps = entry_regex().captures(line.trim())?;
    let non_empty = |i: usize| {
        caps.get(i)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };
    Some(CorpusEntry {
        term_source: non_empty(1)?,
        term_target: non_empty(2)?,
        pronunciation: non_empty(3)?,
        orthographic_aid: non_empty(4)?,
    })
}

/// Parse the contents of one corpus file, appending to `out`.
pub fn parse_corpus_str(
    content: &str,
    source_path: &Path,
    ids: &mut IdAllocator,
    out: &mut ParsedCorpus,
) {
    let mut category: Option<String> = None;

    for (n, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(heading) = line.strip_prefix('#') {
            let heading = heading.trim_start_matches('#').trim();
            category = (!heading.is_empty()).then(|| heading.to_string());
            continue;
        }
        if !line.starts_with('-') {
            continue;
        }

        match parse_entry_line(line) {
            Some(entry) => {
                let id = ids.assign(&entry.term_source);
                let mut card = Card::new(id, entry.term_source, entry.term_target);
                card.pronunciation = Some(entry.pronunciation);
                card.orthographic_aid = Some(entry.orthographic_aid);
                card.category.clone_from(&category);
                out.cards.push(card);
            }
            None => {
                tracing::warn!(
                    "{}:{}: skipping malformed entry: {}",
                    source_path.display(),
                    n + 1,
                    line
                );
                out.malformed.push(MalformedEntry {
                    file: source_path.to_path_buf(),
                    line: n + 1,
                    text: line.to_string(),
                });
            }
        }
    }
}

/// Parse every corpus file directly inside `dir`, in file-name order.
///
/// A missing directory yields an empty corpus.
pub fn load_corpus_directory(dir: &Path) -> Result<ParsedCorpus> {
    let mut parsed = ParsedCorpus::default();

    if !dir.is_dir() {
        tracing::warn!("corpus directory not found: {}", dir.display());
        return Ok(parsed);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read corpus directory: {}", dir.display()))?
    {
        let path = entry?.path();
        let is_corpus_file = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| CORPUS_EXTENSIONS.contains(&ext));
        if path.is_file() && is_corpus_file {
            files.push(path);
        }
    }
    files.sort();

    let mut ids = IdAllocator::new();
    for path in &files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read corpus file: {}", path.display()))?;
        parse_corpus_str(&content, path, &mut ids, &mut parsed);
    }

    tracing::debug!(
        "parsed {} entries from {} corpus file(s)",
        parsed.cards.len(),
        files.len()
    );
    Ok(parsed)
}
