//! Store file persistence.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::migration::{read_document, upgrade, StoreDocument, UpgradeReport};
use crate::store::Store;

/// Serialize with four-space indentation, keeping non-ASCII text literal.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .context("failed to serialize store")?;
    String::from_utf8(buf).context("serialized store is not valid UTF-8")
}

/// A store read from disk, with what had to be done to it on the way in.
#[derive(Debug, Clone)]
pub struct LoadedStore {
    pub store: Store,
    /// Set when a legacy document was upgraded (and written back).
    pub upgraded: Option<UpgradeReport>,
    /// Set when a current document broke a structural invariant and was repaired.
    pub repaired: bool,
}

/// The JSON file a store lives in.
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store.
    ///
    /// A missing file is an empty store. A legacy document is upgraded and
    /// the result saved immediately, so the upgrade happens once.
    pub fn load(&self) -> Result<LoadedStore> {
        if !self.path.exists() {
            tracing::debug!("no store at {}, starting empty", self.path.display());
            return Ok(LoadedStore {
                store: Store::new(),
                upgraded: None,
                repaired: false,
            });
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read store from {}", self.path.display()))?;
        let document = read_document(&content)
            .with_context(|| format!("failed to load store from {}", self.path.display()))?;

        match document {
            StoreDocument::V2(mut store) => {
                let repaired = store.normalize();
                Ok(LoadedStore {
                    store,
                    upgraded: None,
                    repaired,
                })
            }
            StoreDocument::V1(legacy) => {
                tracing::info!("upgrading legacy store at {}", self.path.display());
                let (store, report) = upgrade(legacy);
                self.save(&store)?;
                Ok(LoadedStore {
                    store,
                    upgraded: Some(report),
                    repaired: false,
                })
            }
        }
    }

    /// Write the whole store, replacing the file.
    pub fn save(&self, store: &Store) -> Result<()> {
        let json = to_pretty_json(store)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write store to {}", self.path.display()))?;
        Ok(())
    }
}
