// src/catalog/model.rs

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::present::assets::ImageHandle;
use crate::types::{InstallState, RunKind};

/// Entry identifier: the entry's directory name.
pub type EntryId = String;

/// Result of thumbnail resolution at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    /// No thumbnail configured; the shared default is shown.
    None,
    Loaded(ImageHandle),
    /// Configured but unloadable; the shared default is shown instead.
    Fallback { requested: PathBuf, reason: String },
}

impl Thumbnail {
    pub fn image(&self) -> Option<&ImageHandle> {
        match self {
            Thumbnail::Loaded(img) => Some(img),
            _ => None,
        }
    }
}

/// One runnable application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub display_name: String,
    /// Entry directory (`<root>/<id>`).
    pub dir: PathBuf,
    /// `main.py` or `main.bin` inside `dir`.
    pub launch_target: PathBuf,
    pub thumbnail: Thumbnail,
    pub run_kind: RunKind,
    pub requires_isolated_env: bool,
    /// Normalized `major.minor`, if the entry pins one.
    pub requested_runtime_version: Option<String>,
    /// Dependency manifest, if the entry ships one.
    pub manifest: Option<PathBuf>,
    pub install_state: InstallState,
}

impl CatalogEntry {
    /// Whether running this entry must go through provisioning first.
    pub fn needs_install(&self) -> bool {
        self.requires_isolated_env && self.install_state.needs_install()
    }
}

/// Ordered, never-empty collection of entries. Insertion order is display
/// order.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog; returns `None` for an empty list or duplicate ids.
    pub fn new(entries: Vec<CatalogEntry>) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.id == entry.id) {
                warn!(entry = %entry.id, "duplicate entry id");
                return None;
            }
        }
        Some(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn at(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    /// Move an entry along its install lifecycle.
    ///
    /// Illegal transitions are logged and ignored; returns whether the state
    /// changed.
    pub fn set_install_state(&mut self, id: &str, next: InstallState) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            warn!(entry = %id, "install state update for unknown entry");
            return false;
        };
        if !entry.install_state.can_transition_to(next) {
            warn!(
                entry = %id,
                from = ?entry.install_state,
                to = ?next,
                "rejected install state transition"
            );
            return false;
        }
        debug!(entry = %id, from = ?entry.install_state, to = ?next, "install state");
        entry.install_state = next;
        true
    }
}
