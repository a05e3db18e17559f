// src/session/view.rs

//! Read-only snapshot of the session for the presentation layer.

use crate::catalog::{Catalog, CatalogEntry};
use crate::present::assets::ImageHandle;
use crate::session::Phase;
use crate::types::{InstallState, RunKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub id: String,
    pub display_name: String,
    /// `None` means the shared default thumbnail.
    pub thumbnail: Option<ImageHandle>,
    pub run_kind: RunKind,
    pub install_state: InstallState,
}

impl From<&CatalogEntry> for EntryView {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            display_name: entry.display_name.clone(),
            thumbnail: entry.thumbnail.image().cloned(),
            run_kind: entry.run_kind,
            install_state: entry.install_state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub phase: Phase,
    /// Logo opacity; only meaningful while booting.
    pub boot_alpha: u8,
    pub entries: Vec<EntryView>,
    pub selected: usize,
    pub online: bool,
    /// Live notifications, oldest first.
    pub notifications: Vec<String>,
}

impl View {
    pub(crate) fn entries_of(catalog: &Catalog) -> Vec<EntryView> {
        catalog.iter().map(EntryView::from).collect()
    }

    pub fn selected_entry(&self) -> Option<&EntryView> {
        self.entries.get(self.selected)
    }

    /// Entry `offset` positions away from the selection, wrapping.
    pub fn neighbour(&self, offset: isize) -> Option<&EntryView> {
        let len = self.entries.len() as isize;
        if len == 0 {
            return None;
        }
        let index = (self.selected as isize + offset).rem_euclid(len);
        self.entries.get(index as usize)
    }
}
