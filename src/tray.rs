//! Tray menu entries and selection routing.
//!
//! Rendering the icon and the native menu belongs to the shell that embeds
//! this crate. This module owns the ordered entry list and turns selections
//! into [`TrayEvent`]s for the loop.

use crate::event::TrayEvent;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Title that inserts a separator instead of an item.
pub const SEPARATOR: &str = "-";

/// One entry of the tray menu.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrayMenuEntry {
    Item { title: String, id: i32 },
    Separator { id: i32 },
}

impl TrayMenuEntry {
    pub fn id(&self) -> i32 {
        match self {
            TrayMenuEntry::Item { id, .. } | TrayMenuEntry::Separator { id } => *id,
        }
    }

    /// `None` for separators.
    pub fn title(&self) -> Option<&str> {
        match self {
            TrayMenuEntry::Item { title, .. } => Some(title),
            TrayMenuEntry::Separator { .. } => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, TrayMenuEntry::Separator { .. })
    }
}

/// Entries in insertion order. Ids are not checked for uniqueness.
#[derive(Debug, Clone, Default)]
pub struct TrayMenu {
    entries: Vec<TrayMenuEntry>,
}

impl TrayMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; `"-"` appends a separator.
    pub fn add_item(&mut self, title: &str, id: i32) {
        let entry = if title == SEPARATOR {
            TrayMenuEntry::Separator { id }
        } else {
            TrayMenuEntry::Item {
                title: title.to_owned(),
                id,
            }
        };
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TrayMenuEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a selection by menu id. Only items are selectable.
    pub fn select(&self, id: i32) -> Option<TrayEvent> {
        self.entries
            .iter()
            .find(|e| !e.is_separator() && e.id() == id)
            .map(|e| TrayEvent { menu_id: e.id() })
    }

    /// Resolve a selection by position in the menu.
    pub fn select_index(&self, index: usize) -> Option<TrayEvent> {
        match self.entries.get(index)? {
            TrayMenuEntry::Item { id, .. } => Some(TrayEvent { menu_id: *id }),
            TrayMenuEntry::Separator { .. } => None,
        }
    }
}
