//! Snapshot-based undo/redo over presentation content.
//!
//! - `past` holds deep copies of the content *before* each logical edit
//! - `future` holds content that was undone
//! - Pushing a new entry clears `future` (new branch)
//! - `past` is bounded; the oldest entries are dropped first
//!
//! # Usage
//!
//! ```ignore
//! let mut history = HistoryManager::new(50);
//!
//! // On focus of an editable field, before the edit begins
//! history.push("Edit slide title", current.clone());
//!
//! // Undo hands back the content to restore and keeps `current` for redo
//! if let Some(previous) = history.undo(current) {
//!     store.replace_content(previous);
//! }
//! ```

use std::collections::VecDeque;
use std::time::Instant;

use narrator_common::PresentationData;

/// Default maximum undo depth.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A single entry in the undo/redo history.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// Human-readable label describing the edit (e.g. "Edit slide title").
    pub label: String,
    pub snapshot: PresentationData,
    pub timestamp: Instant,
}

impl HistoryEntry {
    fn new(label: impl Into<String>, snapshot: PresentationData) -> Self {
        Self {
            label: label.into(),
            snapshot,
            timestamp: Instant::now(),
        }
    }
}

/// Bounded undo/redo stacks of [`PresentationData`] snapshots.
#[derive(Debug)]
pub struct HistoryManager {
    past: VecDeque<HistoryEntry>,
    future: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryManager {
    pub fn new(max_entries: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record the content as it is *before* an edit.
    pub fn push(&mut self, label: &str, snapshot: PresentationData) {
        self.future.clear();
        self.past.push_back(HistoryEntry::new(label, snapshot));
        self.trim();

        tracing::debug!(label, undo_depth = self.past.len(), "History entry pushed");
    }

    /// Step back one entry. `current` is kept on the redo stack and the
    /// snapshot to restore is returned. `None` when there is nothing to undo.
    pub fn undo(&mut self, current: PresentationData) -> Option<PresentationData> {
        let entry = self.past.pop_back()?;
        tracing::debug!(
            label = %entry.label,
            undo_remaining = self.past.len(),
            "Undo"
        );
        self.future.push(HistoryEntry::new(entry.label, current));
        Some(entry.snapshot)
    }

    /// Mirror of [`undo`](Self::undo).
    pub fn redo(&mut self, current: PresentationData) -> Option<PresentationData> {
        let entry = self.future.pop()?;
        tracing::debug!(
            label = %entry.label,
            redo_remaining = self.future.len(),
            "Redo"
        );
        self.past.push_back(HistoryEntry::new(entry.label, current));
        self.trim();
        Some(entry.snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Label of the edit that would be undone next.
    pub fn undo_label(&self) -> Option<&str> {
        self.past.back().map(|e| e.label.as_str())
    }

    /// Label of the edit that would be redone next.
    pub fn redo_label(&self) -> Option<&str> {
        self.future.last().map(|e| e.label.as_str())
    }

    pub fn undo_count(&self) -> usize {
        self.past.len()
    }

    pub fn redo_count(&self) -> usize {
        self.future.len()
    }

    pub fn clear(&mut self) {
        if self.past.is_empty() && self.future.is_empty() {
            return;
        }
        self.past.clear();
        self.future.clear();
        tracing::debug!("History cleared");
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Change the depth limit, dropping the oldest entries if needed.
    pub fn set_max_entries(&mut self, max: usize) {
        self.max_entries = max.max(1);
        self.trim();
    }

    fn trim(&mut self) {
        while self.past.len() > self.max_entries {
            self.past.pop_front();
        }
    }
}
