//! Snapshot-based undo/redo
//!
//! Every mutation pushes a full copy of the pre-mutation store. The undo
//! stack is bounded (oldest evicted first); any new push clears redo.
//!
//! Author: Moroya Sakamoto

use std::collections::VecDeque;

use crate::store::TokenStore;

/// Default undo depth
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Bounded undo/redo stacks of store snapshots
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<TokenStore>,
    redo: Vec<TokenStore>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// History keeping at most `limit` undo entries (minimum 1)
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            undo: VecDeque::with_capacity(limit + 1),
            redo: Vec::new(),
            limit,
        }
    }

    /// Record the pre-mutation state. Clears the redo stack.
    pub fn push(&mut self, snapshot: &TokenStore) {
        self.push_undo(snapshot.clone());
        self.redo.clear();
    }

    fn push_undo(&mut self, snapshot: TokenStore) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Step back: returns the state to restore, stashing `current` for redo
    pub fn undo(&mut self, current: &TokenStore) -> Option<TokenStore> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current.clone());
        Some(previous)
    }

    /// Step forward: returns the state to restore, stashing `current` for undo
    pub fn redo(&mut self, current: &TokenStore) -> Option<TokenStore> {
        let next = self.redo.pop()?;
        self.push_undo(current.clone());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Undo entries held
    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

// ── Shortcut gating ────────────────────────────────────────────────────

/// History keyboard command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Undo,
    Redo,
}

/// Where keyboard focus currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Single-line text input
    TextInput,
    /// Multi-line text area
    TextArea,
    /// Rich-text / content-editable region
    ContentEditable,
    /// Anything that does not edit text
    Other,
}

impl Focus {
    /// Text fields own their native undo; store history must stay out
    #[inline]
    pub fn is_text_editing(self) -> bool {
        !matches!(self, Focus::Other)
    }
}

/// Should a history shortcut reach the store given the current focus?
pub fn shortcut_applies(focus: Focus) -> bool {
    !focus.is_text_editing()
}
