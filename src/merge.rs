//! 3-way snapshot merge
//!
//! Compares a local and a remote snapshot against their common base.
//! Items changed on one side only merge cleanly; items changed on both
//! sides conflict unless both sides made the identical change. Only the
//! data model lives here; transport is the caller's concern.
//!
//! Author: Moroya Sakamoto

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::diff::{diff, ChangeType, DesignSystemSnapshot, DiffItem};

/// Which item list a conflict belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Token,
    Component,
}

/// Merge conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ItemKind,
    /// Item id with conflicting edits
    pub id: String,
    pub name: String,
    /// Change made locally
    pub local: DiffItem,
    /// Change made remotely
    pub remote: DiffItem,
}

impl Conflict {
    /// Human-readable reason
    pub fn description(&self) -> String {
        match (self.local.change_type, self.remote.change_type) {
            (ChangeType::Deleted, _) | (_, ChangeType::Deleted) => {
                format!("'{}' was deleted on one side and changed on the other", self.name)
            }
            (ChangeType::Added, ChangeType::Added) => {
                format!("'{}' was added on both sides with different content", self.name)
            }
            _ => format!("'{}' was edited differently on both sides", self.name),
        }
    }
}

/// Merge result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeResult {
    /// Token changes safe to apply
    pub tokens: Vec<DiffItem>,
    /// Component changes safe to apply
    pub components: Vec<DiffItem>,
    /// Conflicts that need manual resolution
    pub conflicts: Vec<Conflict>,
}

impl MergeResult {
    /// True if merge is clean (no conflicts)
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Merge `local` and `remote`, both descended from `base`
pub fn detect_conflicts(
    base: &DesignSystemSnapshot,
    local: &DesignSystemSnapshot,
    remote: &DesignSystemSnapshot,
) -> MergeResult {
    let local_diff = diff(local, base);
    let remote_diff = diff(remote, base);

    let mut result = MergeResult::default();
    let (tokens, token_conflicts) = merge_items(ItemKind::Token, &local_diff.tokens, &remote_diff.tokens);
    let (components, component_conflicts) =
        merge_items(ItemKind::Component, &local_diff.components, &remote_diff.components);
    result.tokens = tokens;
    result.components = components;
    result.conflicts.extend(token_conflicts);
    result.conflicts.extend(component_conflicts);
    result
}

fn merge_items(kind: ItemKind, patch_a: &[DiffItem], patch_b: &[DiffItem]) -> (Vec<DiffItem>, Vec<Conflict>) {
    let by_id_a: HashMap<&str, &DiffItem> = patch_a.iter().map(|i| (i.id.as_str(), i)).collect();
    let by_id_b: HashMap<&str, &DiffItem> = patch_b.iter().map(|i| (i.id.as_str(), i)).collect();
    let mut merged = Vec::new();
    let mut conflicts = Vec::new();

    // Non-conflicting changes from A, plus overlaps
    for item in patch_a {
        match by_id_b.get(item.id.as_str()) {
            None => merged.push(item.clone()),
            Some(other) if same_outcome(item, other) => merged.push(item.clone()),
            Some(other) => conflicts.push(Conflict {
                kind,
                id: item.id.clone(),
                name: item.name.clone(),
                local: item.clone(),
                remote: (*other).clone(),
            }),
        }
    }

    // Non-conflicting changes from B
    for item in patch_b {
        if !by_id_a.contains_key(item.id.as_str()) {
            merged.push(item.clone());
        }
    }

    (merged, conflicts)
}

/// Both sides produced the same end state for the item
fn same_outcome(a: &DiffItem, b: &DiffItem) -> bool {
    if a.change_type != b.change_type {
        return false;
    }
    if a.change_type == ChangeType::Deleted {
        return true;
    }
    let mut after_a: Vec<_> = a.changes.iter().map(|c| (&c.field, &c.after)).collect();
    let mut after_b: Vec<_> = b.changes.iter().map(|c| (&c.field, &c.after)).collect();
    after_a.sort_by(|x, y| x.0.cmp(y.0));
    after_b.sort_by(|x, y| x.0.cmp(y.0));
    after_a == after_b
}
