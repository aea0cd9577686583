//! Impact analysis
//!
//! Classifies the blast radius of a diff: which components reference a
//! changed token, which changes break consumers, and an overall level.
//! Purely derived from its inputs; re-run it for every new version.
//!
//! Author: Moroya Sakamoto

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::{ChangeType, Component, DesignSystemSnapshot, Diff, DiffItem};
use crate::error::{Result, TokenError};

// ── Policy ─────────────────────────────────────────────────────────────

/// Affected-component thresholds used when no breaking change exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactPolicy {
    /// More affected components than this is `high`
    pub high_component_threshold: usize,
    /// More affected components than this is `medium`
    pub medium_component_threshold: usize,
}

impl Default for ImpactPolicy {
    fn default() -> Self {
        Self {
            high_component_threshold: 5,
            medium_component_threshold: 0,
        }
    }
}

impl ImpactPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.medium_component_threshold > self.high_component_threshold {
            return Err(TokenError::Config(format!(
                "medium threshold {} exceeds high threshold {}",
                self.medium_component_threshold, self.high_component_threshold
            )));
        }
        Ok(())
    }

    /// Level for a given breaking flag and affected-component count
    pub fn classify(&self, has_breaking: bool, affected_components: usize) -> ImpactLevel {
        if has_breaking {
            ImpactLevel::Critical
        } else if affected_components > self.high_component_threshold {
            ImpactLevel::High
        } else if affected_components > self.medium_component_threshold {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        }
    }
}

// ── Result model ───────────────────────────────────────────────────────

/// Overall disruption level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// What kind of contract a breaking change violates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakingKind {
    /// Token removed or its value changed type
    Token,
    /// Component props removed
    Api,
    /// Component removed
    Component,
}

/// A change that will break at least one consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakingChange {
    #[serde(rename = "type")]
    pub kind: BreakingKind,
    pub description: String,
    pub affected_resources: Vec<String>,
}

/// Blast radius of a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactAnalysis {
    pub affected_components: BTreeSet<String>,
    pub affected_tokens: BTreeSet<String>,
    pub breaking_changes: Vec<BreakingChange>,
    pub estimated_impact: ImpactLevel,
}

impl ImpactAnalysis {
    pub fn is_breaking(&self) -> bool {
        !self.breaking_changes.is_empty()
    }
}

// ── Analysis ───────────────────────────────────────────────────────────

/// Analyze `changes` against `system` with the default thresholds
pub fn analyze_impact(changes: &Diff, system: &DesignSystemSnapshot) -> ImpactAnalysis {
    analyze_impact_with(changes, system, &ImpactPolicy::default())
}

/// Analyze `changes` against `system` using `policy`
pub fn analyze_impact_with(changes: &Diff, system: &DesignSystemSnapshot, policy: &ImpactPolicy) -> ImpactAnalysis {
    let mut affected_components = BTreeSet::new();
    let mut affected_tokens = BTreeSet::new();
    let mut breaking_changes = Vec::new();

    for item in &changes.tokens {
        if item.change_type == ChangeType::Added {
            continue;
        }
        affected_tokens.insert(item.id.clone());
        let users = components_referencing(&system.components, &item.name);
        affected_components.extend(users.iter().cloned());

        match item.change_type {
            ChangeType::Deleted => breaking_changes.push(BreakingChange {
                kind: BreakingKind::Token,
                description: format!("Token '{}' was deleted", item.name),
                affected_resources: users,
            }),
            ChangeType::Modified => {
                if let Some((before, after)) = value_kind_change(item) {
                    breaking_changes.push(BreakingChange {
                        kind: BreakingKind::Token,
                        description: format!(
                            "Token '{}' value changed type from {before} to {after}",
                            item.name
                        ),
                        affected_resources: users,
                    });
                }
            }
            ChangeType::Added => {}
        }
    }

    for item in &changes.components {
        match item.change_type {
            ChangeType::Modified => {
                let removed = removed_props(item);
                if !removed.is_empty() {
                    breaking_changes.push(BreakingChange {
                        kind: BreakingKind::Api,
                        description: format!(
                            "Component '{}' removed props: {}",
                            item.name,
                            removed.join(", ")
                        ),
                        affected_resources: vec![item.id.clone()],
                    });
                }
            }
            ChangeType::Deleted => breaking_changes.push(BreakingChange {
                kind: BreakingKind::Component,
                description: format!("Component '{}' was deleted", item.name),
                affected_resources: vec![item.id.clone()],
            }),
            ChangeType::Added => {}
        }
    }

    let estimated_impact = policy.classify(!breaking_changes.is_empty(), affected_components.len());
    ImpactAnalysis {
        affected_components,
        affected_tokens,
        breaking_changes,
        estimated_impact,
    }
}

/// Ids of components whose code or content mentions `token_name`
fn components_referencing(components: &[Component], token_name: &str) -> Vec<String> {
    if token_name.is_empty() {
        return Vec::new();
    }
    components
        .iter()
        .filter(|c| {
            c.code.contains(token_name)
                || matches!(c.extra.get("content"), Some(Value::String(s)) if s.contains(token_name))
        })
        .map(|c| c.id.clone())
        .collect()
}

/// JavaScript-style `typeof` of a JSON value
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
    }
}

/// `Some((before, after))` if the token's `value` field changed kind
fn value_kind_change(item: &DiffItem) -> Option<(&'static str, &'static str)> {
    let change = item.field("value")?;
    let (before, after) = (value_kind(&change.before), value_kind(&change.after));
    (before != after).then_some((before, after))
}

/// Prop names declared by a `props` value: object keys, or a list of
/// names / `{ name }` objects
fn prop_names(props: &Value) -> BTreeSet<String> {
    match props {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("name").and_then(Value::as_str).map(String::from),
                _ => None,
            })
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Props present before and absent after, in name order
fn removed_props(item: &DiffItem) -> Vec<String> {
    let Some(change) = item.field("props") else {
        return Vec::new();
    };
    let after = prop_names(&change.after);
    prop_names(&change.before)
        .into_iter()
        .filter(|p| !after.contains(p))
        .collect()
}

/// Breaking changes grouped by kind, for summary displays
pub fn breaking_by_kind(analysis: &ImpactAnalysis) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for change in &analysis.breaking_changes {
        let key = match change.kind {
            BreakingKind::Token => "token",
            BreakingKind::Api => "api",
            BreakingKind::Component => "component",
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}
