//! Version history
//!
//! Immutable version records over design-system snapshots, in the manner
//! of a commit log: each record stores the diff from its predecessor and
//! a freshly computed impact analysis.
//!
//! Author: Moroya Sakamoto

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::diff::{diff, ChangeType, DesignSystemSnapshot, Diff};
use crate::error::{Result, TokenError};
use crate::impact::{analyze_impact_with, ImpactAnalysis, ImpactLevel, ImpactPolicy};

/// Semantic-version bump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionType {
    Major,
    Minor,
    Patch,
}

/// Review state of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Draft,
    Published,
    Approved,
    Rejected,
}

/// One entry in the version history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistory {
    pub id: Uuid,
    pub version: String,
    #[serde(rename = "type")]
    pub version_type: VersionType,
    pub changes: Vec<String>,
    pub diff: Diff,
    pub impact_analysis: ImpactAnalysis,
    pub status: VersionStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
}

/// Suggested bump for a diff and its impact
pub fn suggest_bump(diff: &Diff, impact: &ImpactAnalysis) -> VersionType {
    if impact.estimated_impact == ImpactLevel::Critical {
        VersionType::Major
    } else if diff.count(ChangeType::Added) > 0 || diff.count(ChangeType::Deleted) > 0 {
        VersionType::Minor
    } else {
        VersionType::Patch
    }
}

/// `major.minor.patch` after applying `bump` to `version`
pub fn bump_version(version: &str, bump: VersionType) -> String {
    let mut parts = version
        .trim_start_matches('v')
        .split('.')
        .map(|p| p.parse::<u64>().unwrap_or(0));
    let (major, minor, patch) = (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    );
    match bump {
        VersionType::Major => format!("{}.0.0", major + 1),
        VersionType::Minor => format!("{major}.{}.0", minor + 1),
        VersionType::Patch => format!("{major}.{minor}.{}", patch + 1),
    }
}

#[derive(Debug, Clone)]
struct Entry {
    record: VersionHistory,
    snapshot: DesignSystemSnapshot,
}

/// Ordered version log with stored snapshots
#[derive(Debug, Clone)]
pub struct VersionLog {
    entries: Vec<Entry>,
    policy: ImpactPolicy,
}

impl Default for VersionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionLog {
    pub fn new() -> Self {
        Self::with_policy(ImpactPolicy::default())
    }

    pub fn with_policy(policy: ImpactPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    /// Record `snapshot` as a new version.
    ///
    /// Diffs against the latest stored snapshot (an empty one for the first
    /// version) and re-runs impact analysis. `bump` overrides the suggested
    /// version type; the first version defaults to a major bump from 0.0.0.
    pub fn create_version(
        &mut self,
        snapshot: DesignSystemSnapshot,
        created_by: &str,
        bump: Option<VersionType>,
    ) -> Result<&VersionHistory> {
        snapshot.validate()?;
        let empty = DesignSystemSnapshot::default();
        let previous = self.entries.last().map(|e| &e.snapshot).unwrap_or(&empty);
        let changes = diff(&snapshot, previous);
        let impact = analyze_impact_with(&changes, &snapshot, &self.policy);
        let (version_type, version) = match self.entries.last() {
            Some(e) => {
                let version_type = bump.unwrap_or_else(|| suggest_bump(&changes, &impact));
                (version_type, bump_version(&e.record.version, version_type))
            }
            None => {
                let version_type = bump.unwrap_or(VersionType::Major);
                (version_type, bump_version("0.0.0", version_type))
            }
        };

        info!(
            %version,
            changes = changes.len(),
            impact = ?impact.estimated_impact,
            "created design-system version"
        );
        let record = VersionHistory {
            id: Uuid::new_v4(),
            version,
            version_type,
            changes: changes.summaries(),
            diff: changes,
            impact_analysis: impact,
            status: VersionStatus::Draft,
            created_by: String::from(created_by),
            created_at: Utc::now(),
            approved_by: None,
        };
        self.entries.push(Entry { record, snapshot });
        let idx = self.entries.len() - 1;
        Ok(&self.entries[idx].record)
    }

    fn entry_mut(&mut self, id: Uuid) -> Result<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|e| e.record.id == id)
            .ok_or_else(|| TokenError::VersionNotFound(id.to_string()))
    }

    pub fn publish(&mut self, id: Uuid) -> Result<()> {
        self.entry_mut(id)?.record.status = VersionStatus::Published;
        Ok(())
    }

    pub fn approve(&mut self, id: Uuid, approved_by: &str) -> Result<()> {
        let record = &mut self.entry_mut(id)?.record;
        record.status = VersionStatus::Approved;
        record.approved_by = Some(String::from(approved_by));
        Ok(())
    }

    pub fn reject(&mut self, id: Uuid) -> Result<()> {
        let record = &mut self.entry_mut(id)?.record;
        record.status = VersionStatus::Rejected;
        record.approved_by = None;
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&VersionHistory> {
        self.entries.iter().find(|e| e.record.id == id).map(|e| &e.record)
    }

    pub fn snapshot(&self, id: Uuid) -> Option<&DesignSystemSnapshot> {
        self.entries.iter().find(|e| e.record.id == id).map(|e| &e.snapshot)
    }

    pub fn latest(&self) -> Option<&VersionHistory> {
        self.entries.last().map(|e| &e.record)
    }

    /// Records, oldest first
    pub fn records(&self) -> impl Iterator<Item = &VersionHistory> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diff between two stored versions (`to` relative to `from`)
    pub fn diff_between(&self, from: Uuid, to: Uuid) -> Option<Diff> {
        Some(diff(self.snapshot(to)?, self.snapshot(from)?))
    }

    /// Diff and fresh impact of `current` against a stored version
    pub fn compare_with(&self, id: Uuid, current: &DesignSystemSnapshot) -> Option<(Diff, ImpactAnalysis)> {
        let changes = diff(current, self.snapshot(id)?);
        let impact = analyze_impact_with(&changes, current, &self.policy);
        Some((changes, impact))
    }
}
