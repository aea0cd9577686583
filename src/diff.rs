//! Design-system snapshot diff
//!
//! Structural diff of two snapshots of tokens and components. Items are
//! matched by id; matched pairs are compared field by field with deep
//! JSON equality.
//!
//! Author: Moroya Sakamoto

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TokenError};
use crate::store::TokenStore;

// ── Snapshot model ─────────────────────────────────────────────────────

/// Token as stored in a version snapshot. Fields other than id/name are
/// kept as opaque JSON so older snapshots still diff cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotToken {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl SnapshotToken {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: String::from(id),
            name: String::from(name),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: &str, value: Value) -> Self {
        self.fields.insert(String::from(field), value);
        self
    }
}

/// Component definition as stored in a version snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub props: Value,
    #[serde(default)]
    pub code: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Component {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: String::from(id),
            name: String::from(name),
            props: Value::Object(serde_json::Map::new()),
            code: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_props(mut self, props: Value) -> Self {
        self.props = props;
        self
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = String::from(code);
        self
    }
}

/// Tokens plus components at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignSystemSnapshot {
    #[serde(default)]
    pub tokens: Vec<SnapshotToken>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl DesignSystemSnapshot {
    /// Snapshot a live store; token ids are their (unique) names
    pub fn from_store(store: &TokenStore, components: Vec<Component>) -> Result<Self> {
        let mut tokens = Vec::with_capacity(store.token_count());
        for (_, token) in store.tokens() {
            let Value::Object(map) = serde_json::to_value(token)? else {
                continue;
            };
            let fields = map.into_iter().filter(|(k, _)| k != "name").collect();
            tokens.push(SnapshotToken {
                id: token.name.clone(),
                name: token.name.clone(),
                fields,
            });
        }
        Ok(Self { tokens, components })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reject snapshots with empty or repeated ids
    pub fn validate(&self) -> Result<()> {
        check_ids("token", self.tokens.iter().map(|t| t.id.as_str()))?;
        check_ids("component", self.components.iter().map(|c| c.id.as_str()))
    }
}

fn check_ids<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(TokenError::Validation(format!("{kind} with empty id")));
        }
        if !seen.insert(id) {
            return Err(TokenError::Validation(format!("duplicate {kind} id '{id}'")));
        }
    }
    Ok(())
}

// ── Diff model ─────────────────────────────────────────────────────────

/// Kind of change to one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

/// One differing field. Absent fields are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub before: Value,
    pub after: Value,
}

/// Change record for one token or component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub changes: Vec<FieldChange>,
}

impl DiffItem {
    /// The change to `field`, if any
    pub fn field(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }
}

/// Token and component changes between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub tokens: Vec<DiffItem>,
    pub components: Vec<DiffItem>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.components.is_empty()
    }

    /// Total changed items
    pub fn len(&self) -> usize {
        self.tokens.len() + self.components.len()
    }

    /// Count of items with `change_type` across tokens and components
    pub fn count(&self, change_type: ChangeType) -> usize {
        self.tokens
            .iter()
            .chain(&self.components)
            .filter(|i| i.change_type == change_type)
            .count()
    }

    /// One-line summaries, e.g. `modified token color-primary (value)`
    pub fn summaries(&self) -> Vec<String> {
        let describe = |kind: &str, item: &DiffItem| {
            let verb = match item.change_type {
                ChangeType::Added => "added",
                ChangeType::Modified => "modified",
                ChangeType::Deleted => "deleted",
            };
            if item.change_type == ChangeType::Modified {
                let fields: Vec<&str> = item.changes.iter().map(|c| c.field.as_str()).collect();
                format!("{verb} {kind} {} ({})", item.name, fields.join(", "))
            } else {
                format!("{verb} {kind} {}", item.name)
            }
        };
        self.tokens
            .iter()
            .map(|i| describe("token", i))
            .chain(self.components.iter().map(|i| describe("component", i)))
            .collect()
    }
}

// ── Diff engine ────────────────────────────────────────────────────────

/// Anything diffable by id with a flat field map
pub trait DiffRecord {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    /// Every compared field (id excluded)
    fn fields(&self) -> BTreeMap<String, Value>;
}

impl DiffRecord for SnapshotToken {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> BTreeMap<String, Value> {
        let mut fields = self.fields.clone();
        fields.insert(String::from("name"), Value::String(self.name.clone()));
        fields
    }
}

impl DiffRecord for Component {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> BTreeMap<String, Value> {
        let mut fields = self.extra.clone();
        fields.insert(String::from("name"), Value::String(self.name.clone()));
        fields.insert(String::from("props"), self.props.clone());
        fields.insert(String::from("code"), Value::String(self.code.clone()));
        fields
    }
}

/// Diff `current` against `previous`.
///
/// Three passes per item kind:
/// 1. in `current`, id absent from `previous` -> Added
/// 2. in both, any field differs -> Modified (one FieldChange per field)
/// 3. in `previous`, id absent from `current` -> Deleted
pub fn diff(current: &DesignSystemSnapshot, previous: &DesignSystemSnapshot) -> Diff {
    Diff {
        tokens: diff_records(&current.tokens, &previous.tokens),
        components: diff_records(&current.components, &previous.components),
    }
}

/// Validate both snapshots, then diff
pub fn diff_checked(current: &DesignSystemSnapshot, previous: &DesignSystemSnapshot) -> Result<Diff> {
    current.validate()?;
    previous.validate()?;
    Ok(diff(current, previous))
}

/// Diff two id-keyed record lists
pub fn diff_records<T: DiffRecord>(current: &[T], previous: &[T]) -> Vec<DiffItem> {
    let previous_by_id: HashMap<&str, &T> = previous.iter().map(|r| (r.id(), r)).collect();
    let current_ids: HashSet<&str> = current.iter().map(|r| r.id()).collect();
    let mut items = Vec::new();

    for record in current {
        if !previous_by_id.contains_key(record.id()) {
            items.push(DiffItem {
                id: String::from(record.id()),
                name: String::from(record.name()),
                change_type: ChangeType::Added,
                changes: compare_fields(&BTreeMap::new(), &record.fields()),
            });
        }
    }

    for record in current {
        if let Some(before) = previous_by_id.get(record.id()) {
            let changes = compare_fields(&before.fields(), &record.fields());
            if !changes.is_empty() {
                items.push(DiffItem {
                    id: String::from(record.id()),
                    name: String::from(record.name()),
                    change_type: ChangeType::Modified,
                    changes,
                });
            }
        }
    }

    for record in previous {
        if !current_ids.contains(record.id()) {
            items.push(DiffItem {
                id: String::from(record.id()),
                name: String::from(record.name()),
                change_type: ChangeType::Deleted,
                changes: compare_fields(&record.fields(), &BTreeMap::new()),
            });
        }
    }

    items
}

/// Field-wise deep comparison over the union of keys
fn compare_fields(before: &BTreeMap<String, Value>, after: &BTreeMap<String, Value>) -> Vec<FieldChange> {
    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();
    keys.into_iter()
        .filter_map(|key| {
            let b = before.get(key).unwrap_or(&Value::Null);
            let a = after.get(key).unwrap_or(&Value::Null);
            (b != a).then(|| FieldChange {
                field: key.clone(),
                before: b.clone(),
                after: a.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(id: &str, value: Value) -> SnapshotToken {
        SnapshotToken::new(id, id).with_field("value", value)
    }

    fn snapshot(tokens: Vec<SnapshotToken>, components: Vec<Component>) -> DesignSystemSnapshot {
        DesignSystemSnapshot { tokens, components }
    }

    #[test]
    fn test_identical_snapshots_no_diff() {
        let s = snapshot(
            vec![token("a", json!("#fff"))],
            vec![Component::new("btn", "Button").with_props(json!({"label": "string"}))],
        );
        assert!(diff(&s, &s).is_empty());
    }

    #[test]
    fn test_empty_snapshots_no_diff() {
        let s = DesignSystemSnapshot::default();
        assert!(diff(&s, &s).is_empty());
    }

    #[test]
    fn test_added_token() {
        let prev = snapshot(vec![token("a", json!("1"))], vec![]);
        let cur = snapshot(vec![token("a", json!("1")), token("b", json!("2"))], vec![]);
        let d = diff(&cur, &prev);
        assert_eq!(d.tokens.len(), 1);
        assert_eq!(d.tokens[0].id, "b");
        assert_eq!(d.tokens[0].change_type, ChangeType::Added);
    }

    #[test]
    fn test_deleted_token() {
        let prev = snapshot(vec![token("a", json!("1")), token("b", json!("2"))], vec![]);
        let cur = snapshot(vec![token("a", json!("1"))], vec![]);
        let d = diff(&cur, &prev);
        assert_eq!(d.count(ChangeType::Deleted), 1);
        assert_eq!(d.tokens[0].field("value").unwrap().before, json!("2"));
    }

    #[test]
    fn test_modified_token_records_field() {
        let prev = snapshot(vec![token("a", json!("#000"))], vec![]);
        let cur = snapshot(vec![token("a", json!("#111"))], vec![]);
        let d = diff(&cur, &prev);
        assert_eq!(d.tokens.len(), 1);
        let item = &d.tokens[0];
        assert_eq!(item.change_type, ChangeType::Modified);
        assert_eq!(item.changes.len(), 1);
        assert_eq!(item.changes[0].field, "value");
        assert_eq!(item.changes[0].before, json!("#000"));
        assert_eq!(item.changes[0].after, json!("#111"));
    }

    #[test]
    fn test_nested_value_compared_deeply() {
        let prev = snapshot(vec![token("a", json!({"w": 400, "s": "16px"}))], vec![]);
        let same = snapshot(vec![token("a", json!({"s": "16px", "w": 400}))], vec![]);
        let changed = snapshot(vec![token("a", json!({"w": 700, "s": "16px"}))], vec![]);
        assert!(diff(&same, &prev).is_empty());
        assert_eq!(diff(&changed, &prev).tokens.len(), 1);
    }

    #[test]
    fn test_field_removed_is_change_to_null() {
        let prev = snapshot(vec![token("a", json!("1")).with_field("darkValue", json!("2"))], vec![]);
        let cur = snapshot(vec![token("a", json!("1"))], vec![]);
        let d = diff(&cur, &prev);
        let change = d.tokens[0].field("darkValue").unwrap();
        assert_eq!(change.after, Value::Null);
    }

    #[test]
    fn test_renamed_token_is_modified_not_readded() {
        let prev = snapshot(vec![SnapshotToken::new("t1", "old").with_field("value", json!("1"))], vec![]);
        let cur = snapshot(vec![SnapshotToken::new("t1", "new").with_field("value", json!("1"))], vec![]);
        let d = diff(&cur, &prev);
        assert_eq!(d.tokens.len(), 1);
        assert_eq!(d.tokens[0].change_type, ChangeType::Modified);
        assert_eq!(d.tokens[0].changes[0].field, "name");
    }

    #[test]
    fn test_component_props_change() {
        let prev = snapshot(vec![], vec![Component::new("x", "X").with_props(json!({"a": 1, "b": 2}))]);
        let cur = snapshot(vec![], vec![Component::new("x", "X").with_props(json!({"a": 1}))]);
        let d = diff(&cur, &prev);
        assert_eq!(d.components.len(), 1);
        assert!(d.components[0].field("props").is_some());
    }

    #[test]
    fn test_pass_order_added_modified_deleted() {
        let prev = snapshot(vec![token("m", json!("1")), token("d", json!("1"))], vec![]);
        let cur = snapshot(vec![token("m", json!("2")), token("a", json!("1"))], vec![]);
        let kinds: Vec<_> = diff(&cur, &prev).tokens.iter().map(|i| i.change_type).collect();
        assert_eq!(kinds, vec![ChangeType::Added, ChangeType::Modified, ChangeType::Deleted]);
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let bad = snapshot(vec![token("a", json!("1")), token("a", json!("2"))], vec![]);
        assert!(bad.validate().is_err());
        assert!(diff_checked(&bad, &DesignSystemSnapshot::default()).is_err());
    }

    #[test]
    fn test_from_json_rejects_empty_id() {
        let text = r#"{"tokens":[{"id":"","name":"x","value":"1"}]}"#;
        assert!(DesignSystemSnapshot::from_json(text).is_err());
    }

    #[test]
    fn test_from_json_keeps_extra_fields() {
        let text = r#"{"tokens":[{"id":"t","name":"t","value":"1","type":"color"}],"components":[{"id":"c","name":"C","props":{},"code":"","status":"beta"}]}"#;
        let snapshot = DesignSystemSnapshot::from_json(text).unwrap();
        assert_eq!(snapshot.tokens[0].fields["type"], json!("color"));
        assert_eq!(snapshot.components[0].extra["status"], json!("beta"));
    }

    #[test]
    fn test_from_store_uses_names_as_ids() {
        let store = TokenStore::builtin();
        let snapshot = DesignSystemSnapshot::from_store(&store, vec![]).unwrap();
        assert_eq!(snapshot.tokens.len(), store.token_count());
        let primary = snapshot.tokens.iter().find(|t| t.id == "color-primary").unwrap();
        assert_eq!(primary.fields["value"], json!("var(--blue-500)"));
        assert!(!primary.fields.contains_key("name"));
    }

    #[test]
    fn test_summaries() {
        let prev = snapshot(vec![token("a", json!("1"))], vec![]);
        let cur = snapshot(vec![token("a", json!("2"))], vec![Component::new("c", "Card")]);
        let lines = diff(&cur, &prev).summaries();
        assert_eq!(lines, vec!["modified token a (value)", "added component Card"]);
    }
}
