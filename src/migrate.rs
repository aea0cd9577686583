//! Schema migration
//!
//! Persisted stores come in three historical shapes:
//!
//! | Shape | Keys |
//! |-------|------|
//! | layered (v1) | `core` or `foundations`, `system`, `component` |
//! | current (v2) | `primitives`, `semantic` |
//! | envelope | `{ schemaVersion, payload }` wrapping either of the above |
//!
//! Tagged envelopes are decoded through a version table. Untagged payloads
//! are sniffed by key. Anything structurally unusable is replaced by the
//! built-in store; migration never fails.
//!
//! Author: Moroya Sakamoto

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::store::TokenStore;
use crate::token::{Layer, Token, TokenGroup};

/// Schema version written by this crate
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// What the persisted payload looked like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `{ primitives, semantic }`
    Current,
    /// `{ core|foundations, system, component }`
    Layered,
    /// Not an object or no recognized keys
    Unrecognized,
}

/// Outcome of a migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Envelope version, when the payload was tagged
    pub schema_version: Option<u32>,
    pub shape: PayloadShape,
    /// Groups dropped because they could not be decoded
    pub skipped_groups: usize,
    /// Individual tokens dropped from otherwise valid groups
    pub skipped_tokens: usize,
    /// Tokens suffixed because their name was already in use
    pub renamed_tokens: usize,
    /// True if the built-in store was substituted
    pub used_defaults: bool,
}

impl MigrationReport {
    pub(crate) fn defaults(schema_version: Option<u32>, shape: PayloadShape) -> Self {
        Self {
            schema_version,
            shape,
            skipped_groups: 0,
            skipped_tokens: 0,
            renamed_tokens: 0,
            used_defaults: true,
        }
    }

    /// True if the loaded store differs from what was persisted
    pub fn needs_rewrite(&self) -> bool {
        self.used_defaults
            || self.shape != PayloadShape::Current
            || self.schema_version != Some(CURRENT_SCHEMA_VERSION)
            || self.skipped_groups > 0
            || self.skipped_tokens > 0
            || self.renamed_tokens > 0
    }
}

// ── Envelope ───────────────────────────────────────────────────────────

/// Wrap a store in the current versioned envelope
pub fn encode_envelope(store: &TokenStore) -> serde_json::Result<Value> {
    let mut envelope = Map::new();
    envelope.insert(String::from("schemaVersion"), Value::from(CURRENT_SCHEMA_VERSION));
    envelope.insert(String::from("payload"), serde_json::to_value(store)?);
    Ok(Value::Object(envelope))
}

/// Decode any persisted payload into a current store
pub fn decode(value: Value) -> (TokenStore, MigrationReport) {
    let version = value
        .as_object()
        .and_then(|o| o.get("schemaVersion"))
        .and_then(Value::as_u64);
    let Some(version) = version else {
        return migrate(value);
    };
    let version = u32::try_from(version).unwrap_or(u32::MAX);
    let payload = match value {
        Value::Object(mut obj) => obj.remove("payload").unwrap_or(Value::Null),
        _ => Value::Null,
    };

    let (store, mut report) = match version {
        1 => migrate_expecting(payload, PayloadShape::Layered),
        2 => migrate_expecting(payload, PayloadShape::Current),
        other => {
            warn!(version = other, "unknown schema version; using built-in tokens");
            (TokenStore::builtin(), MigrationReport::defaults(None, PayloadShape::Unrecognized))
        }
    };
    report.schema_version = Some(version);
    (store, report)
}

fn migrate_expecting(payload: Value, expected: PayloadShape) -> (TokenStore, MigrationReport) {
    let shape = sniff(&payload);
    if shape != expected {
        debug!(?expected, ?shape, "envelope payload shape differs from its version tag");
    }
    migrate(payload)
}

// ── Shape sniffing ─────────────────────────────────────────────────────

const PRIMITIVE_KEYS: &[&str] = &["primitives", "core", "foundations"];
const SEMANTIC_KEYS: &[&str] = &["semantic", "system"];
const COMPONENT_KEY: &str = "component";

/// Classify an untagged payload by its keys
pub fn sniff(value: &Value) -> PayloadShape {
    let Some(obj) = value.as_object() else {
        return PayloadShape::Unrecognized;
    };
    if obj.contains_key("primitives") || obj.contains_key("semantic") {
        PayloadShape::Current
    } else if ["core", "foundations", "system", COMPONENT_KEY]
        .iter()
        .any(|k| obj.contains_key(*k))
    {
        PayloadShape::Layered
    } else {
        PayloadShape::Unrecognized
    }
}

/// Upgrade an untagged payload.
///
/// `primitives ⟵ primitives ?? core ?? foundations ?? []`,
/// `semantic ⟵ semantic ?? system ?? []`, and `component` groups are
/// merged into `semantic` by category. Every group and token is stamped
/// with its destination layer.
pub fn migrate(value: Value) -> (TokenStore, MigrationReport) {
    let shape = sniff(&value);
    let Value::Object(mut obj) = value else {
        warn!("persisted tokens are not an object; using built-in tokens");
        return (TokenStore::builtin(), MigrationReport::defaults(None, shape));
    };
    if shape == PayloadShape::Unrecognized {
        warn!("persisted tokens have no recognized keys; using built-in tokens");
        return (TokenStore::builtin(), MigrationReport::defaults(None, shape));
    }

    let primitives = first_present(&mut obj, PRIMITIVE_KEYS);
    let semantic = first_present(&mut obj, SEMANTIC_KEYS);
    let component = obj.remove(COMPONENT_KEY).filter(|v| !v.is_null());

    let (Some(primitives), Some(semantic), Some(component)) = (
        as_groups(primitives),
        as_groups(semantic),
        as_groups(component),
    ) else {
        warn!("persisted token groups are not lists; using built-in tokens");
        return (TokenStore::builtin(), MigrationReport::defaults(None, shape));
    };

    let mut store = TokenStore::new();
    let mut skipped = Skipped::default();
    load_groups(&mut store, Layer::Primitive, primitives, &mut skipped);
    load_groups(&mut store, Layer::Semantic, semantic, &mut skipped);
    load_groups(&mut store, Layer::Semantic, component, &mut skipped);
    let renamed = store.normalize();

    if shape == PayloadShape::Layered {
        debug!(tokens = store.token_count(), "migrated layered token store");
    }
    if skipped.groups > 0 || skipped.tokens > 0 {
        warn!(
            groups = skipped.groups,
            tokens = skipped.tokens,
            "dropped undecodable token data during migration"
        );
    }
    (
        store,
        MigrationReport {
            schema_version: None,
            shape,
            skipped_groups: skipped.groups,
            skipped_tokens: skipped.tokens,
            renamed_tokens: renamed,
            used_defaults: false,
        },
    )
}

fn first_present(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .filter_map(|k| obj.remove(*k))
        .find(|v| !v.is_null())
}

/// `None` (absent) becomes an empty list; a non-array is rejected
fn as_groups(value: Option<Value>) -> Option<Vec<Value>> {
    match value {
        None => Some(Vec::new()),
        Some(Value::Array(groups)) => Some(groups),
        Some(_) => None,
    }
}

#[derive(Debug, Default)]
struct Skipped {
    groups: usize,
    tokens: usize,
}

/// Decode each group header, then its tokens one by one so a bad token
/// only costs itself
fn load_groups(store: &mut TokenStore, layer: Layer, groups: Vec<Value>, skipped: &mut Skipped) {
    for mut group in groups {
        restamp(&mut group, layer);
        let tokens = group.as_object_mut().and_then(|obj| obj.remove("tokens"));
        let mut decoded = match serde_json::from_value::<TokenGroup>(group) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(%err, ?layer, "skipping token group");
                skipped.groups += 1;
                continue;
            }
        };
        match tokens {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    match serde_json::from_value::<Token>(item) {
                        Ok(token) => decoded.tokens.push(token),
                        Err(err) => {
                            debug!(%err, ?layer, category = ?decoded.category, "skipping token");
                            skipped.tokens += 1;
                        }
                    }
                }
            }
            Some(_) => {
                debug!(?layer, category = ?decoded.category, "skipping group with non-list tokens");
                skipped.groups += 1;
                continue;
            }
        }
        match layer {
            Layer::Primitive => store.primitives.push(decoded),
            Layer::Semantic => store.semantic.push(decoded),
        }
    }
}

/// Overwrite `layer` on the group and each of its tokens; tokens missing a
/// category inherit the group's
fn restamp(group: &mut Value, layer: Layer) {
    let Some(obj) = group.as_object_mut() else {
        return;
    };
    let layer_value = Value::String(String::from(match layer {
        Layer::Primitive => "primitive",
        Layer::Semantic => "semantic",
    }));
    obj.insert(String::from("layer"), layer_value.clone());
    let category = obj.get("category").cloned();
    if let Some(Value::Array(tokens)) = obj.get_mut("tokens") {
        for token in tokens.iter_mut().filter_map(Value::as_object_mut) {
            token.insert(String::from("layer"), layer_value.clone());
            if let Some(category) = &category {
                token.entry("category").or_insert_with(|| category.clone());
            }
        }
    }
}
