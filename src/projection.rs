//! Style projection
//!
//! One-directional push of token values into a name-addressable style
//! variable namespace. Primitives go first so semantic aliases land on
//! established variables. References (`var(--x)`) are pushed verbatim;
//! only the read-back path resolves them.
//!
//! Author: Moroya Sakamoto

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::store::TokenStore;
use crate::token::{Layer, Token};

/// Maximum `var()` hops followed when computing a value
const MAX_RESOLVE_DEPTH: usize = 16;

/// Which themed value to project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

/// Live style variable namespace
pub trait StyleSink {
    /// Set `name` (including the leading `--`) to `value`
    fn set_property(&mut self, name: &str, value: &str);

    /// Current value of `name`, if set
    fn get_property(&self, name: &str) -> Option<String>;

    /// Drop every variable previously pushed
    fn clear(&mut self);
}

/// In-memory sink; stands in for a document root in headless use
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
    properties: BTreeMap<String, String>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Render as a `:root` block
    pub fn to_css(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in &self.properties {
            css.push_str("  ");
            css.push_str(name);
            css.push_str(": ");
            css.push_str(value);
            css.push_str(";\n");
        }
        css.push('}');
        css.push('\n');
        css
    }
}

impl StyleSink for StyleSheet {
    fn set_property(&mut self, name: &str, value: &str) {
        self.properties.insert(String::from(name), String::from(value));
    }

    fn get_property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    fn clear(&mut self) {
        self.properties.clear();
    }
}

/// Value a token projects under `theme`
pub fn themed_value(token: &Token, theme: ThemeMode) -> &str {
    let themed = match theme {
        ThemeMode::Light => token.light_value.as_deref(),
        ThemeMode::Dark => token.dark_value.as_deref(),
    };
    match themed {
        Some(v) if !v.trim().is_empty() => v,
        _ => &token.value,
    }
}

/// Push every token into `sink`: primitives, then semantic. Returns the
/// number of variables written.
pub fn project(store: &TokenStore, sink: &mut dyn StyleSink, theme: ThemeMode) -> usize {
    sink.clear();
    let mut written = 0;
    for layer in Layer::ALL {
        for group in store.groups(layer) {
            for token in &group.tokens {
                let value = themed_value(token, theme);
                if value.trim().is_empty() {
                    continue;
                }
                sink.set_property(&token.variable_name(), value);
                written += 1;
            }
        }
    }
    written
}

static VAR_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*var\(\s*(--[A-Za-z0-9_-]+)\s*(?:,\s*(.+?))?\s*\)\s*$")
        .expect("Valid var() reference regex")
});

/// If `value` is exactly a `var(--name[, fallback])`, the referenced name
/// and optional fallback
pub fn parse_reference(value: &str) -> Option<(&str, Option<&str>)> {
    let caps = VAR_REFERENCE.captures(value)?;
    let name = caps.get(1)?.as_str();
    let fallback = caps.get(2).map(|m| m.as_str());
    Some((name, fallback))
}

/// Display value for a token: follow `var()` chains through the live
/// sink. An unset variable (or a cycle) falls back to the stored value.
pub fn computed_value(token: &Token, sink: &dyn StyleSink, theme: ThemeMode) -> String {
    let raw = themed_value(token, theme);
    resolve(raw, sink).unwrap_or_else(|| String::from(raw))
}

fn resolve(value: &str, sink: &dyn StyleSink) -> Option<String> {
    let mut current = String::from(value);
    for _ in 0..MAX_RESOLVE_DEPTH {
        let (name, fallback) = match parse_reference(&current) {
            Some((name, fallback)) => (String::from(name), fallback.map(String::from)),
            None => return Some(current),
        };
        current = match sink.get_property(&name) {
            Some(next) => next,
            None => fallback?,
        };
    }
    None
}
