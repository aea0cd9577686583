//! Custom-property import
//!
//! Parses free-form text containing `--name: value;` declarations into
//! typed token candidates and merges them into the primitive layer.
//!
//! Author: Moroya Sakamoto

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::store::TokenStore;
use crate::token::{Category, Layer, Token, TokenType};

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"--([A-Za-z0-9_-]+)\s*:\s*([^;{}]+?)\s*(?:;|\}|$)")
        .expect("Valid custom property regex")
});

static COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:#[0-9a-f]{3,8}|(?:rgb|rgba|hsl|hsla|oklch|oklab)\(.*\))$")
        .expect("Valid color regex")
});

static SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)(?:px|rem|em|%|vh|vw|pt|ch)$").expect("Valid size regex")
});

static FONT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:"[^"]*"|'[^']*'|[A-Za-z][A-Za-z0-9 -]*)(?:\s*,\s*(?:"[^"]*"|'[^']*'|[A-Za-z][A-Za-z0-9 -]*))*$"#)
        .expect("Valid font regex")
});

/// A declaration recognized in imported text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedToken {
    pub name: String,
    pub value: String,
    pub token_type: TokenType,
}

/// Result of merging imported declarations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    /// Existing tokens left untouched (bound, or of a different type)
    pub skipped: Vec<String>,
}

impl ImportReport {
    /// True if the store was modified
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty()
    }
}

/// Infer a token type from a raw value: color pattern, then unit
/// suffix, then quoted or identifier-like font stack
pub fn infer_type(value: &str) -> Option<TokenType> {
    let value = value.trim();
    if COLOR.is_match(value) {
        Some(TokenType::Color)
    } else if SIZE.is_match(value) {
        Some(TokenType::Size)
    } else if FONT.is_match(value) {
        Some(TokenType::Font)
    } else {
        None
    }
}

/// Extract every `--name: value` declaration whose type can be inferred
pub fn parse_declarations(text: &str) -> Vec<ImportedToken> {
    DECLARATION
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let value = caps.get(2)?.as_str().trim();
            match infer_type(value) {
                Some(token_type) => Some(ImportedToken {
                    name: String::from(name),
                    value: String::from(value),
                    token_type,
                }),
                None => {
                    debug!(name, value, "skipping declaration with unknown type");
                    None
                }
            }
        })
        .collect()
}

/// Merge imported tokens into the primitive layer.
///
/// New names are added to the category matching their type. An existing
/// unbound token of the same type takes the imported value. Existing
/// tokens that are bound, or whose type differs from the inferred one,
/// are left alone and reported as skipped.
pub fn import_into(store: &mut TokenStore, imported: &[ImportedToken]) -> ImportReport {
    let mut report = ImportReport::default();
    for item in imported {
        let existing = store.find_by_name(&item.name).map(|(loc, token)| {
            let compatible = !token.is_bound() && token.token_type == item.token_type;
            (loc, compatible, token.value == item.value)
        });
        match existing {
            Some((_, false, _)) => {
                debug!(name = %item.name, "existing token is bound or of another type; not importing");
                report.skipped.push(item.name.clone());
            }
            Some((_, true, true)) => {}
            Some((loc, true, false)) => {
                if let Some(token) = store.get_mut(loc) {
                    token.value = item.value.clone();
                    report.updated.push(item.name.clone());
                }
            }
            None => {
                let token = Token::new(&item.name, item.token_type, &item.value);
                let category = Category::for_type(item.token_type);
                if store.add_token(Layer::Primitive, category, token).is_ok() {
                    report.added.push(item.name.clone());
                }
            }
        }
    }
    debug!(
        added = report.added.len(),
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        "import merged"
    );
    report
}
