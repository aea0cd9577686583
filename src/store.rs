//! Layered token store
//!
//! Two lists of token groups (primitive, semantic) with at most one group
//! per (layer, category). Token names are unique across the whole store;
//! collisions are resolved by suffix generation, never reported.
//!
//! Author: Moroya Sakamoto

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::binding::is_allowed;
use crate::error::{Result, TokenError};
use crate::token::{Category, IconData, Layer, Token, TokenGroup, TokenLocation, TokenState, TokenType};

// ── Edits ──────────────────────────────────────────────────────────────

/// Field replacements for an existing token. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenEdit {
    pub name: Option<String>,
    pub value: Option<String>,
    pub light_value: Option<Option<String>>,
    pub dark_value: Option<Option<String>>,
    pub state: Option<Option<TokenState>>,
    pub style_object: Option<Option<BTreeMap<String, String>>>,
    pub icon_data: Option<Option<IconData>>,
}

impl TokenEdit {
    pub fn value(value: &str) -> Self {
        Self {
            value: Some(String::from(value)),
            ..Self::default()
        }
    }

    pub fn rename(name: &str) -> Self {
        Self {
            name: Some(String::from(name)),
            ..Self::default()
        }
    }

    /// True if the edit touches nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(TokenError::Validation(String::from("token name must not be empty")));
        }
        if matches!(&self.value, Some(v) if v.trim().is_empty()) {
            return Err(TokenError::Validation(String::from("token value must not be empty")));
        }
        Ok(())
    }

    /// Copy every provided field onto `token` (name excluded; the store
    /// resolves renames so uniqueness holds)
    pub(crate) fn apply_fields(&self, token: &mut Token) {
        if let Some(v) = &self.value {
            token.value = v.clone();
        }
        if let Some(v) = &self.light_value {
            token.light_value = v.clone();
        }
        if let Some(v) = &self.dark_value {
            token.dark_value = v.clone();
        }
        if let Some(v) = &self.state {
            token.state = *v;
        }
        if let Some(v) = &self.style_object {
            token.style_object = v.clone();
        }
        if let Some(v) = &self.icon_data {
            token.icon_data = v.clone();
        }
    }
}

/// Answer to a destructive-operation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The user has not been asked yet
    Pending,
    Confirmed,
    Declined,
}

/// Prompt shown before removing a token or clearing its bindings
pub fn confirmation_prompt(token: &Token) -> String {
    match token.bindings.len() {
        0 => format!("Delete token '{}'?", token.name),
        1 => format!(
            "Delete token '{}'? It is bound to 1 property and that usage will break.",
            token.name
        ),
        n => format!(
            "Delete token '{}'? It is bound to {n} properties and those usages will break.",
            token.name
        ),
    }
}

// ── Store ──────────────────────────────────────────────────────────────

/// Two-layer token store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenStore {
    #[serde(default)]
    pub primitives: Vec<TokenGroup>,
    #[serde(default)]
    pub semantic: Vec<TokenGroup>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in store used at first launch and when persisted data is unusable
    pub fn builtin() -> Self {
        let mut store = Self::new();
        let primitives = [
            Token::new("blue-500", TokenType::Color, "#0066CC"),
            Token::new("blue-700", TokenType::Color, "#004C99"),
            Token::new("gray-100", TokenType::Color, "#F3F4F6"),
            Token::new("gray-900", TokenType::Color, "#111827"),
            Token::new("white", TokenType::Color, "#FFFFFF"),
            Token::new("space-1", TokenType::Size, "4px"),
            Token::new("space-2", TokenType::Size, "8px"),
            Token::new("space-4", TokenType::Size, "16px"),
            Token::new("radius-sm", TokenType::Radius, "4px"),
            Token::new("radius-md", TokenType::Radius, "8px"),
            Token::new("font-sans", TokenType::Font, "'Inter', sans-serif")
                .with_style("weight", "400")
                .with_style("size", "16px"),
            Token::new("duration-fast", TokenType::Motion, "150ms")
                .with_style("duration", "150ms")
                .with_style("easing", "ease-out"),
        ];
        for token in primitives {
            let category = token.category;
            store.insert_unchecked(Layer::Primitive, category, token);
        }

        let semantic = [
            Token::new("color-primary", TokenType::Color, "var(--blue-500)"),
            Token::new("color-primary-hover", TokenType::Color, "var(--blue-700)"),
            Token::new("color-surface", TokenType::Color, "var(--white)")
                .with_theme_values("var(--white)", "var(--gray-900)"),
            Token::new("color-text", TokenType::Color, "var(--gray-900)")
                .with_theme_values("var(--gray-900)", "var(--gray-100)"),
            Token::new("spacing-inset", TokenType::Size, "var(--space-4)"),
            Token::new("radius-control", TokenType::Radius, "var(--radius-sm)"),
        ];
        for token in semantic {
            let category = token.category;
            store.insert_unchecked(Layer::Semantic, category, token);
        }
        store
    }

    /// Groups of one layer
    pub fn groups(&self, layer: Layer) -> &[TokenGroup] {
        match layer {
            Layer::Primitive => &self.primitives,
            Layer::Semantic => &self.semantic,
        }
    }

    fn groups_mut(&mut self, layer: Layer) -> &mut Vec<TokenGroup> {
        match layer {
            Layer::Primitive => &mut self.primitives,
            Layer::Semantic => &mut self.semantic,
        }
    }

    /// The group for (layer, category), if present
    pub fn group(&self, layer: Layer, category: Category) -> Option<&TokenGroup> {
        self.groups(layer).iter().find(|g| g.category == category)
    }

    fn group_mut(&mut self, layer: Layer, category: Category) -> Option<&mut TokenGroup> {
        self.groups_mut(layer).iter_mut().find(|g| g.category == category)
    }

    fn group_or_insert(&mut self, layer: Layer, category: Category) -> &mut TokenGroup {
        let groups = self.groups_mut(layer);
        let idx = match groups.iter().position(|g| g.category == category) {
            Some(idx) => idx,
            None => {
                groups.push(TokenGroup::new(layer, category));
                groups.len() - 1
            }
        };
        &mut groups[idx]
    }

    /// Token at `loc`
    pub fn get(&self, loc: TokenLocation) -> Option<&Token> {
        self.group(loc.layer, loc.category)?.tokens.get(loc.index)
    }

    pub(crate) fn get_mut(&mut self, loc: TokenLocation) -> Option<&mut Token> {
        self.group_mut(loc.layer, loc.category)?.tokens.get_mut(loc.index)
    }

    pub(crate) fn require(&self, loc: TokenLocation) -> Result<&Token> {
        self.get(loc)
            .ok_or_else(|| TokenError::TokenNotFound(format!("{loc:?}")))
    }

    pub(crate) fn require_mut(&mut self, loc: TokenLocation) -> Result<&mut Token> {
        self.get_mut(loc)
            .ok_or_else(|| TokenError::TokenNotFound(format!("{loc:?}")))
    }

    /// Every token with its location, primitives first
    pub fn tokens(&self) -> impl Iterator<Item = (TokenLocation, &Token)> {
        Layer::ALL.into_iter().flat_map(move |layer| {
            self.groups(layer).iter().flat_map(move |group| {
                group.tokens.iter().enumerate().map(move |(index, token)| {
                    (TokenLocation::new(layer, group.category, index), token)
                })
            })
        })
    }

    /// Look a token up by its store-wide unique name
    pub fn find_by_name(&self, name: &str) -> Option<(TokenLocation, &Token)> {
        self.tokens().find(|(_, t)| t.name == name)
    }

    /// Is `name` taken anywhere in the store?
    pub fn contains_name(&self, name: &str) -> bool {
        self.tokens().any(|(_, t)| t.name == name)
    }

    /// Total tokens across both layers
    pub fn token_count(&self) -> usize {
        Layer::ALL
            .iter()
            .flat_map(|&l| self.groups(l))
            .map(|g| g.tokens.len())
            .sum()
    }

    /// Is the store empty?
    pub fn is_empty(&self) -> bool {
        self.token_count() == 0
    }

    // ── Name generation ────────────────────────────────────────────────

    /// `base-copy`, then `base-copy-2`, `base-copy-3`, …
    pub fn copy_name(&self, base: &str) -> String {
        free_copy_name(base, |name| self.contains_name(name))
    }

    /// `base-v2`, `base-v3`, … (first free)
    pub fn variant_name(&self, base: &str) -> String {
        let mut n = 2usize;
        loop {
            let candidate = format!("{base}-v{n}");
            if !self.contains_name(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// `name` if free, otherwise its first free copy name
    fn resolve_name(&self, name: &str) -> String {
        if self.contains_name(name) {
            self.copy_name(name)
        } else {
            String::from(name)
        }
    }

    // ── Mutators ───────────────────────────────────────────────────────

    /// Append without validation or name resolution (builtin/migration paths)
    pub(crate) fn insert_unchecked(
        &mut self,
        layer: Layer,
        category: Category,
        mut token: Token,
    ) -> TokenLocation {
        token.layer = layer;
        token.category = category;
        let group = self.group_or_insert(layer, category);
        group.tokens.push(token);
        TokenLocation::new(layer, category, group.tokens.len() - 1)
    }

    /// Add a token to the (layer, category) group, creating the group if absent.
    ///
    /// Empty name or value is rejected without touching the store. A name
    /// already in use is suffixed (`-copy`, `-copy-2`, …).
    pub fn add_token(&mut self, layer: Layer, category: Category, mut token: Token) -> Result<TokenLocation> {
        if token.name.trim().is_empty() {
            return Err(TokenError::Validation(String::from("token name must not be empty")));
        }
        if token.value.trim().is_empty() {
            return Err(TokenError::Validation(String::from("token value must not be empty")));
        }
        check_bindings(&token)?;
        token.name = self.resolve_name(&token.name);
        debug!(name = %token.name, ?layer, ?category, "add token");
        Ok(self.insert_unchecked(layer, category, token))
    }

    /// Copy a token (bindings included) under a fresh `-copy` name, appended
    /// to the same group
    pub fn duplicate_token(&mut self, loc: TokenLocation) -> Result<TokenLocation> {
        let mut copy = self.require(loc)?.clone();
        copy.name = self.copy_name(&copy.name);
        debug!(from = %self.require(loc)?.name, to = %copy.name, "duplicate token");
        Ok(self.insert_unchecked(loc.layer, loc.category, copy))
    }

    /// Remove a token after the caller has confirmed.
    ///
    /// `Pending` yields `ConfirmationRequired` with the prompt text (which
    /// names the binding count); `Declined` leaves the store untouched.
    pub fn delete_token(&mut self, loc: TokenLocation, confirmation: Confirmation) -> Result<Option<Token>> {
        let token = self.require(loc)?;
        match confirmation {
            Confirmation::Pending => Err(TokenError::ConfirmationRequired {
                name: token.name.clone(),
                bindings: token.bindings.len(),
                prompt: confirmation_prompt(token),
            }),
            Confirmation::Declined => Ok(None),
            Confirmation::Confirmed => {
                debug!(name = %token.name, bindings = token.bindings.len(), "delete token");
                let group = self
                    .group_mut(loc.layer, loc.category)
                    .ok_or_else(|| TokenError::TokenNotFound(format!("{loc:?}")))?;
                Ok(Some(group.tokens.remove(loc.index)))
            }
        }
    }

    /// Apply `edit` to the token at `loc` without consulting bindings.
    /// Renames are resolved against every other token in the store.
    pub(crate) fn apply_edit(&mut self, loc: TokenLocation, edit: &TokenEdit) -> Result<()> {
        edit.validate()?;
        let current = self.require(loc)?.name.clone();
        let new_name = match &edit.name {
            Some(name) if *name != current => Some(self.resolve_name(name)),
            _ => None,
        };
        let token = self.require_mut(loc)?;
        if let Some(name) = new_name {
            token.name = name;
        }
        edit.apply_fields(token);
        Ok(())
    }

    /// Merge duplicate (layer, category) groups, re-stamp token layers and
    /// suffix repeated names. Returns the number of tokens renamed.
    pub(crate) fn normalize(&mut self) -> usize {
        for layer in Layer::ALL {
            let groups = std::mem::take(self.groups_mut(layer));
            for group in groups {
                let category = group.category;
                let target = self.group_or_insert(layer, category);
                for mut token in group.tokens {
                    token.layer = layer;
                    token.category = category;
                    target.tokens.push(token);
                }
            }
        }
        self.dedupe_names()
    }

    /// First occurrence (primitives first) keeps its name; later ones get
    /// the first copy name free anywhere in the store
    fn dedupe_names(&mut self) -> usize {
        let mut taken: HashSet<String> = self.tokens().map(|(_, t)| t.name.clone()).collect();
        let mut seen = HashSet::new();
        let mut renamed = 0;
        for layer in Layer::ALL {
            for group in self.groups_mut(layer).iter_mut() {
                for token in &mut group.tokens {
                    if seen.insert(token.name.clone()) {
                        continue;
                    }
                    let name = free_copy_name(&token.name, |n| taken.contains(n));
                    warn!(from = %token.name, to = %name, "renamed duplicate token name");
                    taken.insert(name.clone());
                    seen.insert(name.clone());
                    token.name = name;
                    renamed += 1;
                }
            }
        }
        renamed
    }
}

/// `base-copy`, `base-copy-2`, … skipping names for which `taken` holds
fn free_copy_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    let first = format!("{base}-copy");
    if !taken(&first) {
        return first;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}-copy-{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Bindings carried in on a new token obey the same rules as `add_binding`
fn check_bindings(token: &Token) -> Result<()> {
    for (i, binding) in token.bindings.iter().enumerate() {
        if !is_allowed(token.token_type, &binding.property_path) {
            return Err(TokenError::InvalidBindingPath {
                token_type: token.token_type,
                path: binding.property_path.clone(),
            });
        }
        if token.bindings[..i].iter().any(|b| b.same_usage(binding)) {
            return Err(TokenError::DuplicateBinding {
                token: token.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Binding;

    fn color(name: &str, value: &str) -> Token {
        Token::new(name, TokenType::Color, value)
    }

    #[test]
    fn test_add_creates_group() {
        let mut store = TokenStore::new();
        let loc = store
            .add_token(Layer::Primitive, Category::Colors, color("red", "#F00"))
            .unwrap();
        assert_eq!(loc.index, 0);
        assert_eq!(store.primitives.len(), 1);
        assert_eq!(store.get(loc).unwrap().layer, Layer::Primitive);
    }

    #[test]
    fn test_add_reuses_group() {
        let mut store = TokenStore::new();
        store.add_token(Layer::Primitive, Category::Colors, color("a", "#1")).unwrap();
        let loc = store.add_token(Layer::Primitive, Category::Colors, color("b", "#2")).unwrap();
        assert_eq!(store.primitives.len(), 1);
        assert_eq!(loc.index, 1);
    }

    #[test]
    fn test_add_rejects_empty_name_and_value() {
        let mut store = TokenStore::new();
        assert!(store.add_token(Layer::Primitive, Category::Colors, color("", "#F00")).is_err());
        assert!(store.add_token(Layer::Primitive, Category::Colors, color("red", "  ")).is_err());
        assert!(store.is_empty());
        assert!(store.primitives.is_empty());
    }

    #[test]
    fn test_add_colliding_name_is_suffixed() {
        let mut store = TokenStore::new();
        store.add_token(Layer::Primitive, Category::Colors, color("red", "#F00")).unwrap();
        let loc = store.add_token(Layer::Semantic, Category::Colors, color("red", "#E00")).unwrap();
        assert_eq!(store.get(loc).unwrap().name, "red-copy");
    }

    #[test]
    fn test_duplicate_name_sequence() {
        let mut store = TokenStore::new();
        let loc = store.add_token(Layer::Primitive, Category::Colors, color("red", "#F00")).unwrap();
        let c1 = store.duplicate_token(loc).unwrap();
        let c2 = store.duplicate_token(loc).unwrap();
        let c3 = store.duplicate_token(loc).unwrap();
        assert_eq!(store.get(c1).unwrap().name, "red-copy");
        assert_eq!(store.get(c2).unwrap().name, "red-copy-2");
        assert_eq!(store.get(c3).unwrap().name, "red-copy-3");
    }

    #[test]
    fn test_duplicate_scans_other_groups() {
        let mut store = TokenStore::new();
        let loc = store.add_token(Layer::Primitive, Category::Colors, color("red", "#F00")).unwrap();
        store
            .add_token(Layer::Semantic, Category::Theme, Token::new("red-copy", TokenType::Theme, "x"))
            .unwrap();
        let dup = store.duplicate_token(loc).unwrap();
        assert_eq!(store.get(dup).unwrap().name, "red-copy-2");
    }

    #[test]
    fn test_duplicate_copies_bindings() {
        let mut store = TokenStore::new();
        let token = color("red", "#F00").with_binding(Binding::component("Button", "styles.bg"));
        let loc = store.add_token(Layer::Primitive, Category::Colors, token).unwrap();
        let dup = store.duplicate_token(loc).unwrap();
        assert_eq!(store.get(dup).unwrap().bindings.len(), 1);
        store.get_mut(dup).unwrap().bindings.clear();
        assert_eq!(store.get(loc).unwrap().bindings.len(), 1);
    }

    #[test]
    fn test_delete_pending_reports_binding_count() {
        let mut store = TokenStore::new();
        let token = color("red", "#F00")
            .with_binding(Binding::component("Button", "styles.bg"))
            .with_binding(Binding::component("Badge", "styles.bg"));
        let loc = store.add_token(Layer::Primitive, Category::Colors, token).unwrap();
        let before = store.clone();
        match store.delete_token(loc, Confirmation::Pending) {
            Err(TokenError::ConfirmationRequired { bindings, prompt, .. }) => {
                assert_eq!(bindings, 2);
                assert!(prompt.contains("2 properties"));
            }
            other => panic!("expected confirmation request, got {other:?}"),
        }
        assert_eq!(store, before);
    }

    #[test]
    fn test_delete_declined_is_noop() {
        let mut store = TokenStore::new();
        let loc = store.add_token(Layer::Primitive, Category::Colors, color("red", "#F00")).unwrap();
        assert!(store.delete_token(loc, Confirmation::Declined).unwrap().is_none());
        assert_eq!(store.token_count(), 1);
    }

    #[test]
    fn test_delete_confirmed_removes_only_target() {
        let mut store = TokenStore::new();
        let loc = store.add_token(Layer::Primitive, Category::Colors, color("red", "#F00")).unwrap();
        store.add_token(Layer::Primitive, Category::Colors, color("blue", "#00F")).unwrap();
        let removed = store.delete_token(loc, Confirmation::Confirmed).unwrap().unwrap();
        assert_eq!(removed.name, "red");
        assert_eq!(store.token_count(), 1);
        assert!(store.find_by_name("blue").is_some());
    }

    #[test]
    fn test_find_by_name_across_layers() {
        let store = TokenStore::builtin();
        let (loc, token) = store.find_by_name("color-primary").unwrap();
        assert_eq!(loc.layer, Layer::Semantic);
        assert_eq!(token.value, "var(--blue-500)");
        assert!(store.find_by_name("nope").is_none());
    }

    #[test]
    fn test_variant_name_starts_at_v2() {
        let mut store = TokenStore::new();
        store.add_token(Layer::Primitive, Category::Colors, color("red", "#F00")).unwrap();
        assert_eq!(store.variant_name("red"), "red-v2");
        store.add_token(Layer::Primitive, Category::Colors, color("red-v2", "#E00")).unwrap();
        assert_eq!(store.variant_name("red"), "red-v3");
    }

    #[test]
    fn test_apply_edit_rename_resolves_collision() {
        let mut store = TokenStore::new();
        let loc = store.add_token(Layer::Primitive, Category::Colors, color("red", "#F00")).unwrap();
        store.add_token(Layer::Primitive, Category::Colors, color("blue", "#00F")).unwrap();
        store.apply_edit(loc, &TokenEdit::rename("blue")).unwrap();
        assert_eq!(store.get(loc).unwrap().name, "blue-copy");
    }

    #[test]
    fn test_apply_edit_same_name_keeps_name() {
        let mut store = TokenStore::new();
        let loc = store.add_token(Layer::Primitive, Category::Colors, color("red", "#F00")).unwrap();
        store.apply_edit(loc, &TokenEdit::rename("red")).unwrap();
        assert_eq!(store.get(loc).unwrap().name, "red");
    }

    #[test]
    fn test_normalize_merges_duplicate_groups() {
        let mut store = TokenStore::new();
        store.semantic.push(TokenGroup {
            layer: Layer::Semantic,
            category: Category::Colors,
            tokens: vec![color("a", "#1")],
        });
        store.semantic.push(TokenGroup {
            layer: Layer::Primitive,
            category: Category::Colors,
            tokens: vec![color("b", "#2")],
        });
        store.normalize();
        assert_eq!(store.semantic.len(), 1);
        assert_eq!(store.semantic[0].tokens.len(), 2);
        assert!(store.semantic[0].tokens.iter().all(|t| t.layer == Layer::Semantic));
    }

    #[test]
    fn test_normalize_suffixes_repeated_names() {
        let mut store = TokenStore::new();
        store.primitives.push(TokenGroup {
            layer: Layer::Primitive,
            category: Category::Colors,
            tokens: vec![color("a", "#1")],
        });
        store.semantic.push(TokenGroup {
            layer: Layer::Semantic,
            category: Category::Colors,
            tokens: vec![color("a", "#2"), color("a-copy", "#3"), color("a", "#4")],
        });
        assert_eq!(store.normalize(), 2);
        let names: Vec<_> = store.tokens().map(|(_, t)| (t.name.clone(), t.value.clone())).collect();
        assert_eq!(
            names,
            vec![
                (String::from("a"), String::from("#1")),
                (String::from("a-copy-2"), String::from("#2")),
                (String::from("a-copy"), String::from("#3")),
                (String::from("a-copy-3"), String::from("#4")),
            ]
        );
    }

    #[test]
    fn test_add_rejects_disallowed_incoming_binding() {
        let mut store = TokenStore::new();
        let token = Token::new("space", TokenType::Size, "4px")
            .with_binding(Binding::component("Button", "styles.bg"));
        let err = store.add_token(Layer::Primitive, Category::Spacing, token).unwrap_err();
        assert!(matches!(err, TokenError::InvalidBindingPath { token_type: TokenType::Size, .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_rejects_repeated_incoming_binding() {
        let mut store = TokenStore::new();
        let token = Token::new("space", TokenType::Size, "4px")
            .with_binding(Binding::component("Button", "styles.padding"))
            .with_binding(Binding::component("Button", "styles.padding").with_note("again"));
        let err = store.add_token(Layer::Primitive, Category::Spacing, token).unwrap_err();
        assert!(matches!(err, TokenError::DuplicateBinding { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_builtin_names_unique() {
        let store = TokenStore::builtin();
        let mut names: Vec<_> = store.tokens().map(|(_, t)| t.name.clone()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_confirmation_prompt_without_bindings() {
        let token = color("red", "#F00");
        assert_eq!(confirmation_prompt(&token), "Delete token 'red'?");
    }
}
