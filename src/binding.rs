//! Binding index and property-path allow-list
//!
//! Each token type may only bind to a fixed set of property paths. The
//! table is compiled in; it is not configurable.
//!
//! Author: Moroya Sakamoto

use tracing::debug;

use crate::error::{Result, TokenError};
use crate::store::{Confirmation, TokenStore};
use crate::token::{Binding, TokenLocation, TokenType};

// ── Allow-list ─────────────────────────────────────────────────────────

const COLOR_PATHS: &[&str] = &["styles.bg", "styles.text", "styles.border", "container.bg"];
const SIZE_PATHS: &[&str] = &["styles.padding", "styles.gap", "styles.radius", "layout.gap"];
const RADIUS_PATHS: &[&str] = &["styles.radius", "container.radius"];
const FONT_PATHS: &[&str] = &["styles.typography", "content.typography"];
const MOTION_PATHS: &[&str] = &["styles.duration", "styles.easing"];
const ICON_PATHS: &[&str] = &["icon.name", "icon.size"];

/// Property paths a token of `token_type` may bind to
pub fn allowed_paths(token_type: TokenType) -> &'static [&'static str] {
    match token_type {
        TokenType::Color => COLOR_PATHS,
        TokenType::Size => SIZE_PATHS,
        TokenType::Radius => RADIUS_PATHS,
        TokenType::Font => FONT_PATHS,
        TokenType::Motion => MOTION_PATHS,
        TokenType::Icon => ICON_PATHS,
        TokenType::Shadow | TokenType::Theme => &[],
    }
}

/// Is `path` legal for `token_type`?
#[inline]
pub fn is_allowed(token_type: TokenType, path: &str) -> bool {
    allowed_paths(token_type).contains(&path)
}

// ── Usages ─────────────────────────────────────────────────────────────

/// One usage of a token, flattened for index queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub token: String,
    pub location: TokenLocation,
    pub binding: Binding,
}

impl TokenStore {
    /// Bind the token at `loc` to a target property
    pub fn add_binding(&mut self, loc: TokenLocation, binding: Binding) -> Result<()> {
        let token = self.require(loc)?;
        if !is_allowed(token.token_type, &binding.property_path) {
            return Err(TokenError::InvalidBindingPath {
                token_type: token.token_type,
                path: binding.property_path,
            });
        }
        if token.bindings.iter().any(|b| b.same_usage(&binding)) {
            return Err(TokenError::DuplicateBinding {
                token: token.name.clone(),
            });
        }
        debug!(token = %token.name, target = %binding.target_id, path = %binding.property_path, "bind");
        self.require_mut(loc)?.bindings.push(binding);
        Ok(())
    }

    /// Drop a usage. Always permitted; returns whether it existed.
    pub fn remove_binding(&mut self, loc: TokenLocation, binding: &Binding) -> Result<bool> {
        let token = self.require_mut(loc)?;
        let before = token.bindings.len();
        token.bindings.retain(|b| !b.same_usage(binding));
        Ok(token.bindings.len() != before)
    }

    /// Remove every usage of a token. Destructive, so it goes through the
    /// same confirmation handshake as deletion.
    pub fn clear_bindings(&mut self, loc: TokenLocation, confirmation: Confirmation) -> Result<usize> {
        let token = self.require(loc)?;
        if !token.is_bound() {
            return Ok(0);
        }
        match confirmation {
            Confirmation::Pending => Err(TokenError::ConfirmationRequired {
                name: token.name.clone(),
                bindings: token.bindings.len(),
                prompt: format!(
                    "Unbind every usage of '{}'? {} bound propert{} will lose this token.",
                    token.name,
                    token.bindings.len(),
                    if token.bindings.len() == 1 { "y" } else { "ies" }
                ),
            }),
            Confirmation::Declined => Ok(0),
            Confirmation::Confirmed => {
                let cleared = std::mem::take(&mut self.require_mut(loc)?.bindings);
                Ok(cleared.len())
            }
        }
    }

    /// Every usage whose target is `target_id`
    pub fn usages_of_target(&self, target_id: &str) -> Vec<Usage> {
        self.tokens()
            .flat_map(|(location, token)| {
                token
                    .bindings
                    .iter()
                    .filter(|b| b.target_id == target_id)
                    .map(move |b| Usage {
                        token: token.name.clone(),
                        location,
                        binding: b.clone(),
                    })
            })
            .collect()
    }

    /// Bindings of the named token (empty if unknown)
    pub fn usages_of(&self, name: &str) -> &[Binding] {
        self.find_by_name(name)
            .map(|(_, t)| t.bindings.as_slice())
            .unwrap_or(&[])
    }
}
