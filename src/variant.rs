//! Variant engine
//!
//! Decides how an edit lands on a token. Unbound tokens are edited in
//! place. Bound tokens either get an explicitly accepted in-place edit or
//! fork a variant that takes over a selected subset of the bindings,
//! leaving the original and its other consumers untouched.
//!
//! Author: Moroya Sakamoto

use tracing::debug;

use crate::error::{Result, TokenError};
use crate::store::{TokenEdit, TokenStore};
use crate::token::{Binding, TokenLocation};

/// How the caller wants an edit committed
#[derive(Debug, Clone, PartialEq)]
pub enum EditMode {
    /// Plain edit; refused when the token is bound
    Direct,
    /// Caller accepts changing every consumer (icon metadata, renames)
    InPlace,
    /// Move the selected bindings to a new derived token
    Fork(Vec<Binding>),
}

/// What an edit did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Nothing changed (empty edit or empty fork selection)
    Unchanged,
    /// The token at this location was modified
    Updated(TokenLocation),
    /// A new variant token was appended
    Forked {
        original: TokenLocation,
        variant: TokenLocation,
    },
}

impl TokenStore {
    /// Direct field update. Fails on bound tokens; see [`TokenStore::commit_edit`].
    pub fn update_token(&mut self, loc: TokenLocation, edit: &TokenEdit) -> Result<EditOutcome> {
        self.commit_edit(loc, edit, EditMode::Direct)
    }

    /// Commit `edit` to the token at `loc` according to `mode`
    pub fn commit_edit(&mut self, loc: TokenLocation, edit: &TokenEdit, mode: EditMode) -> Result<EditOutcome> {
        edit.validate()?;
        let token = self.require(loc)?;
        match mode {
            EditMode::Direct if token.is_bound() => Err(TokenError::BoundTokenEdit {
                name: token.name.clone(),
                bindings: token.bindings.len(),
            }),
            EditMode::Direct | EditMode::InPlace => {
                if edit.is_empty() {
                    return Ok(EditOutcome::Unchanged);
                }
                debug!(name = %token.name, "edit token in place");
                self.apply_edit(loc, edit)?;
                Ok(EditOutcome::Updated(loc))
            }
            EditMode::Fork(selection) => self.fork_variant(loc, edit, &selection),
        }
    }

    /// Fork a variant of the token at `loc` carrying `edit` and the
    /// selected bindings. An empty selection (or one matching none of the
    /// token's bindings) changes nothing.
    pub fn fork_variant(&mut self, loc: TokenLocation, edit: &TokenEdit, selection: &[Binding]) -> Result<EditOutcome> {
        edit.validate()?;
        let original = self.require(loc)?;
        let (moved, kept): (Vec<Binding>, Vec<Binding>) = original
            .bindings
            .iter()
            .cloned()
            .partition(|b| selection.iter().any(|s| s.same_usage(b)));
        if moved.is_empty() {
            return Ok(EditOutcome::Unchanged);
        }

        let mut variant = original.clone();
        edit.apply_fields(&mut variant);
        variant.name = self.variant_name(&original.name);
        variant.bindings = moved;
        debug!(
            original = %original.name,
            variant = %variant.name,
            moved = variant.bindings.len(),
            kept = kept.len(),
            "fork variant"
        );

        self.require_mut(loc)?.bindings = kept;
        let variant_loc = self.insert_unchecked(loc.layer, loc.category, variant);
        Ok(EditOutcome::Forked {
            original: loc,
            variant: variant_loc,
        })
    }
}
