//! Editing session
//!
//! [`Workspace`] is the single owner of the live token store. Every
//! mutation goes through one path:
//!
//! 1. snapshot the store
//! 2. apply the operation
//! 3. on error, restore the snapshot (no partial state is observable)
//! 4. on change, push history, persist, re-project and notify observers
//!
//! Undo and redo swap whole snapshots and run the same trailing effects.
//!
//! Author: Moroya Sakamoto

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::diff::{Component, DesignSystemSnapshot};
use crate::error::{Result, TokenError};
use crate::history::{shortcut_applies, Focus, History, Shortcut};
use crate::import::{import_into, parse_declarations, ImportReport};
use crate::migrate::MigrationReport;
use crate::persist::{load_store, save_store, KeyValueStore};
use crate::projection::{computed_value, project, StyleSink, ThemeMode};
use crate::store::{Confirmation, TokenEdit, TokenStore};
use crate::token::{Binding, Category, Layer, Token, TokenLocation};
use crate::variant::{EditMode, EditOutcome};

type Observer = Box<dyn FnMut(&TokenStore)>;

/// Live token store with history, persistence and projection attached
pub struct Workspace {
    store: TokenStore,
    history: History,
    sink: Box<dyn StyleSink>,
    storage: Box<dyn KeyValueStore>,
    config: EngineConfig,
    observers: Vec<Observer>,
    migration: MigrationReport,
}

impl Workspace {
    /// Load (and migrate) the persisted store, then project it.
    ///
    /// A payload that was migrated or replaced by defaults is written back
    /// in the current format straight away.
    pub fn open(
        storage: Box<dyn KeyValueStore>,
        sink: Box<dyn StyleSink>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (store, migration) = load_store(storage.as_ref(), &config.storage_key)?;
        let mut workspace = Self {
            store,
            history: History::with_limit(config.history_limit),
            sink,
            storage,
            config,
            observers: Vec::new(),
            migration,
        };
        if workspace.migration.needs_rewrite() {
            workspace.flush()?;
        }
        workspace.reproject();
        Ok(workspace)
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sink(&self) -> &dyn StyleSink {
        self.sink.as_ref()
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }

    /// How the store was recovered at open
    pub fn migration(&self) -> &MigrationReport {
        &self.migration
    }

    pub fn theme(&self) -> ThemeMode {
        self.config.theme
    }

    /// Switch theme and re-project. Not an undoable edit.
    pub fn set_theme(&mut self, theme: ThemeMode) {
        if self.config.theme != theme {
            self.config.theme = theme;
            self.reproject();
        }
    }

    /// Register a callback run with the new state after every change
    pub fn subscribe(&mut self, observer: impl FnMut(&TokenStore) + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ── Mutations ──────────────────────────────────────────────────────

    pub fn add_token(&mut self, layer: Layer, category: Category, token: Token) -> Result<TokenLocation> {
        self.mutate(|store| store.add_token(layer, category, token))
    }

    pub fn update_token(&mut self, loc: TokenLocation, edit: &TokenEdit) -> Result<EditOutcome> {
        self.mutate(|store| store.update_token(loc, edit))
    }

    pub fn commit_edit(&mut self, loc: TokenLocation, edit: &TokenEdit, mode: EditMode) -> Result<EditOutcome> {
        self.mutate(|store| store.commit_edit(loc, edit, mode))
    }

    pub fn fork_variant(&mut self, loc: TokenLocation, edit: &TokenEdit, selection: &[Binding]) -> Result<EditOutcome> {
        self.mutate(|store| store.fork_variant(loc, edit, selection))
    }

    pub fn duplicate_token(&mut self, loc: TokenLocation) -> Result<TokenLocation> {
        self.mutate(|store| store.duplicate_token(loc))
    }

    pub fn delete_token(&mut self, loc: TokenLocation, confirmation: Confirmation) -> Result<Option<Token>> {
        self.mutate(|store| store.delete_token(loc, confirmation))
    }

    pub fn add_binding(&mut self, loc: TokenLocation, binding: Binding) -> Result<()> {
        self.mutate(|store| store.add_binding(loc, binding))
    }

    pub fn remove_binding(&mut self, loc: TokenLocation, binding: &Binding) -> Result<bool> {
        self.mutate(|store| store.remove_binding(loc, binding))
    }

    pub fn clear_bindings(&mut self, loc: TokenLocation, confirmation: Confirmation) -> Result<usize> {
        self.mutate(|store| store.clear_bindings(loc, confirmation))
    }

    /// Parse `--name: value` declarations from `text` and merge them
    pub fn import_css(&mut self, text: &str) -> Result<ImportReport> {
        let imported = parse_declarations(text);
        self.mutate(|store| Ok(import_into(store, &imported)))
    }

    /// Replace the whole store (e.g. a pulled remote state) as one undoable
    /// step. Repeated names are suffixed on the way in.
    pub fn replace_store(&mut self, mut store: TokenStore) -> Result<()> {
        let renamed = store.normalize();
        if renamed > 0 {
            debug!(renamed, "suffixed repeated names in replacement store");
        }
        self.mutate(move |current| {
            *current = store;
            Ok(())
        })
    }

    // ── History ────────────────────────────────────────────────────────

    /// Restore the previous snapshot. `false` if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(&self.store) else {
            return false;
        };
        self.store = previous;
        debug!(remaining = self.history.len(), "undo");
        self.after_change();
        true
    }

    /// Re-apply the last undone snapshot. `false` if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(&self.store) else {
            return false;
        };
        self.store = next;
        debug!(remaining = self.history.redo_len(), "redo");
        self.after_change();
        true
    }

    /// Keyboard entry point. Returns whether the shortcut did anything;
    /// focus inside a text field leaves the keystroke to the field.
    pub fn handle_shortcut(&mut self, shortcut: Shortcut, focus: Focus) -> bool {
        if !shortcut_applies(focus) {
            return false;
        }
        match shortcut {
            Shortcut::Undo => self.undo(),
            Shortcut::Redo => self.redo(),
        }
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// Display value of `name` as resolved through the projected variables
    pub fn computed_value(&self, name: &str) -> Result<String> {
        let (_, token) = self
            .store
            .find_by_name(name)
            .ok_or_else(|| TokenError::TokenNotFound(String::from(name)))?;
        Ok(computed_value(token, self.sink.as_ref(), self.config.theme))
    }

    /// Snapshot the current store together with `components` for versioning
    pub fn snapshot(&self, components: Vec<Component>) -> Result<DesignSystemSnapshot> {
        DesignSystemSnapshot::from_store(&self.store, components)
    }

    /// Write the current store to storage
    pub fn flush(&mut self) -> Result<()> {
        save_store(self.storage.as_mut(), &self.config.storage_key, &self.store)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn mutate<T>(&mut self, op: impl FnOnce(&mut TokenStore) -> Result<T>) -> Result<T> {
        let before = self.store.clone();
        match op(&mut self.store) {
            Ok(value) => {
                if self.store != before {
                    self.history.push(&before);
                    self.after_change();
                }
                Ok(value)
            }
            Err(err) => {
                self.store = before;
                Err(err)
            }
        }
    }

    fn after_change(&mut self) {
        // In-memory state stays authoritative when the backend is unavailable
        if let Err(err) = self.flush() {
            warn!(%err, key = %self.config.storage_key, "failed to persist token store");
        }
        self.reproject();
        for observer in &mut self.observers {
            observer(&self.store);
        }
    }

    fn reproject(&mut self) {
        let written = project(&self.store, self.sink.as_mut(), self.config.theme);
        debug!(written, "projected tokens");
    }
}
