//! Token Forge — Design-Token Engine
//!
//! Don't edit shared tokens, fork them.
//!
//! Layered design tokens with usage-aware editing:
//! - Primitive and semantic layers, one group per category, globally unique names
//! - Binding allow-list per token type (which component properties a token may drive)
//! - Variant forking: move a subset of bindings to a derived token instead of
//!   silently changing every consumer
//! - Live projection into a style-variable namespace (`--name: value`)
//! - Bounded snapshot undo/redo, durable persistence and schema migration
//! - Version diff, impact analysis and 3-way conflict detection over snapshots
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`token`] | Token, binding and group data model |
//! | [`store`] | Layered store: add, duplicate, delete, name suffixing |
//! | [`binding`] | Allow-list and binding add/remove/clear, usage lookup |
//! | [`variant`] | Edit modes: direct, in-place, fork a variant |
//! | [`projection`] | Push tokens into a style sink; computed values; CSS export |
//! | [`history`] | Bounded undo/redo snapshots and shortcut focus rules |
//! | [`migrate`] | Versioned envelope and legacy payload migration |
//! | [`persist`] | Key-value storage backends (memory, file) |
//! | [`import`] | Custom-property import from CSS text |
//! | [`workspace`] | Editing session tying store, history, storage and sink together |
//! | [`diff`] | Design-system snapshots and field-level diff |
//! | [`impact`] | Breaking-change detection and impact level |
//! | [`version`] | Semver version log with approval workflow |
//! | [`merge`] | 3-way snapshot conflict detection |
//! | [`config`] | TOML-loadable engine settings |
//!
//! # Quick Start
//!
//! ```
//! use token_forge::{
//!     Binding, EditMode, EditOutcome, EngineConfig, MemoryStorage, StyleSheet, TokenEdit,
//!     Workspace,
//! };
//!
//! let mut ws = Workspace::open(
//!     Box::new(MemoryStorage::new()),
//!     Box::new(StyleSheet::new()),
//!     EngineConfig::default(),
//! )
//! .unwrap();
//!
//! // Two components use the primary color
//! let (loc, _) = ws.store().find_by_name("color-primary").unwrap();
//! let button = Binding::component("Button", "styles.bg");
//! let card = Binding::component("Card", "styles.border");
//! ws.add_binding(loc, button.clone()).unwrap();
//! ws.add_binding(loc, card).unwrap();
//!
//! // Recolor only the button: fork a variant carrying its binding
//! let edit = TokenEdit::value("#ff0000");
//! let outcome = ws.commit_edit(loc, &edit, EditMode::Fork(vec![button])).unwrap();
//! assert!(matches!(outcome, EditOutcome::Forked { .. }));
//! assert_eq!(ws.computed_value("color-primary").unwrap(), "#0066CC");
//! assert_eq!(ws.computed_value("color-primary-v2").unwrap(), "#ff0000");
//! ```
//!
//! Author: Moroya Sakamoto

pub mod binding;
pub mod config;
pub mod diff;
pub mod error;
pub mod history;
pub mod impact;
pub mod import;
pub mod merge;
pub mod migrate;
pub mod persist;
pub mod projection;
pub mod store;
pub mod token;
pub mod variant;
pub mod version;
pub mod workspace;

pub use binding::{allowed_paths, is_allowed, Usage};
pub use config::EngineConfig;
pub use diff::{diff, ChangeType, Component, DesignSystemSnapshot, Diff, DiffItem, FieldChange, SnapshotToken};
pub use error::{Result, TokenError};
pub use history::{Focus, History, Shortcut, DEFAULT_HISTORY_LIMIT};
pub use impact::{analyze_impact, analyze_impact_with, BreakingChange, BreakingKind, ImpactAnalysis, ImpactLevel, ImpactPolicy};
pub use import::{import_into, parse_declarations, ImportReport, ImportedToken};
pub use merge::{detect_conflicts, Conflict, ItemKind, MergeResult};
pub use migrate::{decode, migrate, MigrationReport, PayloadShape, CURRENT_SCHEMA_VERSION};
pub use persist::{load_store, save_store, FileStorage, KeyValueStore, MemoryStorage, STORAGE_KEY};
pub use projection::{computed_value, project, StyleSheet, StyleSink, ThemeMode};
pub use store::{Confirmation, TokenEdit, TokenStore};
pub use token::{Binding, Category, Layer, TargetType, Token, TokenGroup, TokenLocation, TokenType};
pub use variant::{EditMode, EditOutcome};
pub use version::{VersionHistory, VersionLog, VersionStatus, VersionType};
pub use workspace::Workspace;
