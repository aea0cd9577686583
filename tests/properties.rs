//! Property tests for store invariants
//!
//! Author: Moroya Sakamoto

use std::collections::HashSet;

use proptest::prelude::*;
use serde_json::json;
use token_forge::migrate::encode_envelope;
use token_forge::{
    decode, diff, migrate, Binding, Category, DesignSystemSnapshot, EditMode, EngineConfig, Layer,
    MemoryStorage, StyleSheet, Token, TokenEdit, TokenStore, TokenType, Workspace,
};

#[derive(Debug, Clone)]
enum Op {
    Add(Layer, String),
    Duplicate(usize),
    Rename(usize, String),
    Fork(usize),
}

fn layer() -> impl Strategy<Value = Layer> {
    prop_oneof![Just(Layer::Primitive), Just(Layer::Semantic)]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (layer(), "[a-c]{1,2}").prop_map(|(l, n)| Op::Add(l, n)),
        any::<usize>().prop_map(Op::Duplicate),
        (any::<usize>(), "[a-c]{1,2}(-copy)?").prop_map(|(i, n)| Op::Rename(i, n)),
        any::<usize>().prop_map(Op::Fork),
    ]
}

fn nth_location(store: &TokenStore, index: usize) -> Option<token_forge::TokenLocation> {
    let count = store.token_count();
    if count == 0 {
        return None;
    }
    store.tokens().nth(index % count).map(|(loc, _)| loc)
}

fn apply(store: &mut TokenStore, op: &Op) {
    match op {
        Op::Add(layer, name) => {
            let token = Token::new(name, TokenType::Color, "#000")
                .with_binding(Binding::component("Button", "styles.bg"));
            store.add_token(*layer, Category::Colors, token).unwrap();
        }
        Op::Duplicate(i) => {
            if let Some(loc) = nth_location(store, *i) {
                store.duplicate_token(loc).unwrap();
            }
        }
        Op::Rename(i, name) => {
            if let Some(loc) = nth_location(store, *i) {
                store
                    .commit_edit(loc, &TokenEdit::rename(name), EditMode::InPlace)
                    .unwrap();
            }
        }
        Op::Fork(i) => {
            if let Some(loc) = nth_location(store, *i) {
                let selection = vec![Binding::component("Button", "styles.bg")];
                store
                    .fork_variant(loc, &TokenEdit::value("#fff"), &selection)
                    .unwrap();
            }
        }
    }
}

fn names(store: &TokenStore) -> Vec<String> {
    store.tokens().map(|(_, t)| t.name.clone()).collect()
}

proptest! {
    #[test]
    fn prop_names_stay_unique(ops in prop::collection::vec(op(), 0..40)) {
        let mut store = TokenStore::new();
        for op in &ops {
            apply(&mut store, op);
        }
        let all = names(&store);
        let unique: HashSet<&String> = all.iter().collect();
        prop_assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn prop_undo_then_redo_restores(values in prop::collection::vec("#[0-9a-f]{6}", 1..10), back in 0usize..10) {
        let mut ws = Workspace::open(
            Box::new(MemoryStorage::new()),
            Box::new(StyleSheet::new()),
            EngineConfig::default(),
        ).unwrap();
        let (loc, _) = ws.store().find_by_name("blue-500").unwrap();
        let mut states = vec![ws.store().clone()];
        for value in &values {
            ws.update_token(loc, &TokenEdit::value(value)).unwrap();
            if ws.store() != states.last().unwrap() {
                states.push(ws.store().clone());
            }
        }
        prop_assert_eq!(ws.history().len(), states.len() - 1);
        let after = ws.store().clone();
        let steps = back.min(ws.history().len());
        for i in 1..=steps {
            prop_assert!(ws.undo());
            prop_assert_eq!(ws.store(), &states[states.len() - 1 - i]);
        }
        for _ in 0..steps {
            prop_assert!(ws.redo());
        }
        prop_assert_eq!(ws.store(), &after);
    }

    #[test]
    fn prop_history_is_bounded(count in 0usize..60) {
        let mut ws = Workspace::open(
            Box::new(MemoryStorage::new()),
            Box::new(StyleSheet::new()),
            EngineConfig::default(),
        ).unwrap();
        for i in 0..count {
            ws.add_token(
                Layer::Primitive,
                Category::Spacing,
                Token::new(&format!("space-x{i}"), TokenType::Size, "2px"),
            ).unwrap();
            prop_assert!(ws.history().len() <= 20);
        }
        prop_assert_eq!(ws.history().len(), count.min(20));
    }

    #[test]
    fn prop_diff_with_self_is_empty(ops in prop::collection::vec(op(), 0..20)) {
        let mut store = TokenStore::builtin();
        for op in &ops {
            apply(&mut store, op);
        }
        let snapshot = DesignSystemSnapshot::from_store(&store, Vec::new()).unwrap();
        prop_assert!(diff(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn prop_envelope_round_trip_is_identity(ops in prop::collection::vec(op(), 0..20)) {
        let mut store = TokenStore::new();
        for op in &ops {
            apply(&mut store, op);
        }
        let (decoded, report) = decode(encode_envelope(&store).unwrap());
        prop_assert!(!report.used_defaults);
        prop_assert_eq!(decoded, store);
    }

    #[test]
    fn prop_migration_is_idempotent(
        core in prop::collection::vec("[a-z]{1,6}", 0..6),
        system in prop::collection::vec("[a-z]{1,6}", 0..6),
    ) {
        let group = |layer: &str, names: &[String]| json!([{
            "layer": layer,
            "category": "colors",
            "tokens": names
                .iter()
                .map(|n| json!({ "name": n, "type": "color", "value": "#123" }))
                .collect::<Vec<_>>(),
        }]);
        let legacy = json!({ "core": group("primitive", &core), "system": group("semantic", &system) });
        let (once, _) = migrate(legacy);
        let (twice, report) = decode(encode_envelope(&once).unwrap());
        prop_assert!(!report.used_defaults);
        prop_assert_eq!(twice, once);
    }
}
