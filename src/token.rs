//! Token data model
//!
//! Tokens are named design values grouped by (layer, category). The
//! primitive layer holds raw values; the semantic layer holds contextual
//! aliases that usually reference a primitive via `var(--name)`.
//!
//! Author: Moroya Sakamoto

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Storage layer of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Raw values (`#0066CC`, `16px`)
    Primitive,
    /// Contextual aliases (`var(--blue-500)`)
    Semantic,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Primitive, Layer::Semantic];
}

/// Token category; one group per (layer, category)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Colors,
    Typography,
    Spacing,
    Radius,
    Shadows,
    Theme,
    Motion,
    Icons,
}

impl Category {
    /// Natural category for a token type
    pub fn for_type(token_type: TokenType) -> Self {
        match token_type {
            TokenType::Color => Category::Colors,
            TokenType::Font => Category::Typography,
            TokenType::Size => Category::Spacing,
            TokenType::Radius => Category::Radius,
            TokenType::Shadow => Category::Shadows,
            TokenType::Theme => Category::Theme,
            TokenType::Motion => Category::Motion,
            TokenType::Icon => Category::Icons,
        }
    }
}

/// Value type of a token; keys the binding allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Color,
    Font,
    Size,
    Radius,
    Shadow,
    Theme,
    Motion,
    Icon,
}

/// Interaction state a token applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenState {
    #[default]
    Default,
    Hover,
    Focus,
    Disabled,
}

/// Icon metadata carried by `icon` tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconData {
    pub pack: String,
    pub name: String,
    pub size_ref: String,
    pub library: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_content: Option<String>,
}

/// What kind of thing a binding points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Component,
    Module,
}

/// A recorded usage of a token by a component or module property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub target_type: TargetType,
    pub target_id: String,
    pub property_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Binding {
    pub fn new(target_type: TargetType, target_id: &str, property_path: &str) -> Self {
        Self {
            target_type,
            target_id: String::from(target_id),
            property_path: String::from(property_path),
            note: None,
        }
    }

    /// Shorthand for a component binding
    pub fn component(target_id: &str, property_path: &str) -> Self {
        Self::new(TargetType::Component, target_id, property_path)
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(String::from(note));
        self
    }

    /// Identity ignores the note: same target + same path is the same usage
    pub fn same_usage(&self, other: &Binding) -> bool {
        self.target_type == other.target_type
            && self.target_id == other.target_id
            && self.property_path == other.property_path
    }
}

/// A named design value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub name: String,
    pub layer: Layer,
    pub category: Category,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TokenState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_object: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_data: Option<IconData>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl Token {
    /// New token; layer and category are stamped by the store on insert
    pub fn new(name: &str, token_type: TokenType, value: &str) -> Self {
        Self {
            name: String::from(name),
            layer: Layer::Primitive,
            category: Category::for_type(token_type),
            token_type,
            value: String::from(value),
            light_value: None,
            dark_value: None,
            state: None,
            style_object: None,
            icon_data: None,
            bindings: Vec::new(),
        }
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn with_theme_values(mut self, light: &str, dark: &str) -> Self {
        self.light_value = Some(String::from(light));
        self.dark_value = Some(String::from(dark));
        self
    }

    pub fn with_style(mut self, key: &str, value: &str) -> Self {
        self.style_object
            .get_or_insert_with(BTreeMap::new)
            .insert(String::from(key), String::from(value));
        self
    }

    /// True if any component or module uses this token
    #[inline]
    pub fn is_bound(&self) -> bool {
        !self.bindings.is_empty()
    }

    /// Projected style variable name (`--<name>`)
    pub fn variable_name(&self) -> String {
        format!("--{}", self.name)
    }
}

/// Unit of storage: all tokens of one category within one layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenGroup {
    pub layer: Layer,
    pub category: Category,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

impl TokenGroup {
    pub fn new(layer: Layer, category: Category) -> Self {
        Self {
            layer,
            category,
            tokens: Vec::new(),
        }
    }
}

/// Address of a token inside the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenLocation {
    pub layer: Layer,
    pub category: Category,
    /// Position within the group's token list
    pub index: usize,
}

impl TokenLocation {
    pub fn new(layer: Layer, category: Category, index: usize) -> Self {
        Self {
            layer,
            category,
            index,
        }
    }
}
