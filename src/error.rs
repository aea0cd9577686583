//! Error types for the token engine
//!
//! Validation failures are rejected before any state changes. Name
//! collisions and malformed persisted payloads never reach callers: the
//! former are resolved by suffixing, the latter by falling back to the
//! built-in store.
//!
//! Author: Moroya Sakamoto

use thiserror::Error;

use crate::token::TokenType;

/// Main error type for token engine operations
#[derive(Error, Debug)]
pub enum TokenError {
    /// Empty name/value or otherwise malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Property path not in the allow-list for this token type
    #[error("Property path '{path}' is not bindable for {token_type:?} tokens")]
    InvalidBindingPath { token_type: TokenType, path: String },

    /// Same target and property path already bound
    #[error("Duplicate binding on '{token}'")]
    DuplicateBinding { token: String },

    /// Direct edit attempted on a token that other targets still use
    #[error("Token '{name}' has {bindings} binding(s); edit in place or fork a variant")]
    BoundTokenEdit { name: String, bindings: usize },

    /// Destructive operation waiting on the user
    #[error("Confirmation required: {prompt}")]
    ConfirmationRequired {
        name: String,
        bindings: usize,
        prompt: String,
    },

    /// Location or name does not resolve to a token
    #[error("Token not found: {0}")]
    TokenNotFound(String),

    /// Key-value storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Version id not present in the log
    #[error("Version not found: {0}")]
    VersionNotFound(String),
}

/// Result type alias for token engine operations
pub type Result<T> = std::result::Result<T, TokenError>;

impl From<std::io::Error> for TokenError {
    fn from(err: std::io::Error) -> Self {
        TokenError::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for TokenError {
    fn from(err: toml::de::Error) -> Self {
        TokenError::Config(err.to_string())
    }
}
