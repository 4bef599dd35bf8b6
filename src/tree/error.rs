//! Errors raised by tree mutations.
//!
//! Every variant is produced before the tree is touched, so a failed
//! operation never leaves a partial mutation behind.

use thiserror::Error;

/// What kind of key a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Page,
    Space,
    Translation,
    Language,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyKind::Page => "page",
            KeyKind::Space => "space",
            KeyKind::Translation => "translation",
            KeyKind::Language => "language",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("invalid {kind} key: '{key}'")]
    InvalidKey { kind: KeyKind, key: String },

    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: KeyKind, key: String },

    #[error("parent not found: {path}")]
    ParentNotFound { path: String },

    #[error("space not found: {path}")]
    SpaceNotFound { path: String },

    /// The key is already used by the other child kind in the same container.
    #[error("'{key}' is already used as a {existing} in this container")]
    KindConflict { key: String, existing: KeyKind },

    #[error("{kind} '{key}' not found")]
    NotFound { kind: KeyKind, key: String },

    #[error("container at {path} is not an array")]
    NotArray { path: String },

    #[error("index {index} is out of bounds (max {max})")]
    IndexOutOfBounds { index: usize, max: usize },

    /// Import payload whose shape cannot be merged at all.
    #[error("invalid import payload: {0}")]
    InvalidImport(String),
}

impl TreeError {
    /// True for the navigation and lookup failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TreeError::ParentNotFound { .. }
                | TreeError::SpaceNotFound { .. }
                | TreeError::NotFound { .. }
        )
    }
}

/// Render a page plus path the way error messages and audit ids show it.
pub(crate) fn display_path(page_key: &str, path: &[String]) -> String {
    if path.is_empty() {
        page_key.to_string()
    } else {
        format!("{}/{}", page_key, path.join("/"))
    }
}
