//! Resolving a page plus a path of space keys to a container.

use crate::tree::model::{Space, TranslationTree};
use std::collections::BTreeMap;

/// Read-only lookup. Returns `None` if the page or any step of the path is
/// missing; never creates nodes.
pub fn resolve_container<'a>(
    tree: &'a TranslationTree,
    page_key: &str,
    path: &[String],
) -> Option<&'a Space> {
    let mut current = tree.pages.get(page_key)?;
    for key in path {
        current = current.spaces.get(key)?;
    }
    Some(current)
}

/// Mutable variant of [`resolve_container`]; cost is bounded by the path
/// length.
pub fn resolve_container_mut<'a>(
    tree: &'a mut TranslationTree,
    page_key: &str,
    path: &[String],
) -> Option<&'a mut Space> {
    let mut current = tree.pages.get_mut(page_key)?;
    for key in path {
        current = current.spaces.get_mut(key)?;
    }
    Some(current)
}

/// Get-or-create lookup used by import: missing pages and intermediate
/// spaces are synthesized as empty map-shaped containers.
pub fn get_or_create_container<'a>(
    pages: &'a mut BTreeMap<String, Space>,
    page_key: &str,
    path: &[String],
) -> &'a mut Space {
    let mut current = pages.entry(page_key.to_string()).or_default();
    for key in path {
        current = current.spaces.entry(key.clone()).or_default();
    }
    current
}
