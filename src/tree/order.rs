//! Reordering positions inside an array-shaped space.

use crate::tree::error::{display_path, KeyKind, TreeError};
use crate::tree::key::{array_position, MAX_ARRAY_INDEX};
use crate::tree::model::{Space, TranslationEntry, TranslationTree};
use crate::tree::navigate::resolve_container_mut;
use std::collections::BTreeMap;

/// Either child kind occupying one position.
enum Item {
    Space(Space),
    Entry(TranslationEntry),
}

/// Position `index` gets after moving `from` to `to`.
fn shifted(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < to && index > from && index <= to {
        index - 1
    } else if to < from && index >= to && index < from {
        index + 1
    } else {
        index
    }
}

impl TranslationTree {
    /// Move the item at position `key` of an array-shaped space to
    /// `new_index`, shifting the items in between by one. Spaces and
    /// translation entries share one index sequence and are renumbered
    /// together; gaps elsewhere are preserved.
    pub fn change_order(
        &mut self,
        page_key: &str,
        parent_path: &[String],
        key: &str,
        new_index: usize,
    ) -> Result<(), TreeError> {
        let at = display_path(page_key, parent_path);
        let container = resolve_container_mut(self, page_key, parent_path)
            .ok_or_else(|| TreeError::ParentNotFound { path: at.clone() })?;
        if !container.is_array {
            return Err(TreeError::NotArray { path: at });
        }

        let not_found = || TreeError::NotFound {
            kind: KeyKind::Translation,
            key: key.to_string(),
        };
        let from = array_position(key).ok_or_else(not_found)?;
        let canonical = from.to_string();
        if !container.spaces.contains_key(&canonical) && !container.translations.contains_key(&canonical) {
            return Err(not_found());
        }
        if from > MAX_ARRAY_INDEX {
            return Err(TreeError::IndexOutOfBounds {
                index: from,
                max: MAX_ARRAY_INDEX,
            });
        }

        // only canonical positional keys take part; anything else stays put
        let is_position =
            |k: &String| array_position(k).map_or(false, |i| i <= MAX_ARRAY_INDEX && i.to_string() == *k);

        let max = container
            .spaces
            .keys()
            .chain(container.translations.keys())
            .filter(|k| is_position(k))
            .filter_map(|k| array_position(k))
            .max()
            .unwrap_or(from);
        if new_index > max {
            return Err(TreeError::IndexOutOfBounds {
                index: new_index,
                max,
            });
        }
        if from == new_index {
            return Ok(());
        }

        // renumbering a slot held by both kinds would drop one of them
        if let Some(shared) = container
            .spaces
            .keys()
            .find(|k| is_position(k) && container.translations.contains_key(*k))
        {
            return Err(TreeError::KindConflict {
                key: shared.clone(),
                existing: KeyKind::Space,
            });
        }

        let mut items: BTreeMap<usize, Item> = BTreeMap::new();
        let space_keys: Vec<String> = container.spaces.keys().filter(|k| is_position(k)).cloned().collect();
        for k in space_keys {
            if let (Some(i), Some(space)) = (array_position(&k), container.spaces.remove(&k)) {
                items.insert(i, Item::Space(space));
            }
        }
        let entry_keys: Vec<String> = container
            .translations
            .keys()
            .filter(|k| is_position(k))
            .cloned()
            .collect();
        for k in entry_keys {
            if let (Some(i), Some(entry)) = (array_position(&k), container.translations.remove(&k)) {
                items.insert(i, Item::Entry(entry));
            }
        }

        for (index, item) in items {
            let target = shifted(index, from, new_index).to_string();
            match item {
                Item::Space(space) => {
                    container.spaces.insert(target, space);
                }
                Item::Entry(entry) => {
                    container.translations.insert(target, entry);
                }
            }
        }
        Ok(())
    }
}
