//! Mutation operations on a [`TranslationTree`].
//!
//! Every operation validates before it mutates. Add and rename operations
//! fail on invalid or colliding keys; delete operations treat a missing
//! target as a no-op.

use crate::tree::error::{display_path, KeyKind, TreeError};
use crate::tree::key::{array_position, is_valid_key, MAX_ARRAY_INDEX};
use crate::tree::model::{Space, TranslationEntry, TranslationTree};
use crate::tree::navigate::{resolve_container, resolve_container_mut};
use crate::tree::value::TranslationValue;
use std::collections::BTreeMap;

/// Outcome of [`TranslationTree::update_translation_value`] when the entry
/// exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueUpdate {
    /// Value held for the language before the update, if any.
    pub previous: Option<TranslationValue>,
}

impl ValueUpdate {
    pub fn changed(&self, new_value: &TranslationValue) -> bool {
        self.previous.as_ref() != Some(new_value)
    }
}

fn validate(kind: KeyKind, key: &str) -> Result<(), TreeError> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(TreeError::InvalidKey {
            kind,
            key: key.to_string(),
        })
    }
}

/// Positional keys of an array-shaped container must stay within
/// [`MAX_ARRAY_INDEX`]; named keys and map-shaped containers are unbounded.
fn check_position(parent: &Space, key: &str) -> Result<(), TreeError> {
    match array_position(key) {
        Some(index) if parent.is_array && index > MAX_ARRAY_INDEX => Err(TreeError::IndexOutOfBounds {
            index,
            max: MAX_ARRAY_INDEX,
        }),
        _ => Ok(()),
    }
}

fn parent_not_found(page_key: &str, path: &[String]) -> TreeError {
    TreeError::ParentNotFound {
        path: display_path(page_key, path),
    }
}

/// Move `old_key` to `new_key` inside one map, failing if the source is
/// missing. Collision checks are the caller's job.
fn move_key<V>(map: &mut BTreeMap<String, V>, kind: KeyKind, old_key: &str, new_key: &str) -> Result<(), TreeError> {
    let value = map.remove(old_key).ok_or_else(|| TreeError::NotFound {
        kind,
        key: old_key.to_string(),
    })?;
    map.insert(new_key.to_string(), value);
    Ok(())
}

impl TranslationTree {
    // ==================== Pages ====================

    pub fn add_page(&mut self, page_key: &str) -> Result<(), TreeError> {
        validate(KeyKind::Page, page_key)?;
        if self.pages.contains_key(page_key) {
            return Err(TreeError::AlreadyExists {
                kind: KeyKind::Page,
                key: page_key.to_string(),
            });
        }
        self.pages.insert(page_key.to_string(), Space::new());
        Ok(())
    }

    /// Removes the page; returns whether it existed.
    pub fn delete_page(&mut self, page_key: &str) -> bool {
        self.pages.remove(page_key).is_some()
    }

    pub fn rename_page(&mut self, old_key: &str, new_key: &str) -> Result<(), TreeError> {
        validate(KeyKind::Page, new_key)?;
        if old_key == new_key {
            return Ok(());
        }
        if self.pages.contains_key(new_key) {
            return Err(TreeError::AlreadyExists {
                kind: KeyKind::Page,
                key: new_key.to_string(),
            });
        }
        move_key(&mut self.pages, KeyKind::Page, old_key, new_key)
    }

    // ==================== Spaces ====================

    pub fn add_space(
        &mut self,
        page_key: &str,
        parent_path: &[String],
        space_key: &str,
        is_array: bool,
    ) -> Result<(), TreeError> {
        let parent = resolve_container_mut(self, page_key, parent_path)
            .ok_or_else(|| parent_not_found(page_key, parent_path))?;
        validate(KeyKind::Space, space_key)?;
        check_position(parent, space_key)?;
        if parent.spaces.contains_key(space_key) {
            return Err(TreeError::AlreadyExists {
                kind: KeyKind::Space,
                key: space_key.to_string(),
            });
        }
        if parent.translations.contains_key(space_key) {
            return Err(TreeError::KindConflict {
                key: space_key.to_string(),
                existing: KeyKind::Translation,
            });
        }
        parent
            .spaces
            .insert(space_key.to_string(), Space::with_shape(is_array));
        Ok(())
    }

    /// Removes the child space; a missing parent or key is a no-op.
    pub fn delete_space(&mut self, page_key: &str, parent_path: &[String], space_key: &str) -> bool {
        resolve_container_mut(self, page_key, parent_path)
            .map_or(false, |parent| parent.spaces.remove(space_key).is_some())
    }

    pub fn rename_space(
        &mut self,
        page_key: &str,
        parent_path: &[String],
        old_key: &str,
        new_key: &str,
    ) -> Result<(), TreeError> {
        let parent = resolve_container_mut(self, page_key, parent_path)
            .ok_or_else(|| parent_not_found(page_key, parent_path))?;
        if old_key == new_key {
            return Ok(());
        }
        validate(KeyKind::Space, new_key)?;
        check_position(parent, new_key)?;
        if parent.spaces.contains_key(new_key) {
            return Err(TreeError::AlreadyExists {
                kind: KeyKind::Space,
                key: new_key.to_string(),
            });
        }
        if parent.translations.contains_key(new_key) {
            return Err(TreeError::KindConflict {
                key: new_key.to_string(),
                existing: KeyKind::Translation,
            });
        }
        move_key(&mut parent.spaces, KeyKind::Space, old_key, new_key)
    }

    // ==================== Translations ====================

    /// Creates an entry with one slot per active language. Languages present
    /// in `initial_values` with a truthy value take it; the rest get `""`.
    pub fn add_translation(
        &mut self,
        page_key: &str,
        parent_path: &[String],
        key: &str,
        initial_values: Option<&BTreeMap<String, TranslationValue>>,
    ) -> Result<(), TreeError> {
        let languages = self.languages.clone();
        let parent = resolve_container_mut(self, page_key, parent_path).ok_or_else(|| {
            TreeError::SpaceNotFound {
                path: display_path(page_key, parent_path),
            }
        })?;
        validate(KeyKind::Translation, key)?;
        check_position(parent, key)?;
        if parent.translations.contains_key(key) {
            return Err(TreeError::AlreadyExists {
                kind: KeyKind::Translation,
                key: key.to_string(),
            });
        }
        if parent.spaces.contains_key(key) {
            return Err(TreeError::KindConflict {
                key: key.to_string(),
                existing: KeyKind::Space,
            });
        }

        let entry: TranslationEntry = languages
            .into_iter()
            .map(|lang| {
                let value = initial_values
                    .and_then(|values| values.get(&lang))
                    .filter(|v| !v.is_falsy())
                    .cloned()
                    .unwrap_or_else(TranslationValue::empty);
                (lang, value)
            })
            .collect();
        parent.translations.insert(key.to_string(), entry);
        Ok(())
    }

    /// Removes the entry; a missing parent or key is a no-op.
    pub fn delete_translation(&mut self, page_key: &str, parent_path: &[String], key: &str) -> bool {
        resolve_container_mut(self, page_key, parent_path)
            .map_or(false, |parent| parent.translations.remove(key).is_some())
    }

    pub fn rename_translation_key(
        &mut self,
        page_key: &str,
        parent_path: &[String],
        old_key: &str,
        new_key: &str,
    ) -> Result<(), TreeError> {
        let parent = resolve_container_mut(self, page_key, parent_path)
            .ok_or_else(|| parent_not_found(page_key, parent_path))?;
        if old_key == new_key {
            return Ok(());
        }
        validate(KeyKind::Translation, new_key)?;
        check_position(parent, new_key)?;
        if parent.translations.contains_key(new_key) {
            return Err(TreeError::AlreadyExists {
                kind: KeyKind::Translation,
                key: new_key.to_string(),
            });
        }
        if parent.spaces.contains_key(new_key) {
            return Err(TreeError::KindConflict {
                key: new_key.to_string(),
                existing: KeyKind::Space,
            });
        }
        move_key(&mut parent.translations, KeyKind::Translation, old_key, new_key)
    }

    /// Sets one (key, language) cell in place. Returns `None` without
    /// touching the tree when the entry does not exist.
    pub fn update_translation_value(
        &mut self,
        page_key: &str,
        parent_path: &[String],
        key: &str,
        lang: &str,
        value: TranslationValue,
    ) -> Option<ValueUpdate> {
        let entry = resolve_container_mut(self, page_key, parent_path)?
            .translations
            .get_mut(key)?;
        let previous = entry.get(lang).cloned();
        entry.set(lang, value);
        Some(ValueUpdate { previous })
    }

    /// Reads one cell without mutating.
    pub fn translation_value(
        &self,
        page_key: &str,
        parent_path: &[String],
        key: &str,
        lang: &str,
    ) -> Option<&TranslationValue> {
        resolve_container(self, page_key, parent_path)?
            .translations
            .get(key)?
            .get(lang)
    }

    // ==================== Languages ====================

    /// Appends to the active list without touching existing entries.
    pub fn add_language(&mut self, code: &str) -> Result<(), TreeError> {
        validate(KeyKind::Language, code)?;
        if self.has_language(code) {
            return Err(TreeError::AlreadyExists {
                kind: KeyKind::Language,
                key: code.to_string(),
            });
        }
        self.languages.push(code.to_string());
        Ok(())
    }

    /// Removes `code` from the active list and from every entry; entries left
    /// without any language are pruned.
    pub fn delete_language(&mut self, code: &str) {
        self.languages.retain(|l| l != code);
        for page in self.pages.values_mut() {
            page.for_each_entry_mut(|entries| {
                entries.retain(|_, entry| {
                    entry.remove(code);
                    !entry.is_empty()
                });
            });
        }
    }

    /// Renames `old_code` in the active list and moves its value to
    /// `new_code` in every entry that has it.
    pub fn rename_language(&mut self, old_code: &str, new_code: &str) -> Result<(), TreeError> {
        validate(KeyKind::Language, new_code)?;
        if old_code == new_code {
            return Ok(());
        }
        if self.has_language(new_code) {
            return Err(TreeError::AlreadyExists {
                kind: KeyKind::Language,
                key: new_code.to_string(),
            });
        }

        for lang in self.languages.iter_mut().filter(|l| l.as_str() == old_code) {
            *lang = new_code.to_string();
        }
        for page in self.pages.values_mut() {
            page.for_each_entry_mut(|entries| {
                for entry in entries.values_mut() {
                    if let Some(value) = entry.remove(old_code) {
                        entry.set(new_code, value);
                    }
                }
            });
        }
        Ok(())
    }
}
