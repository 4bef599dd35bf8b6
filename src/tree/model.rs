//! The recursive translation tree.
//!
//! A [`TranslationTree`] maps page keys to root [`Space`]s. Each space owns
//! its child spaces and its translation entries; there are no back
//! references. The serialized form is the document the persistence layer
//! stores: `{ "translations": { page: Space }, "languages": [..] }`.

use crate::tree::value::TranslationValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A leaf: one value per language code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationEntry(BTreeMap<String, TranslationValue>);

impl TranslationEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, lang: &str) -> Option<&TranslationValue> {
        self.0.get(lang)
    }

    pub fn set(&mut self, lang: impl Into<String>, value: TranslationValue) {
        self.0.insert(lang.into(), value);
    }

    pub fn remove(&mut self, lang: &str) -> Option<TranslationValue> {
        self.0.remove(lang)
    }

    pub fn contains(&self, lang: &str) -> bool {
        self.0.contains_key(lang)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TranslationValue)> {
        self.0.iter()
    }

    /// Value exported for `lang`. Missing and falsy values both become `""`.
    pub fn export_value(&self, lang: &str) -> serde_json::Value {
        match self.0.get(lang) {
            Some(value) if !value.is_falsy() => value.to_json(),
            _ => serde_json::Value::String(String::new()),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, TranslationValue)> for TranslationEntry {
    fn from_iter<I: IntoIterator<Item = (K, TranslationValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A container node: named map or, when `is_array` is set, a sparse sequence
/// keyed by non-negative integer strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Space {
    #[serde(default)]
    pub translations: BTreeMap<String, TranslationEntry>,
    #[serde(default)]
    pub spaces: BTreeMap<String, Space>,
    #[serde(default, rename = "isArray", skip_serializing_if = "is_false")]
    pub is_array: bool,
}

impl Space {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn array() -> Self {
        Self {
            is_array: true,
            ..Self::default()
        }
    }

    pub fn with_shape(is_array: bool) -> Self {
        Self {
            is_array,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty() && self.spaces.is_empty()
    }

    /// Visit every translation entry in this subtree mutably.
    ///
    /// Walks with an explicit stack so arbitrarily deep trees do not grow the
    /// native call stack.
    pub fn for_each_entry_mut(&mut self, mut f: impl FnMut(&mut BTreeMap<String, TranslationEntry>)) {
        let mut stack: Vec<&mut Space> = vec![self];
        while let Some(space) = stack.pop() {
            f(&mut space.translations);
            stack.extend(space.spaces.values_mut());
        }
    }

    /// Count of translation entries in this subtree.
    pub fn entry_count(&self) -> usize {
        let mut stack: Vec<&Space> = vec![self];
        let mut count = 0;
        while let Some(space) = stack.pop() {
            count += space.translations.len();
            stack.extend(space.spaces.values());
        }
        count
    }
}

/// The whole document: pages plus the ordered list of active languages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationTree {
    #[serde(default, rename = "translations")]
    pub pages: BTreeMap<String, Space>,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl TranslationTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: BTreeMap::new(),
            languages: languages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_language(&self, code: &str) -> bool {
        self.languages.iter().any(|l| l == code)
    }

    pub fn page(&self, page_key: &str) -> Option<&Space> {
        self.pages.get(page_key)
    }

    pub fn page_keys(&self) -> Vec<String> {
        self.pages.keys().cloned().collect()
    }

    /// True when there is nothing worth persisting.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.languages.is_empty()
    }
}
