//! Merging external JSON for one language into the tree.
//!
//! Shape is inferred from the incoming value types: primitives become
//! translation entries, objects become map-shaped spaces and arrays become
//! array-shaped spaces keyed by position; positions past
//! [`MAX_ARRAY_INDEX`] are skipped. A key already known as the other
//! kind is skipped with a warning rather than overwritten. Import is best
//! effort: bad keys and conflicts are reported, the rest is merged.

use crate::tree::error::{display_path, KeyKind, TreeError};
use crate::tree::key::{array_position, is_valid_key, MAX_ARRAY_INDEX};
use crate::tree::model::{Space, TranslationEntry, TranslationTree};
use crate::tree::navigate::get_or_create_container;
use crate::tree::value::TranslationValue;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One created or updated cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportChange {
    pub path: String,
    pub value: TranslationValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<TranslationValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    InvalidKey,
    AlreadySpace,
    AlreadyTranslation,
    NotAContainer,
    PositionOutOfRange,
}

/// A key the import left alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportWarning {
    pub path: String,
    pub key: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub language: String,
    pub language_added: bool,
    pub additions: Vec<ImportChange>,
    pub updates: Vec<ImportChange>,
    pub unchanged: usize,
    pub skipped: Vec<ImportWarning>,
}

impl ImportReport {
    pub fn is_noop(&self) -> bool {
        !self.language_added && self.additions.is_empty() && self.updates.is_empty()
    }
}

/// Pending merge of `value` into the container at `page/path`.
struct Job<'v> {
    page: String,
    path: Vec<String>,
    value: &'v Value,
}

struct Merger<'r> {
    lang: &'r str,
    languages: &'r [String],
    report: &'r mut ImportReport,
}

impl Merger<'_> {
    fn skip(&mut self, at: String, key: &str, reason: SkipReason) {
        match reason {
            SkipReason::InvalidKey => warn!("Skipping invalid key '{}' at {}", key, at),
            SkipReason::AlreadySpace => {
                warn!("Skipping key '{}' at {}: it is already a space", key, at)
            }
            SkipReason::AlreadyTranslation => {
                warn!("Skipping key '{}' at {}: it is already a translation", key, at)
            }
            SkipReason::NotAContainer => {
                warn!("Skipping '{}' at {}: expected an object or array", key, at)
            }
            SkipReason::PositionOutOfRange => warn!(
                "Skipping position {} at {}: arrays hold at most {} items",
                key,
                at,
                MAX_ARRAY_INDEX + 1
            ),
        }
        self.report.skipped.push(ImportWarning {
            path: at,
            key: key.to_string(),
            reason,
        });
    }

    /// Set `[lang]` on an existing entry, or create the entry with zero
    /// values of the same kind for every other active language.
    fn merge_leaf(
        &mut self,
        translations: &mut BTreeMap<String, TranslationEntry>,
        at: &str,
        key: &str,
        value: TranslationValue,
    ) {
        let path = format!("{}/{}", at, key);
        match translations.get_mut(key) {
            Some(entry) => {
                let previous = entry.get(self.lang).cloned();
                if previous.as_ref() == Some(&value) {
                    self.report.unchanged += 1;
                } else {
                    self.report.updates.push(ImportChange {
                        path,
                        value: value.clone(),
                        previous,
                    });
                }
                entry.set(self.lang, value);
            }
            None => {
                let entry: TranslationEntry = self
                    .languages
                    .iter()
                    .map(|l| {
                        let v = if l == self.lang {
                            value.clone()
                        } else {
                            value.zero_like()
                        };
                        (l.as_str(), v)
                    })
                    .collect();
                translations.insert(key.to_string(), entry);
                self.report.additions.push(ImportChange {
                    path,
                    value,
                    previous: None,
                });
            }
        }
    }

    /// Merge one job's value into its container; returns the child jobs.
    fn run<'v>(&mut self, pages: &mut BTreeMap<String, Space>, job: Job<'v>) -> Vec<Job<'v>> {
        let at = display_path(&job.page, &job.path);
        let container = get_or_create_container(pages, &job.page, &job.path);
        let mut children = Vec::new();

        let descend = |key: String| {
            let mut path = job.path.clone();
            path.push(key);
            path
        };

        match job.value {
            Value::Array(items) => {
                if items.len() > MAX_ARRAY_INDEX + 1 {
                    self.skip(at.clone(), &(MAX_ARRAY_INDEX + 1).to_string(), SkipReason::PositionOutOfRange);
                }
                for (index, item) in items.iter().enumerate().take(MAX_ARRAY_INDEX + 1) {
                    let key = index.to_string();
                    if let Some(value) = TranslationValue::from_json(item) {
                        if container.spaces.contains_key(&key) {
                            self.skip(at.clone(), &key, SkipReason::AlreadySpace);
                            continue;
                        }
                        self.merge_leaf(&mut container.translations, &at, &key, value);
                    } else {
                        if container.translations.contains_key(&key) {
                            self.skip(at.clone(), &key, SkipReason::AlreadyTranslation);
                            continue;
                        }
                        container
                            .spaces
                            .entry(key.clone())
                            .or_insert_with(|| Space::with_shape(item.is_array()));
                        children.push(Job {
                            page: job.page.clone(),
                            path: descend(key),
                            value: item,
                        });
                    }
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    if !is_valid_key(key) {
                        self.skip(at.clone(), key, SkipReason::InvalidKey);
                        continue;
                    }
                    if container.is_array && array_position(key).map_or(false, |i| i > MAX_ARRAY_INDEX) {
                        self.skip(at.clone(), key, SkipReason::PositionOutOfRange);
                        continue;
                    }
                    if let Some(value) = TranslationValue::from_json(item) {
                        if container.spaces.contains_key(key) {
                            self.skip(at.clone(), key, SkipReason::AlreadySpace);
                            continue;
                        }
                        self.merge_leaf(&mut container.translations, &at, key, value);
                    } else {
                        if container.translations.contains_key(key) {
                            self.skip(at.clone(), key, SkipReason::AlreadyTranslation);
                            continue;
                        }
                        let space = container
                            .spaces
                            .entry(key.clone())
                            .or_insert_with(|| Space::with_shape(item.is_array()));
                        if item.is_array() {
                            space.is_array = true;
                        }
                        children.push(Job {
                            page: job.page.clone(),
                            path: descend(key.clone()),
                            value: item,
                        });
                    }
                }
            }
            // jobs are only created for containers
            _ => {}
        }

        children
    }
}

impl TranslationTree {
    /// Merge `data` (`{ pageKey: object | array }`) into the tree for `lang`.
    ///
    /// The language is activated first so back-filling sees the full
    /// language set. Fails only when `lang` is invalid or `data` is not an
    /// object; everything else is reported in the returned
    /// [`ImportReport`].
    pub fn import_translations(&mut self, lang: &str, data: &Value) -> Result<ImportReport, TreeError> {
        if !is_valid_key(lang) {
            return Err(TreeError::InvalidKey {
                kind: KeyKind::Language,
                key: lang.to_string(),
            });
        }
        let Value::Object(pages) = data else {
            return Err(TreeError::InvalidImport(
                "expected an object keyed by page".to_string(),
            ));
        };

        let mut report = ImportReport {
            language: lang.to_string(),
            ..ImportReport::default()
        };
        if !self.has_language(lang) {
            self.languages.push(lang.to_string());
            report.language_added = true;
        }

        let languages = self.languages.clone();
        let mut merger = Merger {
            lang,
            languages: &languages,
            report: &mut report,
        };

        let mut stack: Vec<Job<'_>> = Vec::new();
        for (page_key, value) in pages.iter().rev() {
            if !is_valid_key(page_key) {
                merger.skip(String::new(), page_key, SkipReason::InvalidKey);
                continue;
            }
            if !(value.is_object() || value.is_array()) {
                merger.skip(String::new(), page_key, SkipReason::NotAContainer);
                continue;
            }
            if value.is_array() {
                self.pages
                    .entry(page_key.clone())
                    .or_insert_with(Space::array)
                    .is_array = true;
            }
            stack.push(Job {
                page: page_key.clone(),
                path: Vec::new(),
                value,
            });
        }

        while let Some(job) = stack.pop() {
            let children = merger.run(&mut self.pages, job);
            stack.extend(children.into_iter().rev());
        }

        info!(
            "Imported '{}': {} added, {} updated, {} unchanged, {} skipped",
            lang,
            report.additions.len(),
            report.updates.len(),
            report.unchanged,
            report.skipped.len()
        );
        Ok(report)
    }

    /// What [`import_translations`](Self::import_translations) would do,
    /// without mutating this tree.
    pub fn preview_import(&self, lang: &str, data: &Value) -> Result<ImportReport, TreeError> {
        let mut scratch = self.clone();
        scratch.import_translations(lang, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::flatten::{flatten, flatten_all_pages};
    use serde_json::json;

    fn path(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    // ==================== Shape Inference Tests ====================

    #[test]
    fn test_import_array_into_empty_tree() {
        let mut tree = TranslationTree::with_languages(["tr"]);
        let report = tree
            .import_translations("en", &json!({"home": {"items": ["a", "b"]}}))
            .unwrap();

        assert!(report.language_added);
        assert_eq!(tree.languages, vec!["tr", "en"]);

        let items = &tree.pages["home"].spaces["items"];
        assert!(items.is_array);
        assert_eq!(items.translations["0"].get("en"), Some(&TranslationValue::from("a")));
        assert_eq!(items.translations["1"].get("en"), Some(&TranslationValue::from("b")));
        assert_eq!(items.translations["0"].get("tr"), Some(&TranslationValue::from("")));
        assert_eq!(report.additions.len(), 2);
        assert_eq!(report.additions[0].path, "home/items/0");
    }

    #[test]
    fn test_import_backfills_zero_values_by_kind() {
        let mut tree = TranslationTree::with_languages(["en", "tr"]);
        tree.import_translations(
            "en",
            &json!({"settings": {"count": 3, "enabled": true, "nothing": null, "label": "x"}}),
        )
        .unwrap();

        let settings = &tree.pages["settings"].translations;
        assert_eq!(settings["count"].get("tr"), Some(&TranslationValue::from(0)));
        assert_eq!(settings["enabled"].get("tr"), Some(&TranslationValue::Bool(false)));
        assert_eq!(settings["nothing"].get("tr"), Some(&TranslationValue::Null));
        assert_eq!(settings["label"].get("tr"), Some(&TranslationValue::from("")));
    }

    #[test]
    fn test_import_updates_existing_entry_only_for_language() {
        let mut tree = TranslationTree::with_languages(["en", "tr"]);
        tree.add_page("home").unwrap();
        tree.add_translation("home", &[], "title", None).unwrap();
        tree.update_translation_value("home", &[], "title", "en", "Hi".into());

        let report = tree
            .import_translations("tr", &json!({"home": {"title": "Merhaba"}}))
            .unwrap();

        let entry = &tree.pages["home"].translations["title"];
        assert_eq!(entry.get("en"), Some(&TranslationValue::from("Hi")));
        assert_eq!(entry.get("tr"), Some(&TranslationValue::from("Merhaba")));
        assert_eq!(report.updates.len(), 1);
        assert_eq!(report.updates[0].previous, Some(TranslationValue::from("")));
        assert!(report.additions.is_empty());
    }

    #[test]
    fn test_import_counts_unchanged() {
        let mut tree = TranslationTree::new();
        let data = json!({"home": {"title": "Hi"}});
        tree.import_translations("en", &data).unwrap();
        let report = tree.import_translations("en", &data).unwrap();
        assert_eq!(report.unchanged, 1);
        assert!(report.is_noop());
    }

    #[test]
    fn test_import_nested_arrays_and_objects() {
        let mut tree = TranslationTree::new();
        tree.import_translations(
            "en",
            &json!({"faq": {"entries": [{"q": "Why?", "a": "Because"}, ["x", "y"]]}}),
        )
        .unwrap();

        let entries = &tree.pages["faq"].spaces["entries"];
        assert!(entries.is_array);
        assert!(!entries.spaces["0"].is_array);
        assert!(entries.spaces["1"].is_array);
        assert_eq!(
            flatten(&tree.pages["faq"], "en"),
            json!({"entries": [{"q": "Why?", "a": "Because"}, ["x", "y"]]})
        );
    }

    #[test]
    fn test_import_marks_existing_space_as_array() {
        let mut tree = TranslationTree::with_languages(["en"]);
        tree.add_page("home").unwrap();
        tree.add_space("home", &[], "items", false).unwrap();
        tree.import_translations("en", &json!({"home": {"items": ["a"]}}))
            .unwrap();
        assert!(tree.pages["home"].spaces["items"].is_array);
    }

    // ==================== Conflict Tests ====================

    #[test]
    fn test_import_skips_primitive_over_space() {
        let mut tree = TranslationTree::with_languages(["en"]);
        tree.add_page("home").unwrap();
        tree.add_space("home", &[], "header", false).unwrap();

        let report = tree
            .import_translations("en", &json!({"home": {"header": "flat"}}))
            .unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::AlreadySpace);
        assert!(tree.pages["home"].translations.is_empty());
        assert!(tree.pages["home"].spaces.contains_key("header"));
    }

    #[test]
    fn test_import_skips_object_over_translation() {
        let mut tree = TranslationTree::with_languages(["en"]);
        tree.add_page("home").unwrap();
        tree.add_translation("home", &[], "title", None).unwrap();

        let report = tree
            .import_translations("en", &json!({"home": {"title": {"main": "x"}}}))
            .unwrap();
        assert_eq!(report.skipped[0].reason, SkipReason::AlreadyTranslation);
        assert!(tree.pages["home"].spaces.is_empty());
    }

    #[test]
    fn test_import_array_skips_primitive_over_space() {
        let mut tree = TranslationTree::with_languages(["en"]);
        tree.add_page("home").unwrap();
        tree.add_space("home", &[], "items", true).unwrap();
        tree.add_space("home", &path(&["items"]), "1", false).unwrap();

        let report = tree
            .import_translations("en", &json!({"home": {"items": ["a", "b"]}}))
            .unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, "home/items");
        assert_eq!(report.skipped[0].key, "1");
        assert_eq!(report.skipped[0].reason, SkipReason::AlreadySpace);
        let items = &tree.pages["home"].spaces["items"];
        assert!(items.spaces.contains_key("1"));
        assert!(!items.translations.contains_key("1"));
        assert_eq!(items.translations["0"].get("en"), Some(&TranslationValue::from("a")));
    }

    #[test]
    fn test_import_array_skips_container_over_translation() {
        let mut tree = TranslationTree::with_languages(["en"]);
        tree.add_page("home").unwrap();
        tree.add_space("home", &[], "items", true).unwrap();
        let items = path(&["items"]);
        tree.add_translation("home", &items, "0", None).unwrap();
        tree.add_translation("home", &items, "1", None).unwrap();

        let report = tree
            .import_translations("en", &json!({"home": {"items": [{"q": "x"}, ["y"]]}}))
            .unwrap();

        let reasons: Vec<_> = report.skipped.iter().map(|w| (w.key.as_str(), w.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                ("0", SkipReason::AlreadyTranslation),
                ("1", SkipReason::AlreadyTranslation)
            ]
        );
        let space = &tree.pages["home"].spaces["items"];
        assert!(space.spaces.is_empty());
        assert_eq!(space.translations.len(), 2);
        assert!(report.additions.is_empty());
    }

    #[test]
    fn test_import_skips_positions_past_the_limit() {
        let mut tree = TranslationTree::with_languages(["en"]);
        tree.add_page("home").unwrap();
        tree.add_space("home", &[], "items", true).unwrap();

        let report = tree
            .import_translations(
                "en",
                &json!({"home": {"items": {"0": "a", "4294967296": "huge", "label": "named"}}}),
            )
            .unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].key, "4294967296");
        assert_eq!(report.skipped[0].reason, SkipReason::PositionOutOfRange);
        let items = &tree.pages["home"].spaces["items"];
        assert!(items.translations.contains_key("label"));
        assert!(!items.translations.contains_key("4294967296"));

        let long: Vec<Value> = (0..=MAX_ARRAY_INDEX + 1).map(|i| Value::from(i.to_string())).collect();
        let report = tree
            .import_translations("en", &json!({"list": {"values": long}}))
            .unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::PositionOutOfRange);
        assert_eq!(tree.pages["list"].spaces["values"].translations.len(), MAX_ARRAY_INDEX + 1);
    }

    #[test]
    fn test_import_skips_invalid_keys_and_continues() {
        let mut tree = TranslationTree::new();
        let report = tree
            .import_translations(
                "en",
                &json!({"bad page": {"a": "1"}, "home": {"bad key": "x", "good": "y"}}),
            )
            .unwrap();

        assert!(!tree.pages.contains_key("bad page"));
        assert_eq!(flatten_all_pages(&tree, "en"), json!({"home": {"good": "y"}}));
        let reasons: Vec<_> = report.skipped.iter().map(|w| w.reason).collect();
        assert_eq!(reasons, vec![SkipReason::InvalidKey, SkipReason::InvalidKey]);
    }

    #[test]
    fn test_import_skips_primitive_page() {
        let mut tree = TranslationTree::new();
        let report = tree.import_translations("en", &json!({"home": "oops"})).unwrap();
        assert!(tree.pages.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::NotAContainer);
    }

    #[test]
    fn test_import_array_page_round_trips() {
        let data = json!({"steps": ["one", "two"], "home": {"title": "Hi"}});
        let mut tree = TranslationTree::new();
        tree.import_translations("en", &data).unwrap();

        assert!(tree.pages["steps"].is_array);
        assert!(!tree.pages["home"].is_array);
        assert_eq!(flatten_all_pages(&tree, "en"), data);
    }

    #[test]
    fn test_import_rejects_bad_payloads() {
        let mut tree = TranslationTree::new();
        assert!(matches!(
            tree.import_translations("en", &json!(["a"])),
            Err(TreeError::InvalidImport(_))
        ));
        assert!(matches!(
            tree.import_translations("e n", &json!({})),
            Err(TreeError::InvalidKey { .. })
        ));
        assert!(tree.languages.is_empty());
    }

    // ==================== Preview / Round Trip Tests ====================

    #[test]
    fn test_preview_does_not_mutate() {
        let mut tree = TranslationTree::with_languages(["en"]);
        tree.add_page("home").unwrap();
        tree.add_translation("home", &[], "title", None).unwrap();
        let before = tree.clone();

        let report = tree
            .preview_import("en", &json!({"home": {"title": "Hi", "subtitle": "There"}}))
            .unwrap();
        assert_eq!(tree, before);
        assert_eq!(report.updates.len(), 1);
        assert_eq!(report.additions.len(), 1);
        assert_eq!(report.additions[0].path, "home/subtitle");
    }

    #[test]
    fn test_export_then_import_round_trip() {
        let mut tree = TranslationTree::with_languages(["en", "tr"]);
        tree.add_page("home").unwrap();
        tree.add_space("home", &[], "header", false).unwrap();
        tree.add_space("home", &path(&["header"]), "links", true).unwrap();
        tree.add_translation("home", &path(&["header", "links"]), "0", None)
            .unwrap();
        tree.add_translation("home", &path(&["header"]), "title", None)
            .unwrap();
        tree.update_translation_value("home", &path(&["header"]), "title", "en", "Hi".into());
        tree.update_translation_value("home", &path(&["header", "links"]), "0", "en", "Docs".into());

        let exported = flatten_all_pages(&tree, "en");
        let mut fresh = TranslationTree::new();
        fresh.import_translations("en", &exported).unwrap();
        assert_eq!(flatten_all_pages(&fresh, "en"), exported);

        // re-importing into the source tree changes nothing
        let report = tree.import_translations("en", &exported).unwrap();
        assert!(report.is_noop());
    }
}
