//! Read-side export contracts over a tree snapshot.

use crate::tree::{flatten, flatten_all_languages, flatten_all_pages, TranslationTree};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExportError {
    #[error("Page '{page_key}' not found")]
    PageNotFound { page_key: String, available: Vec<String> },
}

/// Every page flattened for `lang`. An unknown language exports as `{}`
/// so client integrations keep working while a language is being set up.
pub fn language_export(tree: &TranslationTree, lang: &str) -> Value {
    if !tree.has_language(lang) {
        return Value::Object(Map::new());
    }
    flatten_all_pages(tree, lang)
}

/// `{ lang: { pageKey: ... } }` for every active language.
pub fn bulk_export(tree: &TranslationTree) -> Value {
    flatten_all_languages(tree)
}

/// One page, either for a single language or keyed by every active
/// language.
pub fn page_export(tree: &TranslationTree, page_key: &str, lang: Option<&str>) -> Result<Value, ExportError> {
    let page = tree.page(page_key).ok_or_else(|| ExportError::PageNotFound {
        page_key: page_key.to_string(),
        available: tree.page_keys(),
    })?;

    Ok(match lang {
        Some(lang) if !tree.has_language(lang) => Value::Object(Map::new()),
        Some(lang) => flatten(page, lang),
        None => Value::Object(
            tree.languages
                .iter()
                .map(|lang| (lang.clone(), flatten(page, lang)))
                .collect(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TranslationValue;
    use serde_json::json;

    fn sample() -> TranslationTree {
        let mut tree = TranslationTree::with_languages(["en", "tr"]);
        tree.add_page("home").unwrap();
        tree.add_page("about").unwrap();
        tree.add_translation("home", &[], "title", None).unwrap();
        tree.update_translation_value("home", &[], "title", "en", TranslationValue::from("Hi"));
        tree.update_translation_value("home", &[], "title", "tr", TranslationValue::from("Merhaba"));
        tree
    }

    #[test]
    fn test_language_export() {
        let tree = sample();
        assert_eq!(
            language_export(&tree, "tr"),
            json!({"about": {}, "home": {"title": "Merhaba"}})
        );
    }

    #[test]
    fn test_unknown_language_is_empty_object() {
        assert_eq!(language_export(&sample(), "xx"), json!({}));
    }

    #[test]
    fn test_bulk_export() {
        let all = bulk_export(&sample());
        assert_eq!(all["en"]["home"]["title"], "Hi");
        assert_eq!(all["tr"]["home"]["title"], "Merhaba");
        assert_eq!(all.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_page_export_single_and_all_languages() {
        let tree = sample();
        assert_eq!(page_export(&tree, "home", Some("en")).unwrap(), json!({"title": "Hi"}));
        assert_eq!(
            page_export(&tree, "home", None).unwrap(),
            json!({"en": {"title": "Hi"}, "tr": {"title": "Merhaba"}})
        );
        assert_eq!(page_export(&tree, "home", Some("xx")).unwrap(), json!({}));
    }

    #[test]
    fn test_unknown_page_lists_available() {
        let err = page_export(&sample(), "missing", None).unwrap_err();
        assert_eq!(
            err,
            ExportError::PageNotFound {
                page_key: "missing".to_string(),
                available: vec!["about".to_string(), "home".to_string()],
            }
        );
        assert_eq!(err.to_string(), "Page 'missing' not found");
    }
}
