//! Case-insensitive deep search over pages.

use crate::tree::model::{Space, TranslationTree};

fn contains(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// True if any space key, translation key or translation value below
/// `space` contains the (already lower-cased) query.
fn deep_match(space: &Space, needle_lower: &str) -> bool {
    let mut stack = vec![space];
    while let Some(current) = stack.pop() {
        for (key, entry) in &current.translations {
            if contains(key, needle_lower) {
                return true;
            }
            if entry
                .iter()
                .any(|(_, value)| contains(&value.display_text(), needle_lower))
            {
                return true;
            }
        }
        for (key, child) in &current.spaces {
            if contains(key, needle_lower) {
                return true;
            }
            stack.push(child);
        }
    }
    false
}

impl TranslationTree {
    /// Page keys matching `query`, either by name or by any descendant key
    /// or value. An empty query matches every page.
    pub fn search_pages(&self, query: &str) -> Vec<String> {
        if query.is_empty() {
            return self.page_keys();
        }
        let needle = query.to_lowercase();
        self.pages
            .iter()
            .filter(|(key, page)| contains(key, &needle) || deep_match(page, &needle))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> TranslationTree {
        let mut tree = TranslationTree::new();
        tree.import_translations(
            "en",
            &json!({
                "home": {"hero": {"title": "Welcome Aboard"}},
                "pricing": {"plans": [{"name": "Starter", "seats": 5}]},
                "legal": {"flag": false}
            }),
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_matches_page_key() {
        assert_eq!(tree().search_pages("PRIC"), vec!["pricing"]);
    }

    #[test]
    fn test_matches_nested_value_case_insensitive() {
        assert_eq!(tree().search_pages("aboard"), vec!["home"]);
        assert_eq!(tree().search_pages("starter"), vec!["pricing"]);
        assert_eq!(tree().search_pages("5"), vec!["pricing"]);
    }

    #[test]
    fn test_matches_space_and_translation_keys() {
        assert_eq!(tree().search_pages("hero"), vec!["home"]);
        assert_eq!(tree().search_pages("seats"), vec!["pricing"]);
    }

    #[test]
    fn test_falsy_values_do_not_match_their_text() {
        assert!(tree().search_pages("false").is_empty());
    }

    #[test]
    fn test_empty_query_returns_all() {
        assert_eq!(tree().search_pages(""), vec!["home", "legal", "pricing"]);
    }
}
