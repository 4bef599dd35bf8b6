//! Hierarchical translation tree.
//!
//! Pages map to root [`Space`]s; spaces hold child spaces and translation
//! entries, either as a named map or as an array-shaped sequence. This module
//! owns all structural logic: key validation, navigation, mutations,
//! flattening to per-language JSON and merging imported JSON back in.
//!
//! # Example
//!
//! ```rust
//! use translation_manager::tree::{flatten_all_pages, TranslationTree, TranslationValue};
//! use std::collections::BTreeMap;
//!
//! let mut tree = TranslationTree::with_languages(["en", "tr"]);
//! tree.add_page("home")?;
//! tree.add_space("home", &[], "header", false)?;
//! let values = BTreeMap::from([("en".to_string(), TranslationValue::from("Hi"))]);
//! tree.add_translation("home", &["header".to_string()], "title", Some(&values))?;
//!
//! let en = flatten_all_pages(&tree, "en");
//! assert_eq!(en, serde_json::json!({"home": {"header": {"title": "Hi"}}}));
//! # Ok::<(), translation_manager::tree::TreeError>(())
//! ```

mod error;
mod flatten;
mod import;
mod key;
mod model;
mod navigate;
mod ops;
mod order;
mod search;
mod value;

pub use error::{KeyKind, TreeError};
pub use flatten::{flatten, flatten_all_languages, flatten_all_pages};
pub use import::{ImportChange, ImportReport, ImportWarning, SkipReason};
pub use key::{is_valid_key, MAX_ARRAY_INDEX};
pub use model::{Space, TranslationEntry, TranslationTree};
pub use navigate::{get_or_create_container, resolve_container, resolve_container_mut};
pub use ops::ValueUpdate;
pub use value::TranslationValue;
