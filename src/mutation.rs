//! Wire-level mutation commands.
//!
//! Every structural edit that clients can request is one [`Mutation`]
//! variant. [`Mutation::apply`] dispatches to the tree and reports whether
//! anything changed together with the audit event to record.

use crate::activity::{ActivityAction, ActivityEvent, EntityType};
use crate::tree::{TranslationTree, TranslationValue, TreeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Mutation {
    AddPage {
        page_key: String,
    },
    DeletePage {
        page_key: String,
    },
    RenamePage {
        old_key: String,
        new_key: String,
    },
    AddSpace {
        page_key: String,
        #[serde(default)]
        parent_path: Vec<String>,
        space_key: String,
        #[serde(default)]
        is_array: bool,
    },
    DeleteSpace {
        page_key: String,
        #[serde(default)]
        parent_path: Vec<String>,
        space_key: String,
    },
    RenameSpace {
        page_key: String,
        #[serde(default)]
        parent_path: Vec<String>,
        old_key: String,
        new_key: String,
    },
    AddTranslation {
        page_key: String,
        #[serde(default)]
        parent_path: Vec<String>,
        key: String,
        #[serde(default)]
        values: Option<BTreeMap<String, TranslationValue>>,
    },
    DeleteTranslation {
        page_key: String,
        #[serde(default)]
        parent_path: Vec<String>,
        key: String,
    },
    RenameTranslationKey {
        page_key: String,
        #[serde(default)]
        parent_path: Vec<String>,
        old_key: String,
        new_key: String,
    },
    UpdateTranslationValue {
        page_key: String,
        #[serde(default)]
        parent_path: Vec<String>,
        key: String,
        lang: String,
        value: TranslationValue,
    },
    ChangeOrder {
        page_key: String,
        #[serde(default)]
        parent_path: Vec<String>,
        key: String,
        new_index: usize,
    },
    AddLanguage {
        code: String,
    },
    DeleteLanguage {
        code: String,
    },
    RenameLanguage {
        old_code: String,
        new_code: String,
    },
}

/// Result of a successfully applied mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub changed: bool,
    pub event: Option<ActivityEvent>,
}

impl Applied {
    fn unchanged() -> Self {
        Self {
            changed: false,
            event: None,
        }
    }

    fn changed(event: ActivityEvent) -> Self {
        Self {
            changed: true,
            event: Some(event),
        }
    }
}

fn joined(page_key: &str, parent_path: &[String], key: &str) -> String {
    let mut parts = Vec::with_capacity(parent_path.len() + 2);
    parts.push(page_key);
    parts.extend(parent_path.iter().map(String::as_str));
    parts.push(key);
    parts.join(".")
}

fn renamed(action: ActivityEvent, field: &str, old: &str, new: &str) -> ActivityEvent {
    action.change(field, Value::from(old), Value::from(new))
}

impl Mutation {
    /// Short operation name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddPage { .. } => "addPage",
            Self::DeletePage { .. } => "deletePage",
            Self::RenamePage { .. } => "renamePage",
            Self::AddSpace { .. } => "addSpace",
            Self::DeleteSpace { .. } => "deleteSpace",
            Self::RenameSpace { .. } => "renameSpace",
            Self::AddTranslation { .. } => "addTranslation",
            Self::DeleteTranslation { .. } => "deleteTranslation",
            Self::RenameTranslationKey { .. } => "renameTranslationKey",
            Self::UpdateTranslationValue { .. } => "updateTranslationValue",
            Self::ChangeOrder { .. } => "changeOrder",
            Self::AddLanguage { .. } => "addLanguage",
            Self::DeleteLanguage { .. } => "deleteLanguage",
            Self::RenameLanguage { .. } => "renameLanguage",
        }
    }

    /// Lower-case every language code carried by the mutation, matching how
    /// the export and import endpoints address languages.
    pub fn with_lowercase_languages(self) -> Self {
        match self {
            Self::AddTranslation {
                page_key,
                parent_path,
                key,
                values,
            } => Self::AddTranslation {
                page_key,
                parent_path,
                key,
                values: values.map(|values| {
                    values
                        .into_iter()
                        .map(|(lang, value)| (lang.to_lowercase(), value))
                        .collect()
                }),
            },
            Self::UpdateTranslationValue {
                page_key,
                parent_path,
                key,
                lang,
                value,
            } => Self::UpdateTranslationValue {
                page_key,
                parent_path,
                key,
                lang: lang.to_lowercase(),
                value,
            },
            Self::AddLanguage { code } => Self::AddLanguage {
                code: code.to_lowercase(),
            },
            Self::DeleteLanguage { code } => Self::DeleteLanguage {
                code: code.to_lowercase(),
            },
            Self::RenameLanguage { old_code, new_code } => Self::RenameLanguage {
                old_code: old_code.to_lowercase(),
                new_code: new_code.to_lowercase(),
            },
            other => other,
        }
    }

    pub fn apply(&self, tree: &mut TranslationTree) -> Result<Applied, TreeError> {
        use ActivityAction::{Create, Delete, Update};

        match self {
            Self::AddPage { page_key } => {
                tree.add_page(page_key)?;
                Ok(Applied::changed(
                    ActivityEvent::new(Create, EntityType::Page, page_key)
                        .details(format!("Created page \"{page_key}\"")),
                ))
            }
            Self::DeletePage { page_key } => {
                if !tree.delete_page(page_key) {
                    return Ok(Applied::unchanged());
                }
                Ok(Applied::changed(
                    ActivityEvent::new(Delete, EntityType::Page, page_key)
                        .details(format!("Deleted page \"{page_key}\"")),
                ))
            }
            Self::RenamePage { old_key, new_key } => {
                tree.rename_page(old_key, new_key)?;
                if old_key == new_key {
                    return Ok(Applied::unchanged());
                }
                Ok(Applied::changed(renamed(
                    ActivityEvent::new(Update, EntityType::Page, new_key)
                        .details(format!("Renamed page \"{old_key}\" to \"{new_key}\"")),
                    "pageKey",
                    old_key,
                    new_key,
                )))
            }
            Self::AddSpace {
                page_key,
                parent_path,
                space_key,
                is_array,
            } => {
                tree.add_space(page_key, parent_path, space_key, *is_array)?;
                let id = joined(page_key, parent_path, space_key);
                Ok(Applied::changed(
                    ActivityEvent::new(Create, EntityType::Space, id).named(space_key.clone()),
                ))
            }
            Self::DeleteSpace {
                page_key,
                parent_path,
                space_key,
            } => {
                if !tree.delete_space(page_key, parent_path, space_key) {
                    return Ok(Applied::unchanged());
                }
                let id = joined(page_key, parent_path, space_key);
                Ok(Applied::changed(
                    ActivityEvent::new(Delete, EntityType::Space, id).named(space_key.clone()),
                ))
            }
            Self::RenameSpace {
                page_key,
                parent_path,
                old_key,
                new_key,
            } => {
                tree.rename_space(page_key, parent_path, old_key, new_key)?;
                if old_key == new_key {
                    return Ok(Applied::unchanged());
                }
                let id = joined(page_key, parent_path, new_key);
                Ok(Applied::changed(renamed(
                    ActivityEvent::new(Update, EntityType::Space, id).named(new_key.clone()),
                    "spaceKey",
                    old_key,
                    new_key,
                )))
            }
            Self::AddTranslation {
                page_key,
                parent_path,
                key,
                values,
            } => {
                tree.add_translation(page_key, parent_path, key, values.as_ref())?;
                let id = joined(page_key, parent_path, key);
                Ok(Applied::changed(
                    ActivityEvent::new(Create, EntityType::Translation, id)
                        .named(key.clone())
                        .details(format!("Added translation key \"{key}\" to page \"{page_key}\"")),
                ))
            }
            Self::DeleteTranslation {
                page_key,
                parent_path,
                key,
            } => {
                if !tree.delete_translation(page_key, parent_path, key) {
                    return Ok(Applied::unchanged());
                }
                let id = joined(page_key, parent_path, key);
                Ok(Applied::changed(
                    ActivityEvent::new(Delete, EntityType::Translation, id)
                        .named(key.clone())
                        .details(format!("Deleted translation key \"{key}\" from page \"{page_key}\"")),
                ))
            }
            Self::RenameTranslationKey {
                page_key,
                parent_path,
                old_key,
                new_key,
            } => {
                tree.rename_translation_key(page_key, parent_path, old_key, new_key)?;
                if old_key == new_key {
                    return Ok(Applied::unchanged());
                }
                let id = joined(page_key, parent_path, new_key);
                Ok(Applied::changed(renamed(
                    ActivityEvent::new(Update, EntityType::Translation, id).named(new_key.clone()),
                    "key",
                    old_key,
                    new_key,
                )))
            }
            Self::UpdateTranslationValue {
                page_key,
                parent_path,
                key,
                lang,
                value,
            } => {
                let Some(update) =
                    tree.update_translation_value(page_key, parent_path, key, lang, value.clone())
                else {
                    return Ok(Applied::unchanged());
                };
                if !update.changed(value) {
                    return Ok(Applied::unchanged());
                }
                let old_value = update
                    .previous
                    .as_ref()
                    .map_or(Value::Null, TranslationValue::to_json);
                let id = joined(page_key, parent_path, key);
                Ok(Applied::changed(
                    ActivityEvent::new(Update, EntityType::Translation, id)
                        .named(key.clone())
                        .details(format!("Updated {lang} translation for \"{key}\""))
                        .change(lang.clone(), old_value, value.to_json()),
                ))
            }
            Self::ChangeOrder {
                page_key,
                parent_path,
                key,
                new_index,
            } => {
                tree.change_order(page_key, parent_path, key, *new_index)?;
                if key.parse::<usize>().ok() == Some(*new_index) {
                    return Ok(Applied::unchanged());
                }
                let id = joined(page_key, parent_path, key);
                Ok(Applied::changed(
                    ActivityEvent::new(Update, EntityType::Space, id)
                        .details(format!("Moved item {key} to position {new_index}")),
                ))
            }
            Self::AddLanguage { code } => {
                tree.add_language(code)?;
                Ok(Applied::changed(ActivityEvent::new(Create, EntityType::Language, code)))
            }
            Self::DeleteLanguage { code } => {
                if !tree.has_language(code) {
                    return Ok(Applied::unchanged());
                }
                tree.delete_language(code);
                Ok(Applied::changed(ActivityEvent::new(Delete, EntityType::Language, code)))
            }
            Self::RenameLanguage { old_code, new_code } => {
                tree.rename_language(old_code, new_code)?;
                if old_code == new_code {
                    return Ok(Applied::unchanged());
                }
                Ok(Applied::changed(renamed(
                    ActivityEvent::new(Update, EntityType::Language, new_code),
                    "code",
                    old_code,
                    new_code,
                )))
            }
        }
    }
}
