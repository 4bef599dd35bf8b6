//! Materialization of the tree into plain per-language JSON.
//!
//! Map-shaped spaces become objects, array-shaped spaces become arrays of
//! length `max index + 1` with unused positions set to `null`. Positions
//! past [`MAX_ARRAY_INDEX`] are left out of arrays. Leaf values
//! that are missing or falsy (`""`, `0`, `false`, `null`) are exported as
//! `""`; existing exports depend on that.

use crate::tree::key::{array_position, MAX_ARRAY_INDEX};
use crate::tree::model::{Space, TranslationTree};
use serde_json::{Map, Value};

/// Where a finished child value goes in its parent.
enum Slot<'a> {
    Index(usize),
    Key(&'a str),
}

struct Frame<'a> {
    out: Value,
    children: std::vec::IntoIter<(Slot<'a>, &'a Space)>,
    slot: Option<Slot<'a>>,
}

/// Collect the positional keys of an array-shaped space.
fn array_indices(space: &Space) -> impl Iterator<Item = usize> + '_ {
    space
        .spaces
        .keys()
        .chain(space.translations.keys())
        .filter_map(|k| array_position(k))
        .filter(|&i| i <= MAX_ARRAY_INDEX)
}

/// Build a frame: leaves are written immediately, child spaces are queued.
fn open_frame<'a>(space: &'a Space, lang: &str, slot: Option<Slot<'a>>) -> Frame<'a> {
    let mut children = Vec::new();

    let out = if space.is_array {
        match array_indices(space).max().and_then(|max| max.checked_add(1)) {
            None => Value::Array(Vec::new()),
            Some(len) => {
                let mut items = vec![Value::Null; len];
                for (i, item) in items.iter_mut().enumerate() {
                    let key = i.to_string();
                    if let Some(child) = space.spaces.get(&key) {
                        children.push((Slot::Index(i), child));
                    } else if let Some(entry) = space.translations.get(&key) {
                        *item = entry.export_value(lang);
                    }
                }
                Value::Array(items)
            }
        }
    } else {
        let mut map = Map::new();
        for (key, entry) in &space.translations {
            map.insert(key.clone(), entry.export_value(lang));
        }
        for (key, child) in &space.spaces {
            // a translation under the same key wins
            if !space.translations.contains_key(key) {
                children.push((Slot::Key(key.as_str()), child));
            }
        }
        Value::Object(map)
    };

    Frame {
        out,
        children: children.into_iter(),
        slot,
    }
}

fn attach(parent: &mut Value, slot: Slot<'_>, value: Value) {
    match (parent, slot) {
        (Value::Array(items), Slot::Index(i)) => {
            if let Some(item) = items.get_mut(i) {
                *item = value;
            }
        }
        (Value::Object(map), Slot::Key(key)) => {
            map.insert(key.to_string(), value);
        }
        _ => {}
    }
}

/// Flatten one container for one language.
pub fn flatten(space: &Space, lang: &str) -> Value {
    let mut stack = vec![open_frame(space, lang, None)];

    loop {
        let next_child = match stack.last_mut() {
            Some(top) => top.children.next(),
            None => return Value::Null,
        };

        match next_child {
            Some((slot, child)) => stack.push(open_frame(child, lang, Some(slot))),
            None => {
                let Some(done) = stack.pop() else {
                    return Value::Null;
                };
                match (stack.last_mut(), done.slot) {
                    (Some(parent), Some(slot)) => attach(&mut parent.out, slot, done.out),
                    _ => return done.out,
                }
            }
        }
    }
}

/// `{ pageKey: flatten(page, lang) }` for every page.
pub fn flatten_all_pages(tree: &TranslationTree, lang: &str) -> Value {
    let pages: Map<String, Value> = tree
        .pages
        .iter()
        .map(|(key, page)| (key.clone(), flatten(page, lang)))
        .collect();
    Value::Object(pages)
}

/// `{ lang: { pageKey: ... } }` for every active language.
pub fn flatten_all_languages(tree: &TranslationTree) -> Value {
    let languages: Map<String, Value> = tree
        .languages
        .iter()
        .map(|lang| (lang.clone(), flatten_all_pages(tree, lang)))
        .collect();
    Value::Object(languages)
}
