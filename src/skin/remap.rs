//! Color remaps: named color substitutions applied to a skin's working markup

use super::source::SourceTree;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PAINT_ATTRIBUTES: &[&str] = &["fill", "stroke", "stop-color", "flood-color", "color"];

/// One `from -> to` color substitution, colors written as in the markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSwap {
    pub from: String,
    pub to: String,
}

/// A named set of color substitutions for one skin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRemap {
    pub name: String,
    #[serde(default)]
    pub swaps: Vec<ColorSwap>,
}

impl ColorRemap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            swaps: Vec::new(),
        }
    }

    pub fn with_swap(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.swaps.push(ColorSwap {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Rewrites paint attributes, inline styles and `<style>` sheets in place.
    /// Returns how many values changed.
    pub fn apply(&self, tree: &mut SourceTree) -> usize {
        if self.swaps.is_empty() {
            return 0;
        }

        let ids: Vec<_> = tree.ids().collect();
        let mut changed = 0;
        for id in ids {
            let in_style_sheet = tree
                .parent(id)
                .and_then(|parent| tree.name(parent))
                .is_some_and(|name| name == "style");

            if let Some(text) = tree.text_mut(id) {
                if in_style_sheet && self.rewrite(text) {
                    changed += 1;
                }
                continue;
            }

            let Some(attributes) = tree.attributes_mut(id) else {
                continue;
            };
            for attr in attributes.iter_mut() {
                let relevant =
                    attr.name == "style" || PAINT_ATTRIBUTES.contains(&attr.name.as_str());
                if relevant && self.rewrite(&mut attr.value) {
                    changed += 1;
                }
            }
        }

        debug!("Remap {:?} rewrote {} values", self.name, changed);
        changed
    }

    fn rewrite(&self, value: &mut String) -> bool {
        let mut touched = false;
        for swap in &self.swaps {
            if let Some(replaced) = replace_ignore_ascii_case(value, &swap.from, &swap.to) {
                *value = replaced;
                touched = true;
            }
        }
        touched
    }
}

fn replace_ignore_ascii_case(haystack: &str, needle: &str, replacement: &str) -> Option<String> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();
    if !lower_haystack.contains(&lower_needle) {
        return None;
    }

    // ASCII lowercasing keeps byte offsets identical
    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;
    for (start, _) in lower_haystack.match_indices(&lower_needle) {
        out.push_str(&haystack[cursor..start]);
        out.push_str(replacement);
        cursor = start + needle.len();
    }
    out.push_str(&haystack[cursor..]);
    Some(out)
}
