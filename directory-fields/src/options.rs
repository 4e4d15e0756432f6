//! Selectable options for dropdown and choice fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::settings::{as_non_empty_text, maybe_unserialize, sanitize_title};

/// A single choice of a dropdown or choice field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Option whose value is the slug of its title.
    pub fn from_title(title: &str) -> Self {
        Self::new(sanitize_title(title), title)
    }
}

/// Turns a raw `selectable_options` or `taxonomy` setting into options.
pub trait OptionParser {
    fn parse_selectable_options(&self, raw: &Value) -> Vec<SelectOption>;
}

/// Parses literal option lists and resolves taxonomy references to their terms.
///
/// Accepted shapes:
/// - an array of titles, or of `{ "option_title": .. }` objects
/// - an object mapping option value to label
/// - either of the above serialized into a string
/// - the name of a registered taxonomy
#[derive(Debug, Clone, Default)]
pub struct SelectableOptions {
    taxonomies: IndexMap<String, Vec<SelectOption>>,
}

impl SelectableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the terms of a taxonomy.
    pub fn with_taxonomy(mut self, taxonomy: impl Into<String>, terms: Vec<SelectOption>) -> Self {
        self.taxonomies.insert(taxonomy.into(), terms);
        self
    }

    pub fn taxonomy_terms(&self, taxonomy: &str) -> Option<&[SelectOption]> {
        self.taxonomies.get(taxonomy).map(Vec::as_slice)
    }

    fn literal_option(item: &Value) -> Option<SelectOption> {
        match item {
            Value::Object(map) => {
                let title = map
                    .get("option_title")
                    .or_else(|| map.get("label"))
                    .and_then(as_non_empty_text)?;
                match map.get("value").and_then(as_non_empty_text) {
                    Some(value) => Some(SelectOption::new(value, title)),
                    None => Some(SelectOption::from_title(&title)),
                }
            }
            other => as_non_empty_text(other).map(|title| SelectOption::from_title(&title)),
        }
    }
}

impl OptionParser for SelectableOptions {
    fn parse_selectable_options(&self, raw: &Value) -> Vec<SelectOption> {
        match maybe_unserialize(raw) {
            Value::Array(items) => items.iter().filter_map(Self::literal_option).collect(),
            Value::Object(map) => map
                .iter()
                .filter_map(|(value, label)| {
                    as_non_empty_text(label).map(|label| SelectOption::new(value.clone(), label))
                })
                .collect(),
            Value::String(taxonomy) => match self.taxonomy_terms(&taxonomy) {
                Some(terms) => terms.to_vec(),
                None => {
                    trace!(%taxonomy, "no terms registered for taxonomy");
                    Vec::new()
                }
            },
            _ => Vec::new(),
        }
    }
}
