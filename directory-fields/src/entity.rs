//! Minimal property-bag entity.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A plain mapping of property name to value.
pub type PropertyMap = IndexMap<String, Value>;

/// Named properties with no identity beyond themselves.
///
/// Fields keep settings they don't recognise here so unknown keys survive
/// a parse untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    properties: PropertyMap,
}

impl Entity {
    /// Copy every entry of `initial` as a property. Keys are not validated.
    pub fn new(initial: Option<PropertyMap>) -> Self {
        Self {
            properties: initial.unwrap_or_default(),
        }
    }

    /// Bulk-assign entries, replacing existing properties with the same name.
    pub fn assign(&mut self, input: PropertyMap) {
        self.properties.extend(input);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.properties.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Shallow copy of the current properties.
    pub fn to_map(&self) -> PropertyMap {
        self.properties.clone()
    }
}

impl From<PropertyMap> for Entity {
    fn from(properties: PropertyMap) -> Self {
        Self { properties }
    }
}
